//! Re-hosting of vendor result URLs into durable storage.
//!
//! Vendor URLs are often time-limited; the persister copies the asset into
//! R2 before the link expires and hands back a URL under our own domain.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info};

use adforge_models::{GenerationJob, MediaKind};

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

// Generated clips can be large; give the fetch room.
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Copies vendor-hosted results into R2.
#[derive(Clone)]
pub struct AssetPersister {
    http: Client,
    r2: R2Client,
}

impl AssetPersister {
    /// Create a new persister over an R2 client.
    pub fn new(r2: R2Client) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("adforge-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self { http, r2 })
    }

    /// Fetch `source_url` and store it under `key`, returning the public URL.
    pub async fn persist_url(&self, source_url: &str, key: &str) -> StorageResult<String> {
        debug!(source_url, key, "Fetching vendor asset");

        let response = self
            .http
            .get(source_url)
            .send()
            .await
            .map_err(|e| StorageError::fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::fetch_failed(format!(
                "{} returned HTTP {}",
                source_url, status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| content_type_for_key(key).to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::fetch_failed(e.to_string()))?;

        let size = bytes.len();
        self.r2
            .upload_bytes(bytes.to_vec(), key, &content_type)
            .await?;

        let url = self.r2.public_url(key);
        info!(key, bytes = size, "Persisted vendor asset");
        Ok(url)
    }

    /// Fetch a job's vendor result and store it, returning the durable URL.
    pub async fn persist_job_result(
        &self,
        job: &GenerationJob,
        source_url: &str,
    ) -> StorageResult<String> {
        let key = asset_key(job, source_url);
        self.persist_url(source_url, &key).await
    }
}

/// Storage key for a job's result.
///
/// Layout: `{org}/{campaign or "_"}/generations/{job_id}-{millis}.{ext}`.
/// The timestamp keeps re-persisted results from overwriting each other.
pub fn asset_key(job: &GenerationJob, source_url: &str) -> String {
    let campaign = job.campaign_id.as_deref().unwrap_or("_");
    let ext = extension_from_url(source_url).unwrap_or(match job.kind {
        MediaKind::Video => "mp4",
        MediaKind::Image => "png",
    });
    format!(
        "{}/{}/generations/{}-{}.{}",
        job.org_id,
        campaign,
        job.id,
        Utc::now().timestamp_millis(),
        ext
    )
}

/// File extension from a URL path, ignoring query strings.
fn extension_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Content type inferred from a key's extension.
fn content_type_for_key(key: &str) -> &'static str {
    match extension_from_url(key) {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::R2Config;
    use adforge_models::{AspectRatio, GenerationRequest, ProviderId};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn persister(bucket: &MockServer) -> AssetPersister {
        let r2 = R2Client::new(R2Config {
            endpoint_url: bucket.uri(),
            access_key_id: "test-key".into(),
            secret_access_key: "test-secret".into(),
            bucket_name: "assets".into(),
            region: "auto".into(),
            public_base_url: "https://cdn.adforge.dev".into(),
        })
        .await
        .unwrap();
        AssetPersister::new(r2).unwrap()
    }

    fn job(campaign: Option<&str>, kind: MediaKind) -> GenerationJob {
        GenerationJob::from_request(&GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: campaign.map(String::from),
            kind,
            provider: ProviderId::Sora,
            model: None,
            prompt: "test".into(),
            aspect_ratio: AspectRatio::LANDSCAPE,
            duration_secs: None,
            audio: None,
        })
    }

    #[test]
    fn test_asset_key_layout() {
        let job = job(Some("camp-7"), MediaKind::Video);
        let key = asset_key(&job, "https://vendor.dev/out.mp4?token=abc");
        assert!(key.starts_with("org-1/camp-7/generations/"));
        assert!(key.contains(job.id.as_str()));
        assert!(key.ends_with(".mp4"));
    }

    #[test]
    fn test_asset_key_without_campaign() {
        let job = job(None, MediaKind::Image);
        let key = asset_key(&job, "https://vendor.dev/result");
        assert!(key.starts_with("org-1/_/generations/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://a.dev/x.mp4"), Some("mp4"));
        assert_eq!(extension_from_url("https://a.dev/x.webp?sig=1"), Some("webp"));
        assert_eq!(extension_from_url("https://a.dev/content"), None);
        // Query noise must not leak into the extension
        assert_eq!(extension_from_url("https://a.dev/v1/videos/abc/content"), None);
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("a/b/x.mp4"), "video/mp4");
        assert_eq!(content_type_for_key("a/b/x.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_key("a/b/x"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_persist_url_uploads_with_source_content_type() {
        let source = MockServer::start().await;
        let bucket = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/out/clip"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"frames".to_vec(), "video/mp4"))
            .mount(&source)
            .await;
        Mock::given(method("PUT"))
            .and(path("/assets/org-1/x.mp4"))
            .and(header("content-type", "video/mp4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&bucket)
            .await;

        let url = persister(&bucket)
            .await
            .persist_url(&format!("{}/out/clip", source.uri()), "org-1/x.mp4")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.adforge.dev/org-1/x.mp4");
    }

    #[tokio::test]
    async fn test_persist_url_falls_back_to_extension_content_type() {
        let source = MockServer::start().await;
        let bucket = MockServer::start().await;

        // No content-type on the source response: the key's extension decides.
        Mock::given(method("GET"))
            .and(path("/result"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .mount(&source)
            .await;
        Mock::given(method("PUT"))
            .and(path("/assets/org-1/y.png"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&bucket)
            .await;

        persister(&bucket)
            .await
            .persist_url(&format!("{}/result", source.uri()), "org-1/y.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_persist_url_surfaces_fetch_failure_without_uploading() {
        let source = MockServer::start().await;
        let bucket = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&source)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&bucket)
            .await;

        let err = persister(&bucket)
            .await
            .persist_url(&format!("{}/gone", source.uri()), "org-1/z.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FetchFailed(_)));
    }
}
