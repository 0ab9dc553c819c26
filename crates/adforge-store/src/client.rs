//! PostgREST client for the Supabase data plane.
//!
//! All access uses the service-role key, so row level security is bypassed
//! and authorization is enforced by the callers. Filters follow PostgREST
//! query syntax (`col=eq.value`, `col=in.(a,b)`).

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};

/// A PostgREST filter: column name plus a `op.value` expression.
pub type Filter<'a> = (&'a str, String);

/// Store client configuration.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Supabase project URL, e.g. `https://abc.supabase.co`
    pub base_url: String,
    /// Service-role API key
    pub service_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl PostgrestConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StoreError::config("SUPABASE_URL must be set"))?;
        if base_url.is_empty() {
            return Err(StoreError::config("SUPABASE_URL cannot be empty"));
        }

        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .map_err(|_| StoreError::config("SUPABASE_SERVICE_KEY must be set"))?;
        if service_key.is_empty() {
            return Err(StoreError::config("SUPABASE_SERVICE_KEY cannot be empty"));
        }

        let connect_timeout_secs: u64 = std::env::var("STORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// PostgREST API client.
#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    config: PostgrestConfig,
    rest_url: String,
}

impl PostgrestClient {
    /// Create a new client.
    pub fn new(config: PostgrestConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("adforge-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let rest_url = format!("{}/rest/v1", config.base_url);

        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(PostgrestConfig::from_env()?)
    }

    fn table_url(&self, table: &str, filters: &[Filter<'_>]) -> String {
        let mut url = format!("{}/{}", self.rest_url, table);
        let mut sep = '?';
        for (column, expr) in filters {
            url.push(sep);
            url.push_str(column);
            url.push('=');
            url.push_str(&urlencoding::encode(expr));
            sep = '&';
        }
        url
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    async fn read_rows<T: DeserializeOwned>(response: Response) -> StoreResult<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_http_status(status.as_u16(), body));
        }
        let rows: Vec<T> = response.json().await?;
        Ok(rows)
    }

    async fn execute<T, F, Fut>(&self, operation: &str, table: &str, op: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StoreResult<(u16, T)>>,
    {
        with_retry(&self.config.retry, operation, || async {
            let start = Instant::now();
            let result = op().await;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok((status, value)) => {
                    record_request(operation, status, latency_ms);
                    debug!(operation, table, status, latency_ms, "Store request");
                    Ok(value)
                }
                Err(e) => {
                    record_request(operation, 0, latency_ms);
                    Err(e)
                }
            }
        })
        .await
    }

    /// Insert a row, returning the stored representation.
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> StoreResult<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.table_url(table, &[]);

        self.execute("insert", table, || async {
            let response = self
                .authed(self.http.post(&url))
                .header("Prefer", "return=representation")
                .json(row)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::CONFLICT {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::AlreadyExists(format!("{}: {}", table, body)));
            }

            let mut rows: Vec<R> = Self::read_rows(response).await?;
            let row = rows
                .pop()
                .ok_or_else(|| StoreError::invalid_response("insert returned no rows"))?;
            Ok((status.as_u16(), row))
        })
        .await
    }

    /// Select rows matching the given filters.
    pub async fn select<R>(&self, table: &str, filters: &[Filter<'_>]) -> StoreResult<Vec<R>>
    where
        R: DeserializeOwned,
    {
        let url = self.table_url(table, filters);

        self.execute("select", table, || async {
            let response = self.authed(self.http.get(&url)).send().await?;
            let status = response.status().as_u16();
            let rows = Self::read_rows(response).await?;
            Ok((status, rows))
        })
        .await
    }

    /// Select at most one row matching the given filters.
    pub async fn select_one<R>(&self, table: &str, filters: &[Filter<'_>]) -> StoreResult<Option<R>>
    where
        R: DeserializeOwned,
    {
        let mut filters = filters.to_vec();
        filters.push(("limit", "1".to_string()));
        Ok(self.select(table, &filters).await?.into_iter().next())
    }

    /// Update rows matching the filters, returning the updated rows.
    ///
    /// An empty result means no row matched, which for conditional
    /// transitions is how a lost race surfaces.
    pub async fn update<T, R>(
        &self,
        table: &str,
        filters: &[Filter<'_>],
        patch: &T,
    ) -> StoreResult<Vec<R>>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.table_url(table, filters);

        self.execute("update", table, || async {
            let response = self
                .authed(self.http.patch(&url))
                .header("Prefer", "return=representation")
                .json(patch)
                .send()
                .await?;
            let status = response.status().as_u16();
            let rows = Self::read_rows(response).await?;
            Ok((status, rows))
        })
        .await
    }

    /// Delete rows matching the filters, returning how many were removed.
    pub async fn delete(&self, table: &str, filters: &[Filter<'_>]) -> StoreResult<usize> {
        let url = self.table_url(table, filters);

        self.execute("delete", table, || async {
            let response = self
                .authed(self.http.delete(&url))
                .header("Prefer", "return=representation")
                .send()
                .await?;
            let status = response.status().as_u16();
            let rows: Vec<serde_json::Value> = Self::read_rows(response).await?;
            Ok((status, rows.len()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        status: String,
    }

    fn client(base_url: &str) -> PostgrestClient {
        PostgrestClient::new(PostgrestConfig {
            base_url: base_url.to_string(),
            service_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 1,
            },
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_generations"))
            .and(header("apikey", "service-key"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
                {"id": "j1", "status": "queued"}
            ])))
            .mount(&server)
            .await;

        let row: Row = client(&server.uri())
            .insert(
                "video_generations",
                &Row {
                    id: "j1".into(),
                    status: "queued".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(row.status, "queued");
    }

    #[tokio::test]
    async fn test_select_one_none_when_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/video_generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let row: Option<Row> = client(&server.uri())
            .select_one("video_generations", &[("id", "eq.missing".to_string())])
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_conditional_update_lost_race_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/video_generations"))
            .and(query_param("id", "eq.j1"))
            .and(query_param("status", "eq.processing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server.uri())
            .update(
                "video_generations",
                &[
                    ("id", "eq.j1".to_string()),
                    ("status", "eq.processing".to_string()),
                ],
                &serde_json::json!({"status": "completed"}),
            )
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_conflict_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_generations"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
            .mount(&server)
            .await;

        let result: StoreResult<Row> = client(&server.uri())
            .insert(
                "video_generations",
                &Row {
                    id: "j1".into(),
                    status: "queued".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_counts_removed_rows() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/image_generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "j1"}
            ])))
            .mount(&server)
            .await;

        let removed = client(&server.uri())
            .delete("image_generations", &[("id", "eq.j1".to_string())])
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
