//! Generation request payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::job::MediaKind;
use crate::media::{AspectRatio, AudioConfig};
use crate::provider::ProviderId;

/// A vendor-agnostic request to generate one ad creative.
///
/// Field-level validation covers shape only; provider capability checks
/// (supported aspect ratios, max duration) belong to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct GenerationRequest {
    /// Owning organization
    #[validate(length(min = 1, max = 64))]
    pub org_id: String,

    /// Optional campaign grouping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    /// Asset kind (defaults to video)
    #[serde(default)]
    pub kind: MediaKind,

    /// Vendor integration
    pub provider: ProviderId,

    /// Vendor model name; resolved against the registry's aliases when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Free-text generation prompt
    #[validate(length(min = 1, max = 10_000))]
    pub prompt: String,

    /// Target aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Clip duration in seconds (video only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,

    /// Audio configuration (video only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_request_validation() {
        let req = GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: None,
            kind: MediaKind::Video,
            provider: ProviderId::Veo,
            model: None,
            prompt: "cinematic shot of a coffee pour".into(),
            aspect_ratio: AspectRatio::LANDSCAPE,
            duration_secs: Some(6),
            audio: None,
        };
        assert!(req.validate().is_ok());

        let empty_prompt = GenerationRequest {
            prompt: String::new(),
            ..req
        };
        assert!(empty_prompt.validate().is_err());
    }

    #[test]
    fn test_request_deserialization_defaults() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{"org_id":"org-1","provider":"kling","prompt":"neon city flyover"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, MediaKind::Video);
        assert_eq!(req.aspect_ratio, AspectRatio::LANDSCAPE);
        assert!(req.duration_secs.is_none());
    }
}
