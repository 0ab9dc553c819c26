//! Generation provider identifiers.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for a generative-AI vendor integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// OpenAI Sora (video)
    Sora,
    /// Google Veo (video)
    Veo,
    /// Runway (video)
    Runway,
    /// Kling (video)
    Kling,
    /// Google Gemini (image)
    Gemini,
    /// Deterministic in-process provider for tests and dev
    Fake,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Sora => "sora",
            ProviderId::Veo => "veo",
            ProviderId::Runway => "runway",
            ProviderId::Kling => "kling",
            ProviderId::Gemini => "gemini",
            ProviderId::Fake => "fake",
        }
    }

    /// All vendor-backed providers (excludes the fake provider).
    pub fn vendors() -> &'static [ProviderId] {
        &[
            ProviderId::Sora,
            ProviderId::Veo,
            ProviderId::Runway,
            ProviderId::Kling,
            ProviderId::Gemini,
        ]
    }

    /// Environment variable holding the process-wide API key fallback.
    pub fn env_key_var(&self) -> &'static str {
        match self {
            ProviderId::Sora => "SORA_API_KEY",
            ProviderId::Veo => "VEO_API_KEY",
            ProviderId::Runway => "RUNWAY_API_KEY",
            ProviderId::Kling => "KLING_API_KEY",
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::Fake => "FAKE_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ProviderIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sora" => Ok(ProviderId::Sora),
            "veo" => Ok(ProviderId::Veo),
            "runway" => Ok(ProviderId::Runway),
            "kling" => Ok(ProviderId::Kling),
            "gemini" => Ok(ProviderId::Gemini),
            "fake" => Ok(ProviderId::Fake),
            _ => Err(ProviderIdParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown provider: {0}")]
pub struct ProviderIdParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("sora".parse::<ProviderId>().unwrap(), ProviderId::Sora);
        assert_eq!("RUNWAY".parse::<ProviderId>().unwrap(), ProviderId::Runway);
        assert!("dalle".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_roundtrip() {
        for p in ProviderId::vendors() {
            assert_eq!(p.as_str().parse::<ProviderId>().unwrap(), *p);
        }
    }
}
