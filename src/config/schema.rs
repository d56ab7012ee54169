//! Configuration schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the provider factory does when the selected vendor has no credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockFallback {
    /// Always fail with a configuration error.
    Never,
    /// Only the default vendor (OpenAI) degrades to the mock provider.
    #[default]
    DefaultOnly,
    /// Any vendor degrades to the mock provider.
    Always,
}

impl FromStr for MockFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "never" | "false" | "0" => Ok(MockFallback::Never),
            "default_only" | "default" => Ok(MockFallback::DefaultOnly),
            "always" | "true" | "1" => Ok(MockFallback::Always),
            other => Err(format!("unknown mock fallback policy '{}'", other)),
        }
    }
}

impl fmt::Display for MockFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MockFallback::Never => "never",
            MockFallback::DefaultOnly => "default_only",
            MockFallback::Always => "always",
        })
    }
}

/// Credentials and endpoint settings for one vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderEntry {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_header_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_header_value: Option<String>,
}

impl ProviderEntry {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The static extra header, only when both name and value are set.
    pub fn extra_header(&self) -> Option<(&str, &str)> {
        match (
            self.extra_header_name.as_deref(),
            self.extra_header_value.as_deref(),
        ) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                Some((name, value))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderEntry,
    pub blackbox: ProviderEntry,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Explicit provider name; auto-detected from credentials when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub mock_fallback: MockFallback,
    pub providers: ProvidersConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_json() {
        let json = r#"{
            "provider": "blackbox",
            "mockFallback": "never",
            "providers": {
                "blackbox": {
                    "apiKey": "bb-key",
                    "apiBase": "https://api.blackbox.ai",
                    "extraHeaderName": "X-Client",
                    "extraHeaderValue": "docscout"
                }
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider.as_deref(), Some("blackbox"));
        assert_eq!(config.mock_fallback, MockFallback::Never);
        assert!(config.providers.blackbox.has_api_key());
        assert!(!config.providers.openai.has_api_key());
        assert_eq!(
            config.providers.blackbox.extra_header(),
            Some(("X-Client", "docscout"))
        );
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.mock_fallback, MockFallback::DefaultOnly);
    }

    #[test]
    fn test_extra_header_needs_both_parts() {
        let entry = ProviderEntry {
            extra_header_name: Some("X-Client".into()),
            ..Default::default()
        };
        assert!(entry.extra_header().is_none());
    }

    #[test]
    fn test_mock_fallback_from_str() {
        assert_eq!("always".parse::<MockFallback>().unwrap(), MockFallback::Always);
        assert_eq!("Default-Only".parse::<MockFallback>().unwrap(), MockFallback::DefaultOnly);
        assert_eq!("0".parse::<MockFallback>().unwrap(), MockFallback::Never);
        assert!("sometimes".parse::<MockFallback>().is_err());
    }
}
