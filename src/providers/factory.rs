//! Provider selection and memoization.

use std::sync::OnceLock;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::base::Provider;
use super::mock::MockProvider;
use super::openai_compat::{OpenAICompatProvider, VendorProfile, BLACKBOX, OPENAI};
use crate::config::{Config, MockFallback, ProviderEntry};
use crate::error::GatewayError;

/// Vendor used when nothing is configured.
pub const DEFAULT_PROFILE: VendorProfile = OPENAI;

const PROFILES: [VendorProfile; 2] = [OPENAI, BLACKBOX];

/// Snapshot of what [`ProviderFactory::get`] resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Selected vendor name, even when the mock stands in for it.
    pub provider: String,
    pub has_api_key: bool,
    pub supports_tools: bool,
    pub using_mock: bool,
}

/// Builds the configured provider once and hands out shared handles.
///
/// Callers that need a different configuration construct a new factory or
/// call [`ProviderFactory::reset`].
pub struct ProviderFactory {
    config: Config,
    client: Client,
    instance: OnceLock<Provider>,
}

impl ProviderFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
            instance: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the memoized provider, building it on first use.
    ///
    /// Build errors are not cached; a later call tries again.
    pub fn get(&self) -> Result<Provider, GatewayError> {
        if let Some(provider) = self.instance.get() {
            return Ok(provider.clone());
        }
        let built = self.build()?;
        // A concurrent first caller may have stored its instance already.
        Ok(self.instance.get_or_init(|| built).clone())
    }

    /// Drop the memoized provider so the next `get` rebuilds it.
    pub fn reset(&mut self) {
        self.instance.take();
    }

    /// Describe the selection without issuing any request.
    pub fn provider_info(&self) -> Result<ProviderInfo, GatewayError> {
        let profile = self.select()?;
        let has_api_key = self.entry(&profile).has_api_key();
        let provider = self.get()?;
        Ok(ProviderInfo {
            provider: profile.name.to_string(),
            has_api_key,
            supports_tools: provider.supports_tools(),
            using_mock: provider.name() == MockProvider::NAME,
        })
    }

    /// Explicit name first, then whichever credential is present, then the default.
    fn select(&self) -> Result<VendorProfile, GatewayError> {
        let explicit = self
            .config
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        if let Some(name) = explicit {
            let wanted = name.to_ascii_lowercase();
            return PROFILES
                .iter()
                .find(|p| p.name == wanted)
                .copied()
                .ok_or_else(|| {
                    GatewayError::Configuration(format!(
                        "unknown LLM provider '{}' (expected one of: {})",
                        name,
                        PROFILES.map(|p| p.name).join(", ")
                    ))
                });
        }

        Ok(PROFILES
            .iter()
            .find(|p| self.entry(p).has_api_key())
            .copied()
            .unwrap_or(DEFAULT_PROFILE))
    }

    fn entry(&self, profile: &VendorProfile) -> &ProviderEntry {
        match profile.name {
            "blackbox" => &self.config.providers.blackbox,
            _ => &self.config.providers.openai,
        }
    }

    fn mock_allowed(&self, profile: &VendorProfile) -> bool {
        match self.config.mock_fallback {
            MockFallback::Never => false,
            MockFallback::DefaultOnly => *profile == DEFAULT_PROFILE,
            MockFallback::Always => true,
        }
    }

    fn build(&self) -> Result<Provider, GatewayError> {
        let profile = self.select()?;
        let entry = self.entry(&profile);

        if !entry.has_api_key() {
            if self.mock_allowed(&profile) {
                warn!(
                    provider = profile.name,
                    "{} not set, using mock provider", profile.key_var
                );
                return Ok(Provider::tool_capable(MockProvider::new()));
            }
            return Err(GatewayError::Configuration(format!(
                "{} is required for the {} provider",
                profile.key_var, profile.name
            )));
        }

        let mut provider = OpenAICompatProvider::new(
            &profile,
            &entry.api_key,
            entry.api_base.as_deref(),
            entry.model.as_deref(),
        )?
        .with_client(self.client.clone());

        if let Some((name, value)) = entry.extra_header() {
            provider = provider.with_extra_header(name, value)?;
        }

        info!(
            provider = profile.name,
            base_url = %provider.api_base(),
            "Using LLM provider"
        );
        Ok(Provider::tool_capable(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(provider: Option<&str>, openai_key: &str, blackbox_key: &str) -> Config {
        let mut config = Config::default();
        config.provider = provider.map(String::from);
        config.providers.openai.api_key = openai_key.into();
        config.providers.blackbox.api_key = blackbox_key.into();
        config
    }

    #[test]
    fn test_explicit_name_wins() {
        let factory = ProviderFactory::new(config_with(Some("BlackBox"), "sk-openai", "bb-key"));
        assert_eq!(factory.get().unwrap().name(), "blackbox");
    }

    #[test]
    fn test_auto_detect_prefers_openai() {
        let factory = ProviderFactory::new(config_with(None, "sk-openai", "bb-key"));
        assert_eq!(factory.get().unwrap().name(), "openai");

        let factory = ProviderFactory::new(config_with(None, "", "bb-key"));
        assert_eq!(factory.get().unwrap().name(), "blackbox");
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let factory = ProviderFactory::new(config_with(Some("anthropic"), "sk-openai", ""));
        let err = factory.get().unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_default_vendor_degrades_to_mock() {
        let factory = ProviderFactory::new(Config::default());
        let provider = factory.get().unwrap();
        assert_eq!(provider.name(), MockProvider::NAME);
        assert!(provider.supports_tools());

        let factory = ProviderFactory::new(config_with(Some("openai"), "", ""));
        assert_eq!(factory.get().unwrap().name(), MockProvider::NAME);
    }

    #[test]
    fn test_blackbox_without_key_names_the_credential() {
        let factory = ProviderFactory::new(config_with(Some("blackbox"), "sk-openai", ""));
        let err = factory.get().unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(err.to_string().contains("BLACKBOX_API_KEY"));
    }

    #[test]
    fn test_mock_policy() {
        let mut config = config_with(Some("blackbox"), "", "");
        config.mock_fallback = MockFallback::Always;
        let factory = ProviderFactory::new(config);
        assert_eq!(factory.get().unwrap().name(), MockProvider::NAME);

        let mut config = Config::default();
        config.mock_fallback = MockFallback::Never;
        let factory = ProviderFactory::new(config);
        let err = factory.get().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_get_is_memoized() {
        let factory = ProviderFactory::new(config_with(None, "sk-openai", ""));
        let first = factory.get().unwrap();
        let second = factory.get().unwrap();
        assert!(Provider::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reset_rebuilds() {
        let mut factory = ProviderFactory::new(config_with(None, "sk-openai", ""));
        let first = factory.get().unwrap();
        factory.reset();
        let second = factory.get().unwrap();
        assert!(!Provider::ptr_eq(&first, &second));
        assert_eq!(second.name(), "openai");
    }

    #[test]
    fn test_bad_extra_header_is_configuration_error() {
        let mut config = config_with(Some("blackbox"), "", "bb-key");
        config.providers.blackbox.extra_header_name = Some("bad header".into());
        config.providers.blackbox.extra_header_value = Some("x".into());
        let factory = ProviderFactory::new(config);
        assert!(matches!(
            factory.get().unwrap_err(),
            GatewayError::Configuration(_)
        ));
    }

    #[test]
    fn test_bad_base_url_is_configuration_error() {
        let mut config = config_with(None, "sk-openai", "");
        config.providers.openai.api_base = Some("not a url".into());
        let factory = ProviderFactory::new(config);
        assert!(matches!(
            factory.get().unwrap_err(),
            GatewayError::Configuration(_)
        ));
    }

    #[test]
    fn test_provider_info() {
        let info = ProviderFactory::new(Config::default())
            .provider_info()
            .unwrap();
        assert_eq!(
            info,
            ProviderInfo {
                provider: "openai".into(),
                has_api_key: false,
                supports_tools: true,
                using_mock: true,
            }
        );

        let info = ProviderFactory::new(config_with(None, "", "bb-key"))
            .provider_info()
            .unwrap();
        assert_eq!(info.provider, "blackbox");
        assert!(info.has_api_key);
        assert!(!info.using_mock);
    }
}
