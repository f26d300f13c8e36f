//! Resolver configuration surface.
//!
//! Every option has a default, so an empty file (or no file) is a valid
//! configuration. Keys use `snake_case`; the camelCase spellings used by chat
//! framework plugin schemas (`apiEndpoint`, `useLocalParsing`, ...) are
//! accepted as aliases.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::reply::ReplyOptions;
use crate::resolver::{ClassifierRules, DEFAULT_QUOTA_KEYWORDS, DEFAULT_THROTTLE_NAME_KEYWORDS};
use crate::user_agent::DEFAULT_USER_AGENT;

/// Default public lookup endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://whatslink.info/api/v1/link";

/// Default lookup and screenshot timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default minimum interval between remote lookups in milliseconds.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 3_000;

const MAX_TIMEOUT_MS: u64 = 120_000;
const MAX_MIN_INTERVAL_MS: u64 = 600_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration text is not valid TOML or has wrongly typed values
    #[error("invalid configuration syntax: {reason}")]
    Parse {
        /// Parser message
        reason: String,
    },

    /// A value is outside its accepted range
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending option
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Options recognized by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Lookup service endpoint.
    #[serde(alias = "apiEndpoint")]
    pub api_endpoint: String,
    /// Timeout for the lookup and each screenshot fetch, in milliseconds.
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,
    /// User-Agent header; blank means the built-in browser-like default.
    #[serde(alias = "customUserAgent")]
    pub custom_user_agent: String,
    /// Bundle replies as forwarded messages on platforms that support it.
    #[serde(alias = "useForward")]
    pub use_forward: bool,
    /// Fetch and attach screenshots.
    #[serde(alias = "showScreenshot")]
    pub show_screenshot: bool,
    /// Log link text, raw responses and decode state at every stage.
    #[serde(alias = "debugMode")]
    pub debug_mode: bool,
    /// Send text and each screenshot as separate messages.
    #[serde(alias = "sendSeparately")]
    pub send_separately: bool,
    /// Fall back to decoding the link locally on quota or transport errors.
    #[serde(alias = "useLocalParsing")]
    pub use_local_parsing: bool,
    /// Minimum interval between remote lookups; 0 disables throttling.
    #[serde(alias = "minIntervalMs")]
    pub min_interval_ms: u64,
    /// Error-message substrings that mark a quota refusal.
    #[serde(alias = "quotaKeywords")]
    pub quota_keywords: Vec<String>,
    /// Name substrings that mark a throttle notice disguised as a result.
    #[serde(alias = "throttleNameKeywords")]
    pub throttle_name_keywords: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            custom_user_agent: DEFAULT_USER_AGENT.to_string(),
            use_forward: false,
            show_screenshot: true,
            debug_mode: false,
            send_separately: false,
            use_local_parsing: true,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            quota_keywords: DEFAULT_QUOTA_KEYWORDS.map(String::from).to_vec(),
            throttle_name_keywords: DEFAULT_THROTTLE_NAME_KEYWORDS.map(String::from).to_vec(),
        }
    }
}

impl ResolverConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for syntax errors, unknown keys, or values out of range.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|error| ConfigError::Parse {
            reason: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values against accepted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = Url::parse(&self.api_endpoint)
            .map_err(|error| ConfigError::invalid("api_endpoint", error.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "api_endpoint",
                format!("scheme '{}' is not supported, use http or https", endpoint.scheme()),
            ));
        }

        if !(1..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::invalid(
                "timeout_ms",
                format!("{} is outside 1..={MAX_TIMEOUT_MS}", self.timeout_ms),
            ));
        }

        if self.min_interval_ms > MAX_MIN_INTERVAL_MS {
            return Err(ConfigError::invalid(
                "min_interval_ms",
                format!("{} is outside 0..={MAX_MIN_INTERVAL_MS}", self.min_interval_ms),
            ));
        }

        if self.quota_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::invalid("quota_keywords", "entries must not be blank"));
        }
        if self.throttle_name_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "throttle_name_keywords",
                "entries must not be blank",
            ));
        }

        Ok(())
    }

    /// Lookup and screenshot timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum interval between remote lookups.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// User-Agent actually sent.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        crate::user_agent::effective_user_agent(&self.custom_user_agent)
    }

    /// Delivery toggles for the reply formatter.
    #[must_use]
    pub fn reply_options(&self) -> ReplyOptions {
        ReplyOptions {
            show_screenshot: self.show_screenshot,
            send_separately: self.send_separately,
            use_forward: self.use_forward,
        }
    }

    /// Keyword rules for the response classifier.
    #[must_use]
    pub fn classifier_rules(&self) -> ClassifierRules {
        ClassifierRules {
            quota_keywords: self.quota_keywords.clone(),
            throttle_name_keywords: self.throttle_name_keywords.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.min_interval(), Duration::from_secs(3));
        assert!(!config.use_forward);
        assert!(config.show_screenshot);
        assert!(!config.debug_mode);
        assert!(!config.send_separately);
        assert!(config.use_local_parsing);
        assert!(config.user_agent().starts_with("Mozilla/5.0"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            ResolverConfig::from_toml_str("").unwrap(),
            ResolverConfig::default()
        );
    }

    #[test]
    fn test_snake_case_keys() {
        let config = ResolverConfig::from_toml_str(
            r#"
api_endpoint = "http://127.0.0.1:9000/lookup"
timeout_ms = 2500
send_separately = true
use_local_parsing = false
quota_keywords = ["busy"]
"#,
        )
        .unwrap();
        assert_eq!(config.api_endpoint, "http://127.0.0.1:9000/lookup");
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.send_separately);
        assert!(!config.use_local_parsing);
        assert_eq!(config.classifier_rules().quota_keywords, vec!["busy".to_string()]);
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = ResolverConfig::from_toml_str(
            r#"
apiEndpoint = "https://lookup.example/api"
timeout = 5000
customUserAgent = "bot/2"
useForward = true
showScreenshot = false
debugMode = true
sendSeparately = false
useLocalParsing = true
minIntervalMs = 0
"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.user_agent(), "bot/2");
        assert!(config.use_forward);
        assert!(!config.show_screenshot);
        assert!(config.debug_mode);
        assert_eq!(config.min_interval_ms, 0);
        let options = config.reply_options();
        assert!(options.use_forward && !options.show_screenshot && !options.send_separately);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ResolverConfig::from_toml_str("use_fowrard = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = ResolverConfig::from_toml_str("timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_endpoint_scheme() {
        let err = ResolverConfig::from_toml_str("api_endpoint = \"ftp://x/y\"").unwrap_err();
        assert!(err.to_string().contains("api_endpoint"));
    }

    #[test]
    fn test_validate_timeout_range() {
        assert!(ResolverConfig::from_toml_str("timeout_ms = 0").is_err());
        assert!(ResolverConfig::from_toml_str("timeout_ms = 120001").is_err());
        assert!(ResolverConfig::from_toml_str("timeout_ms = 120000").is_ok());
    }

    #[test]
    fn test_validate_min_interval_range() {
        let err = ResolverConfig::from_toml_str("min_interval_ms = 600001").unwrap_err();
        assert!(err.to_string().contains("min_interval_ms"));
    }

    #[test]
    fn test_validate_blank_keywords() {
        assert!(ResolverConfig::from_toml_str("quota_keywords = [\" \"]").is_err());
        assert!(ResolverConfig::from_toml_str("throttle_name_keywords = [\"\"]").is_err());
    }

    #[test]
    fn test_blank_user_agent_uses_default() {
        let config = ResolverConfig::from_toml_str("custom_user_agent = \"\"").unwrap();
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
    }
}
