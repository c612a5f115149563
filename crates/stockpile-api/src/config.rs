use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    /// Raw token spec, `token=actor:role` entries separated by commas
    pub api_tokens: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("api_tokens", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "STOCKPILE_API_BIND_ADDR", "127.0.0.1:8080");
        let db_path = value_or_default(&lookup, "STOCKPILE_DB_PATH", "stockpile.db");

        let api_tokens = required_trimmed(&lookup, "STOCKPILE_API_TOKENS")?;
        if !api_tokens.contains('=') {
            return Err(ConfigError::Invalid(
                "STOCKPILE_API_TOKENS must contain `token=actor:role` entries".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            db_path,
            api_tokens,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn config_requires_token_spec() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("STOCKPILE_API_TOKENS"));
    }

    #[test]
    fn config_rejects_malformed_token_spec() {
        let mut map = HashMap::new();
        map.insert("STOCKPILE_API_TOKENS", "not-a-spec");
        let err = AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("token=actor:role"));
    }

    #[test]
    fn config_redacts_tokens_in_debug() {
        let mut map = HashMap::new();
        map.insert("STOCKPILE_API_TOKENS", "secret-token=alice:owner");

        let config =
            AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string())).unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn config_applies_defaults() {
        let mut map = HashMap::new();
        map.insert("STOCKPILE_API_TOKENS", "t=alice:owner");

        let config =
            AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string())).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.db_path, "stockpile.db");
    }
}
