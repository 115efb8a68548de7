use crate::error::{Result, SubtransError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(format!("Unknown provider: {}. Use 'openai' or 'gemini'", s)),
        }
    }
}

/// Persisted settings, read from the config file and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub provider: Provider,
    /// Model override; each provider has its own default.
    pub model: Option<String>,
    pub batch_size: usize,
    pub target_language: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub rate_limit_backoff_ms: u64,
    pub error_backoff_ms: u64,
    pub context_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            provider: Provider::default(),
            model: None,
            batch_size: 20,
            target_language: "Japanese".to_string(),
            request_timeout_secs: 120,
            max_attempts: 3,
            rate_limit_backoff_ms: 5000,
            error_backoff_ms: 1000,
            context_window: 200,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SubtransError::Config(format!("Invalid config file: {}", e)))
    }

    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(provider) = var("SUBTRANS_PROVIDER").and_then(|p| p.parse().ok()) {
            self.provider = provider;
        }
        if let Some(model) = var("SUBTRANS_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = Some(model);
        }
        if let Some(size) = var("SUBTRANS_BATCH_SIZE").and_then(|s| s.parse().ok()) {
            self.batch_size = size;
        }
        if let Some(lang) = var("SUBTRANS_TARGET_LANGUAGE").filter(|l| !l.trim().is_empty()) {
            self.target_language = lang;
        }
    }

    pub fn validate(&self, provider: Provider) -> Result<()> {
        match provider {
            Provider::OpenAi => {
                if self.openai_api_key.is_none() {
                    return Err(SubtransError::Config(
                        "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                            .to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if self.gemini_api_key.is_none() {
                    return Err(SubtransError::Config(
                        "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                            .to_string(),
                    ));
                }
            }
        }

        if self.batch_size == 0 {
            return Err(SubtransError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SubtransError::Config(
                "Max attempts must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SubtransError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subtrans").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("GEMINI".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("whisper".parse::<Provider>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.target_language, "Japanese");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.rate_limit_backoff_ms, 5000);
        assert_eq!(config.context_window, 200);
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(config.validate(Provider::OpenAi).is_err());
        assert!(config.validate(Provider::Gemini).is_err());
    }

    #[test]
    fn test_validate_with_api_key() {
        let mut config = Config::default();
        config.openai_api_key = Some("sk-test".to_string());
        assert!(config.validate(Provider::OpenAi).is_ok());

        config.gemini_api_key = Some("test-key".to_string());
        assert!(config.validate(Provider::Gemini).is_ok());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = Config::default();
        config.openai_api_key = Some("sk-test".to_string());
        config.batch_size = 0;
        assert!(config.validate(Provider::OpenAi).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("provider = \"gemini\"\nbatch_size = 35\n").unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.batch_size, 35);
        assert_eq!(config.target_language, "Japanese");
        assert_eq!(config.error_backoff_ms, 1000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("batch_size = \"many\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("SUBTRANS_PROVIDER", "gemini"),
            ("SUBTRANS_BATCH_SIZE", "10"),
            ("SUBTRANS_TARGET_LANGUAGE", "Korean"),
            ("SUBTRANS_MODEL", "gemini-1.5-pro"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.target_language, "Korean");
        assert_eq!(config.model.as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "SUBTRANS_BATCH_SIZE" => Some("lots".to_string()),
            "SUBTRANS_PROVIDER" => Some("whisper".to_string()),
            _ => None,
        });
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.provider, Provider::OpenAi);
    }
}
