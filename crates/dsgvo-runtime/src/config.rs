//! Runtime configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional YAML/JSON file,
//! then environment variables. Command-line flags are applied by the binary
//! on top of the loaded value.
//!
//! ```yaml
//! model: gpt-4o
//! base_url: https://llm-proxy.internal/v1
//! max_tokens: 2000
//! temperature: 0.3
//! timeout: 90s
//! max_content_length: 8000
//! language: de
//! concurrency: 2
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use dsgvo_core::{Language, PromptConfig};

use crate::providers::{ApiCredential, CompletionConfig, CredentialSource};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("API key missing: set OPENAI_API_KEY or api_key in the config file")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one checker instance.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Key for the model endpoint
    pub api_key: Option<ApiCredential>,

    /// Proxy or self-hosted endpoint; `None` means the public API
    pub base_url: Option<String>,

    /// Model name
    pub model: String,

    /// Maximum tokens to generate per document
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout
    pub timeout: Duration,

    /// Maximum document characters embedded in a prompt
    pub max_content_length: usize,

    /// Default report language
    pub language: Language,

    /// Documents analyzed at once
    pub concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        let completion = CompletionConfig::default();
        Self {
            api_key: None,
            base_url: None,
            model: completion.model,
            max_tokens: completion.max_tokens,
            temperature: completion.temperature,
            timeout: completion.timeout,
            max_content_length: PromptConfig::default().max_content_length,
            language: Language::default(),
            concurrency: 1,
        }
    }
}

/// On-disk shape; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<String>,
    max_content_length: Option<usize>,
    language: Option<Language>,
    concurrency: Option<usize>,
}

impl CheckerConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with a YAML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let file: ConfigFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
            _ => serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        };

        let mut config = Self::default();
        config.apply_file(file)?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(key) = file.api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(ApiCredential::new(key, CredentialSource::Config));
        }
        if let Some(base_url) = file.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(timeout) = file.timeout {
            self.timeout = parse_duration("timeout", &timeout)?;
        }
        if let Some(max_content_length) = file.max_content_length {
            self.max_content_length = max_content_length;
        }
        if let Some(language) = file.language {
            self.language = language;
        }
        if let Some(concurrency) = file.concurrency {
            self.concurrency = concurrency;
        }
        Ok(())
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Unset and blank variables are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(credential) = ApiCredential::from_lookup(API_KEY_ENV, &lookup) {
            self.api_key = Some(credential);
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.base_url = Some(base_url.trim().to_string());
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.model = model.trim().to_string();
        }
        if let Some(value) = var("MAX_TOKENS") {
            self.max_tokens = parse_number("MAX_TOKENS", &value)?;
        }
        if let Some(value) = var("TEMPERATURE") {
            self.temperature = parse_number("TEMPERATURE", &value)?;
        }
        if let Some(value) = var("MAX_CONTENT_LENGTH") {
            self.max_content_length = parse_number("MAX_CONTENT_LENGTH", &value)?;
        }
        if let Some(value) = var("REQUEST_TIMEOUT") {
            self.timeout = parse_duration("REQUEST_TIMEOUT", &value)?;
        }
        if let Some(value) = var("CHECK_LANGUAGE") {
            self.language = Language::from_code(&value);
        }
        Ok(())
    }

    /// Check ranges and required values before any request is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.api_key {
            Some(key) if !key.is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        self.validate_settings()
    }

    /// Everything [`validate`](Self::validate) checks except the API key.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".to_string()));
        }
        if self.max_content_length == 0 {
            return Err(ConfigError::Invalid(
                "max_content_length must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Prompt settings derived from this config.
    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig {
            max_content_length: self.max_content_length,
        }
    }

    /// Request settings derived from this config.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Accepts humantime strings (`90s`, `2m`) and bare seconds.
fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn with_key() -> CheckerConfig {
        CheckerConfig {
            api_key: Some(ApiCredential::new("sk-test", CredentialSource::Programmatic)),
            ..CheckerConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_content_length, 8000);
        assert_eq!(config.language, Language::De);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "model: gpt-4o\ntimeout: 90s\nlanguage: en\nconcurrency: 3\nbase_url: http://localhost:4000/v1"
        )
        .unwrap();

        let config = CheckerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.language, Language::En);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:4000/v1"));
        // Untouched fields keep defaults
        assert_eq!(config.max_tokens, 2000);
    }

    #[test]
    fn test_json_file_with_api_key() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"api_key": "sk-file", "max_tokens": 500}}"#).unwrap();

        let config = CheckerConfig::from_file(file.path()).unwrap();
        let key = config.api_key.unwrap();
        assert_eq!(key.expose(), "sk-file");
        assert_eq!(key.source(), CredentialSource::Config);
        assert_eq!(config.max_tokens, 500);
    }

    #[test]
    fn test_unknown_file_field_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "modle: gpt-4").unwrap();

        let result = CheckerConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = CheckerConfig::from_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = CheckerConfig {
            model: "from-file".to_string(),
            ..CheckerConfig::default()
        };
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("OPENAI_MODEL", "gpt-4o-mini"),
                ("MAX_TOKENS", "1500"),
                ("TEMPERATURE", "0.0"),
                ("MAX_CONTENT_LENGTH", "4000"),
                ("REQUEST_TIMEOUT", "30"),
                ("CHECK_LANGUAGE", "EN"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_ref().unwrap().expose(), "sk-env");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_content_length, 4000);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.language, Language::En);
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = CheckerConfig::default();
        config
            .apply_env(env(&[("OPENAI_MODEL", "  "), ("OPENAI_API_KEY", "")]))
            .unwrap();
        assert_eq!(config.model, "gpt-4");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_bad_env_number() {
        let mut config = CheckerConfig::default();
        let result = config.apply_env(env(&[("MAX_TOKENS", "lots")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "MAX_TOKENS", .. })
        ));
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(parse_duration("t", "45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("t", "2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("t", "soon").is_err());
    }

    #[test]
    fn test_validate_requires_api_key() {
        assert!(matches!(
            CheckerConfig::default().validate(),
            Err(ConfigError::MissingApiKey)
        ));
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let config = CheckerConfig {
            temperature: 2.5,
            ..with_key()
        };
        assert!(config.validate().is_err());

        let config = CheckerConfig {
            concurrency: 0,
            ..with_key()
        };
        assert!(config.validate().is_err());

        let config = CheckerConfig {
            max_content_length: 0,
            ..with_key()
        };
        assert!(config.validate().is_err());

        let config = CheckerConfig {
            base_url: Some("localhost:8080".to_string()),
            ..with_key()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_configs() {
        let config = CheckerConfig {
            model: "gpt-4o".to_string(),
            max_content_length: 1234,
            ..CheckerConfig::default()
        };
        assert_eq!(config.prompt_config().max_content_length, 1234);
        assert_eq!(config.completion_config().model, "gpt-4o");
    }
}
