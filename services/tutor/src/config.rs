use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for the answer judge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JudgeProvider {
    /// Any OpenAI-compatible chat-completions endpoint.
    OpenAi,
    /// A local judge that accepts every answer; useful offline.
    Lenient,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub provider: JudgeProvider,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub chat_model: String,
    pub judge_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://growtalk.db?mode=rwc".to_string());

        let provider_str = std::env::var("JUDGE_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "lenient" => JudgeProvider::Lenient,
            _ => JudgeProvider::OpenAi,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1/".to_string());

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let judge_timeout_str =
            std::env::var("JUDGE_TIMEOUT_SECS").unwrap_or_else(|_| "20".to_string());
        let judge_timeout_secs = judge_timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "JUDGE_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", judge_timeout_str),
            )
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        if provider == JudgeProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set for the 'openai' judge provider".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            provider,
            openai_api_key,
            openai_api_base,
            chat_model,
            judge_timeout: Duration::from_secs(judge_timeout_secs),
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("JUDGE_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("OPENAI_API_BASE");
            env::remove_var("CHAT_MODEL");
            env::remove_var("JUDGE_TIMEOUT_SECS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_openai() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.database_url, "sqlite://growtalk.db?mode=rwc");
        assert_eq!(config.provider, JudgeProvider::OpenAi);
        assert_eq!(config.openai_api_key, Some("test-key".to_string()));
        assert_eq!(config.openai_api_base, "https://api.openai.com/v1/");
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.judge_timeout, Duration::from_secs(20));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_lenient_provider_needs_no_key() {
        clear_env_vars();
        unsafe {
            env::set_var("JUDGE_PROVIDER", "lenient");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.provider, JudgeProvider::Lenient);
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("DATABASE_URL", "sqlite::memory:");
            env::set_var("JUDGE_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "custom-key");
            env::set_var("OPENAI_API_BASE", "https://openrouter.ai/api/v1");
            env::set_var("CHAT_MODEL", "google/gemma-3-27b-it");
            env::set_var("JUDGE_TIMEOUT_SECS", "5");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.openai_api_base, "https://openrouter.ai/api/v1");
        assert_eq!(config.chat_model, "google/gemma-3-27b-it");
        assert_eq!(config.judge_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        unsafe {
            env::set_var("JUDGE_PROVIDER", "openai");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeout() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-key");
            env::set_var("JUDGE_TIMEOUT_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "JUDGE_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for JUDGE_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-key");
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
