//! GoalPilot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::{ModelTier, RetryPolicy};

/// Main GoalPilot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion endpoint configuration
    pub llm: LlmConfig,

    /// Retry/backoff policy for the request executor
    pub retry: RetryPolicy,

    /// Conversation orchestrator settings
    pub conversation: ConversationConfig,

    /// Research pipeline settings
    pub research: ResearchConfig,

    /// Background work queue settings
    pub queue: QueueConfig,

    /// Default log level (overridden by an explicit level at setup)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set so the first
    /// completion does not fail late with an auth error.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .goalpilot.yml
        let local_config = PathBuf::from(".goalpilot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/goalpilot/goalpilot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("goalpilot").join("goalpilot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (the chat-completions path is appended)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Model identifiers per tier
    pub models: ModelsConfig,

    /// Connect timeout in milliseconds
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Hard per-attempt timeout in milliseconds (connect + response)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Upper bound applied to any request's max_tokens
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            models: ModelsConfig::default(),
            connect_timeout_ms: 10_000,
            timeout_ms: 60_000,
            max_tokens: 8192,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }

    /// Full chat-completions endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Model identifier for a tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.models.fast,
            ModelTier::Standard => &self.models.standard,
            ModelTier::Search => &self.models.search,
        }
    }
}

/// Model identifiers per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Small model for classification
    pub fast: String,

    /// General model for planning, help and reports
    pub standard: String,

    /// Tool-enabled model with built-in web search
    pub search: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: "llama-3.1-8b-instant".to_string(),
            standard: "llama-3.3-70b-versatile".to_string(),
            search: "groq/compound".to_string(),
        }
    }
}

/// Conversation orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Fewest clarifying questions accepted from the model
    #[serde(rename = "min-questions")]
    pub min_questions: usize,

    /// Most clarifying questions shown to the user
    #[serde(rename = "max-questions")]
    pub max_questions: usize,

    /// Transcript messages forwarded to task-help completions
    #[serde(rename = "history-window")]
    pub history_window: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            min_questions: 2,
            max_questions: 5,
            history_window: 10,
        }
    }
}

/// Research pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Save each finding to the knowledge store
    #[serde(rename = "auto-save")]
    pub auto_save: bool,

    /// Max tokens for the synthesis completion
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            max_tokens: 2048,
        }
    }
}

/// Background work queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Age after which an in-progress item is considered interrupted
    #[serde(rename = "stale-after-secs")]
    pub stale_after_secs: u64,

    /// Enqueue a fresh copy of each interrupted item during recovery
    #[serde(rename = "requeue-interrupted")]
    pub requeue_interrupted: bool,

    /// Broadcast channel capacity for queue events
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 600,
            requeue_interrupted: true,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::BackoffCurve;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.conversation.min_questions, 2);
        assert_eq!(config.conversation.max_questions, 5);
        assert!(config.research.auto_save);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_endpoint_and_models() {
        let config = LlmConfig {
            base_url: "https://api.example.com/openai/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "https://api.example.com/openai/v1/chat/completions");
        assert_eq!(config.model_for(ModelTier::Fast), "llama-3.1-8b-instant");
        assert_eq!(config.model_for(ModelTier::Search), "groq/compound");
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  base-url: https://api.example.com
  api-key-env: MY_API_KEY
  models:
    fast: tiny
    standard: big
    search: searchy
  timeout-ms: 30000

retry:
  max-retries: 2
  server-backoff:
    curve: exponential
    base-ms: 500
  transport-backoff:
    curve: none

conversation:
  max-questions: 4

queue:
  stale-after-secs: 60
  requeue-interrupted: false

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.models.search, "searchy");
        assert_eq!(config.llm.timeout_ms, 30000);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.server_backoff, BackoffCurve::Exponential { base_ms: 500 });
        assert_eq!(config.retry.transport_backoff, BackoffCurve::None);
        assert_eq!(config.conversation.max_questions, 4);
        assert_eq!(config.conversation.min_questions, 2);
        assert_eq!(config.queue.stale_after_secs, 60);
        assert!(!config.queue.requeue_interrupted);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  models:
    standard: custom-model
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.models.standard, "custom-model");
        assert_eq!(config.llm.models.fast, "llama-3.1-8b-instant");
        assert_eq!(config.llm.base_url, "https://api.groq.com/openai");
        assert_eq!(config.retry.server_backoff, BackoffCurve::Linear { step_ms: 2000 });
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("goalpilot.yml");
        fs::write(&path, "research:\n  auto-save: false\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.research.auto_save);
    }

    #[test]
    fn test_load_explicit_path_errors_when_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.yml");
        fs::write(&path, "llm: [not, a, map").unwrap();

        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load(Some(&dir.path().join("missing.yml"))).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_validate_checks_api_key_env() {
        let config = Config {
            llm: LlmConfig {
                api_key_env: "GOALPILOT_TEST_KEY".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        // SAFETY: serialized test, no other thread reads this variable
        unsafe { std::env::remove_var("GOALPILOT_TEST_KEY") };
        assert!(config.validate().is_err());
        assert!(config.llm.api_key().is_err());

        unsafe { std::env::set_var("GOALPILOT_TEST_KEY", "secret") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.api_key().unwrap(), "secret");
        unsafe { std::env::remove_var("GOALPILOT_TEST_KEY") };
    }
}
