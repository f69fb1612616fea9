use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Tool-call budget for a single chat turn.
pub const DEFAULT_TOOL_CALL_BUDGET: u32 = 8;
/// LLM request hard timeout.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Top-level config (journal.toml + JOURNAL_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Carries the parameters a concrete `journal-auth` implementation needs:
/// JWT signing secret, algorithm, token lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    pub api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.journal/journal.db")
}
fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}
fn default_token_lifetime_secs() -> i64 {
    86_400
}
fn default_llm_provider() -> String {
    "anthropic".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_llm_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.journal/journal.toml")
}

impl JournalConfig {
    /// Load config from a TOML file with JOURNAL_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `JOURNAL_CONFIG` env var
    ///   3. ~/.journal/journal.toml
    ///
    /// Fails fast if `auth.jwt_secret` or `llm.api_key` is absent.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("JOURNAL_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: JournalConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("JOURNAL_").split("_"))
            .extract()
            .map_err(|e| JournalError::Config(e.to_string()))?;

        if config.auth.jwt_secret.trim().is_empty() {
            return Err(JournalError::Config(
                "auth.jwt_secret is required".to_string(),
            ));
        }
        if config.llm.api_key.trim().is_empty() {
            return Err(JournalError::Config("llm.api_key is required".to_string()));
        }

        Ok(config)
    }
}
