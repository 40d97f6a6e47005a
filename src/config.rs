use anyhow::{Context, Result};

pub const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_RECOMMENDATIONS_URL: &str = "http://localhost:5000/api/recommendations";

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Connection details for the hosted Postgres store, shared by the API
/// service and the recommendation job.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Access key, applied as the connection password.
    pub key: String,
}

impl StoreConfig {
    fn from_source(source: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            url: required(source, "STORE_URL")?,
            key: required(source, "STORE_KEY")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Config (HTTP API service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    fn from_source(source: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            store: StoreConfig::from_source(source)?,
            server_host: optional(source, "SERVER_HOST", "0.0.0.0"),
            server_port: optional(source, "PORT", "5000")
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }
}

// ---------------------------------------------------------------------------
// JobConfig (recommendation job)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub store: StoreConfig,
    /// Bearer token for the completion endpoint.
    pub llm_api_key: String,
    pub llm_api_url: String,
    /// Sent as `HTTP-Referer` when present.
    pub llm_referer: Option<String>,
    /// The API service's `/api/recommendations` route.
    pub recommendations_url: String,
}

impl JobConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    fn from_source(source: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            store: StoreConfig::from_source(source)?,
            llm_api_key: required(source, "LLM_API_KEY")?,
            llm_api_url: optional(source, "LLM_API_URL", DEFAULT_LLM_API_URL),
            llm_referer: source("LLM_REFERER").filter(|v| !v.is_empty()),
            recommendations_url: optional(
                source,
                "RECOMMENDATIONS_URL",
                DEFAULT_RECOMMENDATIONS_URL,
            ),
        })
    }
}

fn env_source(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required(source: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    source(key)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("missing required env var: {key}"))
}

fn optional(source: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    source(key).unwrap_or_else(|| default.to_owned())
}
