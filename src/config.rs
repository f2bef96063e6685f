//! Process configuration
//!
//! Read once from the environment at startup and handed to the
//! constructors that need it. Nothing here is global.

use crate::error::AgentError;
use crate::Result;
use std::env;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_MARKET_DATA_SESSION_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_MAX_ITERATIONS: usize = 12;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub market_data: MarketDataConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    /// Page hit once to obtain Yahoo's session cookie. `None` skips the
    /// cookie + crumb handshake entirely.
    pub session_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on model round-trips per question
    pub max_iterations: usize,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    ///
    /// Callers are expected to have loaded `.env` beforehand if they want it.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("OPENAI_API_KEY").ok_or_else(|| {
            AgentError::ConfigError("OPENAI_API_KEY is not set".to_string())
        })?;

        let port = match var("PORT").or_else(|| var("API_PORT")) {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        // An explicitly empty session URL disables the handshake, so this
        // one is read without the emptiness filter.
        let session_url = match lookup("MARKET_DATA_SESSION_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim_end_matches('/').to_string()),
            None => Some(DEFAULT_MARKET_DATA_SESSION_URL.to_string()),
        };

        let max_iterations: usize =
            optional_number(&var, "AGENT_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(AgentError::ConfigError(
                "AGENT_MAX_ITERATIONS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            llm: LlmConfig {
                api_key,
                api_base: var("OPENAI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout_secs: optional_number(&var, "OPENAI_TIMEOUT_SECS", 120)?,
            },
            market_data: MarketDataConfig {
                base_url: var("MARKET_DATA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_MARKET_DATA_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                session_url,
                timeout_secs: optional_number(&var, "MARKET_DATA_TIMEOUT_SECS", 30)?,
            },
            agent: AgentConfig { max_iterations },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::ConfigError(format!("{} must be a number, got '{}'", key, raw)))
}

fn optional_number<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}
