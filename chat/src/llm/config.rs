//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_SERVER_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_DIRECT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fixed sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Sampling {
    /// Server route profile.
    pub const SERVER: Self = Self { temperature: 0.9, top_p: 1.0, top_k: 1, max_output_tokens: 4096 };

    /// Direct-call profile used by the terminal client.
    pub const DIRECT: Self = Self { temperature: 0.7, top_p: 0.95, top_k: 40, max_output_tokens: 1024 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub sampling: Sampling,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build the server profile from environment variables.
    ///
    /// Optional:
    /// - `LLM_API_KEY_ENV`: names the env var containing the key (default `GEMINI_API_KEY`)
    /// - `LLM_MODEL`: default `gemini-2.5-pro`
    /// - `LLM_BASE_URL`: default Generative Language API host
    /// - `LLM_TEMPERATURE`, `LLM_TOP_P`, `LLM_TOP_K`, `LLM_MAX_OUTPUT_TOKENS`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] if the key variable is unset or blank.
    pub fn from_env() -> Result<Self, LlmError> {
        let key_var = std::env::var("LLM_API_KEY_ENV").unwrap_or_else(|_| DEFAULT_API_KEY_ENV.to_string());
        let api_key = std::env::var(&key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_SERVER_MODEL.to_string());
        let base_url = normalize_base_url(&std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()));
        let defaults = Sampling::SERVER;
        let sampling = Sampling {
            temperature: env_parse("LLM_TEMPERATURE", defaults.temperature),
            top_p: env_parse("LLM_TOP_P", defaults.top_p),
            top_k: env_parse("LLM_TOP_K", defaults.top_k),
            max_output_tokens: env_parse("LLM_MAX_OUTPUT_TOKENS", defaults.max_output_tokens),
        };
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key: api_key.trim().to_string(), model, base_url, sampling, timeouts })
    }

    /// Direct-call profile for a user-supplied key.
    #[must_use]
    pub fn direct(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_DIRECT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            sampling: Sampling::DIRECT,
            timeouts: LlmTimeouts::default(),
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
