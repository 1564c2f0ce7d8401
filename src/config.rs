use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub plot: PlotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are dropped; 0 keeps them forever.
    pub session_idle_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub model: String,
    /// Overrides the provider's default endpoint (proxies, tests).
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub max_steps: usize,
    pub verify_credential: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlotConfig {
    /// Serialized canvases larger than this many bytes are treated as plots.
    pub byte_threshold: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

pub const DEFAULT_PLOT_BYTE_THRESHOLD: usize = 1000;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_upload_bytes: 200 * 1024 * 1024,
            session_idle_secs: 3600,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Google,
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            max_tokens: 2048,
            max_steps: 8,
            verify_credential: true,
            timeout_secs: 120,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            byte_threshold: DEFAULT_PLOT_BYTE_THRESHOLD,
            canvas_width: 400,
            canvas_height: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LLMConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerConfig::default();
        let llm_defaults = LLMConfig::default();
        let plot_defaults = PlotConfig::default();

        let provider = match lookup("LLM_PROVIDER") {
            Some(id) => LLMProvider::from_id(id.trim())
                .with_context(|| format!("Unsupported LLM_PROVIDER: {}", id))?,
            None => llm_defaults.provider,
        };

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&lookup, "PORT", server_defaults.port)?,
                host: lookup("HOST").unwrap_or(server_defaults.host),
                cors_allowed_origins: lookup("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(server_defaults.cors_allowed_origins),
                max_upload_bytes: parse_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    server_defaults.max_upload_bytes,
                )?,
                session_idle_secs: parse_or(
                    &lookup,
                    "SESSION_IDLE_SECS",
                    server_defaults.session_idle_secs,
                )?,
            },
            llm: LLMConfig {
                provider,
                model: lookup("LLM_MODEL").unwrap_or(llm_defaults.model),
                base_url: lookup("LLM_BASE_URL").filter(|s| !s.trim().is_empty()),
                max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", llm_defaults.max_tokens)?,
                max_steps: parse_or(&lookup, "AGENT_MAX_STEPS", llm_defaults.max_steps)?,
                verify_credential: parse_or(
                    &lookup,
                    "LLM_VERIFY_CREDENTIAL",
                    llm_defaults.verify_credential,
                )?,
                timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", llm_defaults.timeout_secs)?,
            },
            plot: PlotConfig {
                byte_threshold: parse_or(
                    &lookup,
                    "PLOT_BYTE_THRESHOLD",
                    plot_defaults.byte_threshold,
                )?,
                canvas_width: parse_or(&lookup, "CANVAS_WIDTH", plot_defaults.canvas_width)?,
                canvas_height: parse_or(&lookup, "CANVAS_HEIGHT", plot_defaults.canvas_height)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.session_idle_secs, 3600);
        assert_eq!(config.llm.provider, LLMProvider::Google);
        assert_eq!(config.plot.byte_threshold, 1000);
        assert!(config.llm.verify_credential);
        assert!(config.llm.base_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("LLM_PROVIDER", "openai"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("PLOT_BYTE_THRESHOLD", "2048"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("LLM_VERIFY_CREDENTIAL", "false"),
            ("SESSION_IDLE_SECS", "600"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.session_idle_secs, 600);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.plot.byte_threshold, 2048);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(!config.llm.verify_credential);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("LLM_PROVIDER", "nope")])).is_err());
    }
}
