use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 64;
pub const DEFAULT_ANTHROPIC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub public_base_url: String,
    pub anthropic: Option<AnthropicConfig>,
    pub keepalive_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("{name} must be a positive integer")]
    InvalidNumber { name: &'static str },
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let public_base_url = read("PUBLIC_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{bind_addr}:{bind_port}"));

        let anthropic = match read("ANTHROPIC_API_KEY") {
            Some(api_key) => Some(AnthropicConfig {
                api_key,
                base_url: read("ANTHROPIC_BASE_URL")
                    .map(|value| value.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
                model: read("ANTHROPIC_MODEL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                max_tokens: parse_positive(read("ANTHROPIC_MAX_TOKENS"), "ANTHROPIC_MAX_TOKENS")?
                    .unwrap_or(DEFAULT_MAX_TOKENS),
                timeout: Duration::from_secs(
                    parse_positive(read("ANTHROPIC_TIMEOUT_SECS"), "ANTHROPIC_TIMEOUT_SECS")?
                        .unwrap_or(DEFAULT_ANTHROPIC_TIMEOUT_SECS),
                ),
            }),
            None => None,
        };

        let keepalive_interval = Duration::from_secs(
            parse_positive(read("MCP_KEEPALIVE_SECS"), "MCP_KEEPALIVE_SECS")?
                .unwrap_or(DEFAULT_KEEPALIVE_SECS),
        );

        let config = Self {
            bind_addr,
            bind_port,
            public_base_url,
            anthropic,
            keepalive_interval,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_positive<T>(value: Option<String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .map(|raw| {
            raw.parse::<T>()
                .ok()
                .filter(|parsed| *parsed > T::default())
                .ok_or(ConfigError::InvalidNumber { name })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.public_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert!(config.anthropic.is_none());
    }

    #[test]
    fn blank_api_key_leaves_model_disabled() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "   ")]).expect("config should parse");
        assert!(config.anthropic.is_none());
    }

    #[test]
    fn anthropic_settings_parse_with_defaults() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ANTHROPIC_BASE_URL", "http://localhost:9999/"),
            ("ANTHROPIC_MAX_TOKENS", "128"),
        ])
        .expect("config should parse");

        let anthropic = config.anthropic.expect("anthropic enabled");
        assert_eq!(anthropic.api_key, "sk-test");
        assert_eq!(anthropic.base_url, "http://localhost:9999");
        assert_eq!(anthropic.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(anthropic.max_tokens, 128);
        assert_eq!(anthropic.timeout, Duration::from_secs(30));
    }

    #[test]
    fn public_base_url_trims_trailing_slash() {
        let config = config_from(&[("PUBLIC_BASE_URL", "https://mcp.example.com/")])
            .expect("config should parse");
        assert_eq!(config.public_base_url, "https://mcp.example.com");
    }

    #[test]
    fn invalid_port_fails() {
        let err = config_from(&[("BIND_PORT", "99999")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn zero_keepalive_fails() {
        let err =
            config_from(&[("MCP_KEEPALIVE_SECS", "0")]).expect_err("expected invalid interval");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: "MCP_KEEPALIVE_SECS"
            }
        ));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = config_from(&[("BIND_ADDR", "not an address")]).expect_err("expected error");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }
}
