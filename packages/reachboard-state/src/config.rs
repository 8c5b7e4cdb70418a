use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;

use crate::orchestrator::OrchestratorConfig;
use crate::state::FetchPolicy;

/// State layer configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fetch_policy: FetchPolicy,
    pub fetch_timeout: Option<Duration>,
    /// Scale factor for the mock provider's simulated delays.
    pub mock_latency: f64,
    pub token_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::default(),
            fetch_timeout: None,
            mock_latency: 1.0,
            token_path: PathBuf::from(".reachboard/token"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep their
    /// defaults; set but unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let fetch_policy = match lookup("REACHBOARD_FETCH_POLICY") {
            Some(raw) => raw
                .parse::<FetchPolicy>()
                .map_err(|e| anyhow!(e))
                .context("REACHBOARD_FETCH_POLICY must be 'latest' or 'last-writer-wins'")?,
            None => defaults.fetch_policy,
        };

        let fetch_timeout = match lookup("REACHBOARD_FETCH_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .context("REACHBOARD_FETCH_TIMEOUT_MS must be a number of milliseconds")?;
                // 0 disables the timeout.
                (ms > 0).then(|| Duration::from_millis(ms))
            }
            None => defaults.fetch_timeout,
        };

        let mock_latency = match lookup("REACHBOARD_MOCK_LATENCY") {
            Some(raw) => {
                let factor: f64 = raw
                    .trim()
                    .parse()
                    .context("REACHBOARD_MOCK_LATENCY must be a number")?;
                if !factor.is_finite() || factor < 0.0 {
                    return Err(anyhow!(
                        "REACHBOARD_MOCK_LATENCY must be a non-negative number (got {})",
                        factor
                    ));
                }
                factor
            }
            None => defaults.mock_latency,
        };

        let token_path = lookup("REACHBOARD_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_path);

        Ok(Self {
            fetch_policy,
            fetch_timeout,
            mock_latency,
            token_path,
        })
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            timeout: self.fetch_timeout,
        }
    }
}
