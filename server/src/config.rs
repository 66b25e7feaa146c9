//! Server settings and the match rules file.

use anyhow::Context;
use shared::MatchRules;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    pub client_timeout: Duration,
    pub rules: MatchRules,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_clients: 2,
            client_timeout: Duration::from_secs(10),
            rules: MatchRules::default(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot parse rules: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid rules: {0}")]
    Invalid(String),
}

/// Parses and validates a rules document. Missing fields take their defaults.
pub fn parse_rules(text: &str) -> Result<MatchRules, ConfigError> {
    let rules: MatchRules = toml::from_str(text)?;
    rules.validate().map_err(ConfigError::Invalid)?;
    Ok(rules)
}

/// Loads rules from `path`, or the built-in defaults when no path is given.
pub fn load_rules(path: Option<&Path>) -> anyhow::Result<MatchRules> {
    let Some(path) = path else {
        return Ok(MatchRules::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read rules file {}", path.display()))?;
    let rules =
        parse_rules(&text).with_context(|| format!("load rules file {}", path.display()))?;
    Ok(rules)
}
