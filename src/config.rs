use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::net::Tokens;

/// Limits applied by the `pn` binary when the command line does not set them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Maximum number of markings any single exploration may visit.
    #[serde(default = "default_state_limit")]
    pub state_limit: usize,
    /// Per-place bound used by the boundedness check.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Tokens,
    /// Macro-steps performed by `--kind simulate`.
    #[serde(default = "default_simulation_steps")]
    pub simulation_steps: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            state_limit: default_state_limit(),
            max_tokens: default_max_tokens(),
            simulation_steps: default_simulation_steps(),
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

fn default_state_limit() -> usize {
    10_000
}

fn default_max_tokens() -> Tokens {
    1_000
}

fn default_simulation_steps() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: AnalysisConfig = toml::from_str("state_limit = 42").unwrap();
        assert_eq!(config.state_limit, 42);
        assert_eq!(config.max_tokens, default_max_tokens());
        assert_eq!(config.simulation_steps, default_simulation_steps());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = AnalysisConfig::load_from_file("/nonexistent/pn.toml").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn bad_file_reports_path() {
        let path = std::env::temp_dir().join(format!("pn-config-{}.toml", std::process::id()));
        fs::write(&path, "state_limit = \"lots\"").unwrap();
        let err = AnalysisConfig::load_from_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(format!("{err}").contains("Failed to parse config file"));
    }
}
