use crate::common::constants::{DEFAULT_LIMIT, DEFAULT_PROVIDER_TIMEOUT_SECS, RELAXED_LIMIT};
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "race_finder.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub search: SearchDefaults,
    pub aggregator: AggregatorConfig,
}

/// Defaults for CLI searches when a flag is not given.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchDefaults {
    pub limit: usize,
    pub period_months: Option<u32>,
    pub service: Option<String>,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            period_months: None,
            service: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Upper bound for one provider's whole fetch
    pub provider_timeout_seconds: u64,
    /// Per-provider limit when more than one provider is queried
    pub relaxed_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            provider_timeout_seconds: DEFAULT_PROVIDER_TIMEOUT_SECS,
            relaxed_limit: RELAXED_LIMIT,
        }
    }
}

impl Config {
    /// Load `race_finder.toml` from the working directory, or defaults when
    /// there is none.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.search.limit == 0 {
            return Err(ScraperError::Config("search.limit must be positive".into()));
        }
        if self.aggregator.provider_timeout_seconds == 0 {
            return Err(ScraperError::Config(
                "aggregator.provider_timeout_seconds must be positive".into(),
            ));
        }
        if self.aggregator.relaxed_limit < self.search.limit {
            return Err(ScraperError::Config(
                "aggregator.relaxed_limit must not be below search.limit".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[search]\nperiod_months = 1\nservice = \"Timerman\"\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.search.limit, 50);
        assert_eq!(config.search.period_months, Some(1));
        assert_eq!(config.search.service.as_deref(), Some("Timerman"));
        assert_eq!(config.aggregator, AggregatorConfig::default());
    }

    #[test]
    fn test_aggregator_section() {
        let file = write_config("[aggregator]\nprovider_timeout_seconds = 20\nrelaxed_limit = 300\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.aggregator.provider_timeout_seconds, 20);
        assert_eq!(config.aggregator.relaxed_limit, 300);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[search]\nlimit = 0\n");
        assert!(matches!(Config::load_from(file.path()), Err(ScraperError::Config(_))));

        let file = write_config("[search]\nlimit = \"many\"\n");
        assert!(matches!(Config::load_from(file.path()), Err(ScraperError::Toml(_))));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }
}
