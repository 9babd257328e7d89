use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::DEFAULT_CAPACITY;

/// Largest ring buffer a user may ask for
pub const MAX_HISTORY_CAPACITY: usize = 600;

const CONFIG_NAMES: [&str; 4] = [
    "dockdash.yml",
    "dockdash.yaml",
    ".dockdash.yml",
    ".dockdash.yaml",
];

/// Color scheme for the terminal UI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    HighContrast,
}

/// Dashboard settings, read from `dockdash.yml`. Every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// How often the unit list is re-fetched
    pub refresh_interval_ms: u64,
    /// How often the focused unit is sampled
    pub stats_interval_ms: u64,
    /// Samples kept per metric
    pub history_capacity: usize,
    /// Cells used when rendering a sparkline
    pub sparkline_width: usize,
    /// Lines requested when a log stream opens
    pub log_tail: usize,
    /// Lines kept in the live log buffer
    pub log_buffer_lines: usize,
    /// Grace period for stop/restart before the runtime kills the unit
    pub stop_timeout_secs: u64,
    /// Runtime endpoint; `None` uses the platform default socket
    pub docker_host: Option<String>,
    pub theme: ThemeName,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5_000,
            stats_interval_ms: 2_000,
            history_capacity: DEFAULT_CAPACITY,
            sparkline_width: 30,
            log_tail: 500,
            log_buffer_lines: 5_000,
            stop_timeout_secs: 10,
            docker_host: None,
            theme: ThemeName::Dark,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} must be greater than zero")]
    InvalidInterval { field: &'static str },
    #[error("refresh interval ({refresh_ms} ms) must be longer than stats interval ({stats_ms} ms)")]
    RefreshNotCoarser { refresh_ms: u64, stats_ms: u64 },
    #[error("{field} must be between 1 and {max}, got {value}")]
    InvalidCapacity {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

impl DashboardConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // an empty file deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: DashboardConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Look for a config file, `DOCKDASH_CONFIG` first, then `start_dir`.
    /// Returns `None` when nothing is found; defaults apply in that case.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Ok(env_path) = std::env::var("DOCKDASH_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
            tracing::warn!(path = %path.display(), "DOCKDASH_CONFIG points to a missing file");
        }

        for name in CONFIG_NAMES {
            let path = start_dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "refresh_interval_ms",
            });
        }
        if self.stats_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "stats_interval_ms",
            });
        }
        if self.refresh_interval_ms <= self.stats_interval_ms {
            return Err(ConfigError::RefreshNotCoarser {
                refresh_ms: self.refresh_interval_ms,
                stats_ms: self.stats_interval_ms,
            });
        }
        check_capacity("history_capacity", self.history_capacity, MAX_HISTORY_CAPACITY)?;
        check_capacity("sparkline_width", self.sparkline_width, MAX_HISTORY_CAPACITY)?;
        check_capacity("log_buffer_lines", self.log_buffer_lines, 1_000_000)?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

fn check_capacity(field: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidCapacity { field, value, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.stats_interval(), Duration::from_secs(2));
        assert_eq!(config.history_capacity, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
stats_interval_ms: 1000
history_capacity: 60
theme: high-contrast
docker_host: tcp://10.0.0.5:2375
"#;
        let config = DashboardConfig::from_str(yaml).unwrap();
        assert_eq!(config.stats_interval_ms, 1000);
        assert_eq!(config.refresh_interval_ms, 5000);
        assert_eq!(config.history_capacity, 60);
        assert_eq!(config.theme, ThemeName::HighContrast);
        assert_eq!(config.docker_host.as_deref(), Some("tcp://10.0.0.5:2375"));
    }

    #[test]
    fn test_refresh_must_be_coarser_than_stats() {
        let result = DashboardConfig::from_str("refresh_interval_ms: 2000\nstats_interval_ms: 2000\n");
        assert!(matches!(
            result,
            Err(ConfigError::RefreshNotCoarser {
                refresh_ms: 2000,
                stats_ms: 2000
            })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = DashboardConfig::from_str("stats_interval_ms: 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInterval {
                field: "stats_interval_ms"
            })
        ));
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(matches!(
            DashboardConfig::from_str("history_capacity: 0\n"),
            Err(ConfigError::InvalidCapacity { value: 0, .. })
        ));
        assert!(matches!(
            DashboardConfig::from_str("history_capacity: 601\n"),
            Err(ConfigError::InvalidCapacity { value: 601, .. })
        ));
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            DashboardConfig::from_str("refresh_interval_ms: [nope"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_discover_in_directory() {
        let dir = std::env::temp_dir().join(format!("dockdash-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(DashboardConfig::discover(&dir).unwrap().is_none());

        std::fs::write(dir.join(".dockdash.yml"), "log_tail: 100\n").unwrap();
        let (path, config) = DashboardConfig::discover(&dir).unwrap().unwrap();
        assert!(path.ends_with(".dockdash.yml"));
        assert_eq!(config.log_tail, 100);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
