//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use signpipe_core::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_IN_FLIGHT, PipelineConfig, SignerConfig};

/// Global configuration for signpipe
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub signer: SignerSection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub channel_capacity: usize,
    pub stagger_ms: u64,
    /// Items each hashing stage signs at once
    pub max_in_flight: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            stagger_ms: 1,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SignerSection {
    pub hash1_latency_ms: u64,
    pub hash2_latency_ms: u64,
    pub overheat_penalty_ms: u64,
}

impl Default for SignerSection {
    fn default() -> Self {
        Self {
            hash1_latency_ms: 10,
            hash2_latency_ms: 1000,
            overheat_penalty_ms: 1000,
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub channel_capacity: Option<usize>,
    pub stagger_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub hash1_latency_ms: Option<u64>,
    pub hash2_latency_ms: Option<u64>,
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./signpipe.toml (current directory)
    /// 2. ~/.config/signpipe/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("signpipe.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "signpipe") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line overrides on top of file values
    pub fn apply(&mut self, o: Overrides) {
        if let Some(v) = o.channel_capacity {
            self.pipeline.channel_capacity = v;
        }
        if let Some(v) = o.stagger_ms {
            self.pipeline.stagger_ms = v;
        }
        if let Some(v) = o.max_in_flight {
            self.pipeline.max_in_flight = v;
        }
        if let Some(v) = o.hash1_latency_ms {
            self.signer.hash1_latency_ms = v;
        }
        if let Some(v) = o.hash2_latency_ms {
            self.signer.hash2_latency_ms = v;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.pipeline.max_in_flight > 0,
            "pipeline.max_in_flight must be > 0"
        );
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            channel_capacity: self.pipeline.channel_capacity,
            stagger: Duration::from_millis(self.pipeline.stagger_ms),
        }
    }

    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            hash1_latency: Duration::from_millis(self.signer.hash1_latency_ms),
            hash2_latency: Duration::from_millis(self.signer.hash2_latency_ms),
            overheat_penalty: Duration::from_millis(self.signer.overheat_penalty_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.channel_capacity, 100);
        assert_eq!(config.pipeline.stagger_ms, 1);
        assert_eq!(config.pipeline.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(config.signer_config(), SignerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[pipeline]
channel_capacity = 8

[signer]
hash2_latency_ms = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pipeline.channel_capacity, 8);
        assert_eq!(config.pipeline.stagger_ms, 1);
        assert_eq!(config.signer.hash1_latency_ms, 10);
        assert_eq!(
            config.signer_config().hash2_latency,
            Duration::from_millis(50)
        );
    }

    #[test]
    fn overrides_win() {
        let mut config = Config::default();
        config.apply(Overrides {
            channel_capacity: Some(4),
            stagger_ms: Some(0),
            max_in_flight: Some(8),
            hash1_latency_ms: None,
            hash2_latency_ms: Some(0),
        });
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.channel_capacity, 4);
        assert!(pipeline.stagger.is_zero());
        assert_eq!(config.pipeline.max_in_flight, 8);
        assert_eq!(config.signer.hash1_latency_ms, 10);
        assert!(config.signer_config().hash2_latency.is_zero());
    }

    #[test]
    fn zero_in_flight_rejected() {
        let config: Config = toml::from_str("[pipeline]\nmax_in_flight = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_in_flight"));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signpipe.toml");
        std::fs::write(&path, "[pipeline]\nchannel_capacity = \"many\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("signpipe.toml"));
    }
}
