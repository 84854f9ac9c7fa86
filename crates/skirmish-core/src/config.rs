//! Engine configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SkirmishError;

/// Engine configuration, usually read from `skirmish.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix shown in usage and help text
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Channel key the reference adapter speaks as
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Optional server key for per-server system defaults
    pub server: Option<String>,

    /// Snapshot loaded at start (when present) and written on exit
    pub state_path: Option<PathBuf>,

    /// Largest grid a match may be created with
    pub limits: GridLimits,

    /// `tracing` filter directive used unless overridden on the command line
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_prefix() -> String {
    "!".to_string()
}
fn default_channel() -> String {
    "local".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_max_dimension() -> u32 {
    100
}

/// Grid size ceiling applied when creating matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,

    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
        }
    }
}

impl GridLimits {
    pub fn check(&self, width: u32, height: u32) -> crate::Result<()> {
        if width == 0 || height == 0 || width > self.max_width || height > self.max_height {
            return Err(SkirmishError::validation(format!(
                "grid must be between 1x1 and {}x{}, got {width}x{height}",
                self.max_width, self.max_height
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            channel: default_channel(),
            server: None,
            state_path: None,
            limits: GridLimits::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
