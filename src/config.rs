use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BloodBankError, Result};
use crate::inventory::{InventorySettings, MAX_SHELF_LIFE_DAYS};
use crate::output::ReportFormat;

/// Tool configuration, loadable from a TOML file.
///
/// ```toml
/// threads = 4
///
/// [inventory]
/// bag_volume_ml = 450.0
/// minimum_bags = 10
/// shelf_life_days = 42
///
/// [output]
/// dir = "./reports"
/// format = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker threads (0 = auto-detect)
    pub threads: usize,
    pub inventory: InventorySettings,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: ReportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./reports"),
            format: ReportFormat::Json,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            inventory: InventorySettings::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let content = fs::read_to_string(path)?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        let inventory = &self.inventory;

        if !inventory.bag_volume_ml.is_finite() || inventory.bag_volume_ml <= 0.0 {
            return Err(BloodBankError::InvalidConfig {
                message: format!(
                    "bag_volume_ml must be positive, got {}",
                    inventory.bag_volume_ml
                ),
            });
        }

        if !(1..=MAX_SHELF_LIFE_DAYS).contains(&inventory.shelf_life_days) {
            return Err(BloodBankError::InvalidConfig {
                message: format!(
                    "shelf_life_days must be between 1 and {}, got {}",
                    MAX_SHELF_LIFE_DAYS, inventory.shelf_life_days
                ),
            });
        }

        Ok(())
    }
}
