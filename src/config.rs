//! Engine Configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::selection::ExplicitMissPolicy;
use crate::templates::TemplateCategory;
use crate::validation::FailureMode;

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("UTC offset of {0} minutes is out of range")]
    OffsetOutOfRange(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Reference zone for formatting event timestamps, as minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub explicit_template_miss: ExplicitMissPolicy,
    /// Category searched for tenant and global flyer templates.
    pub flyer_category: TemplateCategory,
    pub design_name_prefix: String,
    pub failure_mode: FailureMode,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            explicit_template_miss: ExplicitMissPolicy::Stop,
            flyer_category: TemplateCategory::Event,
            design_name_prefix: "Flyer: ".to_string(),
            failure_mode: FailureMode::Block,
        }
    }
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.reference_offset()?;
        Ok(config)
    }

    pub fn reference_offset(&self) -> Result<FixedOffset, ConfigError> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::OffsetOutOfRange(self.utc_offset_minutes));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or(ConfigError::OffsetOutOfRange(self.utc_offset_minutes))
    }
}
