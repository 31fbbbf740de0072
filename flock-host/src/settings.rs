use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use flock_shared::{FollowerSettings, SteeringSettings};
use serde::{Deserialize, Serialize};

/// Contents of the `--settings` JSON file
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostSettings {
    pub follower: FollowerSettings,
    pub steering: SteeringSettings,
}

impl HostSettings {
    pub fn parse(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("Invalid settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::parse(&json).with_context(|| format!("Bad settings file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.follower
            .validate()
            .context("Invalid follower settings")?;
        self.steering
            .validate()
            .context("Invalid steering settings")?;
        Ok(())
    }
}
