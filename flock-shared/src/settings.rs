use flock_core::{AgentConfig, SimulationConfig, SteeringFactors};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be a finite, positive number (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("orientation_blend must lie within 0..=1 (got {0})")]
    BlendOutOfRange(f32),
}

/// Per-agent settings supplied by the host when agents are created
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FollowerSettings {
    /// Seconds before an agent may pick another leader
    pub leader_change_cooldown: f32,
    pub max_speed: f32,
    /// Separation kicks in at or below this distance
    pub crowded_distance: f32,
}

impl Default for FollowerSettings {
    fn default() -> Self {
        let config = AgentConfig::default();
        Self {
            leader_change_cooldown: config.leader_change_cooldown,
            max_speed: config.max_speed,
            crowded_distance: config.crowded_distance,
        }
    }
}

impl FollowerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        non_negative("leader_change_cooldown", self.leader_change_cooldown)?;
        non_negative("max_speed", self.max_speed)?;
        non_negative("crowded_distance", self.crowded_distance)
    }
}

impl From<FollowerSettings> for AgentConfig {
    fn from(settings: FollowerSettings) -> Self {
        Self {
            leader_change_cooldown: settings.leader_change_cooldown,
            max_speed: settings.max_speed,
            crowded_distance: settings.crowded_distance,
        }
    }
}

/// Simulation-wide steering settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SteeringSettings {
    pub cohesion_factor: f32,
    pub separation_factor: f32,
    pub alignment_factor: f32,
    pub follow_leader_factor: f32,
    pub orientation_blend: f32,
    pub integrate_positions: bool,
}

impl Default for SteeringSettings {
    fn default() -> Self {
        let config = SimulationConfig::default();
        Self {
            cohesion_factor: config.factors.cohesion,
            separation_factor: config.factors.separation,
            alignment_factor: config.factors.alignment,
            follow_leader_factor: config.factors.follow_leader,
            orientation_blend: config.orientation_blend,
            integrate_positions: config.integrate_positions,
        }
    }
}

impl SteeringSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("cohesion_factor", self.cohesion_factor)?;
        positive("separation_factor", self.separation_factor)?;
        positive("alignment_factor", self.alignment_factor)?;
        positive("follow_leader_factor", self.follow_leader_factor)?;
        if !(0.0..=1.0).contains(&self.orientation_blend) {
            return Err(SettingsError::BlendOutOfRange(self.orientation_blend));
        }
        Ok(())
    }
}

impl From<SteeringSettings> for SimulationConfig {
    fn from(settings: SteeringSettings) -> Self {
        Self {
            factors: SteeringFactors {
                cohesion: settings.cohesion_factor,
                separation: settings.separation_factor,
                alignment: settings.alignment_factor,
                follow_leader: settings.follow_leader_factor,
            },
            orientation_blend: settings.orientation_blend,
            integrate_positions: settings.integrate_positions,
        }
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Negative { field, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { field, value })
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_follower_settings_partial_json_uses_defaults() {
        let settings: FollowerSettings = serde_json::from_str(r#"{"max_speed": 4.5}"#).unwrap();

        assert_eq!(settings.max_speed, 4.5);
        assert_eq!(
            settings.leader_change_cooldown,
            FollowerSettings::default().leader_change_cooldown
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_follower_settings_into_agent_config() {
        let settings = FollowerSettings {
            leader_change_cooldown: 0.5,
            max_speed: 3.0,
            crowded_distance: 1.25,
        };

        let config = AgentConfig::from(settings);

        assert_eq!(config.leader_change_cooldown, 0.5);
        assert_eq!(config.max_speed, 3.0);
        assert_eq!(config.crowded_distance, 1.25);
    }

    #[test]
    fn test_negative_values_are_rejected() {
        let settings = FollowerSettings {
            max_speed: -1.0,
            ..FollowerSettings::default()
        };

        assert_eq!(
            settings.validate(),
            Err(SettingsError::Negative {
                field: "max_speed",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_steering_defaults_match_core() {
        let config = SimulationConfig::from(SteeringSettings::default());

        assert_eq!(config, SimulationConfig::default());
        assert!(SteeringSettings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_factor_is_rejected() {
        let settings = SteeringSettings {
            alignment_factor: 0.0,
            ..SteeringSettings::default()
        };

        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NotPositive {
                field: "alignment_factor",
                ..
            })
        ));
    }

    #[test]
    fn test_blend_out_of_range_is_rejected() {
        let settings = SteeringSettings {
            orientation_blend: 1.5,
            ..SteeringSettings::default()
        };

        assert_eq!(settings.validate(), Err(SettingsError::BlendOutOfRange(1.5)));
    }
}
