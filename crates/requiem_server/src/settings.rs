use std::path::Path;
use std::time::Duration;

use bevy_ecs::prelude::*;
use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

/// Respawn policy. Read once at startup and never changed afterwards.
///
/// ```
/// use requiem_server::settings::RespawnSettings;
///
/// let settings = RespawnSettings::from_toml_str(
///     r#"
///     respawn_delay_ms = 5000
///     respawn_sites = [[0.0, 0.0, 70.0], [120.0, -40.0, 71.5]]
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.respawn_sites.len(), 2);
/// assert_eq!(settings.respawn_health, 100.0);
/// ```
#[derive(Resource, Clone, PartialEq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RespawnSettings {
    /// Minimum time between death and an honored respawn request.
    pub respawn_delay_ms: u64,
    /// Health a character is restored to on respawn.
    pub respawn_health: f32,
    /// Armor a character is restored to on respawn.
    pub respawn_armor: f32,
    /// Strip all weapons on a natural respawn.
    pub clear_weapons_on_respawn: bool,
    /// Pause between accepting a natural respawn and moving the character.
    pub respawn_grace_ms: u64,
    /// Health at or below this value counts as dead.
    pub dead_health_threshold: f32,
    /// Candidate respawn positions, in order.
    pub respawn_sites: Vec<DVec3>,
}

impl RespawnSettings {
    pub fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }

    pub fn respawn_grace(&self) -> Duration {
        Duration::from_millis(self.respawn_grace_ms)
    }

    pub fn is_lethal(&self, health: f32) -> bool {
        health <= self.dead_health_threshold
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("respawn_health", self.respawn_health),
            ("respawn_armor", self.respawn_armor),
            ("dead_health_threshold", self.dead_health_threshold),
        ] {
            if !value.is_finite() {
                return Err(SettingsError::Invalid(format!("{name} must be finite")));
            }
        }

        if self.is_lethal(self.respawn_health) {
            return Err(SettingsError::Invalid(format!(
                "respawn_health ({}) must be above dead_health_threshold ({})",
                self.respawn_health, self.dead_health_threshold
            )));
        }

        if let Some(i) = self.respawn_sites.iter().position(|s| !s.is_finite()) {
            return Err(SettingsError::Invalid(format!(
                "respawn site {i} has a non-finite coordinate"
            )));
        }

        Ok(())
    }
}

impl Default for RespawnSettings {
    fn default() -> Self {
        Self {
            respawn_delay_ms: 10_000,
            respawn_health: 100.0,
            respawn_armor: 0.0,
            clear_weapons_on_respawn: false,
            respawn_grace_ms: 0,
            dead_health_threshold: 0.0,
            respawn_sites: vec![],
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}
