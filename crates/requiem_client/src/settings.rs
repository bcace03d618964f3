use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Client-side presentation settings for the countdown mirror.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorSettings {
    /// Key bound to the respawn action.
    pub respawn_key: String,
    /// Length of the camera transition started when respawning.
    pub camera_switch_ms: u64,
    /// Wait between starting the camera transition and sending the request.
    pub request_delay_ms: u64,
    /// Start the respawn sequence without a key press once the countdown ends.
    pub auto_respawn: bool,
    /// How long after sending a request the key is re-armed if the character
    /// is still dead.
    pub retry_cooldown_ms: u64,
}

impl MirrorSettings {
    pub fn camera_switch(&self) -> Duration {
        Duration::from_millis(self.camera_switch_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_millis(self.retry_cooldown_ms)
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
        if self.respawn_key.trim().is_empty() {
            return Err(SettingsError::Invalid("respawn_key must not be empty".into()));
        }

        Ok(())
    }
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            respawn_key: "J".into(),
            camera_switch_ms: 2000,
            request_delay_ms: 1000,
            auto_respawn: false,
            retry_cooldown_ms: 5000,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = MirrorSettings::from_toml_str("").unwrap();

        assert_eq!(settings.respawn_key, "J");
        assert_eq!(settings.camera_switch(), Duration::from_secs(2));
        assert_eq!(settings.request_delay(), Duration::from_secs(1));
        assert!(!settings.auto_respawn);
        assert_eq!(settings.retry_cooldown(), Duration::from_secs(5));
    }

    #[test]
    fn partial_override() {
        let settings =
            MirrorSettings::from_toml_str("respawn_key = \"R\"\nauto_respawn = true").unwrap();

        assert_eq!(settings.respawn_key, "R");
        assert!(settings.auto_respawn);
        assert_eq!(settings.request_delay_ms, 1000);
    }

    #[test]
    fn retry_cooldown_override() {
        let settings = MirrorSettings::from_toml_str("retry_cooldown_ms = 250").unwrap();

        assert_eq!(settings.retry_cooldown(), Duration::from_millis(250));
    }

    #[test]
    fn blank_key_is_invalid() {
        let err = MirrorSettings::from_toml_str("respawn_key = \"  \"").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }
}
