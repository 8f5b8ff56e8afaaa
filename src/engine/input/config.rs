// Input settings, loaded from TOML

use super::event::DoubleClickConvention;
use super::InputError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for an input system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Seconds per fixed update
    pub fixed_timestep: f64,

    /// Fixed updates run at most this many times per frame
    pub max_fixed_steps: u32,

    /// Seconds an assignment must stay idle before input from an
    /// unassigned device may switch schemes
    pub min_reinitialize_delay: f64,

    pub double_click_convention: DoubleClickConvention,

    /// Axis magnitude a binding capture needs before it accepts a control
    pub capture_threshold: f32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_fixed_steps: 5,
            min_reinitialize_delay: 0.5,
            double_click_convention: DoubleClickConvention::default(),
            capture_threshold: 0.5,
        }
    }
}

impl InputSettings {
    /// Parse settings; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, InputError> {
        let settings: InputSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::info!("Loading input settings from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, InputError> {
        toml::to_string_pretty(self).map_err(|e| InputError::InvalidSettings(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let problem = if self.fixed_timestep <= 0.0 || !self.fixed_timestep.is_finite() {
            Some(format!("fixed_timestep must be positive, got {}", self.fixed_timestep))
        } else if self.max_fixed_steps == 0 {
            Some("max_fixed_steps must be at least 1".to_string())
        } else if self.min_reinitialize_delay.is_nan() || self.min_reinitialize_delay < 0.0 {
            Some(format!(
                "min_reinitialize_delay must not be negative, got {}",
                self.min_reinitialize_delay
            ))
        } else if !(0.0..=1.0).contains(&self.capture_threshold) {
            Some(format!(
                "capture_threshold must lie in [0, 1], got {}",
                self.capture_threshold
            ))
        } else {
            None
        };

        match problem {
            Some(problem) => {
                log::warn!("Rejected input settings: {}", problem);
                Err(InputError::InvalidSettings(problem))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = InputSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_fixed_steps, 5);
        assert_eq!(settings.double_click_convention, DoubleClickConvention::OnPress);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = InputSettings::from_toml_str(
            r#"
            max_fixed_steps = 3
            double_click_convention = "on_release"
            "#,
        )
        .unwrap();
        assert_eq!(settings.max_fixed_steps, 3);
        assert_eq!(settings.double_click_convention, DoubleClickConvention::OnRelease);
        assert_eq!(settings.fixed_timestep, InputSettings::default().fixed_timestep);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(InputSettings::from_toml_str("").unwrap(), InputSettings::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = InputSettings::from_toml_str("fixed_timestep = 0.0");
        assert!(matches!(result, Err(InputError::InvalidSettings(_))));

        let result = InputSettings::from_toml_str("capture_threshold = 1.5");
        assert!(matches!(result, Err(InputError::InvalidSettings(_))));
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let result = InputSettings::from_toml_str("max_fixed_steps = \"many\"");
        assert!(matches!(result, Err(InputError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = InputSettings::load("/nonexistent/input-settings.toml");
        assert!(matches!(result, Err(InputError::Io(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = InputSettings {
            max_fixed_steps: 8,
            ..InputSettings::default()
        };
        let text = settings.to_toml_string().unwrap();
        assert_eq!(InputSettings::from_toml_str(&text).unwrap(), settings);
    }
}
