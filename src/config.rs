//! Per-attachment settings supplied by the host.

use crate::emitter::{EventMode, OutputProjection};
use crate::error::ConfigError;
use crate::variant::SensorVariant;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub variant: SensorVariant,
    pub projection: OutputProjection,
    pub event_mode: EventMode,
    /// Global switch; when off no notifications are sent whatever the mode.
    pub events_enabled: bool,
    /// Prefix of every notification, `<name>#<value name>=<value>`.
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            variant: SensorVariant::Pms5003,
            projection: OutputProjection::ParticleMass,
            event_mode: EventMode::None,
            events_enabled: true,
            name: "PMSx003".to_string(),
        }
    }
}

impl Config {
    /// Builds a config from the three stored selector values.
    pub fn from_selectors(
        variant: u8,
        projection: u8,
        event_mode: u8,
        name: &str,
    ) -> Result<Config, ConfigError> {
        let config = Config {
            variant: SensorVariant::from_selector(variant)
                .ok_or_else(|| ConfigError::UnknownVariant(variant.to_string()))?,
            projection: OutputProjection::from_selector(projection)
                .ok_or_else(|| ConfigError::UnknownProjection(projection.to_string()))?,
            event_mode: EventMode::from_selector(event_mode)
                .ok_or_else(|| ConfigError::UnknownEventMode(event_mode.to_string()))?,
            events_enabled: true,
            name: name.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects projections the variant doesn't send fields for.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.projection.supported_by(self.variant.layout()) {
            return Err(ConfigError::UnsupportedProjection {
                variant: self.variant,
                projection: self.projection,
            });
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}
