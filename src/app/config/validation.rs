use super::{Config, ConfigError};
use crate::app::phase::DEFAULT_PHASES;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(phase) = &self.fail_phase
            && !DEFAULT_PHASES.contains(&phase.as_str())
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Unknown phase '{phase}'. Valid phases: {DEFAULT_PHASES:?}"
            )));
        }

        if let Some(path) = &self.config_file
            && path.as_os_str().is_empty()
        {
            return Err(ConfigError::InvalidConfig(
                "Config file path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
