// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AsyncRunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AsyncRunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.defaults, raw.runner))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_defaults(cfg)?;
    validate_runner(cfg)?;
    Ok(())
}

fn validate_defaults(cfg: &RawConfigFile) -> Result<()> {
    if let Some(title) = &cfg.defaults.title {
        if title.trim().is_empty() {
            return Err(AsyncRunError::ConfigError(
                "[defaults].title must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    let runner = &cfg.runner;

    if runner.default_command.trim().is_empty() {
        return Err(AsyncRunError::ConfigError(
            "[runner].default_command must not be empty".to_string(),
        ));
    }

    if runner.poll_interval_ms == 0 {
        return Err(AsyncRunError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if !(1..=99).contains(&runner.split_percent) {
        return Err(AsyncRunError::ConfigError(format!(
            "[runner].split_percent must be between 1 and 99 (got {})",
            runner.split_percent
        )));
    }

    Ok(())
}
