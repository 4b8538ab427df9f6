// src/config/validate.rs

use std::sync::OnceLock;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PackpipeError, Result};
use crate::types::CompressorKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PackpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_archive(cfg)?;
    validate_progress(cfg)?;
    validate_cancel(cfg)?;
    Ok(())
}

fn validate_archive(cfg: &RawConfigFile) -> Result<()> {
    if cfg.archive.level > 9 {
        return Err(PackpipeError::ConfigError(format!(
            "[archive].level must be between 0 and 9 (got {})",
            cfg.archive.level
        )));
    }

    if let Some(ref dict) = cfg.archive.dictionary {
        if cfg.archive.engine != CompressorKind::SevenZip {
            return Err(PackpipeError::ConfigError(
                "[archive].dictionary is only supported with engine = \"7z\"".to_string(),
            ));
        }
        if !dictionary_pattern().is_match(dict) {
            return Err(PackpipeError::ConfigError(format!(
                "[archive].dictionary must look like \"64m\" (got \"{dict}\")"
            )));
        }
    }

    Ok(())
}

fn validate_progress(cfg: &RawConfigFile) -> Result<()> {
    if cfg.progress.spinner_interval_ms == 0 {
        return Err(PackpipeError::ConfigError(
            "[progress].spinner_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_cancel(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cancel.grace_period_ms == 0 {
        return Err(PackpipeError::ConfigError(
            "[cancel].grace_period_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.cancel.reap_timeout_ms == 0 {
        return Err(PackpipeError::ConfigError(
            "[cancel].reap_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn dictionary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^[1-9][0-9]*[bkmg]?$").expect("valid dictionary regex"))
}
