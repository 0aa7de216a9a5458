use super::{ConfigError, SinkKind};
use crate::app::logging_system::TracingFormat;
use crate::domain::Severity;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Minimum severity for the startup loggers
    #[arg(long, env = "LOG_LEVEL", default_value = "info", ignore_case = true)]
    pub log_level: Severity,

    /// Logger output sink
    #[arg(long, env = "LOG_SINK", default_value = "stdio")]
    pub sink: SinkKind,

    /// Output format of the tracing subscriber (used with --sink tracing)
    #[arg(long, env = "TRACING_FORMAT", default_value = "compact")]
    pub tracing_format: TracingFormat,

    /// Install a panic hook that reports panics to the error handlers
    #[arg(long, env = "INSTALL_PANIC_HOOK", default_value_t = true, action = clap::ArgAction::Set)]
    pub install_panic_hook: bool,

    /// Force the named startup phase to fail
    #[arg(long, env = "FAIL_PHASE")]
    pub fail_phase: Option<String>,

    /// Configuration file path (optional)
    #[serde(skip)]
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Severity::Info,
            sink: SinkKind::Stdio,
            tracing_format: TracingFormat::Compact,
            install_panic_hook: true,
            fail_phase: None,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse arguments, then replace them with the config file if one was given.
    pub fn from_args_and_file<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::from_args(args)?;
        match &config.config_file {
            Some(path) => {
                let mut from_file = Self::from_file(path)?;
                from_file.config_file = Some(path.clone());
                Ok(from_file)
            }
            None => Ok(config),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
