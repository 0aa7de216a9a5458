use super::error::SeverityError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log line, ordered by escalation.
///
/// The discriminant is the rank used for threshold comparisons, so
/// `Debug < Info < Warn < Error` holds both for the enum and for `rank()`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    #[serde(alias = "DEBUG")]
    Debug = 0,
    #[default]
    #[serde(alias = "INFO")]
    Info = 1,
    #[serde(alias = "WARN", alias = "warning")]
    Warn = 2,
    #[serde(alias = "ERROR")]
    Error = 3,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
    ];

    /// Uppercase name as it appears in emitted lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Lowercase name used in `EnvFilter` directives.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Inverse of `rank()`. Out-of-range ranks map to the default severity.
    pub fn from_rank(rank: u8) -> Self {
        match rank {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::default(),
        }
    }

    pub fn valid_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Severity::as_str).collect()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact lookup over the uppercase names. The CLI and TOML paths go through
/// `ValueEnum` and serde instead, which are more forgiving.
impl FromStr for Severity {
    type Err = SeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            _ => Err(SeverityError::Unknown {
                input: s.to_string(),
                valid: Severity::valid_names(),
            }),
        }
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Debug.rank() < Severity::Error.rank());
    }

    #[test]
    fn test_severity_parse_exact_names() {
        assert_eq!("DEBUG".parse::<Severity>().unwrap(), Severity::Debug);
        assert_eq!("INFO".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);

        assert!("INVALID".parse::<Severity>().is_err());
        assert!("".parse::<Severity>().is_err());
        assert!("TRACE".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_parse_rejects_near_misses() {
        for name in ["warn", "Warning", "WARNING", " ERROR ", "debug", "Info"] {
            assert!(name.parse::<Severity>().is_err(), "{name:?} should not parse");
        }
    }

    #[test]
    fn test_toml_names_are_lenient() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: Severity,
        }

        for (raw, expected) in [
            ("\"WARN\"", Severity::Warn),
            ("\"warn\"", Severity::Warn),
            ("\"warning\"", Severity::Warn),
            ("\"DEBUG\"", Severity::Debug),
        ] {
            let parsed: Wrapper = toml::from_str(&format!("level = {raw}")).unwrap();
            assert_eq!(parsed.level, expected);
        }
    }

    #[test]
    fn test_unknown_severity_lists_valid_names() {
        let err = "verbose".parse::<Severity>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("verbose"));
        for name in ["DEBUG", "INFO", "WARN", "ERROR"] {
            assert!(message.contains(name), "missing {name} in {message}");
        }
    }

    #[test]
    fn test_rank_round_trip_and_out_of_range() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_rank(severity.rank()), severity);
        }
        assert_eq!(Severity::from_rank(42), Severity::Info);
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(Severity::default(), Severity::Info);
    }

    #[test]
    fn test_display_is_uppercase() {
        assert_eq!(Severity::Warn.to_string(), "WARN");
        assert_eq!(Severity::Debug.as_filter_str(), "debug");
    }

    #[test]
    fn test_into_tracing_level() {
        assert_eq!(tracing::Level::from(Severity::Error), tracing::Level::ERROR);
        assert_eq!(tracing::Level::from(Severity::Debug), tracing::Level::DEBUG);
    }
}
