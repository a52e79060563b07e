use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::errors::ValueError;
use crate::values::UnmarshalFlag;

/// Severity of a log record, and the minimum severity a backend lets through.
///
/// Levels are ordered from least to most verbose, so a record is shown when its
/// level is `<=` the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Verbosity {
    Critical,
    Error,
    #[default]
    Warning,
    Notice,
    Info,
    Debug,
}

/// The most verbose level reachable through integer flags.
pub const MAX_VERBOSITY: Verbosity = Verbosity::Debug;

/// The least verbose level reachable through integer flags.
pub const MIN_VERBOSITY: Verbosity = Verbosity::Error;

impl Verbosity {
    pub const ALL: [Verbosity; 6] = [
        Verbosity::Critical,
        Verbosity::Error,
        Verbosity::Warning,
        Verbosity::Notice,
        Verbosity::Info,
        Verbosity::Debug,
    ];

    /// Lowercase name, as used in JSON output and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Verbosity::Critical => "critical",
            Verbosity::Error => "error",
            Verbosity::Warning => "warning",
            Verbosity::Notice => "notice",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }

    /// Uppercase name, as used in text output.
    pub fn label(self) -> &'static str {
        match self {
            Verbosity::Critical => "CRITICAL",
            Verbosity::Error => "ERROR",
            Verbosity::Warning => "WARNING",
            Verbosity::Notice => "NOTICE",
            Verbosity::Info => "INFO",
            Verbosity::Debug => "DEBUG",
        }
    }

    /// Maps the integer scale (0 = errors only .. 4 = everything) onto a level,
    /// clamping anything outside it.
    pub fn from_int(i: i64) -> Verbosity {
        match i {
            0 => Verbosity::Error,
            1 => Verbosity::Warning,
            2 => Verbosity::Notice,
            3 => Verbosity::Info,
            4 => Verbosity::Debug,
            i if i < 0 => {
                tracing::warn!(
                    "Invalid log level {}; minimum is 0. Displaying critical errors only.",
                    i
                );
                Verbosity::Critical
            }
            i => {
                tracing::warn!(
                    "Invalid log level {}; maximum is 4. Displaying all messages.",
                    i
                );
                Verbosity::Debug
            }
        }
    }

    fn from_alias(text: &str) -> Option<Verbosity> {
        let level = match text {
            "critical" | "fatal" => Verbosity::Critical,
            "0" | "error" => Verbosity::Error,
            "1" | "warning" | "warn" => Verbosity::Warning,
            "2" | "notice" | "v" => Verbosity::Notice,
            "3" | "info" | "vv" => Verbosity::Info,
            "4" | "debug" | "vvv" => Verbosity::Debug,
            _ => return None,
        };
        Some(level)
    }
}

// Accepts a named level (-v debug), an integer (-v 4, where -v 1 is warnings and
// errors) or a run of v's (-vvv). A bare "v" is the notice alias, not a count.
impl UnmarshalFlag for Verbosity {
    fn unmarshal_flag(&mut self, text: &str) -> Result<(), ValueError> {
        let lower = text.to_lowercase();
        if let Some(level) = Verbosity::from_alias(&lower) {
            *self = level;
            return Ok(());
        }
        // Integers beyond i64 clamp like any other out-of-range level.
        let int = match lower.parse::<i64>() {
            Ok(i) => Some(i),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(i64::MAX),
            Err(e) if *e.kind() == IntErrorKind::NegOverflow => Some(i64::MIN),
            Err(_) => None,
        };
        if let Some(i) = int {
            *self = Verbosity::from_int(i);
            return Ok(());
        }
        if !lower.is_empty() && lower.chars().all(|c| c == 'v') {
            let count = i64::try_from(lower.len()).unwrap_or(i64::MAX);
            *self = Verbosity::from_int(count);
            return Ok(());
        }
        Err(ValueError::Verbosity(text.to_string()))
    }
}

impl FromStr for Verbosity {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut v = Verbosity::default();
        v.unmarshal_flag(s)?;
        Ok(v)
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<tracing::Level> for Verbosity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Verbosity::Error,
            tracing::Level::WARN => Verbosity::Warning,
            tracing::Level::INFO => Verbosity::Info,
            tracing::Level::DEBUG | tracing::Level::TRACE => Verbosity::Debug,
        }
    }
}

impl From<log::Level> for Verbosity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Verbosity::Error,
            log::Level::Warn => Verbosity::Warning,
            log::Level::Info => Verbosity::Info,
            log::Level::Debug | log::Level::Trace => Verbosity::Debug,
        }
    }
}
