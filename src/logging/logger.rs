use std::fmt;
use std::sync::Arc;

use super::formatter::CallSite;
use super::registry::Registry;
use crate::verbosity::Verbosity;

/// A named handle for emitting records through a [`Registry`].
///
/// Loggers hold no backend of their own: every record goes through whatever
/// the registry has installed at the time it is emitted. Records are emitted
/// with the [`critical!`](crate::critical) .. [`debug!`](crate::debug) and
/// [`fatal!`](crate::fatal) macros, which capture the calling function.
#[derive(Debug, Clone)]
pub struct Logger {
    name: Arc<str>,
    registry: Registry,
}

impl Logger {
    pub(crate) fn new(name: &str, registry: Registry) -> Self {
        Self {
            name: Arc::from(name),
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled_for(&self, level: Verbosity) -> bool {
        self.registry.is_enabled_for(level, &self.name)
    }

    /// Emits one record; used by the logging macros.
    pub fn log(&self, level: Verbosity, call_site: CallSite, args: fmt::Arguments<'_>) {
        self.registry.emit(&self.name, level, call_site, args);
    }
}

/// Call site of the macro invocation, including the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __call_site {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        $crate::logging::CallSite::new(file!(), line!(), name)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger: &$crate::logging::Logger = &$logger;
        if logger.is_enabled_for($level) {
            logger.log($level, $crate::__call_site!(), format_args!($($arg)+));
        }
    }};
}

/// Logs at critical: `critical!(log, "lost {} targets", n)`.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Critical, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Error, $($arg)+) };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Warning, $($arg)+) };
}

#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Notice, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Info, $($arg)+) };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => { $crate::__log!($logger, $crate::Verbosity::Debug, $($arg)+) };
}

/// Logs at critical and exits with status 1.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {{
        let logger: &$crate::logging::Logger = &$logger;
        logger.log($crate::Verbosity::Critical, $crate::__call_site!(), format_args!($($arg)+));
        ::std::process::exit(1)
    }};
}

/// A logger named after the calling module, `a::b` becoming `a.b`.
#[macro_export]
macro_rules! get_logger {
    ($registry:expr) => {
        $registry.logger(&module_path!().replace("::", "."))
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, FixedOffset, TimeZone};

    use crate::logging::backend::tests::Capture;
    use crate::logging::backend::{LeveledBackend, WriterBackend};
    use crate::logging::formatter::JsonFormatter;
    use crate::logging::Registry;
    use crate::verbosity::Verbosity;

    fn epoch() -> DateTime<FixedOffset> {
        chrono::Utc.timestamp_opt(0, 0).unwrap().fixed_offset()
    }

    fn json_registry(level: Verbosity) -> (Registry, Capture) {
        let registry = Registry::with_clock(epoch);
        let capture = Capture::default();
        registry.install(Arc::new(LeveledBackend::new(
            WriterBackend::new(capture.clone(), Box::new(JsonFormatter)),
            level,
        )));
        (registry, capture)
    }

    fn entries(capture: &Capture) -> Vec<serde_json::Value> {
        capture
            .text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn get_logger_uses_dotted_module_path() {
        let registry = Registry::new();
        let log = get_logger!(registry);
        assert_eq!(log.name(), "cli_init.logging.logger.tests");
    }

    #[test]
    fn macros_record_function_and_line() {
        let (registry, capture) = json_registry(Verbosity::Debug);
        let log = registry.logger("m");
        let line = line!() + 1;
        info!(log, "built {} targets", 3);

        let entry = &entries(&capture)[0];
        assert_eq!(entry["msg"], "built 3 targets");
        assert_eq!(entry["level"], "info");
        assert_eq!(entry["module"], "m");
        assert_eq!(entry["file"], format!("{}:{}", file!(), line));
        assert_eq!(
            entry["func"],
            "cli_init::logging::logger::tests::macros_record_function_and_line"
        );
    }

    #[test]
    fn every_severity_records_the_calling_function() {
        let (registry, capture) = json_registry(Verbosity::Debug);
        let log = registry.logger("m");
        critical!(log, "a");
        error!(log, "b");
        warning!(log, "c");
        notice!(log, "d");
        info!(log, "e");
        debug!(log, "f");
        let entries = entries(&capture);
        assert_eq!(entries.len(), 6);
        for entry in &entries {
            assert_eq!(
                entry["func"],
                "cli_init::logging::logger::tests::every_severity_records_the_calling_function"
            );
        }
    }

    #[test]
    fn call_site_inside_closures_names_the_enclosing_function() {
        let (registry, capture) = json_registry(Verbosity::Debug);
        let log = registry.logger("m");
        let emit = || info!(log, "from a closure");
        emit();
        let func = entries(&capture)[0]["func"].as_str().unwrap().to_string();
        assert!(
            func.starts_with("cli_init::logging::logger::tests::call_site_inside_closures"),
            "{func}"
        );
    }

    #[test]
    fn each_severity_is_filtered_by_level() {
        let (registry, capture) = json_registry(Verbosity::Warning);
        let log = registry.logger("m");
        critical!(log, "a");
        error!(log, "b");
        warning!(log, "c");
        notice!(log, "d");
        info!(log, "e");
        debug!(log, "f");
        let levels: Vec<_> = entries(&capture)
            .iter()
            .map(|e| e["level"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(levels, ["critical", "error", "warning"]);
    }

    #[test]
    fn disabled_levels_skip_formatting() {
        struct Explodes;
        impl std::fmt::Display for Explodes {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("formatted a disabled record");
            }
        }
        let (registry, _capture) = json_registry(Verbosity::Error);
        let log = registry.logger("m");
        debug!(log, "{}", Explodes);
    }
}
