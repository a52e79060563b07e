use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::formatter::{Formatter, Record};
use crate::verbosity::Verbosity;

/// A destination for log records.
pub trait Backend: Send + Sync {
    fn log(&self, record: &Record<'_>) -> io::Result<()>;

    /// Whether a record at `level` from `module` would be written at all.
    fn is_enabled_for(&self, _level: Verbosity, _module: &str) -> bool {
        true
    }
}

/// Formats records and writes them to a sink, one whole line per write.
pub struct WriterBackend {
    out: Mutex<Box<dyn Write + Send>>,
    formatter: Box<dyn Formatter>,
}

impl WriterBackend {
    pub fn new(out: impl Write + Send + 'static, formatter: Box<dyn Formatter>) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            formatter,
        }
    }
}

impl Backend for WriterBackend {
    fn log(&self, record: &Record<'_>) -> io::Result<()> {
        let mut line = Vec::with_capacity(128);
        self.formatter.format(record, &mut line)?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(&line)?;
        out.flush()
    }
}

/// Filters another backend by a minimum level per module.
///
/// A module without its own level inherits from its dotted parents
/// (`a.b.c` -> `a.b` -> `a`) and finally from the root, `""`.
pub struct LeveledBackend {
    inner: Box<dyn Backend>,
    levels: RwLock<HashMap<String, Verbosity>>,
}

impl LeveledBackend {
    pub fn new(inner: impl Backend + 'static, level: Verbosity) -> Self {
        let mut levels = HashMap::new();
        levels.insert(String::new(), level);
        Self {
            inner: Box::new(inner),
            levels: RwLock::new(levels),
        }
    }

    pub fn get_level(&self, module: &str) -> Verbosity {
        let levels = self.levels.read().unwrap_or_else(PoisonError::into_inner);
        let mut name = module;
        loop {
            if let Some(level) = levels.get(name) {
                return *level;
            }
            if name.is_empty() {
                return Verbosity::Debug;
            }
            name = name.rfind('.').map_or("", |i| &name[..i]);
        }
    }

    pub fn set_level(&self, level: Verbosity, module: &str) {
        self.levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.to_string(), level);
    }
}

impl Backend for LeveledBackend {
    fn log(&self, record: &Record<'_>) -> io::Result<()> {
        if !self.is_enabled_for(record.level, record.module) {
            return Ok(());
        }
        self.inner.log(record)
    }

    fn is_enabled_for(&self, level: Verbosity, module: &str) -> bool {
        level <= self.get_level(module)
    }
}

/// Sends every record to each member; members filter independently.
pub struct MultiBackend {
    backends: Vec<Arc<dyn Backend>>,
}

impl MultiBackend {
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        Self { backends }
    }
}

impl Backend for MultiBackend {
    fn log(&self, record: &Record<'_>) -> io::Result<()> {
        let mut result = Ok(());
        for backend in &self.backends {
            if let Err(err) = backend.log(record) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    fn is_enabled_for(&self, level: Verbosity, module: &str) -> bool {
        self.backends
            .iter()
            .any(|b| b.is_enabled_for(level, module))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logging::formatter::{CallSite, TextFormatter};
    use chrono::TimeZone;

    /// Cloneable in-memory sink for inspecting output.
    #[derive(Clone, Default)]
    pub(crate) struct Capture(pub Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub(crate) fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record<'a>(level: Verbosity, module: &'a str, message: &'a str) -> Record<'a> {
        Record {
            time: chrono::Utc.timestamp_opt(0, 0).unwrap().fixed_offset(),
            level,
            module,
            call_site: CallSite::new("x.rs", 1, ""),
            message,
        }
    }

    fn leveled(capture: &Capture, level: Verbosity) -> LeveledBackend {
        LeveledBackend::new(
            WriterBackend::new(capture.clone(), Box::new(TextFormatter::default())),
            level,
        )
    }

    #[test]
    fn filters_below_minimum_level() {
        let capture = Capture::default();
        let backend = leveled(&capture, Verbosity::Warning);
        backend.log(&record(Verbosity::Error, "m", "shown")).unwrap();
        backend.log(&record(Verbosity::Info, "m", "hidden")).unwrap();
        let text = capture.text();
        assert!(text.contains("shown"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn module_levels_inherit_from_dotted_parents() {
        let capture = Capture::default();
        let backend = leveled(&capture, Verbosity::Warning);
        backend.set_level(Verbosity::Debug, "core");
        backend.set_level(Verbosity::Error, "core.parse");

        assert_eq!(backend.get_level(""), Verbosity::Warning);
        assert_eq!(backend.get_level("other"), Verbosity::Warning);
        assert_eq!(backend.get_level("core"), Verbosity::Debug);
        assert_eq!(backend.get_level("core.build"), Verbosity::Debug);
        assert_eq!(backend.get_level("core.parse.lexer"), Verbosity::Error);
    }

    #[test]
    fn multi_backend_members_filter_independently() {
        let quiet = Capture::default();
        let loud = Capture::default();
        let multi = MultiBackend::new(vec![
            Arc::new(leveled(&quiet, Verbosity::Error)),
            Arc::new(leveled(&loud, Verbosity::Debug)),
        ]);
        assert!(multi.is_enabled_for(Verbosity::Debug, "m"));
        multi.log(&record(Verbosity::Debug, "m", "detail")).unwrap();
        multi.log(&record(Verbosity::Error, "m", "failure")).unwrap();

        assert_eq!(quiet.text().lines().count(), 1);
        assert!(quiet.text().contains("failure"));
        assert_eq!(loud.text().lines().count(), 2);
    }
}
