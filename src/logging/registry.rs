use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, Local};
use is_terminal::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use super::backend::{Backend, LeveledBackend, MultiBackend, WriterBackend};
use super::bridge::{LogBridge, RegistryLayer};
use super::file::LogFile;
use super::formatter::{formatter, should_colour, CallSite, Record};
use super::logger::Logger;
use crate::cli::Options;
use crate::errors::LoggingError;
use crate::verbosity::Verbosity;

/// Source of record timestamps.
pub type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Tracks every named logger and the backend they currently write to.
///
/// Cloning is cheap and clones share state, so a registry can be handed to
/// every component that creates loggers. Re-initialising swaps the backend for
/// all existing loggers at once.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    clock: Clock,
}

struct State {
    // What records are sent to: stderr alone, or stderr fanned out with a file.
    backend: Arc<dyn Backend>,
    // The stderr backend; module levels are read from and written to it.
    levels: Arc<LeveledBackend>,
    modules: BTreeSet<String>,
    log_file: Option<LogFile>,
}

impl Registry {
    /// A registry logging text to stderr at the default verbosity.
    pub fn new() -> Self {
        Self::with_clock(local_now)
    }

    pub fn with_clock(clock: Clock) -> Self {
        let stderr = Arc::new(stderr_backend(Verbosity::default(), false, false, false));
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    backend: stderr.clone(),
                    levels: stderr,
                    modules: BTreeSet::new(),
                    log_file: None,
                }),
                clock,
            }),
        }
    }

    /// Logs to stderr only, as plain text.
    pub fn init(&self, verbosity: Verbosity) {
        self.init_stderr(verbosity, false, false, false);
    }

    /// Logs to stderr and, if the options name one, to a log file.
    ///
    /// The stderr backend is installed even when opening the file fails.
    pub fn init_options(&self, opts: &Options) -> Result<(), LoggingError> {
        let stderr = self.init_stderr(opts.verbosity, opts.structured, opts.colour, opts.no_colour);
        let Some(path) = opts.log_file() else {
            return Ok(());
        };

        let file = LogFile::open(path, opts.log_append)?;
        let file_backend = LeveledBackend::new(
            WriterBackend::new(file.clone(), formatter(opts.structured, false)),
            opts.log_file_level,
        );
        let members: Vec<Arc<dyn Backend>> = vec![stderr.clone(), Arc::new(file_backend)];
        let fanout = MultiBackend::new(members);
        self.replace(stderr, Arc::new(fanout), Some(file));
        tracing::debug!(path = %path.display(), append = opts.log_append, "logging to file");
        Ok(())
    }

    /// Logs to stderr and to `path`, each at its own level. An empty path
    /// means stderr only.
    pub fn init_file(
        &self,
        stderr_verbosity: Verbosity,
        file_verbosity: Verbosity,
        path: impl AsRef<Path>,
    ) -> Result<(), LoggingError> {
        self.init_structured(stderr_verbosity, file_verbosity, path, false)
    }

    /// Like [`Registry::init_file`] but dies on any error.
    pub fn must_init_file(
        &self,
        stderr_verbosity: Verbosity,
        file_verbosity: Verbosity,
        path: impl AsRef<Path>,
    ) {
        self.must_init_structured(stderr_verbosity, file_verbosity, path, false);
    }

    /// Like [`Registry::init_file`] but choosing between text and JSON lines.
    pub fn init_structured(
        &self,
        stderr_verbosity: Verbosity,
        file_verbosity: Verbosity,
        path: impl AsRef<Path>,
        structured: bool,
    ) -> Result<(), LoggingError> {
        self.init_options(&Options {
            verbosity: stderr_verbosity,
            log_file: Some(path.as_ref().to_path_buf()),
            log_file_level: file_verbosity,
            structured,
            ..Options::default()
        })
    }

    /// Like [`Registry::init_structured`] but dies on any error.
    pub fn must_init_structured(
        &self,
        stderr_verbosity: Verbosity,
        file_verbosity: Verbosity,
        path: impl AsRef<Path>,
        structured: bool,
    ) {
        if let Err(err) = self.init_structured(stderr_verbosity, file_verbosity, path, structured) {
            let log = crate::get_logger!(self);
            crate::fatal!(log, "Failed to open log file: {}", err);
        }
    }

    /// Replaces the active backend with a caller-built one.
    pub fn install(&self, backend: Arc<LeveledBackend>) {
        self.replace(backend.clone(), backend, None);
    }

    /// Closes the log file, if one is open. Safe to call at any time.
    pub fn close(&self) -> io::Result<()> {
        let file = self.lock().log_file.take();
        match file {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }

    /// The open log file, if any.
    pub fn log_file(&self) -> Option<LogFile> {
        self.lock().log_file.clone()
    }

    /// Effective level of the root (`""`) and of every registered module.
    pub fn module_levels(&self) -> BTreeMap<String, Verbosity> {
        let state = self.lock();
        let mut levels = BTreeMap::new();
        levels.insert(String::new(), state.levels.get_level(""));
        for module in &state.modules {
            levels.insert(module.clone(), state.levels.get_level(module));
        }
        levels
    }

    /// Sets the level of one module (`""` for the root), taking effect
    /// immediately for every logger of that name.
    pub fn set_level(&self, level: Verbosity, module: &str) {
        let levels = self.lock().levels.clone();
        levels.set_level(level, module);
    }

    pub fn register(&self, name: &str) {
        let mut state = self.lock();
        if !state.modules.contains(name) {
            state.modules.insert(name.to_string());
        }
    }

    /// Registers `name` and returns a logger for it.
    pub fn logger(&self, name: &str) -> Logger {
        self.register(name);
        Logger::new(name, self.clone())
    }

    pub fn is_enabled_for(&self, level: Verbosity, module: &str) -> bool {
        let backend = self.lock().backend.clone();
        backend.is_enabled_for(level, module)
    }

    /// Formats and writes one record through the active backend.
    pub fn emit(&self, module: &str, level: Verbosity, call_site: CallSite, args: fmt::Arguments<'_>) {
        let backend = self.lock().backend.clone();
        if !backend.is_enabled_for(level, module) {
            return;
        }
        let message = fmt::format(args);
        let record = Record {
            time: (self.shared.clock)(),
            level,
            module,
            call_site,
            message: &message,
        };
        // A failed write has nowhere better to be reported.
        let _ = backend.log(&record);
    }

    /// Routes `tracing` events into this registry process-wide.
    ///
    /// `RUST_LOG`, when set, filters events before they reach the registry.
    pub fn install_tracing(&self) -> Result<(), LoggingError> {
        let filter = EnvFilter::try_from_default_env().ok();
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(RegistryLayer::new(self.clone()));
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }

    /// Routes `log` records into this registry process-wide.
    pub fn install_log_bridge(&self) -> Result<(), LoggingError> {
        log::set_boxed_logger(Box::new(LogBridge::new(self.clone())))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }

    fn init_stderr(
        &self,
        verbosity: Verbosity,
        structured: bool,
        colour: bool,
        no_colour: bool,
    ) -> Arc<LeveledBackend> {
        let backend = Arc::new(stderr_backend(verbosity, structured, colour, no_colour));
        self.replace(backend.clone(), backend.clone(), None);
        backend
    }

    // Swaps in a new backend; a previously opened log file is closed.
    fn replace(&self, levels: Arc<LeveledBackend>, backend: Arc<dyn Backend>, log_file: Option<LogFile>) {
        let previous = {
            let mut state = self.lock();
            state.levels = levels;
            state.backend = backend;
            std::mem::replace(&mut state.log_file, log_file)
        };
        if let Some(old) = previous {
            if let Err(err) = old.close() {
                tracing::warn!(path = %old.path().display(), "failed to close log file: {}", err);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Registry")
            .field("modules", &state.modules)
            .field("log_file", &state.log_file)
            .finish_non_exhaustive()
    }
}

fn stderr_backend(verbosity: Verbosity, structured: bool, colour: bool, no_colour: bool) -> LeveledBackend {
    let colour = should_colour(io::stderr().is_terminal(), colour, no_colour);
    LeveledBackend::new(
        WriterBackend::new(io::stderr(), formatter(structured, colour)),
        verbosity,
    )
}
