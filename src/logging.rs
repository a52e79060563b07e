//! Leveled logging to stderr and an optional log file.
//!
//! Loggers are obtained from a [`Registry`] and write through whichever backend
//! it was last initialised with. `tracing` and `log` output can be routed into
//! the same registry with [`Registry::install_tracing`] and
//! [`Registry::install_log_bridge`].

mod backend;
mod bridge;
mod file;
mod formatter;
mod logger;
mod registry;

use std::path::Path;

pub use backend::{Backend, LeveledBackend, MultiBackend, WriterBackend};
pub use bridge::{LogBridge, RegistryLayer};
pub use file::LogFile;
pub use formatter::{formatter, should_colour, CallSite, Formatter, JsonFormatter, Record, TextFormatter};
pub use logger::Logger;
pub use registry::{Clock, Registry};

pub use crate::cli::Options;
use crate::errors::LoggingError;
use crate::verbosity::Verbosity;

/// A fresh registry logging to stderr only.
pub fn init_logging(verbosity: Verbosity) -> Registry {
    let registry = Registry::new();
    registry.init(verbosity);
    registry
}

/// A fresh registry configured from parsed command-line options.
pub fn init_logging_options(opts: &Options) -> Result<Registry, LoggingError> {
    let registry = Registry::new();
    registry.init_options(opts)?;
    Ok(registry)
}

pub fn init_file_logging(
    stderr_verbosity: Verbosity,
    file_verbosity: Verbosity,
    path: impl AsRef<Path>,
) -> Result<Registry, LoggingError> {
    let registry = Registry::new();
    registry.init_file(stderr_verbosity, file_verbosity, path)?;
    Ok(registry)
}

pub fn must_init_file_logging(
    stderr_verbosity: Verbosity,
    file_verbosity: Verbosity,
    path: impl AsRef<Path>,
) -> Registry {
    let registry = Registry::new();
    registry.must_init_file(stderr_verbosity, file_verbosity, path);
    registry
}

pub fn init_structured_logging(
    stderr_verbosity: Verbosity,
    file_verbosity: Verbosity,
    path: impl AsRef<Path>,
    structured: bool,
) -> Result<Registry, LoggingError> {
    let registry = Registry::new();
    registry.init_structured(stderr_verbosity, file_verbosity, path, structured)?;
    Ok(registry)
}

pub fn must_init_structured_logging(
    stderr_verbosity: Verbosity,
    file_verbosity: Verbosity,
    path: impl AsRef<Path>,
    structured: bool,
) -> Registry {
    let registry = Registry::new();
    registry.must_init_structured(stderr_verbosity, file_verbosity, path, structured);
    registry
}
