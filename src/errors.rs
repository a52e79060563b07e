use std::path::PathBuf;

use thiserror::Error;

use crate::completion::Completion;

/// Errors produced when a flag value can't be turned into its typed form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid log level {0}")]
    Verbosity(String),

    #[error("invalid duration {text:?}: {reason}")]
    Duration { text: String, reason: String },

    #[error("invalid byte size {text:?}: {reason}")]
    ByteSize { text: String, reason: String },
}

#[derive(Error, Debug)]
pub enum FlagsError {
    /// The options type itself is malformed (duplicate flags and the like).
    #[error("{0}")]
    Structure(String), // Exit 1

    /// Help or version output was requested; carries the text to print.
    #[error("{0}")]
    Help(String), // Exit 0

    /// Shell completion was requested; carries the candidates.
    #[error("completion requested")]
    Completion(Vec<Completion>), // Exit 0

    #[error("{source}")]
    Parse {
        /// The deepest subcommand named on the command line, for rendering help.
        command: Box<clap::Command>,
        #[source]
        source: clap::Error,
    }, // Exit 1
}

impl FlagsError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FlagsError::Help(_) | FlagsError::Completion(_) => 0,
            FlagsError::Structure(_) | FlagsError::Parse { .. } => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("failed to create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path:?}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    InstallTracing(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to install log bridge: {0}")]
    InstallLog(#[from] log::SetLoggerError),
}
