//! Shared start-up plumbing for command-line tools: flag parsing with a
//! consistent error and help policy, typed flag values, and leveled logging
//! to stderr and an optional log file.
//!
//! ```no_run
//! use clap::Parser;
//! use cli_init::{info, logging, parse_flags_or_die, Usage};
//!
//! #[derive(Parser)]
//! struct Opts {
//!     #[command(flatten)]
//!     logging: logging::Options,
//! }
//!
//! impl Usage for Opts {}
//!
//! let (opts, _) = parse_flags_or_die::<Opts>("tool");
//! let registry = logging::init_logging_options(&opts.logging).unwrap();
//! let log = cli_init::get_logger!(registry);
//! info!(log, "started");
//! ```

pub mod cli;
pub mod completion;
pub mod errors;
pub mod flags;
pub mod logging;
pub mod values;
pub mod verbosity;

pub use completion::{Completion, CompletionHandler, COMPLETION_ENV};
pub use errors::{FlagsError, LoggingError, ValueError};
pub use flags::{
    active_command, active_full_command, get_usage, parse_flags, parse_flags_from_args_or_die,
    parse_flags_or_die, AdditionalUsageInfo, FlagParser, Parsed, ParserOptions, Usage,
};
pub use logging::{Logger, Registry};
pub use values::{ByteSize, Duration, UnmarshalFlag};
pub use verbosity::{Verbosity, MAX_VERBOSITY, MIN_VERBOSITY};
