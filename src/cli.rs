use std::convert::Infallible;
use std::path::{Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};

use crate::verbosity::Verbosity;

/// Logging flags shared by every tool; `#[command(flatten)]` them into the
/// tool's own options and pass the result to
/// [`init_logging_options`](crate::logging::init_logging_options).
///
/// `Options::default()` logs warnings to stderr and opens no file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Verbosity of output (error, warning, notice, info, debug)
    #[arg(short = 'v', long = "verbosity", default_value = "warning", value_name = "LEVEL")]
    pub verbosity: Verbosity,

    /// File to echo full logging output to
    #[arg(
        long = "log_file",
        default_value = "plz-out/log/build.log",
        value_name = "PATH",
        value_parser = path_allowing_empty
    )]
    pub log_file: Option<PathBuf>,

    /// Log level for file output
    #[arg(long = "log_file_level", default_value = "debug", value_name = "LEVEL")]
    pub log_file_level: Verbosity,

    /// Append log to existing file instead of overwriting its content
    #[arg(long = "log_append")]
    pub log_append: bool,

    /// Forces coloured output from logging and other shell output
    #[arg(long = "colour")]
    pub colour: bool,

    /// Forces colourless output from logging and other shell output
    #[arg(long = "nocolour")]
    pub no_colour: bool,

    /// Output logs in structured (JSON) format
    #[arg(
        long = "structured_logs",
        env = "STRUCTURED_LOGS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub structured: bool,
}

impl Options {
    /// The log file to open, if any. An empty path counts as none.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

// Clap's own path parser rejects `--log_file=`, which is how file logging is
// switched off.
fn path_allowing_empty(value: &str) -> Result<PathBuf, Infallible> {
    Ok(PathBuf::from(value))
}
