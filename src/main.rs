use std::process;

use clap::{Parser, Subcommand};
use cli_init::logging::{self, Options};
use cli_init::{info, notice, parse_flags_or_die, warning, ByteSize, Duration, Usage};

/// Small tool exercising the shared start-up path: flags, then logging.
#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    logging: Options,

    /// How long to wait before giving up
    #[arg(short = 't', long = "timeout", default_value = "10m")]
    timeout: Duration,

    /// Largest input accepted
    #[arg(short = 's', long = "max_size", default_value = "100MB")]
    max_size: ByteSize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parsed values
    Show,
    /// Print the effective level of every logger
    Levels,
}

impl Usage for Cli {
    fn default_usage() -> Option<&'static str> {
        Some("cli-init shows how flags and logging are wired up at start-up.")
    }
}

fn main() {
    let (args, command) = parse_flags_or_die::<Cli>("cli-init");

    let registry = match logging::init_logging_options(&args.logging) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = registry.install_tracing() {
        eprintln!("Error: {}", e);
    }
    let log = cli_init::get_logger!(registry);
    notice!(log, "running {}", command);

    match args.command {
        Command::Show => {
            println!("timeout: {}", args.timeout);
            println!("max_size: {}", args.max_size);
            println!("verbosity: {}", args.logging.verbosity);
        }
        Command::Levels => {
            for (module, level) in registry.module_levels() {
                let name = if module.is_empty() { "<root>" } else { module.as_str() };
                println!("{}: {}", name, level);
            }
        }
    }

    info!(log, "done");
    if let Err(e) = registry.close() {
        warning!(log, "failed to close log file: {}", e);
    }
}
