use std::time;

use clap::{Parser, Subcommand};
use cli_init::logging::Options;
use cli_init::{
    active_command, active_full_command, parse_flags, ByteSize, Duration, FlagsError,
    ParserOptions, Usage, Verbosity,
};

#[derive(Parser, Debug)]
struct Timeouts {
    #[arg(short = 'd', long = "duration", default_value = "3h")]
    duration: Duration,

    #[arg(short = 's', long = "size", default_value = "0")]
    size: ByteSize,
}

impl Usage for Timeouts {
    fn default_usage() -> Option<&'static str> {
        Some("Checks timeouts.")
    }
}

#[derive(Parser, Debug)]
struct Clash {
    #[arg(short = 's', long = "first")]
    first: Option<String>,

    #[arg(short = 's', long = "second")]
    second: Option<String>,
}

impl Usage for Clash {}

#[derive(Parser, Debug)]
struct Plz {
    #[command(flatten)]
    logging: Options,

    #[command(subcommand)]
    command: PlzCommand,
}

#[derive(Subcommand, Debug)]
enum PlzCommand {
    Build,
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    Deps,
    Revdeps,
}

impl Usage for Plz {}

fn parse<T>(args: &[&str]) -> Result<cli_init::Parsed<T>, FlagsError>
where
    T: clap::CommandFactory + clap::FromArgMatches + Usage,
{
    parse_flags::<T, _, _>("test", args.iter().copied(), ParserOptions::standard(), None, None)
}

#[test]
fn duration_with_unit() {
    let parsed = parse::<Timeouts>(&["test", "-d=3h"]).unwrap();
    assert_eq!(parsed.options.duration.as_std(), time::Duration::from_secs(3 * 3600));
    assert!(parsed.extra_args.is_empty());
}

#[test]
fn duration_bare_integer_is_seconds() {
    let parsed = parse::<Timeouts>(&["test", "-d=3"]).unwrap();
    assert_eq!(parsed.options.duration.as_std(), time::Duration::from_secs(3));
}

#[test]
fn duration_default() {
    let parsed = parse::<Timeouts>(&["test"]).unwrap();
    assert_eq!(parsed.options.duration.as_std(), time::Duration::from_secs(3 * 3600));
}

#[test]
fn byte_size_flag() {
    let parsed = parse::<Timeouts>(&["test", "-s=2M"]).unwrap();
    assert_eq!(parsed.options.size, ByteSize(2_000_000));
}

#[test]
fn invalid_duration_is_a_parse_error() {
    let err = parse::<Timeouts>(&["test", "-d=soon"]).unwrap_err();
    assert!(matches!(err, FlagsError::Parse { .. }), "{err}");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn duplicate_short_names_are_rejected() {
    let err = parse::<Clash>(&["test"]).unwrap_err();
    assert!(matches!(err, FlagsError::Structure(_)), "{err}");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn active_command_without_subcommand_path() {
    let parsed = parse::<Plz>(&["plz", "build"]).unwrap();
    assert!(matches!(parsed.options.command, PlzCommand::Build));
    assert_eq!(active_command(&parsed.parser), "build");
    assert_eq!(active_full_command(&parsed.parser), "build");
}

#[test]
fn nested_subcommand_and_extra_args() {
    let parsed = parse::<Plz>(&["plz", "query", "deps", "//:target"]).unwrap();
    assert!(matches!(
        parsed.options.command,
        PlzCommand::Query {
            query: QueryCommand::Deps
        }
    ));
    assert_eq!(active_command(&parsed.parser), "deps");
    assert_eq!(active_full_command(&parsed.parser), "query.deps");
    assert_eq!(parsed.extra_args, ["//:target"]);
}

#[test]
fn double_dash_passes_arguments_through() {
    let parsed = parse::<Plz>(&["plz", "build", "--", "-x", "--verbosity"]).unwrap();
    assert_eq!(parsed.extra_args, ["-x", "--verbosity"]);
    assert_eq!(parsed.options.logging.verbosity, Verbosity::Warning);
}

#[test]
fn flattened_logging_options() {
    let parsed = parse::<Plz>(&["plz", "-vvv", "--log_file=", "build"]).unwrap();
    assert_eq!(parsed.options.logging.verbosity, Verbosity::Info);
    assert_eq!(parsed.options.logging.log_file(), None);
}

#[test]
fn help_is_returned_not_printed() {
    let err = parse::<Timeouts>(&["test", "--help"]).unwrap_err();
    let FlagsError::Help(text) = &err else {
        panic!("expected help, got {err:?}");
    };
    assert!(text.starts_with("Checks timeouts.\n\n"), "{text}");
    assert!(text.contains("--duration"));
    assert!(text.contains("test options"));
    assert_eq!(err.exit_code(), 0);
}

#[test]
fn help_flag_can_be_disabled() {
    let err = parse_flags::<Timeouts, _, _>(
        "test",
        ["test", "--help"],
        ParserOptions::default(),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, FlagsError::Parse { .. }), "{err}");
}

#[test]
fn unknown_flags_are_parse_errors() {
    let err = parse::<Plz>(&["plz", "--nope", "build"]).unwrap_err();
    assert!(matches!(err, FlagsError::Parse { .. }), "{err}");
}

#[test]
fn additional_usage_is_appended_to_help() {
    let extra = |cmd: &clap::Command| format!("See the {} manual.", cmd.get_name());
    let err = parse_flags::<Timeouts, _, _>(
        "test",
        ["/usr/bin/tool", "--help"],
        ParserOptions::standard(),
        None,
        Some(&extra),
    )
    .unwrap_err();
    let FlagsError::Help(text) = err else {
        panic!("expected help");
    };
    assert!(text.contains("See the tool manual."), "{text}");
}

#[derive(Parser, Debug)]
struct Remote {
    #[arg(short = 'h', long = "host")]
    host: Option<String>,
}

impl Usage for Remote {}

#[test]
fn short_h_clashes_with_generated_help() {
    let err = parse::<Remote>(&["test"]).unwrap_err();
    assert!(matches!(err, FlagsError::Structure(_)), "{err}");

    let parsed = parse_flags::<Remote, _, _>(
        "test",
        ["test", "-h", "example.com"],
        ParserOptions::default(),
        None,
        None,
    )
    .unwrap();
    assert_eq!(parsed.options.host.as_deref(), Some("example.com"));
}

#[test]
fn parse_errors_carry_the_failing_subcommand() {
    let err = parse::<Plz>(&["plz", "query", "deps", "--bogus"]).unwrap_err();
    let FlagsError::Parse { command, .. } = &err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(command.get_name(), "deps");
}

#[test]
fn additional_usage_can_borrow_local_state() {
    let manual = String::from("docs/plz.md");
    let extra = |_: &clap::Command| format!("Manual: {}", manual);
    let err = parse_flags::<Timeouts, _, _>(
        "test",
        ["test", "--help"],
        ParserOptions::standard(),
        None,
        Some(&extra),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Manual: docs/plz.md"), "{err}");
}
