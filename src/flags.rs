//! Command-line parsing on top of clap's derive API.
//!
//! Hosts declare their options as a `clap::Parser` and hand it to
//! [`parse_flags`], or to [`parse_flags_or_die`] at the top of `main`.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::Path;
use std::process;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches};

use crate::completion::{complete, CompletionHandler, COMPLETION_ENV};
use crate::errors::FlagsError;

// Hidden catch-all positional; whatever lands here is handed back as extra args.
const EXTRA_ARGS: &str = "__extra_args";

/// Long-form usage text shown above the generated help.
///
/// The live value from [`Usage::usage`] wins over the static
/// [`Usage::default_usage`] when it is non-empty.
pub trait Usage {
    fn default_usage() -> Option<&'static str> {
        None
    }

    fn usage(&self) -> Option<&str> {
        None
    }
}

/// Hook producing extra text appended to the generated help.
pub type AdditionalUsageInfo<'a> = dyn Fn(&Command) -> String + 'a;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Generate `-h/--help`.
    pub help_flag: bool,
    /// Return everything after `--` untouched as extra arguments.
    pub pass_double_dash: bool,
}

impl ParserOptions {
    pub const fn standard() -> Self {
        Self {
            help_flag: true,
            pass_double_dash: true,
        }
    }
}

/// The built command plus the chain of subcommands the arguments selected.
#[derive(Debug)]
pub struct FlagParser {
    command: Command,
    active: Vec<String>,
}

impl FlagParser {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn has_subcommands(&self) -> bool {
        self.command.has_subcommands()
    }

    pub fn render_help(&mut self) -> String {
        self.command.render_help().to_string()
    }
}

#[derive(Debug)]
pub struct Parsed<T> {
    pub options: T,
    pub extra_args: Vec<String>,
    pub parser: FlagParser,
}

/// Parses `args` (including argv[0]) into `T`.
///
/// Never exits the process: help requests come back as [`FlagsError::Help`]
/// with the text to print, and arguments nothing declared are returned in
/// [`Parsed::extra_args`] rather than rejected.
pub fn parse_flags<T, I, S>(
    app_name: &str,
    args: I,
    options: ParserOptions,
    completion_handler: Option<&CompletionHandler<'_>>,
    additional_usage: Option<&AdditionalUsageInfo<'_>>,
) -> Result<Parsed<T>, FlagsError>
where
    T: CommandFactory + FromArgMatches + Usage,
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let argv0 = if args.is_empty() {
        OsString::from(app_name)
    } else {
        args.remove(0)
    };
    let name = Path::new(&argv0)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| app_name.to_string());

    let heading = format!("{} options", app_name);
    let mut command = T::command()
        .name(name.clone())
        .bin_name(name)
        .mut_args(|arg| {
            if arg.is_positional() || arg.get_help_heading().is_some() {
                arg
            } else {
                arg.help_heading(heading.clone())
            }
        });
    check_structure(&command, options)?;

    if !options.help_flag {
        command = command
            .disable_help_flag(true)
            .disable_help_subcommand(true);
    }
    if let Some(additional) = additional_usage {
        let text = additional(&command);
        command = command.after_help(text);
    }
    command = accept_extra_args(command);

    let mut passed = Vec::new();
    if options.pass_double_dash {
        if let Some(pos) = args.iter().position(|a| a.to_str() == Some("--")) {
            passed = args.split_off(pos + 1);
            args.pop();
        }
    }

    if std::env::var_os(COMPLETION_ENV).is_some_and(|v| !v.is_empty()) {
        let words: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let items = complete(&command, &words);
        if let Some(handler) = completion_handler {
            handler(&command, &items);
        }
        return Err(FlagsError::Completion(items));
    }

    let argv = std::iter::once(argv0).chain(args.iter().cloned());
    let mut matches = match command.try_get_matches_from_mut(argv) {
        Ok(matches) => matches,
        Err(err) => {
            return Err(match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    FlagsError::Help(format!("{}{}", usage_block::<T>(None), err))
                }
                _ => FlagsError::Parse {
                    command: Box::new(selected_command(&command, &args)),
                    source: err,
                },
            });
        }
    };

    let active = active_chain(command.get_name(), &matches);
    let mut extra_args = collect_extra_args(&matches);
    extra_args.extend(passed.iter().map(|a| a.to_string_lossy().into_owned()));

    let parsed = match T::from_arg_matches_mut(&mut matches) {
        Ok(parsed) => parsed,
        Err(err) => {
            return Err(FlagsError::Parse {
                command: Box::new(command),
                source: err,
            })
        }
    };

    Ok(Parsed {
        options: parsed,
        extra_args,
        parser: FlagParser { command, active },
    })
}

/// Parses the process arguments and dies on anything but a clean parse.
///
/// Returns the options and the active command name, or `""` when the options
/// declare no subcommands.
pub fn parse_flags_or_die<T>(app_name: &str) -> (T, String)
where
    T: CommandFactory + FromArgMatches + Usage,
{
    parse_flags_from_args_or_die(app_name, std::env::args_os())
}

/// Like [`parse_flags_or_die`] but with explicit arguments.
pub fn parse_flags_from_args_or_die<T, I, S>(app_name: &str, args: I) -> (T, String)
where
    T: CommandFactory + FromArgMatches + Usage,
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let parsed = match parse_flags::<T, _, _>(app_name, args, ParserOptions::standard(), None, None) {
        Ok(parsed) => parsed,
        Err(err) => {
            match &err {
                // Most likely something structurally wrong with the options type.
                FlagsError::Structure(msg) => eprintln!("{}", msg),
                FlagsError::Help(text) => print!("{}", text),
                FlagsError::Completion(items) => {
                    for item in items {
                        println!("{}", item.item);
                    }
                }
                FlagsError::Parse { command, source } => {
                    write_usage::<T>(None);
                    eprint!("{}", command.clone().render_help());
                    eprintln!("\n{}", source);
                }
            }
            process::exit(err.exit_code());
        }
    };

    let Parsed {
        options,
        extra_args,
        mut parser,
    } = parsed;
    if !extra_args.is_empty() {
        write_usage(Some(&options));
        eprint!("{}", parser.render_help());
        eprintln!("Unknown option {:?}", extra_args);
        process::exit(1);
    }
    if parser.has_subcommands() {
        let active = active_command(&parser).to_string();
        return (options, active);
    }
    (options, String::new())
}

/// Name of the deepest active subcommand (the root's name if none is active).
pub fn active_command(parser: &FlagParser) -> &str {
    parser.active.last().map(String::as_str).unwrap_or_default()
}

/// Dotted path from the top-level subcommand to the active one, e.g. `query.deps`.
pub fn active_full_command(parser: &FlagParser) -> String {
    match parser.active.split_first() {
        Some((root, [])) => root.clone(),
        Some((_, path)) => path.join("."),
        None => String::new(),
    }
}

/// Usage text for `T`, preferring the live value on `opts` when there is one.
pub fn get_usage<T: Usage>(opts: Option<&T>) -> Option<String> {
    let live = opts
        .and_then(|o| o.usage())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    live.or_else(|| T::default_usage().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

fn usage_block<T: Usage>(opts: Option<&T>) -> String {
    get_usage(opts)
        .map(|s| format!("{}\n\n", s))
        .unwrap_or_default()
}

fn write_usage<T: Usage>(opts: Option<&T>) {
    print!("{}", usage_block(opts));
}

// Clap's generated -h/--help and -V/--version count as declared options; a
// clash with them would otherwise trip clap's own debug assertions.
fn check_structure(command: &Command, options: ParserOptions) -> Result<(), FlagsError> {
    check_command(command, options.help_flag, false)
}

fn check_command(command: &Command, help: bool, inherited_version: bool) -> Result<(), FlagsError> {
    let help = help && !command.is_disable_help_flag_set();
    let version = !command.is_disable_version_flag_set()
        && (inherited_version
            || command.get_version().is_some()
            || command.get_long_version().is_some());

    let mut shorts: HashMap<char, &str> = HashMap::new();
    let mut longs: HashMap<&str, &str> = HashMap::new();
    if help {
        shorts.insert('h', "help");
        longs.insert("help", "help");
    }
    if version {
        shorts.insert('V', "version");
        longs.insert("version", "version");
    }

    for arg in command.get_arguments() {
        let id = arg.get_id().as_str();
        if let Some(short) = arg.get_short() {
            if let Some(other) = shorts.insert(short, id) {
                return Err(FlagsError::Structure(format!(
                    "option `{}' uses the same short name `-{}' as option `{}' in command `{}'",
                    id,
                    short,
                    other,
                    command.get_name()
                )));
            }
        }
        if let Some(long) = arg.get_long() {
            if let Some(other) = longs.insert(long, id) {
                return Err(FlagsError::Structure(format!(
                    "option `{}' uses the same long name `--{}' as option `{}' in command `{}'",
                    id,
                    long,
                    other,
                    command.get_name()
                )));
            }
        }
    }

    let mut names = HashSet::new();
    let sub_version = version && command.is_propagate_version_set();
    for sub in command.get_subcommands() {
        if !names.insert(sub.get_name()) {
            return Err(FlagsError::Structure(format!(
                "command `{}' is declared twice under `{}'",
                sub.get_name(),
                command.get_name()
            )));
        }
        check_command(sub, help, sub_version)?;
    }
    Ok(())
}

// The deepest subcommand the words name, for rendering help after an error.
fn selected_command(command: &Command, words: &[OsString]) -> Command {
    let mut current = command;
    for word in words.iter().filter_map(|w| w.to_str()) {
        if let Some(sub) = current.find_subcommand(word) {
            current = sub;
        }
    }
    current.clone()
}

fn accept_extra_args(mut command: Command) -> Command {
    let names: Vec<String> = command
        .get_subcommands()
        .map(|c| c.get_name().to_string())
        .collect();
    for name in names {
        command = command.mut_subcommand(name, accept_extra_args);
    }
    // Commands with their own positionals report strays through clap instead.
    if command.get_positionals().next().is_some() {
        return command;
    }
    command.arg(
        Arg::new(EXTRA_ARGS)
            .num_args(0..)
            .action(ArgAction::Append)
            .value_parser(clap::value_parser!(String))
            .hide(true),
    )
}

fn active_chain(root: &str, matches: &ArgMatches) -> Vec<String> {
    let mut chain = vec![root.to_string()];
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        chain.push(name.to_string());
        current = sub;
    }
    chain
}

fn collect_extra_args(matches: &ArgMatches) -> Vec<String> {
    let mut extra = Vec::new();
    let mut current = Some(matches);
    while let Some(m) = current {
        if let Ok(Some(values)) = m.try_get_many::<String>(EXTRA_ARGS) {
            extra.extend(values.cloned());
        }
        current = m.subcommand().map(|(_, sub)| sub);
    }
    extra
}
