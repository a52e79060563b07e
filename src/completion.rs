use clap::Command;

/// Environment variable that switches the flag parser into completion mode.
pub const COMPLETION_ENV: &str = "FLAGS_COMPLETION";

/// A single shell-completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub item: String,
    pub description: String,
}

/// Callback handed the candidates instead of having them printed.
pub type CompletionHandler<'a> = dyn Fn(&Command, &[Completion]) + 'a;

/// Returns the candidates for the last word of `args` (which excludes argv[0]).
///
/// Earlier words that name subcommands move the completion into that subcommand.
pub fn complete(command: &Command, args: &[String]) -> Vec<Completion> {
    let Some((word, preceding)) = args.split_last() else {
        return subcommands(command, "");
    };

    let mut current = command;
    for arg in preceding {
        if let Some(sub) = current.find_subcommand(arg) {
            current = sub;
        }
    }

    if let Some(prefix) = word.strip_prefix("--") {
        return current
            .get_arguments()
            .filter(|a| !a.is_hide_set())
            .filter_map(|a| {
                let long = a.get_long()?;
                long.starts_with(prefix).then(|| Completion {
                    item: format!("--{}", long),
                    description: help_text(a),
                })
            })
            .collect();
    }
    if word.starts_with('-') {
        let prefix = &word[1..];
        return current
            .get_arguments()
            .filter(|a| !a.is_hide_set())
            .filter_map(|a| {
                let short = a.get_short()?;
                (prefix.is_empty() || prefix.starts_with(short)).then(|| Completion {
                    item: format!("-{}", short),
                    description: help_text(a),
                })
            })
            .collect();
    }
    subcommands(current, word)
}

fn subcommands(command: &Command, prefix: &str) -> Vec<Completion> {
    command
        .get_subcommands()
        .filter(|c| !c.is_hide_set() && c.get_name().starts_with(prefix))
        .map(|c| Completion {
            item: c.get_name().to_string(),
            description: c.get_about().map(|s| s.to_string()).unwrap_or_default(),
        })
        .collect()
}

fn help_text(arg: &clap::Arg) -> String {
    arg.get_help().map(|s| s.to_string()).unwrap_or_default()
}
