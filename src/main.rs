//! PlanUp CLI entry point.

use clap::Parser;
use planup::cli::commands;
use planup::cli::{Cli, Commands, OutputFormat};
use planup::error::Error;
use std::process::ExitCode;

/// Rewrite named flags to positional args.
///
/// Scripts naturally write `pu issue create --title "foo"` instead of
/// `pu issue create "foo"`. Known flags that shadow a positional argument
/// are stripped so both forms work. `--title` and `--name` only shadow the
/// positional on create commands; elsewhere they are real options.
fn preprocess_args(args: impl Iterator<Item = String>) -> Vec<String> {
    const COMMANDS: &[&str] = &[
        "project", "issue", "sprint", "epic", "org", "idea", "retro", "workflow", "filter",
        "template", "settings", "sync", "report",
    ];

    let args: Vec<String> = args.collect();
    let Some(cmd_idx) = args.iter().position(|a| COMMANDS.contains(&a.as_str())) else {
        return args;
    };
    let command = args[cmd_idx].as_str();
    let subcommand = args.get(cmd_idx + 1).map_or("", String::as_str);

    let aliases: Vec<&str> = [
        ("--id", true),
        ("--key", !(command == "project" && subcommand == "create")),
        (
            "--title",
            subcommand == "create" && matches!(command, "issue" | "epic" | "idea"),
        ),
        (
            "--name",
            (subcommand == "create" && matches!(command, "project" | "sprint" | "workflow" | "template" | "org"))
                || (command == "filter" && subcommand == "save"),
        ),
    ]
    .into_iter()
    .filter_map(|(flag, applies)| applies.then_some(flag))
    .collect();

    let mut result: Vec<String> = args[..cmd_idx + 1].to_vec();
    let mut iter = args.into_iter().skip(cmd_idx + 1);

    while let Some(arg) = iter.next() {
        if aliases.contains(&arg.as_str()) {
            // Strip the flag, keep the value
            if let Some(value) = iter.next() {
                result.push(value);
            }
        } else if let Some(flag) = aliases.iter().find(|f| arg.starts_with(&format!("{f}="))) {
            result.push(arg[flag.len() + 1..].to_string());
        } else {
            result.push(arg);
        }
    }

    result
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(preprocess_args(std::env::args()));

    if cli.silent {
        planup::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.dry_run {
        planup::DRY_RUN.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.format == OutputFormat::Csv {
        planup::CSV_OUTPUT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // --json OR --format json OR non-TTY stdout
    let json = cli.json
        || cli.format == OutputFormat::Json
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let globals = cli.globals(json);

    match &cli.command {
        Commands::Init { force } => commands::init::execute(cli.db.as_ref(), *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),

        Commands::Project { command } => commands::project::execute(command, globals),
        Commands::Issue { command } => commands::issue::execute(command, globals),
        Commands::Sprint { command } => commands::sprint::execute(command, globals),
        Commands::Epic { command } => commands::epic::execute(command, globals),
        Commands::Org { command } => commands::org::execute(command, globals),
        Commands::Idea { command } => commands::idea::execute(command, globals),
        Commands::Retro { command } => commands::retro::execute(command, globals),
        Commands::Workflow { command } => commands::workflow::execute(command, globals),
        Commands::Filter { command } => commands::filter::execute(command, globals),
        Commands::Template { command } => commands::template::execute(command, globals),
        Commands::Activity(args) => commands::activity::execute(args, globals),
        Commands::Report { command } => commands::report::execute(command, globals),
        Commands::Settings { command } => commands::settings::execute(command, globals),
        Commands::Sync { command } => commands::sync::execute(command, globals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre(args: &[&str]) -> Vec<String> {
        preprocess_args(args.iter().map(ToString::to_string))
    }

    #[test]
    fn test_title_becomes_positional_on_create() {
        assert_eq!(
            pre(&["pu", "issue", "create", "--title", "Login crash", "-p", "high"]),
            vec!["pu", "issue", "create", "Login crash", "-p", "high"]
        );
        assert_eq!(
            pre(&["pu", "issue", "show", "--id=MOB-1"]),
            vec!["pu", "issue", "show", "MOB-1"]
        );
    }

    #[test]
    fn test_real_options_are_kept() {
        let args = ["pu", "issue", "update", "MOB-1", "--title", "Renamed"];
        assert_eq!(pre(&args), args);
        let args = ["pu", "project", "create", "Mobile App", "--key", "MOB"];
        assert_eq!(pre(&args), args);
    }
}
