mod cleanup;
mod cli;
mod config;
mod diff;
mod error;
mod goto;
mod logging;
mod prompt;
mod source;
mod summary;
mod ui;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command};
use config::Settings;
use error::CliError;
use gr_vcs::GitCli;
use gr_vcs::detection::detect_repo_root;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "gr", &mut std::io::stdout());
        return Ok(());
    }

    let cwd = std::env::current_dir()
        .map_err(|err| CliError::io("cannot determine the current directory", err))?;
    let settings = Settings::load(cli.config.as_deref(), &cwd)?;
    let repo_root = detect_repo_root(&cwd).unwrap_or_else(|| cwd.clone());
    let git = GitCli::with_program(settings.git.clone(), repo_root);

    match cli.command {
        Command::Summary(args) => summary::run(&args, &settings, &git),
        Command::Diff(args) => diff::run(&args, settings, &git, &cwd),
        Command::Goto(args) => goto::run(&args, &settings, &git),
        Command::Completions { .. } => Ok(()),
    }
}
