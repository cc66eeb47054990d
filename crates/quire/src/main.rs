//! `quire`: list, search and edit the entries of a Quire content repository
//! from the command line.

/// Argument parsing and command handlers
mod cli;

fn main() -> std::process::ExitCode {
    cli::run_cli()
}
