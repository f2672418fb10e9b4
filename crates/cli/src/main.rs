// quill CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use quillwiki_store::config::WikiConfig;

mod commands;
mod exit_code;
mod output;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "quill", about = "Page history and inline comments for an AI-written wiki")]
struct Cli {
    /// Database file (defaults to `db_path` in ~/.quillwiki/config.toml, then
    /// ~/.quillwiki/meta.db).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WikiConfig::load();
    let env = match commands::Env::resolve(cli.db, config) {
        Ok(env) => env,
        Err(error) => {
            output::print_anyhow_error(output::OutputFormat::detect(false), &error);
            return ExitCode::from_error(&error).into();
        }
    };

    match commands::run(cli.command, &env) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => ExitCode::from_error(&error).into(),
    }
}
