// CLI subcommand dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use quillwiki_common::key::PageKey;
use quillwiki_store::config::WikiConfig;
use quillwiki_store::PageManager;
use serde::Serialize;

use crate::output::{self, OutputFormat};

pub mod comment;
pub mod commit;
pub mod history;
pub mod render;
pub mod revert;
pub mod show;

#[derive(Subcommand)]
pub enum Command {
    /// Record new page content as the next version
    Commit(commit::CommitArgs),
    /// List page versions with status badges
    History(history::HistoryArgs),
    /// Show one version's content
    Show(show::ShowArgs),
    /// Move the page back to an earlier version
    Revert(revert::RevertArgs),
    /// Manage comment threads
    Comment(comment::CommentArgs),
    /// Render the page with comment highlights
    Render(render::RenderArgs),
}

pub fn run(cmd: Command, env: &Env) -> Result<()> {
    match cmd {
        Command::Commit(args) => commit::run(args, env),
        Command::History(args) => history::run(args, env),
        Command::Show(args) => show::run(args, env),
        Command::Revert(args) => revert::run(args, env),
        Command::Comment(args) => comment::run(args, env),
        Command::Render(args) => render::run(args, env),
    }
}

/// Where commands read and write, resolved once per invocation.
pub struct Env {
    pub db_path: PathBuf,
    pub config: WikiConfig,
}

impl Env {
    pub fn resolve(db_flag: Option<PathBuf>, config: WikiConfig) -> Result<Self> {
        let db_path = db_flag
            .or_else(|| config.resolved_db_path())
            .context("could not determine database path; pass --db")?;
        Ok(Self { db_path, config })
    }

    pub fn open(&self) -> Result<PageManager> {
        PageManager::open(&self.db_path, &self.config)
            .with_context(|| format!("failed to open wiki database `{}`", self.db_path.display()))
    }
}

pub fn page_key(project: &str, slug: &str) -> Result<PageKey> {
    PageKey::new(project, slug).context("invalid page key")
}

/// Print the command's result, or its error, in the detected format.
pub fn finish<T, F>(format: OutputFormat, result: Result<T>, human_fn: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match result {
        Ok(value) => {
            output::print_output(format, &value, human_fn)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}
