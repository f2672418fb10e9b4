// `quill commit`: record new page content as the next version.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use quillwiki_common::history::VersionOrigin;
use serde::{Deserialize, Serialize};

use super::{finish, page_key, Env};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["file", "content"])))]
pub struct CommitArgs {
    pub project: String,
    pub slug: String,

    /// Read content from a file (`-` for stdin).
    #[arg(long)]
    file: Option<PathBuf>,

    /// Inline content.
    #[arg(long)]
    content: Option<String>,

    /// Instruction that produced this content.
    #[arg(long)]
    prompt: Option<String>,

    /// Mark the version as a fresh generation rather than an edit.
    #[arg(long)]
    generation: bool,

    /// Only commit if the current version is still N.
    #[arg(long, value_name = "N")]
    if_current: Option<u32>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResult {
    pub page: String,
    pub version: u32,
    pub created_by: VersionOrigin,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edit_prompt: Option<String>,
}

pub fn run(args: CommitArgs, env: &Env) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    finish(format, commit(args, env), format_human)
}

fn commit(args: CommitArgs, env: &Env) -> Result<CommitResult> {
    let page = page_key(&args.project, &args.slug)?;
    let content = read_content(args.file, args.content)?;
    let origin = if args.generation { VersionOrigin::Generation } else { VersionOrigin::Edit };

    let mut manager = env.open()?;
    let version = manager
        .commit(&page, &content, args.prompt, origin, args.if_current)
        .with_context(|| format!("failed to commit `{page}`"))?;

    Ok(CommitResult {
        page: page.to_string(),
        version: version.version,
        created_by: version.created_by,
        created_at: version.created_at,
        edit_prompt: version.edit_prompt,
    })
}

fn read_content(file: Option<PathBuf>, inline: Option<String>) -> Result<String> {
    match (file, inline) {
        (_, Some(content)) => Ok(content),
        (Some(path), None) if path.as_os_str() == "-" => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content).context("failed to read stdin")?;
            Ok(content)
        }
        (Some(path), None) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read `{}`", path.display())),
        (None, None) => anyhow::bail!("one of --file or --content is required"),
    }
}

fn format_human(result: &CommitResult) -> String {
    let mut line =
        format!("Committed {} v{} ({})", result.page, result.version, result.created_by.as_str());
    if let Some(prompt) = &result.edit_prompt {
        line.push_str(&format!(": {prompt}"));
    }
    line
}
