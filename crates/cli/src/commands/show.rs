// `quill show`: preview any version, including superseded ones.

use anyhow::{Context, Result};
use clap::Args;
use quillwiki_common::history::{PageVersion, VersionStatus};
use serde::Serialize;

use super::{finish, page_key, Env};
use crate::exit_code::NotFound;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub project: String,
    pub slug: String,
    pub version: u32,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub page: String,
    pub status: VersionStatus,
    #[serde(flatten)]
    pub version: PageVersion,
}

pub fn run(args: ShowArgs, env: &Env) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    finish(format, show(&args, env), format_human)
}

fn show(args: &ShowArgs, env: &Env) -> Result<ShowResult> {
    let page = page_key(&args.project, &args.slug)?;
    let manager = env.open()?;
    let missing = || NotFound(format!("version {} of `{page}`", args.version));

    let history = manager
        .history(&page)
        .with_context(|| format!("failed to load history of `{page}`"))?
        .ok_or_else(missing)?;
    let version = history.get(args.version).ok_or_else(missing)?;

    Ok(ShowResult {
        page: page.to_string(),
        status: history.status_of(version),
        version: version.clone(),
    })
}

fn format_human(result: &ShowResult) -> String {
    let version = &result.version;
    let mut header = format!(
        "# {} v{} ({}, {})",
        result.page,
        version.version,
        version.created_by.as_str(),
        version.created_at.format("%Y-%m-%d %H:%M")
    );
    if result.status != VersionStatus::Current {
        header.push_str(" [not current]");
    }
    let mut lines = vec![header];
    if let Some(prompt) = &version.edit_prompt {
        lines.push(format!("> {prompt}"));
    }
    lines.push(String::new());
    lines.push(version.content.clone());
    lines.join("\n")
}
