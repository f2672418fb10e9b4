// `quill revert`: move the current pointer to an earlier version, or copy
// that version forward as a new one with `--as-new`.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{finish, page_key, Env};
use crate::exit_code::NotFound;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct RevertArgs {
    pub project: String,
    pub slug: String,
    pub version: u32,

    /// Append the target's content as a new version instead of moving the pointer.
    #[arg(long)]
    as_new: bool,

    /// Only revert if the current version is still N.
    #[arg(long, value_name = "N")]
    if_current: Option<u32>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertResult {
    pub page: String,
    /// Version now current.
    pub current_version: u32,
    /// Version whose content was restored.
    pub restored_from: u32,
    pub as_new: bool,
}

pub fn run(args: RevertArgs, env: &Env) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    finish(format, revert(&args, env), format_human)
}

fn revert(args: &RevertArgs, env: &Env) -> Result<RevertResult> {
    let page = page_key(&args.project, &args.slug)?;
    let mut manager = env.open()?;

    let restored = if args.as_new {
        manager.restore_as_new(&page, args.version, args.if_current)
    } else {
        manager.revert(&page, args.version, args.if_current)
    }
    .with_context(|| format!("failed to revert `{page}`"))?
    .ok_or_else(|| NotFound(format!("version {} of `{page}`", args.version)))?;

    Ok(RevertResult {
        page: page.to_string(),
        current_version: restored.version,
        restored_from: args.version,
        as_new: args.as_new,
    })
}

fn format_human(result: &RevertResult) -> String {
    if result.as_new {
        format!(
            "Restored {} v{} as new version v{}",
            result.page, result.restored_from, result.current_version
        )
    } else {
        format!("Reverted {} to v{}", result.page, result.current_version)
    }
}
