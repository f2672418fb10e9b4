// `quill history`: list page versions, newest first.

use anyhow::{Context, Result};
use clap::Args;
use quillwiki_common::history::VersionStatus;
use quillwiki_store::history::{listing, HistoryEntry};
use serde::Serialize;

use super::{finish, page_key, Env};
use crate::exit_code::NotFound;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub project: String,
    pub slug: String,

    /// Include superseded versions and versions above the current one.
    #[arg(long)]
    all: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResult {
    pub page: String,
    pub current_version: u32,
    pub entries: Vec<HistoryEntry>,
}

pub fn run(args: HistoryArgs, env: &Env) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    finish(format, history(&args, env), format_human)
}

fn history(args: &HistoryArgs, env: &Env) -> Result<HistoryResult> {
    let page = page_key(&args.project, &args.slug)?;
    let manager = env.open()?;
    let history = manager
        .history(&page)
        .with_context(|| format!("failed to load history of `{page}`"))?
        .ok_or_else(|| NotFound(format!("page `{page}`")))?;

    Ok(HistoryResult {
        page: page.to_string(),
        current_version: history.current_version(),
        entries: listing(&history, args.all),
    })
}

fn badge(status: VersionStatus) -> &'static str {
    match status {
        VersionStatus::Current => "current",
        VersionStatus::Past => "",
        VersionStatus::Future => "reverted",
        VersionStatus::Superseded => "superseded",
    }
}

fn format_human(result: &HistoryResult) -> String {
    let mut lines = vec![format!("# {} (current v{})", result.page, result.current_version)];
    for entry in &result.entries {
        let mut line = format!(
            "{:>5}  {:<10}  {:<10}  {}",
            format!("v{}", entry.version),
            badge(entry.status),
            entry.created_by.as_str(),
            entry.created_at.format("%Y-%m-%d %H:%M"),
        );
        if let Some(from) = entry.reverted_from {
            line.push_str(&format!("  (from v{from})"));
        }
        if let Some(prompt) = &entry.edit_prompt {
            line.push_str(&format!("  \"{prompt}\""));
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use quillwiki_common::history::VersionOrigin;

    use super::*;
    use crate::commands::test_support::temp_env;
    use crate::exit_code::ExitCode;

    fn entry(version: u32, status: VersionStatus, prompt: Option<&str>) -> HistoryEntry {
        HistoryEntry {
            version,
            status,
            created_by: if version == 1 { VersionOrigin::Generation } else { VersionOrigin::Edit },
            created_at: Utc.timestamp_opt(1_700_000_000 + i64::from(version) * 60, 0).unwrap(),
            edit_prompt: prompt.map(str::to_string),
            reverted_from: None,
            superseded_at: None,
            content_chars: 10,
        }
    }

    fn args(all: bool) -> HistoryArgs {
        HistoryArgs { project: "handbook".into(), slug: "intro".into(), all, json: true }
    }

    #[test]
    fn human_format_shows_badges_and_prompts() {
        let result = HistoryResult {
            page: "handbook/intro".into(),
            current_version: 2,
            entries: vec![
                entry(3, VersionStatus::Future, Some("fix typos")),
                entry(2, VersionStatus::Current, Some("expand")),
                entry(1, VersionStatus::Past, None),
            ],
        };
        let output = format_human(&result);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "# handbook/intro (current v2)");
        assert!(lines[1].contains("v3") && lines[1].contains("reverted"));
        assert!(lines[1].ends_with("\"fix typos\""));
        assert!(lines[2].contains("current"));
        assert!(lines[3].contains("generation"));
    }

    #[test]
    fn unknown_page_is_not_found() {
        let (_dir, env) = temp_env();
        let err = history(&args(false), &env).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
    }

    #[test]
    fn all_flag_includes_future_versions() {
        let (_dir, env) = temp_env();
        let page = page_key("handbook", "intro").unwrap();
        let mut manager = env.open().unwrap();
        manager.commit(&page, "a", None, VersionOrigin::Generation, None).unwrap();
        manager.commit(&page, "b", None, VersionOrigin::Edit, None).unwrap();
        manager.revert(&page, 2, None).unwrap();
        drop(manager);

        let visible = history(&args(false), &env).unwrap();
        assert_eq!(visible.current_version, 2);
        assert_eq!(visible.entries.len(), 2);
        let all = history(&args(true), &env).unwrap();
        assert_eq!(all.entries.len(), 3);
        assert_eq!(all.entries[0].status, VersionStatus::Future);
    }
}
