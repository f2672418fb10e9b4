// `quill comment`: manage comment threads on a page.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use quillwiki_common::anchor::TextAnchor;
use quillwiki_common::key::PageKey;
use quillwiki_common::types::{AnnotationThread, ThreadStatus};
use quillwiki_store::PageManager;
use uuid::Uuid;

use super::render::markdown_to_html;
use super::{finish, page_key, Env};
use crate::exit_code::NotFound;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct CommentArgs {
    #[command(subcommand)]
    action: CommentAction,
}

#[derive(Debug, Subcommand)]
enum CommentAction {
    /// Open a thread on a page, optionally anchored to some text
    Add(AddArgs),
    /// Reply to a thread
    Reply(ReplyArgs),
    /// Mark an open thread resolved
    Resolve(StatusArgs),
    /// Reopen a resolved thread
    Reopen(StatusArgs),
    /// List the threads of a page
    List(ListArgs),
}

#[derive(Debug, Args)]
struct AddArgs {
    project: String,
    slug: String,

    #[arg(long)]
    body: String,

    #[arg(long, default_value = "anonymous")]
    author: String,

    /// Selected text to anchor the thread to. Without --prefix/--suffix the
    /// surrounding context is captured from the current page.
    #[arg(long)]
    text: Option<String>,

    #[arg(long, requires = "text")]
    prefix: Option<String>,

    #[arg(long, requires = "text")]
    suffix: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ReplyArgs {
    thread: Uuid,

    #[arg(long)]
    body: String,

    #[arg(long, default_value = "anonymous")]
    author: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct StatusArgs {
    thread: Uuid,

    /// Only apply if the thread version is still N.
    #[arg(long, value_name = "N")]
    if_version: Option<u32>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    project: String,
    slug: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: CommentArgs, env: &Env) -> Result<()> {
    match args.action {
        CommentAction::Add(args) => {
            finish(OutputFormat::detect(args.json), add(&args, env), format_thread)
        }
        CommentAction::Reply(args) => {
            finish(OutputFormat::detect(args.json), reply(&args, env), format_thread)
        }
        CommentAction::Resolve(args) => finish(
            OutputFormat::detect(args.json),
            set_status(&args, ThreadStatus::Resolved, env),
            format_thread,
        ),
        CommentAction::Reopen(args) => finish(
            OutputFormat::detect(args.json),
            set_status(&args, ThreadStatus::Open, env),
            format_thread,
        ),
        CommentAction::List(args) => {
            let format = OutputFormat::detect(args.json);
            finish(format, list(&args, env), |threads| format_list(threads))
        }
    }
}

fn add(args: &AddArgs, env: &Env) -> Result<AnnotationThread> {
    let page = page_key(&args.project, &args.slug)?;
    let mut manager = env.open()?;
    let anchor = match &args.text {
        None => None,
        Some(text) if args.prefix.is_none() && args.suffix.is_none() => {
            Some(captured_anchor(&manager, &page, text)?)
        }
        Some(text) => Some(
            TextAnchor::new(
                text.as_str(),
                args.prefix.clone().unwrap_or_default(),
                args.suffix.clone().unwrap_or_default(),
            )
            .context("invalid anchor")?,
        ),
    };

    manager
        .create_thread(&page, anchor, &args.author, &args.body)
        .with_context(|| format!("failed to open thread on `{page}`"))?
        .ok_or_else(|| NotFound(format!("page `{page}`")).into())
}

/// Anchor `text` with context taken from the page as readers see it.
fn captured_anchor(
    manager: &PageManager,
    page: &PageKey,
    text: &str,
) -> Result<TextAnchor> {
    let markdown = manager.current_content(page)?.unwrap_or_default();
    Ok(manager.capture_anchor(&markdown_to_html(&markdown), text)?)
}

fn reply(args: &ReplyArgs, env: &Env) -> Result<AnnotationThread> {
    let mut manager = env.open()?;
    manager
        .reply(args.thread, &args.author, &args.body)
        .with_context(|| format!("failed to reply to thread {}", args.thread))?
        .ok_or_else(|| NotFound(format!("thread {}", args.thread)))?;
    manager.thread(args.thread)?.ok_or_else(|| NotFound(format!("thread {}", args.thread)).into())
}

fn set_status(args: &StatusArgs, status: ThreadStatus, env: &Env) -> Result<AnnotationThread> {
    let mut manager = env.open()?;
    manager
        .set_status(args.thread, status, args.if_version)
        .with_context(|| format!("failed to mark thread {} {status}", args.thread))?
        .ok_or_else(|| NotFound(format!("thread {}", args.thread)).into())
}

fn list(args: &ListArgs, env: &Env) -> Result<Vec<AnnotationThread>> {
    let page = page_key(&args.project, &args.slug)?;
    let manager = env.open()?;
    Ok(manager.list_threads(&page)?)
}

fn format_thread(thread: &AnnotationThread) -> String {
    let mut lines = vec![format!(
        "Thread {} on {} [{}] v{}",
        thread.id, thread.page, thread.status, thread.version
    )];
    if let Some(anchor) = &thread.anchor {
        lines.push(format!("  on \"{}\"", anchor.text()));
    }
    for message in &thread.messages {
        lines.push(format!("  {}: {}", message.author, message.body));
    }
    lines.join("\n")
}

fn format_list(threads: &[AnnotationThread]) -> String {
    if threads.is_empty() {
        return "No comment threads.".to_string();
    }
    threads.iter().map(format_thread).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use quillwiki_common::history::VersionOrigin;

    use super::*;
    use crate::commands::test_support::temp_env;
    use crate::exit_code::ExitCode;

    fn seeded_env() -> (tempfile::TempDir, Env) {
        let (dir, env) = temp_env();
        let page = page_key("handbook", "intro").unwrap();
        env.open()
            .unwrap()
            .commit(&page, "The *quick* fox and the quick dog.", None, VersionOrigin::Edit, None)
            .unwrap();
        (dir, env)
    }

    fn add_args(text: Option<&str>, prefix: Option<&str>) -> AddArgs {
        AddArgs {
            project: "handbook".into(),
            slug: "intro".into(),
            body: "Which one?".into(),
            author: "ann".into(),
            text: text.map(str::to_string),
            prefix: prefix.map(str::to_string),
            suffix: None,
            json: true,
        }
    }

    fn status_args(thread: Uuid, if_version: Option<u32>) -> StatusArgs {
        StatusArgs { thread, if_version, json: true }
    }

    #[test]
    fn add_captures_context_from_rendered_page() {
        let (_dir, env) = seeded_env();
        let thread = add(&add_args(Some("quick dog"), None), &env).unwrap();
        let anchor = thread.anchor.expect("inline thread");
        assert_eq!(anchor.text(), "quick dog");
        assert_eq!(anchor.prefix(), "The quick fox and the ");
        assert_eq!(anchor.suffix(), ".\n");
    }

    #[test]
    fn explicit_prefix_is_kept_verbatim() {
        let (_dir, env) = seeded_env();
        let thread = add(&add_args(Some("quick"), Some("the ")), &env).unwrap();
        assert_eq!(thread.anchor.unwrap(), TextAnchor::new("quick", "the ", "").unwrap());
    }

    #[test]
    fn page_level_thread_has_no_anchor() {
        let (_dir, env) = seeded_env();
        let thread = add(&add_args(None, None), &env).unwrap();
        assert!(thread.anchor.is_none());
        assert!(format_thread(&thread).contains("ann: Which one?"));
    }

    #[test]
    fn thread_on_unknown_page_is_not_found() {
        let (_dir, env) = temp_env();
        let err = add(&add_args(None, None), &env).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
    }

    #[test]
    fn reply_resolve_reopen_cycle() {
        let (_dir, env) = seeded_env();
        let thread = add(&add_args(None, None), &env).unwrap();

        let replied = reply(
            &ReplyArgs {
                thread: thread.id,
                body: "The dog.".into(),
                author: "bo".into(),
                json: true,
            },
            &env,
        )
        .unwrap();
        assert_eq!(replied.messages.len(), 2);

        let resolved = set_status(&status_args(thread.id, Some(1)), ThreadStatus::Resolved, &env)
            .unwrap();
        assert_eq!(resolved.status, ThreadStatus::Resolved);
        assert!(format_thread(&resolved).contains("[resolved] v2"));

        let stale = set_status(&status_args(thread.id, Some(1)), ThreadStatus::Open, &env);
        assert_eq!(ExitCode::from_error(&stale.unwrap_err()), ExitCode::Conflict);

        let twice = set_status(&status_args(thread.id, None), ThreadStatus::Resolved, &env);
        assert_eq!(ExitCode::from_error(&twice.unwrap_err()), ExitCode::Usage);
    }

    #[test]
    fn unknown_thread_is_not_found() {
        let (_dir, env) = seeded_env();
        let err = set_status(&status_args(Uuid::new_v4(), None), ThreadStatus::Resolved, &env);
        assert_eq!(ExitCode::from_error(&err.unwrap_err()), ExitCode::NotFound);
    }

    #[test]
    fn list_formats_empty_and_populated_pages() {
        let (_dir, env) = seeded_env();
        let list_args = ListArgs { project: "handbook".into(), slug: "intro".into(), json: true };
        assert_eq!(format_list(&list(&list_args, &env).unwrap()), "No comment threads.");

        add(&add_args(Some("fox"), None), &env).unwrap();
        let threads = list(&list_args, &env).unwrap();
        assert_eq!(threads.len(), 1);
        assert!(format_list(&threads).contains("on \"fox\""));
    }
}
