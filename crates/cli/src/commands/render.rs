// `quill render`: render the current page and highlight its inline comments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;

use super::{page_key, Env};
use crate::exit_code::NotFound;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RenderArgs {
    pub project: String,
    pub slug: String,

    /// Annotate this pre-rendered HTML instead of the page's markdown.
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderResult {
    pub page: String,
    pub html: String,
    pub orphaned_ids: Vec<String>,
}

pub fn run(args: RenderArgs, env: &Env) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match render(&args, env) {
        Ok(result) => result,
        Err(error) => {
            output::print_anyhow_error(format, &error);
            return Err(error);
        }
    };

    if format == OutputFormat::Human {
        for id in &result.orphaned_ids {
            output::print_warning(format, "ORPHANED", &format!("comment {id} no longer matches"));
        }
    }
    output::print_output(format, &result, |result| result.html.clone())?;
    Ok(())
}

fn render(args: &RenderArgs, env: &Env) -> Result<RenderResult> {
    let page = page_key(&args.project, &args.slug)?;
    let manager = env.open()?;

    let html = match &args.html_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?,
        None => {
            let markdown = manager
                .current_content(&page)?
                .ok_or_else(|| NotFound(format!("page `{page}`")))?;
            markdown_to_html(&markdown)
        }
    };

    let injection = manager
        .annotate(&page, &html)
        .with_context(|| format!("failed to annotate `{page}`"))?;
    tracing::debug!(page = %page, orphaned = injection.orphaned_ids.len(), "rendered page");

    Ok(RenderResult {
        page: page.to_string(),
        html: injection.html,
        orphaned_ids: injection.orphaned_ids,
    })
}

/// Render page markdown the same way for highlighting and anchor capture.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

#[cfg(test)]
mod tests {
    use quillwiki_common::anchor::TextAnchor;
    use quillwiki_common::history::VersionOrigin;

    use super::*;
    use crate::commands::test_support::temp_env;
    use crate::exit_code::ExitCode;

    fn args(html_file: Option<PathBuf>) -> RenderArgs {
        RenderArgs { project: "handbook".into(), slug: "intro".into(), html_file, json: true }
    }

    #[test]
    fn markdown_renders_to_html() {
        let html = markdown_to_html("# Title\n\nSome **bold** text & more.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn inline_comment_is_highlighted_across_markdown_emphasis() {
        let (_dir, env) = temp_env();
        let page = page_key("handbook", "intro").unwrap();
        let mut manager = env.open().unwrap();
        manager
            .commit(&page, "Some **bold** text & more.", None, VersionOrigin::Generation, None)
            .unwrap();
        let anchor = TextAnchor::new("bold text & more", "", "").unwrap();
        let thread = manager.create_thread(&page, Some(anchor), "ann", "hm").unwrap().unwrap();
        drop(manager);

        let result = render(&args(None), &env).unwrap();
        assert!(result.orphaned_ids.is_empty());
        assert_eq!(result.html.matches("<mark ").count(), 1);
        assert!(result.html.contains(&format!(r#"data-comment-id="{}""#, thread.id)));
        assert!(result.html.contains("<mark class=\"comment-highlight comment-highlight--open\""));
    }

    #[test]
    fn html_file_overrides_markdown_and_reports_orphans() {
        let (dir, env) = temp_env();
        let page = page_key("handbook", "intro").unwrap();
        let mut manager = env.open().unwrap();
        manager.commit(&page, "text", None, VersionOrigin::Generation, None).unwrap();
        let anchor = TextAnchor::new("text", "", "").unwrap();
        let thread = manager.create_thread(&page, Some(anchor), "ann", "hm").unwrap().unwrap();
        drop(manager);

        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>rewritten</p>").unwrap();
        let result = render(&args(Some(path)), &env).unwrap();
        assert_eq!(result.html, "<p>rewritten</p>");
        assert_eq!(result.orphaned_ids, vec![thread.id.to_string()]);
    }

    #[test]
    fn unknown_page_is_not_found() {
        let (_dir, env) = temp_env();
        let err = render(&args(None), &env).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
    }
}
