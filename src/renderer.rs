use anyhow::Context as _;
use handlebars::Handlebars;
use maud::{html, PreEscaped};
use serde::Serialize;

use crate::metadata::PostMetadata;

const POST_TEMPLATE: &str = include_str!("../templates/post.hbs");

/// Shared by the feed container and the standalone pages.
pub(crate) const STYLE: &str = r#"
    <style>
        body { max-width: 800px; margin: 20px auto; padding: 0 20px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }
        .code-block { background: #f5f5f5; padding: 10px; border-radius: 4px; font-family: monospace; overflow-x: auto; }
        table { border-collapse: collapse; margin: 10px 0; }
        th, td { border: 1px solid #ddd; padding: 6px 12px; }
        th { background: #f0f0f0; }
        h1, h2, h3 { margin: 15px 0 5px; color: #2c3e50; }
        p { line-height: 1.6; margin: 8px 0; color: #34495e; }
        ul, ol { margin: 8px 0 8px 20px; color: #34495e; }
        img { max-width: 100%; height: auto; border-radius: 4px; margin: 10px 0; }
        .post-meta { color: #7f8c8d; font-size: 0.9em; margin-bottom: 20px; padding-bottom: 10px; border-bottom: 1px solid #eee; }
    </style>
"#;

#[derive(Serialize, Debug)]
struct PostPageData<'a> {
    language: &'a str,
    style: &'static str,
    body: &'a str,
    meta: &'a PostMetadata,
    summary: &'a str,
}

pub(crate) fn generate_renderer() -> anyhow::Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .register_template_string("post", POST_TEMPLATE)
        .context("post.hbs")?;

    Ok(handlebars)
}

/// Full HTML document for one post.
pub(crate) fn render_page(
    handlebars: &Handlebars<'static>,
    language: &str,
    meta: &PostMetadata,
    body: &str,
) -> anyhow::Result<String> {
    let summary = if meta.description.is_empty() {
        &meta.title
    } else {
        &meta.description
    };
    let data = PostPageData {
        language,
        style: STYLE,
        body,
        meta,
        summary,
    };
    handlebars
        .render("post", &data)
        .with_context(|| format!("while rendering page for {:?}", meta.title))
}

/// Fixed-width container embedded in the feed's `<description>`.
pub(crate) fn render_container(body: &str) -> String {
    html! {
        div style="max-width: 800px; margin: 0 auto;" {
            (PreEscaped(STYLE))
            (PreEscaped(body))
        }
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(description: &str) -> PostMetadata {
        PostMetadata {
            title: "A <b> title".to_string(),
            date: "2024-05-20".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn page_escapes_metadata_but_not_body() {
        let hbs = generate_renderer().unwrap();
        let page = render_page(&hbs, "zh-CN", &meta(""), "<p>hi</p>").unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<html lang=\"zh-CN\">"));
        assert!(page.contains("<title>A &lt;b&gt; title</title>"));
        assert!(page.contains("<meta name=\"description\" content=\"A &lt;b&gt; title\">"));
        assert!(page.contains("发布时间：2024-05-20"));
        assert!(page.contains("<p>hi</p>"));
        assert!(page.contains(".code-block"));
    }

    #[test]
    fn page_prefers_description() {
        let hbs = generate_renderer().unwrap();
        let page = render_page(&hbs, "en", &meta("short"), "").unwrap();
        assert!(page.contains("content=\"short\""));
    }

    #[test]
    fn container_wraps_body() {
        let html = render_container("<p>x</p>");
        assert!(html.starts_with("<div style=\"max-width: 800px; margin: 0 auto;\">"));
        assert!(html.ends_with("<p>x</p></div>"));
        assert!(html.contains("<style>"));
    }
}
