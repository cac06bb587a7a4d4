use std::{
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use crate::context::MarkdownExtension;

pub(super) const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

static IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[(.*?)\]\((.*?)(?:\s+".*?")?\)"#).unwrap());
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Makes `path` absolute against the working directory and folds `.`/`..`
/// without touching the file system (images need not exist).
pub(super) fn normalize_path(path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            _ => out.push(c),
        }
    }
    out
}

/// `path` relative to `base`, climbing with `..` when `path` is not below it.
/// Both must already be normalized. Segments are joined with `/`.
pub(super) fn relative_path(path: &Path, base: &Path) -> String {
    let path: Vec<_> = path.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); base.len() - common];
    segments.extend(
        path[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    segments.join("/")
}

pub(super) fn encode_spaces(s: &str) -> String {
    s.replace(' ', "%20")
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Rewrites every `![alt](path)` whose path is relative to the post into an
/// absolute `raw_base` URL. The optional image title is dropped.
pub(super) fn rewrite_image_paths(
    markdown: &str,
    source: &Path,
    project_root: &Path,
    raw_base: &str,
) -> String {
    let source_dir = source.parent().unwrap_or(Path::new(""));
    let root = normalize_path(project_root);

    IMAGE_PATTERN
        .replace_all(markdown, |caps: &Captures| {
            let alt = &caps[1];
            let img_path = caps[2].trim();
            if is_remote(img_path) {
                return format!("![{alt}]({img_path})");
            }

            let resolved = normalize_path(&source_dir.join(img_path));
            if !resolved.starts_with(&root) {
                warn!(
                    "image {img_path:?} in {source:?} resolves outside of the project root {root:?}"
                );
            }
            let rel = relative_path(&resolved, &root);
            format!("![{alt}]({raw_base}{})", encode_spaces(&rel))
        })
        .into_owned()
}

/// `2024-05-20` -> `Mon, 20 May 2024 00:00:00 GMT`; anything unparsable
/// becomes `now`.
pub(super) fn to_rfc822(date: &str, now: DateTime<Utc>) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(d) => d.format("%a, %d %b %Y 00:00:00 GMT").to_string(),
        Err(_) => now.format(RFC822_FORMAT).to_string(),
    }
}

/// Reverses the escaping pulldown-cmark applies to text and attributes.
fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Plain text of `html`, cut to `length` characters. Entities are decoded
/// first so a cut never lands inside one.
pub(super) fn excerpt(html: &str, length: usize) -> String {
    let text = TAG_PATTERN.replace_all(html, " ");
    let text = unescape_html(&text);
    let text = SPACES_PATTERN.replace_all(&text, " ");
    let text = text.trim();

    if text.chars().count() <= length {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(length).collect();
        cut.push_str("...");
        cut
    }
}

fn parser_options(extensions: &[MarkdownExtension]) -> Options {
    let mut options = Options::empty();
    if extensions.contains(&MarkdownExtension::Extra) {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    }
    options
}

pub(super) fn gen_parser_event_iterator(
    extensions: &[MarkdownExtension],
) -> Box<dyn FnMut(Event) -> Event> {
    let highlight = extensions.contains(&MarkdownExtension::CodeHighlight);
    let nl2br = extensions.contains(&MarkdownExtension::Nl2Br);

    Box::new(move |event: Event| -> Event {
        match event {
            Event::Start(Tag::CodeBlock(ref kind)) if highlight => {
                let class = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                        // info strings are user input; keep only what a class name needs
                        let lang: String = lang
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .chars()
                            .filter(|c| c.is_alphanumeric() || "-_+#.".contains(*c))
                            .collect();
                        format!(" class=\"language-{lang}\"")
                    }
                    _ => String::new(),
                };
                Event::Html(format!("<div class=\"code-block\"><pre><code{class}>").into())
            }
            Event::End(TagEnd::CodeBlock) if highlight => {
                Event::Html("</code></pre></div>\n".into())
            }
            Event::SoftBreak if nl2br => Event::HardBreak,
            _ => event,
        }
    })
}

pub(super) fn render_markdown(markdown: &str, extensions: &[MarkdownExtension]) -> String {
    let parser = Parser::new_ext(markdown, parser_options(extensions))
        .map(gen_parser_event_iterator(extensions));

    let mut body_html = String::new();
    html::push_html(&mut body_html, parser);
    body_html
}
