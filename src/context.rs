use std::path::PathBuf;

use crate::metadata::FallbackTable;

pub(crate) const DEFAULT_FEED_TITLE: &str = "IT咖啡馆的github每周热点项目";
pub(crate) const DEFAULT_FEED_LINK: &str = "https://github.com/itcoffee66/githubweekly";
pub(crate) const DEFAULT_FEED_DESCRIPTION: &str = "github 每周热点项目";
pub(crate) const DEFAULT_FEED_LANGUAGE: &str = "zh-CN";

pub(crate) const DEFAULT_ARTICLE_DIR: &str = "post";
pub(crate) const DEFAULT_PROJECT_ROOT: &str = ".";
pub(crate) const DEFAULT_RSS_OUTPUT: &str = "rss.xml";
pub(crate) const DEFAULT_HTML_OUT_DIR: &str = "asset/html";
pub(crate) const DEFAULT_ICON_PATH: &str = "asset/it-coffee-circle.png";
pub(crate) const DEFAULT_EXCERPT_LENGTH: usize = 200;
pub(crate) const WRITE_HTML: bool = true;
pub(crate) const FULL_CONTENT: bool = false;
pub(crate) const LINK_TARGET: LinkTarget = LinkTarget::Html;
pub(crate) const PUB_DATE_SOURCE: PubDateSource = PubDateSource::FrontMatter;

/// Markdown features switched on for every post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkdownExtension {
    /// tables, footnotes, strikethrough, task lists and heading attributes
    Extra,
    /// wraps code blocks in `div.code-block`
    CodeHighlight,
    SaneLists,
    /// soft line breaks become `<br />`
    Nl2Br,
}

impl MarkdownExtension {
    pub const ALL: [MarkdownExtension; 4] = [
        MarkdownExtension::Extra,
        MarkdownExtension::CodeHighlight,
        MarkdownExtension::SaneLists,
        MarkdownExtension::Nl2Br,
    ];
}

/// What an item's `<link>` (and guid) points at.
#[allow(dead_code)] // picked through `LINK_TARGET`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkTarget {
    /// the generated standalone page
    Html,
    /// the source markdown file in the repository
    Markdown,
}

/// Where an item's `<pubDate>` comes from.
#[allow(dead_code)] // picked through `PUB_DATE_SOURCE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PubDateSource {
    FrontMatter,
    /// last commit touching the file, front matter date as fallback
    Commit,
}

#[derive(Debug)]
pub(crate) struct Context {
    pub article_dir: PathBuf,
    pub project_root: PathBuf,
    pub rss_output: PathBuf,
    pub html_out_dir: PathBuf,
    pub write_html: bool,
    /// relative to `project_root`
    pub icon_path: PathBuf,

    pub feed_title: String,
    pub feed_link: String,
    pub feed_description: String,
    pub feed_language: String,

    pub markdown_extensions: Vec<MarkdownExtension>,
    pub link_target: LinkTarget,
    pub pub_date_source: PubDateSource,
    pub fallbacks: FallbackTable,
    pub excerpt_length: usize,
    pub full_content: bool,

    pub handlebars: handlebars::Handlebars<'static>,
}

impl Context {
    pub fn new(handlebars: handlebars::Handlebars<'static>) -> Self {
        Self {
            article_dir: PathBuf::from(DEFAULT_ARTICLE_DIR),
            project_root: PathBuf::from(DEFAULT_PROJECT_ROOT),
            rss_output: PathBuf::from(DEFAULT_RSS_OUTPUT),
            html_out_dir: PathBuf::from(DEFAULT_HTML_OUT_DIR),
            write_html: WRITE_HTML,
            icon_path: PathBuf::from(DEFAULT_ICON_PATH),
            feed_title: DEFAULT_FEED_TITLE.to_string(),
            feed_link: DEFAULT_FEED_LINK.to_string(),
            feed_description: DEFAULT_FEED_DESCRIPTION.to_string(),
            feed_language: DEFAULT_FEED_LANGUAGE.to_string(),
            markdown_extensions: MarkdownExtension::ALL.to_vec(),
            link_target: LINK_TARGET,
            pub_date_source: PUB_DATE_SOURCE,
            fallbacks: FallbackTable::default(),
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            full_content: FULL_CONTENT,
            handlebars,
        }
    }

    /// `<feed_link>/raw/main/` prefix shared by images, pages and the icon.
    pub fn raw_base(&self) -> String {
        format!("{}/raw/main/", self.feed_link.trim_end_matches('/'))
    }

    pub fn blob_base(&self) -> String {
        format!("{}/blob/main/", self.feed_link.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_compiled_in_configuration() {
        let ctx = Context::new(handlebars::Handlebars::new());
        assert_eq!(ctx.article_dir, PathBuf::from("post"));
        assert_eq!(ctx.rss_output, PathBuf::from("rss.xml"));
        assert_eq!(ctx.html_out_dir, PathBuf::from("asset/html"));
        assert_eq!(ctx.feed_link, DEFAULT_FEED_LINK);
        assert_eq!(ctx.feed_language, "zh-CN");
        assert_eq!(ctx.markdown_extensions, MarkdownExtension::ALL.to_vec());
        assert_eq!(ctx.link_target, LinkTarget::Html);
        assert_eq!(ctx.pub_date_source, PubDateSource::FrontMatter);
        assert!(ctx.write_html);
        assert_eq!(ctx.excerpt_length, 200);
    }

    #[test]
    fn raw_base_ignores_trailing_slash() {
        let mut ctx = Context::new(handlebars::Handlebars::new());
        ctx.feed_link = "https://example.com/repo/".to_string();
        assert_eq!(ctx.raw_base(), "https://example.com/repo/raw/main/");
        assert_eq!(ctx.blob_base(), "https://example.com/repo/blob/main/");
    }
}
