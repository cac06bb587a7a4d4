use std::{path::Path, sync::LazyLock};

use chrono::NaiveDate;
use log::debug;
use regex::{Regex, RegexBuilder};

pub(crate) const UNTITLED: &str = "未命名文章";

#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostMetadata {
    pub title: String,
    /// calendar date as written in the front matter (`%Y-%m-%d` when valid)
    pub date: String,
    pub description: String,
}

/// Value used for a field that the front matter does not provide.
#[allow(dead_code)] // `FileStem` is chosen by editing `FallbackTable::default`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fallback {
    Placeholder(String),
    /// base name of the post without its extension
    FileStem,
    /// the run's UTC date
    Today,
    Empty,
}

impl Fallback {
    fn resolve(&self, source: &Path, today: NaiveDate) -> String {
        match self {
            Fallback::Placeholder(s) => s.clone(),
            Fallback::FileStem => source
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            Fallback::Today => today.format("%Y-%m-%d").to_string(),
            Fallback::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FallbackTable {
    pub title: Fallback,
    pub date: Fallback,
    pub description: Fallback,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            title: Fallback::Placeholder(UNTITLED.to_string()),
            date: Fallback::Today,
            description: Fallback::Empty,
        }
    }
}

/// Fields found in a front matter block, before any fallback is applied.
#[derive(Debug, Default, PartialEq, Eq)]
struct FrontMatter {
    title: Option<String>,
    date: Option<String>,
    description: Option<String>,
}

impl FrontMatter {
    fn parse(block: &str) -> Self {
        let mut fm = FrontMatter::default();
        for line in block.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                debug!("ignoring front matter line: {line}");
                continue;
            };
            let value = unquote(value.trim());
            // an empty value counts as missing
            let value = (!value.is_empty()).then(|| value.to_string());
            match name.trim() {
                "title" => fm.title = value,
                "date" => fm.date = value,
                "description" => fm.description = value,
                _ => {}
            }
        }
        fm
    }

    fn into_metadata(self, table: &FallbackTable, source: &Path, today: NaiveDate) -> PostMetadata {
        PostMetadata {
            title: self
                .title
                .unwrap_or_else(|| table.title.resolve(source, today)),
            date: self.date.unwrap_or_else(|| table.date.resolve(source, today)),
            description: self
                .description
                .unwrap_or_else(|| table.description.resolve(source, today)),
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});

/// Splits `content` into its metadata and the body that follows the front
/// matter block. Without a block, every field comes from `table` and the whole
/// (trimmed) content is the body.
pub(crate) fn parse_front_matter(
    content: &str,
    source: &Path,
    table: &FallbackTable,
    today: NaiveDate,
) -> (PostMetadata, String) {
    let content = content.trim();
    let (front_matter, body) = match HEADER_PATTERN.captures(content) {
        Some(caps) => {
            let end = caps.get(0).map_or(0, |m| m.end());
            (FrontMatter::parse(&caps[1]), content[end..].trim())
        }
        None => (FrontMatter::default(), content),
    };

    (
        front_matter.into_metadata(table, source, today),
        body.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn quoted_fields_are_extracted_and_block_removed() {
        let content = "---\ntitle: \"Hello\"\ndate: \"2024-05-20\"\ndescription: 'A post: with colon'\n---\n\nBody here\n";
        let (meta, body) = parse_front_matter(
            content,
            Path::new("post/a.md"),
            &FallbackTable::default(),
            today(),
        );
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.date, "2024-05-20");
        assert_eq!(meta.description, "A post: with colon");
        assert_eq!(body, "Body here");
    }

    #[test]
    fn missing_block_uses_fallbacks() {
        let content = "# Title\nBody text";
        let (meta, body) = parse_front_matter(
            content,
            Path::new("post/a.md"),
            &FallbackTable::default(),
            today(),
        );
        assert_eq!(
            meta,
            PostMetadata {
                title: UNTITLED.to_string(),
                date: "2024-06-01".to_string(),
                description: String::new(),
            }
        );
        assert_eq!(body, content);
    }

    #[test]
    fn missing_field_falls_back_individually() {
        let content = "---\ntitle: \"Only title\"\nauthor: \"someone\"\n---\ntext";
        let table = FallbackTable {
            title: Fallback::FileStem,
            ..FallbackTable::default()
        };
        let (meta, body) =
            parse_front_matter(content, Path::new("post/my post.md"), &table, today());
        assert_eq!(meta.title, "Only title");
        assert_eq!(meta.date, "2024-06-01");
        assert_eq!(meta.description, "");
        assert_eq!(body, "text");
    }

    #[test]
    fn file_stem_fallback() {
        let table = FallbackTable {
            title: Fallback::FileStem,
            ..FallbackTable::default()
        };
        let (meta, _) =
            parse_front_matter("plain", Path::new("post/weekly-12.md"), &table, today());
        assert_eq!(meta.title, "weekly-12");
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let (meta, _) = parse_front_matter(
            "---\ntitle: \"\"\ndate: ''\n---\nx",
            Path::new("a.md"),
            &FallbackTable::default(),
            today(),
        );
        assert_eq!(meta.title, UNTITLED);
        assert_eq!(meta.date, "2024-06-01");
    }

    #[test]
    fn unterminated_block_is_body() {
        let content = "---\ntitle: \"x\"\nno closing marker";
        let (meta, body) =
            parse_front_matter(content, Path::new("a.md"), &FallbackTable::default(), today());
        assert_eq!(meta.title, UNTITLED);
        assert_eq!(body, content);
    }

    #[test]
    fn crlf_block() {
        let content = "---\r\ntitle: \"Win\"\r\n---\r\nbody";
        let (meta, body) =
            parse_front_matter(content, Path::new("a.md"), &FallbackTable::default(), today());
        assert_eq!(meta.title, "Win");
        assert_eq!(body, "body");
    }
}
