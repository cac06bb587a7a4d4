use std::path::PathBuf;

use crate::metadata::PostMetadata;

/// Everything the feed needs from one markdown file.
#[derive(Debug, Clone)]
pub(super) struct TransformedPost {
    pub source: PathBuf,
    pub metadata: PostMetadata,
    /// rendered markdown only
    pub body_html: String,
    /// `body_html` in the styled container used inside the feed
    pub feed_html: String,
    pub standalone_html: String,
    /// where the standalone page goes (below `html_out_dir`)
    pub html_path: PathBuf,
}
