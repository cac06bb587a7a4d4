use std::{
    fs::OpenOptions,
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context as _};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rss::{validation::Validate, Channel, ChannelBuilder, GuidBuilder, ImageBuilder, ItemBuilder};

use crate::{
    context::{Context, LinkTarget, PubDateSource},
    history::VersionHistory,
    metadata::parse_front_matter,
    renderer::{render_container, render_page},
};

mod data;
mod utils;

use data::TransformedPost;
use utils::{
    encode_spaces, excerpt, normalize_path, relative_path, render_markdown, rewrite_image_paths,
    to_rfc822, RFC822_FORMAT,
};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const ICON_SIZE: &str = "144";

fn is_post(file_name: &str) -> bool {
    file_name.ends_with(".md") && !file_name.starts_with('.')
}

fn walk_posts(dir: &Path, posts: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("while reading {dir:?}"))?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = vec![];
    for entry in entries {
        let path = entry.path();
        // `is_dir` follows links; linked directories are listed but not descended into
        if path.is_dir() {
            if !entry.file_type()?.is_symlink() {
                subdirs.push(path);
            }
        } else if is_post(&entry.file_name().to_string_lossy()) {
            posts.push(path);
        }
    }

    for subdir in subdirs {
        walk_posts(&subdir, posts)?;
    }
    Ok(())
}

/// All posts below `article_dir`: a directory's own posts in name order, then
/// each subdirectory in turn.
fn discover_posts(article_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut posts = vec![];
    walk_posts(article_dir, &mut posts)?;
    Ok(posts)
}

/// `html_out_dir` mirrors the post's directory below `article_dir`.
fn html_path_for(ctx: &Context, source: &Path) -> PathBuf {
    let rel = source
        .strip_prefix(&ctx.article_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
    let mut path = ctx.html_out_dir.join(rel);
    path.set_extension("html");
    path
}

fn transform_post(
    ctx: &Context,
    source: &Path,
    now: DateTime<Utc>,
) -> anyhow::Result<TransformedPost> {
    let content = std::fs::read_to_string(source)
        .with_context(|| format!("while reading {source:?}"))?;

    let (metadata, body) =
        parse_front_matter(&content, source, &ctx.fallbacks, now.date_naive());
    let body = rewrite_image_paths(&body, source, &ctx.project_root, &ctx.raw_base());
    let body_html = render_markdown(&body, &ctx.markdown_extensions);

    let standalone_html = render_page(&ctx.handlebars, &ctx.feed_language, &metadata, &body_html)
        .with_context(|| format!("while generating from {source:?}"))?;
    let feed_html = render_container(&body_html);

    Ok(TransformedPost {
        source: source.to_path_buf(),
        metadata,
        body_html,
        feed_html,
        standalone_html,
        html_path: html_path_for(ctx, source),
    })
}

fn save_page(post: &TransformedPost) -> anyhow::Result<()> {
    if let Some(parent) = post.html_path.parent() {
        fs_extra::dir::create_all(parent, false)?;
    }
    let mut fd = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&post.html_path)
        .with_context(|| format!("while opening {:?}", post.html_path))?;
    fd.write_all(post.standalone_html.as_bytes())?;

    info!("generated {:?}", post.html_path);
    Ok(())
}

/// `<feed_link>/raw/main/...` for `path`, which is relative to the working
/// directory or absolute.
fn remote_url(base: &str, project_root: &Path, path: &Path) -> String {
    let rel = relative_path(&normalize_path(path), &normalize_path(project_root));
    format!("{base}{}", encode_spaces(&rel))
}

fn item_link(ctx: &Context, post: &TransformedPost) -> String {
    match ctx.link_target {
        LinkTarget::Html => remote_url(&ctx.raw_base(), &ctx.project_root, &post.html_path),
        LinkTarget::Markdown => remote_url(&ctx.blob_base(), &ctx.project_root, &post.source),
    }
}

fn pub_date(
    ctx: &Context,
    post: &TransformedPost,
    now: DateTime<Utc>,
    history: Option<&dyn VersionHistory>,
) -> String {
    if let (PubDateSource::Commit, Some(history)) = (ctx.pub_date_source, history) {
        match history.last_modified(&post.source) {
            Ok(date) => return date.format(RFC822_FORMAT).to_string(),
            Err(e) => warn!(
                "falling back to front matter date for {:?}: {e:#}",
                post.source
            ),
        }
    }
    to_rfc822(&post.metadata.date, now)
}

fn post_to_item(
    ctx: &Context,
    post: &TransformedPost,
    now: DateTime<Utc>,
    history: Option<&dyn VersionHistory>,
) -> rss::Item {
    let link = item_link(ctx, post);
    let description = if !post.metadata.description.is_empty() {
        post.metadata.description.clone()
    } else if ctx.full_content {
        post.feed_html.clone()
    } else {
        excerpt(&post.body_html, ctx.excerpt_length)
    };

    ItemBuilder::default()
        .title(post.metadata.title.clone())
        .link(Some(link.clone()))
        .description(description)
        .pub_date(pub_date(ctx, post, now, history))
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .build()
}

fn channel_image(ctx: &Context) -> Option<rss::Image> {
    let icon = ctx.icon_path.to_string_lossy().trim_start_matches('/').to_string();
    if !ctx.project_root.join(&icon).exists() {
        debug!("no icon at {icon:?}");
        return None;
    }

    Some(
        ImageBuilder::default()
            .url(format!("{}{}", ctx.raw_base(), encode_spaces(&icon)))
            .title(ctx.feed_title.clone())
            .link(ctx.feed_link.clone())
            .width(Some(ICON_SIZE.to_string()))
            .height(Some(ICON_SIZE.to_string()))
            .build(),
    )
}

fn build_channel(ctx: &Context, items: Vec<rss::Item>, now: DateTime<Utc>) -> Channel {
    ChannelBuilder::default()
        .title(ctx.feed_title.clone())
        .link(ctx.feed_link.clone())
        .description(ctx.feed_description.clone())
        .language(Some(ctx.feed_language.clone()))
        .pub_date(Some(now.format(RFC822_FORMAT).to_string()))
        .image(channel_image(ctx))
        .items(items)
        .build()
}

/// Indented XML without blank lines, under a single declaration.
fn serialize_channel(channel: &Channel) -> anyhow::Result<String> {
    let buf = channel.pretty_write_to(Vec::new(), b' ', 2)?;
    let xml = String::from_utf8(buf)?;

    let mut out = XML_DECLARATION.to_string();
    for line in xml
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("<?xml"))
    {
        out.push('\n');
        out.push_str(line);
    }
    Ok(out)
}

/// Transforms every post (writing standalone pages if enabled) and returns the
/// serialized feed.
fn build_feed(
    ctx: &Context,
    now: DateTime<Utc>,
    history: Option<&dyn VersionHistory>,
) -> anyhow::Result<String> {
    let mut items = vec![];
    for source in discover_posts(&ctx.article_dir)? {
        debug!("processing {source:?}");
        let post = transform_post(ctx, &source, now)?;
        if ctx.write_html {
            save_page(&post)?;
        }
        items.push(post_to_item(ctx, &post, now, history));
    }

    let channel = build_channel(ctx, items, now);
    channel
        .validate()
        .map_err(|e| anyhow!("RSS validation failed: {e}"))?;
    serialize_channel(&channel)
}

pub(crate) fn generate(ctx: &Context, history: Option<&dyn VersionHistory>) -> anyhow::Result<()> {
    let xml = build_feed(ctx, Utc::now(), history)?;

    if let Some(parent) = ctx.rss_output.parent() {
        if !parent.as_os_str().is_empty() {
            fs_extra::dir::create_all(parent, false)?;
        }
    }
    std::fs::write(&ctx.rss_output, xml)
        .with_context(|| format!("while writing {:?}", ctx.rss_output))?;

    info!("generated {:?}", ctx.rss_output);
    Ok(())
}
