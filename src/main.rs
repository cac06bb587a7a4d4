use anyhow::bail;
use context::{Context, PubDateSource};
use generator::generate;
use history::{GitHistory, VersionHistory};
use log::warn;

mod context;
mod generator;
mod history;
mod metadata;
mod renderer;

fn check_context(ctx: &Context) -> anyhow::Result<()> {
    if !ctx.article_dir.is_dir() {
        bail!("article_dir({:?}) must be a directory.", ctx.article_dir);
    }
    if !ctx.project_root.is_dir() {
        bail!("project_root({:?}) must be a directory.", ctx.project_root);
    }
    if ctx.rss_output.is_dir() {
        bail!("rss_output({:?}) must not be a directory.", ctx.rss_output);
    }
    if ctx.html_out_dir.exists() && !ctx.html_out_dir.is_dir() {
        bail!("if html_out_dir exists, it must be directory.");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = Context::new(renderer::generate_renderer()?);
    check_context(&ctx)?;

    let history = match ctx.pub_date_source {
        PubDateSource::Commit => match GitHistory::new(&ctx.project_root) {
            Ok(git) => Some(git),
            Err(e) => {
                warn!("{e:#}; item dates come from front matter");
                None
            }
        },
        PubDateSource::FrontMatter => None,
    };

    generate(&ctx, history.as_ref().map(|h| h as &dyn VersionHistory))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_article_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut ctx = Context::new(handlebars::Handlebars::new());
        ctx.project_root = dir.path().to_path_buf();
        ctx.article_dir = dir.path().join("post");
        assert!(check_context(&ctx).is_err());

        std::fs::create_dir(&ctx.article_dir).unwrap();
        ctx.rss_output = dir.path().join("rss.xml");
        ctx.html_out_dir = dir.path().join("asset/html");
        assert!(check_context(&ctx).is_ok());
    }
}
