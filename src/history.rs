use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context as _};
use chrono::{DateTime, Utc};
use log::debug;

/// Source of a file's last modification time as recorded by version control.
pub(crate) trait VersionHistory {
    fn last_modified(&self, path: &Path) -> anyhow::Result<DateTime<Utc>>;
}

#[derive(Debug)]
pub(crate) struct GitHistory {
    git: PathBuf,
    repo_root: PathBuf,
}

impl GitHistory {
    pub fn new(repo_root: &Path) -> anyhow::Result<Self> {
        let git = which::which("git").context("git executable not found")?;
        Ok(Self {
            git,
            repo_root: repo_root.to_path_buf(),
        })
    }
}

impl VersionHistory for GitHistory {
    fn last_modified(&self, path: &Path) -> anyhow::Result<DateTime<Utc>> {
        let path = std::path::absolute(path)?;
        debug!("git log for {path:?}");
        let output = Command::new(&self.git)
            .current_dir(&self.repo_root)
            .args(["log", "-1", "--format=%cI", "--"])
            .arg(&path)
            .output()
            .with_context(|| format!("while running git log for {path:?}"))?;
        if !output.status.success() {
            bail!(
                "git log failed for {path:?}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        parse_commit_date(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("no commit date for {path:?}"))
    }
}

/// Parses the `%cI` (strict ISO 8601) output of `git log`.
fn parse_commit_date(stdout: &str) -> anyhow::Result<DateTime<Utc>> {
    let line = stdout.trim();
    if line.is_empty() {
        bail!("file is not tracked");
    }
    Ok(DateTime::parse_from_rfc3339(line)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn commit_date_is_converted_to_utc() {
        let d = parse_commit_date("2024-05-20T10:30:00+08:00\n").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 5, 20, 2, 30, 0).unwrap());
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(parse_commit_date("\n").is_err());
        assert!(parse_commit_date("yesterday").is_err());
    }
}
