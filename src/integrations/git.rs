//! Local repository and support-folder helpers.
//!
//! Everything here shells out or touches the filesystem synchronously; the
//! calls are short and run from the input loop like any other action.

use crate::config::GitConfig;
use crate::data::Ticket;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid dash regex"));
static NOT_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\-]").expect("valid slug regex"));

/// `initials/key/summary-slug`, all lowercase.
pub fn branch_name(initials: &str, key: &str, summary: &str) -> String {
    let kept: String = summary
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    let slug = DASH_RUNS
        .replace_all(&kept.trim().replace(' ', "-"), "-")
        .to_lowercase();
    format!("{}/{}/{}", initials, key.to_lowercase(), slug)
}

/// Folder name for a support case: dashes for spaces, ASCII alphanumerics only.
pub fn support_slug(title: &str) -> String {
    let dashed = DASH_RUNS.replace_all(&title.replace(' ', "-"), "-").into_owned();
    NOT_SLUG.replace_all(&dashed, "").to_lowercase()
}

pub struct GitRepo {
    dir: PathBuf,
    initials: String,
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>, config: &GitConfig) -> Self {
        Self {
            dir: dir.into(),
            initials: config.initials.clone(),
        }
    }

    /// `Some` when `dir` is inside a work tree.
    pub fn discover(dir: impl Into<PathBuf>, config: &GitConfig) -> Option<Self> {
        let repo = Self::new(dir, config);
        match repo.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) if out == "true" => Some(repo),
            _ => None,
        }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.git(&["status", "--porcelain"])?.is_empty())
    }

    /// Branch off `base` for the ticket and push it upstream.
    pub fn create_branch_for(&self, ticket: &Ticket, base: &str) -> Result<String> {
        if self.is_dirty()? {
            anyhow::bail!("Repository has uncommitted changes");
        }
        if self.initials.is_empty() {
            anyhow::bail!("git.initials is not configured");
        }

        let name = branch_name(&self.initials, &ticket.key, &ticket.summary);
        self.git(&["checkout", base])?;
        self.git(&["checkout", "-b", &name])?;
        self.git(&["push", "--set-upstream", "origin", &name])?;
        tracing::info!("Created branch {}", name);
        Ok(name)
    }
}

/// A support case folder and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportFolder {
    pub path: PathBuf,
    pub created: bool,
}

impl SupportFolder {
    pub fn attachments(&self) -> PathBuf {
        self.path.join("attachments")
    }
}

/// Create `<root>/<slug>` with a link file, a notes file and an attachments
/// directory. An existing folder is returned untouched.
pub fn create_support_folder(root: &Path, ticket: &Ticket, url: &str) -> Result<SupportFolder> {
    let folder = root.join(support_slug(&ticket.summary));
    if folder.exists() {
        return Ok(SupportFolder {
            path: folder,
            created: false,
        });
    }

    std::fs::create_dir_all(folder.join("attachments"))
        .with_context(|| format!("Failed to create {}", folder.display()))?;

    std::fs::write(
        folder.join(format!("Case {}.url", ticket.key)),
        format!("[InternetShortcut]\nURL={}", url),
    )?;
    std::fs::write(
        folder.join(format!("CaseNotes-{}.md", ticket.key)),
        format!("# {}\n{}\n\n## Notes\n\n", ticket.summary, url),
    )?;

    tracing::info!("Created support folder {}", folder.display());
    Ok(SupportFolder {
        path: folder,
        created: true,
    })
}
