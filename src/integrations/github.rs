use crate::config::GithubConfig;
use crate::integrations::HTTP_CLIENT;
use anyhow::{Context, Result};
use serde::Deserialize;

const GITHUB_API_URL: &str = "https://api.github.com";

/// Conventional-commit prefixes offered when opening a pull request.
pub const PR_KINDS: &[&str] = &["fix", "feat", "chore", "refactor", "test"];

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// `kind: summary [KEY]`
pub fn pr_title(kind: &str, summary: &str, key: &str) -> String {
    format!("{}: {} [{}]", kind, summary.trim(), key)
}

pub fn pr_body(problem: &str, solution: &str, key: &str) -> String {
    format!(
        "## Problem\n\n{}\n\n## Solution\n\n{}\n\n## Checklist\n\n\
         - [ ] The description explains both the \"why\" and \"what\" of the change.\n\
         - [ ] This PR is limited to a single logical change.\n\
         - [ ] Impact areas have been identified and relevant automation ran.\n\n\
         Jira Ticket: {}",
        problem.trim(),
        solution.trim(),
        key
    )
}

pub struct GithubClient {
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Self {
        Self { config }
    }

    pub fn base_branch(&self) -> &str {
        &self.config.base_branch
    }

    /// Open a pull request from `head` into the configured base branch.
    pub async fn create_pull(&self, title: &str, body: &str, head: &str) -> Result<PullRequest> {
        let url = format!(
            "{}/repos/{}/{}/pulls",
            GITHUB_API_URL, self.config.owner, self.config.repo
        );

        let response = HTTP_CLIENT
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "ticketdeck")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&serde_json::json!({
                "title": title,
                "body": body,
                "head": head,
                "base": self.config.base_branch,
            }))
            .send()
            .await
            .context("GitHub pull request creation failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error: {} {}", status, text);
        }

        let pr: PullRequest = response
            .json()
            .await
            .context("Failed to decode GitHub pull request")?;
        tracing::info!("Opened pull request #{} ({})", pr.number, pr.html_url);
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_title() {
        assert_eq!(
            pr_title("fix", " Login crash ", "EPM-9"),
            "fix: Login crash [EPM-9]"
        );
    }

    #[test]
    fn test_pr_body_mentions_ticket() {
        let body = pr_body("It breaks", "Stop that", "EPM-9");
        assert!(body.starts_with("## Problem\n\nIt breaks\n\n## Solution\n\nStop that"));
        assert!(body.ends_with("Jira Ticket: EPM-9"));
    }
}
