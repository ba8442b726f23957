pub mod git;
pub mod github;
pub mod jira;
pub mod xray;

use crate::data::columns::standard_columns;
use crate::data::{ColumnSet, Ticket, TicketDraft};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::path::Path;
use std::time::Duration;

/// Shared HTTP client for all API requests to enable connection pooling
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Agile board pages that can be opened in the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPage {
    Sprint,
    Backlog,
    Kanban,
}

/// Everything the table client needs from the ticket tracker.
///
/// Fetches return tickets in the tracker's rank order. Mutations never touch
/// the caller's snapshot; callers re-fetch to observe the change.
#[async_trait]
pub trait TicketGateway: Send + Sync {
    async fn fetch_backlog(&self) -> Result<Vec<Ticket>>;
    async fn fetch_sprint(&self) -> Result<Vec<Ticket>>;
    async fn fetch_board(&self, board: &str) -> Result<Vec<Ticket>>;
    async fn fetch_escalations(&self) -> Result<Vec<Ticket>>;
    async fn fetch_windows_shared(&self) -> Result<Vec<Ticket>>;
    async fn search(&self, query: &str) -> Result<Vec<Ticket>>;
    async fn fetch_subtasks(&self, parent: &Ticket) -> Result<Vec<Ticket>>;

    /// Optional columns, in function-key order.
    fn optional_fields(&self) -> ColumnSet {
        standard_columns()
    }

    fn boards(&self) -> Vec<String>;
    fn teams(&self) -> Vec<String>;
    fn current_team(&self) -> String;
    fn set_team(&self, team: &str) -> Result<()>;
    /// Short names usable with [`TicketGateway::assign`].
    fn user_short_names(&self) -> Vec<String>;

    async fn assign(&self, ticket: &Ticket, short_name: Option<&str>) -> Result<()>;
    async fn statuses(&self, ticket: &Ticket) -> Result<Vec<String>>;
    async fn transition(&self, ticket: &Ticket, status: &str) -> Result<()>;
    async fn set_story_points(&self, ticket: &Ticket, points: f64) -> Result<()>;
    async fn add_comment(&self, ticket: &Ticket, body: &str) -> Result<()>;
    async fn issue_types(&self, sub_task: bool) -> Result<Vec<String>>;
    async fn create_ticket(&self, draft: &TicketDraft) -> Result<Ticket>;
    /// Deletes the ticket together with its sub-tickets.
    async fn delete(&self, ticket: &Ticket) -> Result<()>;
    async fn rank_above(&self, ticket: &Ticket, anchor: &Ticket) -> Result<()>;
    async fn rank_below(&self, ticket: &Ticket, anchor: &Ticket) -> Result<()>;
    async fn move_to_backlog(&self, ticket: &Ticket) -> Result<()>;
    async fn move_to_sprint(&self, ticket: &Ticket) -> Result<()>;
    /// Creates a spike in the open sprint linked to `ticket`.
    async fn create_linked_spike(&self, ticket: &Ticket) -> Result<Ticket>;
    /// Saves the ticket's attachments into `dir`, skipping files already
    /// there. Returns how many were written.
    async fn download_attachments(&self, ticket: &Ticket, dir: &Path) -> Result<usize>;

    /// Raw text of the ticket's test-definition field, empty when unset.
    async fn test_definitions(&self, ticket: &Ticket) -> Result<String>;
    async fn append_test_template(&self, ticket: &Ticket, template: &str) -> Result<()>;
    /// Links a generated test to the ticket it covers.
    async fn link_test(&self, test_key: &str, ticket: &Ticket) -> Result<()>;
    /// Issue id of the first test plan whose summary matches `name`.
    async fn find_test_plan(&self, name: &str) -> Result<Option<String>>;

    fn browse_url(&self, ticket: &Ticket) -> String;
    fn board_url(&self, page: BoardPage) -> Result<String>;
}

/// Open a URL or path with the desktop handler.
pub fn open_url(url: &str) -> Result<()> {
    // Use xdg-open on Linux, which works in WSL
    std::process::Command::new("xdg-open")
        .arg(url)
        .spawn()
        .or_else(|_| {
            // Fallback to wslview for WSL
            std::process::Command::new("wslview").arg(url).spawn()
        })
        .with_context(|| format!("Failed to open {}", url))?;
    Ok(())
}

pub fn open_path(path: &Path) -> Result<()> {
    open_url(&path.to_string_lossy())
}
