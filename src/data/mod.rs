pub mod columns;
pub mod report;
pub mod sorting;
pub mod testdefs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use columns::{ColumnSet, Projection};
pub use report::SprintReport;
pub use testdefs::{PlanUpdate, TestDefinition, TestDefinitions, TestRun};

/// A ticket snapshot as returned by the tracker.
///
/// The UI never edits these in place; mutations go through the gateway and the
/// view re-fetches a fresh snapshot afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    /// Free-form status name; the tracker owns the set of statuses.
    pub status: String,
    /// Whether the tracker files `status` under its done category.
    #[serde(default)]
    pub done: bool,
    pub assignee: Option<String>,
    pub issue_type: String,
    pub description: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub story_points: Option<f64>,
    pub sprint: Option<String>,
    pub parent_summary: Option<String>,
    pub url: String,
    pub sub_tickets: Vec<SubTicket>,
}

/// Minimal projection of a nested sub-ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubTicket {
    pub key: String,
    pub summary: String,
    pub status: String,
    #[serde(default)]
    pub done: bool,
}

impl SubTicket {
    /// Promote to a `Ticket` so a sub-row can back a table row.
    pub fn to_ticket(&self) -> Ticket {
        Ticket {
            key: self.key.clone(),
            summary: self.summary.clone(),
            status: self.status.clone(),
            done: self.done,
            ..Ticket::default()
        }
    }
}

impl Ticket {
    /// The three fixed cells every row starts with.
    pub fn fixed_cells(&self) -> Vec<String> {
        vec![self.key.clone(), self.summary.clone(), self.status.clone()]
    }
}

/// Which collection of tickets the table is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Backlog,
    Sprint,
    Board,
    Escalations,
    WindowsShared,
    Search,
    TaskView,
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Sprint => "Sprint",
            Self::Board => "Board",
            Self::Escalations => "Escalations",
            Self::WindowsShared => "Windows Shared",
            Self::Search => "Search",
            Self::TaskView => "Sub-tasks",
        }
    }

    /// Columns injected automatically on entry to this mode.
    pub fn default_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Sprint => &[columns::POINTS],
            Self::TaskView => &[columns::ASSIGNEE],
            _ => &[],
        }
    }

    /// Modes whose fetch needs a board name or query text.
    pub fn takes_params(&self) -> bool {
        matches!(self, Self::Board | Self::Search)
    }
}

/// Where a newly created ticket lands.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Backlog,
    Sprint,
    SubTaskOf(Ticket),
}

/// Everything needed to create a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDraft {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub placement: Placement,
}
