//! Optional table columns.
//!
//! A column is a name plus a pure projection from a ticket to a cell string.
//! Projections run once per row on every rebuild, so they only read fields
//! already on the ticket.

use super::Ticket;
use chrono::Utc;
use indexmap::IndexMap;
use std::fmt;

pub const ASSIGNEE: &str = "Assignee";
pub const CREATED: &str = "Created";
pub const UPDATED: &str = "Updated";
pub const AGE: &str = "Age";
pub const POINTS: &str = "Points";
pub const ISSUE_TYPE: &str = "Issue Type";
pub const SUB_TASKS: &str = "Sub-Tasks";
pub const PARENT_DESC: &str = "Parent Desc";
pub const SPRINT: &str = "Sprint";

const PARENT_DESC_MAX: usize = 30;

/// Ticket -> cell projection.
#[derive(Clone, Copy)]
pub struct Projection(fn(&Ticket) -> String);

impl Projection {
    pub const fn new(f: fn(&Ticket) -> String) -> Self {
        Self(f)
    }

    pub fn apply(&self, ticket: &Ticket) -> String {
        (self.0)(ticket)
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Projection(..)")
    }
}

/// Ordered column name -> projection map. Keys are unique by construction.
pub type ColumnSet = IndexMap<String, Projection>;

/// The optional fields every tracker ticket can show, in function-key order.
pub fn standard_columns() -> ColumnSet {
    let columns: [(&str, fn(&Ticket) -> String); 9] = [
        (ASSIGNEE, assignee),
        (CREATED, |t| format_timestamp(t.created)),
        (UPDATED, |t| format_timestamp(t.updated)),
        (AGE, age_days),
        (POINTS, |t| t.story_points.map(format_points).unwrap_or_default()),
        (ISSUE_TYPE, |t| t.issue_type.clone()),
        (SUB_TASKS, |t| t.sub_tickets.len().to_string()),
        (PARENT_DESC, parent_description),
        (SPRINT, |t| t.sprint.clone().unwrap_or_else(|| "No sprint".to_string())),
    ];

    columns
        .into_iter()
        .map(|(name, f)| (name.to_string(), Projection::new(f)))
        .collect()
}

fn assignee(ticket: &Ticket) -> String {
    ticket.assignee.clone().unwrap_or_default()
}

fn format_timestamp(ts: Option<chrono::DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn age_days(ticket: &Ticket) -> String {
    ticket
        .created
        .map(|created| (Utc::now() - created).num_days().to_string())
        .unwrap_or_default()
}

/// Whole numbers render without a trailing ".0".
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        format!("{}", points)
    }
}

fn parent_description(ticket: &Ticket) -> String {
    match &ticket.parent_summary {
        Some(summary) if summary.chars().count() > PARENT_DESC_MAX => {
            let head: String = summary.chars().take(PARENT_DESC_MAX).collect();
            format!("{}...", head)
        }
        Some(summary) => summary.clone(),
        None => String::new(),
    }
}
