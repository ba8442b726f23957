//! Sprint summary computed off the UI thread.

use super::columns::format_points;
use super::Ticket;
use indexmap::IndexMap;

const UNASSIGNED: &str = "Unassigned";

/// Per-assignee and per-status totals for one sprint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SprintReport {
    pub ticket_count: usize,
    pub total_points: f64,
    /// assignee -> (tickets, points), in first-seen order
    pub by_assignee: IndexMap<String, (usize, f64)>,
    /// status -> tickets, in first-seen order
    pub by_status: IndexMap<String, usize>,
    /// sub-tickets that are still open across the sprint
    pub open_sub_tickets: usize,
}

impl SprintReport {
    /// Open sub-tickets are judged by the tracker's done category, not by
    /// status name.
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut report = SprintReport {
            ticket_count: tickets.len(),
            ..Self::default()
        };

        for ticket in tickets {
            let points = ticket.story_points.unwrap_or(0.0);
            report.total_points += points;

            let who = ticket.assignee.as_deref().unwrap_or(UNASSIGNED).to_string();
            let entry = report.by_assignee.entry(who).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += points;

            *report.by_status.entry(ticket.status.clone()).or_insert(0) += 1;

            report.open_sub_tickets += ticket
                .sub_tickets
                .iter()
                .filter(|sub| !sub.done)
                .count();
        }

        report
    }

    /// Lines suitable for the prompt area.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Sprint: {} tickets, {} points, {} open sub-tasks",
            self.ticket_count,
            format_points(self.total_points),
            self.open_sub_tickets
        )];

        let people: Vec<String> = self
            .by_assignee
            .iter()
            .map(|(who, (count, points))| {
                format!("{}: {} ({}pt)", who, count, format_points(*points))
            })
            .collect();
        lines.push(people.join(", "));

        let statuses: Vec<String> = self
            .by_status
            .iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect();
        lines.push(statuses.join(", "));

        lines
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SubTicket;
    use pretty_assertions::assert_eq;

    fn ticket(key: &str, who: Option<&str>, status: &str, points: Option<f64>) -> Ticket {
        Ticket {
            key: key.to_string(),
            assignee: who.map(String::from),
            status: status.to_string(),
            story_points: points,
            ..Ticket::default()
        }
    }

    #[test]
    fn test_report_totals() {
        let mut first = ticket("A-1", Some("Ada"), "In Progress", Some(3.0));
        first.sub_tickets = vec![
            SubTicket {
                key: "A-10".into(),
                summary: "x".into(),
                status: "Shipped".into(),
                done: true,
            },
            SubTicket {
                key: "A-11".into(),
                summary: "y".into(),
                status: "Done pending review".into(),
                done: false,
            },
        ];
        let tickets = vec![
            first,
            ticket("A-2", None, "To Do", Some(0.5)),
            ticket("A-3", Some("Ada"), "To Do", None),
        ];

        let report = SprintReport::from_tickets(&tickets);
        assert_eq!(report.ticket_count, 3);
        assert_eq!(report.total_points, 3.5);
        assert_eq!(report.by_assignee["Ada"], (2, 3.0));
        assert_eq!(report.by_assignee["Unassigned"], (1, 0.5));
        assert_eq!(report.by_status["To Do"], 2);
        assert_eq!(report.open_sub_tickets, 1);

        assert_eq!(
            report.summary_lines()[0],
            "Sprint: 3 tickets, 3.5 points, 1 open sub-tasks"
        );
    }

    #[test]
    fn test_empty_report() {
        let report = SprintReport::from_tickets(&[]);
        assert_eq!(report.total_points, 0.0);
        assert_eq!(report.summary_lines()[0], "Sprint: 0 tickets, 0 points, 0 open sub-tasks");
    }
}
