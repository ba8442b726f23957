//! The view-mode state machine behind the ticket table.
//!
//! `TicketView` owns which tickets are shown, under which mode and with which
//! optional columns, plus a single "previous" snapshot used to come back from
//! a ticket's sub-tasks. Every render goes through one path so a refresh and
//! a rebuild produce identical tables for identical state.
//!
//! History rules:
//! - a refresh captures the current view as previous, unless the current
//!   mode is `TaskView`; drilling from sub-tasks into sub-tasks keeps the
//!   original view as the way back
//! - `previous()` only acts in `TaskView` and never fetches
//! - a failed fetch changes nothing

use crate::data::columns::{ASSIGNEE, POINTS};
use crate::data::sorting::{sort_order, SortSpec};
use crate::data::{ColumnSet, Projection, Ticket, ViewMode};
use crate::integrations::TicketGateway;
use crate::tui::search::FuzzySearch;
use crate::tui::table::{SubRow, TableUi};
use anyhow::Result;
use indexmap::IndexMap;

pub const FIXED_COLUMNS: [&str; 3] = ["Key", "Summary", "Status"];

/// What `previous()` restores.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: ViewMode,
    pub tickets: Vec<Ticket>,
    pub params: Option<String>,
    dismissed: IndexMap<String, bool>,
    filter: Option<String>,
    sort: Option<SortSpec>,
}

pub struct TicketView {
    mode: ViewMode,
    parent: Option<Ticket>,
    params: Option<String>,
    /// Every optional column the gateway offers, in function-key order.
    available: ColumnSet,
    extra_columns: ColumnSet,
    /// Mode defaults switched off during this mode stay. The flag records
    /// whether the column had been an explicit extra before.
    dismissed: IndexMap<String, bool>,
    tickets: Vec<Ticket>,
    previous: Option<Snapshot>,
    filter: Option<String>,
    sort: Option<SortSpec>,
}

impl TicketView {
    /// Fails when the gateway lacks a column some mode injects by default.
    pub fn new(available: ColumnSet) -> Result<Self> {
        for required in [POINTS, ASSIGNEE] {
            if !available.contains_key(required) {
                anyhow::bail!(
                    "Ticket source does not provide the required '{}' column",
                    required
                );
            }
        }
        Ok(Self {
            mode: ViewMode::Backlog,
            parent: None,
            params: None,
            available,
            extra_columns: ColumnSet::new(),
            dismissed: IndexMap::new(),
            tickets: Vec::new(),
            previous: None,
            filter: None,
            sort: None,
        })
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn parent(&self) -> Option<&Ticket> {
        self.parent.as_ref()
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn previous_snapshot(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn extra_columns(&self) -> &ColumnSet {
        &self.extra_columns
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn title(&self) -> String {
        let mut title = self.mode.label().to_string();
        match (&self.parent, &self.params) {
            (Some(parent), _) => title.push_str(&format!(": {} {}", parent.key, parent.summary)),
            (None, Some(params)) => title.push_str(&format!(": {}", params)),
            _ => {}
        }
        if let Some(filter) = &self.filter {
            title.push_str(&format!(" [filter: {}]", filter));
        }
        title
    }

    /// Fetch what `mode` would show without touching any view state.
    pub async fn fetch(
        &self,
        gateway: &dyn TicketGateway,
        mode: ViewMode,
        params: Option<&str>,
        parent: Option<&Ticket>,
    ) -> Result<Vec<Ticket>> {
        tracing::debug!("Fetching {:?} (params: {:?})", mode, params);
        match mode {
            ViewMode::Backlog => gateway.fetch_backlog().await,
            ViewMode::Sprint => gateway.fetch_sprint().await,
            ViewMode::Escalations => gateway.fetch_escalations().await,
            ViewMode::WindowsShared => gateway.fetch_windows_shared().await,
            ViewMode::Board => match params {
                Some(board) => gateway.fetch_board(board).await,
                None => anyhow::bail!("No board selected"),
            },
            ViewMode::Search => match params {
                Some(query) => gateway.search(query).await,
                None => anyhow::bail!("No search text given"),
            },
            ViewMode::TaskView => match parent {
                Some(parent) => gateway.fetch_subtasks(parent).await,
                None => anyhow::bail!("No ticket selected for sub-tasks"),
            },
        }
    }

    /// Re-fetch the current view without rendering it.
    pub async fn fetch_current(&self, gateway: &dyn TicketGateway) -> Result<Vec<Ticket>> {
        self.fetch(
            gateway,
            self.mode,
            self.params.as_deref(),
            self.parent.as_ref(),
        )
        .await
    }

    /// Fetch for `mode` (default: the current one), switch to it and render.
    ///
    /// `params` and `parent` fall back to the current ones while the mode is
    /// unchanged. Errors from the gateway propagate and leave the view as it
    /// was.
    pub async fn refresh(
        &mut self,
        ui: &mut dyn TableUi,
        gateway: &dyn TicketGateway,
        mode: Option<ViewMode>,
        params: Option<String>,
        parent: Option<Ticket>,
    ) -> Result<&[Ticket]> {
        let target = mode.unwrap_or(self.mode);
        let staying = target == self.mode;

        let parent = if target == ViewMode::TaskView {
            parent.or_else(|| if staying { self.parent.clone() } else { None })
        } else {
            None
        };
        let params = if target.takes_params() {
            params.or_else(|| if staying { self.params.clone() } else { None })
        } else {
            None
        };

        ui.prompt(&format!("Fetching {}...", target.label().to_lowercase()))?;
        let tickets = self
            .fetch(gateway, target, params.as_deref(), parent.as_ref())
            .await?;

        if self.mode != ViewMode::TaskView {
            self.previous = Some(self.snapshot());
        }

        let fresh = !staying
            || params != self.params
            || parent.as_ref().map(|p| &p.key) != self.parent.as_ref().map(|p| &p.key);
        if fresh {
            self.dismissed.clear();
            self.filter = None;
            self.sort = None;
        }

        self.mode = target;
        self.params = params;
        self.parent = parent;
        self.tickets = tickets;

        self.render(ui)?;
        Ok(&self.tickets)
    }

    /// Return from `TaskView` to the saved view. No-op in any other mode.
    pub fn previous(&mut self, ui: &mut dyn TableUi) -> Result<()> {
        if self.mode != ViewMode::TaskView {
            return Ok(());
        }
        let Some(snapshot) = self.previous.clone() else {
            return Ok(());
        };

        self.mode = snapshot.mode;
        self.tickets = snapshot.tickets;
        self.params = snapshot.params;
        self.dismissed = snapshot.dismissed;
        self.filter = snapshot.filter;
        self.sort = snapshot.sort;
        self.parent = None;

        self.render(ui)
    }

    /// Re-render the current tickets, optionally with a new column set.
    pub fn rebuild(&mut self, ui: &mut dyn TableUi, extra_columns: Option<ColumnSet>) -> Result<()> {
        if let Some(columns) = extra_columns {
            self.extra_columns = columns;
        }
        self.render(ui)
    }

    /// Flip an optional column on or off. Does not render.
    ///
    /// Columns switched on land in function-key order, so toggling twice
    /// restores the exact previous column set.
    pub fn toggle_column(&mut self, name: &str) -> Result<()> {
        let is_default = self.mode.default_columns().iter().any(|d| *d == name);

        if self.extra_columns.shift_remove(name).is_some() {
            if is_default {
                self.dismissed.insert(name.to_string(), true);
            }
        } else if let Some(was_extra) = self.dismissed.shift_remove(name) {
            if was_extra {
                self.insert_ordered(name)?;
            }
        } else if is_default {
            self.dismissed.insert(name.to_string(), false);
        } else {
            self.insert_ordered(name)?;
        }

        // A sort on a column that just went away is dropped.
        let sorted_out = self
            .sort
            .as_ref()
            .is_some_and(|s| !self.header().contains(&s.column));
        if sorted_out {
            self.sort = None;
        }
        Ok(())
    }

    fn insert_ordered(&mut self, name: &str) -> Result<()> {
        let Some(rank) = self.available.get_index_of(name) else {
            anyhow::bail!("Unknown column '{}'", name);
        };
        let projection = self.available[rank];
        let position = self
            .extra_columns
            .keys()
            .position(|k| self.available.get_index_of(k).is_some_and(|r| r > rank))
            .unwrap_or(self.extra_columns.len());
        self.extra_columns
            .shift_insert(position, name.to_string(), projection);
        Ok(())
    }

    pub fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter.filter(|f| !f.trim().is_empty());
    }

    /// Sort by a header column; the same column again reverses.
    pub fn sort_by(&mut self, column: &str) {
        self.sort = Some(SortSpec::toggled(self.sort.as_ref(), column));
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Optional columns shown right now, in render order.
    pub fn effective_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .mode
            .default_columns()
            .iter()
            .filter(|d| !self.extra_columns.contains_key(**d) && !self.dismissed.contains_key(**d))
            .map(|d| d.to_string())
            .collect();
        names.extend(self.extra_columns.keys().cloned());
        names
    }

    /// Full header: fixed columns, then [`Self::effective_columns`].
    pub fn header(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.effective_columns())
            .collect()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            tickets: self.tickets.clone(),
            params: self.params.clone(),
            dismissed: self.dismissed.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
        }
    }

    fn projection(&self, name: &str) -> Option<Projection> {
        self.extra_columns
            .get(name)
            .or_else(|| self.available.get(name))
            .copied()
    }

    fn render(&self, ui: &mut dyn TableUi) -> Result<()> {
        ui.clear();
        ui.set_title(&self.title());

        let names = self.effective_columns();
        let projections: Vec<Option<Projection>> =
            names.iter().map(|n| self.projection(n)).collect();

        let visible: Vec<&Ticket> = match &self.filter {
            Some(query) => {
                let mut search = FuzzySearch::new();
                self.tickets
                    .iter()
                    .filter(|t| search.score_ticket(t, query).is_some())
                    .collect()
            }
            None => self.tickets.iter().collect(),
        };

        let rows: Vec<Vec<String>> = visible
            .iter()
            .map(|ticket| {
                let mut cells = ticket.fixed_cells();
                cells.extend(
                    projections
                        .iter()
                        .map(|p| p.map(|p| p.apply(ticket)).unwrap_or_default()),
                );
                cells
            })
            .collect();

        let header = self.header();
        let sort_column = self
            .sort
            .as_ref()
            .and_then(|s| header.iter().position(|h| *h == s.column).map(|i| (i, s.descending)));
        let order: Vec<usize> = match sort_column {
            Some((column, descending)) => sort_order(&rows, column, descending),
            None => (0..rows.len()).collect(),
        };

        ui.add_header(header);
        for idx in order {
            let ticket = visible[idx];
            let sub_rows = ticket
                .sub_tickets
                .iter()
                .map(|sub| {
                    let ticket = sub.to_ticket();
                    SubRow {
                        cells: ticket.fixed_cells(),
                        ticket,
                    }
                })
                .collect();
            ui.add_row(rows[idx].clone(), ticket.clone(), sub_rows);
        }
        ui.draw()
    }
}
