//! Test fixtures for ticketdeck tests: a scripted table and a stub gateway.
#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ticketdeck::data::{Placement, SubTicket, TestDefinition, Ticket, TicketDraft};
use ticketdeck::integrations::xray::{CreatedTest, TestRepository};
use ticketdeck::integrations::{BoardPage, TicketGateway};
use ticketdeck::tui::input::Input;
use ticketdeck::tui::keybindings::Trigger;
use ticketdeck::tui::table::{SubRow, TableUi};

pub fn ticket(key: &str, summary: &str) -> Ticket {
    Ticket {
        id: key.to_lowercase(),
        key: key.to_string(),
        summary: summary.to_string(),
        status: "To Do".to_string(),
        issue_type: "Story".to_string(),
        url: format!("https://jira.test/browse/{}", key),
        ..Ticket::default()
    }
}

pub fn with_subs(mut parent: Ticket, subs: &[(&str, &str)]) -> Ticket {
    parent.sub_tickets = subs
        .iter()
        .map(|(key, summary)| SubTicket {
            key: key.to_string(),
            summary: summary.to_string(),
            status: "To Do".to_string(),
            done: false,
        })
        .collect();
    parent
}

// ============================================================================
// Stub gateway
// ============================================================================

/// In-memory gateway. Every call is recorded as a short string such as
/// `fetch_backlog` or `transition:EPM-1:Done`.
#[derive(Default)]
pub struct StubGateway {
    pub backlog: Mutex<Vec<Ticket>>,
    pub sprint: Mutex<Vec<Ticket>>,
    pub escalations: Mutex<Vec<Ticket>>,
    pub windows_shared: Mutex<Vec<Ticket>>,
    pub boards: IndexMap<String, Vec<Ticket>>,
    pub search_results: Mutex<Vec<Ticket>>,
    /// parent key -> sub-tasks
    pub subtasks: Mutex<HashMap<String, Vec<Ticket>>>,
    /// ticket key -> test-definition text
    pub test_text: Mutex<HashMap<String, String>>,
    /// test plan name -> issue id
    pub test_plans: HashMap<String, String>,
    pub fail_fetches: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    team: Mutex<String>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            team: Mutex::new("core".to_string()),
            ..Self::default()
        }
    }

    pub fn with_backlog(self, tickets: Vec<Ticket>) -> Self {
        *self.backlog.lock().unwrap() = tickets;
        self
    }

    pub fn with_sprint(self, tickets: Vec<Ticket>) -> Self {
        *self.sprint.lock().unwrap() = tickets;
        self
    }

    pub fn with_board(mut self, name: &str, tickets: Vec<Ticket>) -> Self {
        self.boards.insert(name.to_string(), tickets);
        self
    }

    pub fn with_search(self, tickets: Vec<Ticket>) -> Self {
        *self.search_results.lock().unwrap() = tickets;
        self
    }

    pub fn with_subtasks(self, parent: &str, tickets: Vec<Ticket>) -> Self {
        self.subtasks
            .lock()
            .unwrap()
            .insert(parent.to_string(), tickets);
        self
    }

    pub fn with_test_text(self, key: &str, text: &str) -> Self {
        self.test_text
            .lock()
            .unwrap()
            .insert(key.to_string(), text.to_string());
        self
    }

    pub fn with_test_plan(mut self, name: &str, id: &str) -> Self {
        self.test_plans.insert(name.to_string(), id.to_string());
        self
    }

    pub fn test_text(&self, key: &str) -> String {
        self.test_text
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_fetches.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn fetched(&self, call: String, tickets: &Mutex<Vec<Ticket>>) -> anyhow::Result<Vec<Ticket>> {
        self.record(call);
        if self.fail_fetches.load(Ordering::SeqCst) {
            anyhow::bail!("tracker unavailable");
        }
        Ok(tickets.lock().unwrap().clone())
    }
}

#[async_trait]
impl TicketGateway for StubGateway {
    async fn fetch_backlog(&self) -> anyhow::Result<Vec<Ticket>> {
        self.fetched("fetch_backlog".into(), &self.backlog)
    }

    async fn fetch_sprint(&self) -> anyhow::Result<Vec<Ticket>> {
        self.fetched("fetch_sprint".into(), &self.sprint)
    }

    async fn fetch_board(&self, board: &str) -> anyhow::Result<Vec<Ticket>> {
        let tickets = Mutex::new(self.boards.get(board).cloned().unwrap_or_default());
        self.fetched(format!("fetch_board:{}", board), &tickets)
    }

    async fn fetch_escalations(&self) -> anyhow::Result<Vec<Ticket>> {
        self.fetched("fetch_escalations".into(), &self.escalations)
    }

    async fn fetch_windows_shared(&self) -> anyhow::Result<Vec<Ticket>> {
        self.fetched("fetch_windows_shared".into(), &self.windows_shared)
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<Ticket>> {
        self.fetched(format!("search:{}", query), &self.search_results)
    }

    async fn fetch_subtasks(&self, parent: &Ticket) -> anyhow::Result<Vec<Ticket>> {
        let tickets = Mutex::new(
            self.subtasks
                .lock()
                .unwrap()
                .get(&parent.key)
                .cloned()
                .unwrap_or_default(),
        );
        self.fetched(format!("fetch_subtasks:{}", parent.key), &tickets)
    }

    fn boards(&self) -> Vec<String> {
        self.boards.keys().cloned().collect()
    }

    fn teams(&self) -> Vec<String> {
        vec!["core".to_string(), "platform".to_string()]
    }

    fn current_team(&self) -> String {
        self.team.lock().unwrap().clone()
    }

    fn set_team(&self, team: &str) -> anyhow::Result<()> {
        self.record(format!("set_team:{}", team));
        *self.team.lock().unwrap() = team.to_string();
        Ok(())
    }

    fn user_short_names(&self) -> Vec<String> {
        vec!["jb".to_string(), "kd".to_string()]
    }

    async fn assign(&self, ticket: &Ticket, short_name: Option<&str>) -> anyhow::Result<()> {
        self.record(format!(
            "assign:{}:{}",
            ticket.key,
            short_name.unwrap_or("-")
        ));
        Ok(())
    }

    async fn statuses(&self, _ticket: &Ticket) -> anyhow::Result<Vec<String>> {
        Ok(vec!["In Progress".to_string(), "Done".to_string()])
    }

    async fn transition(&self, ticket: &Ticket, status: &str) -> anyhow::Result<()> {
        self.record(format!("transition:{}:{}", ticket.key, status));
        Ok(())
    }

    async fn set_story_points(&self, ticket: &Ticket, points: f64) -> anyhow::Result<()> {
        self.record(format!("points:{}:{}", ticket.key, points));
        Ok(())
    }

    async fn add_comment(&self, ticket: &Ticket, body: &str) -> anyhow::Result<()> {
        self.record(format!("comment:{}:{}", ticket.key, body));
        Ok(())
    }

    async fn issue_types(&self, sub_task: bool) -> anyhow::Result<Vec<String>> {
        Ok(if sub_task {
            vec!["Sub-task".to_string()]
        } else {
            vec!["Story".to_string(), "Bug".to_string()]
        })
    }

    /// New tickets become visible in the list they were placed in.
    async fn create_ticket(&self, draft: &TicketDraft) -> anyhow::Result<Ticket> {
        let created = Ticket {
            issue_type: draft.issue_type.clone(),
            description: Some(draft.description.clone()),
            ..ticket("EPM-100", &draft.summary)
        };
        match &draft.placement {
            Placement::Backlog => {
                self.record(format!("create:{}:backlog", draft.issue_type));
                self.backlog.lock().unwrap().push(created.clone());
            }
            Placement::Sprint => {
                self.record(format!("create:{}:sprint", draft.issue_type));
                self.sprint.lock().unwrap().push(created.clone());
            }
            Placement::SubTaskOf(parent) => {
                self.record(format!("create:{}:{}", draft.issue_type, parent.key));
                self.subtasks
                    .lock()
                    .unwrap()
                    .entry(parent.key.clone())
                    .or_default()
                    .push(created.clone());
            }
        }
        Ok(created)
    }

    async fn delete(&self, ticket: &Ticket) -> anyhow::Result<()> {
        self.record(format!("delete:{}", ticket.key));
        self.backlog.lock().unwrap().retain(|t| t.key != ticket.key);
        Ok(())
    }

    async fn rank_above(&self, ticket: &Ticket, anchor: &Ticket) -> anyhow::Result<()> {
        self.record(format!("rank_above:{}:{}", ticket.key, anchor.key));
        Ok(())
    }

    async fn rank_below(&self, ticket: &Ticket, anchor: &Ticket) -> anyhow::Result<()> {
        self.record(format!("rank_below:{}:{}", ticket.key, anchor.key));
        Ok(())
    }

    async fn move_to_backlog(&self, ticket: &Ticket) -> anyhow::Result<()> {
        self.record(format!("move_to_backlog:{}", ticket.key));
        Ok(())
    }

    async fn move_to_sprint(&self, ticket: &Ticket) -> anyhow::Result<()> {
        self.record(format!("move_to_sprint:{}", ticket.key));
        Ok(())
    }

    async fn create_linked_spike(&self, original: &Ticket) -> anyhow::Result<Ticket> {
        self.record(format!("spike:{}", original.key));
        Ok(ticket("EPM-200", &format!("SPIKE: {}", original.summary)))
    }

    async fn download_attachments(&self, ticket: &Ticket, _dir: &Path) -> anyhow::Result<usize> {
        self.record(format!("attachments:{}", ticket.key));
        Ok(0)
    }

    async fn test_definitions(&self, ticket: &Ticket) -> anyhow::Result<String> {
        self.record(format!("test_definitions:{}", ticket.key));
        Ok(self.test_text(&ticket.key))
    }

    async fn append_test_template(&self, ticket: &Ticket, template: &str) -> anyhow::Result<()> {
        self.record(format!("append_test_template:{}", ticket.key));
        self.test_text
            .lock()
            .unwrap()
            .entry(ticket.key.clone())
            .or_default()
            .push_str(template);
        Ok(())
    }

    async fn link_test(&self, test_key: &str, ticket: &Ticket) -> anyhow::Result<()> {
        self.record(format!("link_test:{}:{}", test_key, ticket.key));
        Ok(())
    }

    async fn find_test_plan(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.record(format!("find_test_plan:{}", name));
        Ok(self.test_plans.get(name).cloned())
    }

    fn browse_url(&self, ticket: &Ticket) -> String {
        ticket.url.clone()
    }

    fn board_url(&self, page: BoardPage) -> anyhow::Result<String> {
        Ok(format!("https://jira.test/board/{:?}", page))
    }
}

// ============================================================================
// Stub test repository
// ============================================================================

/// Hands out `EPM-5xx` keys and records calls like `create_test:Name:/Folder`.
/// With `gate` set, `create_folder` waits for a notification first.
#[derive(Default)]
pub struct StubTests {
    pub calls: Mutex<Vec<String>>,
    pub gate: Option<Arc<tokio::sync::Notify>>,
    next: Mutex<u32>,
}

impl StubTests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<tokio::sync::Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl TestRepository for StubTests {
    async fn create_folder(&self, path: &str) -> anyhow::Result<()> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.record(format!("create_folder:{}", path));
        Ok(())
    }

    async fn create_test(
        &self,
        definition: &TestDefinition,
        folder: &str,
    ) -> anyhow::Result<CreatedTest> {
        self.record(format!("create_test:{}:{}", definition.name, folder));
        let mut next = self.next.lock().unwrap();
        *next += 1;
        Ok(CreatedTest {
            issue_id: format!("{}", 10500 + *next),
            key: format!("EPM-{}", 500 + *next),
        })
    }

    async fn add_tests_to_plan(&self, plan_id: &str, test_ids: &[String]) -> anyhow::Result<()> {
        self.record(format!("add_tests_to_plan:{}:{}", plan_id, test_ids.join(",")));
        Ok(())
    }

    async fn create_test_plan(
        &self,
        name: &str,
        fix_versions: &[String],
        test_ids: &[String],
    ) -> anyhow::Result<String> {
        self.record(format!(
            "create_test_plan:{}:{}:{}",
            name,
            fix_versions.join(","),
            test_ids.join(",")
        ));
        Ok("EPM-600".to_string())
    }
}

// ============================================================================
// Recording table
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRow {
    pub cells: Vec<String>,
    pub ticket: Ticket,
    pub sub_rows: Vec<SubRow>,
}

/// A `TableUi` that replays scripted answers and records what was drawn.
///
/// Composite reads come from `inputs`; when the script runs out they return
/// `Interrupt`, which ends the read-eval loop and cancels any prompt.
#[derive(Debug, Default)]
pub struct RecordingTable {
    pub inputs: VecDeque<Input>,
    pub lines: VecDeque<String>,
    pub chars: VecDeque<char>,
    pub edited: Option<String>,

    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<RecordedRow>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub draws: usize,
    pub sub_rows_shown: bool,
}

impl RecordingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, inputs: impl IntoIterator<Item = Input>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn answer_lines(mut self, lines: &[&str]) -> Self {
        self.lines.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    pub fn answer_chars(mut self, chars: &str) -> Self {
        self.chars.extend(chars.chars());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.ticket.key.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        let index = self.header.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|r| r.cells[index].clone()).collect())
    }

    pub fn row_ticket(&self, index: usize) -> Ticket {
        self.rows[index].ticket.clone()
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

impl TableUi for RecordingTable {
    fn clear(&mut self) {
        self.header.clear();
        self.rows.clear();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn add_header(&mut self, columns: Vec<String>) {
        self.header = columns;
    }

    fn add_row(&mut self, cells: Vec<String>, ticket: Ticket, sub_rows: Vec<SubRow>) {
        self.rows.push(RecordedRow {
            cells,
            ticket,
            sub_rows,
        });
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        self.draws += 1;
        Ok(())
    }

    fn prompt(&mut self, message: &str) -> anyhow::Result<()> {
        self.messages.push(message.to_string());
        Ok(())
    }

    fn prompt_get_string(
        &mut self,
        _prompt: &str,
        _triggers: &[Trigger],
        _tick: Duration,
    ) -> anyhow::Result<Input> {
        Ok(self.inputs.pop_front().unwrap_or(Input::Interrupt))
    }

    fn prompt_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn prompt_get_character(&mut self, _prompt: &str) -> anyhow::Result<Option<char>> {
        Ok(self.chars.pop_front())
    }

    fn edit_text(&mut self, _initial: &str) -> anyhow::Result<Option<String>> {
        Ok(self.edited.clone())
    }

    fn get_row(&self, index: usize) -> Option<(Vec<String>, Ticket)> {
        self.rows
            .get(index)
            .map(|r| (r.cells.clone(), r.ticket.clone()))
    }

    fn toggle_sub_rows(&mut self) {
        self.sub_rows_shown = !self.sub_rows_shown;
    }

    fn error(&mut self, context: &str, error: &anyhow::Error) {
        self.errors.push(format!("{}: {:#}", context, error));
    }
}
