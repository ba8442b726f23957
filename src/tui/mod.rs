mod commands;
pub mod input;
pub mod keybindings;
pub mod search;
pub mod table;
pub mod task;
mod terminal;
pub mod view;

use crate::config::Config;
use crate::data::{SprintReport, TestRun, ViewMode};
use crate::integrations::git::GitRepo;
use crate::integrations::github::GithubClient;
use crate::integrations::jira::JiraClient;
use crate::integrations::xray::{TestRepository, XrayClient};
use crate::integrations::TicketGateway;
use anyhow::Result;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use commands::Outcome;
use input::{classify, ColumnKeys, Input, LoopAction};
use keybindings::{prompt_help, CommandTable};
use table::TableUi;
use task::TaskHandle;
pub use terminal::TerminalTable;
use view::TicketView;

/// How long one read waits before the loop gets a chance to poll workers.
pub const TICK_RATE: Duration = Duration::from_millis(250);

/// Where the session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Startup {
    pub mode: ViewMode,
    pub params: Option<String>,
}

/// Everything an action can reach: the table, the view state, the gateway
/// and the optional developer integrations.
pub struct App<U: TableUi> {
    ui: U,
    view: TicketView,
    gateway: Arc<dyn TicketGateway>,
    git: Option<GitRepo>,
    github: Option<GithubClient>,
    support_dir: PathBuf,
    commands: CommandTable,
    columns: ColumnKeys,
    report: TaskHandle<SprintReport>,
    tests: Option<Arc<dyn TestRepository>>,
    test_run: TaskHandle<TestRun>,
}

impl<U: TableUi> App<U> {
    /// Fails when the command table is malformed or the gateway lacks a
    /// column some mode needs.
    pub fn new(ui: U, gateway: Arc<dyn TicketGateway>) -> Result<Self> {
        let commands = CommandTable::standard()?;
        let fields = gateway.optional_fields();
        let columns = ColumnKeys::new(&fields);
        let view = TicketView::new(fields)?;
        Ok(Self {
            ui,
            view,
            gateway,
            git: None,
            github: None,
            support_dir: PathBuf::from("."),
            commands,
            columns,
            report: TaskHandle::new(),
            tests: None,
            test_run: TaskHandle::new(),
        })
    }

    pub fn with_git(mut self, git: Option<GitRepo>, support_dir: PathBuf) -> Self {
        self.git = git;
        self.support_dir = support_dir;
        self
    }

    pub fn with_github(mut self, github: Option<GithubClient>) -> Self {
        self.github = github;
        self
    }

    pub fn with_tests(mut self, tests: Option<Arc<dyn TestRepository>>) -> Self {
        self.tests = tests;
        self
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn view(&self) -> &TicketView {
        &self.view
    }

    /// First fetch of the session.
    pub async fn open(&mut self, startup: Startup) -> Result<()> {
        self.view
            .refresh(
                &mut self.ui,
                self.gateway.as_ref(),
                Some(startup.mode),
                startup.params,
                None,
            )
            .await?;
        Ok(())
    }

    /// Act on one input. Returns `true` when the session should end.
    pub async fn handle(&mut self, input: &Input) -> Result<bool> {
        match classify(input, &self.columns, &self.commands) {
            LoopAction::ToggleColumn(name) => {
                self.view.toggle_column(&name)?;
                self.view.rebuild(&mut self.ui, None)?;
            }
            LoopAction::Run(command) => match commands::execute(self, command).await? {
                Outcome::Exit => return Ok(true),
                Outcome::Refresh => {
                    self.view
                        .refresh(&mut self.ui, self.gateway.as_ref(), None, None, None)
                        .await?;
                }
                Outcome::Continue => {}
            },
            LoopAction::DrillDown(row) => {
                let Some((_, ticket)) = self.ui.get_row(row - 1) else {
                    anyhow::bail!("There is no row {}", row);
                };
                self.view
                    .refresh(
                        &mut self.ui,
                        self.gateway.as_ref(),
                        Some(ViewMode::TaskView),
                        None,
                        Some(ticket),
                    )
                    .await?;
            }
            LoopAction::Back => self.view.previous(&mut self.ui)?,
            LoopAction::Ignore => {}
        }
        Ok(false)
    }

    /// Surface finished background work.
    pub fn poll_background(&mut self) -> Result<()> {
        match self.report.take_finished() {
            Some(Ok(report)) => self.ui.prompt(&report.summary_lines().join("\n"))?,
            Some(Err(message)) => self
                .ui
                .error("Sprint report failed", &anyhow::anyhow!(message)),
            None => {}
        }
        match self.test_run.take_finished() {
            Some(Ok(run)) => self.ui.prompt(&run.summary_lines().join("\n"))?,
            Some(Err(message)) => self
                .ui
                .error("Test generation failed", &anyhow::anyhow!(message)),
            None => {}
        }
        Ok(())
    }

    /// Key hints shown above the input line.
    pub fn prompt_text(&mut self) -> String {
        let mut lines = prompt_help(&self.commands, self.ui.width());
        let mut hint = "Row number for sub-tasks, Enter to go back".to_string();
        if self.report.is_running() {
            hint.push_str(" (sprint report running)");
        }
        if self.test_run.is_running() {
            hint.push_str(" (creating tests)");
        }
        lines.push(hint);
        lines.join("\n")
    }

    /// Read-eval loop. A failing action is reported and the loop goes on;
    /// only a broken terminal ends it early.
    pub async fn run_loop(&mut self) -> Result<()> {
        let triggers = self.commands.triggers();
        loop {
            self.poll_background()?;
            let prompt = self.prompt_text();
            let input = self.ui.prompt_get_string(&prompt, &triggers, TICK_RATE)?;
            if input == Input::Idle {
                continue;
            }

            match self.handle(&input).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Action failed: {:#}", e);
                    self.ui.error("Error", &e);
                }
            }
        }
    }
}

pub async fn run(config: Config, startup: Startup) -> Result<()> {
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("ticketdeck requires an interactive terminal");
    }

    let gateway: Arc<dyn TicketGateway> = Arc::new(JiraClient::new(&config)?);
    let git = std::env::current_dir()
        .ok()
        .and_then(|dir| GitRepo::discover(dir, &config.git));
    let github = config.github.clone().map(GithubClient::new);
    let tests = match config.xray.clone() {
        Some(xray) if xray.is_complete() => {
            Some(Arc::new(XrayClient::new(xray)) as Arc<dyn TestRepository>)
        }
        Some(_) => {
            tracing::warn!("Xray client_id or client_secret is empty; test generation is off");
            None
        }
        None => None,
    };

    let ui = TerminalTable::enter()?;
    let mut app = App::new(ui, gateway)?
        .with_git(git, config.git.support_dir())
        .with_github(github)
        .with_tests(tests);

    tracing::info!("Starting in {:?}", startup.mode);
    if let Err(e) = app.open(startup).await {
        app.ui.error("Initial load failed", &e);
    }

    let result = app.run_loop().await;
    app.ui.restore()?;
    result
}
