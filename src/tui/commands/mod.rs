//! Actions behind the command table.
//!
//! Every action reads what it needs through the table's prompts, calls the
//! gateway inline and reports what the loop should do next. Cancelling any
//! prompt aborts the action quietly with [`Outcome::Continue`].

mod developer;
mod testgen;
mod tickets;
mod views;

use crate::data::ViewMode;
use crate::tui::input::Input;
use crate::tui::keybindings::Command;
use crate::tui::table::TableUi;
use crate::tui::{App, TICK_RATE};
use anyhow::Result;

/// What the loop does after an action returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// Re-fetch and re-render the current view.
    Refresh,
    Exit,
}

pub async fn execute<U: TableUi>(app: &mut App<U>, command: Command) -> Result<Outcome> {
    tracing::debug!("Running {:?}", command);
    match command {
        Command::Help => views::help(app),
        Command::Backlog => views::switch(app, ViewMode::Backlog).await,
        Command::Sprint => views::switch(app, ViewMode::Sprint).await,
        Command::WindowsShared => views::switch(app, ViewMode::WindowsShared).await,
        Command::Escalations => views::switch(app, ViewMode::Escalations).await,
        Command::Boards => views::boards(app).await,
        Command::Search => views::search(app).await,
        Command::Filter => views::filter(app),
        Command::Sort => views::sort(app),
        Command::ToggleSubRows => views::toggle_sub_rows(app),
        Command::Team => views::team(app),
        Command::Refresh => Ok(Outcome::Refresh),
        Command::Quit => Ok(Outcome::Exit),

        Command::Assign => tickets::assign(app).await,
        Command::Browse => tickets::browse(app),
        Command::Create => tickets::create(app).await,
        Command::Delete => tickets::delete(app).await,
        Command::Edit => tickets::edit(app).await,
        Command::Inspect => tickets::inspect(app),
        Command::Link => tickets::link(app).await,
        Command::Move => tickets::move_ticket(app).await,
        Command::Points => tickets::points(app).await,
        Command::Status => tickets::status(app).await,
        Command::Report => tickets::report(app),
        Command::GenerateTests => testgen::generate(app).await,

        Command::Branch => developer::branch(app),
        Command::PullRequest => developer::pull_request(app).await,
        Command::Support => developer::support(app).await,
    }
}

/// Free text where F1 opens the editor and, if `fallback` is given, F2
/// accepts it unchanged. Blank answers count as cancelled.
pub(crate) fn read_text(
    ui: &mut dyn TableUi,
    prompt: &str,
    fallback: Option<&str>,
) -> Result<Option<String>> {
    loop {
        let text = match ui.prompt_get_string(prompt, &[], TICK_RATE)? {
            Input::Idle => continue,
            Input::Line(line) => Some(line),
            Input::Cancelled | Input::Interrupt => None,
            Input::FunctionKey(1) => ui.edit_text("")?,
            Input::FunctionKey(2) if fallback.is_some() => fallback.map(str::to_string),
            Input::FunctionKey(_) | Input::Key(_) => continue,
        };
        return Ok(text.filter(|t| !t.trim().is_empty()));
    }
}

/// `prompt_line` with the answer trimmed and blanks treated as cancelled.
pub(crate) fn read_line(ui: &mut dyn TableUi, prompt: &str) -> Result<Option<String>> {
    Ok(ui
        .prompt_line(prompt)?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty()))
}
