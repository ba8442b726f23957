use super::{read_line, Outcome};
use crate::data::{Ticket, ViewMode};
use crate::tui::keybindings::help_lines;
use crate::tui::table::TableUi;
use crate::tui::App;
use anyhow::Result;

pub(super) async fn switch<U: TableUi>(app: &mut App<U>, mode: ViewMode) -> Result<Outcome> {
    app.view
        .refresh(&mut app.ui, app.gateway.as_ref(), Some(mode), None, None)
        .await?;
    Ok(Outcome::Continue)
}

pub(super) async fn boards<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let boards = app.gateway.boards();
    if boards.is_empty() {
        anyhow::bail!("No boards are configured");
    }
    let Some(choice) = app.ui.prompt_choice("Select a board", &boards)? else {
        return Ok(Outcome::Continue);
    };
    let board = boards[choice].clone();
    app.view
        .refresh(&mut app.ui, app.gateway.as_ref(), Some(ViewMode::Board), Some(board), None)
        .await?;
    Ok(Outcome::Continue)
}

pub(super) async fn search<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(text) = read_line(&mut app.ui, "Search for (key, number or summary)")? else {
        return Ok(Outcome::Continue);
    };
    app.view
        .refresh(&mut app.ui, app.gateway.as_ref(), Some(ViewMode::Search), Some(text), None)
        .await?;
    Ok(Outcome::Continue)
}

pub(super) fn filter<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let current = app.view.filter().unwrap_or_default().to_string();
    let prompt = if current.is_empty() {
        "Filter rows (empty clears)".to_string()
    } else {
        format!("Filter rows (empty clears, now '{}')", current)
    };
    let Some(text) = app.ui.prompt_line(&prompt)? else {
        return Ok(Outcome::Continue);
    };
    app.view.set_filter(Some(text));
    app.view.rebuild(&mut app.ui, None)?;
    Ok(Outcome::Continue)
}

pub(super) fn sort<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let mut choices = app.view.header();
    choices.push("Rank order".to_string());
    let Some(choice) = app.ui.prompt_choice("Sort by (again to reverse)", &choices)? else {
        return Ok(Outcome::Continue);
    };
    if choice == choices.len() - 1 {
        app.view.clear_sort();
    } else {
        app.view.sort_by(&choices[choice]);
    }
    app.view.rebuild(&mut app.ui, None)?;
    Ok(Outcome::Continue)
}

pub(super) fn toggle_sub_rows<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    app.ui.toggle_sub_rows();
    app.ui.draw()?;
    Ok(Outcome::Continue)
}

pub(super) fn team<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let teams = app.gateway.teams();
    let current = app.gateway.current_team();
    let Some(choice) = app
        .ui
        .prompt_choice(&format!("Select a team (current: {})", current), &teams)?
    else {
        return Ok(Outcome::Continue);
    };
    app.gateway.set_team(&teams[choice])?;
    tracing::info!("Switched team to {}", teams[choice]);
    Ok(Outcome::Refresh)
}

/// The bindings table replaces the rows until a key is pressed.
pub(super) fn help<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    app.ui.clear();
    app.ui.set_title("Help");
    app.ui.add_header(vec!["Key bindings".to_string()]);
    for line in help_lines(&app.commands, &app.columns) {
        app.ui.add_row(vec![line], Ticket::default(), Vec::new());
    }
    app.ui.draw()?;

    app.ui.prompt_get_character("Press any key to return")?;
    app.view.rebuild(&mut app.ui, None)?;
    Ok(Outcome::Continue)
}
