use super::{read_line, read_text, Outcome};
use crate::data::columns::format_points;
use crate::data::{Placement, SprintReport, Ticket, TicketDraft, ViewMode};
use crate::integrations::{open_url, BoardPage, TicketGateway};
use crate::tui::input::Input;
use crate::tui::keybindings::Trigger;
use crate::tui::table::TableUi;
use crate::tui::{App, TICK_RATE};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

const POINT_SCALE: [f64; 7] = [0.5, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0];
const VISIBLE_ATTEMPTS: usize = 10;
const VISIBLE_INTERVAL: Duration = Duration::from_millis(500);

pub(super) async fn assign<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Assign which row?")? else {
        return Ok(Outcome::Continue);
    };
    let mut users = app.gateway.user_short_names();
    users.push("(unassigned)".to_string());
    let Some(choice) = app
        .ui
        .prompt_choice(&format!("Assign {} to", ticket.key), &users)?
    else {
        return Ok(Outcome::Continue);
    };
    let user = (choice + 1 < users.len()).then(|| users[choice].as_str());

    let question = match user {
        Some(name) => format!("Assign {} to {}?", ticket.key, name),
        None => format!("Unassign {}?", ticket.key),
    };
    if !app.ui.confirm(&question)? {
        return Ok(Outcome::Continue);
    }
    app.gateway.assign(&ticket, user).await?;
    Ok(Outcome::Refresh)
}

/// Open a row's ticket, or with s/l/k one of the team's board pages.
pub(super) fn browse<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let triggers = [Trigger::Key('s'), Trigger::Key('l'), Trigger::Key('k')];
    let prompt = "Open which row? (s: sprint board, l: backlog board, k: kanban board)";
    let url = loop {
        match app.ui.prompt_get_string(prompt, &triggers, TICK_RATE)? {
            Input::Idle => continue,
            Input::Key('s') => break app.gateway.board_url(BoardPage::Sprint)?,
            Input::Key('l') => break app.gateway.board_url(BoardPage::Backlog)?,
            Input::Key('k') => break app.gateway.board_url(BoardPage::Kanban)?,
            Input::Line(line) if !line.trim().is_empty() => {
                let row = line.trim();
                let ticket = match row.parse::<usize>() {
                    Ok(n) if n >= 1 => app.ui.get_row(n - 1).map(|(_, t)| t),
                    _ => None,
                };
                match ticket {
                    Some(ticket) => break app.gateway.browse_url(&ticket),
                    None => anyhow::bail!("There is no row {}", row),
                }
            }
            _ => return Ok(Outcome::Continue),
        }
    };
    tracing::debug!("Opening {}", url);
    open_url(&url)?;
    Ok(Outcome::Continue)
}

pub(super) async fn create<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(summary) = read_line(&mut app.ui, "Summary")? else {
        return Ok(Outcome::Continue);
    };
    let Some(description) = read_text(
        &mut app.ui,
        "Description (F1: editor, F2: same as summary)",
        Some(&summary),
    )?
    else {
        return Ok(Outcome::Continue);
    };

    let placement = match (app.view.mode(), app.view.parent()) {
        (ViewMode::TaskView, Some(parent)) => Placement::SubTaskOf(parent.clone()),
        (ViewMode::Sprint, _) => Placement::Sprint,
        _ => Placement::Backlog,
    };
    let sub_task = matches!(placement, Placement::SubTaskOf(_));

    let types = app.gateway.issue_types(sub_task).await?;
    let issue_type = match types.len() {
        0 => anyhow::bail!("No issue types available"),
        1 => types[0].clone(),
        _ => match app.ui.prompt_choice("Issue type", &types)? {
            Some(choice) => types[choice].clone(),
            None => return Ok(Outcome::Continue),
        },
    };

    let draft = TicketDraft {
        summary,
        description,
        issue_type,
        placement,
    };
    app.ui.prompt("Creating ticket...")?;
    let created = app.gateway.create_ticket(&draft).await?;
    app.ui.prompt(&format!("Created {}", created.key))?;

    if !app.view.mode().takes_params() {
        wait_until_visible(app, &created.key).await;
    }
    Ok(Outcome::Refresh)
}

/// The tracker's search index lags behind creates; poll the current view
/// until `key` shows up or the attempts run out.
async fn wait_until_visible<U: TableUi>(app: &mut App<U>, key: &str) {
    for attempt in 1..=VISIBLE_ATTEMPTS {
        match app.view.fetch_current(app.gateway.as_ref()).await {
            Ok(tickets) if tickets.iter().any(|t| t.key == key) => return,
            Ok(_) => {
                tracing::debug!("{} not visible yet (attempt {})", key, attempt);
                tokio::time::sleep(VISIBLE_INTERVAL).await;
            }
            Err(e) => {
                tracing::warn!("Giving up waiting for {}: {:#}", key, e);
                return;
            }
        }
    }
}

pub(super) async fn delete<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Delete which row?")? else {
        return Ok(Outcome::Continue);
    };
    let question = format!(
        "Delete {} \"{}\" and its sub-tasks?",
        ticket.key, ticket.summary
    );
    if !app.ui.confirm(&question)? {
        return Ok(Outcome::Continue);
    }
    app.gateway.delete(&ticket).await?;
    Ok(Outcome::Refresh)
}

pub(super) async fn edit<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Comment on which row?")? else {
        return Ok(Outcome::Continue);
    };
    let Some(comment) = read_text(
        &mut app.ui,
        &format!("Comment for {} (F1: editor)", ticket.key),
        None,
    )?
    else {
        return Ok(Outcome::Continue);
    };
    app.gateway.add_comment(&ticket, &comment).await?;
    app.view.rebuild(&mut app.ui, None)?;
    app.ui.prompt(&format!("Commented on {}", ticket.key))?;
    Ok(Outcome::Continue)
}

pub(super) fn inspect<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Inspect which row?")? else {
        return Ok(Outcome::Continue);
    };
    app.ui.prompt(&details(&ticket).join("\n"))?;
    Ok(Outcome::Continue)
}

fn details(ticket: &Ticket) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", ticket.key, ticket.summary),
        format!(
            "{} | {} | {} | {} pts",
            ticket.issue_type,
            ticket.status,
            ticket.assignee.as_deref().unwrap_or("Unassigned"),
            ticket.story_points.map(format_points).unwrap_or_else(|| "-".into())
        ),
    ];
    if let Some(sprint) = &ticket.sprint {
        lines.push(format!("Sprint: {}", sprint));
    }
    if let Some(parent) = &ticket.parent_summary {
        lines.push(format!("Parent: {}", parent));
    }
    if let (Some(created), Some(updated)) = (ticket.created, ticket.updated) {
        lines.push(format!(
            "Created {} / updated {}",
            created.format("%Y-%m-%d"),
            updated.format("%Y-%m-%d %H:%M")
        ));
    }
    if let Some(description) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        lines.extend(description.lines().take(6).map(str::to_string));
    }
    lines
}

pub(super) async fn link<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Create a linked spike for which row?")? else {
        return Ok(Outcome::Continue);
    };
    app.ui.prompt(&format!("Creating spike for {}...", ticket.key))?;
    let spike = app.gateway.create_linked_spike(&ticket).await?;
    app.ui.prompt(&format!("Created {} linked to {}", spike.key, ticket.key))?;
    Ok(Outcome::Refresh)
}

pub(super) async fn move_ticket<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Move which row?")? else {
        return Ok(Outcome::Continue);
    };

    let mode = app.view.mode();
    let mut options = String::from("t: top, b: bottom, i: below another row");
    match mode {
        ViewMode::Sprint => options.push_str(", l: to backlog"),
        ViewMode::Backlog => options.push_str(", s: to sprint"),
        _ => {}
    }
    let Some(choice) = app
        .ui
        .prompt_get_character(&format!("Move {} ({})", ticket.key, options))?
    else {
        return Ok(Outcome::Continue);
    };

    // Top and bottom follow the tracker's rank, not a sorted or filtered table.
    match choice {
        't' => {
            let Some(top) = app.view.tickets().first().cloned() else {
                return Ok(Outcome::Continue);
            };
            if top.key != ticket.key {
                app.gateway.rank_above(&ticket, &top).await?;
            }
        }
        'b' => {
            let Some(bottom) = app.view.tickets().last().cloned() else {
                return Ok(Outcome::Continue);
            };
            if bottom.key != ticket.key {
                app.gateway.rank_below(&ticket, &bottom).await?;
            }
        }
        'i' => {
            let Some(anchor) = app.ui.prompt_row("Below which row?")? else {
                return Ok(Outcome::Continue);
            };
            if anchor.key != ticket.key {
                app.gateway.rank_below(&ticket, &anchor).await?;
            }
        }
        'l' if mode == ViewMode::Sprint => app.gateway.move_to_backlog(&ticket).await?,
        's' if mode == ViewMode::Backlog => app.gateway.move_to_sprint(&ticket).await?,
        _ => return Ok(Outcome::Continue),
    }
    Ok(Outcome::Refresh)
}

pub(super) async fn points<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Estimate which row?")? else {
        return Ok(Outcome::Continue);
    };
    let choices: Vec<String> = POINT_SCALE.iter().map(|p| format_points(*p)).collect();
    let Some(choice) = app
        .ui
        .prompt_choice(&format!("Story points for {}", ticket.key), &choices)?
    else {
        return Ok(Outcome::Continue);
    };
    let points = POINT_SCALE[choice];
    if !app
        .ui
        .confirm(&format!("Set {} to {} points?", ticket.key, choices[choice]))?
    {
        return Ok(Outcome::Continue);
    }
    app.gateway.set_story_points(&ticket, points).await?;
    Ok(Outcome::Refresh)
}

pub(super) async fn status<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Change the status of which row?")? else {
        return Ok(Outcome::Continue);
    };
    let statuses = app.gateway.statuses(&ticket).await?;
    if statuses.is_empty() {
        anyhow::bail!("{} has no available transitions", ticket.key);
    }
    let Some(choice) = app.ui.prompt_choice(
        &format!("Move {} from '{}' to", ticket.key, ticket.status),
        &statuses,
    )?
    else {
        return Ok(Outcome::Continue);
    };
    let target = &statuses[choice];
    if !app
        .ui
        .confirm(&format!("Move {} to '{}'?", ticket.key, target))?
    {
        return Ok(Outcome::Continue);
    }
    app.gateway.transition(&ticket, target).await?;
    Ok(Outcome::Refresh)
}

/// Start the sprint report worker; the loop shows the result when it lands.
pub(super) fn report<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let gateway = Arc::clone(&app.gateway);
    if app.report.start(sprint_report(gateway)) {
        app.ui.prompt("Building the sprint report in the background...")?;
    } else {
        app.ui.prompt("A sprint report is already running")?;
    }
    Ok(Outcome::Continue)
}

async fn sprint_report(gateway: Arc<dyn TicketGateway>) -> Result<SprintReport> {
    let tickets = gateway.fetch_sprint().await?;
    Ok(SprintReport::from_tickets(&tickets))
}
