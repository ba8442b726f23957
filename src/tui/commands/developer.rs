use super::{read_line, read_text, Outcome};
use crate::data::Ticket;
use crate::integrations::git::create_support_folder;
use crate::integrations::github::{pr_body, pr_title, PR_KINDS};
use crate::integrations::{open_path, open_url};
use crate::tui::table::TableUi;
use crate::tui::App;
use anyhow::Result;

const DEFAULT_BASE: &str = "main";

pub(super) fn branch<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(git) = app.git.as_ref() else {
        anyhow::bail!("Not inside a git repository");
    };
    let Some(ticket) = app.ui.prompt_row("Create a branch for which row?")? else {
        return Ok(Outcome::Continue);
    };
    let Some(summary) = app
        .ui
        .prompt_line("Branch summary (empty uses the ticket summary)")?
    else {
        return Ok(Outcome::Continue);
    };

    let named = Ticket {
        summary: if summary.trim().is_empty() {
            ticket.summary.clone()
        } else {
            summary.trim().to_string()
        },
        ..ticket
    };
    let base = app
        .github
        .as_ref()
        .map(|gh| gh.base_branch())
        .unwrap_or(DEFAULT_BASE);

    app.ui.prompt(&format!("Creating a branch off {}...", base))?;
    let name = git.create_branch_for(&named, base)?;
    app.ui.prompt(&format!("Switched to {}", name))?;
    Ok(Outcome::Continue)
}

pub(super) async fn pull_request<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(github) = app.github.as_ref() else {
        anyhow::bail!("GitHub is not configured");
    };
    let Some(git) = app.git.as_ref() else {
        anyhow::bail!("Not inside a git repository");
    };
    let Some(ticket) = app.ui.prompt_row("Open a pull request for which row?")? else {
        return Ok(Outcome::Continue);
    };

    let kinds: Vec<String> = PR_KINDS.iter().map(|k| k.to_string()).collect();
    let Some(kind) = app.ui.prompt_choice("Kind of change", &kinds)? else {
        return Ok(Outcome::Continue);
    };
    let summary = read_line(&mut app.ui, "Title (empty uses the ticket summary)")?
        .unwrap_or_else(|| ticket.summary.clone());
    let Some(problem) = read_text(
        &mut app.ui,
        "Problem (F1: editor, F2: ticket summary)",
        Some(&ticket.summary),
    )?
    else {
        return Ok(Outcome::Continue);
    };
    let description = ticket.description.clone().unwrap_or_default();
    let fallback = (!description.trim().is_empty()).then_some(description.as_str());
    let Some(solution) = read_text(
        &mut app.ui,
        "Solution (F1: editor, F2: ticket description)",
        fallback,
    )?
    else {
        return Ok(Outcome::Continue);
    };

    let title = pr_title(&kinds[kind], &summary, &ticket.key);
    let body = pr_body(&problem, &solution, &ticket.key);
    let head = git.current_branch()?;
    let question = format!(
        "Open \"{}\" from {} into {}?",
        title,
        head,
        github.base_branch()
    );
    if !app.ui.confirm(&question)? {
        return Ok(Outcome::Continue);
    }

    let pull = github.create_pull(&title, &body, &head).await?;
    app.ui
        .prompt(&format!("Opened PR #{}: {}", pull.number, pull.html_url))?;
    if let Err(e) = open_url(&pull.html_url) {
        tracing::warn!("Could not open {}: {:#}", pull.html_url, e);
    }
    Ok(Outcome::Refresh)
}

/// Create (or reuse) the local support folder for a ticket and open it.
pub(super) async fn support<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(ticket) = app.ui.prompt_row("Open a support folder for which row?")? else {
        return Ok(Outcome::Continue);
    };
    let url = app.gateway.browse_url(&ticket);
    let folder = create_support_folder(&app.support_dir, &ticket, &url)?;

    let question = if folder.created {
        format!("Created {}. Download attachments?", folder.path.display())
    } else {
        format!("{} exists. Update attachments?", folder.path.display())
    };
    if app.ui.confirm(&question)? {
        app.ui.prompt("Downloading attachments...")?;
        let count = app
            .gateway
            .download_attachments(&ticket, &folder.attachments())
            .await?;
        app.ui
            .prompt(&format!("Downloaded {} attachments for {}", count, ticket.key))?;
    }

    open_path(&folder.path)?;
    Ok(Outcome::Continue)
}
