use super::Outcome;
use crate::data::testdefs::TEMPLATE;
use crate::data::{PlanUpdate, TestDefinitions, TestRun, Ticket};
use crate::integrations::xray::TestRepository;
use crate::integrations::TicketGateway;
use crate::tui::table::TableUi;
use crate::tui::App;
use anyhow::{Context, Result};
use std::sync::Arc;

const ALREADY_RUNNING: &str = "Test generation is already running";

/// Read a row's test definitions and create them in the test repository in
/// the background. Tickets without usable definitions are offered a template.
pub(super) async fn generate<U: TableUi>(app: &mut App<U>) -> Result<Outcome> {
    let Some(repo) = app.tests.clone() else {
        anyhow::bail!("Test generation needs [xray] client_id and client_secret in the config");
    };
    if app.test_run.is_running() {
        app.ui.prompt(ALREADY_RUNNING)?;
        return Ok(Outcome::Continue);
    }

    let Some(ticket) = app.ui.prompt_row("Generate tests for which row?")? else {
        return Ok(Outcome::Continue);
    };
    app.ui.prompt("Parsing test definitions...")?;
    let definitions = TestDefinitions::parse(&app.gateway.test_definitions(&ticket).await?);

    if !definitions.is_valid() {
        let question = format!(
            "{} does not have valid tests. Add a test template?",
            ticket.key
        );
        if app.ui.confirm(&question)? {
            app.gateway.append_test_template(&ticket, TEMPLATE).await?;
            app.ui
                .prompt(&format!("Added a test template to {}", ticket.key))?;
        }
        return Ok(Outcome::Continue);
    }

    let question = format!(
        "Create {} tests for {} in folder \"{}\"?",
        definitions.len(),
        ticket.key,
        definitions.folder.as_deref().unwrap_or_default()
    );
    if !app.ui.confirm(&question)? {
        return Ok(Outcome::Continue);
    }

    let plan = match definitions.test_plan.clone() {
        Some(name) if app.ui.confirm(&format!("Add them to test plan {}?", name))? => Some(name),
        _ => None,
    };

    let count = definitions.len();
    let key = ticket.key.clone();
    let gateway = Arc::clone(&app.gateway);
    if app
        .test_run
        .start(create_tests(gateway, repo, ticket, definitions, plan))
    {
        app.ui.prompt(&format!(
            "Creating {} tests for {} in the background...",
            count, key
        ))?;
    } else {
        app.ui.prompt(ALREADY_RUNNING)?;
    }
    Ok(Outcome::Continue)
}

async fn create_tests(
    gateway: Arc<dyn TicketGateway>,
    repo: Arc<dyn TestRepository>,
    ticket: Ticket,
    definitions: TestDefinitions,
    plan: Option<String>,
) -> Result<TestRun> {
    let folder = definitions
        .folder
        .clone()
        .context("Test definitions name no folder")?;
    repo.create_folder(&folder).await?;

    let mut created = Vec::with_capacity(definitions.len());
    for definition in &definitions.tests {
        let test = repo.create_test(definition, &folder).await?;
        gateway.link_test(&test.key, &ticket).await?;
        created.push(test);
    }

    let plan = match plan {
        Some(name) => {
            let ids: Vec<String> = created.iter().map(|t| t.issue_id.clone()).collect();
            Some(match gateway.find_test_plan(&name).await? {
                Some(plan_id) => {
                    repo.add_tests_to_plan(&plan_id, &ids).await?;
                    PlanUpdate::Added(name)
                }
                None => PlanUpdate::Created(
                    repo.create_test_plan(&name, &definitions.fix_versions, &ids)
                        .await?,
                ),
            })
        }
        None => None,
    };

    Ok(TestRun {
        ticket: ticket.key,
        folder,
        tests: created.into_iter().map(|t| t.key).collect(),
        plan,
    })
}
