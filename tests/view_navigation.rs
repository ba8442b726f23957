//! Tests for the view-mode state machine.
//!
//! Covers mode switches, drilling into sub-tasks and back, history capture,
//! parameter retention and the guarantee that a failed fetch changes nothing.

mod test_utils;

use pretty_assertions::assert_eq;
use test_utils::*;
use ticketdeck::data::columns::standard_columns;
use ticketdeck::data::ViewMode;
use ticketdeck::tui::view::TicketView;

fn setup() -> (TicketView, RecordingTable, StubGateway) {
    let gateway = StubGateway::new()
        .with_backlog(vec![ticket("EPM-1", "Login page"), ticket("EPM-2", "Logout")])
        .with_sprint(vec![
            with_subs(ticket("EPM-3", "Sprint work"), &[("EPM-4", "Write tests")]),
            ticket("EPM-5", "Docs"),
        ])
        .with_subtasks("EPM-3", vec![ticket("EPM-4", "Write tests")])
        .with_subtasks("EPM-4", vec![ticket("EPM-6", "Nested")])
        .with_board("Ops", vec![ticket("OPS-1", "Rotate keys")])
        .with_search(vec![ticket("EPM-1", "Login page")]);
    let view = TicketView::new(standard_columns()).unwrap();
    (view, RecordingTable::new(), gateway)
}

#[tokio::test]
async fn test_refresh_switches_mode_and_renders() {
    let (mut view, mut ui, gateway) = setup();

    let tickets = view
        .refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 2);

    assert_eq!(view.mode(), ViewMode::Sprint);
    assert_eq!(ui.keys(), vec!["EPM-3", "EPM-5"]);
    assert_eq!(ui.header, vec!["Key", "Summary", "Status", "Points"]);
    assert_eq!(ui.rows[0].sub_rows.len(), 1);
    assert_eq!(ui.rows[0].sub_rows[0].ticket.key, "EPM-4");
    assert_eq!(ui.title, "Sprint");
}

#[tokio::test]
async fn test_drill_down_and_back_restores_without_fetching() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();

    let parent = ui.row_ticket(0);
    view.refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, Some(parent))
        .await
        .unwrap();
    assert_eq!(view.mode(), ViewMode::TaskView);
    assert_eq!(view.parent().map(|p| p.key.as_str()), Some("EPM-3"));
    assert_eq!(ui.keys(), vec!["EPM-4"]);
    assert_eq!(ui.header, vec!["Key", "Summary", "Status", "Assignee"]);

    let fetches = gateway.calls().len();
    view.previous(&mut ui).unwrap();
    assert_eq!(gateway.calls().len(), fetches);
    assert_eq!(view.mode(), ViewMode::Sprint);
    assert!(view.parent().is_none());
    assert_eq!(ui.keys(), vec!["EPM-3", "EPM-5"]);
    assert_eq!(ui.header, vec!["Key", "Summary", "Status", "Points"]);
}

#[tokio::test]
async fn test_nested_task_view_returns_to_the_root_view() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();

    let parent = ui.row_ticket(0);
    view.refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, Some(parent))
        .await
        .unwrap();
    let child = ui.row_ticket(0);
    view.refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, Some(child))
        .await
        .unwrap();
    assert_eq!(ui.keys(), vec!["EPM-6"]);

    let snapshot = view.previous_snapshot().unwrap();
    assert_eq!(snapshot.mode, ViewMode::Sprint);

    view.previous(&mut ui).unwrap();
    assert_eq!(view.mode(), ViewMode::Sprint);
    assert_eq!(ui.keys(), vec!["EPM-3", "EPM-5"]);
}

#[tokio::test]
async fn test_previous_outside_task_view_is_a_no_op() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Backlog), None, None)
        .await
        .unwrap();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();

    let draws = ui.draws;
    view.previous(&mut ui).unwrap();
    assert_eq!(view.mode(), ViewMode::Sprint);
    assert_eq!(ui.draws, draws);
}

#[tokio::test]
async fn test_refresh_captures_history_except_from_task_view() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Backlog), None, None)
        .await
        .unwrap();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();
    assert_eq!(view.previous_snapshot().unwrap().mode, ViewMode::Backlog);

    let parent = ui.row_ticket(0);
    view.refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, Some(parent))
        .await
        .unwrap();
    assert_eq!(view.previous_snapshot().unwrap().mode, ViewMode::Sprint);

    // Refreshing the sub-task list keeps the way back intact.
    view.refresh(&mut ui, &gateway, None, None, None).await.unwrap();
    assert_eq!(view.previous_snapshot().unwrap().mode, ViewMode::Sprint);
    assert_eq!(gateway.count("fetch_subtasks:EPM-3"), 2);
}

#[tokio::test]
async fn test_failed_fetch_leaves_state_untouched() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();
    let snapshot_mode = view.previous_snapshot().map(|s| s.mode);
    let rows = ui.keys();

    gateway.set_failing(true);
    let result = view
        .refresh(&mut ui, &gateway, Some(ViewMode::Backlog), None, None)
        .await;
    assert!(result.is_err());

    assert_eq!(view.mode(), ViewMode::Sprint);
    assert_eq!(view.tickets().len(), 2);
    assert_eq!(view.previous_snapshot().map(|s| s.mode), snapshot_mode);
    assert_eq!(ui.keys(), rows);
}

#[tokio::test]
async fn test_missing_params_fail_before_fetching() {
    let (mut view, mut ui, gateway) = setup();

    let board = view
        .refresh(&mut ui, &gateway, Some(ViewMode::Board), None, None)
        .await;
    assert!(board.is_err());
    let sub_tasks = view
        .refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, None)
        .await;
    assert!(sub_tasks.is_err());

    assert!(gateway.calls().is_empty());
    assert_eq!(view.mode(), ViewMode::Backlog);
}

#[tokio::test]
async fn test_params_are_kept_while_the_mode_stays() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(
        &mut ui,
        &gateway,
        Some(ViewMode::Search),
        Some("login".to_string()),
        None,
    )
    .await
    .unwrap();
    view.refresh(&mut ui, &gateway, None, None, None).await.unwrap();

    assert_eq!(gateway.count("search:login"), 2);
    assert_eq!(view.params(), Some("login"));
    assert_eq!(ui.title, "Search: login");

    view.refresh(&mut ui, &gateway, Some(ViewMode::Board), Some("Ops".into()), None)
        .await
        .unwrap();
    assert_eq!(ui.keys(), vec!["OPS-1"]);
    view.refresh(&mut ui, &gateway, Some(ViewMode::Backlog), None, None)
        .await
        .unwrap();
    assert_eq!(view.params(), None);
}

#[tokio::test]
async fn test_filter_and_sort_persist_across_rebuilds_but_not_mode_changes() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Backlog), None, None)
        .await
        .unwrap();

    view.sort_by("Key");
    view.sort_by("Key");
    view.rebuild(&mut ui, None).unwrap();
    assert_eq!(ui.keys(), vec!["EPM-2", "EPM-1"]);

    view.set_filter(Some("logout".to_string()));
    view.rebuild(&mut ui, None).unwrap();
    assert_eq!(ui.keys(), vec!["EPM-2"]);

    view.refresh(&mut ui, &gateway, None, None, None).await.unwrap();
    assert_eq!(view.filter(), Some("logout"));
    assert_eq!(ui.keys(), vec!["EPM-2"]);

    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();
    assert_eq!(view.filter(), None);
    assert_eq!(view.sort(), None);
    assert_eq!(ui.keys(), vec!["EPM-3", "EPM-5"]);
}

#[tokio::test]
async fn test_rebuild_never_fetches_or_changes_mode() {
    let (mut view, mut ui, gateway) = setup();
    view.refresh(&mut ui, &gateway, Some(ViewMode::Sprint), None, None)
        .await
        .unwrap();
    let parent = ui.row_ticket(0);
    view.refresh(&mut ui, &gateway, Some(ViewMode::TaskView), None, Some(parent))
        .await
        .unwrap();
    let calls = gateway.calls();
    let draws = ui.draws;

    view.rebuild(&mut ui, None).unwrap();
    let mut columns = standard_columns();
    columns.retain(|name, _| name == "Created");
    view.rebuild(&mut ui, Some(columns)).unwrap();

    assert_eq!(gateway.calls(), calls);
    assert_eq!(view.mode(), ViewMode::TaskView);
    assert_eq!(view.parent().map(|p| p.key.as_str()), Some("EPM-3"));
    assert_eq!(ui.draws, draws + 2);
    assert_eq!(ui.header, vec!["Key", "Summary", "Status", "Assignee", "Created"]);
    assert_eq!(ui.keys(), vec!["EPM-4"]);
}
