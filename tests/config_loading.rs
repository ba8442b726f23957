//! Tests for configuration loading and validation.

use pretty_assertions::assert_eq;
use std::io::Write;
use ticketdeck::config;

const MINIMAL: &str = r#"
[jira]
url = "https://example.atlassian.net"
username = "jo@example.com"
token = "secret"
default_team = "core"

[jira.teams.core]
team_id = "42"
project = "EPM"
product = "Desktop"
backlog_board_id = 7

[jira.teams.core.users]
jo = "abc123"
kd = "def456"

[jira.boards.Ops]
query = "project = OPS"

[jira.boards.Bugs]
query = "issuetype = Bug"

[git]
initials = "jo"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_applies_defaults_and_keeps_order() {
    let file = write_config(MINIMAL);
    let config = config::load(Some(file.path())).unwrap();

    assert_eq!(config.jira.story_points_field, "customfield_10028");
    assert_eq!(config.jira.sprint_field, "customfield_10020");
    assert_eq!(config.jira.escalation_project, "HELP");
    assert!(config.github.is_none());

    let boards: Vec<&str> = config.jira.boards.keys().map(String::as_str).collect();
    assert_eq!(boards, vec!["Ops", "Bugs"]);

    let team = config.team("core").unwrap();
    assert_eq!(team.backlog_board_id, Some(7));
    assert_eq!(team.kanban_board_id, None);
    let users: Vec<&str> = team.users.keys().map(String::as_str).collect();
    assert_eq!(users, vec!["jo", "kd"]);
}

#[test]
fn test_missing_file_points_at_init() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(format!("{:#}", err).contains("--init"));
}

#[test]
fn test_unknown_default_team_is_rejected() {
    let file = write_config(&MINIMAL.replace("default_team = \"core\"", "default_team = \"web\""));
    let err = config::load(Some(file.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("default_team"));
}

#[test]
fn test_github_base_branch_defaults_to_main() {
    let content = format!(
        "{}\n[github]\ntoken = \"t\"\nowner = \"acme\"\nrepo = \"app\"\n",
        MINIMAL
    );
    let file = write_config(&content);
    let config = config::load(Some(file.path())).unwrap();
    assert_eq!(config.github.unwrap().base_branch, "main");
}

#[test]
fn test_support_dir_override() {
    let content = MINIMAL.replace("initials = \"jo\"", "initials = \"jo\"\nsupport_dir = \"/tmp/cases\"");
    let file = write_config(&content);
    let config = config::load(Some(file.path())).unwrap();
    assert_eq!(config.git.support_dir(), std::path::PathBuf::from("/tmp/cases"));
}

#[test]
fn test_xray_section_is_optional() {
    let file = write_config(MINIMAL);
    let config = config::load(Some(file.path())).unwrap();
    assert!(config.xray.is_none());
    assert_eq!(config.jira.test_field, "customfield_10200");

    let content = format!(
        "{}\n[xray]\nclient_id = \"id\"\nclient_secret = \"\"\nproject_id = \"10000\"\n",
        MINIMAL
    );
    let file = write_config(&content);
    let xray = config::load(Some(file.path())).unwrap().xray.unwrap();
    assert_eq!(xray.project_id, "10000");
    assert!(!xray.is_complete());
}
