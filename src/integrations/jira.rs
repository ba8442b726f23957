//! Jira Cloud gateway over the REST v2 and Agile v1 APIs.

use crate::config::{Config, JiraConfig, TeamConfig};
use crate::data::{Placement, SubTicket, Ticket, TicketDraft};
use crate::integrations::{BoardPage, TicketGateway, HTTP_CLIENT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 20;
const ACTIVE_SPRINT_TTL: Duration = Duration::from_secs(300);
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Issue types never offered when creating tickets.
const IGNORED_ISSUE_TYPES: &[&str] = &[
    "Test",
    "Test Set",
    "Test Plan",
    "Test Execution",
    "Precondition",
    "Sub Test Execution",
];

static TICKET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*-\d+$").expect("valid ticket key regex"));

// ============================================================================
// JQL
// ============================================================================

const NOT_SUB_TASK: &str = "issuetype not in subTaskIssueTypes()";
const NOT_DONE: &str = "statusCategory != Done";
const NOT_IN_OPEN_SPRINT: &str = "(sprint is EMPTY OR sprint not in openSprints())";
const BY_RANK: &str = "ORDER BY Rank ASC";

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn product_clause(team: &TeamConfig) -> String {
    if team.product.is_empty() {
        String::new()
    } else {
        format!(" AND \"Product[Dropdown]\" in ({})", quote(&team.product))
    }
}

pub fn backlog_jql(team: &TeamConfig) -> String {
    format!(
        "project = {} AND \"Team[Team]\" = {} AND {} AND {} AND {} {}",
        team.project, team.team_id, NOT_SUB_TASK, NOT_DONE, NOT_IN_OPEN_SPRINT, BY_RANK
    )
}

pub fn sprint_jql(team: &TeamConfig) -> String {
    format!(
        "project = {} AND \"Team[Team]\" = {} AND {} AND sprint in openSprints() {}",
        team.project, team.team_id, NOT_SUB_TASK, BY_RANK
    )
}

/// Backlog tickets no team has picked up yet.
pub fn windows_shared_jql(team: &TeamConfig) -> String {
    format!(
        "project = {} AND \"Team[Team]\" is EMPTY AND {} AND {} AND {} {}",
        team.project, NOT_SUB_TASK, NOT_DONE, NOT_IN_OPEN_SPRINT, BY_RANK
    )
}

pub fn escalations_jql(team: &TeamConfig, escalation_project: &str) -> String {
    format!(
        "project = {}{} AND {} {}",
        escalation_project,
        product_clause(team),
        NOT_DONE,
        BY_RANK
    )
}

/// A full key fetches that ticket, a bare number is a key in the team's
/// project, anything else is a summary prefix match.
pub fn search_jql(team: &TeamConfig, escalation_project: &str, text: &str) -> String {
    let text = text.trim();
    if TICKET_KEY.is_match(text) {
        return format!("key = {}", text.to_uppercase());
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return format!("key = {}-{}", team.project, text);
    }
    format!(
        "project in ({}, {}){} AND summary ~ {} AND {} {}",
        team.project,
        escalation_project,
        product_clause(team),
        quote(&format!("{}*", text)),
        NOT_SUB_TASK,
        BY_RANK
    )
}

pub fn test_plan_jql(team: &TeamConfig, name: &str) -> String {
    format!(
        "project = {} AND issuetype = \"Test Plan\" AND summary ~ {} {}",
        team.project,
        quote(name),
        BY_RANK
    )
}

pub fn subtasks_jql(parent_key: &str) -> String {
    format!(
        "parent = {} AND issuetype in subTaskIssueTypes() {}",
        parent_key, BY_RANK
    )
}

// ============================================================================
// Response parsing
// ============================================================================

/// Custom field ids that vary per Jira site.
#[derive(Debug, Clone)]
pub struct FieldIds {
    pub story_points: String,
    pub sprint: String,
}

impl From<&JiraConfig> for FieldIds {
    fn from(config: &JiraConfig) -> Self {
        Self {
            story_points: config.story_points_field.clone(),
            sprint: config.sprint_field.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    id: String,
    key: String,
    fields: RawFields,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    name: String,
    status_category: Option<RawStatusCategory>,
}

#[derive(Debug, Deserialize)]
struct RawStatusCategory {
    key: String,
}

impl RawStatus {
    fn is_done(&self) -> bool {
        self.status_category
            .as_ref()
            .is_some_and(|c| c.key == "done")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(default)]
    summary: String,
    status: Option<RawStatus>,
    assignee: Option<RawUser>,
    issuetype: Option<Named>,
    description: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    #[serde(default)]
    subtasks: Vec<RawSubtask>,
    parent: Option<RawParent>,
    #[serde(flatten)]
    custom: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawSubtask {
    key: String,
    fields: RawSubtaskFields,
}

#[derive(Debug, Deserialize)]
struct RawSubtaskFields {
    #[serde(default)]
    summary: String,
    status: Option<RawStatus>,
}

#[derive(Debug, Deserialize)]
struct RawParent {
    fields: RawParentFields,
}

#[derive(Debug, Deserialize)]
struct RawParentFields {
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    filename: String,
    content: String,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub tickets: Vec<Ticket>,
    pub next_page_token: Option<String>,
}

pub fn parse_search_page(body: Value, ids: &FieldIds, base_url: &str) -> Result<SearchPage> {
    let response: SearchResponse =
        serde_json::from_value(body).context("Failed to parse Jira search response")?;

    let next_page_token = match response.is_last {
        Some(true) => None,
        _ => response.next_page_token,
    };

    let tickets = response
        .issues
        .into_iter()
        .map(|raw| into_ticket(raw, ids, base_url))
        .collect();

    Ok(SearchPage {
        tickets,
        next_page_token,
    })
}

fn into_ticket(raw: RawIssue, ids: &FieldIds, base_url: &str) -> Ticket {
    let fields = raw.fields;
    let story_points = fields.custom.get(&ids.story_points).and_then(Value::as_f64);
    let sprint = fields.custom.get(&ids.sprint).and_then(sprint_name);

    Ticket {
        id: raw.id,
        url: format!("{}/browse/{}", base_url.trim_end_matches('/'), raw.key),
        key: raw.key,
        summary: fields.summary,
        done: fields.status.as_ref().is_some_and(RawStatus::is_done),
        status: fields.status.map(|s| s.name).unwrap_or_default(),
        assignee: fields.assignee.map(|a| a.display_name),
        issue_type: fields.issuetype.map(|t| t.name).unwrap_or_default(),
        description: fields.description,
        created: fields.created.as_deref().and_then(parse_timestamp),
        updated: fields.updated.as_deref().and_then(parse_timestamp),
        story_points,
        sprint,
        parent_summary: fields.parent.map(|p| p.fields.summary),
        sub_tickets: fields
            .subtasks
            .into_iter()
            .map(|s| SubTicket {
                key: s.key,
                summary: s.fields.summary,
                done: s.fields.status.as_ref().is_some_and(RawStatus::is_done),
                status: s.fields.status.map(|st| st.name).unwrap_or_default(),
            })
            .collect(),
    }
}

/// The active sprint if the ticket is in one, otherwise the most recent.
fn sprint_name(value: &Value) -> Option<String> {
    let sprints = value.as_array()?;
    let active = sprints
        .iter()
        .find(|s| s["state"].as_str() == Some("active"));
    active
        .or_else(|| sprints.last())
        .and_then(|s| s["name"].as_str())
        .map(String::from)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("Unparseable Jira timestamp {}: {}", raw, e))
        .ok()
}

// ============================================================================
// Client
// ============================================================================

pub struct JiraClient {
    config: JiraConfig,
    team: RwLock<String>,
    active_sprint: Mutex<Option<(u64, Instant)>>,
}

impl JiraClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.team(&config.jira.default_team)?;
        Ok(Self {
            config: config.jira.clone(),
            team: RwLock::new(config.jira.default_team.clone()),
            active_sprint: Mutex::new(None),
        })
    }

    fn team_config(&self) -> Result<TeamConfig> {
        let name = self.current_team();
        self.config
            .teams
            .get(&name)
            .cloned()
            .with_context(|| format!("Team '{}' is not configured", name))
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url(), path)
    }

    fn agile(&self, path: &str) -> String {
        format!("{}/rest/agile/1.0/{}", self.base_url(), path)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        HTTP_CLIENT
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.token))
            .header("Accept", "application/json")
            .header("User-Agent", "ticketdeck")
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Jira {} request failed", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            anyhow::bail!("Jira {} failed ({}): {}", what, status, body);
        }
        Ok(response)
    }

    async fn send_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        self.send(request, what)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to decode Jira {} response", what))
    }

    async fn query(&self, jql: &str) -> Result<Vec<Ticket>> {
        tracing::debug!("JQL: {}", jql);
        let ids = FieldIds::from(&self.config);
        let fields = [
            "summary",
            "status",
            "assignee",
            "issuetype",
            "description",
            "created",
            "updated",
            "subtasks",
            "parent",
            ids.story_points.as_str(),
            ids.sprint.as_str(),
        ]
        .join(",");

        let mut tickets = Vec::new();
        let mut token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut url = format!(
                "{}?jql={}&fields={}&maxResults={}",
                self.api("search/jql"),
                urlencoding::encode(jql),
                urlencoding::encode(&fields),
                PAGE_SIZE
            );
            if let Some(t) = &token {
                url.push_str(&format!("&nextPageToken={}", urlencoding::encode(t)));
            }

            let body = self
                .send_json(self.request(reqwest::Method::GET, &url), "search")
                .await?;
            let page = parse_search_page(body, &ids, self.base_url())?;
            tickets.extend(page.tickets);
            token = page.next_page_token;
            if token.is_none() {
                break;
            }
        }

        tracing::debug!("JQL returned {} tickets", tickets.len());
        Ok(tickets)
    }

    async fn active_sprint_id(&self) -> Result<u64> {
        let cached = self.active_sprint.lock().ok().and_then(|cache| *cache);
        if let Some((id, at)) = cached {
            if at.elapsed() < ACTIVE_SPRINT_TTL {
                return Ok(id);
            }
        }

        let board = self
            .team_config()?
            .backlog_board_id
            .context("Team has no backlog_board_id configured")?;
        let url = self.agile(&format!("board/{}/sprint?state=active&maxResults=1", board));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "active sprint")
            .await?;
        let id = body["values"][0]["id"]
            .as_u64()
            .context("No active sprint found")?;

        if let Ok(mut cache) = self.active_sprint.lock() {
            *cache = Some((id, Instant::now()));
        }
        Ok(id)
    }

    async fn rank(&self, ticket: &Ticket, anchor: &Ticket, before: bool) -> Result<()> {
        let anchor_field = if before {
            "rankBeforeIssue"
        } else {
            "rankAfterIssue"
        };
        let body = json!({ "issues": [ticket.key], anchor_field: anchor.key });
        self.send(
            self.request(reqwest::Method::PUT, &self.agile("issue/rank"))
                .json(&body),
            "rank",
        )
        .await?;
        tracing::info!(
            "Ranked {} {} {}",
            ticket.key,
            if before { "above" } else { "below" },
            anchor.key
        );
        Ok(())
    }
}

#[async_trait]
impl TicketGateway for JiraClient {
    async fn fetch_backlog(&self) -> Result<Vec<Ticket>> {
        self.query(&backlog_jql(&self.team_config()?)).await
    }

    async fn fetch_sprint(&self) -> Result<Vec<Ticket>> {
        self.query(&sprint_jql(&self.team_config()?)).await
    }

    async fn fetch_board(&self, board: &str) -> Result<Vec<Ticket>> {
        let query = self
            .config
            .boards
            .get(board)
            .with_context(|| format!("Board '{}' is not configured", board))?
            .query
            .clone();
        self.query(&query).await
    }

    async fn fetch_escalations(&self) -> Result<Vec<Ticket>> {
        let team = self.team_config()?;
        self.query(&escalations_jql(&team, &self.config.escalation_project))
            .await
    }

    async fn fetch_windows_shared(&self) -> Result<Vec<Ticket>> {
        self.query(&windows_shared_jql(&self.team_config()?)).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Ticket>> {
        let team = self.team_config()?;
        self.query(&search_jql(&team, &self.config.escalation_project, query))
            .await
    }

    async fn fetch_subtasks(&self, parent: &Ticket) -> Result<Vec<Ticket>> {
        self.query(&subtasks_jql(&parent.key)).await
    }

    fn boards(&self) -> Vec<String> {
        self.config.boards.keys().cloned().collect()
    }

    fn teams(&self) -> Vec<String> {
        self.config.teams.keys().cloned().collect()
    }

    fn current_team(&self) -> String {
        self.team
            .read()
            .map(|t| t.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn set_team(&self, team: &str) -> Result<()> {
        if !self.config.teams.contains_key(team) {
            anyhow::bail!("Team '{}' is not configured", team);
        }
        match self.team.write() {
            Ok(mut current) => *current = team.to_string(),
            Err(e) => *e.into_inner() = team.to_string(),
        }
        if let Ok(mut cache) = self.active_sprint.lock() {
            *cache = None;
        }
        tracing::info!("Switched team to {}", team);
        Ok(())
    }

    fn user_short_names(&self) -> Vec<String> {
        self.team_config()
            .map(|t| t.users.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn assign(&self, ticket: &Ticket, short_name: Option<&str>) -> Result<()> {
        let account = match short_name {
            Some(name) => {
                let team = self.team_config()?;
                let id = team
                    .users
                    .get(name)
                    .with_context(|| format!("Unknown user '{}'", name))?;
                // An empty id in the config means "unassign".
                (!id.is_empty()).then(|| id.clone())
            }
            None => None,
        };

        let url = self.api(&format!("issue/{}/assignee", ticket.key));
        self.send(
            self.request(reqwest::Method::PUT, &url)
                .json(&json!({ "accountId": account })),
            "assign",
        )
        .await?;
        tracing::info!("Assigned {} to {:?}", ticket.key, short_name);
        Ok(())
    }

    async fn statuses(&self, ticket: &Ticket) -> Result<Vec<String>> {
        let url = self.api(&format!("issue/{}/transitions", ticket.key));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "transitions")
            .await?;

        let mut names: Vec<String> = Vec::new();
        for t in body["transitions"].as_array().into_iter().flatten() {
            if let Some(name) = t["to"]["name"].as_str().or_else(|| t["name"].as_str()) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn transition(&self, ticket: &Ticket, status: &str) -> Result<()> {
        let url = self.api(&format!("issue/{}/transitions", ticket.key));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "transitions")
            .await?;

        let id = body["transitions"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|t| {
                t["to"]["name"]
                    .as_str()
                    .or_else(|| t["name"].as_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(status))
            })
            .and_then(|t| t["id"].as_str())
            .with_context(|| format!("{} cannot move to '{}'", ticket.key, status))?
            .to_string();

        self.send(
            self.request(reqwest::Method::POST, &url)
                .json(&json!({ "transition": { "id": id } })),
            "transition",
        )
        .await?;
        tracing::info!("Moved {} to {}", ticket.key, status);
        Ok(())
    }

    async fn set_story_points(&self, ticket: &Ticket, points: f64) -> Result<()> {
        let mut fields = serde_json::Map::new();
        fields.insert(self.config.story_points_field.clone(), json!(points));
        let url = self.api(&format!("issue/{}", ticket.key));
        self.send(
            self.request(reqwest::Method::PUT, &url)
                .json(&json!({ "fields": fields })),
            "story points",
        )
        .await?;
        tracing::info!("Set {} story points to {}", ticket.key, points);
        Ok(())
    }

    async fn add_comment(&self, ticket: &Ticket, body: &str) -> Result<()> {
        let url = self.api(&format!("issue/{}/comment", ticket.key));
        self.send(
            self.request(reqwest::Method::POST, &url)
                .json(&json!({ "body": body })),
            "comment",
        )
        .await?;
        tracing::info!("Commented on {}", ticket.key);
        Ok(())
    }

    async fn issue_types(&self, sub_task: bool) -> Result<Vec<String>> {
        let team = self.team_config()?;
        let url = self.api(&format!("issue/createmeta/{}/issuetypes", team.project));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "issue types")
            .await?;

        let types = body
            .get("issueTypes")
            .or_else(|| body.get("values"))
            .and_then(Value::as_array)
            .context("Jira returned no issue types")?;

        Ok(types
            .iter()
            .filter(|t| t["subtask"].as_bool().unwrap_or(false) == sub_task)
            .filter_map(|t| t["name"].as_str())
            .filter(|name| !IGNORED_ISSUE_TYPES.contains(name))
            .map(String::from)
            .collect())
    }

    async fn create_ticket(&self, draft: &TicketDraft) -> Result<Ticket> {
        let team = self.team_config()?;
        let mut fields = serde_json::Map::new();
        fields.insert("project".into(), json!({ "key": team.project }));
        fields.insert("summary".into(), json!(draft.summary));
        fields.insert("description".into(), json!(draft.description));
        fields.insert("issuetype".into(), json!({ "name": draft.issue_type }));

        if let (Some(field), false) = (&self.config.product_field, team.product.is_empty()) {
            fields.insert(field.clone(), json!({ "value": team.product }));
        }

        match &draft.placement {
            Placement::SubTaskOf(parent) => {
                fields.insert("parent".into(), json!({ "key": parent.key }));
            }
            Placement::Backlog => {
                fields.insert(self.config.team_field.clone(), json!(team.team_id));
            }
            Placement::Sprint => {
                fields.insert(self.config.team_field.clone(), json!(team.team_id));
                let sprint = self.active_sprint_id().await?;
                fields.insert(self.config.sprint_field.clone(), json!(sprint));
            }
        }

        let body = self
            .send_json(
                self.request(reqwest::Method::POST, &self.api("issue"))
                    .json(&json!({ "fields": fields })),
                "create",
            )
            .await?;

        let key = body["key"]
            .as_str()
            .context("Jira did not return a key for the new ticket")?
            .to_string();
        tracing::info!("Created {} ({})", key, draft.issue_type);

        Ok(Ticket {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            url: format!("{}/browse/{}", self.base_url(), key),
            key,
            summary: draft.summary.clone(),
            issue_type: draft.issue_type.clone(),
            description: Some(draft.description.clone()),
            ..Ticket::default()
        })
    }

    async fn delete(&self, ticket: &Ticket) -> Result<()> {
        let url = self.api(&format!("issue/{}?deleteSubtasks=true", ticket.key));
        self.send(self.request(reqwest::Method::DELETE, &url), "delete")
            .await?;
        tracing::info!("Deleted {}", ticket.key);
        Ok(())
    }

    async fn rank_above(&self, ticket: &Ticket, anchor: &Ticket) -> Result<()> {
        self.rank(ticket, anchor, true).await
    }

    async fn rank_below(&self, ticket: &Ticket, anchor: &Ticket) -> Result<()> {
        self.rank(ticket, anchor, false).await
    }

    async fn move_to_backlog(&self, ticket: &Ticket) -> Result<()> {
        self.send(
            self.request(reqwest::Method::POST, &self.agile("backlog/issue"))
                .json(&json!({ "issues": [ticket.key] })),
            "move to backlog",
        )
        .await?;
        tracing::info!("Moved {} to the backlog", ticket.key);
        Ok(())
    }

    async fn move_to_sprint(&self, ticket: &Ticket) -> Result<()> {
        let sprint = self.active_sprint_id().await?;
        let url = self.agile(&format!("sprint/{}/issue", sprint));
        self.send(
            self.request(reqwest::Method::POST, &url)
                .json(&json!({ "issues": [ticket.key] })),
            "move to sprint",
        )
        .await?;
        tracing::info!("Moved {} to sprint {}", ticket.key, sprint);
        Ok(())
    }

    async fn create_linked_spike(&self, ticket: &Ticket) -> Result<Ticket> {
        let draft = TicketDraft {
            summary: format!("SPIKE: {}", ticket.summary),
            description: format!(
                "Spike to investigate {} : {}\n\n## Original Description\n\n{}",
                ticket.key,
                self.browse_url(ticket),
                ticket.description.as_deref().unwrap_or_default()
            ),
            issue_type: "Spike".to_string(),
            placement: Placement::Sprint,
        };
        let spike = self.create_ticket(&draft).await?;

        self.send(
            self.request(reqwest::Method::POST, &self.api("issueLink"))
                .json(&json!({
                    "type": { "name": "Relates" },
                    "inwardIssue": { "key": ticket.key },
                    "outwardIssue": { "key": spike.key },
                })),
            "link",
        )
        .await?;
        tracing::info!("Linked {} to {}", spike.key, ticket.key);
        Ok(spike)
    }

    async fn download_attachments(&self, ticket: &Ticket, dir: &Path) -> Result<usize> {
        let url = self.api(&format!("issue/{}?fields=attachment", ticket.key));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "attachments")
            .await?;
        let attachments: Vec<RawAttachment> =
            serde_json::from_value(body["fields"]["attachment"].clone()).unwrap_or_default();

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut written = 0;
        for attachment in attachments {
            let Some(name) = Path::new(&attachment.filename).file_name() else {
                continue;
            };
            let target = dir.join(name);
            if target.exists() {
                continue;
            }
            let bytes = self
                .send(self.request(reqwest::Method::GET, &attachment.content), "attachment")
                .await?
                .bytes()
                .await
                .with_context(|| format!("Failed to read {}", attachment.filename))?;
            std::fs::write(&target, &bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            written += 1;
        }

        tracing::info!("Downloaded {} attachments for {}", written, ticket.key);
        Ok(written)
    }

    async fn test_definitions(&self, ticket: &Ticket) -> Result<String> {
        let field = &self.config.test_field;
        let url = self.api(&format!("issue/{}?fields={}", ticket.key, field));
        let body = self
            .send_json(self.request(reqwest::Method::GET, &url), "test definitions")
            .await?;
        Ok(body["fields"][field.as_str()]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn append_test_template(&self, ticket: &Ticket, template: &str) -> Result<()> {
        let current = self.test_definitions(ticket).await?;
        let url = self.api(&format!("issue/{}", ticket.key));
        self.send(
            self.request(reqwest::Method::PUT, &url).json(&json!({
                "fields": { self.config.test_field.clone(): format!("{}{}", current, template) }
            })),
            "test template",
        )
        .await?;
        tracing::info!("Added a test template to {}", ticket.key);
        Ok(())
    }

    async fn link_test(&self, test_key: &str, ticket: &Ticket) -> Result<()> {
        self.send(
            self.request(reqwest::Method::POST, &self.api("issueLink"))
                .json(&json!({
                    "type": { "name": "Test" },
                    "inwardIssue": { "key": test_key },
                    "outwardIssue": { "key": ticket.key },
                })),
            "test link",
        )
        .await?;

        // Generated tests belong to the same team and product as the ticket.
        let team = self.team_config()?;
        let mut fields = serde_json::Map::new();
        fields.insert(self.config.team_field.clone(), json!(team.team_id));
        if let (Some(field), false) = (&self.config.product_field, team.product.is_empty()) {
            fields.insert(field.clone(), json!({ "value": team.product }));
        }
        let url = self.api(&format!("issue/{}", test_key));
        self.send(
            self.request(reqwest::Method::PUT, &url)
                .json(&json!({ "fields": fields })),
            "test fields",
        )
        .await?;
        tracing::info!("Linked test {} to {}", test_key, ticket.key);
        Ok(())
    }

    async fn find_test_plan(&self, name: &str) -> Result<Option<String>> {
        let team = self.team_config()?;
        let plans = self.query(&test_plan_jql(&team, name)).await?;
        Ok(plans.into_iter().next().map(|plan| plan.id))
    }

    fn browse_url(&self, ticket: &Ticket) -> String {
        if ticket.url.is_empty() {
            format!("{}/browse/{}", self.base_url(), ticket.key)
        } else {
            ticket.url.clone()
        }
    }

    fn board_url(&self, page: BoardPage) -> Result<String> {
        let team = self.team_config()?;
        let board = |id: Option<u64>, what: &str| {
            id.with_context(|| format!("Team has no {} configured", what))
        };
        let base = format!("{}/secure/RapidBoard.jspa?rapidView=", self.base_url());
        Ok(match page {
            BoardPage::Sprint => format!("{}{}", base, board(team.backlog_board_id, "backlog_board_id")?),
            BoardPage::Backlog => format!(
                "{}{}&view=planning.nodetail",
                base,
                board(team.backlog_board_id, "backlog_board_id")?
            ),
            BoardPage::Kanban => format!("{}{}", base, board(team.kanban_board_id, "kanban_board_id")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn team() -> TeamConfig {
        TeamConfig {
            team_id: "42".to_string(),
            project: "EPM".to_string(),
            product: "Widgets".to_string(),
            ..TeamConfig::default()
        }
    }

    #[test]
    fn test_search_by_key_and_number() {
        assert_eq!(search_jql(&team(), "HELP", "help-12"), "key = HELP-12");
        assert_eq!(search_jql(&team(), "HELP", " 345 "), "key = EPM-345");
    }

    #[test]
    fn test_search_by_summary_prefix() {
        let jql = search_jql(&team(), "HELP", "login \"page\"");
        assert!(jql.starts_with("project in (EPM, HELP) AND \"Product[Dropdown]\" in (\"Widgets\")"));
        assert!(jql.contains("summary ~ \"login \\\"page\\\"*\""));
        assert!(jql.ends_with("ORDER BY Rank ASC"));
    }

    #[test]
    fn test_backlog_excludes_open_sprints() {
        let jql = backlog_jql(&team());
        assert!(jql.contains("\"Team[Team]\" = 42"));
        assert!(jql.contains("sprint not in openSprints()"));
        assert!(jql.contains("statusCategory != Done"));
    }

    #[test]
    fn test_escalations_without_product() {
        let plain = TeamConfig {
            product: String::new(),
            ..team()
        };
        assert_eq!(
            escalations_jql(&plain, "HELP"),
            "project = HELP AND statusCategory != Done ORDER BY Rank ASC"
        );
    }

    #[test]
    fn test_test_plan_by_summary() {
        assert_eq!(
            test_plan_jql(&team(), "24.3 \"Sync\""),
            "project = EPM AND issuetype = \"Test Plan\" AND summary ~ \"24.3 \\\"Sync\\\"\" ORDER BY Rank ASC"
        );
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-01T09:30:00.000+0100").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_sprint_name_prefers_active() {
        let value = json!([
            { "name": "Sprint 1", "state": "closed" },
            { "name": "Sprint 2", "state": "active" },
            { "name": "Sprint 3", "state": "future" }
        ]);
        assert_eq!(sprint_name(&value).as_deref(), Some("Sprint 2"));
        assert_eq!(sprint_name(&json!(null)), None);
    }
}
