use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub jira: JiraConfig,
    #[serde(default)]
    pub github: Option<GithubConfig>,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub xray: Option<XrayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    pub url: String,
    pub username: String,
    pub token: String,
    pub default_team: String,
    #[serde(default = "default_story_points_field")]
    pub story_points_field: String,
    #[serde(default = "default_sprint_field")]
    pub sprint_field: String,
    #[serde(default = "default_team_field")]
    pub team_field: String,
    #[serde(default = "default_escalation_project")]
    pub escalation_project: String,
    /// Product dropdown stamped on new tickets when the team has a product.
    #[serde(default)]
    pub product_field: Option<String>,
    /// Rich-text field holding given/when/then test definitions.
    #[serde(default = "default_test_field")]
    pub test_field: String,
    #[serde(default)]
    pub teams: IndexMap<String, TeamConfig>,
    /// Named saved queries, shown in file order.
    #[serde(default)]
    pub boards: IndexMap<String, BoardConfig>,
}

fn default_story_points_field() -> String {
    "customfield_10028".to_string()
}

fn default_sprint_field() -> String {
    "customfield_10020".to_string()
}

fn default_team_field() -> String {
    "customfield_10001".to_string()
}

fn default_escalation_project() -> String {
    "HELP".to_string()
}

fn default_test_field() -> String {
    "customfield_10200".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_id: String,
    pub project: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub kanban_board_id: Option<u64>,
    #[serde(default)]
    pub backlog_board_id: Option<u64>,
    /// short name -> account id
    #[serde(default)]
    pub users: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

fn default_base_branch() -> String {
    "main".to_string()
}

/// Xray Cloud API credentials for test generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrayConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Jira project id (numeric) that owns the test repository.
    pub project_id: String,
}

impl XrayConfig {
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitConfig {
    /// Branch name prefix, usually the developer's initials.
    #[serde(default)]
    pub initials: String,
    #[serde(default)]
    pub support_dir: Option<PathBuf>,
}

impl GitConfig {
    pub fn support_dir(&self) -> PathBuf {
        self.support_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Support")
        })
    }
}

impl Config {
    /// Look up a configured team by name.
    pub fn team(&self, name: &str) -> Result<&TeamConfig> {
        self.jira
            .teams
            .get(name)
            .with_context(|| format!("Team '{}' is not configured", name))
    }

    /// Check cross references that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.team(&self.jira.default_team)
            .context("jira.default_team must name an entry in [jira.teams]")?;
        if self.jira.url.trim().is_empty() {
            anyhow::bail!("jira.url must not be empty");
        }
        Ok(())
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "ticketdeck")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Where the tracing subscriber writes; the terminal belongs to the table.
pub fn log_path() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "ticketdeck")
        .context("Could not determine data directory")?
        .data_dir()
        .to_path_buf();
    Ok(dir.join("ticketdeck.log"))
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run `ticketdeck --init` to create one.",
            path.display()
        );
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config at {}", path.display()))?;

    Ok(config)
}

const TEMPLATE_HEADER: &str = "\
# ticketdeck configuration
#
# Saved boards go under [jira.boards.<name>] with a `query` holding JQL.
# Team members go under [jira.teams.<team>.users] as short name = account id.
# Optional: [jira.teams.<team>] kanban_board_id / backlog_board_id for the
# board pages and sprint moves, [git] support_dir for support folders.
# Test generation needs [xray] client_id, client_secret and project_id.

";

fn ask(question: &str) -> Result<String> {
    use std::io::{self, Write};

    print!("{}", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub async fn init_wizard(path: Option<&Path>) -> Result<()> {
    println!("ticketdeck Configuration Wizard");
    println!("===============================\n");

    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if config_path.exists() {
        let answer = ask(&format!(
            "Config already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let url = ask("Jira URL (https://example.atlassian.net): ")?;
    let username = ask("Jira username (email): ")?;
    let token = ask("Jira API token (https://id.atlassian.com/manage-profile/security/api-tokens): ")?;
    let team_name = ask("Team name: ")?;
    let team_id = ask("Team id: ")?;
    let project = ask("Project key: ")?;
    let initials = ask("Your initials (used as branch prefix): ")?;
    let github_token = ask("GitHub token (optional, press Enter to skip): ")?;

    let github = if github_token.is_empty() {
        None
    } else {
        Some(GithubConfig {
            token: github_token,
            owner: ask("GitHub owner: ")?,
            repo: ask("GitHub repository: ")?,
            base_branch: default_base_branch(),
        })
    };

    let mut teams = IndexMap::new();
    teams.insert(
        team_name.clone(),
        TeamConfig {
            team_id,
            project,
            ..TeamConfig::default()
        },
    );

    let config = Config {
        jira: JiraConfig {
            url,
            username,
            token,
            default_team: team_name,
            story_points_field: default_story_points_field(),
            sprint_field: default_sprint_field(),
            team_field: default_team_field(),
            escalation_project: default_escalation_project(),
            product_field: None,
            test_field: default_test_field(),
            teams,
            boards: IndexMap::new(),
        },
        github,
        git: GitConfig {
            initials,
            support_dir: None,
        },
        xray: None,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = format!("{}{}", TEMPLATE_HEADER, toml::to_string_pretty(&config)?);
    std::fs::write(&config_path, content)?;

    // Set file permissions to 0600 (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))?;
    }

    println!("\nConfig saved to {}", config_path.display());
    println!("Run `ticketdeck` to open the backlog.");

    Ok(())
}
