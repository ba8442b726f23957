use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::sync::Mutex;
use ticketdeck::data::ViewMode;
use ticketdeck::tui::Startup;
use ticketdeck::{config, tui};

#[derive(Parser, Debug)]
#[command(name = "ticketdeck")]
#[command(about = "Terminal table client for Jira backlogs, sprints and sub-tasks")]
#[command(version)]
#[command(group(ArgGroup::new("view").args(["sprint", "backlog", "board", "escalations", "windows_shared"])))]
struct Args {
    /// Start in the current sprint
    #[arg(long)]
    sprint: bool,

    /// Start in the backlog (default)
    #[arg(long)]
    backlog: bool,

    /// Start in a configured board, numbered from 1 in config order
    #[arg(long, value_name = "N")]
    board: Option<usize>,

    /// Start in the escalations view
    #[arg(long)]
    escalations: bool,

    /// Start in the unassigned shared view
    #[arg(long)]
    windows_shared: bool,

    /// Initialize configuration
    #[arg(long)]
    init: bool,

    /// Path to config file
    #[arg(long, short)]
    config: Option<std::path::PathBuf>,
}

impl Args {
    fn startup(&self, config: &config::Config) -> Result<Startup> {
        if let Some(n) = self.board {
            let boards: Vec<&String> = config.jira.boards.keys().collect();
            let Some(name) = n.checked_sub(1).and_then(|i| boards.get(i)) else {
                anyhow::bail!(
                    "Board {} does not exist ({} boards configured)",
                    n,
                    boards.len()
                );
            };
            return Ok(Startup {
                mode: ViewMode::Board,
                params: Some(name.to_string()),
            });
        }

        let mode = if self.sprint {
            ViewMode::Sprint
        } else if self.escalations {
            ViewMode::Escalations
        } else if self.windows_shared {
            ViewMode::WindowsShared
        } else {
            ViewMode::Backlog
        };
        Ok(Startup { mode, params: None })
    }
}

/// The terminal belongs to the table, so logs go to a file.
fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ticketdeck=info".parse()?);

    let file = config::log_path().and_then(|path| {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?)
    });

    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    if args.init {
        config::init_wizard(args.config.as_deref()).await?;
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;
    let startup = args.startup(&config)?;

    tui::run(config, startup).await
}
