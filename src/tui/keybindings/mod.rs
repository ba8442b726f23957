//! Centralized command table.
//!
//! The registry defines every binding; lookup and help generation are derived
//! from it. Digits and F2..F12 are never bindable: digits address rows and
//! F2..F12 toggle optional columns.

mod help;
mod registry;

pub use help::{help_lines, prompt_help};
pub use registry::{CommandTable, RegistryError, BINDINGS};

/// A keystroke that can invoke a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Key(char),
    Function(u8),
}

/// Function keys handed to the column toggles.
pub const COLUMN_KEYS: std::ops::RangeInclusive<u8> = 2..=12;

impl Trigger {
    pub fn display(&self) -> String {
        match self {
            Trigger::Key(c) => c.to_string(),
            Trigger::Function(n) => format!("F{}", n),
        }
    }

    /// Why this trigger cannot be bound, if it cannot.
    pub fn reserved_for(&self) -> Option<&'static str> {
        match self {
            Trigger::Key(c) if c.is_ascii_digit() => Some("row numbers"),
            Trigger::Key(c) if c.is_whitespace() => Some("back navigation"),
            Trigger::Function(n) if COLUMN_KEYS.contains(n) => Some("column toggles"),
            _ => None,
        }
    }
}

/// Every action the table can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Assign,
    Browse,
    Boards,
    Create,
    Delete,
    Edit,
    Team,
    Branch,
    Inspect,
    Link,
    Backlog,
    Move,
    Sort,
    PullRequest,
    Points,
    Quit,
    Refresh,
    Sprint,
    Support,
    Status,
    ToggleSubRows,
    Report,
    GenerateTests,
    WindowsShared,
    Escalations,
    Search,
    Filter,
}

/// Groups for the help screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Views,
    Tickets,
    Developer,
    Application,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Views => "Views",
            Category::Tickets => "Tickets",
            Category::Developer => "Developer",
            Category::Application => "Application",
        }
    }
}

/// A complete binding definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub trigger: Trigger,
    pub command: Command,
    /// Short label for the prompt line
    pub label: &'static str,
    /// Longer text for the help screen
    pub description: &'static str,
    pub category: Category,
}
