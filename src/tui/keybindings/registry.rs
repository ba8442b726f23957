//! Static registry of all command bindings.
//!
//! Both lookup and help generation derive from this table.

use super::{Category, Command, KeyBinding, Trigger};
use indexmap::IndexMap;
use thiserror::Error;

/// All bindings in the application.
pub static BINDINGS: &[KeyBinding] = &[
    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════
    KeyBinding {
        trigger: Trigger::Key('l'),
        command: Command::Backlog,
        label: "backlog",
        description: "Show the team backlog",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('s'),
        command: Command::Sprint,
        label: "sprint",
        description: "Show the open sprint",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('B'),
        command: Command::Boards,
        label: "boards",
        description: "Pick a saved board query",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('z'),
        command: Command::Escalations,
        label: "escalations",
        description: "Show open escalations",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('w'),
        command: Command::WindowsShared,
        label: "windows shared",
        description: "Show backlog tickets with no team",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('?'),
        command: Command::Search,
        label: "search",
        description: "Search by key, number or summary",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('/'),
        command: Command::Filter,
        label: "filter",
        description: "Fuzzy filter the rows on screen",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('o'),
        command: Command::Sort,
        label: "sort",
        description: "Sort by a column (again to reverse)",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('T'),
        command: Command::ToggleSubRows,
        label: "sub-rows",
        description: "Expand or collapse sub-ticket rows",
        category: Category::Views,
    },
    KeyBinding {
        trigger: Trigger::Key('r'),
        command: Command::Refresh,
        label: "refresh",
        description: "Re-fetch the current view",
        category: Category::Views,
    },
    // ═══════════════════════════════════════════════════════════════════════════
    // TICKETS
    // ═══════════════════════════════════════════════════════════════════════════
    KeyBinding {
        trigger: Trigger::Key('a'),
        command: Command::Assign,
        label: "assign",
        description: "Assign a ticket to a team member",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('b'),
        command: Command::Browse,
        label: "browse",
        description: "Open a ticket or board page in the browser",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('c'),
        command: Command::Create,
        label: "create",
        description: "Create a ticket (sub-task when viewing sub-tasks)",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('d'),
        command: Command::Delete,
        label: "delete",
        description: "Delete a ticket and its sub-tasks",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('e'),
        command: Command::Edit,
        label: "edit",
        description: "Add a comment to a ticket",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('i'),
        command: Command::Inspect,
        label: "inspect",
        description: "Show a ticket's details",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('k'),
        command: Command::Link,
        label: "link",
        description: "Create a linked spike in the sprint",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('m'),
        command: Command::Move,
        label: "move",
        description: "Re-rank, or move between backlog and sprint",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('P'),
        command: Command::Points,
        label: "points",
        description: "Set story points",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('t'),
        command: Command::Status,
        label: "status",
        description: "Change a ticket's status",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('V'),
        command: Command::Report,
        label: "report",
        description: "Summarise the sprint in the background",
        category: Category::Tickets,
    },
    KeyBinding {
        trigger: Trigger::Key('x'),
        command: Command::GenerateTests,
        label: "xray",
        description: "Create Xray tests from a ticket's test definitions",
        category: Category::Tickets,
    },
    // ═══════════════════════════════════════════════════════════════════════════
    // DEVELOPER
    // ═══════════════════════════════════════════════════════════════════════════
    KeyBinding {
        trigger: Trigger::Key('h'),
        command: Command::Branch,
        label: "branch",
        description: "Create and push a branch for a ticket",
        category: Category::Developer,
    },
    KeyBinding {
        trigger: Trigger::Key('p'),
        command: Command::PullRequest,
        label: "pr",
        description: "Open a pull request for the current branch",
        category: Category::Developer,
    },
    KeyBinding {
        trigger: Trigger::Key('S'),
        command: Command::Support,
        label: "support",
        description: "Create a support case folder",
        category: Category::Developer,
    },
    // ═══════════════════════════════════════════════════════════════════════════
    // APPLICATION
    // ═══════════════════════════════════════════════════════════════════════════
    KeyBinding {
        trigger: Trigger::Key('E'),
        command: Command::Team,
        label: "team",
        description: "Switch team",
        category: Category::Application,
    },
    KeyBinding {
        trigger: Trigger::Function(1),
        command: Command::Help,
        label: "help",
        description: "Show this help",
        category: Category::Application,
    },
    KeyBinding {
        trigger: Trigger::Key('q'),
        command: Command::Quit,
        label: "quit",
        description: "Quit",
        category: Category::Application,
    },
];

/// Structural problems found while building a [`CommandTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("trigger {trigger} is bound to both {first:?} and {second:?}")]
    Duplicate {
        trigger: String,
        first: Command,
        second: Command,
    },
    #[error("trigger {trigger} is reserved for {reason}")]
    Reserved {
        trigger: String,
        reason: &'static str,
    },
}

/// Trigger -> binding lookup, validated once at construction.
#[derive(Debug, Clone)]
pub struct CommandTable {
    bindings: IndexMap<Trigger, KeyBinding>,
}

impl CommandTable {
    pub fn new(bindings: &[KeyBinding]) -> Result<Self, RegistryError> {
        let mut table: IndexMap<Trigger, KeyBinding> = IndexMap::with_capacity(bindings.len());
        for binding in bindings {
            if let Some(reason) = binding.trigger.reserved_for() {
                return Err(RegistryError::Reserved {
                    trigger: binding.trigger.display(),
                    reason,
                });
            }
            if let Some(existing) = table.get(&binding.trigger) {
                return Err(RegistryError::Duplicate {
                    trigger: binding.trigger.display(),
                    first: existing.command,
                    second: binding.command,
                });
            }
            table.insert(binding.trigger, *binding);
        }
        Ok(Self { bindings: table })
    }

    /// The application's bindings.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::new(BINDINGS)
    }

    pub fn lookup(&self, trigger: &Trigger) -> Option<&KeyBinding> {
        self.bindings.get(trigger)
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.bindings.keys().copied().collect()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
