//! Input classification for the read-eval loop.
//!
//! One read yields one [`Input`]; [`classify`] turns it into a [`LoopAction`].
//! The order of checks matters: column toggles win over command triggers,
//! triggers win over row numbers, and only then does an empty line mean back.

use crate::data::ColumnSet;
use crate::tui::keybindings::{Command, CommandTable, Trigger, COLUMN_KEYS};
use indexmap::IndexMap;

/// A single composite read from the table UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    FunctionKey(u8),
    /// A bound trigger typed on an empty line.
    Key(char),
    /// A submitted line (possibly empty).
    Line(String),
    Cancelled,
    /// Ctrl+C.
    Interrupt,
    /// Nothing arrived before the tick elapsed.
    Idle,
}

/// Function key -> optional column, assigned positionally from F2.
#[derive(Debug, Clone, Default)]
pub struct ColumnKeys {
    keys: IndexMap<u8, String>,
}

impl ColumnKeys {
    pub fn new(fields: &ColumnSet) -> Self {
        let mut keys = IndexMap::new();
        for (key, name) in COLUMN_KEYS.zip(fields.keys()) {
            keys.insert(key, name.clone());
        }
        if fields.len() > keys.len() {
            tracing::warn!(
                "{} optional columns have no function key",
                fields.len() - keys.len()
            );
        }
        Self { keys }
    }

    pub fn column_for(&self, key: u8) -> Option<&str> {
        self.keys.get(&key).map(String::as_str)
    }

    pub fn key_for(&self, column: &str) -> Option<u8> {
        self.keys
            .iter()
            .find(|(_, name)| name.as_str() == column)
            .map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.keys.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopAction {
    ToggleColumn(String),
    Run(Command),
    /// 1-based row number as typed.
    DrillDown(usize),
    Back,
    Ignore,
}

pub fn classify(input: &Input, columns: &ColumnKeys, commands: &CommandTable) -> LoopAction {
    if *input == Input::Interrupt {
        return LoopAction::Run(Command::Quit);
    }

    // 1. column toggles
    if let Input::FunctionKey(n) = input {
        if let Some(column) = columns.column_for(*n) {
            return LoopAction::ToggleColumn(column.to_string());
        }
    }

    // 2. command triggers
    let trigger = match input {
        Input::FunctionKey(n) => Some(Trigger::Function(*n)),
        Input::Key(c) => Some(Trigger::Key(*c)),
        Input::Line(line) => {
            let line = line.trim();
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Trigger::Key(c)),
                _ => None,
            }
        }
        Input::Cancelled | Input::Interrupt | Input::Idle => None,
    };
    if let Some(binding) = trigger.as_ref().and_then(|t| commands.lookup(t)) {
        return LoopAction::Run(binding.command);
    }

    // 3. row numbers
    if let Input::Line(line) = input {
        let line = line.trim();
        if !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) {
            return match line.parse::<usize>() {
                Ok(n) if n > 0 => LoopAction::DrillDown(n),
                _ => LoopAction::Ignore,
            };
        }
    }

    // 4. back
    match input {
        Input::Line(line) if line.trim().is_empty() => LoopAction::Back,
        Input::Cancelled => LoopAction::Back,
        _ => LoopAction::Ignore,
    }
}
