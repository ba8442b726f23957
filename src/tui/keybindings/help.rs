//! Auto-generate help text from the command table.

use super::{Category, CommandTable, KeyBinding};
use crate::tui::input::ColumnKeys;
use crate::util::wrap_items;

const CATEGORIES: [Category; 4] = [
    Category::Views,
    Category::Tickets,
    Category::Developer,
    Category::Application,
];

/// Lowercase first, then uppercase of the same letter.
fn sort_key(binding: &KeyBinding) -> (String, bool) {
    let shown = binding.trigger.display();
    let upper = shown.chars().any(|c| c.is_uppercase()) && shown.len() == 1;
    (shown.to_lowercase(), upper)
}

/// Compact `key:label` hints for the prompt area, wrapped to `width`.
pub fn prompt_help(table: &CommandTable, width: usize) -> Vec<String> {
    let mut bindings: Vec<&KeyBinding> = table.bindings().collect();
    bindings.sort_by_key(|b| sort_key(b));

    let items: Vec<String> = bindings
        .iter()
        .map(|b| format!("{}:{}", b.trigger.display(), b.label))
        .collect();
    wrap_items(&items, "  ", width.max(20))
}

/// Full help screen grouped by category.
pub fn help_lines(table: &CommandTable, columns: &ColumnKeys) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "  Navigation".to_string(),
        "  ──────────".to_string(),
        format!("  {:8}{}", "1..n", "Show the sub-tasks of row n"),
        format!("  {:8}{}", "Enter", "Back from sub-tasks"),
    ];
    for (key, column) in columns.iter() {
        lines.push(format!("  {:8}Toggle the {} column", format!("F{}", key), column));
    }

    for category in CATEGORIES {
        let mut bindings: Vec<&KeyBinding> = table
            .bindings()
            .filter(|b| b.category == category)
            .collect();
        if bindings.is_empty() {
            continue;
        }
        bindings.sort_by_key(|b| sort_key(b));

        lines.push(String::new());
        lines.push(format!("  {}", category.label()));
        lines.push(format!("  {}", "─".repeat(category.label().len())));
        for binding in bindings {
            lines.push(format!(
                "  {:8}{}",
                binding.trigger.display(),
                binding.description
            ));
        }
    }
    lines
}
