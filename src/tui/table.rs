//! The table surface the view and commands draw into.
//!
//! Implementations are passive: rows go in, one blocking read comes out.
//! Cancelling a prompt is an ordinary `None`, never an error.

use crate::data::Ticket;
use crate::tui::input::Input;
use crate::tui::keybindings::Trigger;
use anyhow::Result;
use std::time::Duration;

/// An expandable child row under a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRow {
    pub cells: Vec<String>,
    pub ticket: Ticket,
}

pub trait TableUi {
    fn clear(&mut self);
    fn set_title(&mut self, _title: &str) {}
    fn add_header(&mut self, columns: Vec<String>);
    fn add_row(&mut self, cells: Vec<String>, ticket: Ticket, sub_rows: Vec<SubRow>);
    fn draw(&mut self) -> Result<()>;

    /// Replace the message area and redraw.
    fn prompt(&mut self, message: &str) -> Result<()>;

    /// Read one composite input. A character in `triggers` typed on an empty
    /// line returns immediately; anything else is buffered until Enter.
    /// Returns [`Input::Idle`] when nothing completes within `tick`, keeping
    /// any partially typed line for the next call.
    fn prompt_get_string(
        &mut self,
        prompt: &str,
        triggers: &[Trigger],
        tick: Duration,
    ) -> Result<Input>;

    /// Free text; `None` when cancelled.
    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// A single keypress; `None` when cancelled.
    fn prompt_get_character(&mut self, prompt: &str) -> Result<Option<char>>;

    /// Open `initial` in an external editor and return the saved text.
    fn edit_text(&mut self, initial: &str) -> Result<Option<String>>;

    /// 0-based index into the rendered top-level rows.
    fn get_row(&self, index: usize) -> Option<(Vec<String>, Ticket)>;
    fn toggle_sub_rows(&mut self);

    /// Show a recoverable failure without leaving the table.
    fn error(&mut self, context: &str, error: &anyhow::Error);

    /// Usable width for wrapped prompt text.
    fn width(&self) -> usize {
        80
    }

    /// Pick one of `choices`; returns its index.
    fn prompt_choice(&mut self, prompt: &str, choices: &[String]) -> Result<Option<usize>> {
        if choices.is_empty() {
            return Ok(None);
        }
        let listed: Vec<String> = choices
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}) {}", i + 1, c))
            .collect();
        let message = format!("{}\n{}", prompt, listed.join("  "));

        let Some(answer) = self.prompt_line(&message)? else {
            return Ok(None);
        };
        Ok(answer
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=choices.len()).contains(n))
            .map(|n| n - 1))
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt_get_character(&format!("{} (y/n)", question))?;
        Ok(matches!(answer, Some('y') | Some('Y')))
    }

    /// Ask for a 1-based row number and return the ticket on that row.
    fn prompt_row(&mut self, prompt: &str) -> Result<Option<Ticket>> {
        let Some(answer) = self.prompt_line(prompt)? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if n >= 1 => match self.get_row(n - 1) {
                Some((_, ticket)) => Ok(Some(ticket)),
                None => anyhow::bail!("There is no row {}", n),
            },
            _ => anyhow::bail!("'{}' is not a row number", answer),
        }
    }
}
