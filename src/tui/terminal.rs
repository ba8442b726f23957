//! ratatui/crossterm rendition of [`TableUi`].
//!
//! The screen is four stacked areas: a title bar, the numbered ticket table,
//! a message area and the input prompt. Rows are numbered from 1 in render
//! order; expanded sub-rows are shown indented and carry no number.

use crate::data::Ticket;
use crate::tui::input::Input;
use crate::tui::keybindings::Trigger;
use crate::tui::table::{SubRow, TableUi};
use crate::tui::TICK_RATE;
use crate::util::{column_widths, display_width, pad_to_width, truncate_with_ellipsis};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;

const SEP: &str = " │ ";
const MAX_COLUMN_WIDTH: usize = 60;
const MAX_MESSAGE_LINES: u16 = 8;

struct TableRow {
    cells: Vec<String>,
    ticket: Ticket,
    sub_rows: Vec<SubRow>,
}

/// Everything drawn on screen, kept apart from the terminal handle so a
/// draw closure can borrow it while the terminal is borrowed mutably.
#[derive(Default)]
struct Screen {
    title: String,
    header: Vec<String>,
    rows: Vec<TableRow>,
    show_sub_rows: bool,
    message: String,
    message_is_error: bool,
    prompt: String,
    buffer: String,
    scroll: usize,
}

pub struct TerminalTable {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    screen: Screen,
    active: bool,
}

impl TerminalTable {
    /// Switch the terminal into raw mode on the alternate screen.
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            screen: Screen::default(),
            active: true,
        })
    }

    /// Give the terminal back. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen)?;
        self.terminal.clear()?;
        self.active = true;
        Ok(())
    }

    fn read_key(&mut self, tick: Duration) -> Result<Option<KeyEvent>> {
        if !event::poll(tick)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
            Event::Resize(_, _) => {
                self.draw()?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.screen.visible_rows().len().saturating_sub(1);
        let next = self.screen.scroll as isize + delta;
        self.screen.scroll = next.clamp(0, max as isize) as usize;
    }

    /// A completed read clears the previous message.
    fn completed(&mut self, input: Input) -> Input {
        self.screen.message.clear();
        self.screen.message_is_error = false;
        input
    }
}

impl Drop for TerminalTable {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

impl TableUi for TerminalTable {
    fn clear(&mut self) {
        self.screen.header.clear();
        self.screen.rows.clear();
        self.screen.scroll = 0;
    }

    fn set_title(&mut self, title: &str) {
        self.screen.title = title.to_string();
    }

    fn add_header(&mut self, columns: Vec<String>) {
        self.screen.header = columns;
    }

    fn add_row(&mut self, cells: Vec<String>, ticket: Ticket, sub_rows: Vec<SubRow>) {
        self.screen.rows.push(TableRow {
            cells,
            ticket,
            sub_rows,
        });
    }

    fn draw(&mut self) -> Result<()> {
        let screen = &self.screen;
        self.terminal.draw(|f| screen.render(f))?;
        Ok(())
    }

    fn prompt(&mut self, message: &str) -> Result<()> {
        self.screen.message = message.to_string();
        self.screen.message_is_error = false;
        self.draw()
    }

    fn prompt_get_string(
        &mut self,
        prompt: &str,
        triggers: &[Trigger],
        tick: Duration,
    ) -> Result<Input> {
        self.screen.prompt = prompt.to_string();
        self.draw()?;

        let Some(key) = self.read_key(tick)? else {
            return Ok(Input::Idle);
        };
        let input = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.screen.buffer.clear();
                Input::Interrupt
            }
            KeyCode::Enter => Input::Line(std::mem::take(&mut self.screen.buffer)),
            KeyCode::Esc => {
                self.screen.buffer.clear();
                Input::Cancelled
            }
            KeyCode::F(n) => Input::FunctionKey(n),
            KeyCode::Backspace => {
                self.screen.buffer.pop();
                return Ok(Input::Idle);
            }
            KeyCode::Char(c) => {
                if self.screen.buffer.is_empty() && triggers.contains(&Trigger::Key(c)) {
                    Input::Key(c)
                } else {
                    self.screen.buffer.push(c);
                    return Ok(Input::Idle);
                }
            }
            KeyCode::Up => {
                self.scroll_by(-1);
                return Ok(Input::Idle);
            }
            KeyCode::Down => {
                self.scroll_by(1);
                return Ok(Input::Idle);
            }
            KeyCode::PageUp => {
                self.scroll_by(-10);
                return Ok(Input::Idle);
            }
            KeyCode::PageDown => {
                self.scroll_by(10);
                return Ok(Input::Idle);
            }
            _ => return Ok(Input::Idle),
        };
        Ok(self.completed(input))
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.prompt_get_string(prompt, &[], TICK_RATE)? {
                Input::Line(line) => return Ok(Some(line)),
                Input::Cancelled | Input::Interrupt => return Ok(None),
                _ => continue,
            }
        }
    }

    fn prompt_get_character(&mut self, prompt: &str) -> Result<Option<char>> {
        self.screen.prompt = prompt.to_string();
        self.draw()?;
        loop {
            let Some(key) = self.read_key(TICK_RATE)? else {
                continue;
            };
            return Ok(match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => None,
                KeyCode::Char(c) => Some(c),
                _ => None,
            });
        }
    }

    fn edit_text(&mut self, initial: &str) -> Result<Option<String>> {
        let file = tempfile::Builder::new()
            .prefix("ticketdeck-")
            .suffix(".md")
            .tempfile()
            .context("Failed to create a scratch file")?;
        std::fs::write(file.path(), initial)?;

        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string());

        self.restore()?;
        let status = std::process::Command::new(&editor).arg(file.path()).status();
        self.resume()?;

        let status = status.with_context(|| format!("Failed to start {}", editor))?;
        if !status.success() {
            tracing::debug!("{} exited with {}", editor, status);
            return Ok(None);
        }
        let text = std::fs::read_to_string(file.path())?;
        let text = text.trim_end().to_string();
        Ok((!text.is_empty()).then_some(text))
    }

    fn get_row(&self, index: usize) -> Option<(Vec<String>, Ticket)> {
        self.screen
            .rows
            .get(index)
            .map(|row| (row.cells.clone(), row.ticket.clone()))
    }

    fn toggle_sub_rows(&mut self) {
        self.screen.show_sub_rows = !self.screen.show_sub_rows;
    }

    fn error(&mut self, context: &str, error: &anyhow::Error) {
        tracing::warn!("{}: {:#}", context, error);
        self.screen.message = format!("{}: {:#}", context, error);
        self.screen.message_is_error = true;
        if let Err(e) = self.draw() {
            tracing::warn!("Failed to draw error: {}", e);
        }
    }

    fn width(&self) -> usize {
        self.terminal
            .size()
            .map(|size| size.width as usize)
            .unwrap_or(80)
    }
}

impl Screen {
    /// Flattened table lines: (row number, cells, is sub-row).
    fn visible_rows(&self) -> Vec<(Option<usize>, &[String], bool)> {
        let mut lines = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            lines.push((Some(i + 1), row.cells.as_slice(), false));
            if self.show_sub_rows {
                for sub in &row.sub_rows {
                    lines.push((None, sub.cells.as_slice(), true));
                }
            }
        }
        lines
    }

    fn render(&self, f: &mut Frame) {
        let message_lines = if self.message.is_empty() {
            0
        } else {
            (self.message.lines().count() as u16).min(MAX_MESSAGE_LINES)
        };
        let prompt_lines = self.prompt.lines().count() as u16 + 1;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(message_lines),
                Constraint::Length(prompt_lines),
            ])
            .split(f.area());

        self.render_title(f, chunks[0]);
        self.render_table(f, chunks[1]);
        if message_lines > 0 {
            let style = if self.message_is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };
            let message = Paragraph::new(self.message.as_str())
                .style(style)
                .wrap(Wrap { trim: false });
            f.render_widget(message, chunks[2]);
        }
        self.render_prompt(f, chunks[3]);
    }

    fn render_title(&self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let title = Line::from(vec![
            Span::styled(
                "ticketdeck ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(&self.title, Style::default().fg(Color::Cyan)),
        ]);
        f.render_widget(Paragraph::new(title).alignment(Alignment::Center), inner);
    }

    fn render_table(&self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let lines = self.visible_rows();
        let number_width = display_width(&self.rows.len().to_string()).max(1);
        let cells: Vec<Vec<String>> = lines.iter().map(|(_, c, _)| c.to_vec()).collect();
        let mut widths = column_widths(&self.header, &cells, MAX_COLUMN_WIDTH);
        fit_widths(&mut widths, inner.width as usize, number_width);

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let sep_style = Style::default().fg(Color::DarkGray);
        let sub_style = Style::default().fg(Color::DarkGray);

        let mut items = vec![ListItem::new(row_line(
            &" ".repeat(number_width),
            &self.header,
            &widths,
            header_style,
            sep_style,
        ))];
        for (number, cells, is_sub) in lines.iter().skip(self.scroll) {
            let label = match number {
                Some(n) => format!("{:>width$}", n, width = number_width),
                None => format!("{:>width$}", "└", width = number_width),
            };
            let style = if *is_sub { sub_style } else { Style::default() };
            items.push(ListItem::new(row_line(&label, cells, &widths, style, sep_style)));
        }
        f.render_widget(List::new(items), inner);
    }

    fn render_prompt(&self, f: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self
            .prompt
            .lines()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::DarkGray))))
            .collect();
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::raw(self.buffer.as_str()),
        ]));
        f.render_widget(Paragraph::new(lines), area);
    }
}

/// Shrink the summary column (then the widest ones) until the row fits.
fn fit_widths(widths: &mut [usize], available: usize, number_width: usize) {
    let total = |w: &[usize]| number_width + w.iter().sum::<usize>() + w.len() * SEP.chars().count();
    while total(widths) > available {
        let target = match widths.get(1) {
            Some(summary) if *summary > 12 => 1,
            _ => match widths.iter().enumerate().max_by_key(|(_, w)| **w) {
                Some((i, w)) if *w > 3 => i,
                _ => return,
            },
        };
        widths[target] -= 1;
    }
}

fn row_line<'a>(
    label: &str,
    cells: &[String],
    widths: &[usize],
    style: Style,
    sep_style: Style,
) -> Line<'a> {
    let mut spans = vec![Span::styled(label.to_string(), sep_style)];
    for (cell, width) in cells.iter().zip(widths) {
        spans.push(Span::styled(SEP, sep_style));
        let fitted = if display_width(cell) > *width {
            truncate_with_ellipsis(cell, *width)
        } else {
            cell.clone()
        };
        spans.push(Span::styled(pad_to_width(&fitted, *width), style));
    }
    Line::from(spans)
}
