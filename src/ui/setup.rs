//! First-run screen shown when the API key variable is missing.
//!
//! The key is typed into a masked field, checked, written to `.env` and set
//! in this process's environment. It is never drawn in clear text.

use std::path::Path;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tracing::info;
use tui_textarea::TextArea;

use crate::core::credentials::{self, ApiKey, CredentialError};
use crate::core::paths::path_display;
use crate::ui::renderer::popup_area;

const MASK: char = '•';

#[derive(Debug, PartialEq)]
pub enum SetupOutcome {
    Continue,
    Submitted(ApiKey),
    Quit,
}

pub struct SetupForm {
    var: String,
    input: TextArea<'static>,
    error: Option<String>,
}

impl SetupForm {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            input: masked_input(),
            error: None,
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> SetupOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => SetupOutcome::Quit,
            KeyCode::Char('c') if ctrl => SetupOutcome::Quit,
            KeyCode::Enter => self.submit(),
            _ => {
                self.input.input(tui_textarea::Input::from(key));
                SetupOutcome::Continue
            }
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.input.insert_str(text.trim());
    }

    fn submit(&mut self) -> SetupOutcome {
        let entered = self.input.lines().join("");
        match credentials::validate(&self.var, &entered) {
            Ok(key) => SetupOutcome::Submitted(key),
            Err(err) => {
                self.error = Some(err.to_string());
                self.input = masked_input();
                SetupOutcome::Continue
            }
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let area = popup_area(f.area(), 72, 14);
        f.render_widget(Clear, area);

        let outer = Block::default()
            .borders(Borders::ALL)
            .title("Compass setup");
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(4),
                Constraint::Length(3),
                Constraint::Length(2),
            ])
            .split(inner);

        let intro = vec![
            Line::from(format!("{} is not set.", self.var)),
            Line::from(""),
            Line::from("Paste your API key below and press Enter. It is saved to .env"),
            Line::from("in this directory and used from then on. Esc quits."),
        ];
        f.render_widget(Paragraph::new(intro).wrap(Wrap { trim: false }), rows[0]);
        f.render_widget(&self.input, rows[1]);

        if let Some(error) = &self.error {
            f.render_widget(
                Paragraph::new(error.as_str())
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true }),
                rows[2],
            );
        }
    }
}

fn masked_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_mask_char(MASK);
    input.set_cursor_line_style(Style::default());
    input.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    input.set_block(Block::default().borders(Borders::ALL).title("API key"));
    input
}

/// Persist an accepted key and export it for this run.
pub fn store_key(env_file: &Path, var: &str, key: &ApiKey) -> Result<(), CredentialError> {
    credentials::store_in_env_file(env_file, var, key)?;
    std::env::set_var(var, key.expose());
    info!(var, file = %path_display(env_file), "API key stored");
    Ok(())
}
