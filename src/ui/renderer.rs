use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::constants::SIDEBAR_TITLE_WIDTH;
use crate::core::conversation::shorten_for_display;
use crate::ui::state::{Mode, UiState};

const SIDEBAR_WIDTH: u16 = SIDEBAR_TITLE_WIDTH as u16 + 4;
const MAX_INPUT_LINES: u16 = 6;
const SOURCE_PREVIEW_CHARS: usize = 60;

pub fn ui(f: &mut Frame, state: &UiState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(f.area());

    render_sidebar(f, state, columns[0]);

    let input_lines = (state.input.lines().len() as u16).clamp(1, MAX_INPUT_LINES);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(input_lines + 2), // +2 for borders
            Constraint::Length(1),
        ])
        .split(columns[1]);

    render_transcript(f, state, rows[0]);

    let mut input = state.input.clone();
    let input_style = if state.is_thinking() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    input.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(input_style)
            .title("Message (Enter send · Alt+Enter newline)"),
    );
    f.render_widget(&input, rows[1]);

    f.render_widget(Paragraph::new(status_line(state)), rows[2]);

    match &state.mode {
        Mode::Chat => {}
        Mode::Profile(form) => form.render(f),
        Mode::Rename { input, .. } => {
            let area = popup_area(f.area(), 70, 3);
            f.render_widget(Clear, area);
            f.render_widget(input, area);
        }
        Mode::ConfirmDelete { title, .. } => {
            let area = popup_area(f.area(), 60, 5);
            f.render_widget(Clear, area);
            let text = vec![
                Line::from(format!("Delete \"{title}\" permanently?")),
                Line::from(""),
                Line::from(Span::styled(
                    "y to confirm, any other key cancels",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            f.render_widget(
                Paragraph::new(text)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title("Delete")),
                area,
            );
        }
    }
}

fn render_sidebar(f: &mut Frame, state: &UiState, area: Rect) {
    let items: Vec<ListItem> = state
        .sidebar
        .iter()
        .map(|summary| ListItem::new(shorten_for_display(&summary.title, SIDEBAR_TITLE_WIDTH)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Conversations"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    let mut list_state = ListState::default();
    list_state.select(state.active_index());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_transcript(f: &mut Frame, state: &UiState, area: Rect) {
    let title = state
        .transcript
        .as_ref()
        .map(|conversation| conversation.title.clone())
        .unwrap_or_else(|| "Compass".to_string());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);

    let lines = build_transcript_lines(state);
    let total = wrapped_height(&lines, inner.width);
    let max_offset = total.saturating_sub(inner.height);
    let offset = max_offset.saturating_sub(state.scroll_back);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(paragraph, area);
}

pub(crate) fn build_transcript_lines(state: &UiState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let Some(conversation) = &state.transcript else {
        lines.push(Line::from(Span::styled(
            "No conversation. Press Ctrl+N to start one.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    };

    if conversation.is_empty() && !state.is_thinking() {
        lines.push(Line::from(Span::styled(
            "Ask anything about careers, skills or next steps. Ctrl+P fills in your profile.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for message in &conversation.messages {
        let (label, color) = if message.is_user() {
            ("You", Color::Cyan)
        } else {
            ("Advisor", Color::Green)
        };
        lines.push(Line::from(vec![
            Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" · {}", message.display_time()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.extend(
            message
                .content
                .lines()
                .map(|line| Line::from(line.to_string())),
        );
        lines.push(Line::from(""));
    }

    let sources = state.visible_sources();
    if !sources.is_empty() {
        lines.push(Line::from(Span::styled(
            "Strategic context",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));
        for snippet in sources {
            lines.push(Line::from(Span::styled(
                format!("  {}: {}", snippet.source, snippet.preview(SOURCE_PREVIEW_CHARS)),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
    }

    if state.is_thinking() {
        lines.push(Line::from(Span::styled(
            "Advisor is thinking…",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            format!("⚠ {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    lines
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = width as usize;
    let rows: usize = lines
        .iter()
        .map(|line| {
            let columns: usize = line
                .spans
                .iter()
                .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                .sum();
            columns.div_ceil(width).max(1)
        })
        .sum();
    rows.min(u16::MAX as usize) as u16
}

fn status_line(state: &UiState) -> Line<'static> {
    let left = match &state.status {
        Some(notice) => Span::styled(notice.clone(), Style::default().fg(Color::Yellow)),
        None => Span::raw(state.session.phase.label().to_string()),
    };
    Line::from(vec![
        left,
        Span::styled(
            format!(
                " · {} · Ctrl+N new · Ctrl+P profile · Ctrl+C quit",
                state.model
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Centered rectangle of at most `width` by `height` inside `area`.
pub(crate) fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::ConversationStore;
    use crate::core::inference::InferenceError;
    use crate::core::knowledge::KnowledgeBase;
    use crate::core::message::Message;
    use crate::core::profile::ProfileStore;
    use crate::core::prompt::PromptAssembler;
    use crate::core::session::{Event, SessionController};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tempfile::TempDir;

    fn controller(temp_dir: &TempDir) -> SessionController {
        SessionController::new(
            ProfileStore::new(temp_dir.path().join("profile.json")),
            ConversationStore::new(temp_dir.path().join("conversations.json")),
            PromptAssembler::new(20),
            KnowledgeBase::builtin(),
            3,
        )
    }

    fn screen(state: &UiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, state)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn popup_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(popup_area(area, 60, 10), Rect::new(20, 15, 60, 10));
        assert_eq!(popup_area(Rect::new(0, 0, 30, 5), 60, 10), Rect::new(0, 0, 30, 5));
    }

    #[test]
    fn wrapped_height_counts_wide_lines() {
        let lines = vec![Line::from("a".repeat(25)), Line::from(""), Line::from("short")];
        assert_eq!(wrapped_height(&lines, 10), 5);
        assert_eq!(wrapped_height(&lines, 0), 0);
    }

    #[test]
    fn draws_sidebar_and_transcript() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let id = controller.store().create().unwrap().id;
        controller
            .store()
            .append(&id, Message::user("How do I become a data analyst?"))
            .unwrap();
        controller
            .store()
            .append(&id, Message::assistant("Start with SQL and statistics."))
            .unwrap();

        let mut state = UiState::new("llama-test");
        state.apply(&mut controller, Event::Start);
        let text = screen(&state);

        assert!(text.contains("Conversations"));
        assert!(text.contains("How do I become a data..."));
        assert!(text.contains("You ·"));
        assert!(text.contains("Advisor ·"));
        assert!(text.contains("Start with SQL and statistics."));
        assert!(text.contains("llama-test"));
    }

    #[test]
    fn thinking_and_error_lines() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = UiState::new("m");
        state.apply(&mut controller, Event::Start);
        state.apply(&mut controller, Event::Submit("What about nursing?".to_string()));

        let lines: Vec<String> = build_transcript_lines(&state)
            .iter()
            .map(|line| line.to_string())
            .collect();
        assert!(lines.iter().any(|line| line == "Advisor is thinking…"));

        state.apply(
            &mut controller,
            Event::InferenceCompleted(Err(InferenceError::Network("timed out".to_string()))),
        );
        let lines: Vec<String> = build_transcript_lines(&state)
            .iter()
            .map(|line| line.to_string())
            .collect();
        assert!(!lines.iter().any(|line| line == "Advisor is thinking…"));
        assert!(lines.last().unwrap().starts_with("⚠ Could not reach the API:"));
        assert!(lines.iter().any(|line| line == "What about nursing?"));
    }

    #[test]
    fn delete_confirmation_overlay() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = UiState::new("m");
        state.apply(&mut controller, Event::Start);
        state.mode = Mode::ConfirmDelete {
            id: state.session.active.clone().unwrap(),
            title: "Old plans".to_string(),
        };
        assert!(screen(&state).contains("Delete \"Old plans\" permanently?"));
    }
}
