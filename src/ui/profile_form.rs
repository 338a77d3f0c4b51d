//! Profile editor overlay.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::core::profile::{parse_list, Education, EducationLevel, Profile};
use crate::ui::renderer::popup_area;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Skills,
    Level,
    StudyField,
    Interests,
}

impl FormField {
    const ORDER: [FormField; 4] = [
        FormField::Skills,
        FormField::Level,
        FormField::StudyField,
        FormField::Interests,
    ];

    fn next(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn title(self) -> &'static str {
        match self {
            FormField::Skills => "Skills (comma-separated)",
            FormField::Level => "Education level (←/→ to change)",
            FormField::StudyField => "Field of study",
            FormField::Interests => "Interests (comma-separated)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Continue,
    Save(Profile),
    Reset,
    Cancel,
}

pub struct ProfileForm {
    skills: TextArea<'static>,
    level: EducationLevel,
    study_field: TextArea<'static>,
    interests: TextArea<'static>,
    focus: FormField,
}

fn single_line(text: String) -> TextArea<'static> {
    let mut textarea = TextArea::new(vec![text]);
    textarea.move_cursor(tui_textarea::CursorMove::End);
    textarea
}

impl ProfileForm {
    pub fn from_profile(profile: &Profile) -> Self {
        let mut form = Self {
            skills: single_line(profile.skills_text()),
            level: profile.education.level,
            study_field: single_line(profile.education.field.clone()),
            interests: single_line(profile.interests_text()),
            focus: FormField::Skills,
        };
        form.restyle();
        form
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn level(&self) -> EducationLevel {
        self.level
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            skills: parse_list(&self.skills.lines().join(",")),
            education: Education {
                level: self.level,
                field: self.study_field.lines().join(" ").trim().to_string(),
            },
            interests: parse_list(&self.interests.lines().join(",")),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Enter => return FormOutcome::Save(self.to_profile()),
            KeyCode::Char('x') if ctrl => return FormOutcome::Reset,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                self.restyle();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.previous();
                self.restyle();
            }
            KeyCode::Left if self.focus == FormField::Level => self.level = self.level.previous(),
            KeyCode::Right | KeyCode::Char(' ') if self.focus == FormField::Level => {
                self.level = self.level.next()
            }
            _ => {
                if let Some(textarea) = self.focused_text_mut() {
                    textarea.input(tui_textarea::Input::from(key));
                }
            }
        }
        FormOutcome::Continue
    }

    pub fn paste(&mut self, text: &str) {
        if let Some(textarea) = self.focused_text_mut() {
            // Fields are single-line.
            textarea.insert_str(text.replace(['\r', '\n'], " "));
        }
    }

    fn focused_text_mut(&mut self) -> Option<&mut TextArea<'static>> {
        match self.focus {
            FormField::Skills => Some(&mut self.skills),
            FormField::Level => None,
            FormField::StudyField => Some(&mut self.study_field),
            FormField::Interests => Some(&mut self.interests),
        }
    }

    fn restyle(&mut self) {
        let focus = self.focus;
        for (field, textarea) in [
            (FormField::Skills, &mut self.skills),
            (FormField::StudyField, &mut self.study_field),
            (FormField::Interests, &mut self.interests),
        ] {
            textarea.set_block(field_block(field, field == focus));
            textarea.set_cursor_line_style(Style::default());
            let cursor = if field == focus {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            textarea.set_cursor_style(cursor);
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let area = popup_area(f.area(), 64, 16);
        f.render_widget(Clear, area);

        let outer = Block::default()
            .borders(Borders::ALL)
            .title("Profile (Enter save · Ctrl+X reset · Esc cancel)");
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 4])
            .split(inner);

        f.render_widget(&self.skills, rows[0]);
        f.render_widget(self.level_widget(), rows[1]);
        f.render_widget(&self.study_field, rows[2]);
        f.render_widget(&self.interests, rows[3]);
    }

    fn level_widget(&self) -> Paragraph<'static> {
        let focused = self.focus == FormField::Level;
        let line = Line::from(vec![
            Span::styled("◀ ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.level.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ▶", Style::default().fg(Color::DarkGray)),
        ]);
        Paragraph::new(line).block(field_block(FormField::Level, focused))
    }
}

fn field_block(field: FormField, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(field.title())
}
