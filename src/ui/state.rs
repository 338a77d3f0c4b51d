//! Interactive state of the chat screen and key handling.
//!
//! Everything durable lives in the stores behind the [`SessionController`];
//! this struct only mirrors what is on screen and which overlay is open.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders};
use tui_textarea::TextArea;

use crate::core::conversation::{Conversation, ConversationSummary};
use crate::core::knowledge::KnowledgeSnippet;
use crate::core::prompt::PromptPayload;
use crate::core::session::{Effect, Event, Session, SessionController};
use crate::ui::profile_form::{FormOutcome, ProfileForm};

const PAGE_SCROLL: u16 = 10;
const RENAME_TITLE: &str = "Rename (Enter save · empty restores automatic title · Esc cancel)";

pub enum Mode {
    Chat,
    Profile(ProfileForm),
    Rename { id: String, input: TextArea<'static> },
    ConfirmDelete { id: String, title: String },
}

/// What a key press asks the loop to do.
#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Nothing,
    Redraw,
    Dispatch(Event),
    Quit,
}

pub struct UiState {
    pub session: Session,
    pub mode: Mode,
    pub input: TextArea<'static>,
    pub sidebar: Vec<ConversationSummary>,
    pub transcript: Option<Conversation>,
    /// Last failure, shown under the transcript until the next action.
    pub error: Option<String>,
    pub status: Option<String>,
    /// Reference snippets sent with the latest request, keyed by conversation.
    pub sources: Option<(String, Vec<KnowledgeSnippet>)>,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_back: u16,
    pub model: String,
}

impl UiState {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            session: Session::default(),
            mode: Mode::Chat,
            input: chat_input(),
            sidebar: Vec::new(),
            transcript: None,
            error: None,
            status: None,
            sources: None,
            scroll_back: 0,
            model: model.into(),
        }
    }

    /// Feed one event to the controller and apply its effects. Returns the
    /// prompts that must be sent to the endpoint.
    pub fn apply(
        &mut self,
        controller: &mut SessionController,
        event: Event,
    ) -> Vec<PromptPayload> {
        if matches!(
            event,
            Event::Submit(_) | Event::NewConversation | Event::Select(_)
        ) {
            self.error = None;
            self.status = None;
        }

        let session = std::mem::take(&mut self.session);
        let (session, effects) = controller.handle_event(session, event);
        self.session = session;

        let mut requests = Vec::new();
        for effect in effects {
            match effect {
                Effect::Render => self.refresh(controller),
                Effect::RequestInference(payload) => {
                    if let Some(pending) = &self.session.pending {
                        self.sources =
                            Some((pending.conversation_id.clone(), payload.sources.clone()));
                    }
                    requests.push(payload);
                }
                Effect::ShowError(message) => self.error = Some(message),
                Effect::Notice(message) => self.status = Some(message),
            }
        }
        requests
    }

    pub fn refresh(&mut self, controller: &mut SessionController) {
        let previous = self.transcript.as_ref().map(|c| (c.id.clone(), c.messages.len()));
        self.sidebar = controller.sidebar(&self.session);
        self.transcript = controller.active_conversation(&self.session);

        let current = self.transcript.as_ref().map(|c| (c.id.clone(), c.messages.len()));
        if previous != current {
            self.scroll_back = 0;
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        let active = self.session.active.as_deref()?;
        self.sidebar.iter().position(|summary| summary.id == active)
    }

    /// Whether the pending reply belongs to the conversation on screen.
    pub fn is_thinking(&self) -> bool {
        match (&self.session.pending, &self.session.active) {
            (Some(pending), Some(active)) => pending.conversation_id == *active,
            _ => false,
        }
    }

    /// Sources to list under the visible transcript, once its reply arrived.
    pub fn visible_sources(&self) -> &[KnowledgeSnippet] {
        match (&self.sources, &self.transcript) {
            (Some((id, sources)), Some(conversation))
                if *id == conversation.id && !self.is_thinking() =>
            {
                sources
            }
            _ => &[],
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        match &mut self.mode {
            Mode::Chat => {
                self.input.insert_str(text.replace('\r', "\n"));
            }
            Mode::Profile(form) => form.paste(text),
            Mode::Rename { input, .. } => {
                input.insert_str(text.replace(['\r', '\n'], " "));
            }
            Mode::ConfirmDelete { .. } => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, controller: &SessionController) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        match std::mem::replace(&mut self.mode, Mode::Chat) {
            Mode::Chat => self.handle_chat_key(key, controller),
            Mode::Profile(mut form) => match form.handle_key(key) {
                FormOutcome::Continue => {
                    self.mode = Mode::Profile(form);
                    KeyOutcome::Redraw
                }
                FormOutcome::Save(profile) => KeyOutcome::Dispatch(Event::SaveProfile(profile)),
                FormOutcome::Reset => KeyOutcome::Dispatch(Event::ResetProfile),
                FormOutcome::Cancel => KeyOutcome::Redraw,
            },
            Mode::Rename { id, mut input } => match key.code {
                KeyCode::Esc => KeyOutcome::Redraw,
                KeyCode::Enter => KeyOutcome::Dispatch(Event::Rename {
                    id,
                    title: input.lines().join(" "),
                }),
                _ => {
                    input.input(tui_textarea::Input::from(key));
                    self.mode = Mode::Rename { id, input };
                    KeyOutcome::Redraw
                }
            },
            Mode::ConfirmDelete { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => KeyOutcome::Dispatch(Event::Delete(id)),
                _ => {
                    self.status = Some("Delete cancelled".to_string());
                    KeyOutcome::Redraw
                }
            },
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent, controller: &SessionController) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            KeyCode::Enter if alt || shift => {
                self.input.insert_newline();
                KeyOutcome::Redraw
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Char('n') if ctrl => KeyOutcome::Dispatch(Event::NewConversation),
            KeyCode::Up if ctrl => self.select_relative(-1),
            KeyCode::Down if ctrl => self.select_relative(1),
            KeyCode::Char('p') if ctrl => {
                self.mode = Mode::Profile(ProfileForm::from_profile(&controller.profile()));
                KeyOutcome::Redraw
            }
            KeyCode::Char('r') if ctrl => match &self.transcript {
                Some(conversation) => {
                    let mut input = TextArea::new(vec![conversation.title.clone()]);
                    input.move_cursor(tui_textarea::CursorMove::End);
                    input.set_cursor_line_style(Style::default());
                    input.set_block(Block::default().borders(Borders::ALL).title(RENAME_TITLE));
                    self.mode = Mode::Rename {
                        id: conversation.id.clone(),
                        input,
                    };
                    KeyOutcome::Redraw
                }
                None => KeyOutcome::Nothing,
            },
            KeyCode::Char('d') if ctrl => match &self.transcript {
                Some(conversation) => {
                    self.mode = Mode::ConfirmDelete {
                        id: conversation.id.clone(),
                        title: conversation.title.clone(),
                    };
                    KeyOutcome::Redraw
                }
                None => KeyOutcome::Nothing,
            },
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(PAGE_SCROLL);
                KeyOutcome::Redraw
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(PAGE_SCROLL);
                KeyOutcome::Redraw
            }
            _ => {
                if self.input.input(tui_textarea::Input::from(key)) {
                    KeyOutcome::Redraw
                } else {
                    KeyOutcome::Nothing
                }
            }
        }
    }

    fn submit(&mut self) -> KeyOutcome {
        let text = self.input.lines().join("\n");
        if text.trim().is_empty() {
            return KeyOutcome::Nothing;
        }
        if self.session.is_awaiting() {
            self.status = Some("Still waiting for the previous reply".to_string());
            return KeyOutcome::Redraw;
        }
        self.input = chat_input();
        KeyOutcome::Dispatch(Event::Submit(text))
    }

    fn select_relative(&mut self, step: isize) -> KeyOutcome {
        if self.sidebar.is_empty() {
            return KeyOutcome::Nothing;
        }
        let len = self.sidebar.len() as isize;
        let current = self.active_index().map(|i| i as isize).unwrap_or(0);
        let next = (current + step).rem_euclid(len) as usize;
        KeyOutcome::Dispatch(Event::Select(self.sidebar[next].id.clone()))
    }
}

fn chat_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_cursor_line_style(Style::default());
    input.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    input.set_placeholder_text("Ask about careers, skills or next steps…");
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::ConversationStore;
    use crate::core::knowledge::KnowledgeBase;
    use crate::core::message::Message;
    use crate::core::profile::ProfileStore;
    use crate::core::prompt::PromptAssembler;
    use crate::core::session::Phase;
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

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(state: &mut UiState, controller: &SessionController, text: &str) {
        for c in text.chars() {
            state.handle_key(key(KeyCode::Char(c)), controller);
        }
    }

    fn started(controller: &mut SessionController) -> UiState {
        let mut state = UiState::new("test-model");
        assert!(state.apply(controller, Event::Start).is_empty());
        state
    }

    #[test]
    fn enter_submits_and_clears_input() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);

        type_text(&mut state, &controller, "Hi there");
        let outcome = state.handle_key(key(KeyCode::Enter), &controller);
        assert_eq!(outcome, KeyOutcome::Dispatch(Event::Submit("Hi there".to_string())));
        assert_eq!(state.input.lines(), [""]);

        let KeyOutcome::Dispatch(event) = outcome else {
            unreachable!()
        };
        let requests = state.apply(&mut controller, event);
        assert_eq!(requests.len(), 1);
        assert!(state.is_thinking());
        assert_eq!(state.transcript.as_ref().unwrap().messages.len(), 1);
    }

    #[test]
    fn alt_enter_inserts_newline() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);

        type_text(&mut state, &controller, "line one");
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), &controller);
        type_text(&mut state, &controller, "line two");
        assert_eq!(
            state.handle_key(key(KeyCode::Enter), &controller),
            KeyOutcome::Dispatch(Event::Submit("line one\nline two".to_string()))
        );
    }

    #[test]
    fn submit_blocked_while_waiting() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);
        state.apply(&mut controller, Event::Submit("first".to_string()));

        type_text(&mut state, &controller, "second");
        assert_eq!(state.handle_key(key(KeyCode::Enter), &controller), KeyOutcome::Redraw);
        assert_eq!(state.input.lines(), ["second"]);
        assert!(state.status.is_some());
    }

    #[test]
    fn failure_shows_error_line_until_next_submit() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);
        state.apply(&mut controller, Event::Submit("first".to_string()));
        state.apply(
            &mut controller,
            Event::InferenceCompleted(Err(crate::core::inference::InferenceError::Auth(
                "invalid key".to_string(),
            ))),
        );

        assert_eq!(state.session.phase, Phase::ConversationLoaded);
        assert!(state.error.as_deref().unwrap().starts_with("Authentication failed"));
        state.apply(&mut controller, Event::Submit("again".to_string()));
        assert!(state.error.is_none());
    }

    #[test]
    fn ctrl_arrows_cycle_conversations() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let older = controller.store().create().unwrap().id;
        controller.store().append(&older, Message::user("older")).unwrap();
        let newer = controller.store().create().unwrap().id;
        controller.store().append(&newer, Message::user("newer")).unwrap();
        let mut state = started(&mut controller);
        assert_eq!(state.active_index(), Some(0));

        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::CONTROL);
        assert_eq!(
            state.handle_key(down, &controller),
            KeyOutcome::Dispatch(Event::Select(older.clone()))
        );
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::CONTROL);
        assert_eq!(
            state.handle_key(up, &controller),
            KeyOutcome::Dispatch(Event::Select(older))
        );
    }

    #[test]
    fn abandoned_new_conversation_leaves_the_sidebar() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let older = controller.store().create().unwrap().id;
        controller.store().append(&older, Message::user("older")).unwrap();
        let mut state = started(&mut controller);

        let KeyOutcome::Dispatch(event) = state.handle_key(ctrl('n'), &controller) else {
            panic!("Ctrl+N should dispatch");
        };
        state.apply(&mut controller, event);
        assert_eq!(state.sidebar.len(), 2);
        assert_eq!(state.active_index(), Some(0));

        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::CONTROL);
        let KeyOutcome::Dispatch(event) = state.handle_key(down, &controller) else {
            panic!("Ctrl+Down should dispatch");
        };
        state.apply(&mut controller, event);
        assert_eq!(state.session.active.as_deref(), Some(older.as_str()));
        assert_eq!(state.sidebar.len(), 1);
        assert_eq!(state.active_index(), Some(0));
    }

    #[test]
    fn delete_needs_confirmation() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);
        let id = state.session.active.clone().unwrap();

        state.handle_key(ctrl('d'), &controller);
        assert!(matches!(state.mode, Mode::ConfirmDelete { .. }));
        assert_eq!(state.handle_key(key(KeyCode::Char('n')), &controller), KeyOutcome::Redraw);
        assert!(matches!(state.mode, Mode::Chat));

        state.handle_key(ctrl('d'), &controller);
        assert_eq!(
            state.handle_key(key(KeyCode::Char('y')), &controller),
            KeyOutcome::Dispatch(Event::Delete(id))
        );
    }

    #[test]
    fn rename_overlay_dispatches_new_title() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);
        let id = state.session.active.clone().unwrap();

        state.handle_key(ctrl('r'), &controller);
        // Clear the prefilled placeholder title.
        for _ in 0.."New Conversation".len() {
            state.handle_key(key(KeyCode::Backspace), &controller);
        }
        type_text(&mut state, &controller, "Plans");
        let outcome = state.handle_key(key(KeyCode::Enter), &controller);
        assert_eq!(
            outcome,
            KeyOutcome::Dispatch(Event::Rename {
                id,
                title: "Plans".to_string()
            })
        );
        let KeyOutcome::Dispatch(event) = outcome else {
            unreachable!()
        };
        state.apply(&mut controller, event);
        assert_eq!(state.sidebar[0].title, "Plans");
        assert_eq!(state.status.as_deref(), Some("Renamed to \"Plans\""));
    }

    #[test]
    fn profile_overlay_saves_through_controller() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);

        state.handle_key(ctrl('p'), &controller);
        assert!(matches!(state.mode, Mode::Profile(_)));
        type_text(&mut state, &controller, "rust");
        let outcome = state.handle_key(key(KeyCode::Enter), &controller);
        let KeyOutcome::Dispatch(event) = outcome else {
            panic!("expected a dispatch, got {outcome:?}");
        };
        state.apply(&mut controller, event);
        assert!(matches!(state.mode, Mode::Chat));
        assert_eq!(controller.profile().skills_text(), "rust");
    }

    #[test]
    fn page_keys_scroll_back_and_forth() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);

        state.handle_key(key(KeyCode::PageUp), &controller);
        state.handle_key(key(KeyCode::PageUp), &controller);
        assert_eq!(state.scroll_back, 20);
        state.handle_key(key(KeyCode::PageDown), &controller);
        assert_eq!(state.scroll_back, 10);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = controller(&temp_dir);
        let mut state = started(&mut controller);
        state.handle_key(ctrl('p'), &controller);
        assert_eq!(state.handle_key(ctrl('c'), &controller), KeyOutcome::Quit);
    }
}
