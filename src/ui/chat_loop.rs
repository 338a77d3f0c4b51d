//! Event polling, inference dispatch and redraws for the chat screen.
//!
//! Terminal input arrives on one channel and finished inference calls on
//! another. Every event goes through the [`SessionController`], and the
//! effects it returns decide what gets drawn or sent.

use std::{error::Error, sync::Arc, time::Duration};

use ratatui::crossterm::event::{self, Event as TermEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::app::AppContext;
use crate::core::credentials::{ApiKey, Startup};
use crate::core::inference::{HttpInferenceClient, InferenceClient, InferenceError};
use crate::core::prompt::PromptPayload;
use crate::core::session::{Event, SessionController};
use crate::ui::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::ui::profile_form::ProfileForm;
use crate::ui::renderer::ui;
use crate::ui::setup::{store_key, SetupForm, SetupOutcome};
use crate::ui::state::{KeyOutcome, Mode, UiState};

type InferenceResult = Result<String, InferenceError>;

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<TermEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // Short timeout so the task never blocks the runtime for long.
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

fn spawn_inference(
    client: Arc<dyn InferenceClient>,
    payload: PromptPayload,
    result_tx: mpsc::UnboundedSender<InferenceResult>,
) {
    tokio::spawn(async move {
        let outcome = client.complete(&payload).await;
        // The receiver only goes away when the app is quitting.
        let _ = result_tx.send(outcome);
    });
}

pub async fn run_chat(context: &AppContext) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TermEvent>();
    let reader = spawn_event_reader(event_tx);

    let result = run(&mut terminal, &mut event_rx, context).await;

    reader.abort();
    restore_terminal(&mut terminal)?;
    result
}

async fn run(
    terminal: &mut ChatTerminal,
    event_rx: &mut mpsc::UnboundedReceiver<TermEvent>,
    context: &AppContext,
) -> Result<(), Box<dyn Error>> {
    let api_key = match context.startup() {
        Startup::Ready(key) => key,
        Startup::NeedsSetup { var } => {
            match run_setup(terminal, event_rx, context, &var).await? {
                Some(key) => key,
                None => return Ok(()),
            }
        }
    };

    let http = HttpInferenceClient::new(context.endpoint_settings(), api_key)?;
    let mut state = UiState::new(http.model());
    let client: Arc<dyn InferenceClient> = Arc::new(http);
    let mut controller = context.controller();
    state.apply(&mut controller, Event::Start);
    let profile = controller.profile();
    if profile.is_empty() {
        state.mode = Mode::Profile(ProfileForm::from_profile(&profile));
    }

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<InferenceResult>();

    loop {
        terminal.draw(|f| ui(f, &state))?;

        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(term_event) = maybe_event else {
                    break;
                };
                let quit = handle_terminal_event(
                    &mut state,
                    &mut controller,
                    term_event,
                    &client,
                    &result_tx,
                );
                if quit {
                    break;
                }
            }
            Some(outcome) = result_rx.recv() => {
                let requests = state.apply(&mut controller, Event::InferenceCompleted(outcome));
                dispatch(&client, requests, &result_tx);
            }
        }
    }

    info!("chat closed");
    Ok(())
}

/// Returns true when the user asked to quit.
fn handle_terminal_event(
    state: &mut UiState,
    controller: &mut SessionController,
    term_event: TermEvent,
    client: &Arc<dyn InferenceClient>,
    result_tx: &mpsc::UnboundedSender<InferenceResult>,
) -> bool {
    match term_event {
        TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
            match state.handle_key(key, controller) {
                KeyOutcome::Quit => return true,
                KeyOutcome::Dispatch(event) => {
                    let requests = state.apply(controller, event);
                    dispatch(client, requests, result_tx);
                }
                KeyOutcome::Redraw | KeyOutcome::Nothing => {}
            }
        }
        TermEvent::Paste(text) => state.handle_paste(&text),
        _ => {}
    }
    false
}

fn dispatch(
    client: &Arc<dyn InferenceClient>,
    requests: Vec<PromptPayload>,
    result_tx: &mpsc::UnboundedSender<InferenceResult>,
) {
    for payload in requests {
        spawn_inference(client.clone(), payload, result_tx.clone());
    }
}

/// Collect the API key on screen. `None` means the user quit instead.
async fn run_setup(
    terminal: &mut ChatTerminal,
    event_rx: &mut mpsc::UnboundedReceiver<TermEvent>,
    context: &AppContext,
    var: &str,
) -> Result<Option<ApiKey>, Box<dyn Error>> {
    info!(var, "API key missing, showing setup screen");
    let mut form = SetupForm::new(var);

    loop {
        terminal.draw(|f| form.render(f))?;

        let Some(term_event) = event_rx.recv().await else {
            return Ok(None);
        };
        let outcome = match term_event {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => form.handle_key(key),
            TermEvent::Paste(text) => {
                form.paste(&text);
                SetupOutcome::Continue
            }
            _ => SetupOutcome::Continue,
        };

        match outcome {
            SetupOutcome::Continue => {}
            SetupOutcome::Quit => return Ok(None),
            SetupOutcome::Submitted(key) => match store_key(&context.env_file(), form.var(), &key) {
                Ok(()) => return Ok(Some(key)),
                Err(err) => {
                    warn!(error = %err, "could not store API key");
                    form.set_error(err.to_string());
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::ConversationStore;
    use crate::core::knowledge::KnowledgeBase;
    use crate::core::profile::ProfileStore;
    use crate::core::prompt::PromptAssembler;
    use async_trait::async_trait;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    struct Echo;

    #[async_trait]
    impl InferenceClient for Echo {
        async fn complete(&self, payload: &PromptPayload) -> InferenceResult {
            let last = payload.messages.last().map(|m| m.content.clone());
            Ok(format!("echo: {}", last.unwrap_or_default()))
        }
    }

    fn controller(temp_dir: &TempDir) -> SessionController {
        SessionController::new(
            ProfileStore::new(temp_dir.path().join("profile.json")),
            ConversationStore::new(temp_dir.path().join("conversations.json")),
            PromptAssembler::new(20),
            KnowledgeBase::builtin(),
            3,
        )
    }

    fn press(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    struct Harness {
        _dir: TempDir,
        state: UiState,
        controller: SessionController,
        client: Arc<dyn InferenceClient>,
        result_tx: mpsc::UnboundedSender<InferenceResult>,
    }

    impl Harness {
        fn start() -> (Self, mpsc::UnboundedReceiver<InferenceResult>) {
            let temp_dir = TempDir::new().expect("Failed to create temp directory");
            let mut controller = controller(&temp_dir);
            let (result_tx, result_rx) = mpsc::unbounded_channel();
            let mut state = UiState::new("m");
            state.apply(&mut controller, Event::Start);
            let harness = Self {
                _dir: temp_dir,
                state,
                controller,
                client: Arc::new(Echo),
                result_tx,
            };
            (harness, result_rx)
        }

        fn feed(&mut self, term_event: TermEvent) -> bool {
            handle_terminal_event(
                &mut self.state,
                &mut self.controller,
                term_event,
                &self.client,
                &self.result_tx,
            )
        }
    }

    #[tokio::test]
    async fn typed_message_round_trips_through_spawned_inference() {
        let (mut harness, mut result_rx) = Harness::start();

        for c in "hello".chars() {
            harness.feed(press(KeyCode::Char(c)));
        }
        assert!(!harness.feed(press(KeyCode::Enter)));
        assert!(harness.state.is_thinking());

        let outcome = result_rx.recv().await.expect("inference result");
        harness
            .state
            .apply(&mut harness.controller, Event::InferenceCompleted(outcome));

        let transcript = harness.state.transcript.as_ref().unwrap();
        assert_eq!(transcript.messages.len(), 2);
        assert_eq!(transcript.messages[1].content, "echo: hello");
        assert!(!harness.state.is_thinking());
    }

    #[tokio::test]
    async fn paste_then_ctrl_c_quits() {
        let (mut harness, _result_rx) = Harness::start();

        harness.feed(TermEvent::Paste("line one\nline two".to_string()));
        assert_eq!(harness.state.input.lines(), ["line one", "line two"]);

        let ctrl_c = TermEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(harness.feed(ctrl_c));
    }
}
