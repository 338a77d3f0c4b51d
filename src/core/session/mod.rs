//! Conversation session state machine.
//!
//! The UI and the one-shot CLI both feed [`Event`]s into
//! [`SessionController::handle_event`] and act on the returned [`Effect`]s.
//! The controller never calls the inference endpoint itself; it asks for a
//! request through [`Effect::RequestInference`] and is told the outcome with
//! [`Event::InferenceCompleted`].


use tracing::{debug, info, warn};

use crate::core::conversation::{Conversation, ConversationStore, ConversationSummary, StoreError};
use crate::core::inference::{InferenceClient, InferenceError};
use crate::core::knowledge::KnowledgeBase;
use crate::core::message::Message;
use crate::core::profile::{Profile, ProfileStore};
use crate::core::prompt::{PromptAssembler, PromptPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoActiveConversation,
    ConversationLoaded,
    AwaitingResponse,
    ResponseReady,
    ResponseFailed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::NoActiveConversation => "no conversation",
            Phase::ConversationLoaded => "ready",
            Phase::AwaitingResponse => "thinking",
            Phase::ResponseReady => "response ready",
            Phase::ResponseFailed => "response failed",
        }
    }
}

/// The one request in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Conversation the reply belongs to, even if the user has switched away.
    pub conversation_id: String,
    pub payload: PromptPayload,
}

/// Transient view of what the user is doing. Rebuilt from disk on every start.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub active: Option<String>,
    pub phase: Phase,
    pub pending: Option<PendingRequest>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            active: None,
            phase: Phase::NoActiveConversation,
            pending: None,
        }
    }
}

impl Session {
    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    fn settle(mut self) -> Self {
        self.phase = if self.pending.is_some() {
            Phase::AwaitingResponse
        } else if self.active.is_some() {
            Phase::ConversationLoaded
        } else {
            Phase::NoActiveConversation
        };
        self
    }

    fn transition(mut self, to: Phase) -> Self {
        if self.phase != to {
            debug!(from = ?self.phase, to = ?to, "session phase");
        }
        self.phase = to;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// App start: open the most recent conversation or create the first one.
    Start,
    NewConversation,
    Select(String),
    Submit(String),
    InferenceCompleted(Result<String, InferenceError>),
    Rename { id: String, title: String },
    Delete(String),
    SaveProfile(Profile),
    ResetProfile,
}

/// Work the caller must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Redraw from the stores.
    Render,
    /// Send this prompt and report back with [`Event::InferenceCompleted`].
    RequestInference(PromptPayload),
    /// A failure the user should see. The session stays usable.
    ShowError(String),
    /// A short status line.
    Notice(String),
}

pub struct SessionController {
    profiles: ProfileStore,
    conversations: ConversationStore,
    assembler: PromptAssembler,
    knowledge: KnowledgeBase,
    retrieval_limit: usize,
}

impl SessionController {
    pub fn new(
        profiles: ProfileStore,
        conversations: ConversationStore,
        assembler: PromptAssembler,
        knowledge: KnowledgeBase,
        retrieval_limit: usize,
    ) -> Self {
        Self {
            profiles,
            conversations,
            assembler,
            knowledge,
            retrieval_limit,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profiles.load()
    }

    pub fn conversations(&mut self) -> Vec<ConversationSummary> {
        self.conversations.list_all()
    }

    /// Conversations worth listing: those with messages, plus the active one.
    pub fn sidebar(&mut self, session: &Session) -> Vec<ConversationSummary> {
        let active = session.active.as_deref();
        self.conversations
            .list_all()
            .into_iter()
            .filter(|summary| summary.message_count > 0 || Some(summary.id.as_str()) == active)
            .collect()
    }

    pub fn conversation(&mut self, id: &str) -> Option<Conversation> {
        self.conversations.get(id)
    }

    pub fn active_conversation(&mut self, session: &Session) -> Option<Conversation> {
        session
            .active
            .as_deref()
            .and_then(|id| self.conversations.get(id))
    }

    pub fn store(&mut self) -> &mut ConversationStore {
        &mut self.conversations
    }

    pub fn handle_event(&mut self, session: Session, event: Event) -> (Session, Vec<Effect>) {
        match event {
            Event::Start => self.start(session),
            Event::NewConversation => self.new_conversation(session),
            Event::Select(id) => self.select(session, &id),
            Event::Submit(text) => self.submit(session, &text),
            Event::InferenceCompleted(outcome) => self.complete(session, outcome),
            Event::Rename { id, title } => self.rename(session, &id, &title),
            Event::Delete(id) => self.delete(session, &id),
            Event::SaveProfile(profile) => self.save_profile(session, &profile),
            Event::ResetProfile => self.reset_profile(session),
        }
    }

    /// Submit `text` and drive the inference round-trip to completion.
    pub async fn submit_and_wait(
        &mut self,
        session: Session,
        text: &str,
        client: &dyn InferenceClient,
    ) -> (Session, Vec<Effect>) {
        let (session, mut effects) = self.handle_event(session, Event::Submit(text.to_string()));
        let payload = effects.iter().find_map(|effect| match effect {
            Effect::RequestInference(payload) => Some(payload.clone()),
            _ => None,
        });
        let Some(payload) = payload else {
            return (session, effects);
        };

        let outcome = client.complete(&payload).await;
        let (session, more) = self.handle_event(session, Event::InferenceCompleted(outcome));
        effects.extend(more);
        (session, effects)
    }

    fn start(&mut self, session: Session) -> (Session, Vec<Effect>) {
        match self.conversations.most_recent() {
            Some(id) => {
                info!(id = %id, "resuming conversation");
                let session = Session {
                    active: Some(id),
                    ..session
                };
                (session.settle(), vec![Effect::Render])
            }
            None => self.open_new(session),
        }
    }

    fn new_conversation(&mut self, session: Session) -> (Session, Vec<Effect>) {
        let reusable = self
            .active_conversation(&session)
            .is_some_and(|conversation| conversation.is_empty());
        if reusable {
            return (session.settle(), vec![Effect::Render]);
        }
        self.open_new(session)
    }

    /// Drop a conversation the user walked away from without writing anything.
    fn prune_if_empty(&mut self, id: &str) {
        let empty = self
            .conversations
            .get(id)
            .is_some_and(|conversation| conversation.is_empty());
        if !empty {
            return;
        }
        match self.conversations.delete(id) {
            Ok(_) => debug!(id = %id, "pruned empty conversation"),
            Err(err) => warn!(id = %id, error = %err, "could not prune empty conversation"),
        }
    }

    fn open_new(&mut self, mut session: Session) -> (Session, Vec<Effect>) {
        match self.conversations.create() {
            Ok(conversation) => {
                session.active = Some(conversation.id);
                (session.settle(), vec![Effect::Render])
            }
            Err(err) => (session.settle(), storage_failure("create a conversation", &err)),
        }
    }

    fn select(&mut self, mut session: Session, id: &str) -> (Session, Vec<Effect>) {
        match self.conversations.resolve_id(id) {
            Ok(id) => {
                if let Some(left) = session.active.take().filter(|active| *active != id) {
                    self.prune_if_empty(&left);
                }
                session.active = Some(id);
                (session.settle(), vec![Effect::Render])
            }
            Err(err) => (session.settle(), vec![Effect::ShowError(err.to_string())]),
        }
    }

    fn submit(&mut self, session: Session, text: &str) -> (Session, Vec<Effect>) {
        let text = text.trim();
        if text.is_empty() {
            return (session, Vec::new());
        }
        if session.is_awaiting() {
            debug!("submit ignored while a response is pending");
            return (session, Vec::new());
        }

        let (mut session, mut effects) = if session.active.is_some() {
            (session, Vec::new())
        } else {
            self.open_new(session)
        };
        let Some(id) = session.active.clone() else {
            return (session, effects);
        };

        let conversation = match self.conversations.append(&id, Message::user(text)) {
            Ok(conversation) => conversation,
            Err(err) => {
                effects.extend(storage_failure("save your message", &err));
                return (session.settle(), effects);
            }
        };

        // The new message is the last one; the prompt takes it separately.
        let history = &conversation.messages[..conversation.messages.len() - 1];
        let context = self.knowledge.search(text, self.retrieval_limit);
        let payload = self.assembler.build(&self.profiles.load(), history, text, &context);
        debug!(
            id = %id,
            history = payload.history_len(),
            sources = payload.sources.len(),
            "prompt assembled"
        );

        session.pending = Some(PendingRequest {
            conversation_id: id,
            payload: payload.clone(),
        });
        effects.push(Effect::Render);
        effects.push(Effect::RequestInference(payload));
        (session.transition(Phase::AwaitingResponse), effects)
    }

    fn complete(
        &mut self,
        mut session: Session,
        outcome: Result<String, InferenceError>,
    ) -> (Session, Vec<Effect>) {
        let Some(pending) = session.pending.take() else {
            debug!("inference result with nothing pending");
            return (session.settle(), Vec::new());
        };

        match outcome {
            Ok(reply) => {
                let appended = self
                    .conversations
                    .append(&pending.conversation_id, Message::assistant(reply));
                match appended {
                    Ok(_) => {
                        let session = session.transition(Phase::ResponseReady);
                        (session.settle(), vec![Effect::Render])
                    }
                    Err(err) => {
                        let session = session.transition(Phase::ResponseFailed);
                        (session.settle(), storage_failure("save the reply", &err))
                    }
                }
            }
            Err(err) => {
                warn!(kind = err.kind(), id = %pending.conversation_id, "inference failed");
                let session = session.transition(Phase::ResponseFailed);
                (
                    session.settle(),
                    vec![Effect::Render, Effect::ShowError(err.to_string())],
                )
            }
        }
    }

    fn rename(&mut self, session: Session, id: &str, title: &str) -> (Session, Vec<Effect>) {
        match self.conversations.rename(id, title) {
            Ok(title) => (
                session.settle(),
                vec![Effect::Render, Effect::Notice(format!("Renamed to \"{title}\""))],
            ),
            Err(err) => (session.settle(), storage_failure("rename", &err)),
        }
    }

    fn delete(&mut self, mut session: Session, id: &str) -> (Session, Vec<Effect>) {
        let removed = match self.conversations.delete(id) {
            Ok(removed) => removed,
            Err(err) => return (session.settle(), storage_failure("delete", &err)),
        };
        let notice = Effect::Notice(format!("Deleted \"{}\"", removed.title));

        if session.active.as_deref() != Some(removed.id.as_str()) {
            return (session.settle(), vec![Effect::Render, notice]);
        }
        session.active = None;
        let (session, mut effects) = self.start(session);
        effects.push(notice);
        (session, effects)
    }

    fn save_profile(&mut self, session: Session, profile: &Profile) -> (Session, Vec<Effect>) {
        match self.profiles.save(profile) {
            Ok(()) => (
                session.settle(),
                vec![Effect::Render, Effect::Notice("Profile saved".to_string())],
            ),
            Err(err) => {
                warn!(error = %err, "profile save failed");
                (
                    session.settle(),
                    vec![Effect::ShowError(format!("Could not save profile: {err}"))],
                )
            }
        }
    }

    fn reset_profile(&mut self, session: Session) -> (Session, Vec<Effect>) {
        match self.profiles.reset() {
            Ok(_) => (
                session.settle(),
                vec![Effect::Render, Effect::Notice("Profile reset".to_string())],
            ),
            Err(err) => {
                warn!(error = %err, "profile reset failed");
                (
                    session.settle(),
                    vec![Effect::ShowError(format!("Could not reset profile: {err}"))],
                )
            }
        }
    }
}

fn storage_failure(action: &str, err: &StoreError) -> Vec<Effect> {
    warn!(error = %err, action, "conversation update failed");
    vec![Effect::ShowError(format!("Could not {action}: {err}"))]
}
