//! Conversation history and its on-disk store.
//!
//! The whole document is read into memory and written back in full on every
//! mutation; nothing is buffered between calls. The store assumes it is the
//! only writer but reloads when the file changed underneath it.

mod title;


pub use title::{derive_title, shorten_for_display};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::constants::PLACEHOLDER_TITLE;
use crate::core::message::Message;
use crate::core::storage::{self, StorageError};

/// Where a conversation's current title came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    #[default]
    Placeholder,
    Auto,
    User,
}

const LEGACY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn placeholder_title() -> String {
    PLACEHOLDER_TITLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: String,
    #[serde(default = "placeholder_title", alias = "name")]
    pub title: String,
    #[serde(default)]
    pub title_source: TitleSource,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Local wall-clock stamp written by older documents, read once on load.
    #[serde(default, rename = "time", skip_serializing)]
    legacy_time: Option<String>,
}

impl Conversation {
    fn new(id: String, stamp: DateTime<Utc>) -> Self {
        Self {
            id,
            title: placeholder_title(),
            title_source: TitleSource::Placeholder,
            messages: Vec::new(),
            created_at: stamp,
            updated_at: stamp,
            legacy_time: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|message| message.is_user())
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            updated_at: self.updated_at,
        }
    }

    fn adopt_legacy_fields(&mut self) {
        if self.title_source == TitleSource::Placeholder && self.title != PLACEHOLDER_TITLE {
            self.title_source = if self.first_user_message().is_some() {
                TitleSource::Auto
            } else {
                TitleSource::User
            };
        }

        if let Some(stamp) = self.legacy_time.take().as_deref().and_then(parse_legacy_time) {
            if self.updated_at == DateTime::<Utc>::default() {
                self.updated_at = stamp;
            }
            if self.created_at == DateTime::<Utc>::default() {
                self.created_at = stamp;
            }
        }
    }

    /// Set the title from the first user message unless one was already chosen.
    fn apply_auto_title(&mut self) -> Option<String> {
        if self.title_source != TitleSource::Placeholder {
            return None;
        }
        let title = derive_title(&self.first_user_message()?.content);
        self.title = title.clone();
        self.title_source = TitleSource::Auto;
        Some(title)
    }
}

/// Older documents stored `%Y-%m-%d %H:%M:%S` in local time.
fn parse_legacy_time(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), LEGACY_TIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Listing entry returned by [`ConversationStore::list_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConversationDocument {
    #[serde(default, alias = "sessions")]
    conversations: BTreeMap<String, Conversation>,
}

impl ConversationDocument {
    /// Map keys are authoritative for ids. Conversations from older documents
    /// get their recorded name and time carried into the current fields.
    fn normalize(mut self) -> Self {
        for (id, conversation) in self.conversations.iter_mut() {
            if conversation.id != *id {
                conversation.id = id.clone();
            }
            conversation.adopt_legacy_fields();
        }
        self
    }

    /// A timestamp strictly later than any already recorded, so ordering by
    /// recency stays total even when the clock does not advance between calls.
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let latest = self
            .conversations
            .values()
            .map(|conversation| conversation.updated_at)
            .max();
        match latest {
            Some(latest) if latest >= now => latest + TimeDelta::nanoseconds(1),
            _ => now,
        }
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Errors returned by conversation mutations.
#[derive(Debug)]
pub enum StoreError {
    /// No conversation has the given id.
    NotFound(String),

    /// An id prefix matched more than one conversation.
    Ambiguous(String),

    /// The document could not be persisted.
    Storage(StorageError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Conversation '{id}' not found"),
            StoreError::Ambiguous(prefix) => {
                write!(f, "Conversation id '{prefix}' matches more than one conversation")
            }
            StoreError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::Storage(err)
    }
}

struct CachedDocument {
    document: ConversationDocument,
    modified: Option<SystemTime>,
}

/// Owns the conversation document on disk.
pub struct ConversationStore {
    path: PathBuf,
    cache: Option<CachedDocument>,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&mut self) -> &ConversationDocument {
        let disk_modified = storage::modified_time(&self.path);
        let stale = self
            .cache
            .as_ref()
            .is_some_and(|cached| cached.modified != disk_modified);
        if stale {
            self.cache = None;
        }
        let path = &self.path;
        let cached = self.cache.get_or_insert_with(|| {
            debug!(path = %path.display(), "loading conversation document");
            let document: ConversationDocument = storage::load_or_default(path);
            CachedDocument {
                document: document.normalize(),
                modified: disk_modified,
            }
        });
        &cached.document
    }

    /// Apply `mutator` to a copy of the document and persist it. Nothing is
    /// written when the mutator fails.
    fn mutate<F, T>(&mut self, mutator: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut ConversationDocument) -> Result<T, StoreError>,
    {
        let mut working = self.document().clone();
        let result = mutator(&mut working)?;
        storage::write_document(&self.path, &working)?;
        self.cache = Some(CachedDocument {
            document: working,
            modified: storage::modified_time(&self.path),
        });
        Ok(result)
    }

    /// Every conversation, most recently updated first.
    pub fn list_all(&mut self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<_> = self
            .document()
            .conversations
            .values()
            .map(Conversation::summary)
            .collect();
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    pub fn most_recent(&mut self) -> Option<String> {
        self.list_all().into_iter().next().map(|summary| summary.id)
    }

    pub fn get(&mut self, id: &str) -> Option<Conversation> {
        self.document().conversations.get(id).cloned()
    }

    pub fn contains(&mut self, id: &str) -> bool {
        self.document().conversations.contains_key(id)
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&mut self, prefix: &str) -> Result<String, StoreError> {
        let document = self.document();
        if document.conversations.contains_key(prefix) {
            return Ok(prefix.to_string());
        }
        let mut matches = document
            .conversations
            .keys()
            .filter(|id| !prefix.is_empty() && id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            (Some(_), Some(_)) => Err(StoreError::Ambiguous(prefix.to_string())),
            (None, _) => Err(StoreError::NotFound(prefix.to_string())),
        }
    }

    pub fn create(&mut self) -> Result<Conversation, StoreError> {
        let conversation = self.mutate(|document| {
            let id = Uuid::new_v4().to_string();
            let conversation = Conversation::new(id.clone(), document.next_stamp());
            document.conversations.insert(id, conversation.clone());
            Ok(conversation)
        })?;
        info!(id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    /// Append a message and persist immediately. The first user message of a
    /// conversation also names it, unless the user already renamed it.
    pub fn append(&mut self, id: &str, message: Message) -> Result<Conversation, StoreError> {
        self.mutate(|document| {
            let stamp = document.next_stamp();
            let conversation = document.get_mut(id)?;
            conversation.messages.push(message);
            conversation.updated_at = stamp;
            if let Some(title) = conversation.apply_auto_title() {
                debug!(id, title = %title, "conversation titled");
            }
            Ok(conversation.clone())
        })
    }

    /// Apply the title rule if the conversation is still untitled.
    pub fn auto_title(&mut self, id: &str) -> Result<Option<String>, StoreError> {
        let untitled = match self.document().conversations.get(id) {
            Some(conversation) => {
                conversation.title_source == TitleSource::Placeholder
                    && conversation.first_user_message().is_some()
            }
            None => return Err(StoreError::NotFound(id.to_string())),
        };
        if !untitled {
            return Ok(None);
        }
        self.mutate(|document| Ok(document.get_mut(id)?.apply_auto_title()))
    }

    /// Explicit rename. A blank title hands naming back to the automatic rule.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<String, StoreError> {
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        self.mutate(|document| {
            let conversation = document.get_mut(id)?;
            if title.is_empty() {
                conversation.title = placeholder_title();
                conversation.title_source = TitleSource::Placeholder;
                conversation.apply_auto_title();
            } else {
                conversation.title = title;
                conversation.title_source = TitleSource::User;
            }
            Ok(conversation.title.clone())
        })
    }

    /// Remove a conversation permanently.
    pub fn delete(&mut self, id: &str) -> Result<Conversation, StoreError> {
        let removed = self.mutate(|document| {
            document
                .conversations
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        })?;
        info!(id, "conversation deleted");
        Ok(removed)
    }
}
