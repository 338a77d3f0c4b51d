//! Shared constants used across the application

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Prior messages sent along with each request; older ones are dropped.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 3;

pub const PLACEHOLDER_TITLE: &str = "New Conversation";
/// Grapheme clusters kept when deriving a title from the first question.
pub const TITLE_MAX_GRAPHEMES: usize = 30;
/// Display columns available for a title in the sidebar.
pub const SIDEBAR_TITLE_WIDTH: usize = 25;

pub const PROFILE_FILE: &str = "profile.json";
pub const CONVERSATIONS_FILE: &str = "conversations.json";
pub const LOG_FILE: &str = "compass.log";
pub const KNOWLEDGE_DIR: &str = "knowledge";
