//! Plain-text transcripts of a conversation.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::core::conversation::Conversation;
use crate::core::message::Role;

const USER_PREFIX: &str = "You";

/// Render a conversation the way it reads on screen: user lines prefixed,
/// assistant text as-is, a blank line after every message.
pub fn render(conversation: &Conversation) -> String {
    let mut out = String::new();
    out.push_str(&format!("## {}\n\n", conversation.title));

    for message in &conversation.messages {
        let body = match message.role {
            Role::User => format!("{USER_PREFIX}: {}", message.content),
            Role::Assistant => message.content.clone(),
        };
        for line in body.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Write the transcript to `path`, replacing it atomically.
pub fn export(conversation: &Conversation, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Temp file in the same directory so the rename stays on one filesystem.
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(render(conversation).as_bytes())?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    Ok(())
}
