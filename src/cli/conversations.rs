//! Conversation commands that work on the stored document directly.

use chrono::Local;
use std::error::Error;
use std::path::Path;

use crate::core::conversation::{ConversationStore, ConversationSummary};
use crate::core::paths::path_display;
use crate::core::transcript;

const ID_COLUMN: usize = 8;

pub fn format_list(summaries: &[ConversationSummary]) -> String {
    if summaries.is_empty() {
        return "No conversations yet. Start one with 'compass' or 'compass ask'.".to_string();
    }

    summaries
        .iter()
        .map(|summary| {
            let short_id: String = summary.id.chars().take(ID_COLUMN).collect();
            let updated = summary
                .updated_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M");
            let noun = if summary.message_count == 1 {
                "message"
            } else {
                "messages"
            };
            format!(
                "{short_id}  {updated}  {:>3} {noun:<8}  {}",
                summary.message_count, summary.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn list(store: &mut ConversationStore) {
    println!("{}", format_list(&store.list_all()));
}

pub fn show(store: &mut ConversationStore, id: &str) -> Result<(), Box<dyn Error>> {
    let id = store.resolve_id(id)?;
    let conversation = store.get(&id).ok_or("conversation vanished while reading")?;
    print!("{}", transcript::render(&conversation));
    Ok(())
}

pub fn rename(
    store: &mut ConversationStore,
    id: &str,
    title: &[String],
) -> Result<(), Box<dyn Error>> {
    let id = store.resolve_id(id)?;
    let title = store.rename(&id, &title.join(" "))?;
    println!("✅ Renamed conversation to: {title}");
    Ok(())
}

pub fn delete(store: &mut ConversationStore, id: &str) -> Result<(), Box<dyn Error>> {
    let id = store.resolve_id(id)?;
    let removed = store.delete(&id)?;
    println!("🗑️  Deleted \"{}\"", removed.title);
    Ok(())
}

pub fn export(store: &mut ConversationStore, id: &str, file: &Path) -> Result<(), Box<dyn Error>> {
    let id = store.resolve_id(id)?;
    let conversation = store.get(&id).ok_or("conversation vanished while reading")?;
    transcript::export(&conversation, file)?;
    println!("✅ Exported \"{}\" to {}", conversation.title, path_display(file));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use tempfile::TempDir;

    #[test]
    fn empty_list_has_hint() {
        assert!(format_list(&[]).starts_with("No conversations yet."));
    }

    #[test]
    fn list_rows_show_short_id_count_and_title() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = ConversationStore::new(temp_dir.path().join("conversations.json"));
        let id = store.create().unwrap().id;
        store
            .append(&id, Message::user("Should I learn Rust?"))
            .unwrap();

        let listing = format_list(&store.list_all());
        let row = listing.lines().next().unwrap();
        assert!(row.starts_with(&id[..ID_COLUMN]));
        assert!(row.contains("  1 message "));
        assert!(row.ends_with("Should I learn Rust?"));
    }

    #[test]
    fn commands_accept_id_prefixes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = ConversationStore::new(temp_dir.path().join("conversations.json"));
        let id = store.create().unwrap().id;
        let prefix = &id[..6];

        rename(&mut store, prefix, &["Data".to_string(), "careers".to_string()]).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Data careers");

        let target = temp_dir.path().join("out.md");
        export(&mut store, prefix, &target).unwrap();
        assert!(target.exists());

        delete(&mut store, prefix).unwrap();
        assert!(store.list_all().is_empty());
        assert!(show(&mut store, prefix).is_err());
    }
}
