//! TUI-less "ask" command

use std::error::Error;

use crate::core::app::AppContext;
use crate::core::credentials::{self, CredentialError};
use crate::core::inference::{HttpInferenceClient, InferenceClient};
use crate::core::session::{Effect, Event, Session, SessionController};

/// Instructions printed when the API key variable is missing.
pub fn setup_instructions(err: &CredentialError) -> String {
    format!(
        "❌ {err}.\n\n\
         💡 Quick fixes:\n  \
         • Run 'compass' to open the setup screen and paste your key\n  \
         • Or export the variable in your shell"
    )
}

pub async fn run_ask(
    context: &AppContext,
    prompt: &[String],
    new: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: compass ask <prompt>");
        std::process::exit(2);
    }

    let key = match credentials::require(context.api_key_env()) {
        Ok(key) => key,
        Err(err) => {
            eprintln!("{}", setup_instructions(&err));
            std::process::exit(1);
        }
    };
    let client = HttpInferenceClient::new(context.endpoint_settings(), key)?;
    let mut controller = context.controller();

    match ask(&mut controller, &prompt, new, &client).await {
        Ok(reply) => {
            println!("{reply}");
            Ok(())
        }
        Err(message) => {
            eprintln!("❌ {message}");
            std::process::exit(1);
        }
    }
}

/// One round-trip through the session controller; returns the reply text or
/// the first error the controller reported.
pub async fn ask(
    controller: &mut SessionController,
    prompt: &str,
    new: bool,
    client: &dyn InferenceClient,
) -> Result<String, String> {
    let mut errors = Vec::new();
    let mut apply = |(session, effects): (Session, Vec<Effect>)| {
        errors.extend(effects.into_iter().filter_map(|effect| match effect {
            Effect::ShowError(message) => Some(message),
            _ => None,
        }));
        session
    };

    let session = apply(controller.handle_event(Session::default(), Event::Start));
    let session = if new {
        apply(controller.handle_event(session, Event::NewConversation))
    } else {
        session
    };
    let session = apply(controller.submit_and_wait(session, prompt, client).await);

    if let Some(message) = errors.into_iter().next() {
        return Err(message);
    }
    controller
        .active_conversation(&session)
        .and_then(|conversation| conversation.messages.last().cloned())
        .filter(|message| message.is_assistant())
        .map(|message| message.content)
        .ok_or_else(|| "No reply was recorded".to_string())
}
