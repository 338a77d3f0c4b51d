//! Builds the request sent to the inference endpoint.

use crate::api::ChatMessage;
use crate::core::knowledge::KnowledgeSnippet;
use crate::core::message::Message;
use crate::core::profile::Profile;

const ASSISTANT_ROLE: &str = "You are a Technical AI Career Guidance Assistant.";

const GUIDANCE_RULES: &str = "Rules:
1. Provide structured, clear, and encouraging guidance.
2. Use professional typography: bullet points for steps and skills.
3. Tailor recommendations specifically to the user's provided profile.
4. Maintain a calm, neutral, and helpful tone.";

/// Everything needed for one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    /// System instruction, trailing history, then the new user message.
    pub messages: Vec<ChatMessage>,
    /// Knowledge snippets folded into the system instruction.
    pub sources: Vec<KnowledgeSnippet>,
}

impl PromptPayload {
    /// Number of prior transcript messages carried in the request.
    pub fn history_len(&self) -> usize {
        self.messages.len().saturating_sub(2)
    }
}

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    history_window: usize,
}

impl PromptAssembler {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    pub fn build(
        &self,
        profile: &Profile,
        history: &[Message],
        new_user_message: &str,
        context: &[KnowledgeSnippet],
    ) -> PromptPayload {
        let mut messages = Vec::with_capacity(self.history_window.min(history.len()) + 2);
        messages.push(ChatMessage::system(system_instruction(profile, context)));

        let skip = history.len().saturating_sub(self.history_window);
        messages.extend(history[skip..].iter().map(Message::to_api));

        messages.push(ChatMessage::user(new_user_message));

        PromptPayload {
            messages,
            sources: context.to_vec(),
        }
    }
}

fn system_instruction(profile: &Profile, context: &[KnowledgeSnippet]) -> String {
    let mut sections = vec![ASSISTANT_ROLE.to_string()];

    if let Some(profile_line) = profile.context_line() {
        sections.push(profile_line);
    }

    if !context.is_empty() {
        let reference = context
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!(
            "Use the following context to provide professional, mentor-grade advice:\n{reference}"
        ));
    }

    sections.push(GUIDANCE_RULES.to_string());
    sections.join("\n\n")
}
