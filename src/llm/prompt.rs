//! Prompt assembly
//!
//! Turns an action kind plus the current formatted transcript into the
//! ordered role-tagged messages a provider expects. Persona and system
//! text are supplied at construction; reading them from disk is the
//! hosting process's concern.

use super::chat::ChatMessage;
use std::fmt::Write as _;

/// What the caller wants from the model
#[derive(Debug, Clone)]
pub enum RequestKind {
    /// An explicit instruction typed or selected by the user
    Message { instruction: String },
    /// Suggest the next reply for the local user
    Assist,
    /// Propose a follow-up question to keep the conversation moving
    Followup,
}

impl RequestKind {
    fn task_text(&self) -> &str {
        match self {
            RequestKind::Message { instruction } => instruction,
            RequestKind::Assist => {
                "Suggest the most helpful reply 'Me' could give next, \
                 grounded in the conversation so far."
            }
            RequestKind::Followup => {
                "Propose one concise follow-up question 'Me' could ask to \
                 move the conversation forward."
            }
        }
    }
}

/// Builds the ordered messages for a provider request
pub trait PromptBuilder: Send + Sync {
    /// Assemble the system + user messages for a one-shot request
    fn build_request(
        &self,
        kind: &RequestKind,
        formatted_log: &str,
        has_image: bool,
    ) -> Vec<ChatMessage>;

    /// The bare system prompt, used by the streaming path
    fn system_prompt(&self) -> String;
}

/// Default prompt builder carrying persona and system text in memory
pub struct PersonaPromptBuilder {
    system_text: String,
    persona_text: String,
}

impl PersonaPromptBuilder {
    pub fn new(system_text: impl Into<String>, persona_text: impl Into<String>) -> Self {
        Self {
            system_text: system_text.into(),
            persona_text: persona_text.into(),
        }
    }
}

impl PromptBuilder for PersonaPromptBuilder {
    fn build_request(
        &self,
        kind: &RequestKind,
        formatted_log: &str,
        has_image: bool,
    ) -> Vec<ChatMessage> {
        let mut system = String::new();
        let _ = writeln!(system, "--- SYSTEM INSTRUCTIONS ---");
        let _ = writeln!(system, "{}", self.system_text);
        let _ = writeln!(system, "--- USER PERSONA (ME) ---");
        let _ = writeln!(system, "{}", self.persona_text);

        let mut user = String::new();
        let _ = writeln!(user, "--- CURRENT DIALOGUE TRANSCRIPT ---");
        let _ = writeln!(user, "{formatted_log}");
        if has_image {
            let _ = writeln!(user, "--- ATTACHED VISUAL CONTEXT ---");
            let _ = writeln!(user, "A screenshot of the user's screen is attached.");
        }
        let _ = writeln!(user, "--- YOUR TASK ---");
        let _ = writeln!(user, "{}", kind.task_text());
        let _ = writeln!(user, "--- GENERATE NEXT RESPONSE FOR 'ME' NOW ---");

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    fn system_prompt(&self) -> String {
        self.system_text.clone()
    }
}
