//! Chat-completion collaborator
//!
//! The workflow only needs "messages in, text out". `OpenAiClient` talks to an
//! OpenAI-compatible HTTP endpoint; `ScriptedClient` replays queued responses
//! and records what it was asked.

mod openai;
mod scripted;

pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;

use crate::error::LabResult;
use crate::models::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// One completion call: an ordered history plus an optional system prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system: None,
        }
    }

    /// A request made of a single user message
    pub fn prompt(content: impl Into<String>) -> Self {
        Self::new(vec![Message::user(content)])
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Messages as sent on the wire, system prompt first
    pub fn wire_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = self.system.as_ref().filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the assistant text for the request. Failures are never retried here.
    async fn complete(&self, request: CompletionRequest) -> LabResult<String>;
}

pub type SharedCompletionClient = Arc<dyn CompletionClient>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_wire_messages_prepend_system() {
        let request = CompletionRequest::prompt("Hello").with_system("Be brief");
        let wire = request.wire_messages();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, Role::System);
        assert_eq!(wire[0].content, "Be brief");
        assert_eq!(wire[1].role, Role::User);
    }

    #[test]
    fn test_wire_messages_skip_blank_system() {
        let request = CompletionRequest::prompt("Hello").with_system("  ");
        assert_eq!(request.wire_messages().len(), 1);
    }
}
