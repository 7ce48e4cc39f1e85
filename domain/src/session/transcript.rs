//! Transcript: the ordered message log of one orchestration run.
//!
//! The transcript is append-only. A `Tool` reply is only accepted when its
//! `tool_call_id` is carried by an earlier assistant message. Answering the
//! same id more than once is allowed, since providers occasionally repeat an
//! id within one turn. The single in-place rewrite is
//! [`Transcript::detach_tool_calls`], used when a tool answers with an image.

use super::entities::{Message, Role};
use crate::core::error::DomainError;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    /// Requested call ids still waiting for a reply
    pending: HashSet<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript from existing messages, validating tool replies.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, DomainError> {
        let mut transcript = Self::new();
        transcript.extend(messages)?;
        Ok(transcript)
    }

    /// Append one message.
    pub fn push(&mut self, message: Message) -> Result<(), DomainError> {
        match message.role {
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(DomainError::MissingToolCallId)?;
                if !self.messages.iter().any(|m| m.requested(id)) {
                    return Err(DomainError::OrphanToolReply(id.to_string()));
                }
                self.pending.remove(id);
            }
            Role::Assistant => {
                if let Some(calls) = &message.tool_calls {
                    self.pending.extend(calls.iter().map(|c| c.id.clone()));
                }
            }
            Role::System | Role::User => {}
        }
        self.messages.push(message);
        Ok(())
    }

    /// Append messages in order, stopping at the first invalid one.
    pub fn extend(
        &mut self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<(), DomainError> {
        for message in messages {
            self.push(message)?;
        }
        Ok(())
    }

    /// Remove the given call ids from the assistant messages that requested them.
    ///
    /// An assistant message left with no calls becomes a plain-text message.
    /// Returns the number of messages that were touched.
    pub fn detach_tool_calls(&mut self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut touched = 0;
        for message in self.messages.iter_mut().rev() {
            if message.role != Role::Assistant {
                continue;
            }
            let Some(calls) = message.tool_calls.as_mut() else {
                continue;
            };
            let before = calls.len();
            calls.retain(|c| !ids.contains(&c.id));
            if calls.len() == before {
                continue;
            }
            touched += 1;
            if calls.is_empty() {
                message.tool_calls = None;
            }
        }
        for id in ids {
            self.pending.remove(id);
        }
        touched
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent assistant message that has any
    pub fn last_assistant_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text)
            .find(|t| !t.is_empty())
    }

    /// Requested call ids that have not been answered
    pub fn unanswered(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }
}
