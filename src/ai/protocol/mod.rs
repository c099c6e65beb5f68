//! Tool-Calling Protocol
//!
//! The model acts as a remote function caller. It asks for source through
//! `read_file` and hands back documentation through `save_documentation`;
//! the [`ToolCallingClient`] services both locally, one at a time.
//!
//! ## Modules
//!
//! - `directive`: tolerant recognition of tool directives in free text
//! - `client`: the per-request state machine

pub mod client;
pub mod directive;

pub use client::{
    ClientConfig, ClientEvent, ClientState, RequestOutcome, ToolCallingClient, Workspace,
};
pub use directive::{Reply, parse_reply, parse_tool_calls};

use serde::{Deserialize, Serialize};

use crate::ai::prompt::PromptMessage;

/// A tool invocation recognized in a model reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    ReadFile { path: String },
    SaveDocumentation { path: String, content: String },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => crate::constants::protocol::READ_FILE,
            Self::SaveDocumentation { .. } => crate::constants::protocol::SAVE_DOCUMENTATION,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::ReadFile { path } | Self::SaveDocumentation { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The message history of one documentation request.
///
/// Lives exactly as long as the request; nothing carries over between units.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(prompt: &PromptMessage) -> Self {
        Self {
            messages: vec![
                Message {
                    role: Role::System,
                    content: prompt.system.clone(),
                },
                Message {
                    role: Role::User,
                    content: prompt.user.clone(),
                },
            ],
        }
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Number of model replies so far
    pub fn assistant_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Flatten the non-system messages into one prompt, for backends
    /// that take a single text input.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for message in self.messages.iter().filter(|m| m.role != Role::System) {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            match message.role {
                Role::User if out.is_empty() => out.push_str(&message.content),
                role => {
                    out.push_str(&format!("[{}]\n{}", role.as_str(), message.content));
                }
            }
        }
        out
    }
}
