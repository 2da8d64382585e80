use serde::{Deserialize, Serialize};

use crate::chat::repo_types::{Chat, ChatMessage};

pub const MESSAGE_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

/// Polling cursor: RFC 3339 timestamp of the newest message already seen.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub after: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatThread {
    pub chat: Chat,
    pub messages: Vec<ChatMessage>,
}
