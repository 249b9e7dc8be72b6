// Conversation store: chat visibility plus the ordered message log.
//
// The store is a plain owned value. The application loop owns it (through
// `Assistant`) for the whole session; nothing else mutates it.

use chrono::Utc;
use tracing::debug;

use super::message::{Message, MessageId, Sender};

/// Id given to the seeded welcome message.
pub const WELCOME_ID: &str = "welcome";

/// Text of the welcome message when none is configured.
pub const DEFAULT_WELCOME: &str =
    "Hello, I'm your Ataraxis AI oncology assistant. How can I help you today?";

#[derive(Debug, Clone)]
pub struct ConversationStore {
    is_open: bool,
    messages: Vec<Message>,
    /// Sequence number for the next generated id. Never reused.
    next_seq: u64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        ConversationStore::new(DEFAULT_WELCOME)
    }
}

impl ConversationStore {
    /// Create a closed conversation seeded with one assistant welcome message.
    pub fn new(welcome: impl Into<String>) -> Self {
        let welcome = Message {
            id: MessageId::new(WELCOME_ID),
            content: welcome.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
        };
        ConversationStore {
            is_open: false,
            messages: vec![welcome],
            next_seq: 1,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    /// Read-only view of the log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append a new message with a fresh id and the current time.
    pub fn append_message(&mut self, content: impl Into<String>, sender: Sender) -> MessageId {
        let id = MessageId::new(format!("{}-{}", sender.as_str(), self.next_seq));
        self.next_seq += 1;
        self.messages.push(Message {
            id: id.clone(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        });
        id
    }

    /// Replace the content of the most recent assistant message.
    ///
    /// Returns `false` (and changes nothing) when the log holds no assistant
    /// message. Callers append an empty placeholder before streaming into it.
    pub fn replace_last_assistant_content(&mut self, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.is_from_assistant()) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => {
                debug!("no assistant message to update, ignoring");
                false
            }
        }
    }
}
