use std::fmt;

/// Telegram chat id (numeric). A user's private conversation or the admin group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram message id (numeric), scoped to its chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Opaque transport reference to already-uploaded content (Telegram `file_id`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileRef(pub String);

impl FileRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Who sent an inbound message, and from which conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    /// Label shown to admins: `@username`, else the display name, else `Unknown`.
    pub fn label(&self) -> String {
        if let Some(u) = self.username.as_deref().filter(|u| !u.trim().is_empty()) {
            return format!("@{u}");
        }
        match self.display_name.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => "Unknown".to_string(),
        }
    }
}
