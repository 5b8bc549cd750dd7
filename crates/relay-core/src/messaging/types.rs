use crate::{
    content::RawContent,
    domain::{ChatId, MessageRef, Sender},
};

/// A message received by the bridge, already stripped of transport types.
///
/// Telegram-specific fields should live in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub sender: Sender,
    /// Message the sender replied to, if any.
    pub reply_to: Option<MessageRef>,
    pub content: RawContent,
}

impl InboundEvent {
    pub fn chat_id(&self) -> ChatId {
        self.sender.chat_id
    }
}
