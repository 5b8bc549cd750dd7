//! Conversion of Telegram messages into core inbound events.

use teloxide::types::Message;

use relay_core::{
    content::RawContent,
    domain::{ChatId, FileRef, MessageId, MessageRef, Sender},
    messaging::types::InboundEvent,
};

/// Messages without a sender (channel posts) are not relayed.
pub fn to_inbound_event(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from()?;

    Some(InboundEvent {
        sender: Sender {
            chat_id: ChatId(msg.chat.id.0),
            username: user.username.clone(),
            display_name: Some(user.first_name.clone()),
            is_bot: user.is_bot,
        },
        reply_to: msg.reply_to_message().map(|r| MessageRef {
            chat_id: ChatId(r.chat.id.0),
            message_id: MessageId(r.id.0),
        }),
        content: raw_content(msg),
    })
}

pub fn raw_content(msg: &Message) -> RawContent {
    RawContent {
        text: msg.text().map(str::to_string),
        photo: msg
            .photo()
            .map(|sizes| sizes.iter().map(|p| FileRef::new(p.file.id.clone())).collect())
            .unwrap_or_default(),
        sticker: msg.sticker().map(|s| FileRef::new(s.file.id.clone())),
        document: msg.document().map(|d| FileRef::new(d.file.id.clone())),
        audio: msg.audio().map(|a| FileRef::new(a.file.id.clone())),
        voice: msg.voice().map(|v| FileRef::new(v.file.id.clone())),
        video: msg.video().map(|v| FileRef::new(v.file.id.clone())),
        caption: msg.caption().map(str::to_string),
    }
}
