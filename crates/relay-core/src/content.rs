//! Normalized message content.
//!
//! Every inbound message is reduced to one [`ContentVariant`] before it is
//! resent anywhere. Adding a content kind means touching [`normalize`] and
//! the gateway's `send_variant`, nothing else.

use crate::domain::{FileRef, Sender};

/// Telegram hard limit for a text message body (UTF-16 code units).
pub const TEXT_LIMIT: usize = 4096;
/// Telegram hard limit for a media caption (UTF-16 code units).
pub const CAPTION_LIMIT: usize = 1024;

const UNSUPPORTED_NOTICE: &str = "[Unsupported message type]";
const ADMIN_UNSUPPORTED_NOTICE: &str = "[Admin sent unsupported message type]";

/// Platform-neutral view of everything an inbound message carries.
///
/// Adapters fill in whatever representations the transport provided; `photo`
/// is ordered smallest to largest, as Telegram delivers thumbnail lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawContent {
    pub text: Option<String>,
    pub photo: Vec<FileRef>,
    pub sticker: Option<FileRef>,
    pub document: Option<FileRef>,
    pub audio: Option<FileRef>,
    pub voice: Option<FileRef>,
    pub video: Option<FileRef>,
    pub caption: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentVariant {
    Text { body: String },
    Photo { file: FileRef, caption: String },
    Sticker { file: FileRef },
    Document { file: FileRef, caption: String },
    Audio { file: FileRef, caption: String },
    Voice { file: FileRef, caption: String },
    Video { file: FileRef, caption: String },
    Unsupported,
}

/// Reduce raw content to a single variant. Total: unknown content is `Unsupported`.
pub fn normalize(raw: &RawContent) -> ContentVariant {
    let caption = || raw.caption.clone().unwrap_or_default();

    if let Some(body) = &raw.text {
        return ContentVariant::Text { body: body.clone() };
    }
    if let Some(largest) = raw.photo.last() {
        return ContentVariant::Photo {
            file: largest.clone(),
            caption: caption(),
        };
    }
    if let Some(file) = &raw.sticker {
        return ContentVariant::Sticker { file: file.clone() };
    }
    if let Some(file) = &raw.document {
        return ContentVariant::Document {
            file: file.clone(),
            caption: caption(),
        };
    }
    if let Some(file) = &raw.audio {
        return ContentVariant::Audio {
            file: file.clone(),
            caption: caption(),
        };
    }
    if let Some(file) = &raw.voice {
        return ContentVariant::Voice {
            file: file.clone(),
            caption: caption(),
        };
    }
    if let Some(file) = &raw.video {
        return ContentVariant::Video {
            file: file.clone(),
            caption: caption(),
        };
    }
    ContentVariant::Unsupported
}

impl ContentVariant {
    /// Human-readable kind used in forwarded captions.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentVariant::Text { .. } => "Message",
            ContentVariant::Photo { .. } => "Photo",
            ContentVariant::Sticker { .. } => "Sticker",
            ContentVariant::Document { .. } => "Document",
            ContentVariant::Audio { .. } => "Audio",
            ContentVariant::Voice { .. } => "Voice message",
            ContentVariant::Video { .. } => "Video",
            ContentVariant::Unsupported => "Message",
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            ContentVariant::Photo { caption, .. }
            | ContentVariant::Document { caption, .. }
            | ContentVariant::Audio { caption, .. }
            | ContentVariant::Voice { caption, .. }
            | ContentVariant::Video { caption, .. } => Some(caption),
            _ => None,
        }
    }

    fn with_caption(self, new_caption: String) -> Self {
        let new_caption = truncate_utf16(&new_caption, CAPTION_LIMIT);
        match self {
            ContentVariant::Photo { file, .. } => ContentVariant::Photo {
                file,
                caption: new_caption,
            },
            ContentVariant::Document { file, .. } => ContentVariant::Document {
                file,
                caption: new_caption,
            },
            ContentVariant::Audio { file, .. } => ContentVariant::Audio {
                file,
                caption: new_caption,
            },
            ContentVariant::Voice { file, .. } => ContentVariant::Voice {
                file,
                caption: new_caption,
            },
            ContentVariant::Video { file, .. } => ContentVariant::Video {
                file,
                caption: new_caption,
            },
            other => other,
        }
    }

    /// Variant to send into the admin group, carrying the sender's identity.
    pub fn annotated(self, sender: &Sender) -> ContentVariant {
        let header = format!(
            "📩 {} from {} (ID: {})",
            self.kind(),
            sender.label(),
            sender.chat_id
        );

        match self {
            ContentVariant::Text { body } => ContentVariant::Text {
                body: truncate_utf16(&format!("{header}:\n\n{body}"), TEXT_LIMIT),
            },
            ContentVariant::Unsupported => ContentVariant::Text {
                body: format!("{header}\n{UNSUPPORTED_NOTICE}"),
            },
            // Stickers cannot carry a caption.
            sticker @ ContentVariant::Sticker { .. } => sticker,
            media => {
                let caption = media.caption().unwrap_or_default();
                let full = if caption.is_empty() {
                    header
                } else {
                    format!("{header}\n{caption}")
                };
                media.with_caption(full)
            }
        }
    }

    /// Variant to send back to a user on behalf of the admins.
    ///
    /// `header`, when non-empty, is put on its own line above a text reply.
    pub fn for_reply(self, header: &str) -> ContentVariant {
        match self {
            ContentVariant::Text { body } if !header.is_empty() => ContentVariant::Text {
                body: truncate_utf16(&format!("{header}\n{body}"), TEXT_LIMIT),
            },
            ContentVariant::Text { body } => ContentVariant::Text {
                body: truncate_utf16(&body, TEXT_LIMIT),
            },
            ContentVariant::Unsupported => ContentVariant::Text {
                body: ADMIN_UNSUPPORTED_NOTICE.to_string(),
            },
            other => {
                let caption = other.caption().map(str::to_string);
                match caption {
                    Some(c) => other.with_caption(c),
                    None => other,
                }
            }
        }
    }
}

/// Truncate to at most `max` UTF-16 code units, ending with `…` when cut.
///
/// Telegram measures message and caption lengths in UTF-16 units, so an
/// emoji outside the BMP costs two.
pub fn truncate_utf16(s: &str, max: usize) -> String {
    if s.encode_utf16().count() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub('…'.len_utf16());
    let mut used = 0usize;
    let mut out = String::new();
    for c in s.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}
