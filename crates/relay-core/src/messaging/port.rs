use async_trait::async_trait;

use crate::{
    content::ContentVariant,
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound port the relay sends through.
///
/// A successful return means the transport accepted the message and the
/// returned [`MessageRef`] can be used to correlate later replies to it.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, body: &str) -> Result<MessageRef>;

    /// Send a media variant. `variant` is never `Text` or `Unsupported`.
    async fn send_media(
        &self,
        chat_id: ChatId,
        variant: &ContentVariant,
        caption: &str,
    ) -> Result<MessageRef>;
}

/// Route a normalized variant to the matching gateway call.
pub async fn send_variant(
    gateway: &dyn DeliveryGateway,
    chat_id: ChatId,
    variant: &ContentVariant,
) -> Result<MessageRef> {
    match variant {
        ContentVariant::Text { body } => gateway.send_text(chat_id, body).await,
        ContentVariant::Unsupported => {
            // Callers convert this to a notice first; keep the gateway total anyway.
            gateway
                .send_text(chat_id, "[Unsupported message type]")
                .await
        }
        media => {
            let caption = media.caption().unwrap_or_default();
            gateway.send_media(chat_id, media, caption).await
        }
    }
}
