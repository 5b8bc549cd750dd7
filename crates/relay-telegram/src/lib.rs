//! Telegram adapter (teloxide).
//!
//! This crate implements the `relay-core` DeliveryGateway over the Telegram
//! Bot API and feeds incoming updates into the core `Relay`.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

pub mod inbound;
pub mod router;

use relay_core::{
    content::ContentVariant,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::port::DeliveryGateway,
    Result,
};

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn sent_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(wait = ?d, "telegram flood limit hit, retrying once");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl DeliveryGateway for TelegramGateway {
    async fn send_text(&self, chat_id: ChatId, body: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), body.to_string()))
            .await?;
        Ok(Self::sent_ref(chat_id, &msg))
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        variant: &ContentVariant,
        caption: &str,
    ) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let has_caption = !caption.is_empty();

        let msg = match variant {
            ContentVariant::Photo { file, .. } => {
                self.with_retry(|| {
                    let req = self.bot.send_photo(chat, InputFile::file_id(file.as_str()));
                    if has_caption {
                        req.caption(caption.to_string())
                    } else {
                        req
                    }
                })
                .await?
            }
            ContentVariant::Sticker { file } => {
                self.with_retry(|| self.bot.send_sticker(chat, InputFile::file_id(file.as_str())))
                    .await?
            }
            ContentVariant::Document { file, .. } => {
                self.with_retry(|| {
                    let req = self
                        .bot
                        .send_document(chat, InputFile::file_id(file.as_str()));
                    if has_caption {
                        req.caption(caption.to_string())
                    } else {
                        req
                    }
                })
                .await?
            }
            ContentVariant::Audio { file, .. } => {
                self.with_retry(|| {
                    let req = self.bot.send_audio(chat, InputFile::file_id(file.as_str()));
                    if has_caption {
                        req.caption(caption.to_string())
                    } else {
                        req
                    }
                })
                .await?
            }
            ContentVariant::Voice { file, .. } => {
                self.with_retry(|| {
                    let req = self.bot.send_voice(chat, InputFile::file_id(file.as_str()));
                    if has_caption {
                        req.caption(caption.to_string())
                    } else {
                        req
                    }
                })
                .await?
            }
            ContentVariant::Video { file, .. } => {
                self.with_retry(|| {
                    let req = self.bot.send_video(chat, InputFile::file_id(file.as_str()));
                    if has_caption {
                        req.caption(caption.to_string())
                    } else {
                        req
                    }
                })
                .await?
            }
            ContentVariant::Text { body } => return self.send_text(chat_id, body).await,
            ContentVariant::Unsupported => {
                return Err(Error::Transport(
                    "unsupported content cannot be sent as media".to_string(),
                ))
            }
        };

        Ok(Self::sent_ref(chat_id, &msg))
    }
}
