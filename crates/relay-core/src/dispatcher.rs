//! Routing of inbound events: user messages go to the admin group, admin
//! replies go back to the user whose forward they answer.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    content::{normalize, ContentVariant},
    domain::{ChatId, MessageRef},
    messaging::{
        port::{send_variant, DeliveryGateway},
        types::InboundEvent,
    },
    registry::{ConversationRegistry, RecordOutcome},
};

/// How an inbound event is handled. Depends only on the event and the admin group id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Sent by an automated account.
    Ignorable,
    /// Reply inside the admin group to the given message.
    AdminReply(MessageRef),
    /// Admin group traffic that is not a reply; never relayed.
    AdminChatter,
    /// Anything from outside the admin group.
    UserMessage,
}

pub fn classify(event: &InboundEvent, admin_group: ChatId) -> EventKind {
    if event.sender.is_bot {
        return EventKind::Ignorable;
    }
    if event.chat_id() == admin_group {
        return match event.reply_to {
            Some(reply_to) => EventKind::AdminReply(reply_to),
            None => EventKind::AdminChatter,
        };
    }
    EventKind::UserMessage
}

/// Terminal result of handling one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored,
    NotRelayed,
    Forwarded {
        source: ChatId,
        admin_message: MessageRef,
    },
    Replied {
        to: ChatId,
    },
    /// Admin replied to a message the registry does not know.
    Unresolved,
    /// The gateway failed; the event is dropped without retry.
    Dropped,
}

#[derive(Clone, Debug)]
pub struct RelaySettings {
    pub admin_group: ChatId,
    /// Optional line put above text replies delivered to users.
    pub reply_header: String,
}

/// The relay itself. Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Relay {
    settings: Arc<RelaySettings>,
    registry: Arc<ConversationRegistry>,
    gateway: Arc<dyn DeliveryGateway>,
}

impl Relay {
    pub fn new(
        settings: RelaySettings,
        registry: Arc<ConversationRegistry>,
        gateway: Arc<dyn DeliveryGateway>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            registry,
            gateway,
        }
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub fn classify(&self, event: &InboundEvent) -> EventKind {
        classify(event, self.settings.admin_group)
    }

    /// Handle one inbound event. Never fails: transport errors are logged and
    /// reported as [`DispatchOutcome::Dropped`].
    pub async fn handle(&self, event: InboundEvent) -> DispatchOutcome {
        match self.classify(&event) {
            EventKind::Ignorable => DispatchOutcome::Ignored,
            EventKind::AdminChatter => DispatchOutcome::NotRelayed,
            EventKind::AdminReply(reply_to) => self.relay_admin_reply(&event, reply_to).await,
            EventKind::UserMessage => self.forward_user_message(&event).await,
        }
    }

    async fn forward_user_message(&self, event: &InboundEvent) -> DispatchOutcome {
        let source = event.chat_id();
        let variant = normalize(&event.content).annotated(&event.sender);

        let admin_message =
            match send_variant(self.gateway.as_ref(), self.settings.admin_group, &variant).await {
                Ok(sent) => sent,
                Err(e) => {
                    error!(source = %source, error = %e, "failed to forward message to admin group");
                    return DispatchOutcome::Dropped;
                }
            };

        // Record before returning so a reply can never race ahead of the mapping.
        if let RecordOutcome::Duplicate { .. } = self.registry.record(admin_message, source) {
            return DispatchOutcome::Dropped;
        }

        info!(
            source = %source,
            admin_message = admin_message.message_id.0,
            kind = variant_kind(&variant),
            "message forwarded to admin group"
        );
        DispatchOutcome::Forwarded {
            source,
            admin_message,
        }
    }

    async fn relay_admin_reply(&self, event: &InboundEvent, reply_to: MessageRef) -> DispatchOutcome {
        let Some(user) = self.registry.resolve(reply_to) else {
            debug!(
                replied_to = reply_to.message_id.0,
                "admin reply does not match a forwarded message"
            );
            return DispatchOutcome::Unresolved;
        };

        let variant = normalize(&event.content).for_reply(&self.settings.reply_header);
        match send_variant(self.gateway.as_ref(), user, &variant).await {
            Ok(_) => {
                info!(user = %user, kind = variant_kind(&variant), "admin reply sent to user");
                DispatchOutcome::Replied { to: user }
            }
            Err(e) => {
                error!(user = %user, error = %e, "failed to send admin reply");
                DispatchOutcome::Dropped
            }
        }
    }
}

fn variant_kind(v: &ContentVariant) -> &'static str {
    match v {
        ContentVariant::Text { .. } => "text",
        ContentVariant::Photo { .. } => "photo",
        ContentVariant::Sticker { .. } => "sticker",
        ContentVariant::Document { .. } => "document",
        ContentVariant::Audio { .. } => "audio",
        ContentVariant::Voice { .. } => "voice",
        ContentVariant::Video { .. } => "video",
        ContentVariant::Unsupported => "unsupported",
    }
}
