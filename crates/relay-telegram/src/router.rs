use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::UpdateKind};

use tracing::{debug, info, warn};

use relay_core::{
    config::Config,
    dispatcher::{Relay, RelaySettings},
    messaging::{port::DeliveryGateway, throttled::ThrottledGateway},
    registry::ConversationRegistry,
};

use crate::inbound::to_inbound_event;
use crate::TelegramGateway;

#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

/// Worker queue an update is processed on.
///
/// Private chats keep one queue per user so a conversation stays ordered.
/// Group updates (the admin group) get one queue per replied-to message, so a
/// slow delivery to one user never holds up replies to the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DistributionKey {
    chat: i64,
    thread: Option<i32>,
}

pub fn message_key(msg: &Message) -> DistributionKey {
    let thread = if msg.chat.is_private() {
        None
    } else {
        Some(msg.reply_to_message().map(|r| r.id.0).unwrap_or(msg.id.0))
    };
    DistributionKey {
        chat: msg.chat.id.0,
        thread,
    }
}

fn distribution_key(upd: &Update) -> Option<DistributionKey> {
    match &upd.kind {
        UpdateKind::Message(msg) => Some(message_key(msg)),
        _ => upd.chat().map(|c| DistributionKey {
            chat: c.id.0,
            thread: None,
        }),
    }
}

pub fn build_relay(cfg: &Config, gateway: Arc<dyn DeliveryGateway>) -> Relay {
    let registry = Arc::new(ConversationRegistry::new(
        cfg.registry_capacity,
        cfg.registry_ttl,
    ));
    Relay::new(
        RelaySettings {
            admin_group: cfg.admin_group_id,
            reply_header: cfg.reply_header.clone(),
        },
        registry,
        gateway,
    )
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => info!("relay started: @{}", me.username()),
        Err(e) => warn!(error = %e, "could not fetch bot identity"),
    }
    info!(admin_group = %cfg.admin_group_id, "relaying into admin group");
    info!(
        capacity = cfg.registry_capacity,
        ttl = ?cfg.registry_ttl,
        "conversation registry configured"
    );

    // Throttle in front of the raw gateway; the adapter still retries once on RetryAfter.
    let raw_gateway: Arc<dyn DeliveryGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let gateway: Arc<dyn DeliveryGateway> =
        Arc::new(ThrottledGateway::new(raw_gateway, cfg.throttle));

    let state = Arc::new(AppState {
        relay: build_relay(&cfg, gateway),
    });

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("relay dispatcher"))
        .distribution_function(distribution_key)
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = to_inbound_event(&msg) else {
        return Ok(());
    };

    let outcome = state.relay.handle(event).await;
    debug!(chat = msg.chat.id.0, message = msg.id.0, ?outcome, "event handled");

    Ok(())
}
