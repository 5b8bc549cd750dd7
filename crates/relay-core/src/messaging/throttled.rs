use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    content::ContentVariant,
    domain::{ChatId, MessageRef},
    messaging::port::DeliveryGateway,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound sends (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends into one chat (Telegram 1 msg/sec style limits).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }
}

/// Per-chat limiters survive only while they still hold a future slot.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct PerChatLimiters {
    limiters: HashMap<i64, IntervalLimiter>,
    prune_at: usize,
}

impl Default for PerChatLimiters {
    fn default() -> Self {
        Self {
            limiters: HashMap::new(),
            prune_at: PRUNE_THRESHOLD,
        }
    }
}

impl PerChatLimiters {
    fn reserve_at(&mut self, chat_id: i64, interval: Duration, now: Instant) -> Duration {
        if self.limiters.len() >= self.prune_at {
            // An idle limiter and a fresh one hand out the same slot.
            self.limiters.retain(|_, lim| lim.next > now);
            self.prune_at = (self.limiters.len() * 2).max(PRUNE_THRESHOLD);
        }
        self.limiters
            .entry(chat_id)
            .or_insert_with(|| IntervalLimiter {
                interval,
                next: now,
            })
            .reserve_at(now)
    }

    fn len(&self) -> usize {
        self.limiters.len()
    }
}

/// DeliveryGateway decorator that spaces outbound sends.
///
/// Busy admin groups receive every forward, so the per-chat limit there is
/// the one that actually bites. This reduces Telegram 429s; the adapter still
/// retries once on `RetryAfter`.
pub struct ThrottledGateway {
    inner: Arc<dyn DeliveryGateway>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<PerChatLimiters>,
}

impl ThrottledGateway {
    pub fn new(inner: Arc<dyn DeliveryGateway>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(PerChatLimiters::default()),
        }
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let mut per_chat = self.per_chat.lock().await;
            per_chat.reserve_at(chat_id, self.cfg.per_chat_min_interval, Instant::now())
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl DeliveryGateway for ThrottledGateway {
    async fn send_text(&self, chat_id: ChatId, body: &str) -> Result<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_text(chat_id, body).await
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        variant: &ContentVariant,
        caption: &str,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_media(chat_id, variant, caption).await
    }
}
