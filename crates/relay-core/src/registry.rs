//! Correlation between messages forwarded into the admin group and the user
//! conversations they came from.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::domain::{ChatId, MessageRef};

/// Default number of forwards retained before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// Inserted after dropping the least-recently-forwarded record(s).
    InsertedWithEviction { evicted: usize },
    /// The admin message was already recorded; the existing mapping is kept.
    Duplicate { existing: ChatId },
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    source: ChatId,
    recorded_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    by_admin_ref: HashMap<MessageRef, Entry>,
    // Insertion order; may hold keys already removed by TTL expiry.
    order: VecDeque<MessageRef>,
}

/// Bounded map `admin message -> source conversation`.
///
/// Records are evicted oldest-first once `capacity` is reached, and stop
/// resolving after `ttl` when one is set. Admin replies to evicted or expired
/// forwards are silently unresolvable.
#[derive(Debug)]
pub struct ConversationRegistry {
    capacity: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner>,
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl ConversationRegistry {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().by_admin_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&self, admin_ref: MessageRef, source: ChatId) -> RecordOutcome {
        self.record_at(admin_ref, source, Instant::now())
    }

    pub fn record_at(&self, admin_ref: MessageRef, source: ChatId, now: Instant) -> RecordOutcome {
        let mut inner = self.lock();

        if let Some(existing) = inner.by_admin_ref.get(&admin_ref) {
            let existing = existing.source;
            tracing::warn!(
                admin_message = admin_ref.message_id.0,
                existing = %existing,
                rejected = %source,
                "duplicate forward record rejected"
            );
            return RecordOutcome::Duplicate { existing };
        }

        let mut evicted = 0usize;
        while inner.by_admin_ref.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if inner.by_admin_ref.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, "registry at capacity, evicted oldest forwards");
        }

        inner.by_admin_ref.insert(
            admin_ref,
            Entry {
                source,
                recorded_at: now,
            },
        );
        inner.order.push_back(admin_ref);
        compact_order(&mut inner);

        if evicted > 0 {
            RecordOutcome::InsertedWithEviction { evicted }
        } else {
            RecordOutcome::Inserted
        }
    }

    pub fn resolve(&self, admin_ref: MessageRef) -> Option<ChatId> {
        self.resolve_at(admin_ref, Instant::now())
    }

    pub fn resolve_at(&self, admin_ref: MessageRef, now: Instant) -> Option<ChatId> {
        let mut inner = self.lock();
        let entry = *inner.by_admin_ref.get(&admin_ref)?;

        if let Some(ttl) = self.ttl {
            if now.saturating_duration_since(entry.recorded_at) > ttl {
                inner.by_admin_ref.remove(&admin_ref);
                return None;
            }
        }

        Some(entry.source)
    }

    // Critical sections never leave the map half-updated, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drop stale keys from the order queue once it grows well past the live set.
fn compact_order(inner: &mut Inner) {
    if inner.order.len() <= inner.by_admin_ref.len() * 2 + 64 {
        return;
    }
    let Inner {
        by_admin_ref,
        order,
    } = inner;
    order.retain(|k| by_admin_ref.contains_key(k));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;

    const ADMIN: ChatId = ChatId(-100);

    fn admin_msg(id: i32) -> MessageRef {
        MessageRef {
            chat_id: ADMIN,
            message_id: MessageId(id),
        }
    }

    #[test]
    fn record_then_resolve() {
        let reg = ConversationRegistry::default();
        assert_eq!(reg.record(admin_msg(1), ChatId(7)), RecordOutcome::Inserted);
        assert_eq!(reg.record(admin_msg(2), ChatId(8)), RecordOutcome::Inserted);
        assert_eq!(reg.resolve(admin_msg(1)), Some(ChatId(7)));
        assert_eq!(reg.resolve(admin_msg(2)), Some(ChatId(8)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn unknown_ref_resolves_to_none() {
        let reg = ConversationRegistry::default();
        assert!(reg.is_empty());
        assert_eq!(reg.resolve(admin_msg(99)), None);
    }

    #[test]
    fn duplicate_keeps_original_mapping() {
        let reg = ConversationRegistry::default();
        reg.record(admin_msg(1), ChatId(7));
        assert_eq!(
            reg.record(admin_msg(1), ChatId(8)),
            RecordOutcome::Duplicate {
                existing: ChatId(7)
            }
        );
        assert_eq!(reg.resolve(admin_msg(1)), Some(ChatId(7)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let reg = ConversationRegistry::new(2, None);
        reg.record(admin_msg(1), ChatId(1));
        reg.record(admin_msg(2), ChatId(2));
        assert_eq!(
            reg.record(admin_msg(3), ChatId(3)),
            RecordOutcome::InsertedWithEviction { evicted: 1 }
        );
        assert_eq!(reg.resolve(admin_msg(1)), None);
        assert_eq!(reg.resolve(admin_msg(2)), Some(ChatId(2)));
        assert_eq!(reg.resolve(admin_msg(3)), Some(ChatId(3)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let reg = ConversationRegistry::new(0, None);
        assert_eq!(reg.capacity(), 1);
        reg.record(admin_msg(1), ChatId(1));
        assert_eq!(reg.resolve(admin_msg(1)), Some(ChatId(1)));
    }

    #[test]
    fn expired_records_stop_resolving() {
        let reg = ConversationRegistry::new(10, Some(Duration::from_secs(60)));
        let t0 = Instant::now();
        reg.record_at(admin_msg(1), ChatId(7), t0);

        assert_eq!(
            reg.resolve_at(admin_msg(1), t0 + Duration::from_secs(30)),
            Some(ChatId(7))
        );
        assert_eq!(
            reg.resolve_at(admin_msg(1), t0 + Duration::from_secs(61)),
            None
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn expired_keys_do_not_break_eviction() {
        let reg = ConversationRegistry::new(2, Some(Duration::from_secs(1)));
        let t0 = Instant::now();
        reg.record_at(admin_msg(1), ChatId(1), t0);
        let later = t0 + Duration::from_secs(5);
        assert_eq!(reg.resolve_at(admin_msg(1), later), None);

        reg.record_at(admin_msg(2), ChatId(2), later);
        reg.record_at(admin_msg(3), ChatId(3), later);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.resolve_at(admin_msg(2), later), Some(ChatId(2)));
        assert_eq!(reg.resolve_at(admin_msg(3), later), Some(ChatId(3)));
    }

    #[test]
    fn order_queue_is_compacted() {
        let reg = ConversationRegistry::new(1_000, Some(Duration::from_secs(1)));
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(5);
        for i in 0..500 {
            reg.record_at(admin_msg(i), ChatId(i as i64), t0);
            reg.resolve_at(admin_msg(i), later);
        }
        assert!(reg.lock().order.len() <= 64 + 2);
    }

    #[test]
    fn concurrent_records_never_cross() {
        let reg = std::sync::Arc::new(ConversationRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        reg.record(admin_msg(t * 1_000 + i), ChatId(t as i64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..8 {
            for i in 0..200 {
                assert_eq!(reg.resolve(admin_msg(t * 1_000 + i)), Some(ChatId(t as i64)));
            }
        }
    }
}
