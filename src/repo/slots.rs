#![allow(dead_code)]
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::slot::Slot;

#[derive(Debug, Error)]
pub enum SlotStoreError {
    #[error("no slot covers {0}")]
    NoSlotAt(DateTime<Utc>),
    #[error("window [{0}, {1}) is not fully covered by stored slots")]
    WindowIncomplete(DateTime<Utc>, DateTime<Utc>),
    #[error("cannot overwrite a historical slot at {0}")]
    HistoricalFrozen(DateTime<Utc>),
}

/// Planned/observed slot persistence with idempotent-upsert semantics: a
/// slot that has already been marked `is_historical` (i.e. its `slot_end` is
/// in the past and an observation has been recorded) cannot be replanned.
/// Replaying the same planner transaction twice yields the same stored rows.
#[async_trait::async_trait]
pub trait SlotStore: Send + Sync {
    async fn upsert_plan(&self, slots: Vec<Slot>, now: DateTime<Utc>) -> Result<(), SlotStoreError>;
    async fn record_observation(&self, slot_start: DateTime<Utc>, slot: Slot) -> Result<(), SlotStoreError>;
    async fn get_current_slot(&self, now: DateTime<Utc>) -> Result<Option<Slot>, SlotStoreError>;
    async fn get_slot_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Slot>, SlotStoreError>;
}

/// Default in-memory implementation, keyed by `slot_start` for O(log n)
/// range queries. The `"db"` feature would add a `sqlx`-backed store
/// following `repo/schedules.rs`'s transactional-upsert pattern, persisting
/// the same idempotency guarantee across restarts.
#[derive(Default)]
pub struct InMemorySlotStore {
    slots: RwLock<BTreeMap<DateTime<Utc>, Slot>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SlotStore for InMemorySlotStore {
    /// Only the latest completed planner transaction is ever visible:
    /// callers read through this store, not through intermediate plan state,
    /// so a reader never sees a partially-written horizon.
    async fn upsert_plan(&self, slots: Vec<Slot>, now: DateTime<Utc>) -> Result<(), SlotStoreError> {
        let mut map = self.slots.write().await;
        for slot in &slots {
            if let Some(existing) = map.get(&slot.slot_start) {
                if existing.is_historical {
                    return Err(SlotStoreError::HistoricalFrozen(slot.slot_start));
                }
            }
        }
        for mut slot in slots {
            if slot.slot_end <= now {
                slot.is_historical = true;
            }
            map.insert(slot.slot_start, slot);
        }
        Ok(())
    }

    async fn record_observation(&self, slot_start: DateTime<Utc>, slot: Slot) -> Result<(), SlotStoreError> {
        let mut map = self.slots.write().await;
        map.insert(slot_start, slot);
        Ok(())
    }

    async fn get_current_slot(&self, now: DateTime<Utc>) -> Result<Option<Slot>, SlotStoreError> {
        let map = self.slots.read().await;
        Ok(map
            .range(..=now)
            .next_back()
            .map(|(_, s)| s.clone())
            .filter(|s| s.slot_end > now))
    }

    async fn get_slot_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Slot>, SlotStoreError> {
        let map = self.slots.read().await;
        let window: Vec<Slot> = map.range(start..end).map(|(_, s)| s.clone()).collect();
        let expected = ((end - start).num_minutes() / crate::domain::slot::SLOT_MINUTES) as usize;
        if window.len() != expected {
            return Err(SlotStoreError::WindowIncomplete(start, end));
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn frame(start: DateTime<Utc>, n: usize) -> Vec<Slot> {
        (0..n).map(|i| Slot::new_empty(start + Duration::minutes(15 * i as i64))).collect()
    }

    #[tokio::test]
    async fn get_current_slot_returns_slot_covering_now() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        store.upsert_plan(frame(start, 4), start).await.unwrap();

        let now = start + Duration::minutes(20);
        let current = store.get_current_slot(now).await.unwrap().unwrap();
        assert_eq!(current.slot_start, start + Duration::minutes(15));
    }

    #[tokio::test]
    async fn upsert_rejects_overwriting_historical_slot() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut historical = Slot::new_empty(start);
        historical.is_historical = true;
        store.upsert_plan(vec![historical], start).await.unwrap();

        let result = store.upsert_plan(frame(start, 1), start).await;
        assert!(matches!(result, Err(SlotStoreError::HistoricalFrozen(_))));
    }

    #[tokio::test]
    async fn get_slot_window_errors_when_incomplete() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        store.upsert_plan(frame(start, 2), start).await.unwrap();

        let result = store.get_slot_window(start, start + Duration::minutes(60)).await;
        assert!(matches!(result, Err(SlotStoreError::WindowIncomplete(_, _))));
    }

    #[tokio::test]
    async fn upsert_is_idempotent_for_replayed_plan() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        store.upsert_plan(frame(start, 4), start).await.unwrap();
        store.upsert_plan(frame(start, 4), start).await.unwrap();

        let window = store.get_slot_window(start, start + Duration::minutes(60)).await.unwrap();
        assert_eq!(window.len(), 4);
    }

    #[tokio::test]
    async fn upsert_freezes_slots_that_have_already_ended() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let now = start + Duration::minutes(40);
        store.upsert_plan(frame(start, 4), now).await.unwrap();

        let window = store.get_slot_window(start, start + Duration::minutes(60)).await.unwrap();
        assert!(window[0].is_historical);
        assert!(window[1].is_historical);
        assert!(!window[2].is_historical);
        assert!(!window[3].is_historical);
    }

    #[tokio::test]
    async fn upsert_rejects_replanning_a_slot_that_just_froze() {
        let store = InMemorySlotStore::new();
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let now = start + Duration::minutes(20);
        store.upsert_plan(frame(start, 4), now).await.unwrap();

        let result = store.upsert_plan(frame(start, 4), now).await;
        assert!(matches!(result, Err(SlotStoreError::HistoricalFrozen(_))));
    }
}
