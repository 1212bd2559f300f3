//! The hormone bus: a typed, in-process publish/subscribe channel that
//! every organ uses to announce state changes and react to each other's.
//!
//! Two delivery modes exist. `Instant` events dispatch to all subscribers
//! immediately, in parallel, and the emitter awaits every subscriber
//! before returning — so a cascade of re-emitted events converges before
//! control returns to the caller. `SlowRelease` events are queued and only
//! dispatched when [`HormoneBus::flush_slow_release`] is called, which the
//! tick scheduler does once at the end of every tick.
//!
//! A cascade-depth counter bounds runaway re-emission: an event whose
//! `depth` exceeds `max_cascade_depth` is recorded in history (so
//! introspection still sees it happened) but not dispatched to
//! subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::BusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HormoneKind {
    Instant,
    SlowRelease,
}

#[derive(Debug, Clone)]
pub struct Hormone {
    pub id: String,
    pub name: String,
    pub payload: Value,
    pub emitter: String,
    pub kind: HormoneKind,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
}

impl Hormone {
    pub fn new(name: impl Into<String>, emitter: impl Into<String>, payload: Value) -> Self {
        Self {
            id: crate::domain::new_id(),
            name: name.into(),
            payload,
            emitter: emitter.into(),
            kind: HormoneKind::Instant,
            depth: 0,
            created_at: Utc::now(),
        }
    }

    pub fn slow_release(mut self) -> Self {
        self.kind = HormoneKind::SlowRelease;
        self
    }

    fn child(&self, name: impl Into<String>, emitter: impl Into<String>, payload: Value) -> Self {
        Self {
            id: crate::domain::new_id(),
            name: name.into(),
            payload,
            emitter: emitter.into(),
            kind: HormoneKind::Instant,
            depth: self.depth + 1,
            created_at: Utc::now(),
        }
    }
}

pub type Subscriber = Arc<dyn Fn(Hormone) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct HormoneBus {
    max_cascade_depth: u32,
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    history: RwLock<Vec<Hormone>>,
    pending_slow_release: RwLock<Vec<Hormone>>,
}

impl HormoneBus {
    pub fn new(max_cascade_depth: u32) -> Self {
        Self {
            max_cascade_depth,
            subscribers: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            pending_slow_release: RwLock::new(Vec::new()),
        }
    }

    pub async fn subscribe(&self, name: impl Into<String>, callback: Subscriber) {
        self.subscribers
            .write()
            .await
            .entry(name.into())
            .or_default()
            .push(callback);
    }

    /// Emit a hormone. History is appended before dispatch, so introspection
    /// observes the full record even for dropped (too-deep) events.
    pub async fn emit(&self, hormone: Hormone) -> Result<(), BusError> {
        self.history.write().await.push(hormone.clone());

        if hormone.depth > self.max_cascade_depth {
            tracing::warn!(
                event = %hormone.name,
                depth = hormone.depth,
                max = self.max_cascade_depth,
                "cascade depth exceeded; dropping dispatch"
            );
            return Err(BusError::CascadeDepthExceeded {
                event: hormone.name,
                depth: hormone.depth,
                max: self.max_cascade_depth,
            });
        }

        match hormone.kind {
            HormoneKind::Instant => self.dispatch(hormone).await,
            HormoneKind::SlowRelease => {
                self.pending_slow_release.write().await.push(hormone);
            }
        }
        Ok(())
    }

    async fn dispatch(&self, hormone: Hormone) {
        let callbacks: Vec<Subscriber> = {
            let subs = self.subscribers.read().await;
            subs.get(&hormone.name).cloned().unwrap_or_default()
        };

        // Each subscriber runs in its own task so a panicking subscriber
        // can't take down the emitter or its siblings; join_all still
        // gives us the "emit returns only once every subscriber has run"
        // guarantee the bus promises.
        let handles: Vec<_> = callbacks
            .into_iter()
            .map(|cb| tokio::spawn(cb(hormone.clone())))
            .collect();

        for handle in handles {
            if let Err(join_err) = handle.await {
                tracing::error!(event = %hormone.name, error = %join_err, "subscriber panicked");
            }
        }
    }

    /// Drain and dispatch all slow-release events queued since the last
    /// flush, in FIFO order. Called once at the end of every tick.
    pub async fn flush_slow_release(&self) {
        let pending: Vec<Hormone> = {
            let mut guard = self.pending_slow_release.write().await;
            std::mem::take(&mut *guard)
        };
        for hormone in pending {
            self.dispatch(hormone).await;
        }
    }

    pub async fn history_since(&self, since: DateTime<Utc>) -> Vec<Hormone> {
        self.history
            .read()
            .await
            .iter()
            .filter(|h| h.created_at >= since)
            .cloned()
            .collect()
    }

    pub async fn recent(&self, n: usize) -> Vec<Hormone> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(n);
        history[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn instant_dispatch_reaches_subscriber() {
        let bus = HormoneBus::new(8);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter2 = counter.clone();
        bus.subscribe(
            "seed_planted",
            Arc::new(move |_h| {
                let counter = counter2.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }),
        )
        .await;

        bus.emit(Hormone::new("seed_planted", "intake", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deep_cascade_is_dropped_but_recorded() {
        let bus = HormoneBus::new(2);
        let mut h = Hormone::new("x", "t", serde_json::json!({}));
        h.depth = 5;
        let err = bus.emit(h).await.unwrap_err();
        matches!(err, BusError::CascadeDepthExceeded { .. });
        assert_eq!(bus.recent(10).await.len(), 1);
    }

    #[tokio::test]
    async fn slow_release_waits_for_flush() {
        let bus = HormoneBus::new(8);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter2 = counter.clone();
        bus.subscribe(
            "season_change",
            Arc::new(move |_h| {
                let counter = counter2.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }),
        )
        .await;

        bus.emit(
            Hormone::new("season_change", "heartbeat", serde_json::json!({})).slow_release(),
        )
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        bus.flush_slow_release().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
