//! Optimistic like synchronization.
//!
//! A toggle is applied to the [`CreationStore`] immediately, then sent to the
//! backend. Responses may come back in any order relative to later local
//! toggles, so each (creation, actor) pair keeps a small ledger:
//!
//! - `latest_seq`: the newest intent issued locally
//! - `committed`: the last membership the server acknowledged, and the
//!   sequence number that produced it
//! - `in_flight`: how many intents still await a response
//!
//! A failed intent is reverted only while it is still the newest one and its
//! desired state differs from committed truth. Once nothing is in flight the
//! local membership is forced to committed truth and the ledger entry is
//! dropped.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::CreationId;
use crate::store::CreationStore;
use crate::util::user_fingerprint;

/// How long a fresh like keeps its animation flag
pub const LIKE_ANIMATION: Duration = Duration::from_secs(1);

/// Body of the toggle-like endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToggleLikeResponse {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Authoritative side of the protocol
pub trait LikeTransport: Send + Sync {
    /// Ask the server to flip `actor_id`'s like on `creation_id`
    fn toggle_like(
        &self,
        creation_id: CreationId,
        actor_id: &str,
    ) -> impl Future<Output = crate::Result<ToggleLikeResponse>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LikeError {
    #[error("Creation not found: {0}")]
    NotFound(CreationId),
    #[error("Like request failed: {0}")]
    TransportFailure(String),
    #[error("{0}")]
    RejectedByServer(String),
    #[error("Creation list is no longer shown")]
    Detached,
}

/// A pending like/unlike action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeIntent {
    pub creation_id: CreationId,
    pub actor_id: String,
    /// Membership the actor asked for
    pub desired: bool,
    /// Membership observed right before the optimistic edit
    pub previous: bool,
    pub seq: u64,
    epoch: u64,
}

/// What the server said about one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Accepted,
    Rejected(String),
    Unreachable(String),
}

/// How a successful settlement affected local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The server accepted the intent
    Confirmed,
    /// The store was reloaded or detached while the request was in flight
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
}

/// Transient user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug)]
struct LedgerEntry {
    epoch: u64,
    latest_seq: u64,
    in_flight: usize,
    committed: bool,
    committed_seq: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    next_seq: u64,
    entries: HashMap<(CreationId, String), LedgerEntry>,
    animation: Option<(CreationId, Instant)>,
    notices: VecDeque<Notice>,
}

impl Ledger {
    fn notify(&mut self, error: &LikeError) {
        self.notices.push_back(Notice {
            level: NoticeLevel::Error,
            message: error.to_string(),
        });
    }
}

pub struct LikeSynchronizer<T> {
    store: CreationStore,
    transport: Arc<T>,
    ledger: Arc<Mutex<Ledger>>,
    animation: Duration,
}

impl<T> Clone for LikeSynchronizer<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            transport: Arc::clone(&self.transport),
            ledger: Arc::clone(&self.ledger),
            animation: self.animation,
        }
    }
}

impl<T: LikeTransport> LikeSynchronizer<T> {
    pub fn new(store: CreationStore, transport: T) -> Self {
        Self::with_transport(store, Arc::new(transport))
    }

    pub fn with_transport(store: CreationStore, transport: Arc<T>) -> Self {
        Self {
            store,
            transport,
            ledger: Arc::new(Mutex::new(Ledger::default())),
            animation: LIKE_ANIMATION,
        }
    }

    #[must_use]
    pub const fn with_animation(mut self, duration: Duration) -> Self {
        self.animation = duration;
        self
    }

    pub const fn store(&self) -> &CreationStore {
        &self.store
    }

    /// Optimistically flip the like, call the server once, then settle.
    pub async fn toggle(
        &self,
        creation_id: CreationId,
        actor_id: &str,
    ) -> Result<Settled, LikeError> {
        let intent = self.begin(creation_id, actor_id).await?;

        let outcome = match self
            .transport
            .toggle_like(intent.creation_id, &intent.actor_id)
            .await
        {
            Ok(response) if response.success => LikeOutcome::Accepted,
            Ok(response) => LikeOutcome::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Like was rejected".to_string()),
            ),
            Err(error) => LikeOutcome::Unreachable(error.to_string()),
        };

        self.settle(&intent, outcome).await
    }

    /// Synchronous half of a toggle: read membership and flip it under one lock.
    pub async fn begin(
        &self,
        creation_id: CreationId,
        actor_id: &str,
    ) -> Result<LikeIntent, LikeError> {
        let mut ledger = self.ledger.lock().await;
        let mut store = self.store.lock().await;

        if store.is_detached() {
            tracing::debug!(creation = %creation_id, "Ignoring like toggle on a detached store");
            return Err(LikeError::Detached);
        }
        let Some(previous) = store.membership(&creation_id, actor_id) else {
            let error = LikeError::NotFound(creation_id);
            ledger.notify(&error);
            return Err(error);
        };
        let desired = !previous;
        store.set_liked(&creation_id, actor_id, desired);

        ledger.next_seq += 1;
        let seq = ledger.next_seq;
        let epoch = store.epoch();

        let entry = ledger
            .entries
            .entry((creation_id, actor_id.to_string()))
            .or_insert(LedgerEntry {
                epoch,
                latest_seq: 0,
                in_flight: 0,
                committed: previous,
                committed_seq: 0,
            });
        if entry.epoch != epoch {
            // Issued against a reloaded list; the reload is the new truth
            *entry = LedgerEntry {
                epoch,
                latest_seq: 0,
                in_flight: 0,
                committed: previous,
                committed_seq: 0,
            };
        }
        entry.latest_seq = seq;
        entry.in_flight += 1;

        if desired {
            ledger.animation = Some((creation_id, Instant::now() + self.animation));
        }

        tracing::debug!(
            creation = %creation_id,
            actor = user_fingerprint(actor_id),
            seq,
            desired,
            "Applied optimistic like toggle"
        );

        Ok(LikeIntent {
            creation_id,
            actor_id: actor_id.to_string(),
            desired,
            previous,
            seq,
            epoch,
        })
    }

    /// Apply the server's answer for `intent`.
    pub async fn settle(
        &self,
        intent: &LikeIntent,
        outcome: LikeOutcome,
    ) -> Result<Settled, LikeError> {
        let mut ledger = self.ledger.lock().await;
        let mut store = self.store.lock().await;
        let key = (intent.creation_id, intent.actor_id.clone());

        let error = match outcome {
            LikeOutcome::Accepted => None,
            LikeOutcome::Rejected(message) => Some(LikeError::RejectedByServer(message)),
            LikeOutcome::Unreachable(message) => Some(LikeError::TransportFailure(message)),
        };

        if !store.accepts(intent.epoch) {
            if let Some(entry) = ledger.entries.get_mut(&key) {
                if entry.epoch == intent.epoch {
                    entry.in_flight = entry.in_flight.saturating_sub(1);
                    if entry.in_flight == 0 {
                        ledger.entries.remove(&key);
                    }
                }
            }
            tracing::debug!(
                creation = %intent.creation_id,
                seq = intent.seq,
                "Dropping like response for a reloaded or detached store"
            );
            return error.map_or(Ok(Settled::Stale), Err);
        }

        let Some(entry) = ledger.entries.get_mut(&key) else {
            tracing::warn!(seq = intent.seq, "Like response without a ledger entry");
            return error.map_or(Ok(Settled::Stale), Err);
        };
        entry.in_flight = entry.in_flight.saturating_sub(1);

        match &error {
            None => {
                if intent.seq > entry.committed_seq {
                    entry.committed = intent.desired;
                    entry.committed_seq = intent.seq;
                }
            }
            Some(error) => {
                let superseded = intent.seq != entry.latest_seq;
                if !superseded && intent.desired != entry.committed {
                    store.set_liked(&intent.creation_id, &intent.actor_id, entry.committed);
                    tracing::warn!(
                        creation = %intent.creation_id,
                        seq = intent.seq,
                        %error,
                        "Reverted optimistic like"
                    );
                } else {
                    tracing::warn!(
                        creation = %intent.creation_id,
                        seq = intent.seq,
                        superseded,
                        %error,
                        "Like failed; newer state kept"
                    );
                }
            }
        }

        if entry.in_flight == 0 {
            let committed = entry.committed;
            ledger.entries.remove(&key);
            if store.set_liked(&intent.creation_id, &intent.actor_id, committed) == Some(true) {
                tracing::debug!(
                    creation = %intent.creation_id,
                    committed,
                    "Reconciled settled like with server state"
                );
            }
        }

        match error {
            None => Ok(Settled::Confirmed),
            Some(error) => {
                ledger.notify(&error);
                Err(error)
            }
        }
    }

    /// Creation currently showing the like animation, if its timer hasn't run out
    pub async fn animating(&self) -> Option<CreationId> {
        let mut ledger = self.ledger.lock().await;
        match ledger.animation {
            Some((id, until)) if Instant::now() < until => Some(id),
            Some(_) => {
                ledger.animation = None;
                None
            }
            None => None,
        }
    }

    /// Number of intents still awaiting a response
    pub async fn in_flight(&self) -> usize {
        let ledger = self.ledger.lock().await;
        ledger.entries.values().map(|entry| entry.in_flight).sum()
    }

    /// Take all pending notices
    pub async fn drain_notices(&self) -> Vec<Notice> {
        let mut ledger = self.ledger.lock().await;
        ledger.notices.drain(..).collect()
    }
}
