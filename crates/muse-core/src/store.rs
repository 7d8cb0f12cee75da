//! Client-held creation list shared by the feed loader and the like synchronizer.
//!
//! The store is a cheap, cloneable handle. Every successful reload and every
//! `detach` advances its epoch; work that was started against an older epoch
//! must not write into the store anymore.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::models::{Creation, CreationId};

#[derive(Clone, Default)]
pub struct CreationStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
pub struct StoreState {
    creations: Vec<Creation>,
    epoch: u64,
    detached: bool,
}

impl StoreState {
    /// Current membership of `actor_id` in the liker set, `None` if the creation is unknown
    pub fn membership(&self, id: &CreationId, actor_id: &str) -> Option<bool> {
        self.find(id).map(|creation| creation.is_liked_by(actor_id))
    }

    /// Force membership; returns `None` if the creation is unknown, otherwise whether it changed
    pub fn set_liked(&mut self, id: &CreationId, actor_id: &str, liked: bool) -> Option<bool> {
        self.creations
            .iter_mut()
            .find(|creation| creation.id == *id)
            .map(|creation| creation.set_liked(actor_id, liked))
    }

    pub fn find(&self, id: &CreationId) -> Option<&Creation> {
        self.creations.iter().find(|creation| creation.id == *id)
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    /// Whether work issued at `epoch` may still write into this store
    pub const fn accepts(&self, epoch: u64) -> bool {
        !self.detached && self.epoch == epoch
    }
}

impl CreationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `creations` (sorted newest first)
    pub fn with_creations(creations: Vec<Creation>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreState {
                creations: sort_newest_first(creations),
                ..StoreState::default()
            })),
        }
    }

    /// Replace the whole list atomically; returns the new epoch
    pub async fn replace(&self, creations: Vec<Creation>) -> u64 {
        let mut state = self.inner.lock().await;
        state.creations = sort_newest_first(creations);
        state.epoch += 1;
        tracing::debug!(
            epoch = state.epoch,
            count = state.creations.len(),
            "Creation store replaced"
        );
        state.epoch
    }

    /// Mark the owning view as gone; later writes from in-flight work are dropped
    pub async fn detach(&self) {
        let mut state = self.inner.lock().await;
        state.detached = true;
        state.epoch += 1;
    }

    pub async fn is_detached(&self) -> bool {
        self.inner.lock().await.detached
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.lock().await.epoch
    }

    pub async fn snapshot(&self) -> Vec<Creation> {
        self.inner.lock().await.creations.clone()
    }

    pub async fn get(&self, id: &CreationId) -> Option<Creation> {
        self.inner.lock().await.find(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.creations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.creations.is_empty()
    }

    /// Exclusive access for read-then-write sequences that must be atomic
    pub async fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().await
    }
}

fn sort_newest_first(mut creations: Vec<Creation>) -> Vec<Creation> {
    creations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    creations
}
