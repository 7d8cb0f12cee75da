//! Loading creation lists into a [`CreationStore`].

use std::future::Future;
use std::sync::Arc;

use crate::models::Creation;
use crate::store::CreationStore;
use crate::util::user_fingerprint;
use crate::Result;

/// Which list a loader fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Everyone's published creations (community page)
    Published,
    /// The signed-in user's own creations (dashboard)
    Own,
}

/// Remote side of the feed
pub trait FeedClient: Send + Sync {
    fn fetch_creations(
        &self,
        source: FeedSource,
    ) -> impl Future<Output = Result<Vec<Creation>>> + Send;
}

/// Result of reacting to an authentication change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedLoad {
    /// Fetched and stored this many creations
    Loaded(usize),
    /// Same user as before; nothing fetched
    Unchanged,
    /// No user; nothing fetched, prior contents kept
    SignedOut,
}

pub struct FeedLoader<C> {
    client: Arc<C>,
    store: CreationStore,
    source: FeedSource,
    user: Option<String>,
    loading: bool,
    last_error: Option<String>,
}

impl<C: FeedClient> FeedLoader<C> {
    pub const fn new(client: Arc<C>, store: CreationStore, source: FeedSource) -> Self {
        Self {
            client,
            store,
            source,
            user: None,
            loading: true,
            last_error: None,
        }
    }

    /// Fetch once per change of signed-in user.
    pub async fn on_auth_change(&mut self, user_id: Option<&str>) -> Result<FeedLoad> {
        // Nobody signed in means nothing will load
        if user_id.is_none() {
            self.loading = false;
        }
        if self.user.as_deref() == user_id {
            return Ok(FeedLoad::Unchanged);
        }
        self.user = user_id.map(ToString::to_string);

        let Some(user_id) = user_id else {
            return Ok(FeedLoad::SignedOut);
        };
        tracing::debug!(
            user = user_fingerprint(user_id),
            source = ?self.source,
            "Authentication changed; loading feed"
        );
        self.load().await.map(FeedLoad::Loaded)
    }

    /// Fetch and replace the store contents. On failure the store is untouched.
    pub async fn load(&mut self) -> Result<usize> {
        let result = self.client.fetch_creations(self.source).await;
        self.loading = false;

        match result {
            Ok(creations) => {
                let count = creations.len();
                self.store.replace(creations).await;
                self.last_error = None;
                Ok(count)
            }
            Err(error) => {
                tracing::warn!(source = ?self.source, %error, "Failed to load creations");
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// True until the first load attempt finishes
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the most recent failed load, for display
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn store(&self) -> &CreationStore {
        &self.store
    }
}
