//! muse-core - Core library for Muse
//!
//! Shared creation model, libSQL persistence, and the client-side pieces used
//! by every Muse front end: the creation store, optimistic like
//! synchronization, feed loading, and list paging.

pub mod client;
pub mod db;
pub mod error;
pub mod feed;
pub mod likes;
pub mod models;
pub mod reveal;
pub mod services;
pub mod store;
pub mod util;

pub use client::MuseClient;
pub use error::{Error, Result};
pub use feed::{FeedClient, FeedLoad, FeedLoader, FeedSource};
pub use likes::{LikeError, LikeSynchronizer, LikeTransport, Notice, ToggleLikeResponse};
pub use models::{Creation, CreationId, CreationKind, NewCreation};
pub use reveal::{Accordion, Reveal};
pub use store::CreationStore;
