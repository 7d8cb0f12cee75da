//! Data models for Muse

mod creation;

pub use creation::{Creation, CreationId, CreationKind, NewCreation};
