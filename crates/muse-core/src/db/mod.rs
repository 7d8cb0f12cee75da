//! Database layer for Muse

mod connection;
mod migrations;
mod repository;

pub use connection::{Database, ReplicaConfig};
pub use repository::{CreationRepository, LibSqlCreationRepository, LikeToggle};
