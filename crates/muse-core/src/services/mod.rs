//! Service wrappers shared by binaries.

mod database;

pub use database::CreationService;
