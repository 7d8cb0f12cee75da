pub mod common;
pub mod completions;
pub mod feed;
pub mod like;
