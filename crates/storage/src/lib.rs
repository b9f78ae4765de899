#![forbid(unsafe_code)]

//! Session-scoped stores for an exam attempt.
//!
//! Nothing here outlives the attempt: a reload abandons it.

pub mod repository;

pub use repository::{AnswerStore, InMemoryStore, PartStore, SessionStores, StorageError};
