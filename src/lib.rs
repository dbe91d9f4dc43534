//! todo-cache library
//!
//! A local task list persisted in a key-value store, with a read-through
//! query cache, optimistic mutations and a session capability gate.

pub mod cache;
pub mod categorize;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod gate;
pub mod logging;
pub mod repository;
pub mod store;
pub mod types;
pub mod validation;
