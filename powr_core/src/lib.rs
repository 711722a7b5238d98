#![forbid(unsafe_code)]

//! Core domain model and business logic for the POWR workout tracker.
//!
//! This crate provides:
//! - Domain types (exercises, templates, workouts, sets)
//! - The active workout session store
//! - SQLite persistence
//! - Nostr event mapping and publication
//! - Library services with change notification

pub mod types;
pub mod error;
pub mod id;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod db;
pub mod nostr;
pub mod notify;
pub mod lock;
pub mod publish;
pub mod session;
pub mod library;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::default_exercises;
pub use config::Config;
pub use db::{Database, WorkoutSink};
pub use id::{generate_id, is_local_id, is_nostr_id, IdSource};
pub use library::{ExerciseFilter, HistorySummary, Library, TemplateAction};
pub use nostr::{EventMapping, NostrEvent};
pub use notify::{ChangeAction, ChangeEvent};
pub use publish::{Outbox, PublishStatus, Publisher};
pub use session::{SessionStatus, SessionStore, WorkoutInit};
