//! Mapping between domain objects and Nostr events.
//!
//! Only the data shape lives here. Signing, relay selection and subscriptions
//! belong to whatever transport implements [`crate::publish::Publisher`].

pub mod mapper;
pub mod tags;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
pub use mapper::EventMapping;
pub use tags::{ExerciseRef, ExerciseTag, Tag};

pub const KIND_EXERCISE_TEMPLATE: u16 = 33401;
pub const KIND_WORKOUT_TEMPLATE: u16 = 33402;
pub const KIND_WORKOUT_RECORD: u16 = 1301;

/// Tagged event envelope. `id` and `pubkey` are filled in by the signer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NostrEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    pub kind: u16,
    pub content: String,
    pub tags: Vec<Vec<String>>,
    pub created_at: i64,
}

impl NostrEvent {
    pub fn new(kind: u16, content: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            id: None,
            pubkey: None,
            kind,
            content: content.into(),
            tags: tags.iter().map(Tag::to_vec).collect(),
            created_at: Utc::now().timestamp(),
        }
    }

    /// Parse every tag into its typed form; any malformed known tag fails the event
    pub fn parsed_tags(&self) -> Result<Vec<Tag>> {
        self.tags
            .iter()
            .map(|raw| Tag::parse(raw, KIND_EXERCISE_TEMPLATE))
            .collect()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.first().map(String::as_str) == Some(name) && t.len() > 1)
    }

    /// Check the event kind and the presence of every required tag
    pub fn require(&self, kind: u16, required: &[&str]) -> Result<()> {
        if self.kind != kind {
            return Err(Error::Validation(format!(
                "expected event kind {}, got {}",
                kind, self.kind
            )));
        }
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.has_tag(name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "kind {} event is missing required tags: {}",
                kind,
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
