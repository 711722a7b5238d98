//! Change notification for library readers.
//!
//! Services announce that backing data changed; subscribers re-query what they
//! need. No data travels with a notification beyond the record id.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::Entity;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Archived,
    Unarchived,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub entity: Entity,
    pub id: String,
    pub action: ChangeAction,
}

/// Fan-out of change events to any number of subscribers
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Sender<ChangeEvent>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ChangeEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber; dropped receivers are pruned
    pub fn notify(&mut self, entity: Entity, id: &str, action: ChangeAction) {
        let event = ChangeEvent {
            entity,
            id: id.to_string(),
            action,
        };
        tracing::trace!("Change: {:?}", event);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
