//! Best-effort publication of finished workouts.
//!
//! The network transport sits behind [`Publisher`]. A failed publish never
//! fails the caller: the workout stays local-only and the event is appended to
//! an [`Outbox`] (a JSONL file guarded by file locks) so it can be retried
//! later with [`retry_pending`].

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::db::WorkoutSink;
use crate::lock::FileLock;
use crate::nostr::{EventMapping, NostrEvent};
use crate::{Error, Result, SyncRecord, Workout};

/// What a transport reports after accepting an event
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishReceipt {
    pub event_id: Option<String>,
    pub relays: Vec<String>,
}

/// External transport seam (relay pool, signer, ...)
pub trait Publisher {
    fn publish(&mut self, event: &NostrEvent) -> Result<PublishReceipt>;
}

/// Transport used when no relay or export target is configured
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflinePublisher;

impl Publisher for OfflinePublisher {
    fn publish(&mut self, _event: &NostrEvent) -> Result<PublishReceipt> {
        Err(Error::Publish("no relay transport configured".into()))
    }
}

/// Appends events to a JSONL file, for handing off to an external signer/relay tool
pub struct JsonlEventSink {
    path: PathBuf,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Publisher for JsonlEventSink {
    fn publish(&mut self, event: &NostrEvent) -> Result<PublishReceipt> {
        append_line(&self.path, event)?;
        tracing::debug!("Exported kind {} event to {:?}", event.kind, self.path);
        Ok(PublishReceipt {
            event_id: event.id.clone(),
            relays: vec![format!("file://{}", self.path.display())],
        })
    }
}

/// Outcome of the publication step, reported alongside a completed workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    NotRequested,
    Published {
        event_id: Option<String>,
        relays: Vec<String>,
    },
    Failed {
        reason: String,
        queued: bool,
    },
}

impl PublishStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishStatus::Published { .. })
    }
}

/// Everything needed to publish a workout
pub struct Publication<'a> {
    pub publisher: &'a mut dyn Publisher,
    pub outbox: Option<&'a Outbox>,
    /// Hex pubkey used in exercise and template references
    pub author: &'a str,
}

/// Map, publish and record the result for one stored workout.
///
/// Availability is only extended on success; failures are logged, queued and
/// reported, never returned as errors.
pub fn publish_workout(
    workout: &mut Workout,
    publication: Publication<'_>,
    sink: &mut dyn WorkoutSink,
) -> PublishStatus {
    let event = workout.to_event(publication.author);

    match publication.publisher.publish(&event) {
        Ok(receipt) => {
            workout.availability.mark_synced(SyncRecord {
                synced_at: Utc::now(),
                event_id: receipt.event_id.clone(),
                relays: receipt.relays.clone(),
            });
            if let Err(e) = sink.update_availability(&workout.id, &workout.availability) {
                tracing::warn!(
                    "Published workout {} but could not record availability: {}",
                    workout.id,
                    e
                );
            }
            tracing::info!("Published workout {}", workout.id);
            PublishStatus::Published {
                event_id: receipt.event_id,
                relays: receipt.relays,
            }
        }
        Err(e) => {
            let reason = e.to_string();
            tracing::warn!("Publishing workout {} failed: {}", workout.id, reason);
            let queued = match publication.outbox {
                Some(outbox) => {
                    let pending = PendingPublication::new(&workout.id, event, &reason);
                    match outbox.append(&pending) {
                        Ok(()) => true,
                        Err(err) => {
                            tracing::warn!("Could not queue workout {}: {}", workout.id, err);
                            false
                        }
                    }
                }
                None => false,
            };
            PublishStatus::Failed { reason, queued }
        }
    }
}

// ============================================================================
// Outbox
// ============================================================================

/// An event waiting to be published
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PendingPublication {
    pub workout_id: String,
    pub event: NostrEvent,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: String,
}

impl PendingPublication {
    pub fn new(workout_id: &str, event: NostrEvent, error: &str) -> Self {
        Self {
            workout_id: workout_id.to_string(),
            event,
            queued_at: Utc::now(),
            attempts: 1,
            last_error: error.to_string(),
        }
    }
}

/// JSONL queue of failed publications with file locking
pub struct Outbox {
    path: PathBuf,
}

impl Outbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold the queue for a read-modify-write cycle. Appends from other
    /// processes wait until the returned guard is dropped.
    pub fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(&self.path)
    }

    pub fn append(&self, pending: &PendingPublication) -> Result<()> {
        let _lock = self.lock()?;
        append_line(&self.path, pending)?;
        tracing::debug!("Queued workout {} for publication", pending.workout_id);
        Ok(())
    }

    /// Read all pending entries; unreadable lines are logged and skipped
    pub fn read_pending(&self) -> Result<Vec<PendingPublication>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let reader = BufReader::new(&file);
        let mut pending = Vec::new();
        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PendingPublication>(&line) {
                Ok(entry) => pending.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse outbox entry at line {}: {}", line_num + 1, e);
                }
            }
        }

        file.unlock()?;
        Ok(pending)
    }

    /// Atomically replace the queue contents. Callers hold [`Outbox::lock`]
    /// from the read that produced `entries` until this returns.
    pub fn replace(&self, entries: &[PendingPublication]) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "outbox path missing parent",
            ))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            for entry in entries {
                serde_json::to_writer(&mut writer, entry)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Counts from one retry pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub published: usize,
    pub still_pending: usize,
    pub dropped: usize,
}

/// Try every queued event once more. Runs only when the caller asks; nothing
/// retries automatically.
pub fn retry_pending(
    outbox: &Outbox,
    publisher: &mut dyn Publisher,
    sink: &mut dyn WorkoutSink,
) -> Result<RetrySummary> {
    let _lock = outbox.lock()?;
    let mut summary = RetrySummary::default();
    let mut remaining = Vec::new();

    for mut entry in outbox.read_pending()? {
        match publisher.publish(&entry.event) {
            Ok(receipt) => {
                let record = SyncRecord {
                    synced_at: Utc::now(),
                    event_id: receipt.event_id,
                    relays: receipt.relays,
                };
                let recorded = sink.availability(&entry.workout_id).and_then(|stored| {
                    let mut availability =
                        stored.ok_or_else(|| Error::not_found("workout", &entry.workout_id))?;
                    availability.mark_synced(record);
                    sink.update_availability(&entry.workout_id, &availability)
                });
                match recorded {
                    Ok(()) => summary.published += 1,
                    Err(Error::NotFound { .. }) => {
                        tracing::warn!(
                            "Workout {} was deleted locally; dropping its queued event",
                            entry.workout_id
                        );
                        summary.dropped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Published workout {} but could not record availability: {}",
                            entry.workout_id,
                            e
                        );
                        summary.published += 1;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Retry for workout {} failed: {}", entry.workout_id, e);
                entry.attempts += 1;
                entry.last_error = e.to_string();
                remaining.push(entry);
            }
        }
    }

    summary.still_pending = remaining.len();
    outbox.replace(&remaining)?;
    tracing::info!(
        "Outbox retry: {} published, {} pending, {} dropped",
        summary.published,
        summary.still_pending,
        summary.dropped
    );
    Ok(summary)
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;

    let mut writer = std::io::BufWriter::new(&file);
    let line = serde_json::to_string(value)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    file.unlock()?;
    Ok(())
}
