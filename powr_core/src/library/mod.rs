//! Library services: CRUD orchestration over the catalog, templates and
//! workout history.
//!
//! [`Library`] owns the database connection and the change notifier. It is
//! built once by the caller and passed by reference to whatever needs it.
//! Every successful mutation is announced on the notifier after the write
//! has committed.

mod exercises;
mod templates;
mod workouts;

pub use exercises::ExerciseFilter;
pub use templates::TemplateAction;
pub use workouts::HistorySummary;

use std::path::Path;
use std::sync::mpsc::Receiver;

use chrono::{DateTime, SubsecRound, Utc};

use crate::catalog::default_exercises;
use crate::db::{Database, WorkoutSink};
use crate::notify::{ChangeAction, ChangeEvent, ChangeNotifier};
use crate::{Availability, Entity, Result, Workout};

/// Current time at the millisecond precision the database keeps
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub struct Library {
    db: Database,
    notifier: ChangeNotifier,
}

impl Library {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Receive a [`ChangeEvent`] for every subsequent mutation
    pub fn subscribe(&mut self) -> Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Insert the built-in exercises into an empty catalog; returns how many were added
    pub fn seed_default_catalog(&mut self) -> Result<usize> {
        if self.db.count(Entity::Exercise)? > 0 {
            return Ok(0);
        }
        let exercises = default_exercises();
        for exercise in exercises {
            self.db.save_exercise(exercise)?;
        }
        tracing::info!("Seeded {} default exercises", exercises.len());
        if !exercises.is_empty() {
            self.notifier
                .notify(Entity::Exercise, "*", ChangeAction::Created);
        }
        Ok(exercises.len())
    }
}

impl WorkoutSink for Library {
    fn save_workout(&mut self, workout: &Workout) -> Result<()> {
        let existed = self.db.get_workout(&workout.id)?.is_some();
        self.db.store_workout(workout)?;
        let action = if existed {
            ChangeAction::Updated
        } else {
            ChangeAction::Created
        };
        self.notifier.notify(Entity::Workout, &workout.id, action);
        Ok(())
    }

    fn availability(&self, workout_id: &str) -> Result<Option<Availability>> {
        self.db.get_availability(Entity::Workout, workout_id)
    }

    fn update_availability(&mut self, workout_id: &str, availability: &Availability) -> Result<()> {
        WorkoutSink::update_availability(&mut self.db, workout_id, availability)?;
        self.notifier
            .notify(Entity::Workout, workout_id, ChangeAction::Updated);
        Ok(())
    }
}
