//! The active workout session.
//!
//! [`SessionStore`] is the single owner of the in-progress workout. Its
//! mutators are synchronous and recompute `total_volume`/`total_reps` from the
//! sets as part of every change, so the aggregates are never stale.
//!
//! Lifecycle: `idle -> active -> (paused <-> active) -> completed`. Starting a
//! workout is allowed from any state and replaces whatever was there.

mod snapshot;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::WorkoutSink;
use crate::publish::{publish_workout, Publication, PublishStatus};
use crate::types::*;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    Paused,
    Completed,
}

/// Presentational rest countdown. Nothing ticks it; callers ask for the
/// remaining time with their own clock.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestTimer {
    pub duration_seconds: u32,
    pub started_at: DateTime<Utc>,
}

impl RestTimer {
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        (i64::from(self.duration_seconds) - elapsed).max(0) as u32
    }

    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }
}

/// How a new workout is seeded
#[derive(Clone, Debug)]
pub enum WorkoutInit {
    Blank {
        title: String,
        workout_type: WorkoutType,
    },
    /// Copy the template's exercises with their target sets pre-filled.
    /// The template itself is never modified.
    FromTemplate(WorkoutTemplate),
}

impl WorkoutInit {
    pub fn blank(title: impl Into<String>) -> Self {
        WorkoutInit::Blank {
            title: title.into(),
            workout_type: WorkoutType::Strength,
        }
    }
}

pub struct CompletionOptions<'a> {
    pub notes: Option<String>,
    /// Publish after saving; `None` keeps the workout local-only
    pub publication: Option<Publication<'a>>,
}

/// Result of finishing a workout
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionReport {
    pub workout: Workout,
    /// Time spent working out, excluding pauses
    pub active_seconds: i64,
    pub publish: PublishStatus,
}

/// Owner of the single in-progress workout
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStore {
    status: SessionStatus,
    workout: Option<Workout>,
    paused_at: Option<DateTime<Utc>>,
    paused_millis: i64,
    rest: Option<RestTimer>,
    last_publish: Option<PublishStatus>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.workout.as_ref()
    }

    pub fn rest(&self) -> Option<&RestTimer> {
        self.rest.as_ref()
    }

    /// Publication outcome of the last completed workout
    pub fn last_publish(&self) -> Option<&PublishStatus> {
        self.last_publish.as_ref()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Replace any current workout with a fresh active one
    pub fn start_workout(&mut self, init: WorkoutInit, now: DateTime<Utc>) -> &Workout {
        if matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            if let Some(previous) = &self.workout {
                tracing::warn!(
                    "Discarding unfinished workout {} ({})",
                    previous.id,
                    previous.title
                );
            }
        }

        let workout = match init {
            WorkoutInit::Blank {
                title,
                workout_type,
            } => Workout::new(title, workout_type, now),
            WorkoutInit::FromTemplate(template) => {
                let mut workout = Workout::new(template.title.clone(), template.template_type, now);
                workout.template_id = Some(template.id.clone());
                workout.exercises = template
                    .exercises
                    .iter()
                    .map(|config| {
                        let mut exercise =
                            WorkoutExercise::new(config.exercise_id.clone(), config.title.clone());
                        exercise.target_sets = Some(config.target_sets);
                        exercise.target_reps = Some(config.target_reps);
                        exercise.notes = config.notes.clone();
                        exercise.sets = (0..config.target_sets)
                            .map(|_| {
                                WorkoutSet::new(
                                    config.target_weight.unwrap_or(0.0),
                                    config.target_reps,
                                )
                            })
                            .collect();
                        exercise
                    })
                    .collect();
                workout.recompute_totals();
                workout
            }
        };

        tracing::info!("Started workout {} ({})", workout.id, workout.title);
        self.status = SessionStatus::Active;
        self.paused_at = None;
        self.paused_millis = 0;
        self.rest = None;
        self.last_publish = None;
        self.workout.insert(workout)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::Active {
            return Err(self.invalid("pause"));
        }
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::Paused {
            return Err(self.invalid("resume"));
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_millis += (now - paused_at).num_milliseconds().max(0);
        }
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Drop the current workout without persisting it
    pub fn discard(&mut self) -> Result<Workout> {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            return Err(self.invalid("discard"));
        }
        let workout = self
            .workout
            .take()
            .ok_or_else(|| Error::Session("no workout to discard".into()))?;
        tracing::info!("Discarded workout {} ({})", workout.id, workout.title);
        *self = Self::default();
        Ok(workout)
    }

    /// Freeze the workout, hand it to `sink`, then optionally publish it.
    ///
    /// A storage error is returned and leaves the session untouched so the
    /// caller can retry. Publication problems only show up in the report.
    pub fn complete_workout(
        &mut self,
        options: CompletionOptions<'_>,
        sink: &mut dyn WorkoutSink,
        now: DateTime<Utc>,
    ) -> Result<CompletionReport> {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            return Err(self.invalid("complete"));
        }
        let active_seconds = self.elapsed(now).num_seconds();
        let mut workout = self
            .workout
            .clone()
            .ok_or_else(|| Error::Session("no workout to complete".into()))?;

        workout.end_time = Some(now);
        workout.is_completed = true;
        workout.updated_at = now;
        if options.notes.is_some() {
            workout.notes = options.notes;
        }

        sink.save_workout(&workout)?;
        tracing::info!(
            "Completed workout {} ({} sets, volume {})",
            workout.id,
            workout.set_count(),
            workout.total_volume
        );

        let publish = match options.publication {
            Some(publication) => publish_workout(&mut workout, publication, sink),
            None => PublishStatus::NotRequested,
        };

        self.status = SessionStatus::Completed;
        self.paused_at = None;
        self.rest = None;
        self.workout = Some(workout.clone());
        self.last_publish = Some(publish.clone());

        Ok(CompletionReport {
            workout,
            active_seconds,
            publish,
        })
    }

    // ------------------------------------------------------------------------
    // Exercises and sets
    // ------------------------------------------------------------------------

    /// Append an exercise; returns its index
    pub fn add_exercise(&mut self, exercise: WorkoutExercise) -> Result<usize> {
        for set in &exercise.sets {
            validate_set(set)?;
        }
        let workout = self.editable("add an exercise")?;
        let added = exercise
            .checked_reps()
            .ok_or_else(|| too_many_reps(&exercise.title))?;
        check_reps(workout.total_reps, added)?;
        workout.exercises.push(exercise);
        workout.recompute_totals();
        Ok(workout.exercises.len() - 1)
    }

    /// Remove an exercise and drop its sets from the totals
    pub fn remove_exercise(&mut self, exercise_index: usize) -> Result<WorkoutExercise> {
        let workout = self.editable("remove an exercise")?;
        check_index(exercise_index, workout.exercises.len(), "exercise")?;
        let removed = workout.exercises.remove(exercise_index);
        workout.recompute_totals();
        Ok(removed)
    }

    /// Append a set to an exercise; returns its index
    pub fn add_set(&mut self, exercise_index: usize, set: WorkoutSet) -> Result<usize> {
        validate_set(&set)?;
        let workout = self.editable("add a set")?;
        check_index(exercise_index, workout.exercises.len(), "exercise")?;
        check_reps(workout.total_reps, set.reps)?;
        workout.exercises[exercise_index].sets.push(set);
        workout.recompute_totals();
        Ok(workout.exercises[exercise_index].sets.len() - 1)
    }

    pub fn remove_set(&mut self, exercise_index: usize, set_index: usize) -> Result<WorkoutSet> {
        let workout = self.editable("remove a set")?;
        check_index(exercise_index, workout.exercises.len(), "exercise")?;
        let sets = &mut workout.exercises[exercise_index].sets;
        check_index(set_index, sets.len(), "set")?;
        let removed = sets.remove(set_index);
        workout.recompute_totals();
        Ok(removed)
    }

    /// Merge a partial update into a set and refresh the totals
    pub fn update_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        patch: SetPatch,
    ) -> Result<&WorkoutSet> {
        let workout = self.editable("update a set")?;
        check_index(exercise_index, workout.exercises.len(), "exercise")?;
        let sets = &mut workout.exercises[exercise_index].sets;
        check_index(set_index, sets.len(), "set")?;

        let old = sets[set_index].clone();
        let mut updated = old.clone();
        if let Some(weight) = patch.weight {
            updated.weight = weight;
        }
        if let Some(reps) = patch.reps {
            updated.reps = reps;
        }
        if let Some(rpe) = patch.rpe {
            updated.rpe = rpe;
        }
        if let Some(set_type) = patch.set_type {
            updated.set_type = set_type;
        }
        validate_set(&updated)?;
        check_reps(workout.total_reps.saturating_sub(old.reps), updated.reps)?;

        sets[set_index] = updated;
        workout.recompute_totals();
        Ok(&workout.exercises[exercise_index].sets[set_index])
    }

    /// Toggle a set's completion flag; returns the new state. Totals are unchanged.
    pub fn complete_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let workout = self.editable("complete a set")?;
        check_index(exercise_index, workout.exercises.len(), "exercise")?;
        let sets = &mut workout.exercises[exercise_index].sets;
        check_index(set_index, sets.len(), "set")?;

        let set = &mut sets[set_index];
        set.is_completed = !set.is_completed;
        set.completed_at = set.is_completed.then_some(now);
        Ok(set.is_completed)
    }

    // ------------------------------------------------------------------------
    // Rest timer
    // ------------------------------------------------------------------------

    pub fn start_rest(&mut self, duration_seconds: u32, now: DateTime<Utc>) -> Result<&RestTimer> {
        self.editable("start a rest timer")?;
        if duration_seconds == 0 {
            return Err(Error::Validation("rest duration must be positive".into()));
        }
        Ok(self.rest.insert(RestTimer {
            duration_seconds,
            started_at: now,
        }))
    }

    pub fn stop_rest(&mut self) {
        self.rest = None;
    }

    pub fn rest_remaining(&self, now: DateTime<Utc>) -> Option<u32> {
        self.rest.as_ref().map(|rest| rest.remaining_seconds(now))
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    /// Time since start, excluding pauses. Frozen while paused and once completed.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let Some(workout) = &self.workout else {
            return Duration::zero();
        };
        let end = match self.status {
            SessionStatus::Completed => workout.end_time.unwrap_or(now),
            SessionStatus::Paused => self.paused_at.unwrap_or(now),
            _ => now,
        };
        let elapsed = end - workout.start_time - Duration::milliseconds(self.paused_millis);
        elapsed.max(Duration::zero())
    }

    pub fn total_volume(&self) -> f64 {
        self.workout.as_ref().map_or(0.0, |w| w.total_volume)
    }

    pub fn total_reps(&self) -> u32 {
        self.workout.as_ref().map_or(0, |w| w.total_reps)
    }

    pub fn completed_set_count(&self) -> usize {
        self.workout
            .as_ref()
            .map_or(0, Workout::completed_set_count)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn editable(&mut self, action: &str) -> Result<&mut Workout> {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            return Err(self.invalid(action));
        }
        self.workout
            .as_mut()
            .ok_or_else(|| Error::Session("no active workout".into()))
    }

    fn invalid(&self, action: &str) -> Error {
        Error::Session(format!(
            "cannot {} while the session is {:?}",
            action, self.status
        ))
    }
}

fn check_index(index: usize, len: usize, what: &str) -> Result<()> {
    if index >= len {
        return Err(Error::Session(format!(
            "{} index {} out of range ({} present)",
            what, index, len
        )));
    }
    Ok(())
}

/// Refuse an edit that would push the workout's rep count past `u32::MAX`
fn check_reps(current: u32, added: u32) -> Result<()> {
    current
        .checked_add(added)
        .map(|_| ())
        .ok_or_else(|| too_many_reps("workout"))
}

fn too_many_reps(what: &str) -> Error {
    Error::Validation(format!("rep count for {} is too large", what))
}

fn validate_set(set: &WorkoutSet) -> Result<()> {
    if !set.weight.is_finite() || set.weight < 0.0 {
        return Err(Error::Validation(format!("invalid weight {}", set.weight)));
    }
    if let Some(rpe) = set.rpe {
        if !(0.0..=10.0).contains(&rpe) {
            return Err(Error::Validation(format!("RPE {} outside 0-10", rpe)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::publish::{OfflinePublisher, Outbox};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn leg_day() -> SessionStore {
        let mut store = SessionStore::new();
        store.start_workout(WorkoutInit::blank("Leg Day"), t0());
        store
    }

    #[test]
    fn test_leg_day_scenario() {
        let mut store = leg_day();
        assert_eq!(store.total_volume(), 0.0);

        let squat = store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        store.add_set(squat, WorkoutSet::new(100.0, 5)).unwrap();
        assert_eq!(store.total_volume(), 500.0);

        assert!(store.complete_set(squat, 0, t0()).unwrap());
        assert_eq!(store.total_volume(), 500.0);
        assert_eq!(store.completed_set_count(), 1);

        store.remove_exercise(squat).unwrap();
        assert_eq!(store.total_volume(), 0.0);
        assert_eq!(store.total_reps(), 0);
    }

    #[test]
    fn test_update_set_refreshes_totals() {
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        store.add_set(0, WorkoutSet::new(100.0, 5)).unwrap();
        store.add_set(0, WorkoutSet::new(60.0, 10)).unwrap();

        store
            .update_set(
                0,
                0,
                SetPatch {
                    weight: Some(110.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.total_volume(), 1150.0);
        assert_eq!(store.total_reps(), 15);

        let updated = store
            .update_set(
                0,
                1,
                SetPatch {
                    reps: Some(8),
                    rpe: Some(Some(7.0)),
                    set_type: Some(SetType::Warmup),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.set_type, SetType::Warmup);
        assert_eq!(store.total_volume(), 1030.0);
        assert_eq!(store.total_reps(), 13);
    }

    #[test]
    fn test_decimal_weights_do_not_drift() {
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:curl", "Curl"))
            .unwrap();
        store.add_set(0, WorkoutSet::new(0.1, 1)).unwrap();
        store.add_set(0, WorkoutSet::new(0.2, 1)).unwrap();
        store.remove_set(0, 0).unwrap();
        assert_eq!(store.total_volume(), 0.2);

        store.add_set(0, WorkoutSet::new(0.7, 3)).unwrap();
        store
            .update_set(
                0,
                1,
                SetPatch {
                    weight: Some(0.3),
                    ..Default::default()
                },
            )
            .unwrap();
        let expected: f64 = store
            .workout()
            .unwrap()
            .sets()
            .map(WorkoutSet::volume)
            .sum();
        assert_eq!(store.total_volume(), expected);
    }

    #[test]
    fn test_rep_overflow_is_rejected() {
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:plank", "Plank"))
            .unwrap();
        store.add_set(0, WorkoutSet::new(1.0, u32::MAX)).unwrap();

        assert!(matches!(
            store.add_set(0, WorkoutSet::new(1.0, 1)),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.total_reps(), u32::MAX);
        assert_eq!(store.workout().unwrap().set_count(), 1);

        store.add_set(0, WorkoutSet::new(1.0, 0)).unwrap();
        assert!(matches!(
            store.update_set(
                0,
                1,
                SetPatch {
                    reps: Some(1),
                    ..Default::default()
                },
            ),
            Err(Error::Validation(_))
        ));

        let mut crowded = WorkoutExercise::new("local:squat", "Squat");
        crowded.sets = vec![WorkoutSet::new(1.0, 1)];
        assert!(matches!(
            store.add_exercise(crowded),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.workout().unwrap().exercises.len(), 1);
    }

    #[test]
    fn test_invalid_patch_leaves_set_untouched() {
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        store.add_set(0, WorkoutSet::new(100.0, 5)).unwrap();

        let result = store.update_set(
            0,
            0,
            SetPatch {
                rpe: Some(Some(11.0)),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.total_volume(), 500.0);
        assert_eq!(store.workout().unwrap().exercises[0].sets[0].rpe, None);
    }

    #[test]
    fn test_out_of_range_indices() {
        let mut store = leg_day();
        assert!(store.remove_exercise(0).is_err());
        assert!(store.add_set(3, WorkoutSet::new(1.0, 1)).is_err());
        store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        assert!(store.complete_set(0, 0, t0()).is_err());
    }

    #[test]
    fn test_start_from_template_prefills_sets() {
        let now = t0();
        let mut squat = TemplateExercise::new("local:squat", "Squat", 3, 5);
        squat.target_weight = Some(100.0);
        let template = WorkoutTemplate {
            id: "local:tmpl".into(),
            title: "Legs A".into(),
            template_type: WorkoutType::Strength,
            description: None,
            exercises: vec![squat],
            is_archived: false,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        };

        let mut store = SessionStore::new();
        let workout = store.start_workout(WorkoutInit::FromTemplate(template.clone()), now);
        assert_eq!(workout.template_id.as_deref(), Some("local:tmpl"));
        assert_eq!(workout.exercises[0].sets.len(), 3);
        assert_eq!(workout.total_volume, 1500.0);
        assert!(workout.exercises[0].sets.iter().all(|s| !s.is_completed));
        assert_eq!(template.exercises[0].target_sets, 3);
    }

    #[test]
    fn test_start_replaces_active_workout() {
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        let first_id = store.workout().unwrap().id.clone();

        store.start_workout(WorkoutInit::blank("Push Day"), t0());
        let workout = store.workout().unwrap();
        assert_ne!(workout.id, first_id);
        assert!(workout.exercises.is_empty());
        assert_eq!(store.status(), SessionStatus::Active);
    }

    #[test]
    fn test_pause_excludes_time() {
        let mut store = leg_day();
        store.pause(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(store.status(), SessionStatus::Paused);
        assert_eq!(
            store.elapsed(t0() + Duration::minutes(30)),
            Duration::minutes(10)
        );
        assert!(store.pause(t0()).is_err());

        store.resume(t0() + Duration::minutes(15)).unwrap();
        assert_eq!(
            store.elapsed(t0() + Duration::minutes(20)),
            Duration::minutes(15)
        );
        assert!(store.resume(t0()).is_err());
    }

    #[test]
    fn test_rest_timer() {
        let mut store = leg_day();
        store.start_rest(90, t0()).unwrap();
        assert_eq!(store.rest_remaining(t0() + Duration::seconds(30)), Some(60));
        assert_eq!(store.rest_remaining(t0() + Duration::seconds(200)), Some(0));
        assert!(store.start_rest(0, t0()).is_err());
        store.stop_rest();
        assert_eq!(store.rest_remaining(t0()), None);
    }

    #[test]
    fn test_discard_returns_to_idle() {
        let mut store = leg_day();
        store.discard().unwrap();
        assert_eq!(store.status(), SessionStatus::Idle);
        assert!(store.workout().is_none());
        assert!(store.discard().is_err());
        assert!(store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .is_err());
    }

    #[test]
    fn test_complete_offline_stays_local() {
        let temp_dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::new(temp_dir.path().join("outbox.jsonl"));
        let mut db = Database::open_in_memory().unwrap();
        let mut store = leg_day();
        store
            .add_exercise(WorkoutExercise::new("local:squat", "Squat"))
            .unwrap();
        store.add_set(0, WorkoutSet::new(100.0, 5)).unwrap();

        let mut offline = OfflinePublisher;
        let report = store
            .complete_workout(
                CompletionOptions {
                    notes: Some("felt strong".into()),
                    publication: Some(Publication {
                        publisher: &mut offline,
                        outbox: Some(&outbox),
                        author: "",
                    }),
                },
                &mut db,
                t0() + Duration::minutes(40),
            )
            .unwrap();

        assert_eq!(report.active_seconds, 40 * 60);
        assert!(matches!(report.publish, PublishStatus::Failed { queued: true, .. }));
        assert_eq!(store.status(), SessionStatus::Completed);

        let stored = db.get_workout(&report.workout.id).unwrap().unwrap();
        assert_eq!(stored.availability.source, vec![StorageSource::Local]);
        assert!(stored.is_completed);
        assert_eq!(stored.total_volume, 500.0);
        assert_eq!(stored.notes.as_deref(), Some("felt strong"));
        assert_eq!(outbox.read_pending().unwrap().len(), 1);

        // Completed workouts are frozen
        assert!(store.add_set(0, WorkoutSet::new(1.0, 1)).is_err());
    }

    struct FailingSink;

    impl WorkoutSink for FailingSink {
        fn save_workout(&mut self, _workout: &Workout) -> Result<()> {
            Err(Error::Other("disk full".into()))
        }

        fn availability(&self, _id: &str) -> Result<Option<Availability>> {
            Ok(None)
        }

        fn update_availability(&mut self, _id: &str, _a: &Availability) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_storage_failure_keeps_session_active() {
        let mut store = leg_day();
        let result = store.complete_workout(
            CompletionOptions {
                notes: None,
                publication: None,
            },
            &mut FailingSink,
            t0(),
        );
        assert!(result.is_err());
        assert_eq!(store.status(), SessionStatus::Active);
        assert!(store.workout().unwrap().end_time.is_none());
    }
}
