use serde::Serialize;

use super::Library;
use crate::db::WorkoutSink;
use crate::nostr::{EventMapping, NostrEvent};
use crate::notify::ChangeAction;
use crate::types::*;
use crate::{Error, Result};

/// Totals across stored workouts
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct HistorySummary {
    pub workouts: usize,
    pub total_volume: f64,
    pub total_reps: u64,
    pub total_sets: usize,
    pub total_seconds: i64,
}

impl HistorySummary {
    pub fn from_workouts(workouts: &[Workout]) -> Self {
        workouts.iter().fold(Self::default(), |mut acc, w| {
            acc.workouts += 1;
            acc.total_volume += w.total_volume;
            acc.total_reps += u64::from(w.total_reps);
            acc.total_sets += w.set_count();
            acc.total_seconds += w.duration_seconds().unwrap_or(0);
            acc
        })
    }
}

impl Library {
    pub fn get_workout(&self, id: &str) -> Result<Workout> {
        self.db
            .get_workout(id)?
            .ok_or_else(|| Error::not_found("workout", id))
    }

    /// Stored workouts, newest first
    pub fn list_workouts(&self, limit: Option<u32>) -> Result<Vec<Workout>> {
        self.db.list_workouts(limit)
    }

    pub fn delete_workout(&mut self, id: &str) -> Result<()> {
        if !self.db.delete_workout(id)? {
            return Err(Error::not_found("workout", id));
        }
        tracing::info!("Deleted workout {}", id);
        self.notifier
            .notify(Entity::Workout, id, ChangeAction::Deleted);
        Ok(())
    }

    pub fn history_summary(&self, limit: Option<u32>) -> Result<HistorySummary> {
        Ok(HistorySummary::from_workouts(&self.db.list_workouts(limit)?))
    }

    /// Store a workout received as a kind 1301 event
    pub fn import_workout_event(&mut self, event: &NostrEvent) -> Result<Workout> {
        let mut workout = Workout::from_event(event)?;
        for exercise in &mut workout.exercises {
            if let Some(base) = self.db.get_exercise(&exercise.exercise_id)? {
                exercise.title = base.title;
            }
        }
        workout.recompute_totals();
        self.save_workout(&workout)?;
        Ok(workout)
    }

    pub fn workout_event(&self, id: &str, author: &str) -> Result<NostrEvent> {
        Ok(self.get_workout(id)?.to_event(author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_exercise_id;
    use chrono::{Duration, Utc};

    fn finished(title: &str, weight: f64, reps: u32, minutes: i64) -> Workout {
        let start = Utc::now() - Duration::minutes(minutes);
        let mut workout = Workout::new(title, WorkoutType::Strength, start);
        let mut squat = WorkoutExercise::new(default_exercise_id("back-squat"), "Back Squat");
        squat.sets = vec![WorkoutSet::new(weight, reps), WorkoutSet::new(weight, reps)];
        workout.exercises.push(squat);
        workout.end_time = Some(start + Duration::minutes(minutes));
        workout.is_completed = true;
        workout.recompute_totals();
        workout
    }

    #[test]
    fn test_history_summary() {
        let mut library = Library::open_in_memory().unwrap();
        library.save_workout(&finished("A", 100.0, 5, 30)).unwrap();
        library.save_workout(&finished("B", 50.0, 10, 45)).unwrap();

        let summary = library.history_summary(None).unwrap();
        assert_eq!(summary.workouts, 2);
        assert_eq!(summary.total_volume, 2000.0);
        assert_eq!(summary.total_reps, 30);
        assert_eq!(summary.total_sets, 4);
        assert_eq!(summary.total_seconds, 75 * 60);

        assert_eq!(library.history_summary(Some(1)).unwrap().workouts, 1);
    }

    #[test]
    fn test_delete_workout() {
        let mut library = Library::open_in_memory().unwrap();
        let workout = finished("A", 100.0, 5, 30);
        library.save_workout(&workout).unwrap();
        let rx = library.subscribe();

        library.delete_workout(&workout.id).unwrap();
        assert_eq!(rx.try_recv().unwrap().action, ChangeAction::Deleted);
        assert!(matches!(
            library.get_workout(&workout.id),
            Err(Error::NotFound { .. })
        ));
        assert!(library.delete_workout(&workout.id).is_err());
    }

    #[test]
    fn test_save_notifies_created_then_updated() {
        let mut library = Library::open_in_memory().unwrap();
        let rx = library.subscribe();
        let mut workout = finished("A", 100.0, 5, 30);

        library.save_workout(&workout).unwrap();
        workout.notes = Some("felt strong".into());
        library.save_workout(&workout).unwrap();

        let actions: Vec<_> = rx.try_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![ChangeAction::Created, ChangeAction::Updated]);
    }

    #[test]
    fn test_import_workout_event_resolves_titles() {
        let mut source = Library::open_in_memory().unwrap();
        let workout = finished("Leg Day", 100.0, 5, 40);
        source.save_workout(&workout).unwrap();
        let event = source.workout_event(&workout.id, &"c".repeat(64)).unwrap();

        let mut target = Library::open_in_memory().unwrap();
        target.seed_default_catalog().unwrap();
        let imported = target.import_workout_event(&event).unwrap();

        assert_eq!(imported.id, workout.id);
        assert_eq!(imported.exercises[0].title, "Back Squat");
        assert_eq!(imported.total_volume, 1000.0);
        assert!(imported.availability.has(StorageSource::Nostr));
        assert_eq!(target.get_workout(&workout.id).unwrap(), imported);
    }

    #[test]
    fn test_import_rejects_invalid_set_values_without_storing() {
        let mut source = Library::open_in_memory().unwrap();
        let workout = finished("Leg Day", 100.0, 5, 40);
        source.save_workout(&workout).unwrap();
        let mut event = source.workout_event(&workout.id, &"c".repeat(64)).unwrap();
        let tag = event.tags.iter_mut().find(|t| t[0] == "exercise").unwrap();
        tag[2] = "-100".into();

        let mut target = Library::open_in_memory().unwrap();
        assert!(matches!(
            target.import_workout_event(&event),
            Err(Error::Validation(_))
        ));
        assert!(target.list_workouts(None).unwrap().is_empty());
    }
}
