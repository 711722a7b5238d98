//! Workout rows, their exercises and sets.

use rusqlite::{params, OptionalExtension, Row};

use super::{json_column, millis_column, optional_millis_column, to_millis, Database};
use crate::{Result, Workout, WorkoutExercise, WorkoutSet};

const SELECT_WORKOUT: &str = "SELECT id, title, workout_type, start_time, end_time, \
     is_completed, template_id, notes, total_volume, total_reps, availability, created_at, \
     updated_at FROM workouts";

fn workout_from_row(row: &Row<'_>) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        title: row.get(1)?,
        workout_type: row.get(2)?,
        start_time: millis_column(row, 3)?,
        end_time: optional_millis_column(row, 4)?,
        is_completed: row.get(5)?,
        template_id: row.get(6)?,
        notes: row.get(7)?,
        total_volume: row.get(8)?,
        total_reps: row.get(9)?,
        availability: json_column(row, 10)?,
        created_at: millis_column(row, 11)?,
        updated_at: millis_column(row, 12)?,
        exercises: Vec::new(),
    })
}

fn set_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutSet> {
    Ok(WorkoutSet {
        id: row.get(0)?,
        weight: row.get(1)?,
        reps: row.get(2)?,
        rpe: row.get::<_, Option<f64>>(3)?.map(|v| v as f32),
        set_type: row.get(4)?,
        is_completed: row.get(5)?,
        completed_at: optional_millis_column(row, 6)?,
    })
}

impl Database {
    /// Insert or replace a workout with all of its exercises and sets
    pub fn store_workout(&mut self, workout: &Workout) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO workouts (id, title, workout_type, start_time, end_time, is_completed, \
             template_id, notes, total_volume, total_reps, availability, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, \
             workout_type = excluded.workout_type, start_time = excluded.start_time, \
             end_time = excluded.end_time, is_completed = excluded.is_completed, \
             template_id = excluded.template_id, notes = excluded.notes, \
             total_volume = excluded.total_volume, total_reps = excluded.total_reps, \
             availability = excluded.availability, updated_at = excluded.updated_at",
            params![
                workout.id,
                workout.title,
                workout.workout_type,
                to_millis(workout.start_time),
                workout.end_time.map(to_millis),
                workout.is_completed,
                workout.template_id,
                workout.notes,
                workout.total_volume,
                workout.total_reps,
                serde_json::to_string(&workout.availability)?,
                to_millis(workout.created_at),
                to_millis(workout.updated_at),
            ],
        )?;

        // Sets cascade from their exercise rows
        tx.execute(
            "DELETE FROM workout_exercises WHERE workout_id = ?1",
            params![workout.id],
        )?;

        for (position, exercise) in workout.exercises.iter().enumerate() {
            tx.execute(
                "INSERT INTO workout_exercises (id, workout_id, exercise_id, title, position, \
                 target_sets, target_reps, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    exercise.id,
                    workout.id,
                    exercise.exercise_id,
                    exercise.title,
                    position as i64,
                    exercise.target_sets,
                    exercise.target_reps,
                    exercise.notes,
                ],
            )?;

            for (set_position, set) in exercise.sets.iter().enumerate() {
                tx.execute(
                    "INSERT INTO workout_sets (id, workout_exercise_id, position, weight, reps, \
                     rpe, set_type, is_completed, completed_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        set.id,
                        exercise.id,
                        set_position as i64,
                        set.weight,
                        set.reps,
                        set.rpe.map(f64::from),
                        set.set_type,
                        set.is_completed,
                        set.completed_at.map(to_millis),
                    ],
                )?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Saved workout {} ({} exercises, {} sets)",
            workout.id,
            workout.exercises.len(),
            workout.set_count()
        );
        Ok(())
    }

    pub fn get_workout(&self, id: &str) -> Result<Option<Workout>> {
        let workout = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_WORKOUT),
                params![id],
                workout_from_row,
            )
            .optional()?;

        match workout {
            Some(mut workout) => {
                workout.exercises = self.load_workout_exercises(&workout.id)?;
                Ok(Some(workout))
            }
            None => Ok(None),
        }
    }

    /// Workouts, newest first
    pub fn list_workouts(&self, limit: Option<u32>) -> Result<Vec<Workout>> {
        let limit = limit.map(i64::from).unwrap_or(-1);
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY start_time DESC LIMIT ?1",
            SELECT_WORKOUT
        ))?;
        let rows = stmt.query_map(params![limit], workout_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }

        for workout in &mut out {
            workout.exercises = self.load_workout_exercises(&workout.id)?;
        }
        Ok(out)
    }

    pub fn delete_workout(&mut self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM workouts WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn load_workout_exercises(&self, workout_id: &str) -> Result<Vec<WorkoutExercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, title, target_sets, target_reps, notes \
             FROM workout_exercises WHERE workout_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![workout_id], |row| {
            Ok(WorkoutExercise {
                id: row.get(0)?,
                exercise_id: row.get(1)?,
                title: row.get(2)?,
                target_sets: row.get(3)?,
                target_reps: row.get(4)?,
                notes: row.get(5)?,
                sets: Vec::new(),
            })
        })?;
        let mut exercises = Vec::new();
        for row in rows {
            exercises.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, weight, reps, rpe, set_type, is_completed, completed_at \
             FROM workout_sets WHERE workout_exercise_id = ?1 ORDER BY position",
        )?;
        for exercise in &mut exercises {
            let sets = stmt.query_map(params![exercise.id], set_from_row)?;
            for set in sets {
                exercise.sets.push(set?);
            }
        }
        Ok(exercises)
    }
}
