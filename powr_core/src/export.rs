//! CSV export of workout history.
//!
//! One row per set. The file is written to a temp file beside the target and
//! renamed into place, so a crash never leaves a half-written export.

use crate::{Error, Result, Workout};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct SetRow<'a> {
    workout_id: &'a str,
    workout_title: &'a str,
    workout_type: &'a str,
    started_at: String,
    ended_at: Option<String>,
    exercise_id: &'a str,
    exercise_title: &'a str,
    set_number: usize,
    set_type: &'a str,
    weight: f64,
    reps: u32,
    rpe: Option<f32>,
    completed: bool,
}

/// Write every set of the completed workouts to `path`, replacing any
/// existing file. Returns the number of rows written.
pub fn export_workouts_csv(workouts: &[Workout], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = csv::Writer::from_writer(temp.as_file());

    let mut rows = 0;
    for workout in workouts.iter().filter(|w| w.is_completed) {
        for exercise in &workout.exercises {
            for (index, set) in exercise.sets.iter().enumerate() {
                writer.serialize(SetRow {
                    workout_id: &workout.id,
                    workout_title: &workout.title,
                    workout_type: workout.workout_type.as_str(),
                    started_at: workout.start_time.to_rfc3339(),
                    ended_at: workout.end_time.map(|t| t.to_rfc3339()),
                    exercise_id: &exercise.exercise_id,
                    exercise_title: &exercise.title,
                    set_number: index + 1,
                    set_type: set.set_type.as_str(),
                    weight: set.weight,
                    reps: set.reps,
                    rpe: set.rpe,
                    completed: set.is_completed,
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    drop(writer);
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} sets to {:?}", rows, path);
    Ok(rows)
}
