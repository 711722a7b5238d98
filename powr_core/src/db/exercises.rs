//! Catalog exercise rows.

use rusqlite::{params, OptionalExtension, Row};

use super::{json_column, millis_column, to_millis, Database};
use crate::{BaseExercise, Result};

const SELECT_EXERCISE: &str = "SELECT id, title, exercise_type, category, equipment, description, \
     format, weight_unit, availability, created_at, updated_at FROM exercises";

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<BaseExercise> {
    Ok(BaseExercise {
        id: row.get(0)?,
        title: row.get(1)?,
        exercise_type: row.get(2)?,
        category: row.get(3)?,
        equipment: row.get(4)?,
        description: row.get(5)?,
        format: json_column(row, 6)?,
        weight_unit: row.get(7)?,
        availability: json_column(row, 8)?,
        created_at: millis_column(row, 9)?,
        updated_at: millis_column(row, 10)?,
        instructions: Vec::new(),
        tags: Vec::new(),
    })
}

impl Database {
    /// Insert or replace a catalog entry together with its tags and instructions
    pub fn save_exercise(&mut self, exercise: &BaseExercise) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO exercises (id, title, exercise_type, category, equipment, description, \
             format, weight_unit, availability, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, \
             exercise_type = excluded.exercise_type, category = excluded.category, \
             equipment = excluded.equipment, description = excluded.description, \
             format = excluded.format, weight_unit = excluded.weight_unit, \
             availability = excluded.availability, updated_at = excluded.updated_at",
            params![
                exercise.id,
                exercise.title,
                exercise.exercise_type,
                exercise.category,
                exercise.equipment,
                exercise.description,
                serde_json::to_string(&exercise.format)?,
                exercise.weight_unit,
                serde_json::to_string(&exercise.availability)?,
                to_millis(exercise.created_at),
                to_millis(exercise.updated_at),
            ],
        )?;

        tx.execute(
            "DELETE FROM exercise_tags WHERE exercise_id = ?1",
            params![exercise.id],
        )?;
        tx.execute(
            "DELETE FROM exercise_instructions WHERE exercise_id = ?1",
            params![exercise.id],
        )?;

        for tag in &exercise.tags {
            tx.execute(
                "INSERT OR IGNORE INTO exercise_tags (exercise_id, tag) VALUES (?1, ?2)",
                params![exercise.id, tag],
            )?;
        }
        for (position, instruction) in exercise.instructions.iter().enumerate() {
            tx.execute(
                "INSERT INTO exercise_instructions (exercise_id, position, instruction) \
                 VALUES (?1, ?2, ?3)",
                params![exercise.id, position as i64, instruction],
            )?;
        }

        tx.commit()?;
        tracing::debug!("Saved exercise {} ({})", exercise.id, exercise.title);
        Ok(())
    }

    pub fn get_exercise(&self, id: &str) -> Result<Option<BaseExercise>> {
        let exercise = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_EXERCISE),
                params![id],
                exercise_from_row,
            )
            .optional()?;

        match exercise {
            Some(mut exercise) => {
                self.load_exercise_children(&mut exercise)?;
                Ok(Some(exercise))
            }
            None => Ok(None),
        }
    }

    /// All catalog entries ordered by title
    pub fn list_exercises(&self) -> Result<Vec<BaseExercise>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY title COLLATE NOCASE", SELECT_EXERCISE))?;
        let rows = stmt.query_map([], exercise_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }

        for exercise in &mut out {
            self.load_exercise_children(exercise)?;
        }
        Ok(out)
    }

    /// Remove a catalog entry. Templates and workouts that reference it keep
    /// their rows and title snapshots.
    pub fn delete_exercise(&mut self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM exercises WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn load_exercise_children(&self, exercise: &mut BaseExercise) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM exercise_tags WHERE exercise_id = ?1 ORDER BY rowid")?;
        let tags = stmt.query_map(params![exercise.id], |row| row.get::<_, String>(0))?;
        for tag in tags {
            exercise.tags.push(tag?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT instruction FROM exercise_instructions WHERE exercise_id = ?1 ORDER BY position",
        )?;
        let steps = stmt.query_map(params![exercise.id], |row| row.get::<_, String>(0))?;
        for step in steps {
            exercise.instructions.push(step?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;
    use chrono::Utc;

    fn exercise(title: &str) -> BaseExercise {
        let now = Utc::now();
        BaseExercise {
            id: id::generate_id(id::IdSource::Local),
            title: title.into(),
            exercise_type: ExerciseType::Strength,
            category: ExerciseCategory::Legs,
            equipment: Equipment::Barbell,
            description: None,
            instructions: vec!["Brace".into(), "Descend".into(), "Drive up".into()],
            tags: vec!["compound".into(), "legs".into()],
            format: default_format(),
            weight_unit: WeightUnit::Kg,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_save_and_get_exercise() {
        let mut db = Database::open_in_memory().unwrap();
        let squat = exercise("Back Squat");
        db.save_exercise(&squat).unwrap();

        let loaded = db.get_exercise(&squat.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Back Squat");
        assert_eq!(loaded.instructions, squat.instructions);
        assert_eq!(loaded.tags, squat.tags);
        assert_eq!(loaded.format, squat.format);
        assert_eq!(loaded.availability, Availability::local());
    }

    #[test]
    fn test_resave_replaces_children() {
        let mut db = Database::open_in_memory().unwrap();
        let mut squat = exercise("Back Squat");
        db.save_exercise(&squat).unwrap();

        squat.instructions = vec!["Squat".into()];
        squat.tags = vec!["legs".into()];
        db.save_exercise(&squat).unwrap();

        let loaded = db.get_exercise(&squat.id).unwrap().unwrap();
        assert_eq!(loaded.instructions, vec!["Squat".to_string()]);
        assert_eq!(loaded.tags, vec!["legs".to_string()]);
    }

    #[test]
    fn test_list_is_sorted_by_title() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_exercise(&exercise("deadlift")).unwrap();
        db.save_exercise(&exercise("Bench Press")).unwrap();

        let titles: Vec<_> = db
            .list_exercises()
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Bench Press", "deadlift"]);
    }

    #[test]
    fn test_delete_cascades_children() {
        let mut db = Database::open_in_memory().unwrap();
        let squat = exercise("Back Squat");
        db.save_exercise(&squat).unwrap();

        assert!(db.delete_exercise(&squat.id).unwrap());
        assert!(db.get_exercise(&squat.id).unwrap().is_none());
        assert!(!db.delete_exercise(&squat.id).unwrap());

        let orphans: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM exercise_instructions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
