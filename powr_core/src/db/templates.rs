//! Template rows and their exercise configurations.

use rusqlite::{params, OptionalExtension, Row};

use super::{json_column, millis_column, to_millis, Database};
use crate::{Result, TemplateExercise, WorkoutTemplate};

const SELECT_TEMPLATE: &str = "SELECT id, title, template_type, description, is_archived, \
     availability, created_at, updated_at FROM templates";

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutTemplate> {
    Ok(WorkoutTemplate {
        id: row.get(0)?,
        title: row.get(1)?,
        template_type: row.get(2)?,
        description: row.get(3)?,
        is_archived: row.get(4)?,
        availability: json_column(row, 5)?,
        created_at: millis_column(row, 6)?,
        updated_at: millis_column(row, 7)?,
        exercises: Vec::new(),
    })
}

impl Database {
    /// Insert or replace a template; its exercise configs are rewritten in full
    pub fn save_template(&mut self, template: &WorkoutTemplate) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO templates (id, title, template_type, description, is_archived, \
             availability, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, \
             template_type = excluded.template_type, description = excluded.description, \
             is_archived = excluded.is_archived, availability = excluded.availability, \
             updated_at = excluded.updated_at",
            params![
                template.id,
                template.title,
                template.template_type,
                template.description,
                template.is_archived,
                serde_json::to_string(&template.availability)?,
                to_millis(template.created_at),
                to_millis(template.updated_at),
            ],
        )?;

        tx.execute(
            "DELETE FROM template_exercises WHERE template_id = ?1",
            params![template.id],
        )?;
        for (position, exercise) in template.exercises.iter().enumerate() {
            tx.execute(
                "INSERT INTO template_exercises (id, template_id, exercise_id, title, position, \
                 target_sets, target_reps, target_weight, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    exercise.id,
                    template.id,
                    exercise.exercise_id,
                    exercise.title,
                    position as i64,
                    exercise.target_sets,
                    exercise.target_reps,
                    exercise.target_weight,
                    exercise.notes,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(
            "Saved template {} with {} exercises",
            template.id,
            template.exercises.len()
        );
        Ok(())
    }

    pub fn get_template(&self, id: &str) -> Result<Option<WorkoutTemplate>> {
        let template = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TEMPLATE),
                params![id],
                template_from_row,
            )
            .optional()?;

        match template {
            Some(mut template) => {
                template.exercises = self.load_template_exercises(&template.id)?;
                Ok(Some(template))
            }
            None => Ok(None),
        }
    }

    /// Templates ordered by most recently updated
    pub fn list_templates(&self, include_archived: bool) -> Result<Vec<WorkoutTemplate>> {
        let filter = if include_archived {
            ""
        } else {
            " WHERE is_archived = 0"
        };
        let mut stmt = self.conn.prepare(&format!(
            "{}{} ORDER BY updated_at DESC, title",
            SELECT_TEMPLATE, filter
        ))?;
        let rows = stmt.query_map([], template_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }

        for template in &mut out {
            template.exercises = self.load_template_exercises(&template.id)?;
        }
        Ok(out)
    }

    /// Delete a template and its exercise configs. Catalog entries are untouched.
    pub fn delete_template(&mut self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn set_template_archived(&mut self, id: &str, archived: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE templates SET is_archived = ?1, updated_at = ?2 WHERE id = ?3",
            params![archived, to_millis(chrono::Utc::now()), id],
        )?;
        Ok(changed > 0)
    }

    fn load_template_exercises(&self, template_id: &str) -> Result<Vec<TemplateExercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, title, target_sets, target_reps, target_weight, notes \
             FROM template_exercises WHERE template_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![template_id], |row| {
            Ok(TemplateExercise {
                id: row.get(0)?,
                exercise_id: row.get(1)?,
                title: row.get(2)?,
                target_sets: row.get(3)?,
                target_reps: row.get(4)?,
                target_weight: row.get(5)?,
                notes: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
