use super::Library;
use crate::id::{generate_id, IdSource};
use crate::nostr::{EventMapping, NostrEvent};
use crate::notify::ChangeAction;
use crate::types::*;
use crate::{Error, Result};

/// What to do with the source template once a workout finishes
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateAction {
    KeepOriginal,
    UpdateExisting,
    SaveAsNew { title: String },
}

fn validate_new_template(template: &NewTemplate) -> Result<()> {
    if template.title.trim().is_empty() {
        return Err(Error::Validation("template title must not be empty".into()));
    }
    if let Some(config) = template.exercises.iter().find(|c| c.target_sets == 0) {
        return Err(Error::Validation(format!(
            "template exercise '{}' needs at least one target set",
            config.title
        )));
    }
    Ok(())
}

/// Planned exercises mirroring what was actually performed
///
/// Targets come from the first working set; warmups only count when an
/// exercise has nothing else.
fn configs_from_workout(workout: &Workout) -> Vec<TemplateExercise> {
    workout
        .exercises
        .iter()
        .map(|exercise| {
            let reference = exercise
                .sets
                .iter()
                .find(|s| s.set_type != SetType::Warmup)
                .or_else(|| exercise.sets.first());
            let mut config = TemplateExercise::new(
                exercise.exercise_id.clone(),
                exercise.title.clone(),
                (exercise.sets.len() as u32).max(1),
                reference.map(|s| s.reps).unwrap_or(0),
            );
            config.target_weight = reference.map(|s| s.weight).filter(|w| *w > 0.0);
            config.notes = exercise.notes.clone();
            config
        })
        .collect()
}

impl Library {
    pub fn create_template(&mut self, new: NewTemplate) -> Result<WorkoutTemplate> {
        validate_new_template(&new)?;
        let now = super::now();
        let template = WorkoutTemplate {
            id: generate_id(IdSource::Local),
            title: new.title.trim().to_string(),
            template_type: new.template_type,
            description: new.description,
            exercises: new.exercises,
            is_archived: false,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        };
        self.db.save_template(&template)?;
        tracing::info!("Created template {} ({})", template.title, template.id);
        self.notifier
            .notify(Entity::Template, &template.id, ChangeAction::Created);
        Ok(template)
    }

    pub fn get_template(&self, id: &str) -> Result<WorkoutTemplate> {
        self.db
            .get_template(id)?
            .ok_or_else(|| Error::not_found("template", id))
    }

    pub fn list_templates(&self, include_archived: bool) -> Result<Vec<WorkoutTemplate>> {
        self.db.list_templates(include_archived)
    }

    pub fn update_template(&mut self, id: &str, new: NewTemplate) -> Result<WorkoutTemplate> {
        validate_new_template(&new)?;
        let mut template = self.get_template(id)?;
        template.title = new.title.trim().to_string();
        template.template_type = new.template_type;
        template.description = new.description;
        template.exercises = new.exercises;
        template.updated_at = super::now();

        self.db.save_template(&template)?;
        self.notifier
            .notify(Entity::Template, id, ChangeAction::Updated);
        Ok(template)
    }

    /// Remove a template and its exercise configurations. Catalog entries
    /// and workouts started from it are untouched.
    pub fn delete_template(&mut self, id: &str) -> Result<()> {
        if !self.db.delete_template(id)? {
            return Err(Error::not_found("template", id));
        }
        tracing::info!("Deleted template {}", id);
        self.notifier
            .notify(Entity::Template, id, ChangeAction::Deleted);
        Ok(())
    }

    /// Hide or restore a template in the default listing
    pub fn archive_template(&mut self, id: &str, archived: bool) -> Result<()> {
        if !self.db.set_template_archived(id, archived)? {
            return Err(Error::not_found("template", id));
        }
        let action = if archived {
            ChangeAction::Archived
        } else {
            ChangeAction::Unarchived
        };
        self.notifier.notify(Entity::Template, id, action);
        Ok(())
    }

    /// Save a new template from the exercises of a finished workout
    pub fn create_template_from_workout(
        &mut self,
        workout: &Workout,
        title: Option<&str>,
    ) -> Result<WorkoutTemplate> {
        self.create_template(NewTemplate {
            title: title.unwrap_or(&workout.title).to_string(),
            template_type: workout.workout_type,
            description: workout.notes.clone(),
            exercises: configs_from_workout(workout),
        })
    }

    /// Overwrite a template's exercise plan with what the workout performed
    pub fn update_template_from_workout(
        &mut self,
        template_id: &str,
        workout: &Workout,
    ) -> Result<WorkoutTemplate> {
        let mut template = self.get_template(template_id)?;
        template.exercises = configs_from_workout(workout);
        template.updated_at = super::now();

        self.db.save_template(&template)?;
        tracing::info!(
            "Updated template {} from workout {}",
            template_id,
            workout.id
        );
        self.notifier
            .notify(Entity::Template, template_id, ChangeAction::Updated);
        Ok(template)
    }

    /// Carry out the caller's post-workout choice; returns the template that
    /// was written, if any
    pub fn apply_template_action(
        &mut self,
        workout: &Workout,
        action: TemplateAction,
    ) -> Result<Option<WorkoutTemplate>> {
        match action {
            TemplateAction::KeepOriginal => Ok(None),
            TemplateAction::UpdateExisting => {
                let template_id = workout.template_id.as_deref().ok_or_else(|| {
                    Error::Validation(format!(
                        "workout {} was not started from a template",
                        workout.id
                    ))
                })?;
                self.update_template_from_workout(template_id, workout)
                    .map(Some)
            }
            TemplateAction::SaveAsNew { title } => self
                .create_template_from_workout(workout, Some(&title))
                .map(Some),
        }
    }

    /// Store a template received as a kind 33402 event, filling exercise
    /// titles from the local catalog where possible
    pub fn import_template_event(&mut self, event: &NostrEvent) -> Result<WorkoutTemplate> {
        let mut template = WorkoutTemplate::from_event(event)?;
        for config in &mut template.exercises {
            if let Some(exercise) = self.db.get_exercise(&config.exercise_id)? {
                config.title = exercise.title;
            }
        }

        let existing = self.db.get_template(&template.id)?;
        if let Some(existing) = &existing {
            template.is_archived = existing.is_archived;
            template.created_at = existing.created_at;
        }
        self.db.save_template(&template)?;
        let action = if existing.is_some() {
            ChangeAction::Updated
        } else {
            ChangeAction::Created
        };
        tracing::debug!("Imported template event {} ({:?})", template.id, action);
        self.notifier.notify(Entity::Template, &template.id, action);
        Ok(template)
    }

    pub fn template_event(&self, id: &str, author: &str) -> Result<NostrEvent> {
        Ok(self.get_template(id)?.to_event(author))
    }
}
