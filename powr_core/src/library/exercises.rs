use std::collections::HashSet;

use super::Library;
use crate::id::{generate_id, IdSource};
use crate::nostr::{EventMapping, NostrEvent};
use crate::notify::ChangeAction;
use crate::types::*;
use crate::{Error, Result};

/// Catalog search criteria; unset fields match everything
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseFilter {
    /// Case-insensitive substring of the title or any tag
    pub query: Option<String>,
    pub category: Option<ExerciseCategory>,
    pub exercise_type: Option<ExerciseType>,
    pub equipment: Option<Equipment>,
    pub tag: Option<String>,
}

impl ExerciseFilter {
    pub fn matches(&self, exercise: &BaseExercise) -> bool {
        if let Some(query) = &self.query {
            let query = query.to_lowercase();
            let in_title = exercise.title.to_lowercase().contains(&query);
            let in_tags = exercise
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&query));
            if !in_title && !in_tags {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != exercise.category) {
            return false;
        }
        if self.exercise_type.is_some_and(|t| t != exercise.exercise_type) {
            return false;
        }
        if self.equipment.is_some_and(|e| e != exercise.equipment) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !exercise.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        true
    }
}

fn validate_new_exercise(exercise: &NewExercise) -> Result<()> {
    if exercise.title.trim().is_empty() {
        return Err(Error::Validation("exercise title must not be empty".into()));
    }
    if exercise.format.is_empty() {
        return Err(Error::Validation(format!(
            "exercise '{}' must track at least one field",
            exercise.title
        )));
    }
    let unique: HashSet<_> = exercise.format.iter().collect();
    if unique.len() != exercise.format.len() {
        return Err(Error::Validation(format!(
            "exercise '{}' lists a format field twice",
            exercise.title
        )));
    }
    Ok(())
}

impl Library {
    pub fn create_exercise(&mut self, new: NewExercise) -> Result<BaseExercise> {
        validate_new_exercise(&new)?;
        let now = super::now();
        let exercise = BaseExercise {
            id: generate_id(IdSource::Local),
            title: new.title.trim().to_string(),
            exercise_type: new.exercise_type,
            category: new.category,
            equipment: new.equipment,
            description: new.description,
            instructions: new.instructions,
            tags: new.tags,
            format: new.format,
            weight_unit: new.weight_unit,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        };
        self.db.save_exercise(&exercise)?;
        tracing::info!("Created exercise {} ({})", exercise.title, exercise.id);
        self.notifier
            .notify(Entity::Exercise, &exercise.id, ChangeAction::Created);
        Ok(exercise)
    }

    pub fn get_exercise(&self, id: &str) -> Result<BaseExercise> {
        self.db
            .get_exercise(id)?
            .ok_or_else(|| Error::not_found("exercise", id))
    }

    pub fn list_exercises(&self) -> Result<Vec<BaseExercise>> {
        self.db.list_exercises()
    }

    pub fn search_exercises(&self, filter: &ExerciseFilter) -> Result<Vec<BaseExercise>> {
        let mut exercises = self.db.list_exercises()?;
        exercises.retain(|e| filter.matches(e));
        Ok(exercises)
    }

    /// Replace the editable fields of a catalog entry, keeping id and history
    pub fn update_exercise(&mut self, id: &str, new: NewExercise) -> Result<BaseExercise> {
        validate_new_exercise(&new)?;
        let mut exercise = self.get_exercise(id)?;
        exercise.title = new.title.trim().to_string();
        exercise.exercise_type = new.exercise_type;
        exercise.category = new.category;
        exercise.equipment = new.equipment;
        exercise.description = new.description;
        exercise.instructions = new.instructions;
        exercise.tags = new.tags;
        exercise.format = new.format;
        exercise.weight_unit = new.weight_unit;
        exercise.updated_at = super::now();

        self.db.save_exercise(&exercise)?;
        self.notifier
            .notify(Entity::Exercise, id, ChangeAction::Updated);
        Ok(exercise)
    }

    /// Remove a catalog entry. Templates and workouts that reference it keep
    /// their title snapshot.
    pub fn delete_exercise(&mut self, id: &str) -> Result<()> {
        if !self.db.delete_exercise(id)? {
            return Err(Error::not_found("exercise", id));
        }
        tracing::info!("Deleted exercise {}", id);
        self.notifier
            .notify(Entity::Exercise, id, ChangeAction::Deleted);
        Ok(())
    }

    /// Store an exercise received as a kind 33401 event
    pub fn import_exercise_event(&mut self, event: &NostrEvent) -> Result<BaseExercise> {
        let exercise = BaseExercise::from_event(event)?;
        let existed = self.db.get_exercise(&exercise.id)?.is_some();
        self.db.save_exercise(&exercise)?;
        let action = if existed {
            ChangeAction::Updated
        } else {
            ChangeAction::Created
        };
        tracing::debug!("Imported exercise event {} ({:?})", exercise.id, action);
        self.notifier.notify(Entity::Exercise, &exercise.id, action);
        Ok(exercise)
    }

    pub fn exercise_event(&self, id: &str, author: &str) -> Result<NostrEvent> {
        Ok(self.get_exercise(id)?.to_event(author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeEvent;

    fn squat() -> NewExercise {
        let mut new = NewExercise::new(
            "Back Squat",
            ExerciseType::Strength,
            ExerciseCategory::Legs,
            Equipment::Barbell,
        );
        new.tags = vec!["compound".into()];
        new
    }

    #[test]
    fn test_create_get_and_list() {
        let mut library = Library::open_in_memory().unwrap();
        let created = library.create_exercise(squat()).unwrap();

        assert!(crate::id::is_local_id(&created.id));
        assert_eq!(library.get_exercise(&created.id).unwrap(), created);
        assert_eq!(library.list_exercises().unwrap().len(), 1);
    }

    #[test]
    fn test_create_rejects_blank_title_and_empty_format() {
        let mut library = Library::open_in_memory().unwrap();

        let mut blank = squat();
        blank.title = "   ".into();
        assert!(matches!(
            library.create_exercise(blank),
            Err(Error::Validation(_))
        ));

        let mut no_format = squat();
        no_format.format.clear();
        assert!(matches!(
            library.create_exercise(no_format),
            Err(Error::Validation(_))
        ));
        assert!(library.list_exercises().unwrap().is_empty());
    }

    #[test]
    fn test_search_filters_combine() {
        let mut library = Library::open_in_memory().unwrap();
        library.seed_default_catalog().unwrap();

        let legs = library
            .search_exercises(&ExerciseFilter {
                category: Some(ExerciseCategory::Legs),
                equipment: Some(Equipment::Barbell),
                ..Default::default()
            })
            .unwrap();
        assert!(!legs.is_empty());
        assert!(legs
            .iter()
            .all(|e| e.category == ExerciseCategory::Legs && e.equipment == Equipment::Barbell));

        let by_text = library
            .search_exercises(&ExerciseFilter {
                query: Some("SQUAT".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].title, "Back Squat");

        let by_tag = library
            .search_exercises(&ExerciseFilter {
                tag: Some("isometric".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_tag.len(), 1);
    }

    #[test]
    fn test_update_keeps_id_and_created_at() {
        let mut library = Library::open_in_memory().unwrap();
        let created = library.create_exercise(squat()).unwrap();

        let mut changes = squat();
        changes.title = "High Bar Squat".into();
        changes.equipment = Equipment::Machine;
        let updated = library.update_exercise(&created.id, changes).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(
            library.get_exercise(&created.id).unwrap().title,
            "High Bar Squat"
        );
    }

    #[test]
    fn test_missing_exercise_is_not_found() {
        let mut library = Library::open_in_memory().unwrap();
        assert!(matches!(
            library.get_exercise("local:nope"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            library.update_exercise("local:nope", squat()),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            library.delete_exercise("local:nope"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_mutations_notify_subscribers() {
        let mut library = Library::open_in_memory().unwrap();
        let rx = library.subscribe();

        let created = library.create_exercise(squat()).unwrap();
        library.update_exercise(&created.id, squat()).unwrap();
        library.delete_exercise(&created.id).unwrap();

        let actions: Vec<ChangeEvent> = rx.try_iter().collect();
        assert_eq!(
            actions.iter().map(|e| e.action).collect::<Vec<_>>(),
            vec![
                ChangeAction::Created,
                ChangeAction::Updated,
                ChangeAction::Deleted
            ]
        );
        assert!(actions
            .iter()
            .all(|e| e.entity == Entity::Exercise && e.id == created.id));
    }

    #[test]
    fn test_event_export_and_import() {
        let mut source = Library::open_in_memory().unwrap();
        let created = source.create_exercise(squat()).unwrap();
        let event = source.exercise_event(&created.id, &"a".repeat(64)).unwrap();

        let mut target = Library::open_in_memory().unwrap();
        let rx = target.subscribe();
        let imported = target.import_exercise_event(&event).unwrap();

        assert_eq!(imported.id, created.id);
        assert_eq!(imported.title, "Back Squat");
        assert!(imported.availability.has(StorageSource::Nostr));
        assert_eq!(rx.try_recv().unwrap().action, ChangeAction::Created);

        target.import_exercise_event(&event).unwrap();
        assert_eq!(rx.try_recv().unwrap().action, ChangeAction::Updated);
        assert_eq!(target.list_exercises().unwrap().len(), 1);
    }

    #[test]
    fn test_import_rejects_event_without_d_tag() {
        let mut library = Library::open_in_memory().unwrap();
        let created = library.create_exercise(squat()).unwrap();
        let mut event = library.exercise_event(&created.id, "").unwrap();
        event.tags.retain(|t| t.first().map(String::as_str) != Some("d"));

        let mut other = Library::open_in_memory().unwrap();
        assert!(matches!(
            other.import_exercise_event(&event),
            Err(Error::Validation(_))
        ));
    }
}
