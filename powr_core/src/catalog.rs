//! Default exercise catalog.
//!
//! Built-in exercises seeded into an empty library. Their ids are stable so
//! templates and scripts can refer to them.

use crate::types::*;
use chrono::DateTime;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Built once and reused; seeding and tests only ever read it
static DEFAULT_EXERCISES: Lazy<Vec<BaseExercise>> = Lazy::new(build_default_exercises);

/// Get a reference to the cached default exercises
pub fn default_exercises() -> &'static [BaseExercise] {
    &DEFAULT_EXERCISES
}

/// Stable id of a built-in exercise
pub fn default_exercise_id(slug: &str) -> String {
    format!("local:seed-{}", slug)
}

fn exercise(
    slug: &str,
    title: &str,
    exercise_type: ExerciseType,
    category: ExerciseCategory,
    equipment: Equipment,
    tags: &[&str],
    instructions: &[&str],
) -> BaseExercise {
    // 2025-01-01T00:00:00Z
    let seeded_at = DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default();
    let format = match exercise_type {
        ExerciseType::Bodyweight => vec![FormatField::Reps, FormatField::Rpe, FormatField::SetType],
        _ => default_format(),
    };
    BaseExercise {
        id: default_exercise_id(slug),
        title: title.into(),
        exercise_type,
        category,
        equipment,
        description: None,
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
        format,
        weight_unit: WeightUnit::Kg,
        availability: Availability::local(),
        created_at: seeded_at,
        updated_at: seeded_at,
    }
}

fn build_default_exercises() -> Vec<BaseExercise> {
    use Equipment as Eq;
    use ExerciseCategory as Cat;
    use ExerciseType as Ty;

    vec![
        exercise(
            "back-squat",
            "Back Squat",
            Ty::Strength,
            Cat::Legs,
            Eq::Barbell,
            &["compound", "legs"],
            &[
                "Set the bar on your upper back",
                "Brace and sit down between your heels",
                "Drive up through the whole foot",
            ],
        ),
        exercise(
            "deadlift",
            "Deadlift",
            Ty::Strength,
            Cat::Pull,
            Eq::Barbell,
            &["compound", "posterior_chain"],
            &[
                "Bar over mid-foot, hips hinged",
                "Pull the slack out of the bar",
                "Stand up keeping the bar close",
            ],
        ),
        exercise(
            "romanian-deadlift",
            "Romanian Deadlift",
            Ty::Strength,
            Cat::Legs,
            Eq::Barbell,
            &["hinge", "hamstrings"],
            &["Soft knees, push the hips back", "Return by squeezing the glutes"],
        ),
        exercise(
            "bench-press",
            "Bench Press",
            Ty::Strength,
            Cat::Push,
            Eq::Barbell,
            &["compound", "chest"],
            &["Retract the shoulder blades", "Lower to the chest", "Press to lockout"],
        ),
        exercise(
            "overhead-press",
            "Overhead Press",
            Ty::Strength,
            Cat::Push,
            Eq::Barbell,
            &["compound", "shoulders"],
            &["Squeeze glutes and brace", "Press the bar in a straight line overhead"],
        ),
        exercise(
            "barbell-row",
            "Barbell Row",
            Ty::Strength,
            Cat::Pull,
            Eq::Barbell,
            &["compound", "back"],
            &["Hinge to roughly 45 degrees", "Row the bar to the lower ribs"],
        ),
        exercise(
            "pull-up",
            "Pull-up",
            Ty::Bodyweight,
            Cat::Pull,
            Eq::Bodyweight,
            &["back", "bodyweight"],
            &["Start from a dead hang", "Pull until the chin clears the bar"],
        ),
        exercise(
            "push-up",
            "Push-up",
            Ty::Bodyweight,
            Cat::Push,
            Eq::Bodyweight,
            &["chest", "bodyweight"],
            &["Hands under shoulders, body rigid", "Lower until the chest nearly touches"],
        ),
        exercise(
            "dumbbell-lunge",
            "Dumbbell Lunge",
            Ty::Strength,
            Cat::Legs,
            Eq::Dumbbell,
            &["unilateral", "legs"],
            &["Step forward", "Lower the back knee toward the floor", "Push back to standing"],
        ),
        exercise(
            "leg-press",
            "Leg Press",
            Ty::Strength,
            Cat::Legs,
            Eq::Machine,
            &["legs", "quads"],
            &["Feet shoulder width on the platform", "Lower under control and press"],
        ),
        exercise(
            "lat-pulldown",
            "Lat Pulldown",
            Ty::Strength,
            Cat::Pull,
            Eq::Cable,
            &["back"],
            &["Pull the bar to the upper chest", "Return slowly to full stretch"],
        ),
        exercise(
            "kettlebell-swing",
            "Kettlebell Swing",
            Ty::Strength,
            Cat::Legs,
            Eq::Kettlebell,
            &["hinge", "conditioning"],
            &["Hike the bell back", "Snap the hips to float it to chest height"],
        ),
        exercise(
            "plank",
            "Plank",
            Ty::Bodyweight,
            Cat::Core,
            Eq::Bodyweight,
            &["core", "isometric"],
            &["Forearms under shoulders", "Hold a straight line from head to heels"],
        ),
        exercise(
            "cable-crunch",
            "Cable Crunch",
            Ty::Strength,
            Cat::Core,
            Eq::Cable,
            &["core"],
            &["Kneel facing the stack", "Crunch the ribs toward the hips"],
        ),
    ]
}

/// Check a set of exercises for consistency
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate_exercises(exercises: &[BaseExercise]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for exercise in exercises {
        if exercise.id.is_empty() {
            errors.push(format!("Exercise '{}' has empty ID", exercise.title));
        }
        if !seen.insert(exercise.id.as_str()) {
            errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
        }
        if exercise.title.trim().is_empty() {
            errors.push(format!("Exercise '{}' has empty title", exercise.id));
        }
        if exercise.format.is_empty() {
            errors.push(format!("Exercise '{}' tracks no fields", exercise.id));
        }
        let unique_fields: HashSet<_> = exercise.format.iter().collect();
        if unique_fields.len() != exercise.format.len() {
            errors.push(format!("Exercise '{}' repeats a format field", exercise.id));
        }
    }

    for category in ExerciseCategory::all() {
        if !exercises.iter().any(|e| e.category == *category) {
            errors.push(format!("Catalog has no {} exercises", category));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let errors = validate_exercises(default_exercises());
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_default_ids_are_local() {
        for exercise in default_exercises() {
            assert!(crate::id::is_local_id(&exercise.id));
        }
        assert!(default_exercises()
            .iter()
            .any(|e| e.id == default_exercise_id("back-squat")));
    }

    #[test]
    fn test_bodyweight_exercises_skip_weight() {
        let pull_up = default_exercises()
            .iter()
            .find(|e| e.id == default_exercise_id("pull-up"))
            .unwrap();
        assert!(!pull_up.format.contains(&FormatField::Weight));
    }

    #[test]
    fn test_validation_reports_duplicates_and_missing_categories() {
        let squat = default_exercises()[0].clone();
        let errors = validate_exercises(&[squat.clone(), squat]);
        assert!(errors.iter().any(|e| e.contains("Duplicate")));
        assert!(errors.iter().any(|e| e.contains("no core exercises")));
    }
}
