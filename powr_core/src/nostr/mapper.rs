//! Conversions between catalog exercises, templates, workout records and events.

use chrono::{DateTime, Utc};

use super::tags::{ExerciseRef, ExerciseTag, Tag};
use super::{NostrEvent, KIND_EXERCISE_TEMPLATE, KIND_WORKOUT_RECORD, KIND_WORKOUT_TEMPLATE};
use crate::id::{generate_id, IdSource};
use crate::types::*;
use crate::{Error, Result};

/// A domain object with a tag-array event representation
pub trait EventMapping: Sized {
    const KIND: u16;
    const REQUIRED_TAGS: &'static [&'static str];

    /// Build an unsigned event; `author` is the hex pubkey used in references
    fn to_event(&self, author: &str) -> NostrEvent;

    /// Rebuild the domain object. Fails on any validation error.
    fn from_event(event: &NostrEvent) -> Result<Self>;

    /// Check kind, required tags and the shape of every known tag
    fn validate(event: &NostrEvent) -> Result<()> {
        event.require(Self::KIND, Self::REQUIRED_TAGS)?;
        event.parsed_tags().map(|_| ())
    }
}

const SET_TYPE_UNITS: &str = "warmup|normal|drop|failure";

fn unit_for(field: FormatField, weight_unit: WeightUnit) -> &'static str {
    match field {
        FormatField::Weight => weight_unit.as_str(),
        FormatField::Reps => "count",
        FormatField::Rpe => "0-10",
        FormatField::SetType => SET_TYPE_UNITS,
    }
}

fn event_time(event: &NostrEvent) -> DateTime<Utc> {
    DateTime::from_timestamp(event.created_at, 0).unwrap_or_else(Utc::now)
}

fn timestamp(secs: i64, name: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Validation(format!("tag '{}' is out of range: {}", name, secs)))
}

fn missing(name: &str) -> Error {
    Error::Validation(format!("missing required tag '{}'", name))
}

fn optional_content(content: &str) -> Option<String> {
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Split exercise tags into runs; a tag joins the previous run when
/// `same_run(last, tag)` holds
fn group_exercise_tags(
    tags: Vec<ExerciseTag>,
    same_run: impl Fn(&ExerciseTag, &ExerciseTag) -> bool,
) -> Vec<(ExerciseRef, Vec<ExerciseTag>)> {
    let mut groups: Vec<(ExerciseRef, Vec<ExerciseTag>)> = Vec::new();
    for tag in tags {
        if let Some((_, sets)) = groups
            .last_mut()
            .filter(|(_, sets)| sets.last().is_some_and(|last| same_run(last, &tag)))
        {
            sets.push(tag);
            continue;
        }
        groups.push((tag.reference.clone(), vec![tag]));
    }
    groups
}

fn same_exercise(a: &ExerciseTag, b: &ExerciseTag) -> bool {
    a.reference.id == b.reference.id
}

/// Template tags repeat one planned set; any change in the plan starts a new config
fn same_plan(a: &ExerciseTag, b: &ExerciseTag) -> bool {
    same_exercise(a, b) && a.reps == b.reps && a.weight == b.weight && a.set_type == b.set_type
}

// ============================================================================
// Exercise templates (kind 33401)
// ============================================================================

impl EventMapping for BaseExercise {
    const KIND: u16 = KIND_EXERCISE_TEMPLATE;
    const REQUIRED_TAGS: &'static [&'static str] =
        &["d", "title", "format", "format_units", "equipment"];

    fn to_event(&self, _author: &str) -> NostrEvent {
        let mut tags = vec![
            Tag::D(self.id.clone()),
            Tag::Title(self.title.clone()),
            Tag::Type(self.exercise_type.as_str().into()),
            Tag::Category(self.category.as_str().into()),
            Tag::Equipment(self.equipment.as_str().into()),
            Tag::Format(self.format.iter().map(|f| f.as_str().to_string()).collect()),
            Tag::FormatUnits(
                self.format
                    .iter()
                    .map(|f| unit_for(*f, self.weight_unit).to_string())
                    .collect(),
            ),
        ];
        tags.extend(self.instructions.iter().cloned().map(Tag::Instruction));
        tags.extend(self.tags.iter().cloned().map(Tag::Hashtag));

        let mut event = NostrEvent::new(
            Self::KIND,
            self.description.clone().unwrap_or_default(),
            tags,
        );
        event.created_at = self.updated_at.timestamp();
        event
    }

    fn from_event(event: &NostrEvent) -> Result<Self> {
        event.require(Self::KIND, Self::REQUIRED_TAGS)?;

        let mut id = None;
        let mut title = None;
        let mut exercise_type = None;
        let mut category = None;
        let mut equipment = None;
        let mut format = Vec::new();
        let mut units = Vec::new();
        let mut instructions = Vec::new();
        let mut hashtags = Vec::new();

        for tag in event.parsed_tags()? {
            match tag {
                Tag::D(v) => id = Some(v),
                Tag::Title(v) => title = Some(v),
                Tag::Type(v) => exercise_type = Some(v.parse::<ExerciseType>()?),
                Tag::Category(v) => category = Some(v.parse::<ExerciseCategory>()?),
                Tag::Equipment(v) => equipment = Some(v.parse::<Equipment>()?),
                Tag::Format(values) => {
                    format = values
                        .iter()
                        .map(|v| v.parse::<FormatField>())
                        .collect::<Result<Vec<_>>>()?
                }
                Tag::FormatUnits(values) => units = values,
                Tag::Instruction(v) => instructions.push(v),
                Tag::Hashtag(v) => hashtags.push(v),
                _ => {}
            }
        }

        if units.len() != format.len() {
            return Err(Error::Validation(format!(
                "format has {} fields but format_units has {}",
                format.len(),
                units.len()
            )));
        }
        let weight_unit = match format.iter().position(|f| *f == FormatField::Weight) {
            Some(index) => units[index].parse::<WeightUnit>()?,
            None => WeightUnit::default(),
        };

        // Older events carry the category only as a hashtag
        let category = category
            .or_else(|| hashtags.iter().find_map(|t| t.parse::<ExerciseCategory>().ok()))
            .unwrap_or(ExerciseCategory::Core);

        let created = event_time(event);
        Ok(BaseExercise {
            id: id.ok_or_else(|| missing("d"))?,
            title: title.ok_or_else(|| missing("title"))?,
            exercise_type: exercise_type.unwrap_or(ExerciseType::Strength),
            category,
            equipment: equipment.ok_or_else(|| missing("equipment"))?,
            description: optional_content(&event.content),
            instructions,
            tags: hashtags,
            format,
            weight_unit,
            availability: Availability::from_nostr(event.id.clone(), Utc::now()),
            created_at: created,
            updated_at: created,
        })
    }
}

// ============================================================================
// Workout templates (kind 33402)
// ============================================================================

impl EventMapping for WorkoutTemplate {
    const KIND: u16 = KIND_WORKOUT_TEMPLATE;
    const REQUIRED_TAGS: &'static [&'static str] = &["d", "title", "type"];

    fn to_event(&self, author: &str) -> NostrEvent {
        let mut tags = vec![
            Tag::D(self.id.clone()),
            Tag::Title(self.title.clone()),
            Tag::Type(self.template_type.as_str().into()),
        ];
        for exercise in &self.exercises {
            let reference = ExerciseRef::new(KIND_EXERCISE_TEMPLATE, author, &exercise.exercise_id);
            // One tag per planned set; a config without sets still needs one to survive
            for _ in 0..exercise.target_sets.max(1) {
                tags.push(Tag::Exercise(ExerciseTag {
                    reference: reference.clone(),
                    weight: exercise.target_weight,
                    reps: Some(exercise.target_reps),
                    rpe: None,
                    set_type: SetType::Normal,
                    completed: None,
                }));
            }
        }

        let mut event = NostrEvent::new(
            Self::KIND,
            self.description.clone().unwrap_or_default(),
            tags,
        );
        event.created_at = self.updated_at.timestamp();
        event
    }

    fn from_event(event: &NostrEvent) -> Result<Self> {
        event.require(Self::KIND, Self::REQUIRED_TAGS)?;

        let mut id = None;
        let mut title = None;
        let mut template_type = None;
        let mut exercise_tags = Vec::new();

        for tag in event.parsed_tags()? {
            match tag {
                Tag::D(v) => id = Some(v),
                Tag::Title(v) => title = Some(v),
                Tag::Type(v) => template_type = Some(v.parse::<WorkoutType>()?),
                Tag::Exercise(ex) => exercise_tags.push(ex),
                _ => {}
            }
        }

        let exercises = group_exercise_tags(exercise_tags, same_plan)
            .into_iter()
            .map(|(reference, sets)| {
                let first = &sets[0];
                let mut config = TemplateExercise::new(
                    reference.id.clone(),
                    reference.id.clone(),
                    sets.len() as u32,
                    first.reps.unwrap_or(0),
                );
                config.target_weight = first.weight;
                config
            })
            .collect();

        let created = event_time(event);
        Ok(WorkoutTemplate {
            id: id.ok_or_else(|| missing("d"))?,
            title: title.ok_or_else(|| missing("title"))?,
            template_type: template_type.ok_or_else(|| missing("type"))?,
            description: optional_content(&event.content),
            exercises,
            is_archived: false,
            availability: Availability::from_nostr(event.id.clone(), Utc::now()),
            created_at: created,
            updated_at: created,
        })
    }
}

// ============================================================================
// Workout records (kind 1301)
// ============================================================================

impl EventMapping for Workout {
    const KIND: u16 = KIND_WORKOUT_RECORD;
    const REQUIRED_TAGS: &'static [&'static str] = &["d", "title", "type", "start", "end"];

    fn to_event(&self, author: &str) -> NostrEvent {
        let end = self.end_time.unwrap_or(self.start_time);
        let mut tags = vec![
            Tag::D(self.id.clone()),
            Tag::Title(self.title.clone()),
            Tag::Type(self.workout_type.as_str().into()),
            Tag::Start(self.start_time.timestamp()),
            Tag::End(end.timestamp()),
            Tag::Completed(self.is_completed),
        ];
        if let Some(template_id) = &self.template_id {
            tags.push(Tag::Template(
                ExerciseRef::new(KIND_WORKOUT_TEMPLATE, author, template_id).encode(),
            ));
        }
        for exercise in &self.exercises {
            let reference = ExerciseRef::new(KIND_EXERCISE_TEMPLATE, author, &exercise.exercise_id);
            for set in &exercise.sets {
                tags.push(Tag::Exercise(ExerciseTag {
                    reference: reference.clone(),
                    weight: Some(set.weight),
                    reps: Some(set.reps),
                    rpe: set.rpe,
                    set_type: set.set_type,
                    completed: Some(set.is_completed),
                }));
            }
        }

        let mut event = NostrEvent::new(Self::KIND, self.notes.clone().unwrap_or_default(), tags);
        event.created_at = end.timestamp();
        event
    }

    fn from_event(event: &NostrEvent) -> Result<Self> {
        event.require(Self::KIND, Self::REQUIRED_TAGS)?;

        let mut id = None;
        let mut title = None;
        let mut workout_type = None;
        let mut start = None;
        let mut end = None;
        let mut completed = true;
        let mut template_id = None;
        let mut exercise_tags = Vec::new();

        for tag in event.parsed_tags()? {
            match tag {
                Tag::D(v) => id = Some(v),
                Tag::Title(v) => title = Some(v),
                Tag::Type(v) => workout_type = Some(v.parse::<WorkoutType>()?),
                Tag::Start(ts) => start = Some(timestamp(ts, "start")?),
                Tag::End(ts) => end = Some(timestamp(ts, "end")?),
                Tag::Completed(done) => completed = done,
                Tag::Template(v) => {
                    template_id = Some(ExerciseRef::parse(&v, KIND_WORKOUT_TEMPLATE)?.id)
                }
                Tag::Exercise(ex) => exercise_tags.push(ex),
                _ => {}
            }
        }

        let start = start.ok_or_else(|| missing("start"))?;
        let end = end.ok_or_else(|| missing("end"))?;
        if end < start {
            return Err(Error::Validation("workout ends before it starts".into()));
        }

        let exercises = group_exercise_tags(exercise_tags, same_exercise)
            .into_iter()
            .map(|(reference, tags)| {
                let mut exercise = WorkoutExercise::new(reference.id.clone(), reference.id);
                exercise.sets = tags
                    .into_iter()
                    .map(|tag| {
                        let done = tag.completed.unwrap_or(true);
                        WorkoutSet {
                            id: generate_id(IdSource::Local),
                            weight: tag.weight.unwrap_or(0.0),
                            reps: tag.reps.unwrap_or(0),
                            rpe: tag.rpe,
                            set_type: tag.set_type,
                            is_completed: done,
                            completed_at: done.then_some(end),
                        }
                    })
                    .collect();
                exercise
            })
            .collect();

        let mut workout = Workout {
            id: id.ok_or_else(|| missing("d"))?,
            title: title.ok_or_else(|| missing("title"))?,
            workout_type: workout_type.ok_or_else(|| missing("type"))?,
            exercises,
            start_time: start,
            end_time: Some(end),
            is_completed: completed,
            template_id,
            notes: optional_content(&event.content),
            total_volume: 0.0,
            total_reps: 0,
            availability: Availability::from_nostr(event.id.clone(), Utc::now()),
            created_at: start,
            updated_at: end,
        };
        workout.recompute_totals();
        Ok(workout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const AUTHOR: &str = "f7234bd4c1394dda46d09f35bd384dd30cc552ad5541990f98844fb06676e9ca";

    fn squat() -> BaseExercise {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        BaseExercise {
            id: "local:m7abc-squat01".into(),
            title: "Back Squat".into(),
            exercise_type: ExerciseType::Strength,
            category: ExerciseCategory::Legs,
            equipment: Equipment::Barbell,
            description: Some("Bar on upper back".into()),
            instructions: vec!["Brace".into(), "Sit down and back".into()],
            tags: vec!["compound".into(), "legs".into()],
            format: default_format(),
            weight_unit: WeightUnit::Kg,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        }
    }

    fn leg_day() -> Workout {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut workout = Workout::new("Leg Day", WorkoutType::Strength, start);
        let mut exercise = WorkoutExercise::new("local:m7abc-squat01", "Back Squat");
        let mut warmup = WorkoutSet::new(60.0, 8);
        warmup.set_type = SetType::Warmup;
        warmup.is_completed = true;
        let mut work = WorkoutSet::new(102.5, 5);
        work.rpe = Some(8.5);
        exercise.sets = vec![warmup, work];
        workout.exercises.push(exercise);
        workout.template_id = Some("local:m7abc-tmpl01".into());
        workout.end_time = Some(start + chrono::Duration::minutes(45));
        workout.is_completed = true;
        workout.recompute_totals();
        workout
    }

    fn leg_template() -> WorkoutTemplate {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut squat = TemplateExercise::new("local:m7abc-squat01", "Back Squat", 3, 5);
        squat.target_weight = Some(100.0);
        WorkoutTemplate {
            id: "local:m7abc-tmpl01".into(),
            title: "Legs A".into(),
            template_type: WorkoutType::Strength,
            description: None,
            exercises: vec![squat, TemplateExercise::new("local:m7abc-lunge1", "Lunge", 2, 10)],
            is_archived: false,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exercise_roundtrip_is_idempotent() {
        let first = squat().to_event(AUTHOR);
        let parsed = BaseExercise::from_event(&first).unwrap();
        let second = parsed.to_event(AUTHOR);
        assert_eq!(first.tags, second.tags);
        assert_eq!(parsed.title, "Back Squat");
        assert_eq!(parsed.instructions.len(), 2);
        assert_eq!(parsed.description.as_deref(), Some("Bar on upper back"));
    }

    #[test]
    fn test_template_roundtrip_is_idempotent() {
        let first = leg_template().to_event(AUTHOR);
        let parsed = WorkoutTemplate::from_event(&first).unwrap();
        assert_eq!(parsed.exercises.len(), 2);
        assert_eq!(parsed.exercises[0].target_sets, 3);
        assert_eq!(parsed.exercises[0].target_weight, Some(100.0));
        assert_eq!(first.tags, parsed.to_event(AUTHOR).tags);
    }

    #[test]
    fn test_adjacent_configs_for_one_exercise_roundtrip() {
        let mut template = leg_template();
        let mut top = TemplateExercise::new("local:m7abc-squat01", "Back Squat", 3, 5);
        top.target_weight = Some(100.0);
        let mut back_off = TemplateExercise::new("local:m7abc-squat01", "Back Squat", 1, 8);
        back_off.target_weight = Some(80.0);
        template.exercises = vec![top, back_off];

        let first = template.to_event(AUTHOR);
        let parsed = WorkoutTemplate::from_event(&first).unwrap();
        assert_eq!(parsed.exercises.len(), 2);
        assert_eq!(parsed.exercises[0].target_sets, 3);
        assert_eq!(parsed.exercises[0].target_reps, 5);
        assert_eq!(parsed.exercises[1].target_sets, 1);
        assert_eq!(parsed.exercises[1].target_reps, 8);
        assert_eq!(parsed.exercises[1].target_weight, Some(80.0));
        assert_eq!(first.tags, parsed.to_event(AUTHOR).tags);
    }

    #[test]
    fn test_workout_with_invalid_set_values_rejected() {
        let mut event = leg_day().to_event(AUTHOR);
        let tag = event.tags.iter_mut().find(|t| t[0] == "exercise").unwrap();
        tag[2] = "NaN".into();
        tag[4] = "42".into();

        assert!(matches!(Workout::validate(&event), Err(Error::Validation(_))));
        assert!(matches!(
            Workout::from_event(&event),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_workout_roundtrip_is_idempotent() {
        let original = leg_day();
        let first = original.to_event(AUTHOR);
        let parsed = Workout::from_event(&first).unwrap();
        assert_eq!(parsed.total_volume, original.total_volume);
        assert_eq!(parsed.template_id, original.template_id);
        assert_eq!(parsed.exercises[0].sets.len(), 2);
        assert!(!parsed.exercises[0].sets[1].is_completed);
        assert_eq!(first.tags, parsed.to_event(AUTHOR).tags);
    }

    #[test]
    fn test_exercise_tag_shape() {
        let event = leg_day().to_event(AUTHOR);
        let tag = event
            .tags
            .iter()
            .find(|t| t[0] == "exercise" && t[5] == "normal")
            .unwrap();
        assert_eq!(
            tag,
            &vec![
                "exercise".to_string(),
                format!("33401:{}:local:m7abc-squat01", AUTHOR),
                "102.5".into(),
                "5".into(),
                "8.5".into(),
                "normal".into(),
                "false".into(),
            ]
        );
    }

    #[test]
    fn test_missing_d_tag_rejected() {
        let mut event = squat().to_event(AUTHOR);
        event.tags.retain(|t| t[0] != "d");
        assert!(matches!(
            BaseExercise::validate(&event),
            Err(Error::Validation(_))
        ));
        assert!(BaseExercise::from_event(&event).is_err());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let event = leg_template().to_event(AUTHOR);
        assert!(BaseExercise::from_event(&event).is_err());
        assert!(Workout::from_event(&event).is_err());
    }

    #[test]
    fn test_malformed_set_rejects_whole_record() {
        let mut event = leg_day().to_event(AUTHOR);
        let index = event.tags.iter().position(|t| t[0] == "exercise").unwrap();
        event.tags[index][3] = "five".into();
        assert!(Workout::validate(&event).is_err());
        assert!(Workout::from_event(&event).is_err());
    }

    #[test]
    fn test_category_falls_back_to_hashtag() {
        let mut event = squat().to_event(AUTHOR);
        event.tags.retain(|t| t[0] != "category");
        let parsed = BaseExercise::from_event(&event).unwrap();
        assert_eq!(parsed.category, ExerciseCategory::Legs);
    }

    #[test]
    fn test_imported_records_are_marked_nostr() {
        let mut event = squat().to_event(AUTHOR);
        event.id = Some("b".repeat(64));
        let parsed = BaseExercise::from_event(&event).unwrap();
        assert!(parsed.availability.has(StorageSource::Nostr));
        assert_eq!(
            parsed.availability.last_synced.unwrap().event_id,
            Some("b".repeat(64))
        );
    }
}
