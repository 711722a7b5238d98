//! Core domain types for POWR.
//!
//! This module defines the fundamental types used throughout the system:
//! - Catalog exercises and their tracking format
//! - Sets, workout exercises and workouts
//! - Templates and their exercise configurations
//! - Availability metadata shared by every persisted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum using
/// the same lowercase names that serde, SQLite rows and event tags use.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$($name::$variant,)+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

// ============================================================================
// Exercise Catalog Types
// ============================================================================

/// Broad kind of movement
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Strength,
    Cardio,
    Bodyweight,
}

string_enum!(ExerciseType {
    Strength => "strength",
    Cardio => "cardio",
    Bodyweight => "bodyweight",
});

/// Muscle-group category used for filtering the library
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Push,
    Pull,
    Legs,
    Core,
}

string_enum!(ExerciseCategory {
    Push => "push",
    Pull => "pull",
    Legs => "legs",
    Core => "core",
});

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Kettlebell,
    Machine,
    Cable,
    Bodyweight,
    Other,
}

string_enum!(Equipment {
    Barbell => "barbell",
    Dumbbell => "dumbbell",
    Kettlebell => "kettlebell",
    Machine => "machine",
    Cable => "cable",
    Bodyweight => "bodyweight",
    Other => "other",
});

/// A value an exercise tracks per set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormatField {
    Weight,
    Reps,
    Rpe,
    SetType,
}

string_enum!(FormatField {
    Weight => "weight",
    Reps => "reps",
    Rpe => "rpe",
    SetType => "set_type",
});

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

string_enum!(WeightUnit {
    Kg => "kg",
    Lb => "lb",
});

/// Default tracked fields for a new exercise
pub fn default_format() -> Vec<FormatField> {
    vec![
        FormatField::Weight,
        FormatField::Reps,
        FormatField::Rpe,
        FormatField::SetType,
    ]
}

/// A catalog entry (e.g., "Back Squat")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BaseExercise {
    pub id: String,
    pub title: String,
    pub exercise_type: ExerciseType,
    pub category: ExerciseCategory,
    pub equipment: Equipment,
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub tags: Vec<String>,
    pub format: Vec<FormatField>,
    pub weight_unit: WeightUnit,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating or replacing a catalog entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewExercise {
    pub title: String,
    pub exercise_type: ExerciseType,
    pub category: ExerciseCategory,
    pub equipment: Equipment,
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub tags: Vec<String>,
    pub format: Vec<FormatField>,
    pub weight_unit: WeightUnit,
}

impl NewExercise {
    /// Minimal definition with the default tracking format
    pub fn new(
        title: impl Into<String>,
        exercise_type: ExerciseType,
        category: ExerciseCategory,
        equipment: Equipment,
    ) -> Self {
        Self {
            title: title.into(),
            exercise_type,
            category,
            equipment,
            description: None,
            instructions: Vec::new(),
            tags: Vec::new(),
            format: default_format(),
            weight_unit: WeightUnit::default(),
        }
    }
}

// ============================================================================
// Availability
// ============================================================================

/// A storage backend that may hold a copy of a record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StorageSource {
    Local,
    Backup,
    Nostr,
}

string_enum!(StorageSource {
    Local => "local",
    Backup => "backup",
    Nostr => "nostr",
});

/// Last successful sync to the decentralized network
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub synced_at: DateTime<Utc>,
    pub event_id: Option<String>,
    #[serde(default)]
    pub relays: Vec<String>,
}

/// Which backends hold a copy of a record. Advisory, display-only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub source: Vec<StorageSource>,
    #[serde(default)]
    pub last_synced: Option<SyncRecord>,
}

impl Availability {
    pub fn local() -> Self {
        Self {
            source: vec![StorageSource::Local],
            last_synced: None,
        }
    }

    /// Availability of a record received from the network and stored locally
    pub fn from_nostr(event_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            source: vec![StorageSource::Local, StorageSource::Nostr],
            last_synced: Some(SyncRecord {
                synced_at: now,
                event_id,
                relays: Vec::new(),
            }),
        }
    }

    pub fn has(&self, source: StorageSource) -> bool {
        self.source.contains(&source)
    }

    pub fn mark_synced(&mut self, record: SyncRecord) {
        if !self.has(StorageSource::Nostr) {
            self.source.push(StorageSource::Nostr);
        }
        self.last_synced = Some(record);
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self::local()
    }
}

// ============================================================================
// Sets and Workouts
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    Warmup,
    #[default]
    Normal,
    Drop,
    Failure,
}

string_enum!(SetType {
    Warmup => "warmup",
    Normal => "normal",
    Drop => "drop",
    Failure => "failure",
});

/// A single performed (or planned) set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub id: String,
    pub weight: f64,
    pub reps: u32,
    pub rpe: Option<f32>,
    pub set_type: SetType,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn new(weight: f64, reps: u32) -> Self {
        Self {
            id: crate::id::generate_id(crate::id::IdSource::Local),
            weight,
            reps,
            rpe: None,
            set_type: SetType::Normal,
            is_completed: false,
            completed_at: None,
        }
    }

    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }
}

/// Partial update merged into an existing set
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SetPatch {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub rpe: Option<Option<f32>>,
    pub set_type: Option<SetType>,
}

/// Workout style shared by templates and records
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    #[default]
    Strength,
    Circuit,
    Emom,
    Amrap,
}

string_enum!(WorkoutType {
    Strength => "strength",
    Circuit => "circuit",
    Emom => "emom",
    Amrap => "amrap",
});

/// An exercise as performed inside a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    pub id: String,
    pub exercise_id: String,
    /// Title snapshot for offline display
    pub title: String,
    pub sets: Vec<WorkoutSet>,
    pub target_sets: Option<u32>,
    pub target_reps: Option<u32>,
    pub notes: Option<String>,
}

impl WorkoutExercise {
    pub fn new(exercise_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: crate::id::generate_id(crate::id::IdSource::Local),
            exercise_id: exercise_id.into(),
            title: title.into(),
            sets: Vec::new(),
            target_sets: None,
            target_reps: None,
            notes: None,
        }
    }

    pub fn from_exercise(exercise: &BaseExercise) -> Self {
        Self::new(exercise.id.clone(), exercise.title.clone())
    }

    pub fn volume(&self) -> f64 {
        self.sets.iter().map(WorkoutSet::volume).sum()
    }

    /// Total reps, or `None` if they do not fit in a `u32`
    pub fn checked_reps(&self) -> Option<u32> {
        self.sets.iter().try_fold(0u32, |acc, s| acc.checked_add(s.reps))
    }
}

/// A workout session, in progress or finished
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: String,
    pub title: String,
    pub workout_type: WorkoutType,
    pub exercises: Vec<WorkoutExercise>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub template_id: Option<String>,
    pub notes: Option<String>,
    pub total_volume: f64,
    pub total_reps: u32,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    pub fn new(title: impl Into<String>, workout_type: WorkoutType, now: DateTime<Utc>) -> Self {
        Self {
            id: crate::id::generate_id(crate::id::IdSource::Local),
            title: title.into(),
            workout_type,
            exercises: Vec::new(),
            start_time: now,
            end_time: None,
            is_completed: false,
            template_id: None,
            notes: None,
            total_volume: 0.0,
            total_reps: 0,
            availability: Availability::local(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every set in exercise order
    pub fn sets(&self) -> impl Iterator<Item = &WorkoutSet> {
        self.exercises.iter().flat_map(|e| e.sets.iter())
    }

    /// Recompute aggregates from the sets, summed in set order.
    /// Rep counts saturate at `u32::MAX`.
    pub fn recompute_totals(&mut self) {
        let volume = self.sets().map(WorkoutSet::volume).sum();
        let reps = self.sets().fold(0u32, |acc, s| acc.saturating_add(s.reps));
        self.total_volume = volume;
        self.total_reps = reps;
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn completed_set_count(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.is_completed)
            .count()
    }

    /// Seconds between start and end, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds().max(0))
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Planned exercise inside a template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub id: String,
    pub exercise_id: String,
    /// Title snapshot for offline display
    pub title: String,
    pub target_sets: u32,
    pub target_reps: u32,
    pub target_weight: Option<f64>,
    pub notes: Option<String>,
}

impl TemplateExercise {
    pub fn new(
        exercise_id: impl Into<String>,
        title: impl Into<String>,
        target_sets: u32,
        target_reps: u32,
    ) -> Self {
        Self {
            id: crate::id::generate_id(crate::id::IdSource::Local),
            exercise_id: exercise_id.into(),
            title: title.into(),
            target_sets,
            target_reps,
            target_weight: None,
            notes: None,
        }
    }
}

/// A reusable, named exercise plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub id: String,
    pub title: String,
    pub template_type: WorkoutType,
    pub description: Option<String>,
    pub exercises: Vec<TemplateExercise>,
    pub is_archived: bool,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating or replacing a template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewTemplate {
    pub title: String,
    pub template_type: WorkoutType,
    pub description: Option<String>,
    pub exercises: Vec<TemplateExercise>,
}

// ============================================================================
// Record kinds
// ============================================================================

/// The kinds of persisted record, used for change notification and
/// availability updates
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Exercise,
    Template,
    Workout,
}

string_enum!(Entity {
    Exercise => "exercise",
    Template => "template",
    Workout => "workout",
});
