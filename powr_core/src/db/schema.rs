//! SQLite schema.
//!
//! Child tables cascade on parent deletion. Catalog references from templates
//! and workouts (`exercise_id`) are deliberately plain text so removing a
//! catalog entry never removes history or plans that mention it.

pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    exercise_type TEXT NOT NULL,
    category TEXT NOT NULL,
    equipment TEXT NOT NULL,
    description TEXT,
    format TEXT NOT NULL,
    weight_unit TEXT NOT NULL,
    availability TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS exercise_tags (
    exercise_id TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (exercise_id, tag)
);

CREATE TABLE IF NOT EXISTS exercise_instructions (
    exercise_id TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    instruction TEXT NOT NULL,
    PRIMARY KEY (exercise_id, position)
);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    template_type TEXT NOT NULL,
    description TEXT,
    is_archived INTEGER NOT NULL DEFAULT 0,
    availability TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS template_exercises (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL,
    title TEXT NOT NULL,
    position INTEGER NOT NULL,
    target_sets INTEGER NOT NULL,
    target_reps INTEGER NOT NULL,
    target_weight REAL,
    notes TEXT
);

CREATE TABLE IF NOT EXISTS workouts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    workout_type TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    is_completed INTEGER NOT NULL DEFAULT 0,
    template_id TEXT,
    notes TEXT,
    total_volume REAL NOT NULL DEFAULT 0,
    total_reps INTEGER NOT NULL DEFAULT 0,
    availability TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS workout_exercises (
    id TEXT PRIMARY KEY,
    workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL,
    title TEXT NOT NULL,
    position INTEGER NOT NULL,
    target_sets INTEGER,
    target_reps INTEGER,
    notes TEXT
);

CREATE TABLE IF NOT EXISTS workout_sets (
    id TEXT PRIMARY KEY,
    workout_exercise_id TEXT NOT NULL REFERENCES workout_exercises(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    weight REAL NOT NULL,
    reps INTEGER NOT NULL,
    rpe REAL,
    set_type TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_template_exercises_template ON template_exercises(template_id, position);
CREATE INDEX IF NOT EXISTS idx_workout_exercises_workout ON workout_exercises(workout_id, position);
CREATE INDEX IF NOT EXISTS idx_workout_sets_exercise ON workout_sets(workout_exercise_id, position);
CREATE INDEX IF NOT EXISTS idx_workouts_start ON workouts(start_time DESC);
"#;
