//! Local relational storage.
//!
//! Maps catalog exercises, templates and workouts to SQLite rows and back.
//! Every multi-table write runs inside one transaction: if any statement
//! fails the transaction is dropped uncommitted (rolled back) and the error
//! is returned unchanged. Reads rebuild nested structures with one query per
//! parent row.

mod exercises;
pub mod schema;
mod templates;
mod workouts;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

use crate::types::*;
use crate::{Availability, Error, Result, Workout};

/// Receives finished workouts from the session store
pub trait WorkoutSink {
    /// Durably store a workout (insert or replace)
    fn save_workout(&mut self, workout: &Workout) -> Result<()>;

    /// Current availability of a stored workout, `None` if it is not stored
    fn availability(&self, workout_id: &str) -> Result<Option<Availability>>;

    /// Record which backends now hold a copy of a stored workout
    fn update_availability(&mut self, workout_id: &str, availability: &Availability)
        -> Result<()>;
}

/// Owner of the single SQLite connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) a database file and bring its schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        Self::init(conn)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys=ON;", [])?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > schema::SCHEMA_VERSION {
            return Err(Error::Other(format!(
                "database schema version {} is newer than supported version {}",
                version,
                schema::SCHEMA_VERSION
            )));
        }
        if version < schema::SCHEMA_VERSION {
            let tx = self.conn.transaction()?;
            tx.execute_batch(schema::SCHEMA)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", schema::SCHEMA_VERSION))?;
            tx.commit()?;
            tracing::info!(
                "Migrated database schema from version {} to {}",
                version,
                schema::SCHEMA_VERSION
            );
        }
        Ok(())
    }

    /// Replace the availability record of any stored entity
    pub fn set_availability(
        &self,
        entity: Entity,
        id: &str,
        availability: &Availability,
    ) -> Result<bool> {
        let table = table_name(entity);
        let sql = format!(
            "UPDATE {} SET availability = ?1, updated_at = ?2 WHERE id = ?3",
            table
        );
        let changed = self.conn.execute(
            &sql,
            rusqlite::params![
                serde_json::to_string(availability)?,
                to_millis(Utc::now()),
                id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn get_availability(&self, entity: Entity, id: &str) -> Result<Option<Availability>> {
        let sql = format!("SELECT availability FROM {} WHERE id = ?1", table_name(entity));
        let availability = self
            .conn
            .query_row(&sql, rusqlite::params![id], |row| json_column(row, 0))
            .optional()?;
        Ok(availability)
    }

    /// Count rows in a table (catalog seeding and diagnostics)
    pub fn count(&self, entity: Entity) -> Result<u64> {
        let table = table_name(entity);
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count.max(0) as u64)
    }
}

impl WorkoutSink for Database {
    fn save_workout(&mut self, workout: &Workout) -> Result<()> {
        self.store_workout(workout)
    }

    fn availability(&self, workout_id: &str) -> Result<Option<Availability>> {
        self.get_availability(Entity::Workout, workout_id)
    }

    fn update_availability(&mut self, workout_id: &str, availability: &Availability) -> Result<()> {
        if !self.set_availability(Entity::Workout, workout_id, availability)? {
            return Err(Error::not_found("workout", workout_id));
        }
        Ok(())
    }
}

// ============================================================================
// Column helpers
// ============================================================================

fn table_name(entity: Entity) -> &'static str {
    match entity {
        Entity::Exercise => "exercises",
        Entity::Template => "templates",
        Entity::Workout => "workouts",
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {} out of range", millis).into(),
        )
    })
}

fn optional_millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => millis_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Store string enums as their lowercase names
macro_rules! sql_text_enum {
    ($($name:ty),+ $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse::<$name>()
                        .map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_text_enum!(
    ExerciseType,
    ExerciseCategory,
    Equipment,
    WeightUnit,
    SetType,
    WorkoutType,
);
