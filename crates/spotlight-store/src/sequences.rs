//! Persisted view sequences.
//!
//! A *sequence* is an ordered list of saved viewer *states* attached to a
//! model.  Everything is scoped by model id; a sequence id is only unique
//! within its model.
//!
//! # Storage layout
//!
//! | table             | key                               | payload           |
//! |-------------------|-----------------------------------|-------------------|
//! | `sequences`       | `(model_id, id)`                  | JSON body, order  |
//! | `sequence_states` | `(model_id, sequence_id, id)`     | JSON body, order  |
//!
//! Bodies are stored as the JSON the client sent, so fields the store does
//! not know about survive a round trip.
//!
//! # Example
//!
//! ```rust
//! use spotlight_store::{Sequence, SequenceStore};
//!
//! let store = SequenceStore::open_in_memory().unwrap();
//! let seq = store.add_sequence("model-1", Sequence::named("Walkthrough")).unwrap();
//! assert_eq!(store.get_sequences("model-1").unwrap(), vec![seq]);
//! assert!(store.get_sequences("model-2").unwrap().is_empty());
//! ```

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),
    #[error("Sequence not found: {0}")]
    SequenceNotFound(String),
    #[error("State not found: {0}")]
    StateNotFound(String),
    #[error("Sequence already exists: {0}")]
    Conflict(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl StoreError {
    /// Status code carried by the error, if it has one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::UnknownDatabase(_)
            | StoreError::SequenceNotFound(_)
            | StoreError::StateNotFound(_) => Some(404),
            StoreError::Conflict(_) => Some(409),
            StoreError::BadRequest(_) => Some(400),
            StoreError::Sqlite(_) | StoreError::Json(_) => None,
        }
    }

    /// HTTP status to answer with: the carried code, else 404.
    pub fn http_status(&self) -> u16 {
        self.status_code().unwrap_or(404)
    }

    /// JSON error body.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "statusCode": self.http_status(),
            "error": self.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A named, ordered list of viewer states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Assigned by the store when empty.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sequence {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// One saved viewer state inside a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceState {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SequenceState {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

fn assign_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SequenceStore
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed sequence storage.
pub struct SequenceStore {
    conn: Connection,
}

impl SequenceStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sequences (
                model_id   TEXT NOT NULL,
                id         TEXT NOT NULL,
                body       TEXT NOT NULL,
                position   INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (model_id, id)
            );
            CREATE TABLE IF NOT EXISTS sequence_states (
                model_id    TEXT NOT NULL,
                sequence_id TEXT NOT NULL,
                id          TEXT NOT NULL,
                body        TEXT NOT NULL,
                position    INTEGER NOT NULL,
                PRIMARY KEY (model_id, sequence_id, id)
            );",
        )?;
        Ok(())
    }

    fn sequence_exists(&self, model_id: &str, sequence_id: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sequences WHERE model_id = ?1 AND id = ?2",
                params![model_id, sequence_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn require_sequence(&self, model_id: &str, sequence_id: &str) -> Result<(), StoreError> {
        if self.sequence_exists(model_id, sequence_id)? {
            Ok(())
        } else {
            Err(StoreError::SequenceNotFound(sequence_id.to_string()))
        }
    }

    /// Every sequence of `model_id`, in insertion order.
    pub fn get_sequences(&self, model_id: &str) -> Result<Vec<Sequence>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM sequences WHERE model_id = ?1 ORDER BY position ASC",
        )?;
        let bodies = stmt
            .query_map(params![model_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(StoreError::from))
            .collect()
    }

    /// Append `sequence` to `model_id`.  An empty id is replaced by a fresh
    /// UUID.  Returns the stored sequence.
    pub fn add_sequence(&self, model_id: &str, mut sequence: Sequence) -> Result<Sequence, StoreError> {
        assign_id(&mut sequence.id);
        if self.sequence_exists(model_id, &sequence.id)? {
            return Err(StoreError::Conflict(sequence.id));
        }
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM sequences WHERE model_id = ?1",
            params![model_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO sequences (model_id, id, body, position, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                model_id,
                sequence.id,
                serde_json::to_string(&sequence)?,
                position,
                Utc::now().to_rfc3339()
            ],
        )?;
        debug!(model = %model_id, sequence = %sequence.id, "sequence added");
        Ok(sequence)
    }

    /// Replace the stored body of an existing sequence.
    pub fn update_sequence(&self, model_id: &str, sequence: Sequence) -> Result<Sequence, StoreError> {
        if sequence.id.trim().is_empty() {
            return Err(StoreError::BadRequest("sequence id is required".into()));
        }
        let changed = self.conn.execute(
            "UPDATE sequences SET body = ?3, updated_at = ?4 WHERE model_id = ?1 AND id = ?2",
            params![
                model_id,
                sequence.id,
                serde_json::to_string(&sequence)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::SequenceNotFound(sequence.id));
        }
        Ok(sequence)
    }

    /// Delete a sequence and its states.  Returns the deleted id.
    pub fn delete_sequence(&self, model_id: &str, sequence_id: &str) -> Result<String, StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM sequences WHERE model_id = ?1 AND id = ?2",
            params![model_id, sequence_id],
        )?;
        if changed == 0 {
            return Err(StoreError::SequenceNotFound(sequence_id.to_string()));
        }
        self.conn.execute(
            "DELETE FROM sequence_states WHERE model_id = ?1 AND sequence_id = ?2",
            params![model_id, sequence_id],
        )?;
        debug!(model = %model_id, sequence = %sequence_id, "sequence deleted");
        Ok(sequence_id.to_string())
    }

    /// States of one sequence, in insertion order.
    pub fn get_states(&self, model_id: &str, sequence_id: &str) -> Result<Vec<SequenceState>, StoreError> {
        self.require_sequence(model_id, sequence_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT body FROM sequence_states
             WHERE model_id = ?1 AND sequence_id = ?2 ORDER BY position ASC",
        )?;
        let bodies = stmt
            .query_map(params![model_id, sequence_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(StoreError::from))
            .collect()
    }

    /// Append `states` to a sequence.  States with an id already present in
    /// the sequence replace it in place.  Returns the stored states.
    pub fn add_states(
        &mut self,
        model_id: &str,
        sequence_id: &str,
        states: Vec<SequenceState>,
    ) -> Result<Vec<SequenceState>, StoreError> {
        self.require_sequence(model_id, sequence_id)?;
        let tx = self.conn.transaction()?;
        let mut next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM sequence_states
             WHERE model_id = ?1 AND sequence_id = ?2",
            params![model_id, sequence_id],
            |row| row.get(0),
        )?;

        let mut stored = Vec::with_capacity(states.len());
        for mut state in states {
            assign_id(&mut state.id);
            let body = serde_json::to_string(&state)?;
            let replaced = tx.execute(
                "UPDATE sequence_states SET body = ?4
                 WHERE model_id = ?1 AND sequence_id = ?2 AND id = ?3",
                params![model_id, sequence_id, state.id, body],
            )?;
            if replaced == 0 {
                tx.execute(
                    "INSERT INTO sequence_states (model_id, sequence_id, id, body, position)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![model_id, sequence_id, state.id, body, next],
                )?;
                next += 1;
            }
            stored.push(state);
        }
        tx.commit()?;
        Ok(stored)
    }

    /// Delete one state.  Returns the deleted id.
    pub fn delete_state(
        &self,
        model_id: &str,
        sequence_id: &str,
        state_id: &str,
    ) -> Result<String, StoreError> {
        self.require_sequence(model_id, sequence_id)?;
        let changed = self.conn.execute(
            "DELETE FROM sequence_states WHERE model_id = ?1 AND sequence_id = ?2 AND id = ?3",
            params![model_id, sequence_id, state_id],
        )?;
        if changed == 0 {
            return Err(StoreError::StateNotFound(state_id.to_string()));
        }
        Ok(state_id.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
