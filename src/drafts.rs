//! Draft store: unsaved roster snapshots keyed by `"<subjectId>.<courseId>"`.
//!
//! A stored draft means the roster has edits that were not bulk-saved yet.
//! Writes replace the whole snapshot; last write wins.

use crate::model::RosterSnapshot;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub subject_id: i64,
    pub course_id: i64,
}

impl DraftKey {
    pub fn new(subject_id: i64, course_id: i64) -> Self {
        Self {
            subject_id,
            course_id,
        }
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subject_id, self.course_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEntry {
    pub key: String,
    pub updated_at: String,
}

pub fn put(conn: &Connection, key: DraftKey, snapshot: &RosterSnapshot) -> anyhow::Result<()> {
    let payload = serde_json::to_string(snapshot)?;
    put_raw(conn, &key.to_string(), &payload)
}

pub fn put_raw(conn: &Connection, key: &str, payload: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO drafts(key, payload, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           payload = excluded.payload,
           updated_at = excluded.updated_at",
        (key, payload, now),
    )?;
    Ok(())
}

/// Reads a draft. An entry that no longer decodes is deleted and reported as
/// a miss.
pub fn load(conn: &Connection, key: DraftKey) -> anyhow::Result<Option<RosterSnapshot>> {
    let k = key.to_string();
    let payload: Option<String> = conn
        .query_row("SELECT payload FROM drafts WHERE key = ?", [&k], |r| r.get(0))
        .optional()?;
    let Some(payload) = payload else {
        return Ok(None);
    };

    match serde_json::from_str::<RosterSnapshot>(&payload) {
        Ok(snapshot) => {
            debug!(key = %k, records = snapshot.enrollments.len(), "draft loaded");
            Ok(Some(snapshot))
        }
        Err(e) => {
            warn!(key = %k, error = %e, "discarding undecodable draft");
            remove(conn, key)?;
            Ok(None)
        }
    }
}

pub fn remove(conn: &Connection, key: DraftKey) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM drafts WHERE key = ?", [key.to_string()])?;
    Ok(n > 0)
}

pub fn list(conn: &Connection) -> anyhow::Result<Vec<DraftEntry>> {
    let mut stmt = conn.prepare("SELECT key, updated_at FROM drafts ORDER BY key")?;
    let rows = stmt.query_map([], |r| {
        Ok(DraftEntry {
            key: r.get(0)?,
            updated_at: r.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
