use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{CanyonError, Result};

use super::query::{self, QueryError, QueryRows};

pub const FEEDS_TABLE: &str = "camera_feeds";
pub const DEFINITIONS_TABLE: &str = "table_definitions";

/// One camera feed row. Field names follow the CSV headers, which are also
/// the SQL column names the model writes queries against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    #[serde(rename = "FEED_ID")]
    pub feed_id: String,
    #[serde(rename = "THEATER")]
    pub theater: String,
    #[serde(rename = "FRRATE")]
    pub frame_rate: f64,
    #[serde(rename = "RES_W")]
    pub res_w: u32,
    #[serde(rename = "RES_H")]
    pub res_h: u32,
    #[serde(rename = "CODEC")]
    pub codec: String,
    #[serde(rename = "ENCR", deserialize_with = "deserialize_flag")]
    pub encrypted: bool,
    #[serde(rename = "LAT_MS")]
    pub latency_ms: f64,
    #[serde(rename = "MODL_TAG")]
    pub model_tag: String,
    #[serde(rename = "CIV_OK", deserialize_with = "deserialize_flag")]
    pub civ_ok: bool,
    #[serde(rename = "CLARITY")]
    pub clarity: f64,
}

impl FeedRecord {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.res_w, self.res_h)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub header: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub allowed_values: String,
    #[serde(default)]
    pub description: String,
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

pub(crate) fn create_tables_sql() -> String {
    format!(
        "DROP TABLE IF EXISTS {FEEDS_TABLE};
         DROP TABLE IF EXISTS {DEFINITIONS_TABLE};
         CREATE TABLE {FEEDS_TABLE} (
             FEED_ID  TEXT PRIMARY KEY NOT NULL,
             THEATER  TEXT NOT NULL,
             FRRATE   REAL NOT NULL,
             RES_W    INTEGER NOT NULL,
             RES_H    INTEGER NOT NULL,
             CODEC    TEXT NOT NULL,
             ENCR     INTEGER NOT NULL,
             LAT_MS   REAL NOT NULL,
             MODL_TAG TEXT NOT NULL,
             CIV_OK   INTEGER NOT NULL,
             CLARITY  REAL NOT NULL
         );
         CREATE TABLE {DEFINITIONS_TABLE} (
             header         TEXT PRIMARY KEY NOT NULL,
             type           TEXT NOT NULL,
             allowed_values TEXT NOT NULL,
             description    TEXT NOT NULL
         );"
    )
}

/// Read-only handle on the ingested feed database.
pub struct FeedStore {
    conn: Connection,
    max_rows: usize,
}

impl FeedStore {
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CanyonError::InvalidState(format!(
                "database '{}' not found; run `canyon ingest` first",
                path.display()
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            CanyonError::sqlite(format!("opening database '{}'", path.display()), e)
        })?;
        conn.execute_batch("PRAGMA query_only = ON;")
            .map_err(|e| CanyonError::sqlite("enabling query_only", e))?;

        debug!(db_path = %path.display(), "feed_store_opened");
        Ok(Self {
            conn,
            max_rows: 200,
        })
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    /// Runs one read-only statement. Anything that is not a single SELECT (or a
    /// WITH that SQLite reports as read-only) is rejected before a row is stepped.
    pub fn query(&self, sql: &str) -> std::result::Result<QueryRows, QueryError> {
        let statement = query::check_read_only(sql)?;
        let mut stmt = self.conn.prepare(statement).map_err(QueryError::Sql)?;
        if !stmt.readonly() {
            return Err(QueryError::NotReadOnly);
        }
        query::collect_rows(&mut stmt, self.max_rows)
    }

    pub fn feed_count(&self) -> Result<usize> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {FEEDS_TABLE}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as usize)
            .map_err(|e| CanyonError::sqlite("counting feeds", e))
    }

    pub fn definition_count(&self) -> Result<usize> {
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {DEFINITIONS_TABLE}"),
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count as usize)
            .map_err(|e| CanyonError::sqlite("counting column definitions", e))
    }

    pub fn all_feeds(&self) -> Result<Vec<FeedRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT FEED_ID, THEATER, FRRATE, RES_W, RES_H, CODEC, ENCR, LAT_MS, MODL_TAG, CIV_OK, CLARITY
                 FROM {FEEDS_TABLE} ORDER BY FEED_ID"
            ))
            .map_err(|e| CanyonError::sqlite("preparing feed listing", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FeedRecord {
                    feed_id: row.get(0)?,
                    theater: row.get(1)?,
                    frame_rate: row.get(2)?,
                    res_w: row.get(3)?,
                    res_h: row.get(4)?,
                    codec: row.get(5)?,
                    encrypted: row.get(6)?,
                    latency_ms: row.get(7)?,
                    model_tag: row.get(8)?,
                    civ_ok: row.get(9)?,
                    clarity: row.get(10)?,
                })
            })
            .map_err(|e| CanyonError::sqlite("listing feeds", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CanyonError::sqlite("reading feed rows", e))
    }

    pub fn column_definition(&self, header: &str) -> rusqlite::Result<Option<ColumnDefinition>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT header, type, allowed_values, description
                     FROM {DEFINITIONS_TABLE} WHERE header = ?1 COLLATE NOCASE"
                ),
                [header],
                definition_from_row,
            )
            .optional()
    }

    pub fn column_definitions(&self) -> rusqlite::Result<Vec<ColumnDefinition>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT header, type, allowed_values, description FROM {DEFINITIONS_TABLE}"
        ))?;
        let rows = stmt.query_map([], definition_from_row)?;
        rows.collect()
    }
}

fn definition_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ColumnDefinition> {
    Ok(ColumnDefinition {
        header: row.get(0)?,
        kind: row.get(1)?,
        allowed_values: row.get(2)?,
        description: row.get(3)?,
    })
}
