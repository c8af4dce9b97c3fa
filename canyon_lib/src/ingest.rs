use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Instant,
};

use rusqlite::{Connection, params};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    config::DataPaths,
    error::{CanyonError, Result},
    format_duration,
    store::{self, ColumnDefinition, DEFINITIONS_TABLE, FEEDS_TABLE, FeedRecord, FeedStore},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IfExists {
    /// Drop and rebuild both tables.
    #[default]
    Replace,
    /// Leave an existing database file untouched.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub db_path: PathBuf,
    pub feed_count: usize,
    pub definition_count: usize,
    pub skipped: bool,
}

pub fn ingest(paths: &DataPaths, if_exists: IfExists) -> Result<IngestReport> {
    let db_path = paths.db_path();

    if if_exists == IfExists::Skip && db_path.is_file() {
        warn!(db_path = %db_path.display(), "database already exists; skipping ingestion");
        let existing = FeedStore::open_read_only(db_path)?;
        return Ok(IngestReport {
            db_path: db_path.to_path_buf(),
            feed_count: existing.feed_count()?,
            definition_count: existing.definition_count()?,
            skipped: true,
        });
    }

    let start = Instant::now();
    let feeds_path = paths.feeds_csv();
    let definitions_path = paths.definitions_csv();

    info!(source = %feeds_path.display(), "read_feeds");
    let feeds = read_feeds(&feeds_path)?;
    info!(source = %definitions_path.display(), "read_definitions");
    let definitions = read_definitions(&definitions_path)?;

    write_database(db_path, &feeds, &definitions)?;

    info!(
        db_path = %db_path.display(),
        feed_count = feeds.len(),
        definition_count = definitions.len(),
        elapsed = %format_duration(start.elapsed()),
        "ingestion completed"
    );

    Ok(IngestReport {
        db_path: db_path.to_path_buf(),
        feed_count: feeds.len(),
        definition_count: definitions.len(),
        skipped: false,
    })
}

/// Reads the feeds CSV, rejecting repeated camera ids.
pub fn read_feeds(path: &Path) -> Result<Vec<FeedRecord>> {
    let feeds: Vec<FeedRecord> = read_csv(path)?;

    let mut seen = HashSet::with_capacity(feeds.len());
    for feed in &feeds {
        if !seen.insert(feed.feed_id.as_str()) {
            return Err(CanyonError::DuplicateFeedId {
                feed_id: feed.feed_id.clone(),
                path: path.to_path_buf(),
            });
        }
    }

    Ok(feeds)
}

pub fn read_definitions(path: &Path) -> Result<Vec<ColumnDefinition>> {
    read_csv(path)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let csv_error = |source| CanyonError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    reader
        .deserialize::<T>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(csv_error)
}

fn write_database(
    db_path: &Path,
    feeds: &[FeedRecord],
    definitions: &[ColumnDefinition],
) -> Result<()> {
    let context = |action: &str| format!("{action} '{}'", db_path.display());

    let mut conn = Connection::open(db_path)
        .map_err(|e| CanyonError::sqlite(context("opening database"), e))?;
    let tx = conn
        .transaction()
        .map_err(|e| CanyonError::sqlite(context("starting transaction on"), e))?;

    tx.execute_batch(&store::create_tables_sql())
        .map_err(|e| CanyonError::sqlite(context("recreating tables in"), e))?;

    {
        let mut insert_feed = tx
            .prepare(&format!(
                "INSERT INTO {FEEDS_TABLE}
                 (FEED_ID, THEATER, FRRATE, RES_W, RES_H, CODEC, ENCR, LAT_MS, MODL_TAG, CIV_OK, CLARITY)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))
            .map_err(|e| CanyonError::sqlite("preparing feed insert", e))?;

        for feed in feeds {
            insert_feed
                .execute(params![
                    feed.feed_id,
                    feed.theater,
                    feed.frame_rate,
                    feed.res_w,
                    feed.res_h,
                    feed.codec,
                    feed.encrypted,
                    feed.latency_ms,
                    feed.model_tag,
                    feed.civ_ok,
                    feed.clarity,
                ])
                .map_err(|e| CanyonError::sqlite(format!("inserting feed '{}'", feed.feed_id), e))?;
        }

        let mut insert_definition = tx
            .prepare(&format!(
                "INSERT INTO {DEFINITIONS_TABLE} (header, type, allowed_values, description)
                 VALUES (?1, ?2, ?3, ?4)"
            ))
            .map_err(|e| CanyonError::sqlite("preparing definition insert", e))?;

        for definition in definitions {
            insert_definition
                .execute(params![
                    definition.header,
                    definition.kind,
                    definition.allowed_values,
                    definition.description,
                ])
                .map_err(|e| {
                    CanyonError::sqlite(format!("inserting definition '{}'", definition.header), e)
                })?;
        }
    }

    tx.commit()
        .map_err(|e| CanyonError::sqlite(context("committing"), e))
}
