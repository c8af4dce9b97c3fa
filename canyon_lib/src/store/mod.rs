mod config;
mod feeds;
mod query;

pub use config::{ConfigDocument, ConfigStore, DocumentKind, SchemaDocument};
pub use feeds::{ColumnDefinition, DEFINITIONS_TABLE, FEEDS_TABLE, FeedRecord, FeedStore};
pub use query::{Cell, QueryError, QueryRows};

pub(crate) use feeds::create_tables_sql;
