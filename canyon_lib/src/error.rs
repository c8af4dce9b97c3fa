use std::path::PathBuf;

use thiserror::Error;

use crate::{agent::AgentError, llm::ModelError};

pub type Result<T> = std::result::Result<T, CanyonError>;

#[derive(Debug, Error)]
pub enum CanyonError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read csv '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sqlite error while {context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to parse json document '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate feed id '{feed_id}' in '{path}'")]
    DuplicateFeedId { feed_id: String, path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CanyonError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            context: context.into(),
            source,
        }
    }
}
