use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    config::DataPaths,
    error::{CanyonError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Encoder,
    Decoder,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Encoder, DocumentKind::Decoder];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encoder => "encoder",
            Self::Decoder => "decoder",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "encoder" => Some(Self::Encoder),
            "decoder" => Some(Self::Decoder),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter name to value mapping for one of the encoder/decoder configs.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    values: Map<String, Value>,
}

impl ConfigDocument {
    pub fn from_value(kind: DocumentKind, value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(CanyonError::InvalidState(format!(
                "{kind} config must be a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Exact top-level key first; dotted keys fall back to a nested walk.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.trim();
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        if !key.contains('.') {
            return None;
        }

        let mut parts = key.split('.');
        let first = parts.next()?;
        parts.try_fold(self.values.get(first)?, |current, part| match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SchemaDocument {
    raw: Value,
}

impl SchemaDocument {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Exact property name first; dotted names descend through nested `properties`.
    pub fn property(&self, name: &str) -> Option<&Value> {
        let name = name.trim();
        if let Some(property) = child_property(&self.raw, name) {
            return Some(property);
        }
        if !name.contains('.') {
            return None;
        }

        name.split('.')
            .try_fold(&self.raw, |current, part| child_property(current, part))
    }
}

fn child_property<'a>(schema: &'a Value, name: &str) -> Option<&'a Value> {
    schema.get("properties")?.as_object()?.get(name)
}

/// The encoder/decoder configs and their schemas, loaded once and read-only after.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    encoder: ConfigDocument,
    decoder: ConfigDocument,
    encoder_schema: SchemaDocument,
    decoder_schema: SchemaDocument,
}

impl ConfigStore {
    pub fn load(paths: &DataPaths) -> Result<Self> {
        let encoder = read_json(&paths.params_path(DocumentKind::Encoder))?;
        let decoder = read_json(&paths.params_path(DocumentKind::Decoder))?;
        let encoder_schema = read_json(&paths.schema_path(DocumentKind::Encoder))?;
        let decoder_schema = read_json(&paths.schema_path(DocumentKind::Decoder))?;

        let store = Self::from_values(encoder, decoder, encoder_schema, decoder_schema)?;
        debug!(
            data_dir = %paths.data_dir.display(),
            encoder_keys = store.encoder.values.len(),
            decoder_keys = store.decoder.values.len(),
            "config_store_loaded"
        );
        Ok(store)
    }

    pub fn from_values(
        encoder: Value,
        decoder: Value,
        encoder_schema: Value,
        decoder_schema: Value,
    ) -> Result<Self> {
        Ok(Self {
            encoder: ConfigDocument::from_value(DocumentKind::Encoder, encoder)?,
            decoder: ConfigDocument::from_value(DocumentKind::Decoder, decoder)?,
            encoder_schema: SchemaDocument::new(encoder_schema),
            decoder_schema: SchemaDocument::new(decoder_schema),
        })
    }

    pub fn document(&self, kind: DocumentKind) -> &ConfigDocument {
        match kind {
            DocumentKind::Encoder => &self.encoder,
            DocumentKind::Decoder => &self.decoder,
        }
    }

    pub fn schema(&self, kind: DocumentKind) -> &SchemaDocument {
        match kind {
            DocumentKind::Encoder => &self.encoder_schema,
            DocumentKind::Decoder => &self.decoder_schema,
        }
    }

    pub fn param(&self, kind: DocumentKind, key: &str) -> Option<&Value> {
        self.document(kind).get(key)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| CanyonError::io(format!("reading '{}'", path.display()), e))?;
    serde_json::from_str(&content).map_err(|source| CanyonError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
