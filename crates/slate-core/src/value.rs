use serde::{Deserialize, Serialize};

use crate::node::Document;
use crate::range::Range;

const DEFAULT_SCHEMA: &str = "slate";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Versioned envelope around a document and, optionally, its selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Range>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyValue {
    Envelope(DocumentValue),
    Bare(Document),
}

impl DocumentValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
            selection: None,
        }
    }

    pub fn with_selection(mut self, selection: Option<Range>) -> Self {
        self.selection = selection;
        self
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Accepts the envelope or a bare node array.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str::<AnyValue>(s)? {
            AnyValue::Envelope(value) => value,
            AnyValue::Bare(document) => Self::from_document(document),
        })
    }
}
