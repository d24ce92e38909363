use thiserror::Error;

use crate::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("the root has no parent and cannot be addressed as a node")]
    Root,
    #[error("no node at path {0:?}")]
    Missing(Path),
    #[error("node at path {0:?} is not an element")]
    NotElement(Path),
    #[error("node at path {0:?} is not a text node")]
    NotText(Path),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("offset {offset} is out of bounds or splits a character in the text at {path:?}")]
    Offset { path: Path, offset: usize },
    #[error("cannot merge node at {path:?}: {reason}")]
    Merge { path: Path, reason: &'static str },
    #[error("cannot move node at {path:?} into {new_path:?}")]
    Move { path: Path, new_path: Path },
    #[error("property {key:?} cannot be patched on the node at {path:?}")]
    Property { path: Path, key: String },
    #[error("normalization did not converge after {0} iterations")]
    NormalizeDidNotConverge(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("cannot lift node at {0:?}: it has a depth of less than 2")]
    Lift(Path),
    #[error("cannot merge {0:?} with its previous node: one is text and the other an element")]
    MergeKind(Path),
    #[error("no text position at {0:?}")]
    NoPosition(Path),
}

/// Failure reported by a registered command.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<EditorError> for CommandError {
    fn from(err: EditorError) -> Self {
        Self::new(err.to_string())
    }
}

/// Failure reported by a registered query.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate plugin id: {0}")]
    DuplicatePlugin(String),
    #[error("duplicate node spec kind: {0}")]
    DuplicateNodeSpec(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}
