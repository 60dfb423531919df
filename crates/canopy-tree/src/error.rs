//! Error types for the state tree

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("no branch at {0}")]
    BranchNotFound(String),

    #[error("no leaf at {0}")]
    LeafNotFound(String),

    #[error("a node named {name} already exists under {parent}")]
    NameTaken { parent: String, name: String },

    #[error("stale write to {0}: incoming timestamp is older than the stored value")]
    StaleWrite(String),

    #[error("malformed seed for {path}: {reason}")]
    MalformedSeed { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TreeError>;

impl TreeError {
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn name_taken(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NameTaken {
            parent: parent.into(),
            name: name.into(),
        }
    }

    pub fn malformed_seed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSeed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
