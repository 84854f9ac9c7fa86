//! Domain errors shared by the model, the manager and the command layer.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`SkirmishError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfBounds,
    Occupied,
    NotFound,
    DuplicateId,
    Validation,
    Storage,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OutOfBounds => "out_of_bounds",
            Self::Occupied => "occupied",
            Self::NotFound => "not_found",
            Self::DuplicateId => "duplicate_id",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

/// Every failure the engine can report to a caller.
///
/// The display text is user facing: the command registry sends it back to the
/// channel verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkirmishError {
    #[error("({x},{y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("cell ({x},{y}) is already occupied by `{occupant}`")]
    Occupied { x: i32, y: i32, occupant: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{kind} id `{id}` already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error("entity `{entity}` is already placed in match `{match_id}`")]
    AlreadyBound { entity: String, match_id: String },

    #[error("{0}")]
    Validation(String),

    #[error("storage error for {}: {reason}", path.display())]
    Storage { path: PathBuf, reason: String },
}

impl SkirmishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::Occupied { .. } => ErrorKind::Occupied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::AlreadyBound { .. } | Self::Validation(_) => ErrorKind::Validation,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = SkirmishError> = std::result::Result<T, E>;
