use std::fmt;

use thiserror::Error;

/// Boxed error returned by a [`CatalogStore`](crate::CatalogStore) implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Step of a reconciliation call during which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loading axes, tags and price records before any mutation.
    Load,
    /// Phase (a): creating new variant tags.
    AddTags,
    /// Phase (b): creating, updating and deleting price records.
    SyncPrices,
    /// Phase (c): deleting obsolete variant tags.
    RemoveTags,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Load => write!(f, "load"),
            Phase::AddTags => write!(f, "add-tags"),
            Phase::SyncPrices => write!(f, "sync-prices"),
            Phase::RemoveTags => write!(f, "remove-tags"),
        }
    }
}

/// Coarse classification used by callers to map failures onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    TooManyAxes,
    Validation,
    Store,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("combination {combination:?} names {count} titles; at most 3 are allowed")]
    TooManyAxes { combination: String, count: usize },

    #[error("invalid desired state: {0}")]
    Validation(String),

    #[error("store failure during {phase} ({entity}): {source}")]
    Store {
        phase: Phase,
        entity: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(phase: Phase, entity: impl Into<String>, source: impl Into<StoreError>) -> Self {
        Self::Store {
            phase,
            entity: entity.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TooManyAxes { .. } => ErrorKind::TooManyAxes,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// Phase a store failure happened in, if this is a store failure.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Store { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read axes file {path}: {source}")]
    AxesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse axes file: {0}")]
    AxesFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
