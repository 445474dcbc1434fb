//! Error types surfaced by catalog building, feat hooks, persistence and console commands.
use thiserror::Error;

/// Failures raised while discovering or instantiating catalog content.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog data could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("doctrine `{key}` failed to instantiate: {reason}")]
    Instantiation { key: String, reason: String },
    #[error("feat `{key}` failed to instantiate: {reason}")]
    FeatInstantiation { key: String, reason: String },
    #[error("doctrine key `{0}` registered more than once")]
    DuplicateDoctrine(String),
    #[error("feat key `{0}` is declared by more than one doctrine")]
    DuplicateFeat(String),
    #[error("doctrine `{key}` occupies ({column}, {row}) already held by `{holder}`")]
    DuplicatePosition {
        key: String,
        holder: String,
        column: i32,
        row: i32,
    },
}

/// Failure reported by a single feat while handling an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatError {
    #[error("feat `{key}` rejected the {event} payload: {reason}")]
    InvalidPayload {
        key: String,
        event: &'static str,
        reason: String,
    },
    #[error("feat `{key}` failed: {reason}")]
    Failed { key: String, reason: String },
}

/// Failures reading or writing the persisted progress entries.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("entry `{key}` could not be encoded or decoded: {source}")]
    Codec {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("store rejected entry `{key}`: {reason}")]
    Store { key: &'static str, reason: String },
}

/// Rejected console command input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("feat not found: `{0}`; try feat_list to see available feats")]
    UnknownFeat(String),
    #[error("`{token}` matches several feats: {}", .candidates.join(", "))]
    AmbiguousFeat {
        token: String,
        candidates: Vec<String>,
    },
    #[error("amount must be an integer, got `{0}`")]
    InvalidAmount(String),
}
