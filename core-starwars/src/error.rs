use core_graphql::TransportError;
use thiserror::Error;

/// A fragment could not be turned into a domain model.
///
/// Any mapping error discards the whole fetch result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("{entity} at index {index} is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
        index: usize,
    },

    #[error("{entity} at index {index} has an empty id")]
    EmptyIdentifier { entity: &'static str, index: usize },

    #[error("{entity} id {id} appears at index {first_index} and again at index {index}")]
    DuplicateId {
        entity: &'static str,
        id: String,
        first_index: usize,
        index: usize,
    },

    #[error("Expected {expected} payload, received {found}")]
    UnexpectedPayload {
        expected: &'static str,
        found: &'static str,
    },
}

/// Failure delivered to subscribers and to explicit refresh callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Fetch task aborted: {0}")]
    TaskAborted(String),
}

impl RepositoryError {
    /// Whether a later refresh may succeed without a server-side fix.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RepositoryError::Transport(e) => e.is_transient(),
            RepositoryError::Mapping(_) => false,
            RepositoryError::TaskAborted(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
