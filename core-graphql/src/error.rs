use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Failure of one GraphQL query execution.
///
/// Cloneable so a single failure can be delivered to every observer of a
/// collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {message}")]
    Network { message: String, transient: bool },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("GraphQL errors: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("Response to {operation} carried no data")]
    MissingData { operation: &'static str },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether repeating the query later could succeed without any change on
    /// the client side.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network { transient, .. } => *transient,
            TransportError::Status { status, .. } => *status >= 500 || *status == 429,
            TransportError::GraphQl { .. }
            | TransportError::MissingData { .. }
            | TransportError::Decode(_) => false,
        }
    }
}

impl From<BridgeError> for TransportError {
    fn from(error: BridgeError) -> Self {
        TransportError::Network {
            transient: error.is_transient(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
