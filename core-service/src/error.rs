use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::error::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] core_graphql::TransportError),

    #[error("Repository error: {0}")]
    Repository(#[from] core_starwars::RepositoryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
