use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no backup targets configured")]
    EmptyTargetList,

    #[error("a backup run is already in progress")]
    RunInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("no delivery destination configured")]
    DestinationUnset,

    #[error("Report error: {0}")]
    Report(String),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}
