use hickory_resolver::error::ResolveError;
use thiserror::Error;

/// Errors raised by the Cymru lookup clients and output encoders
#[derive(Debug, Error)]
pub enum CymruError {
    #[error("invalid IP: {0}")]
    InvalidIp(String),

    #[error("no TXT records for {0}")]
    NoTxtRecords(String),

    #[error("unexpected DNS TXT format for {name}: {record:?}")]
    UnexpectedTxtFormat { name: String, record: String },

    #[error("DNS lookup of {name} failed: {source}")]
    Resolve {
        name: String,
        #[source]
        source: ResolveError,
    },

    #[error("lookup deadline exceeded")]
    DeadlineExceeded,

    #[error("resolver task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("failed to send query to {addr}: {source}")]
    Write {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
