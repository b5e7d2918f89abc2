use thiserror::Error;

/// Request-boundary error taxonomy.
///
/// `BadRequest` and `NotFound` propagate to the caller as-is and stop
/// the pipeline. Everything unexpected is converted to `Server` once,
/// at the outermost request boundary. Partial failures (a single
/// partition, a single remote extension, a single feedback document)
/// are logged and excluded instead of being surfaced here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request disallowed: {0}")]
    NotAllowed(String),

    #[error("Server error while handling request: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}
