use thiserror::Error;

/// Every way a single backend call can fail. A call that fails is never
/// partially parsed.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("HTTP request error on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} returned no usable payload")]
    MissingResponse { endpoint: String },

    /// A batched reply whose length does not match the request.
    #[error("{endpoint} returned {got} results for {expected} inputs")]
    CountMismatch { endpoint: String, expected: usize, got: usize },

    #[error("Request blocked: {0}")]
    Blocked(String),
}

impl NetworkError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ScilitError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Paper not found: {0}")]
    NotFound(String),

    #[error("Pipeline aborted: {0}")]
    PipelineAborted(String),

    #[error("No paper is selected for citation")]
    NoSelection,

    #[error("No loaded paper at index {0}")]
    InvalidIndex(usize),
}

impl ScilitError {
    /// Timeouts and transport/parse failures all collapse to this one kind.
    pub fn is_network(&self) -> bool {
        matches!(self, ScilitError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, ScilitError>;
