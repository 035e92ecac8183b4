use thiserror::Error;

/// Errors surfaced at the library boundary.
///
/// Screening failures and adjudication timeouts are recovered inside the
/// pipeline; `Screening` only surfaces when a caller unwraps a Stage-1
/// result directly.
#[derive(Error, Debug)]
pub enum CascadeError {
    /// Out-of-range or inconsistent configuration, rejected at startup
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The meeting was never started or has already ended
    #[error("meeting {0} is not active")]
    MeetingNotActive(String),

    /// `start_meeting` called twice for the same id
    #[error("meeting {0} is already active")]
    MeetingAlreadyActive(String),

    /// Stage-1 screener failed or exceeded its outer timeout
    #[error("screening failed for segment {segment_id}: {reason}")]
    Screening { segment_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CascadeResult<T> = Result<T, CascadeError>;
