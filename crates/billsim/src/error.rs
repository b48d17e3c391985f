//! Service-level errors and their HTTP mapping.

use billsim_core::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("authentication failed")]
    AuthFailed,

    #[error("snapshot corrupted: {0}")]
    SnapshotCorruption(String),

    #[error("monte carlo job failed: {0}")]
    JobFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ServiceError {
    /// Status code the router maps this error onto.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::ValidationFailed(_) => 400,
            ServiceError::AuthFailed => 401,
            ServiceError::Engine(
                EngineError::ScenarioNotFound(_) | EngineError::AccountNotFound(_),
            ) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            ServiceError::ValidationFailed(vec!["Threshold must be >= 0".into()]).http_status(),
            400
        );
        assert_eq!(ServiceError::AuthFailed.http_status(), 401);
        assert_eq!(
            ServiceError::Engine(EngineError::ScenarioNotFound("Nope".into())).http_status(),
            404
        );
        assert_eq!(
            ServiceError::JobFailed("sim 3 aborted".into()).http_status(),
            500
        );
    }
}
