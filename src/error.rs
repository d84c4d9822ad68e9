use thiserror::Error;

/// Everything that can go wrong while tracking a route or talking to the
/// directions service. None of these are fatal: the controller keeps
/// following the last accepted route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("malformed directions response: {0}")]
    MalformedResponse(String),

    #[error("directions request failed: {0}")]
    NetworkFailure(String),

    #[error("directions service returned no route")]
    NoCandidateRoute,

    #[error("location fix rejected (horizontal accuracy {horizontal_accuracy} m)")]
    LowQualityLocation { horizontal_accuracy: f64 },

    #[error("Status: {status} - message: {message} - id: {}", id.as_deref().unwrap_or("no id"))]
    Service {
        status: u16,
        message: String,
        id: Option<String>,
    },

    #[error("invalid routing options: {0}")]
    InvalidOptions(String),

    #[error("route cannot be followed: {0}")]
    InvalidRoute(String),

    #[error("invalid navigation config: {0}")]
    InvalidConfig(String),

    #[error("replay error: {0}")]
    Replay(String),
}

pub type NavResult<T> = Result<T, NavError>;

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::MalformedResponse(e.to_string())
    }
}

impl From<reqwest::Error> for NavError {
    fn from(e: reqwest::Error) -> Self {
        NavError::NetworkFailure(e.to_string())
    }
}
