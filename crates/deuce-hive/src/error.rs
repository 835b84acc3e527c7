use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deuce_core::protocol::ErrorResponse;
use deuce_core::{EngineError, ScoringError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ScoringError> for AppError {
    fn from(e: ScoringError) -> Self {
        Self::Engine(e.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Engine(e) => match e {
                EngineError::Validation(ScoringError::DuplicateMatch(_)) => StatusCode::CONFLICT,
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::Undo(_) | EngineError::Concurrency { .. } => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Persistence(_) | EngineError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            AppError::Engine(e) => e.is_retryable(),
            AppError::Validation(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Store Error: {}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
            retryable: self.retryable(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use deuce_core::UndoError;

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        let cases = [
            (
                AppError::from(ScoringError::MatchNotStarted),
                StatusCode::BAD_REQUEST,
                false,
            ),
            (
                AppError::from(EngineError::from(UndoError::NothingToUndo)),
                StatusCode::CONFLICT,
                false,
            ),
            (
                AppError::from(EngineError::Concurrency {
                    expected: 1,
                    actual: 2,
                }),
                StatusCode::CONFLICT,
                true,
            ),
            (
                AppError::from(EngineError::Persistence("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
                true,
            ),
            (
                AppError::from(ScoringError::DuplicateMatch("m".into())),
                StatusCode::CONFLICT,
                false,
            ),
            (
                AppError::from(EngineError::NotFound("m".into())),
                StatusCode::NOT_FOUND,
                false,
            ),
        ];
        for (err, status, retryable) in cases {
            assert_eq!(err.status(), status, "{}", err);
            assert_eq!(err.retryable(), retryable, "{}", err);
        }
    }
}
