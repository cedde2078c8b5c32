use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use wishlist_claims::ClaimError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Claim(err) => claim_status(err),
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn claim_status(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::NotFound(_) => StatusCode::NOT_FOUND,
        ClaimError::InvalidTarget(_)
        | ClaimError::MissingClaimant
        | ClaimError::MissingContributor
        | ClaimError::InvalidGuestName(_)
        | ClaimError::NonPositiveAmount
        | ClaimError::InvalidPrecision(_)
        | ClaimError::ExceedsRemaining { .. }
        | ClaimError::PriceBelowContributed { .. }
        | ClaimError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ClaimError::AlreadyClaimed | ClaimError::ClaimsExist => StatusCode::CONFLICT,
        ClaimError::Forbidden(_) => StatusCode::FORBIDDEN,
        ClaimError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        ClaimError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            warn!(%status, error = %self, "request rejected");
            self.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishlist_ledger::LedgerError;
    use wishlist_types::Money;

    #[test]
    fn claim_errors_map_to_statuses() {
        let cases = [
            (ClaimError::NotFound("item"), StatusCode::NOT_FOUND),
            (ClaimError::InvalidTarget("x"), StatusCode::BAD_REQUEST),
            (ClaimError::MissingClaimant, StatusCode::BAD_REQUEST),
            (ClaimError::NonPositiveAmount, StatusCode::BAD_REQUEST),
            (
                ClaimError::ExceedsRemaining {
                    remaining: Money::from_cents(2000),
                },
                StatusCode::BAD_REQUEST,
            ),
            (ClaimError::AlreadyClaimed, StatusCode::CONFLICT),
            (ClaimError::ClaimsExist, StatusCode::CONFLICT),
            (ClaimError::Forbidden("x"), StatusCode::FORBIDDEN),
            (ClaimError::Unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (
                ClaimError::Ledger(LedgerError::Poisoned("items")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn malformed_body_is_a_client_error() {
        let err = ServerError::InvalidBody("expected a string".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid request body: expected a string");
    }

    #[test]
    fn claim_message_passes_through() {
        let err = ServerError::from(ClaimError::AlreadyClaimed);
        assert_eq!(err.to_string(), "item is already reserved");
    }
}
