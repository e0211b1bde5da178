// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type and the single error-kind → HTTP-status mapping.
//!
//! Every service error is translated exactly once, at this boundary, by
//! `From<ServiceError>`. Handlers just use `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::ServiceError;
use crate::storage::DirectoryError;
use crate::auth::{TokenError, VaultError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// For chain-provisioning failures: whether a blind retry is safe.
    pub retryable: Option<bool>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retryable: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            retryable: self.retryable,
        });
        (self.status, body).into_response()
    }
}

/// The error-kind → status lookup applied once at the boundary.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(v) => ApiError::bad_request(v.to_string()),

            ServiceError::Directory(d) => match d {
                DirectoryError::DuplicateEmail
                | DirectoryError::DuplicateUsername
                | DirectoryError::DuplicateWalletAddress
                | DirectoryError::DuplicateIdentity => ApiError::conflict(d.to_string()),
                DirectoryError::Validation(v) => ApiError::bad_request(v.to_string()),
                DirectoryError::AccountNotFound => ApiError::not_found(d.to_string()),
                // Storage internals stay in the logs, not in responses
                other => {
                    tracing::error!(error = %other, "directory failure");
                    ApiError::internal("internal storage error")
                }
            },

            ServiceError::InvalidCredentials => {
                ApiError::unauthorized("invalid username or password")
            }

            ServiceError::Token(TokenError::Expired) => {
                ApiError::unauthorized("token has expired")
            }
            ServiceError::Token(TokenError::Invalid) => ApiError::unauthorized("token is invalid"),

            ServiceError::Vault(VaultError::Decryption) => {
                ApiError::unauthorized("decryption failed: wrong password or corrupted data")
            }
            ServiceError::Vault(e) => {
                tracing::error!(error = %e, "vault failure");
                ApiError::internal("cryptographic failure")
            }

            ServiceError::Provision(p) => {
                let retryable = p.is_retryable();
                let mut error = ApiError::new(StatusCode::BAD_GATEWAY, p.to_string());
                error.retryable = Some(retryable);
                error
            }

            ServiceError::AccountNotFound => ApiError::not_found("account not found"),
            ServiceError::WalletNotFound => ApiError::not_found("wallet not found"),

            ServiceError::ProvisioningDisabled => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "identity provisioning is not configured",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{ChainError, ProvisionError, ProvisionPhase};
    use crate::storage::ValidationError;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn duplicate_errors_map_to_conflict() {
        let err: ApiError = ServiceError::Directory(DirectoryError::DuplicateEmail).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = ServiceError::Directory(DirectoryError::DuplicateUsername).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn validation_errors_name_the_field() {
        let err: ApiError =
            ServiceError::Validation(ValidationError::new("password", "too short")).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("password"));
    }

    #[test]
    fn credential_and_token_errors_are_unauthorized() {
        let err: ApiError = ServiceError::InvalidCredentials.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err: ApiError = ServiceError::Token(TokenError::Expired).into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn provisioning_errors_carry_retryable_flag() {
        let provision_err = ProvisionError {
            phase: ProvisionPhase::EstimatingGas,
            source: ChainError::Estimation("node unreachable".into()),
        };
        let err: ApiError = ServiceError::Provision(provision_err).into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.retryable, Some(true));

        let body_bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["retryable"], true);
    }
}
