// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{AccountResponse, RevealKeyRequest, RevealKeyResponse},
    state::AppState,
};

/// Get the current authenticated account.
#[utoipa::path(
    get,
    path = "/v1/accounts/me",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists"),
    )
)]
pub async fn current_account(
    State(state): State<AppState>,
    Auth(subject): Auth,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .service
        .account_by_username(&subject)?
        .ok_or_else(|| ApiError::not_found("account not found"))?;
    Ok(Json(account.into()))
}

/// Reveal the wallet private key to the account holder.
///
/// Requires the account password on top of the bearer token. The reveal is
/// logged (account id only, never the key).
#[utoipa::path(
    post,
    path = "/v1/accounts/private-key",
    request_body = RevealKeyRequest,
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Decrypted private key", body = RevealKeyResponse),
        (status = 401, description = "Unauthorized or wrong password"),
        (status = 404, description = "Account or wallet not found"),
    )
)]
pub async fn reveal_private_key(
    State(state): State<AppState>,
    Auth(subject): Auth,
    Json(request): Json<RevealKeyRequest>,
) -> Result<Json<RevealKeyResponse>, ApiError> {
    let account = state
        .service
        .account_by_username(&subject)?
        .ok_or_else(|| ApiError::not_found("account not found"))?;

    let private_key = state
        .service
        .reveal_private_key(&account.id, &request.password)?;

    Ok(Json(RevealKeyResponse { private_key }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    fn register(state: &AppState) -> AccountResponse {
        let account = state
            .service
            .register("a@x.com", "alice123", "Abc12345!")
            .unwrap();
        account.into()
    }

    #[tokio::test]
    async fn current_account_returns_profile() {
        let (state, _dir) = test_state();
        let registered = register(&state);

        let response = current_account(State(state), Auth("alice123".to_string()))
            .await
            .expect("profile");
        assert_eq!(response.0, registered);
    }

    #[tokio::test]
    async fn current_account_missing_is_404() {
        let (state, _dir) = test_state();

        let err = current_account(State(state), Auth("ghost99".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reveal_requires_correct_password() {
        let (state, _dir) = test_state();
        register(&state);

        let response = reveal_private_key(
            State(state.clone()),
            Auth("alice123".to_string()),
            Json(RevealKeyRequest {
                password: "Abc12345!".to_string(),
            }),
        )
        .await
        .expect("reveal succeeds");
        assert!(response.0.private_key.starts_with("0x"));
        assert_eq!(response.0.private_key.len(), 66);

        let err = reveal_private_key(
            State(state),
            Auth("alice123".to_string()),
            Json(RevealKeyRequest {
                password: "Wrong123!".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
