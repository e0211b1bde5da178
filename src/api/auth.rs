// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login, and token validation endpoints.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        AccountResponse, LoginRequest, LoginResponse, RegisterRequest, TokenValidationResponse,
    },
    state::AppState,
};

/// Register a new account.
///
/// Issues a wallet, hashes the password, and encrypts the wallet key under
/// the password before anything is persisted.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid email, username, or password"),
        (status = 409, description = "Email or username already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state
        .service
        .register(&request.email, &request.username, &request.password)?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Authenticate and receive a bearer token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (access_token, account) = state.service.login(&request.username, &request.password)?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        account: account.into(),
    }))
}

/// Validate the presented bearer token.
#[utoipa::path(
    get,
    path = "/v1/auth/validate",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid", body = TokenValidationResponse),
        (status = 401, description = "Token is expired or invalid"),
    )
)]
pub async fn validate(Auth(subject): Auth) -> Json<TokenValidationResponse> {
    Json(TokenValidationResponse { subject })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: "a@x.com".to_string(),
            username: "alice123".to_string(),
            password: "Abc12345!".to_string(),
        }
    }

    #[tokio::test]
    async fn register_returns_created_account() {
        let (state, _dir) = test_state();

        let (status, response) = register(State(state), Json(register_request()))
            .await
            .expect("register succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.0.email, "a@x.com");
        assert_eq!(response.0.username.as_deref(), Some("alice123"));
        assert_eq!(response.0.wallet_address.0.len(), 42);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (state, _dir) = test_state();
        register(State(state.clone()), Json(register_request()))
            .await
            .unwrap();

        let err = register(State(state), Json(register_request()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_returns_token_and_summary() {
        let (state, _dir) = test_state();
        register(State(state.clone()), Json(register_request()))
            .await
            .unwrap();

        let response = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice123".to_string(),
                password: "Abc12345!".to_string(),
            }),
        )
        .await
        .expect("login succeeds");

        assert_eq!(response.0.token_type, "bearer");
        assert_eq!(
            state.service.validate_token(&response.0.access_token).unwrap(),
            "alice123"
        );
        assert_eq!(response.0.account.username.as_deref(), Some("alice123"));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (state, _dir) = test_state();
        register(State(state.clone()), Json(register_request()))
            .await
            .unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                username: "alice123".to_string(),
                password: "Wrong123!".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validate_echoes_subject() {
        let response = validate(Auth("alice123".to_string())).await;
        assert_eq!(response.0.subject, "alice123");
    }
}
