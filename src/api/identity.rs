// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain identity endpoints.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{IdentityGrantResponse, IdentityResponse, IssueIdentityRequest},
    state::AppState,
};

/// Provision an on-chain identity for the authenticated account.
///
/// Idempotent: if the account already has a confirmed identity, the
/// existing address is returned with status 200 and no transaction is
/// submitted. A fresh provisioning run returns 201.
#[utoipa::path(
    post,
    path = "/v1/identity",
    request_body = IssueIdentityRequest,
    tag = "Identity",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Identity created", body = IdentityGrantResponse),
        (status = 200, description = "Identity already existed", body = IdentityGrantResponse),
        (status = 400, description = "Invalid name or symbol"),
        (status = 502, description = "Chain failure; body carries a retryable flag"),
        (status = 503, description = "Provisioning not configured"),
    )
)]
pub async fn issue_identity(
    State(state): State<AppState>,
    Auth(subject): Auth,
    Json(request): Json<IssueIdentityRequest>,
) -> Result<(StatusCode, Json<IdentityGrantResponse>), ApiError> {
    let account = state
        .service
        .account_by_username(&subject)?
        .ok_or_else(|| ApiError::not_found("account not found"))?;

    let grant = state
        .service
        .issue_identity(&account.id, &request.name, &request.symbol, &state.shutdown)
        .await?;

    let status = if grant.newly_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(grant.into())))
}

/// Get the authenticated account's recorded identity.
#[utoipa::path(
    get,
    path = "/v1/identity",
    tag = "Identity",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Recorded identity", body = IdentityResponse),
        (status = 404, description = "No identity recorded"),
    )
)]
pub async fn get_identity(
    State(state): State<AppState>,
    Auth(subject): Auth,
) -> Result<Json<IdentityResponse>, ApiError> {
    let account = state
        .service
        .account_by_username(&subject)?
        .ok_or_else(|| ApiError::not_found("account not found"))?;

    let identity = state
        .service
        .identity_for_account(&account.id)?
        .ok_or_else(|| ApiError::not_found("identity not found"))?;

    Ok(Json(identity.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn issue_identity_without_chain_is_unavailable() {
        let (state, _dir) = test_state();
        state
            .service
            .register("a@x.com", "alice123", "Abc12345!")
            .unwrap();

        let err = issue_identity(
            State(state),
            Auth("alice123".to_string()),
            Json(IssueIdentityRequest {
                name: "Alice".to_string(),
                symbol: "ALC".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn get_identity_before_provisioning_is_404() {
        let (state, _dir) = test_state();
        state
            .service
            .register("a@x.com", "alice123", "Abc12345!")
            .unwrap();

        let err = get_identity(State(state), Auth("alice123".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
