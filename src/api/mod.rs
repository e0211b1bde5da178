// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AccountResponse, IdentityGrantResponse, IdentityResponse, IssueIdentityRequest,
        LoginRequest, LoginResponse, RegisterRequest, RevealKeyRequest, RevealKeyResponse,
        TokenValidationResponse, WalletAddress,
    },
    state::AppState,
};

pub mod accounts;
pub mod auth;
pub mod health;
pub mod identity;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/validate", get(auth::validate))
        .route("/accounts/me", get(accounts::current_account))
        .route("/accounts/private-key", post(accounts::reveal_private_key))
        .route(
            "/identity",
            get(identity::get_identity).post(identity::issue_identity),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::validate,
        accounts::current_account,
        accounts::reveal_private_key,
        identity::issue_identity,
        identity::get_identity,
        health::health
    ),
    components(
        schemas(
            WalletAddress,
            RegisterRequest,
            AccountResponse,
            LoginRequest,
            LoginResponse,
            TokenValidationResponse,
            IssueIdentityRequest,
            IdentityGrantResponse,
            IdentityResponse,
            RevealKeyRequest,
            RevealKeyResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, and token validation"),
        (name = "Accounts", description = "Account details and key reveal"),
        (name = "Identity", description = "On-chain identity provisioning"),
        (name = "Health", description = "Liveness probe")
    )
)]
struct ApiDoc;
