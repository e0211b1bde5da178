// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use relational_accounts_server::api::router;
use relational_accounts_server::auth::tokens::TokenService;
use relational_accounts_server::blockchain::{FactoryClient, IdentityProvisioner};
use relational_accounts_server::config::ServiceConfig;
use relational_accounts_server::service::AccountService;
use relational_accounts_server::state::AppState;
use relational_accounts_server::storage::AccountDirectory;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServiceConfig::from_env().expect("Failed to load configuration");

    let db_path = Path::new(&config.data_dir).join("accounts.redb");
    let directory = AccountDirectory::open(&db_path).expect("Failed to open account directory");

    let tokens = TokenService::new(
        config.token_secret.as_bytes(),
        chrono::Duration::minutes(config.token_ttl_minutes),
    );

    // Chain settings are optional: without them the service still serves
    // registration, login, and key custody, and identity issuance reports 503.
    let provisioner = match (&config.rpc_url, &config.factory_address, &config.deployer_key) {
        (Some(rpc_url), Some(factory_address), Some(deployer_key)) => {
            let client = FactoryClient::connect(rpc_url, factory_address, deployer_key)
                .await
                .expect("Failed to connect chain client");
            tracing::info!(
                deployer = %client.deployer_address(),
                factory = %factory_address,
                "identity provisioning enabled"
            );
            Some(IdentityProvisioner::new(
                client,
                Duration::from_secs(config.confirm_timeout_secs),
            ))
        }
        _ => {
            tracing::warn!("chain settings missing; identity provisioning disabled");
            None
        }
    };

    let service = AccountService::new(directory, tokens, provisioner)
        .expect("Failed to construct account service");

    let shutdown = CancellationToken::new();
    let state = AppState::new(service, shutdown.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    tracing::info!(%addr, "accounts server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            // Abort in-flight confirmation waits; nothing is recorded from
            // a cancelled run.
            shutdown.cancel();
        })
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug"));

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
