// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory for the account database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TOKEN_SECRET` | HMAC secret for bearer tokens | Required |
//! | `TOKEN_TTL_MINUTES` | Bearer token lifetime | `30` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Required for provisioning |
//! | `FACTORY_ADDRESS` | Identity factory contract address | Required for provisioning |
//! | `DEPLOYER_KEY` | Hex private key of the deployer account | Required for provisioning |
//! | `CONFIRM_TIMEOUT_SECS` | Receipt wait timeout per provisioning run | `120` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;

/// Environment variable name for the account database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the bearer-token signing secret.
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";

/// Environment variable name for the bearer-token lifetime in minutes.
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_MINUTES";

/// Environment variable name for the EVM JSON-RPC endpoint.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Environment variable name for the identity factory contract address.
pub const FACTORY_ADDRESS_ENV: &str = "FACTORY_ADDRESS";

/// Environment variable name for the deployer account private key.
///
/// The deployer sponsors identity-creation transactions. It is operationally
/// distinct from any user wallet key and is never stored in the account
/// database.
pub const DEPLOYER_KEY_ENV: &str = "DEPLOYER_KEY";

/// Environment variable name for the confirmation-wait timeout in seconds.
pub const CONFIRM_TIMEOUT_ENV: &str = "CONFIRM_TIMEOUT_SECS";

/// Default bearer-token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Default confirmation-wait timeout in seconds.
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 120;

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the redb account database.
    pub data_dir: String,
    /// Server bind host.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Bearer-token signing secret.
    pub token_secret: String,
    /// Bearer-token lifetime in minutes.
    pub token_ttl_minutes: i64,
    /// EVM JSON-RPC endpoint (None disables identity provisioning).
    pub rpc_url: Option<String>,
    /// Identity factory contract address.
    pub factory_address: Option<String>,
    /// Deployer account private key (hex, no 0x prefix required).
    pub deployer_key: Option<String>,
    /// Receipt wait timeout per provisioning run.
    pub confirm_timeout_secs: u64,
}

impl ServiceConfig {
    /// Load configuration from the environment.
    ///
    /// Fails only when `TOKEN_SECRET` is absent; chain settings are optional
    /// so the service can run registration/login without an RPC endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_secret = env::var(TOKEN_SECRET_ENV)
            .map_err(|_| ConfigError::Missing(TOKEN_SECRET_ENV))?;

        let token_ttl_minutes = match env::var(TOKEN_TTL_ENV) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(TOKEN_TTL_ENV))?,
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let confirm_timeout_secs = match env::var(CONFIRM_TIMEOUT_ENV) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(CONFIRM_TIMEOUT_ENV))?,
            Err(_) => DEFAULT_CONFIRM_TIMEOUT_SECS,
        };

        let port: u16 = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            data_dir: env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            token_secret,
            token_ttl_minutes,
            rpc_url: env::var(RPC_URL_ENV).ok(),
            factory_address: env::var(FACTORY_ADDRESS_ENV).ok(),
            deployer_key: env::var(DEPLOYER_KEY_ENV).ok(),
            confirm_timeout_secs,
        })
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
