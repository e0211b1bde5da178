// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AccountService>,
    /// Cancelled on shutdown; aborts in-flight confirmation waits so no
    /// identity is recorded from a half-finished run.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: AccountService, shutdown: CancellationToken) -> Self {
        Self {
            service: Arc::new(service),
            shutdown,
        }
    }
}
