/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! HTTP client construction honoring a backend's TLS policy.

use crate::error::ClientError;
use patchwork_models::models::Backend;
use patchwork_utils::logging::prelude::*;
use std::time::Duration;

/// Builds a `reqwest` client for `backend` with the given request timeout.
///
/// A PEM `ca_cert` is trusted in addition to the system roots.
/// `ssl_skip_verify` disables certificate verification entirely.
pub fn build_client(backend: &Backend, timeout: Duration) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Some(pem) = backend.ca_cert.as_deref().filter(|pem| !pem.trim().is_empty()) {
        let certificate = reqwest::Certificate::from_pem(pem.as_bytes())
            .map_err(|e| ClientError::Config(format!("Invalid CA certificate: {}", e)))?;
        builder = builder.add_root_certificate(certificate);
    }

    if backend.ssl_skip_verify {
        warn!(
            "TLS certificate verification is disabled for backend '{}'",
            backend.name
        );
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))
}
