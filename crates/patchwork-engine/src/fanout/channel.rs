/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Delivery of rendered messages to chat webhooks.

use crate::error::ClientError;
use async_trait::async_trait;
use patchwork_utils::logging::{prelude::*, redact_url};
use serde_json::json;
use std::time::Duration;

/// Sends text to one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, webhook_url: &str, text: &str) -> Result<(), ClientError>;
}

/// Posts `{"markdown": text}` to an incoming chat webhook.
///
/// Webhook URLs carry their credentials in the query string, so errors
/// returned from here never include the URL.
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(&self, webhook_url: &str, text: &str) -> Result<(), ClientError> {
        debug!("Posting {} bytes to {}", text.len(), redact_url(webhook_url));
        let body = json!({ "markdown": text }).to_string();
        let response = self
            .client
            .post(webhook_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::from_response(response).await)
        }
    }
}
