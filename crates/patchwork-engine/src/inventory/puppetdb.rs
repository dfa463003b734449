/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! PuppetDB v4 query client.

use super::{FactCount, InventorySource, NodeQuery, NodeRecord};
use crate::backends::tls::build_client;
use crate::error::ClientError;
use async_trait::async_trait;
use patchwork_models::models::Backend;
use patchwork_utils::logging::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const INVENTORY_PATH: &str = "/pdb/query/v4/inventory";
const FACT_CONTENTS_PATH: &str = "/pdb/query/v4/fact-contents";

/// Inventory source backed by a PuppetDB instance.
pub struct PuppetDbClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FactContentRow {
    value: Value,
    count: u64,
}

impl PuppetDbClient {
    pub fn new(backend: &Backend, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(&backend.inventory_base_url())
            .map_err(|e| ClientError::Config(format!("Invalid inventory URL: {}", e)))?;
        Ok(Self {
            client: build_client(backend, timeout)?,
            base_url,
            token: backend.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("Invalid endpoint: {}", e)))
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut request = self.client.get(self.endpoint(path)?).query(params);
        if let Some(token) = &self.token {
            request = request.header("X-Authentication", token);
        }

        let response = request.send().await.map_err(ClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_reqwest)
    }
}

/// `["~", "<fact path>", "<pattern>"]`
pub fn inventory_query(query: &NodeQuery) -> String {
    json!(["~", query.fact_path, query.pattern]).to_string()
}

/// Distinct values of a fact with counts, grouped by value.
pub fn fact_values_query(fact_path: &str) -> String {
    let segments: Vec<&str> = fact_path.split('.').collect();
    json!([
        "extract",
        [["function", "count"], "value"],
        ["=", "path", segments],
        ["group_by", "value"]
    ])
    .to_string()
}

#[async_trait]
impl InventorySource for PuppetDbClient {
    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRecord>, ClientError> {
        debug!(
            "Querying inventory for {} matching '{}'",
            query.fact_path, query.pattern
        );
        let order_by = json!([{"field": "certname", "order": "asc"}]).to_string();
        self.query(
            INVENTORY_PATH,
            &[("query", inventory_query(query)), ("order_by", order_by)],
        )
        .await
    }

    async fn fact_values(&self, fact_path: &str) -> Result<Vec<FactCount>, ClientError> {
        let order_by = json!([{"field": "value", "order": "asc"}]).to_string();
        let rows: Vec<FactContentRow> = self
            .query(
                FACT_CONTENTS_PATH,
                &[("query", fact_values_query(fact_path)), ("order_by", order_by)],
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let value = match row.value {
                    Value::String(s) => s,
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some(FactCount {
                    value,
                    count: row.count,
                })
            })
            .collect())
    }
}
