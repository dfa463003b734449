/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Inventory
//!
//! Node inventory as seen by the reconciler. An [`InventorySource`] answers
//! two questions: which nodes carry a patch window fact matching a pattern,
//! and which distinct values that fact takes across the fleet.
//!
//! Node facts are kept as raw JSON. Typed extraction into server attributes
//! lives in [`facts`].

use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod facts;
pub mod puppetdb;

pub use facts::ServerFacts;
pub use puppetdb::PuppetDbClient;

/// Sentinel for a fact the node does not report.
pub const MISSING_FACT: &str = "UNSET";
/// Sentinel for a fact the node reports as null.
pub const NULL_FACT: &str = "NULL";

/// Regex match of one fact against a pattern, ordered by certname ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    /// Full fact path, e.g. `facts.pe_patch.patch_group`.
    pub fact_path: String,
    pub pattern: String,
}

impl NodeQuery {
    /// Query for nodes whose `fact_name` matches the patch window.
    pub fn patch_window(fact_name: &str, window: &str) -> Self {
        Self {
            fact_path: format!("facts.{}", fact_name),
            pattern: window.to_string(),
        }
    }
}

/// Number of nodes reporting one value of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCount {
    pub value: String,
    pub count: u64,
}

/// One node and its facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub certname: String,
    #[serde(default)]
    pub facts: Value,
}

impl NodeRecord {
    /// Walks a dotted path through nested fact objects.
    pub fn fact(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.facts, |current, segment| current.get(segment))
    }

    /// A fact rendered as a string.
    ///
    /// Missing facts become [`MISSING_FACT`], null facts [`NULL_FACT`]. Non
    /// string values are rendered as JSON.
    pub fn fact_string(&self, path: &str) -> String {
        match self.fact(path) {
            None => MISSING_FACT.to_string(),
            Some(Value::Null) => NULL_FACT.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// A numeric fact. Missing, null or non-numeric values are `None`.
    pub fn fact_count(&self, path: &str) -> Option<i32> {
        match self.fact(path)? {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A list fact. Anything other than an array yields an empty list.
    pub fn fact_strings(&self, path: &str) -> Vec<String> {
        match self.fact(path) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Read access to a node inventory.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Nodes whose fact matches the query pattern.
    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRecord>, ClientError>;

    /// Distinct values of a fact with the number of nodes reporting each.
    async fn fact_values(&self, fact_path: &str) -> Result<Vec<FactCount>, ClientError>;
}
