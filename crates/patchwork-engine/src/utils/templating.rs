/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Tera rendering of parameter templates.
//!
//! Templates render against a [`ContextOverlays`] value: an ordered list of
//! JSON objects merged left to right, so later layers shadow earlier keys.
//! Two filters are registered for timestamps:
//!
//! - `datetime_local`: `%Y-%m-%dT%H:%M`, the format of an HTML
//!   `datetime-local` input.
//! - `iso8601`: `%Y-%m-%d %H:%M:%S`.
//!
//! Both render missing, null or zero timestamps as an empty string.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tera::{Context, Tera};

/// Error type for templating operations.
#[derive(Debug, Clone)]
pub struct TemplateError {
    pub message: String,
    pub details: Option<String>,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Ordered template context layers.
#[derive(Debug, Clone, Default)]
pub struct ContextOverlays {
    layers: Vec<Map<String, Value>>,
}

impl ContextOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer holding `value` under `name`.
    pub fn push_named<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), TemplateError> {
        let mut layer = Map::new();
        layer.insert(name.to_string(), to_value(value)?);
        self.layers.push(layer);
        Ok(())
    }

    /// Adds a layer with the fields of `value` at the top level.
    ///
    /// Values that do not serialize to an object are rejected.
    pub fn push_flat<T: Serialize>(&mut self, value: &T) -> Result<(), TemplateError> {
        match to_value(value)? {
            Value::Object(map) => {
                self.layers.push(map);
                Ok(())
            }
            other => Err(TemplateError {
                message: "Context layer must be an object".to_string(),
                details: Some(other.to_string()),
            }),
        }
    }

    /// Merges the layers, later keys winning.
    pub fn flatten(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for layer in &self.layers {
            for (key, value) in layer {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn to_context(&self) -> Context {
        let mut context = Context::new();
        for (key, value) in self.flatten() {
            context.insert(key, &value);
        }
        context
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, TemplateError> {
    serde_json::to_value(value).map_err(|e| TemplateError {
        message: "Context value is not serializable".to_string(),
        details: Some(e.to_string()),
    })
}

/// Validate Tera template syntax without rendering.
pub fn validate_tera_syntax(template_content: &str) -> Result<(), TemplateError> {
    let mut tera = Tera::default();

    tera.add_raw_template("__validation__", template_content)
        .map_err(|e| TemplateError {
            message: "Invalid Tera syntax".to_string(),
            details: Some(e.to_string()),
        })?;

    Ok(())
}

/// Render a Tera template against the overlays.
///
/// # Example
///
/// ```
/// use patchwork_engine::utils::templating::{render_template, ContextOverlays};
/// use serde_json::json;
///
/// let mut overlays = ContextOverlays::new();
/// overlays.push_flat(&json!({"name": "web01"})).unwrap();
///
/// let result = render_template("host={{ name }}", &overlays).unwrap();
/// assert_eq!(result, "host=web01");
/// ```
pub fn render_template(template_content: &str, overlays: &ContextOverlays) -> Result<String, TemplateError> {
    let mut tera = Tera::default();
    tera.register_filter("datetime_local", datetime_local);
    tera.register_filter("iso8601", iso8601);

    tera.add_raw_template("template", template_content)
        .map_err(|e| TemplateError {
            message: "Template parse error".to_string(),
            details: Some(e.to_string()),
        })?;

    tera.render("template", &overlays.to_context())
        .map_err(|e| TemplateError {
            message: "Template rendering failed".to_string(),
            details: Some(e.to_string()),
        })
}

/// Parses a serialized timestamp, treating null and year-one values as unset.
fn timestamp(value: &Value) -> tera::Result<Option<DateTime<Utc>>> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::String(s) => s,
        other => {
            return Err(tera::Error::msg(format!(
                "Expected a timestamp string, got {}",
                other
            )))
        }
    };
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| tera::Error::msg(format!("Invalid timestamp '{}': {}", raw, e)))?
        .with_timezone(&Utc);
    if parsed.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(parsed))
}

fn format_timestamp(value: &Value, format: &str) -> tera::Result<Value> {
    Ok(Value::String(
        timestamp(value)?
            .map(|t| t.format(format).to_string())
            .unwrap_or_default(),
    ))
}

/// Formats a timestamp as `%Y-%m-%dT%H:%M`.
pub fn datetime_local(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    format_timestamp(value, "%Y-%m-%dT%H:%M")
}

/// Formats a timestamp as `%Y-%m-%d %H:%M:%S`.
pub fn iso8601(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    format_timestamp(value, "%Y-%m-%d %H:%M:%S")
}
