/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Parameter resolution and type coercion for dispatched jobs.

use crate::utils::templating::{render_template, ContextOverlays};
use patchwork_models::models::DefinitionParam;
use patchwork_utils::logging::prelude::*;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Converts a raw value according to a parameter type tag.
///
/// Returns `None` when the value is empty or cannot be parsed, in which case
/// the parameter is left out of the submission.
pub fn coerce(param_type: &str, value: &str) -> Option<Value> {
    if value.is_empty() {
        return None;
    }

    let param_type = param_type.trim();
    if let Some(inner) = param_type
        .strip_prefix("Optional[")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return coerce(inner, value);
    }

    // Range-constrained types such as Integer[0, 10] coerce like their base.
    let base = param_type
        .split_once('[')
        .map(|(base, _)| base)
        .unwrap_or(param_type);

    match base {
        "Integer" => value.trim().parse::<i64>().ok().map(|n| Value::Number(Number::from(n))),
        "Boolean" | "BooleanParameterDefinition" => Some(Value::Bool(is_truthy(value))),
        "String" | "StringParameterDefinition" | "ChoiceParameterDefinition"
        | "TextParameterDefinition" => Some(Value::String(value.to_string())),
        _ => Some(Value::String(value.to_string())),
    }
}

/// Coerces a value for a build submission, where everything is a string.
pub fn coerce_for_build(param_type: &str, value: &str) -> Option<String> {
    coerce(param_type, value).map(|value| match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1"
    )
}

/// Names in `overrides` that `params` does not declare.
pub fn undeclared_overrides<'a>(
    params: &[DefinitionParam],
    overrides: &'a BTreeMap<String, String>,
) -> Vec<&'a str> {
    overrides
        .keys()
        .filter(|name| !params.iter().any(|p| &p.name == *name))
        .map(String::as_str)
        .collect()
}

/// Picks the raw value of every declared parameter.
///
/// An override wins, then a rendered template, then the default. A template
/// that fails to render drops the parameter.
pub fn resolve_raw(
    params: &[DefinitionParam],
    overrides: &BTreeMap<String, String>,
    overlays: &ContextOverlays,
) -> BTreeMap<String, (String, String)> {
    let mut resolved = BTreeMap::new();

    for param in params {
        let value = if let Some(value) = overrides.get(&param.name) {
            Some(value.clone())
        } else if param.has_template() {
            let template = param.template_value.as_deref().unwrap_or_default();
            match render_template(template, overlays) {
                Ok(rendered) => Some(rendered),
                Err(e) => {
                    warn!(
                        "Dropping parameter '{}': template failed to render: {}",
                        param.name, e
                    );
                    None
                }
            }
        } else {
            param.default_value.clone()
        };

        if let Some(value) = value {
            resolved.insert(param.name.clone(), (param.param_type.clone(), value));
        }
    }

    resolved
}

/// Resolves and coerces parameters for a task or plan submission.
pub fn resolve(
    params: &[DefinitionParam],
    overrides: &BTreeMap<String, String>,
    overlays: &ContextOverlays,
) -> Map<String, Value> {
    resolve_raw(params, overrides, overlays)
        .into_iter()
        .filter_map(|(name, (param_type, value))| {
            let coerced = coerce(&param_type, &value);
            if coerced.is_none() && !value.is_empty() {
                debug!(
                    "Dropping parameter '{}': '{}' is not a valid {}",
                    name, value, param_type
                );
            }
            coerced.map(|v| (name, v))
        })
        .collect()
}

/// Resolves parameters for a build submission.
pub fn resolve_for_build(
    params: &[DefinitionParam],
    overrides: &BTreeMap<String, String>,
    overlays: &ContextOverlays,
) -> BTreeMap<String, String> {
    resolve_raw(params, overrides, overlays)
        .into_iter()
        .filter_map(|(name, (param_type, value))| {
            coerce_for_build(&param_type, &value).map(|v| (name, v))
        })
        .collect()
}
