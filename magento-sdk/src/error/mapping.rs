//! Error mapping for Magento REST responses
//!
//! Magento reports failures as
//! `{"message": "No such entity with %fieldName = %fieldValue", "parameters": {...}}`
//! where `parameters` is either a positional list (`%1`, `%2`, ...) or a
//! named map. This module renders those into plain messages.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ApiError, ErrorContext};

/// Map a non-success Magento response to an ApiError
pub fn map_magento_error(status: StatusCode, body: &str, context: ErrorContext) -> ApiError {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => match json.get("message").and_then(|m| m.as_str()) {
            Some(template) => render_message(template, json.get("parameters")),
            None => fallback_message(status, body),
        },
        Err(_) => fallback_message(status, body),
    };

    ApiError::from_status(status.as_u16(), message).with_context(context)
}

/// Substitute Magento `%` placeholders with their parameter values
pub fn render_message(template: &str, parameters: Option<&Value>) -> String {
    let mut rendered = template.to_string();

    match parameters {
        Some(Value::Array(values)) => {
            // Replace from the highest index down so %1 does not clobber %10
            for (index, value) in values.iter().enumerate().rev() {
                let placeholder = format!("%{}", index + 1);
                rendered = rendered.replace(&placeholder, &value_to_text(value));
            }
        }
        Some(Value::Object(map)) => {
            let mut keys: Vec<&String> = map.keys().collect();
            // Longest first so %field does not clobber %fieldName
            keys.sort_by(|a, b| b.len().cmp(&a.len()));
            for key in keys {
                let placeholder = format!("%{}", key);
                rendered = rendered.replace(&placeholder, &value_to_text(&map[key]));
            }
        }
        _ => {}
    }

    rendered
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, crate::util::truncate_string(body, 100))
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}
