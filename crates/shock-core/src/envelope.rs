//! The `{status, data, error}` wrapper every Shock response uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ShockError, ShockResult};

const REQUIRED_KEYS: [&str; 3] = ["status", "data", "error"];

/// Decoded response envelope with `data` left as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub data: Value,
    pub error: Option<Vec<String>>,
}

impl Envelope {
    /// Parse a response body, rejecting anything that is not a JSON object
    /// carrying all three envelope keys.
    pub fn parse(body: &[u8]) -> ShockResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ShockError::MalformedResponse(format!("body is not JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| ShockError::MalformedResponse("body is not a JSON object".into()))?;

        if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
            return Err(ShockError::MalformedResponse(format!(
                "missing key '{}'",
                missing
            )));
        }

        let status = object["status"]
            .as_u64()
            .and_then(|s| u16::try_from(s).ok())
            .ok_or_else(|| ShockError::MalformedResponse("status is not an integer".into()))?;

        let error = match &object["error"] {
            Value::Null => None,
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::String(s) => Some(vec![s.clone()]),
            _ => {
                return Err(ShockError::MalformedResponse(
                    "error is neither an array nor null".into(),
                ))
            }
        };

        Ok(Self {
            status,
            data: object["data"].clone(),
            error,
        })
    }

    /// First reported error, if the service reported any.
    pub fn first_error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .and_then(|errors| errors.first())
            .map(String::as_str)
    }

    /// Turn a reported error into a [`ShockError`]; a 404 becomes `NotFound`.
    pub fn into_result(self) -> ShockResult<Value> {
        match self.first_error() {
            Some(message) if self.status == 404 => Err(ShockError::NotFound(message.to_string())),
            Some(message) => Err(ShockError::service(self.status, message)),
            None => Ok(self.data),
        }
    }

    /// Check for reported errors and decode `data` into `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> ShockResult<T> {
        let data = self.into_result()?;
        serde_json::from_value(data).map_err(|e| {
            ShockError::MalformedResponse(format!("unexpected data shape: {}", e))
        })
    }
}
