//! Response normalization
//!
//! Providers do not share a response schema. Each accepted shape is a
//! variant here, checked in a fixed order, so every branch can be tested.

use llmgate_common::{MissingVectorPolicy, ProviderError};
use serde::Deserialize;
use serde_json::{json, Value};

/// Shape of a text generation response, in fallback order
#[derive(Debug, Clone, PartialEq)]
pub enum TextPayload {
    /// `{"text": "..."}`
    Direct { text: String, raw: Value },
    /// `{"choices": [{"text": "..."}, ...]}`
    FirstChoice { text: String, raw: Value },
    /// Any other JSON value
    Opaque(Value),
    /// Body that is not JSON at all
    Unparsed(String),
}

impl TextPayload {
    /// Classify a raw response body
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::Unparsed(body.to_string()),
        }
    }

    /// Classify an already parsed response
    pub fn from_value(value: Value) -> Self {
        if let Some(text) = value.get("text").and_then(Value::as_str) {
            return Self::Direct {
                text: text.to_string(),
                raw: value,
            };
        }

        let first_choice = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(text) = first_choice {
            return Self::FirstChoice { text, raw: value };
        }

        Self::Opaque(value)
    }

    /// Normalized text and the raw value kept for diagnostics
    pub fn into_parts(self) -> (String, Value) {
        match self {
            Self::Direct { text, raw } | Self::FirstChoice { text, raw } => (text, raw),
            Self::Opaque(raw) => {
                let text = match &raw {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (text, raw)
            }
            Self::Unparsed(body) => {
                let raw = json!({ "text": body });
                (body, raw)
            }
        }
    }
}

/// Vector field as it may appear on the wire
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VectorField {
    /// `[0.1, 0.2]`
    Flat(Vec<f32>),
    /// `{"values": [0.1, 0.2]}`
    Wrapped { values: Vec<f32> },
    /// `[[0.1, 0.2], ...]`, first entry wins
    Batch(Vec<VectorField>),
}

impl VectorField {
    fn into_vector(self) -> Vec<f32> {
        match self {
            Self::Flat(values) | Self::Wrapped { values } => values,
            Self::Batch(items) => items
                .into_iter()
                .next()
                .map(VectorField::into_vector)
                .unwrap_or_default(),
        }
    }
}

/// Shape of an embedding response, in fallback order
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingPayload {
    /// Vector under `embedding`
    Singular(Vec<f32>),
    /// Vector under `embeddings`
    Plural(Vec<f32>),
    /// Neither field present
    Missing,
}

impl EmbeddingPayload {
    /// Classify a raw response body; anything but a JSON object is malformed
    pub fn from_body(body: &str) -> Result<Self, ProviderError> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            ProviderError::malformed(format!("embedding body is not JSON: {}", e)).with_source(e)
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ProviderError::malformed(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if let Some(field) = object.remove("embedding").filter(|v| !v.is_null()) {
            return parse_vector("embedding", field).map(Self::Singular);
        }
        if let Some(field) = object.remove("embeddings").filter(|v| !v.is_null()) {
            return parse_vector("embeddings", field).map(Self::Plural);
        }

        Ok(Self::Missing)
    }

    /// Resolve to a vector, applying the policy for a missing field
    pub fn into_vector(self, policy: MissingVectorPolicy) -> Result<Vec<f32>, ProviderError> {
        match (self, policy) {
            (Self::Singular(values), _) | (Self::Plural(values), _) => Ok(values),
            (Self::Missing, MissingVectorPolicy::Empty) => Ok(Vec::new()),
            (Self::Missing, MissingVectorPolicy::Reject) => Err(ProviderError::malformed(
                "response has neither 'embedding' nor 'embeddings'",
            )),
        }
    }
}

fn parse_vector(field: &str, value: Value) -> Result<Vec<f32>, ProviderError> {
    serde_json::from_value::<VectorField>(value)
        .map(VectorField::into_vector)
        .map_err(|e| {
            ProviderError::malformed(format!("'{}' is not a numeric vector", field)).with_source(e)
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
