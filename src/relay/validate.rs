//! Inbound request validation.
//!
//! The body is inspected as loose JSON rather than deserialized straight
//! into [`TryOnRequest`], so that every malformed shape maps onto one of the
//! relay's own validation errors instead of a framework rejection.

use serde_json::{Map, Value};

use crate::relay::error::RelayError;
use crate::relay::types::{Garment, TryOnRequest, MAX_GARMENTS};

/// Validate a raw request body. Performs no I/O.
pub fn parse_request(body: &[u8]) -> Result<TryOnRequest, RelayError> {
    // Unparseable bodies are treated like an empty object.
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);

    let model_url = object
        .get("model_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty());

    let entries = object
        .get("prendas")
        .and_then(Value::as_array)
        .filter(|entries| !entries.is_empty());

    let (model_url, entries) = match (model_url, entries) {
        (Some(url), Some(entries)) => (url, entries),
        _ => return Err(RelayError::MissingFields),
    };

    if entries.len() > MAX_GARMENTS {
        return Err(RelayError::TooManyGarments {
            count: entries.len(),
        });
    }

    let garments = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_garment(i + 1, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TryOnRequest {
        model_url: model_url.to_string(),
        garments,
    })
}

fn parse_garment(index: usize, entry: &Value) -> Result<Garment, RelayError> {
    let cloth_url = entry
        .get("cloth_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or(RelayError::InvalidGarment {
            index,
            field: "cloth_url",
        })?;

    let cloth_type = entry
        .get("cloth_type")
        .and_then(Value::as_str)
        .ok_or(RelayError::InvalidGarment {
            index,
            field: "cloth_type",
        })?;

    Ok(Garment {
        cloth_url: cloth_url.to_string(),
        cloth_type: cloth_type.to_string(),
    })
}
