//! JSON payload decoding.

use glass_types::Event;
use serde_json::{Map, Value};

use crate::DecodeError;

/// Decodes a request body into an [`Event`].
///
/// The body must be a UTF-8 JSON object with string fields `content` and
/// `timestamp`; other fields are ignored. Decoding is all-or-nothing: a
/// timestamp that resolves through neither accepted format fails the whole
/// payload.
///
/// # Errors
///
/// Returns the [`DecodeError`] variant naming the first check that failed.
pub fn decode_payload(body: &[u8]) -> Result<Event, DecodeError> {
    let text = std::str::from_utf8(body)?;
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let content = string_field(object, "content")?;
    let timestamp = string_field(object, "timestamp")?;

    Ok(Event::new(content, timestamp)?)
}

fn string_field<'a>(
    object: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, DecodeError> {
    object
        .get(name)
        .ok_or(DecodeError::MissingField(name))?
        .as_str()
        .ok_or(DecodeError::FieldNotString(name))
}
