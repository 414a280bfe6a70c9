//! JSON Schema validation for protocol documents.
//!
//! Structured protocol files are checked against `schema/protocol.schema.json`
//! before they are deserialized, so authors get every problem at once instead
//! of the first serde error.

use std::sync::OnceLock;

/// Embedded protocol schema (loaded at compile time).
const PROTOCOL_SCHEMA_JSON: &str = include_str!("../../schema/protocol.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(PROTOCOL_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(|e| e.clone())
}

/// Validate a protocol JSON value against the schema.
///
/// Returns `Ok(())` if valid, or every validation error message with the
/// path of the offending value.
pub fn validate_protocol_schema(protocol_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(protocol_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
