//! Validation of tool arguments against a tool's input schema.
//!
//! Schemas are compiled with `jsonschema`. A schema that does not compile is
//! treated as permissive, so an unusual schema never rejects a call the
//! server itself would accept.

use jsonschema::JSONSchema;
use serde_json::Value;

/// Validate `value` against `schema`.
///
/// On failure returns one reason per violation, each prefixed with the JSON
/// pointer of the offending value, e.g. `/cc/1: 7 is not of type "string"`.
pub fn validate(value: &Value, schema: &Value) -> Result<(), String> {
    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            tracing::debug!(error = %e, "input schema does not compile; accepting arguments");
            return Ok(());
        }
    };

    let result = compiled.validate(value);
    if let Err(errors) = result {
        let reasons: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/" } else { path.as_str() };
                format!("{path}: {error}")
            })
            .collect();
        return Err(reasons.join("; "));
    }
    Ok(())
}
