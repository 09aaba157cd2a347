//! Structural validation of converted payloads.
//!
//! The server returns the converted document as an opaque JSON blob
//! (`document.json_content`). Before handing it to the caller the pipeline
//! asks a [`DocumentValidator`] whether the blob is acceptable; a rejection
//! skips that one document with the validator's diagnostic, it never aborts
//! the batch.
//!
//! [`DoclingDocumentValidator`] is the default. It checks the envelope of a
//! `DoclingDocument` (schema name, version, required `name`, collection
//! fields of the right JSON type) without modelling the full schema. Callers
//! with stricter needs inject their own validator through
//! [`crate::config::ServeConfigBuilder::validator`].

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Decides whether a converted payload is a usable document.
pub trait DocumentValidator: Send + Sync {
    /// Return the (possibly normalised) document, or a diagnostic.
    fn validate(&self, payload: Value) -> Result<Value, ValidationError>;
}

/// `schema_name` every Docling document carries.
pub const DOCLING_SCHEMA_NAME: &str = "DoclingDocument";

/// Major version of the document schema this crate understands.
pub const SUPPORTED_MAJOR_VERSION: u64 = 1;

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").unwrap());

const ARRAY_FIELDS: &[&str] = &["groups", "texts", "pictures", "tables", "key_value_items", "form_items"];
const OBJECT_FIELDS: &[&str] = &["body", "furniture", "origin", "pages"];

/// Envelope-level checks for `DoclingDocument` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoclingDocumentValidator;

impl DocumentValidator for DoclingDocumentValidator {
    fn validate(&self, payload: Value) -> Result<Value, ValidationError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| ValidationError::new("$", format!("expected an object, got {}", type_name(&payload))))?;

        if let Some(schema) = obj.get("schema_name") {
            if schema.as_str() != Some(DOCLING_SCHEMA_NAME) {
                return Err(ValidationError::new(
                    "$.schema_name",
                    format!("expected \"{DOCLING_SCHEMA_NAME}\", got {schema}"),
                ));
            }
        }

        if let Some(version) = obj.get("version") {
            let v = version
                .as_str()
                .ok_or_else(|| ValidationError::new("$.version", "expected a string"))?;
            let caps = RE_VERSION
                .captures(v)
                .ok_or_else(|| ValidationError::new("$.version", format!("'{v}' is not MAJOR.MINOR.PATCH")))?;
            let major: u64 = caps[1]
                .parse()
                .map_err(|_| ValidationError::new("$.version", format!("'{v}' major is out of range")))?;
            if major != SUPPORTED_MAJOR_VERSION {
                return Err(ValidationError::new(
                    "$.version",
                    format!("unsupported major version {major} (expected {SUPPORTED_MAJOR_VERSION})"),
                ));
            }
        }

        match obj.get("name") {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(ValidationError::new(
                    "$.name",
                    format!("expected a string, got {}", type_name(other)),
                ))
            }
            None => return Err(ValidationError::new("$.name", "field required")),
        }

        for field in ARRAY_FIELDS {
            if let Some(v) = obj.get(*field) {
                if !v.is_array() {
                    return Err(ValidationError::new(
                        format!("$.{field}"),
                        format!("expected an array, got {}", type_name(v)),
                    ));
                }
            }
        }

        for field in OBJECT_FIELDS {
            if let Some(v) = obj.get(*field) {
                if !v.is_object() {
                    return Err(ValidationError::new(
                        format!("$.{field}"),
                        format!("expected an object, got {}", type_name(v)),
                    ));
                }
            }
        }

        Ok(payload)
    }
}

/// Accepts every payload. Used by `--skip-validation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl DocumentValidator for AcceptAllValidator {
    fn validate(&self, payload: Value) -> Result<Value, ValidationError> {
        Ok(payload)
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_doc() -> Value {
        json!({
            "schema_name": "DoclingDocument",
            "version": "1.3.0",
            "name": "report",
            "origin": {"mimetype": "application/pdf", "filename": "report.pdf"},
            "body": {"self_ref": "#/body", "children": []},
            "texts": [],
            "tables": [],
            "pages": {}
        })
    }

    #[test]
    fn accepts_minimal_document() {
        let doc = minimal_doc();
        let out = DoclingDocumentValidator.validate(doc.clone()).expect("valid");
        assert_eq!(out, doc);
    }

    #[test]
    fn accepts_document_without_optional_envelope_fields() {
        assert!(DoclingDocumentValidator.validate(json!({"name": "x"})).is_ok());
    }

    #[test]
    fn rejects_non_object() {
        let err = DoclingDocumentValidator.validate(json!([1, 2])).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn rejects_missing_name() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("name");
        let err = DoclingDocumentValidator.validate(doc).unwrap_err();
        assert_eq!(err.path, "$.name");
        assert_eq!(err.message, "field required");
    }

    #[test]
    fn rejects_wrong_schema_name() {
        let mut doc = minimal_doc();
        doc["schema_name"] = json!("SomethingElse");
        let err = DoclingDocumentValidator.validate(doc).unwrap_err();
        assert_eq!(err.path, "$.schema_name");
    }

    #[test]
    fn rejects_bad_versions() {
        for bad in [json!("1.3"), json!("v1.3.0"), json!("2.0.0"), json!(1)] {
            let mut doc = minimal_doc();
            doc["version"] = bad.clone();
            let err = DoclingDocumentValidator.validate(doc).unwrap_err();
            assert_eq!(err.path, "$.version", "version {bad} should be rejected");
        }
    }

    #[test]
    fn rejects_mistyped_collections() {
        let mut doc = minimal_doc();
        doc["texts"] = json!({"not": "a list"});
        assert_eq!(DoclingDocumentValidator.validate(doc).unwrap_err().path, "$.texts");

        let mut doc = minimal_doc();
        doc["body"] = json!([]);
        assert_eq!(DoclingDocumentValidator.validate(doc).unwrap_err().path, "$.body");
    }

    #[test]
    fn accept_all_passes_anything() {
        assert_eq!(AcceptAllValidator.validate(json!(42)).unwrap(), json!(42));
    }
}
