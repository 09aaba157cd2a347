//! Submission encoding: raw document bytes → base64 `file_sources` entry.
//!
//! Docling Serve accepts documents inline in the JSON request body, so the
//! binary payload has to travel as text. Standard (padded) base64 is what the
//! server decodes; URL-safe variants are rejected.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use tracing::debug;

/// One entry of the `file_sources` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub base64_string: String,
    pub filename: String,
}

/// Encode a single document as a `file_sources` entry.
pub fn encode_source(bytes: &[u8], filename: &str) -> FileSource {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", filename, b64.len());
    FileSource {
        base64_string: b64,
        filename: filename.to_string(),
    }
}

/// Build the `POST /convert/source/async` body for one document:
/// `{ options, file_sources: [{ base64_string, filename }] }`.
pub fn submit_body(bytes: &[u8], filename: &str, options: &Map<String, Value>) -> Value {
    let source = encode_source(bytes, filename);
    json!({
        "options": Value::Object(options.clone()),
        "file_sources": [{
            "base64_string": source.base64_string,
            "filename": source.filename,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_small_document() {
        let source = encode_source(b"%PDF-1.7 hello", "report.pdf");
        assert_eq!(source.filename, "report.pdf");
        let decoded = STANDARD.decode(&source.base64_string).expect("valid base64");
        assert_eq!(decoded, b"%PDF-1.7 hello");
    }

    #[test]
    fn submit_body_shape() {
        let mut options = Map::new();
        options.insert("to_formats".into(), json!(["json"]));
        let body = submit_body(b"abc", "a.txt", &options);

        assert_eq!(body["options"]["to_formats"], json!(["json"]));
        let sources = body["file_sources"].as_array().expect("array");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0]["filename"], "a.txt");
        assert_eq!(sources[0]["base64_string"], "YWJj");
    }
}
