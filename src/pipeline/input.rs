//! Input resolution: turn caller-supplied paths into [`BatchInput`]s.
//!
//! A batch keeps one slot per input even when an input cannot be read, so
//! resolution never fails as a whole. A missing file, a permission error or
//! an extension Docling Serve does not understand all produce a *sourceless*
//! input: it keeps its position in the batch, is never submitted, and ends up
//! as an empty slot in the result list.

use crate::output::ConversionRequest;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extensions Docling Serve can convert (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "adoc", "asciidoc", "asc", "bmp", "csv", "dotx", "dotm", "docm", "docx", "htm", "html",
    "jpeg", "json", "md", "pdf", "png", "potx", "ppsx", "pptm", "potm", "ppsm", "pptx", "tiff",
    "txt", "xls", "xlsx", "xhtml", "xml", "webp",
];

/// One element of a batch, in caller order.
#[derive(Debug, Clone, Default)]
pub struct BatchInput {
    /// Where the document came from; echoed back in the converted result.
    pub path: Option<PathBuf>,
    /// Raw document bytes. `None` when the source could not be read.
    pub bytes: Option<Vec<u8>>,
}

impl BatchInput {
    /// An input whose content is already in memory.
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: Some(path.into()),
            bytes: Some(bytes.into()),
        }
    }

    /// A placeholder that keeps its slot but is never submitted.
    pub fn missing(path: Option<PathBuf>) -> Self {
        Self { path, bytes: None }
    }

    pub fn has_source(&self) -> bool {
        self.path.is_some() && self.bytes.is_some()
    }

    /// Consume the input into a submission request, or `None` if it has no source.
    pub fn into_request(self) -> Option<ConversionRequest> {
        let path = self.path?;
        let bytes = self.bytes?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Some(ConversionRequest {
            source_bytes: bytes,
            source_name,
            source_path: path,
        })
    }
}

/// Check whether `path` has an extension Docling Serve supports.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Read every path into a [`BatchInput`], preserving order.
///
/// Unreadable or unsupported files become sourceless inputs (logged at
/// `warn`), never errors.
pub async fn read_inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<BatchInput> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref().to_path_buf();

        if !is_supported(&path) {
            warn!("Skipping '{}': unsupported file extension", path.display());
            inputs.push(BatchInput::missing(Some(path)));
            continue;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Read {} ({} bytes)", path.display(), bytes.len());
                inputs.push(BatchInput {
                    path: Some(path),
                    bytes: Some(bytes),
                });
            }
            Err(e) => {
                warn!("Skipping '{}': {}", path.display(), e);
                inputs.push(BatchInput::missing(Some(path)));
            }
        }
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("/tmp/report.pdf")));
        assert!(is_supported(Path::new("slides.PPTX")));
        assert!(is_supported(Path::new("notes.md")));
        assert!(!is_supported(Path::new("archive.zip")));
        assert!(!is_supported(Path::new("no_extension")));
        assert!(!is_supported(Path::new("")));
    }

    #[test]
    fn into_request_uses_file_name() {
        let req = BatchInput::new("/data/in/report.pdf", b"abc".to_vec())
            .into_request()
            .expect("has source");
        assert_eq!(req.source_name, "report.pdf");
        assert_eq!(req.source_path, PathBuf::from("/data/in/report.pdf"));
        assert_eq!(req.source_bytes, b"abc");
    }

    #[test]
    fn missing_input_has_no_request() {
        assert!(BatchInput::missing(Some("x.pdf".into())).into_request().is_none());
        assert!(BatchInput::missing(None).into_request().is_none());
        let no_path = BatchInput {
            path: None,
            bytes: Some(vec![1, 2, 3]),
        };
        assert!(!no_path.has_source());
        assert!(no_path.into_request().is_none());
    }

    #[tokio::test]
    async fn read_inputs_keeps_slots_for_unreadable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("a.txt");
        std::fs::write(&good, b"hello").expect("write");
        let missing = dir.path().join("missing.pdf");
        let unsupported = dir.path().join("b.zip");
        std::fs::write(&unsupported, b"PK").expect("write");

        let inputs = read_inputs(&[good.clone(), missing.clone(), unsupported.clone()]).await;

        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].bytes.as_deref(), Some(&b"hello"[..]));
        assert!(!inputs[1].has_source());
        assert_eq!(inputs[1].path.as_deref(), Some(missing.as_path()));
        assert!(!inputs[2].has_source());
    }
}
