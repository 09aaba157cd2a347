//! Eager (whole-batch) conversion entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: wait for every document, then
//! return one slot per input in input order. Use
//! [`crate::stream::convert_stream`] instead when you want documents as soon
//! as they finish.
//!
//! ## Error contract
//!
//! A fatal error in one document (transport failure, non-2xx on submission
//! or result fetch, protocol violation) does **not** cut the batch short.
//! Every document already dispatched runs to completion, so no request is
//! abandoned mid-flight; only then is the first fatal error, in input
//! order, returned. Local failures (poll retries exhausted, missing payload,
//! validation) just leave their slot empty.

use crate::collate::ResultSlots;
use crate::config::ServeConfig;
use crate::error::DocServeError;
use crate::output::{BatchOutput, BatchStats, ConvertedDocument};
use crate::pipeline::input::{self, BatchInput};
use crate::stream::convert_stream;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a batch of documents through Docling Serve.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// Exactly one entry per input, in input order: `Some` for each converted
/// document, `None` for inputs without a source or documents that were
/// skipped.
///
/// # Errors
/// Returns the first fatal error (in input order) after every dispatched
/// document has finished.
pub async fn convert_batch(
    inputs: Vec<BatchInput>,
    config: &ServeConfig,
) -> Result<Vec<Option<ConvertedDocument>>, DocServeError> {
    Ok(convert_batch_detailed(inputs, config).await?.documents)
}

/// Like [`convert_batch`], also reporting why each empty slot is empty and
/// aggregate stats.
pub async fn convert_batch_detailed(
    inputs: Vec<BatchInput>,
    config: &ServeConfig,
) -> Result<BatchOutput, DocServeError> {
    let start = Instant::now();
    let total = inputs.len();
    let submitted = inputs.iter().filter(|i| i.has_source()).count();
    let mut slots = ResultSlots::new(inputs.iter().map(|i| i.path.clone()).collect());

    let mut outcomes = convert_stream(inputs, config)?;
    info!(
        "Starting batch: {} inputs, {} to convert",
        total, submitted
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total, submitted);
    }

    // Drain everything, even after a fatal outcome.
    let mut converted = 0;
    while let Some((index, outcome)) = outcomes.next().await {
        if outcome.is_converted() {
            converted += 1;
        }
        slots.record(index, outcome);
    }

    debug_assert_eq!(slots.completed(), slots.len(), "every input must report an outcome");
    debug!("Collated {}/{} outcomes", slots.completed(), slots.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, converted);
    }

    let output = slots
        .finish(start.elapsed().as_millis() as u64)
        .inspect_err(|e| warn!("Batch aborted: {}", e))?;

    info!(
        "Batch complete: {}/{} converted, {} skipped, {} without source, {}ms",
        output.stats.converted,
        output.stats.total_inputs,
        output.stats.skipped,
        output.stats.missing_inputs,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Synchronous wrapper around [`convert_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_batch_sync(
    inputs: Vec<BatchInput>,
    config: &ServeConfig,
) -> Result<Vec<Option<ConvertedDocument>>, DocServeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocServeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_batch(inputs, config))
}

/// Read files from disk and convert them.
///
/// Missing, unreadable or unsupported files keep their slot and come back as
/// `None` (see [`input::read_inputs`]).
pub async fn convert_paths<P: AsRef<Path>>(
    paths: &[P],
    config: &ServeConfig,
) -> Result<BatchOutput, DocServeError> {
    let inputs = input::read_inputs(paths).await;
    convert_batch_detailed(inputs, config).await
}

/// Convert files and write each converted document to
/// `output_dir/<stem>.json`.
///
/// Uses atomic writes (temp file + rename) to prevent partial files. Two
/// inputs with the same stem get `-<index>` appended to the later one.
pub async fn convert_to_dir<P: AsRef<Path>>(
    paths: &[P],
    output_dir: impl AsRef<Path>,
    config: &ServeConfig,
) -> Result<BatchStats, DocServeError> {
    let output = convert_paths(paths, config).await?;
    let dir = output_dir.as_ref();

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DocServeError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut used = HashSet::new();
    for (index, doc) in output.documents.iter().enumerate() {
        let Some(doc) = doc else { continue };
        let path = dir.join(output_file_name(&doc.source_path, index, &mut used));
        let json = serde_json::to_vec_pretty(&doc.document)
            .map_err(|e| DocServeError::Internal(format!("Failed to serialise document: {e}")))?;
        write_atomic(&path, &json).await?;
        info!("Wrote {}", path.display());
    }

    Ok(output.stats)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// `<stem>.json`, made unique within one batch: `<stem>-<index>.json`, then
/// `<stem>-<index>-<n>.json` while the name is still taken.
fn output_file_name(source: &Path, index: usize, used: &mut HashSet<String>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    let mut name = format!("{stem}.json");
    let mut n = 0;
    while !used.insert(name.clone()) {
        name = if n == 0 {
            format!("{stem}-{index}.json")
        } else {
            format!("{stem}-{index}-{n}.json")
        };
        n += 1;
    }
    name
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DocServeError> {
    let tmp_path: PathBuf = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| DocServeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| DocServeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_are_unique_per_batch() {
        let mut used = HashSet::new();
        assert_eq!(output_file_name(Path::new("/a/report.pdf"), 0, &mut used), "report.json");
        assert_eq!(output_file_name(Path::new("/b/report.docx"), 3, &mut used), "report-3.json");
        assert_eq!(output_file_name(Path::new("/a/other.md"), 4, &mut used), "other.json");
    }

    #[test]
    fn suffixed_name_never_reuses_a_taken_name() {
        let mut used = HashSet::new();
        let names = [
            output_file_name(Path::new("/x/report-3.pdf"), 0, &mut used),
            output_file_name(Path::new("/x/report.pdf"), 1, &mut used),
            output_file_name(Path::new("/y/report.docx"), 3, &mut used),
            output_file_name(Path::new("/z/report.html"), 3, &mut used),
        ];
        assert_eq!(names, ["report-3.json", "report.json", "report-3-1.json", "report-3-2.json"]);
    }

    #[test]
    fn output_name_falls_back_for_empty_stem() {
        let mut used = HashSet::new();
        assert_eq!(output_file_name(Path::new("/"), 0, &mut used), "document.json");
    }
}
