//! Data types flowing in and out of a batch conversion.

use crate::error::{DocServeError, SkipReason};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A single document ready for submission. Consumed by exactly one pipeline.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source_bytes: Vec<u8>,
    /// File name sent to the server (`file_sources[].filename`).
    pub source_name: String,
    pub source_path: PathBuf,
}

/// A successfully converted and validated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedDocument {
    /// The structured document (`document.json_content` from the result).
    pub document: Value,
    /// Path of the input the document was converted from.
    pub source_path: PathBuf,
}

/// Terminal result of one pipeline.
#[derive(Debug)]
pub enum JobOutcome {
    Converted(ConvertedDocument),
    /// Recovered locally; the slot stays empty and the batch continues.
    Skipped(SkipReason),
    /// Fatal; aborts the batch once every dispatched pipeline has finished.
    Failed(DocServeError),
}

impl JobOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, JobOutcome::Converted(_))
    }
}

/// An input that produced no document, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedInput {
    /// Position of the input in the batch.
    pub index: usize,
    pub source_path: Option<PathBuf>,
    pub reason: SkipReason,
}

/// Aggregate counters for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_inputs: usize,
    pub converted: usize,
    /// Inputs that were submitted but ended without a document.
    pub skipped: usize,
    /// Inputs that were never submitted because they had no source.
    pub missing_inputs: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch produced, slot-aligned with the inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per input, in input order. `None` for every input that did
    /// not yield a converted document.
    pub documents: Vec<Option<ConvertedDocument>>,
    /// The non-converted inputs, in input order.
    pub skipped: Vec<SkippedInput>,
    pub stats: BatchStats,
}
