//! Result collation: completion-order outcomes → input-order slots.
//!
//! Pipelines finish in whatever order the server gets to them. The collator
//! owns one slot per input, records each outcome at its original index
//! exactly once, and only produces the final list after every dispatched
//! pipeline has reported. Fatal errors are *held*, not returned on sight:
//! [`ResultSlots::finish`] surfaces the first one in input order, after the
//! whole batch has drained.

use crate::error::{DocServeError, SkipReason};
use crate::output::{BatchOutput, BatchStats, ConvertedDocument, JobOutcome, SkippedInput};
use std::path::PathBuf;
use tracing::error;

#[derive(Debug)]
enum Slot {
    NotStarted,
    Done(JobOutcome),
}

/// Index-aligned outcome storage for one batch.
#[derive(Debug)]
pub struct ResultSlots {
    slots: Vec<Slot>,
    paths: Vec<Option<PathBuf>>,
}

impl ResultSlots {
    /// Seed one "not started" slot per input. `paths` are the input paths in
    /// order, used to report skipped inputs.
    pub fn new(paths: Vec<Option<PathBuf>>) -> Self {
        Self {
            slots: paths.iter().map(|_| Slot::NotStarted).collect(),
            paths,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record the outcome of the input at `index`. A second write to the
    /// same slot, or an out-of-range index, is logged and ignored.
    pub fn record(&mut self, index: usize, outcome: JobOutcome) {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot @ Slot::NotStarted) => *slot = Slot::Done(outcome),
            Some(Slot::Done(_)) => {
                error!("Outcome for input {} recorded twice; keeping the first", index);
            }
            None => {
                error!("Outcome for input {} is out of range ({} inputs)", index, len);
            }
        }
    }

    /// Number of slots that have received an outcome.
    pub fn completed(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Done(_)))
            .count()
    }

    /// Produce the ordered output, or the first fatal error in input order.
    ///
    /// Slots never written (should not happen once the dispatcher has
    /// drained) are reported as [`SkipReason::NoInputPath`].
    pub fn finish(self, total_duration_ms: u64) -> Result<BatchOutput, DocServeError> {
        let total_inputs = self.slots.len();
        let mut documents: Vec<Option<ConvertedDocument>> = Vec::with_capacity(total_inputs);
        let mut skipped = Vec::new();
        let mut stats = BatchStats {
            total_inputs,
            total_duration_ms,
            ..BatchStats::default()
        };

        for (index, (slot, source_path)) in self.slots.into_iter().zip(self.paths).enumerate() {
            let outcome = match slot {
                Slot::Done(outcome) => outcome,
                Slot::NotStarted => JobOutcome::Skipped(SkipReason::NoInputPath),
            };
            match outcome {
                JobOutcome::Converted(doc) => {
                    stats.converted += 1;
                    documents.push(Some(doc));
                }
                JobOutcome::Skipped(reason) => {
                    if reason == SkipReason::NoInputPath {
                        stats.missing_inputs += 1;
                    } else {
                        stats.skipped += 1;
                    }
                    skipped.push(SkippedInput {
                        index,
                        source_path,
                        reason,
                    });
                    documents.push(None);
                }
                JobOutcome::Failed(e) => return Err(e),
            }
        }

        Ok(BatchOutput {
            documents,
            skipped,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn converted(path: &str) -> JobOutcome {
        JobOutcome::Converted(ConvertedDocument {
            document: json!({"name": path}),
            source_path: PathBuf::from(path),
        })
    }

    fn paths(names: &[&str]) -> Vec<Option<PathBuf>> {
        names.iter().map(|n| Some(PathBuf::from(n))).collect()
    }

    #[test]
    fn out_of_order_completion_keeps_input_order() {
        let mut slots = ResultSlots::new(paths(&["a", "b", "c"]));
        slots.record(2, converted("c"));
        slots.record(0, converted("a"));
        slots.record(1, JobOutcome::Skipped(SkipReason::MissingResultPayload));
        assert_eq!(slots.completed(), 3);

        let out = slots.finish(10).expect("no fatal error");
        assert_eq!(out.documents.len(), 3);
        assert_eq!(out.documents[0].as_ref().unwrap().source_path, PathBuf::from("a"));
        assert!(out.documents[1].is_none());
        assert_eq!(out.documents[2].as_ref().unwrap().source_path, PathBuf::from("c"));
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].index, 1);
        assert_eq!(out.stats.converted, 2);
        assert_eq!(out.stats.skipped, 1);
        assert_eq!(out.stats.missing_inputs, 0);
    }

    #[test]
    fn first_write_wins() {
        let mut slots = ResultSlots::new(paths(&["a"]));
        slots.record(0, converted("a"));
        slots.record(0, JobOutcome::Skipped(SkipReason::ServerReportedFailure));
        slots.record(7, converted("zzz"));
        let out = slots.finish(0).unwrap();
        assert!(out.documents[0].is_some());
    }

    #[test]
    fn first_error_in_input_order_is_returned() {
        let mut slots = ResultSlots::new(paths(&["a", "b", "c"]));
        slots.record(
            2,
            JobOutcome::Failed(DocServeError::HttpStatus {
                url: "late".into(),
                status: 500,
            }),
        );
        slots.record(
            1,
            JobOutcome::Failed(DocServeError::HttpStatus {
                url: "early".into(),
                status: 401,
            }),
        );
        slots.record(0, converted("a"));

        match slots.finish(0) {
            Err(DocServeError::HttpStatus { url, status }) => {
                assert_eq!(url, "early");
                assert_eq!(status, 401);
            }
            other => panic!("expected HttpStatus error, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch() {
        let slots = ResultSlots::new(vec![]);
        assert!(slots.is_empty());
        let out = slots.finish(0).unwrap();
        assert!(out.documents.is_empty());
        assert_eq!(out.stats, BatchStats::default());
    }

    #[test]
    fn missing_inputs_are_counted_separately() {
        let mut slots = ResultSlots::new(vec![None, Some(PathBuf::from("b"))]);
        slots.record(0, JobOutcome::Skipped(SkipReason::NoInputPath));
        slots.record(1, converted("b"));
        let out = slots.finish(0).unwrap();
        assert_eq!(out.stats.missing_inputs, 1);
        assert_eq!(out.stats.skipped, 0);
        assert_eq!(out.skipped[0].source_path, None);
    }
}
