//! One document's pipeline: submit → poll until terminal → fetch → validate.
//!
//! ## Polling Strategy
//!
//! Polls run at a fixed cadence with no backoff. How long a conversion takes
//! is up to the server (a 300-page scan can run for many minutes), so there
//! is no cap on total wait time either. The only thing bounded is tolerance
//! for infrastructure flakiness: every poll answered with a status code above
//! the retry threshold (a proxy 502, a 503 during a rolling restart) is
//! charged to a per-job [`RetryBudget`]. Once the budget is exceeded the
//! document is skipped and no further polls are sent.
//!
//! The budget is cumulative over the job's lifetime: a healthy poll between
//! two failures does not give the failures back.

use crate::error::{DocServeError, SkipReason};
use crate::output::{ConversionRequest, ConvertedDocument, JobOutcome};
use crate::pipeline::client::{Job, JobClient, PollReply, TaskStatus};
use crate::pipeline::validate::DocumentValidator;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Counter of server-error poll responses for a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    failures: u32,
    max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { failures: 0, max }
    }

    /// Charge one failure. Returns `true` once the budget is exceeded
    /// (`failures > max`).
    pub fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.failures > self.max
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Knobs of the poll loop, copied out of [`crate::config::ServeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_retries: u32,
}

/// How the poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Terminal(Job),
    Exhausted { failures: u32, last_status: u16 },
}

/// Poll `job` until it reaches a terminal status or the retry budget runs out.
///
/// A job that is already terminal (the submission answered `success`
/// directly) returns without a single poll.
pub async fn poll_until_terminal(
    client: &JobClient,
    mut job: Job,
    settings: PollSettings,
) -> Result<PollOutcome, DocServeError> {
    let mut budget = RetryBudget::new(settings.max_retries);

    while !job.status.is_terminal() {
        sleep(settings.interval).await;

        match client.poll(&job.id).await? {
            PollReply::Status(next) => {
                debug!("Job {}: {}", next.id, next.status);
                job = next;
            }
            PollReply::ServerError(status) => {
                if budget.record_failure() {
                    warn!(
                        "Job {}: status requests got HTTP {} too many times ({} failures), giving up",
                        job.id,
                        status,
                        budget.failures()
                    );
                    return Ok(PollOutcome::Exhausted {
                        failures: budget.failures(),
                        last_status: status,
                    });
                }
                debug!(
                    "Job {}: poll got HTTP {} ({}/{})",
                    job.id,
                    status,
                    budget.failures(),
                    settings.max_retries
                );
            }
        }
    }

    Ok(PollOutcome::Terminal(job))
}

/// Run the full pipeline for one document.
///
/// Always returns a [`JobOutcome`]: local failures become `Skipped`, fatal
/// ones `Failed`. Never propagates so one bad document cannot short-circuit
/// its siblings.
pub async fn run_pipeline(
    client: &JobClient,
    validator: &dyn DocumentValidator,
    request: ConversionRequest,
    settings: PollSettings,
) -> JobOutcome {
    let name = request.source_name.clone();
    match drive(client, validator, request, settings).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("'{}': {}", name, e);
            JobOutcome::Failed(e)
        }
    }
}

async fn drive(
    client: &JobClient,
    validator: &dyn DocumentValidator,
    request: ConversionRequest,
    settings: PollSettings,
) -> Result<JobOutcome, DocServeError> {
    let job = client.submit(&request).await?;

    let job = match poll_until_terminal(client, job, settings).await? {
        PollOutcome::Terminal(job) => job,
        PollOutcome::Exhausted {
            failures,
            last_status,
        } => {
            return Ok(JobOutcome::Skipped(SkipReason::PollRetriesExhausted {
                failures,
                last_status,
            }))
        }
    };

    if job.status == TaskStatus::Failure {
        warn!("'{}': job {} reported failure", request.source_name, job.id);
        return Ok(JobOutcome::Skipped(SkipReason::ServerReportedFailure));
    }

    let Some(payload) = client.fetch_result(&job.id).await? else {
        warn!("'{}': no JSON document found in the result", request.source_name);
        return Ok(JobOutcome::Skipped(SkipReason::MissingResultPayload));
    };

    match validator.validate(payload) {
        Ok(document) => Ok(JobOutcome::Converted(ConvertedDocument {
            document,
            source_path: request.source_path,
        })),
        Err(e) => {
            warn!("'{}': error validating the document: {}", request.source_name, e);
            Ok(JobOutcome::Skipped(SkipReason::ValidationFailed(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhausts_after_max_plus_one() {
        let mut budget = RetryBudget::new(5);
        for _ in 0..5 {
            assert!(!budget.record_failure());
        }
        assert!(budget.record_failure());
        assert_eq!(budget.failures(), 6);
    }

    #[test]
    fn zero_budget_gives_up_on_first_failure() {
        let mut budget = RetryBudget::new(0);
        assert!(!budget.is_exhausted());
        assert!(budget.record_failure());
    }

    #[test]
    fn budget_never_decreases() {
        let mut budget = RetryBudget::new(3);
        budget.record_failure();
        budget.record_failure();
        assert_eq!(budget.failures(), 2);
        assert!(!budget.is_exhausted());
        budget.record_failure();
        budget.record_failure();
        assert!(budget.is_exhausted());
    }
}
