//! Job client: the three Docling Serve endpoints a conversion goes through.
//!
//! ```text
//! POST {base}/convert/source/async   → { task_id, task_status }
//! GET  {base}/status/poll/{task_id}  → { task_id, task_status }
//! GET  {base}/result/{task_id}       → { document: { json_content, … } }
//! ```
//!
//! Only the fields that drive the job state machine are parsed; everything
//! else in the responses is ignored. Status-code policy lives here too:
//! non-2xx on submission or result fetch is fatal, while poll responses above
//! the retry threshold are handed back to the poll loop as
//! [`PollReply::ServerError`] so it can charge them to the retry budget.

use crate::error::DocServeError;
use crate::output::ConversionRequest;
use crate::pipeline::encode;
use crate::pipeline::transport::{HttpResponse, Transport};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Server-side state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failure,
}

impl TaskStatus {
    /// Map a wire token. Only `"success"` and `"failure"` are terminal;
    /// `"started"` and any token this crate does not know are treated as
    /// still running.
    pub fn from_wire(token: &str) -> Self {
        match token {
            "pending" => TaskStatus::Pending,
            "success" => TaskStatus::Success,
            "failure" => TaskStatus::Failure,
            _ => TaskStatus::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// A submitted conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: TaskStatus,
}

/// Classified answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReply {
    /// The server answered with a parsable task status.
    Status(Job),
    /// The status code exceeded the retry threshold; the body was not read.
    ServerError(u16),
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    task_id: String,
    task_status: String,
}

impl From<TaskBody> for Job {
    fn from(body: TaskBody) -> Self {
        Job {
            status: TaskStatus::from_wire(&body.task_status),
            id: body.task_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    document: ResultDocument,
}

#[derive(Debug, Deserialize)]
struct ResultDocument {
    #[serde(default)]
    json_content: Option<Value>,
}

/// Talks to one Docling Serve instance through a shared [`Transport`].
#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    options: Arc<Map<String, Value>>,
    retry_status_threshold: u16,
}

impl fmt::Debug for JobClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobClient")
            .field("base_url", &self.base_url)
            .field("retry_status_threshold", &self.retry_status_threshold)
            .finish()
    }
}

impl JobClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        options: Map<String, Value>,
        retry_status_threshold: u16,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            options: Arc::new(options),
            retry_status_threshold,
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/convert/source/async", self.base_url)
    }

    pub fn poll_url(&self, job_id: &str) -> String {
        format!("{}/status/poll/{}", self.base_url, job_id)
    }

    pub fn result_url(&self, job_id: &str) -> String {
        format!("{}/result/{}", self.base_url, job_id)
    }

    /// Submit one document. Any non-2xx answer is fatal; submissions are
    /// never retried.
    pub async fn submit(&self, request: &ConversionRequest) -> Result<Job, DocServeError> {
        let url = self.submit_url();
        let body = encode::submit_body(&request.source_bytes, &request.source_name, &self.options);
        let response = self.transport.post_json(&url, &body).await?;
        ensure_success(&url, &response)?;

        let job: Job = response.parse::<TaskBody>(&url)?.into();
        debug!("Submitted '{}' as job {} ({})", request.source_name, job.id, job.status);
        Ok(job)
    }

    /// Ask for the current status of `job_id`.
    pub async fn poll(&self, job_id: &str) -> Result<PollReply, DocServeError> {
        let url = self.poll_url(job_id);
        let response = self.transport.get(&url).await?;
        if response.status > self.retry_status_threshold {
            return Ok(PollReply::ServerError(response.status));
        }

        // Below the threshold the body must be a task status, whatever the
        // code; a 404 error page is a protocol violation, not a retry.
        let job: Job = response.parse::<TaskBody>(&url)?.into();
        Ok(PollReply::Status(job))
    }

    /// Fetch the converted payload of a successful job.
    ///
    /// Returns `Ok(None)` when the result carries no `document.json_content`
    /// (absent or null).
    pub async fn fetch_result(&self, job_id: &str) -> Result<Option<Value>, DocServeError> {
        let url = self.result_url(job_id);
        let response = self.transport.get(&url).await?;
        ensure_success(&url, &response)?;

        let body: ResultBody = response.parse(&url)?;
        Ok(body.document.json_content.filter(|v| !v.is_null()))
    }
}

fn ensure_success(url: &str, response: &HttpResponse) -> Result<(), DocServeError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(DocServeError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tokens() {
        assert_eq!(TaskStatus::from_wire("pending"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_wire("started"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_wire("running"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_wire("success"), TaskStatus::Success);
        assert_eq!(TaskStatus::from_wire("failure"), TaskStatus::Failure);
        assert_eq!(TaskStatus::from_wire("SUCCESS"), TaskStatus::Running);
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failure.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn result_body_tolerates_missing_json_content() {
        let body: ResultBody = serde_json::from_str(r#"{"document": {"md_content": "x"}}"#).unwrap();
        assert!(body.document.json_content.is_none());
    }

    #[test]
    fn result_body_requires_document() {
        assert!(serde_json::from_str::<ResultBody>(r#"{"status": "success"}"#).is_err());
    }
}
