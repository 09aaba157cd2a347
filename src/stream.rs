//! Streaming dispatcher: emit per-document outcomes as they complete.
//!
//! This is the concurrency limiter of the crate. Every input with a source
//! becomes one pipeline future (submit → poll → fetch → validate); at most
//! `config.concurrency` of them are driven at once through
//! [`StreamExt::buffer_unordered`], the rest wait their turn. Inputs without
//! a source are yielded first as [`SkipReason::NoInputPath`] and never
//! reach the server.
//!
//! Items arrive in **completion order** as `(input_index, JobOutcome)`.
//! [`crate::convert::convert_batch`] drains this stream into input-order
//! slots; use the stream directly to react to documents as soon as they
//! finish.
//!
//! Dropping the stream early cancels the pipelines still in flight. The
//! `convert_*` functions never do that: they always drain it.

use crate::config::ServeConfig;
use crate::error::{DocServeError, SkipReason};
use crate::output::JobOutcome;
use crate::pipeline::client::JobClient;
use crate::pipeline::input::BatchInput;
use crate::pipeline::poll::{self, PollSettings};
use crate::pipeline::transport::{HttpTransport, Transport};
use crate::pipeline::validate::{DocumentValidator, DoclingDocumentValidator};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of `(input_index, outcome)` pairs in completion order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = (usize, JobOutcome)> + Send>>;

/// Start converting `inputs`, streaming outcomes as they are ready.
///
/// Nothing is sent until the stream is polled.
///
/// # Errors
/// Only configuration problems (e.g. an invalid header for the built-in
/// transport). Per-document failures are items of the stream.
pub fn convert_stream(
    inputs: Vec<BatchInput>,
    config: &ServeConfig,
) -> Result<OutcomeStream, DocServeError> {
    let transport = resolve_transport(config)?;
    let validator = resolve_validator(config);
    let client = JobClient::new(
        transport,
        config.base_url(),
        config.merged_options(),
        config.retry_status_threshold,
    );
    // A zero written after `build()` would stall `buffer_unordered`.
    let concurrency = config.concurrency.max(1);
    let settings = PollSettings {
        interval: config.poll_interval(),
        max_retries: config.max_poll_retries,
    };

    let mut missing = Vec::new();
    let mut requests = Vec::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let name = input
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("input #{index}"));
        match input.into_request() {
            Some(request) => requests.push((index, request)),
            None => {
                debug!("{}: no readable source, not submitted", name);
                missing.push((index, name));
            }
        }
    }
    info!(
        "Dispatching {} documents to {} (concurrency {})",
        requests.len(),
        client.submit_url(),
        concurrency
    );

    let missing_progress = config.progress_callback.clone();
    let missing = stream::iter(missing).map(move |(index, name)| {
        let outcome = JobOutcome::Skipped(SkipReason::NoInputPath);
        if let Some(ref cb) = missing_progress {
            report(cb, index, &name, &outcome);
        }
        (index, outcome)
    });

    let progress = config.progress_callback.clone();
    let pipelines = stream::iter(requests.into_iter().map(move |(index, request)| {
        let client = client.clone();
        let validator = Arc::clone(&validator);
        let progress = progress.clone();
        async move {
            let name = request.source_name.clone();
            if let Some(ref cb) = progress {
                cb.on_document_start(index, &name);
            }
            let outcome = poll::run_pipeline(&client, &*validator, request, settings).await;
            if let Some(ref cb) = progress {
                report(cb, index, &name, &outcome);
            }
            (index, outcome)
        }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(missing.chain(pipelines)))
}

/// Use the injected transport, or build the default `reqwest` one.
fn resolve_transport(config: &ServeConfig) -> Result<Arc<dyn Transport>, DocServeError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    let transport = HttpTransport::new(&config.headers, config.request_timeout_secs)?;
    Ok(Arc::new(transport))
}

fn resolve_validator(config: &ServeConfig) -> Arc<dyn DocumentValidator> {
    match config.validator {
        Some(ref validator) => Arc::clone(validator),
        None => Arc::new(DoclingDocumentValidator),
    }
}

fn report(cb: &ProgressCallback, index: usize, name: &str, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Converted(_) => cb.on_document_converted(index, name),
        JobOutcome::Skipped(reason) => cb.on_document_skipped(index, name, &reason.to_string()),
        JobOutcome::Failed(e) => cb.on_document_failed(index, name, &e.to_string()),
    }
}
