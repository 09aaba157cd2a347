//! # edgequake-docserve
//!
//! Convert batches of documents (PDF, DOCX, PPTX, HTML, images…) into
//! structured `DoclingDocument` JSON through a remote
//! [Docling Serve](https://github.com/docling-project/docling-serve) instance.
//!
//! ## Why this crate?
//!
//! Docling Serve converts one document per asynchronous job: submit, poll
//! until done, fetch the result. Doing that for a whole folder means
//! juggling many jobs at once without drowning the server, riding out the
//! occasional 502 from a proxy, and putting results back in the order the
//! caller asked for. This crate does exactly that orchestration and nothing
//! else.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inputs (ordered)
//!  │
//!  ├─ 1. Input     paths → bytes; unreadable inputs keep an empty slot
//!  ├─ 2. Encode    bytes → base64 `file_sources` submission body
//!  ├─ 3. Submit    POST /convert/source/async            (≤ N in flight)
//!  ├─ 4. Poll      GET /status/poll/{id} every 2 s, bounded 5xx budget
//!  ├─ 5. Fetch     GET /result/{id} → document.json_content
//!  ├─ 6. Validate  DoclingDocument envelope check
//!  └─ 7. Collate   one slot per input, input order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docserve::{convert_batch, BatchInput, ServeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServeConfig::builder()
//!         .api_url("http://localhost:5001")
//!         .concurrency(4)
//!         .build()?;
//!
//!     let inputs = vec![
//!         BatchInput::new("report.pdf", std::fs::read("report.pdf")?),
//!         BatchInput::new("slides.pptx", std::fs::read("slides.pptx")?),
//!     ];
//!     for (i, slot) in convert_batch(inputs, &config).await?.iter().enumerate() {
//!         match slot {
//!             Some(doc) => println!("#{i}: {}", doc.source_path.display()),
//!             None => println!("#{i}: skipped"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docserve` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docserve = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod collate;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{base_options, ServeConfig, ServeConfigBuilder};
pub use convert::{convert_batch, convert_batch_detailed, convert_batch_sync, convert_paths, convert_to_dir};
pub use error::{DocServeError, SkipReason, ValidationError};
pub use output::{BatchOutput, BatchStats, ConversionRequest, ConvertedDocument, JobOutcome, SkippedInput};
pub use pipeline::input::{read_inputs, BatchInput, SUPPORTED_EXTENSIONS};
pub use pipeline::transport::{HttpResponse, HttpTransport, Transport};
pub use pipeline::validate::{AcceptAllValidator, DoclingDocumentValidator, DocumentValidator};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, OutcomeStream};
