//! Pipeline stages for converting one document through Docling Serve.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the network sits behind a single seam ([`transport`]).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ client ──▶ poll ──▶ validate
//! (paths)   (base64)   (HTTP)    (state)  (schema)
//! ```
//!
//! 1. [`input`]    : read caller paths into ordered [`input::BatchInput`]s
//! 2. [`encode`]   : base64-wrap the bytes into the submission body
//! 3. [`client`]   : submit / poll / fetch-result over a [`transport::Transport`]
//! 4. [`poll`]     : the per-job state machine and retry budget
//! 5. [`validate`] : accept or reject the converted payload

pub mod client;
pub mod encode;
pub mod input;
pub mod poll;
pub mod transport;
pub mod validate;
