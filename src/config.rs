//! Configuration types for batch conversion through Docling Serve.
//!
//! All conversion behaviour is controlled through [`ServeConfig`], built via
//! its [`ServeConfigBuilder`]. One struct per batch keeps every knob
//! shareable across the concurrent pipelines (it is cheap to clone: the
//! heavyweight collaborators sit behind `Arc`).
//!
//! # Option merging
//! Docling Serve accepts a free-form `options` object. The crate always sends
//! a fixed base set (see [`base_options`]); caller-supplied options are merged
//! on top key by key, so a caller can override e.g. `image_export_mode`
//! without restating the rest.

use crate::error::DocServeError;
use crate::pipeline::transport::Transport;
use crate::pipeline::validate::DocumentValidator;
use crate::progress::ProgressCallback;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a batch conversion.
///
/// # Example
/// ```rust
/// use edgequake_docserve::ServeConfig;
///
/// let config = ServeConfig::builder()
///     .api_url("http://localhost:5001")
///     .concurrency(4)
///     .header("Authorization", "Bearer token")
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url(), "http://localhost:5001/v1alpha");
/// ```
#[derive(Clone)]
pub struct ServeConfig {
    /// Address of the Docling Serve instance, e.g. `http://localhost:5001`. Required.
    pub api_url: String,

    /// API version path segment appended to `api_url`. Default: `v1alpha`.
    pub api_version: String,

    /// Maximum number of documents in flight at once. Default: 2.
    ///
    /// Each in-flight document holds a job slot on the server; Docling Serve
    /// instances are usually sized for a handful of concurrent conversions.
    pub concurrency: usize,

    /// Extra HTTP headers sent with every request (auth tokens, tenant ids).
    pub headers: BTreeMap<String, String>,

    /// Pass-through conversion options merged over [`base_options`].
    pub options: Map<String, Value>,

    /// How many status polls may fail with a server error before the
    /// document is skipped. Default: 5.
    ///
    /// The counter is cumulative over the lifetime of a job and is never
    /// reset by a successful poll in between.
    pub max_poll_retries: u32,

    /// Poll responses with a status code strictly above this value count
    /// against the retry budget. Default: 500.
    pub retry_status_threshold: u16,

    /// Fixed delay between status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds for the built-in HTTP transport. Default: 300.
    pub request_timeout_secs: u64,

    /// Pre-constructed transport. Takes precedence over the built-in `reqwest` one.
    pub transport: Option<Arc<dyn Transport>>,

    /// Payload validator. If None, uses [`crate::pipeline::validate::DoclingDocumentValidator`].
    pub validator: Option<Arc<dyn DocumentValidator>>,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_version: "v1alpha".to_string(),
            concurrency: 2,
            headers: BTreeMap::new(),
            options: Map::new(),
            max_poll_retries: 5,
            retry_status_threshold: 500,
            poll_interval_ms: 2000,
            request_timeout_secs: 300,
            transport: None,
            validator: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeConfig")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("concurrency", &self.concurrency)
            // Header values usually carry credentials.
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("max_poll_retries", &self.max_poll_retries)
            .field("retry_status_threshold", &self.retry_status_threshold)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn Transport>"))
            .field("validator", &self.validator.as_ref().map(|_| "<dyn DocumentValidator>"))
            .finish()
    }
}

impl ServeConfig {
    /// Create a new builder for `ServeConfig`.
    pub fn builder() -> ServeConfigBuilder {
        ServeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Versioned API root: `{api_url}/{api_version}`.
    pub fn base_url(&self) -> String {
        let root = self.api_url.trim_end_matches('/');
        let version = self.api_version.trim_matches('/');
        if version.is_empty() {
            root.to_string()
        } else {
            format!("{root}/{version}")
        }
    }

    /// The option object sent with every submission: [`base_options`]
    /// overridden by `self.options`.
    pub fn merged_options(&self) -> Map<String, Value> {
        let mut merged = base_options();
        for (key, value) in &self.options {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Options the crate always requests: JSON output with placeholder images,
/// returned inline rather than as a file.
pub fn base_options() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("to_formats".into(), json!(["json"]));
    map.insert("image_export_mode".into(), json!("placeholder"));
    map.insert("return_as_file".into(), json!(false));
    map
}

/// Builder for [`ServeConfig`].
pub struct ServeConfigBuilder {
    config: ServeConfig,
}

impl fmt::Debug for ServeConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ServeConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.config.headers.extend(headers);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.options.insert(key.into(), value);
        self
    }

    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.config.options.extend(options);
        self
    }

    pub fn max_poll_retries(mut self, n: u32) -> Self {
        self.config.max_poll_retries = n;
        self
    }

    pub fn retry_status_threshold(mut self, status: u16) -> Self {
        self.config.retry_status_threshold = status;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.config.validator = Some(validator);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServeConfig, DocServeError> {
        let c = &self.config;
        let url = c.api_url.trim();
        if url.is_empty() {
            return Err(DocServeError::InvalidConfig(
                "api_url is required (address of the Docling Serve instance)".into(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DocServeError::InvalidConfig(format!(
                "api_url must start with http:// or https://, got '{url}'"
            )));
        }
        if c.concurrency == 0 {
            return Err(DocServeError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
