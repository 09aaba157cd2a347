//! CLI binary for edgequake-docserve.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ServeConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docserve::{
    convert_paths, convert_to_dir, AcceptAllValidator, BatchProgressCallback, ProgressCallback, ServeConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// document. Documents complete out of order, so start times are keyed by
/// input index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            problems: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize, submitted: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {submitted} of {total} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_converted(&self, index: usize, name: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            name,
            dim(&format!("{secs:.1}s"))
        ));
        self.bar.inc(1);
    }

    fn on_document_skipped(&self, index: usize, name: &str, reason: &str) {
        let secs = self.elapsed_secs(index);
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            yellow("⚠"),
            name,
            yellow(reason),
            dim(&format!("{secs:.1}s"))
        ));
        self.bar.inc(1);
    }

    fn on_document_failed(&self, index: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.problems.fetch_add(1, Ordering::SeqCst);
        // Keep one line per document.
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(first_line),
            dim(&format!("{secs:.1}s"))
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, converted: usize) {
        self.bar.finish_and_clear();
        if self.problems.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} {} documents converted",
                green("✔"),
                bold(&converted.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents converted",
                if converted == 0 { red("✘") } else { cyan("⚠") },
                bold(&converted.to_string()),
                total
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two files, print a JSON array (null for skipped inputs)
  docserve --api-url http://localhost:5001 report.pdf slides.pptx

  # Write one <stem>.json per converted document
  docserve --api-url http://localhost:5001 -o out/ docs/*.pdf

  # Authenticated instance, four jobs at a time
  docserve --api-url https://docling.example.com -H "X-Api-Key=$KEY" -c 4 *.docx

  # Pass Docling options through (values are JSON)
  docserve --api-url http://localhost:5001 --option do_ocr=false \
           --option 'ocr_lang=["en","fr"]' scan.pdf

ENVIRONMENT VARIABLES:
  DOCSERVE_API_URL            Docling Serve address
  DOCSERVE_CONCURRENCY        Documents in flight at once
  DOCSERVE_MAX_POLL_RETRIES   Server-error polls tolerated per document
  RUST_LOG                    Override log filtering (e.g. edgequake_docserve=debug)
"#;

/// Convert documents to DoclingDocument JSON through a Docling Serve instance.
#[derive(Parser, Debug)]
#[command(
    name = "docserve",
    version,
    about = "Convert documents to DoclingDocument JSON through Docling Serve",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files (pdf, docx, pptx, html, md, images, …).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Docling Serve address, e.g. http://localhost:5001.
    #[arg(long, env = "DOCSERVE_API_URL")]
    api_url: String,

    /// API version path segment.
    #[arg(long, env = "DOCSERVE_API_VERSION", default_value = "v1alpha")]
    api_version: String,

    /// Maximum number of documents in flight at once.
    #[arg(short, long, env = "DOCSERVE_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Extra HTTP header, KEY=VALUE (repeatable).
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,

    /// Docling conversion option, KEY=JSON (repeatable). Non-JSON values are sent as strings.
    #[arg(long = "option", value_name = "KEY=JSON")]
    options: Vec<String>,

    /// Server-error status polls tolerated per document before it is skipped.
    #[arg(long, env = "DOCSERVE_MAX_POLL_RETRIES", default_value_t = 5)]
    max_poll_retries: u32,

    /// Delay between status polls in milliseconds.
    #[arg(long, env = "DOCSERVE_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "DOCSERVE_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Accept any JSON payload instead of checking the DoclingDocument envelope.
    #[arg(long)]
    skip_validation: bool,

    /// Write `<stem>.json` files to this directory instead of printing JSON.
    #[arg(short, long, env = "DOCSERVE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "DOCSERVE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSERVE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCSERVE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters; library INFO
    // logs would tear it apart.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref dir) = cli.output_dir {
        let stats = convert_to_dir(&cli.inputs, dir, &config)
            .await
            .context("Conversion failed")?;
        if !cli.quiet {
            eprintln!(
                "{} {}/{} documents written to {} ({} skipped, {} unreadable, {}ms)",
                if stats.converted == stats.total_inputs { green("✔") } else { yellow("⚠") },
                bold(&stats.converted.to_string()),
                stats.total_inputs,
                dir.display(),
                stats.skipped,
                stats.missing_inputs,
                stats.total_duration_ms
            );
        }
        return Ok(());
    }

    let output = convert_paths(&cli.inputs, &config)
        .await
        .context("Conversion failed")?;

    let json =
        serde_json::to_string_pretty(&output.documents).context("Failed to serialise output")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(json.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
        .context("Failed to write to stdout")?;

    if !cli.quiet {
        let stats = &output.stats;
        if !show_progress {
            eprintln!(
                "Converted {}/{} documents in {}ms",
                stats.converted, stats.total_inputs, stats.total_duration_ms
            );
        }
        for skipped in &output.skipped {
            let name = skipped
                .source_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("input #{}", skipped.index));
            eprintln!("  {} {}: {}", dim("skipped"), name, skipped.reason);
        }
    }

    Ok(())
}

/// Map CLI args to `ServeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ServeConfig> {
    let mut builder = ServeConfig::builder()
        .api_url(cli.api_url.clone())
        .api_version(cli.api_version.clone())
        .concurrency(cli.concurrency)
        .headers(parse_headers(&cli.headers)?)
        .options(parse_options(&cli.options)?)
        .max_poll_retries(cli.max_poll_retries)
        .poll_interval_ms(cli.poll_interval_ms)
        .request_timeout_secs(cli.timeout);

    if cli.skip_validation {
        builder = builder.validator(Arc::new(AcceptAllValidator));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse repeated `KEY=VALUE` header flags.
fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|h| {
            let (k, v) = h
                .split_once('=')
                .with_context(|| format!("Invalid header '{h}': expected KEY=VALUE"))?;
            let k = k.trim();
            if k.is_empty() {
                anyhow::bail!("Invalid header '{h}': empty name");
            }
            Ok((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Parse repeated `KEY=JSON` option flags. A value that is not valid JSON
/// is taken as a plain string, so `--option pdf_backend=dlparse_v4` works.
fn parse_options(raw: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for opt in raw {
        let (k, v) = opt
            .split_once('=')
            .with_context(|| format!("Invalid option '{opt}': expected KEY=JSON"))?;
        let k = k.trim();
        if k.is_empty() {
            anyhow::bail!("Invalid option '{opt}': empty key");
        }
        let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.to_string()));
        map.insert(k.to_string(), value);
    }
    Ok(map)
}
