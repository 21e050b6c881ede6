//! Logging setup
//!
//! Console output goes through `tracing_subscriber::fmt` with an
//! `EnvFilter` (`RUST_LOG` wins over the verbosity flag). Optionally every
//! event is also appended to a JSONL file per device and day:
//!
//! ```text
//! logs/
//! ├── 2026-10-14_kitchen.jsonl
//! └── 2026-10-14_phone.jsonl
//! ```
//!
//! ```bash
//! # Everything the synchronizer logged
//! jq 'select(.target | startswith("frigoflow_core::sync"))' logs/*.jsonl
//! ```

pub mod entry;
pub mod layer;

use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub use entry::LogRecord;
pub use layer::JsonlLayer;

/// Filter directive for a `-v` count
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// With `jsonl = Some((dir, device))` events are also written to
/// `dir/<date>_<device>.jsonl`.
pub fn init(verbose: u8, jsonl: Option<(&Path, &str)>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbose)));

    let file_layer = match jsonl {
        Some((dir, device)) => Some(JsonlLayer::new(dir, device)?),
        None => None,
    };
    let log_path = file_layer.as_ref().map(|layer| layer.log_path().to_path_buf());

    // A second init (tests, embedding) keeps the first subscriber.
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .is_ok();
    if let (true, Some(path)) = (installed, log_path) {
        tracing::debug!(path = %path.display(), "Writing JSONL log");
    }
    Ok(())
}
