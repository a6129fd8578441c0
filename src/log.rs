//! Structured logging for the checker and assembler (§7 "User-visible
//! behavior": every error is logged with category/module/level plus the
//! config object's source location).
//!
//! A reload-capable `EnvFilter` layer over `tracing-subscriber`'s fmt
//! layer, trimmed to what a one-shot checker binary needs: no
//! syslog/journald targets, no runtime reload handle, since
//! `named-checkconf` never changes its own log configuration mid-run.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::Diagnostic;

/// Install the default subscriber: `RUST_LOG`-controlled filter,
/// defaulting to `info`, writing to stderr so the checker's own
/// stdout stays free for machine-readable output if ever added.
///
/// ## Panics
///
/// Panics if a global [`tracing`] subscriber has been installed already.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(filter);
    tracing_subscriber::registry().with(fmt).init();
}

/// Emit one line per accumulated diagnostic (§7), `module` naming the
/// pass that produced it (e.g. `"validate"`, `"assemble"`) and
/// `category` the taxonomy kind already carried on the diagnostic.
pub fn report(module: &str, diagnostic: &Diagnostic) {
    if diagnostic.is_error() {
        tracing::error!(module, category = ?diagnostic.kind, "{diagnostic}");
    } else {
        tracing::warn!(module, category = ?diagnostic.kind, "{diagnostic}");
    }
}
