//! Tracing and panic reporting for applications built on Ripple.
//!
//! The engine itself only emits `tracing` events. Call [`init`] once at
//! startup to see them; the filter is read from `RUST_LOG` and falls back to
//! `info`. Repeated calls are no-ops.

use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use tracing_subscriber::fmt::{self, writer::MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const TRACING_PREFIX: &str = "[ripple] ";
const DEFAULT_FILTER: &str = "info";

// ============================================================================
// Global State
// ============================================================================

static PANIC_HOOK_INSTALLED: Once = Once::new();
static TRACING_INSTALLED: Once = Once::new();

// ============================================================================
// Installation
// ============================================================================

/// Installs both the tracing subscriber and the panic hook.
pub fn init() {
    install_tracing();
    install_panic_hook();
}

/// Installs a global `fmt` subscriber writing to stderr (idempotent).
///
/// If another global subscriber is already set, that one is left in place.
pub fn install_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let console = fmt::layer()
            .with_writer(PrefixedWriter)
            .with_ansi(false)
            .with_target(true)
            .with_filter(filter);

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            eprintln!("{TRACING_PREFIX}a global tracing subscriber is already installed");
        }
    });
}

/// Routes panics through `tracing` before the previous hook runs (idempotent).
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            report_panic(info);
            previous(info);
        }));
    });
}

// ============================================================================
// Panic Reporting
// ============================================================================

fn report_panic(info: &PanicHookInfo<'_>) {
    let message = panic_message(info.payload());
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_default();
    tracing::error!(target: "ripple::panic", message = %message, location = %location);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

// ============================================================================
// Console Output
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct PrefixedWriter;

impl<'a> MakeWriter<'a> for PrefixedWriter {
    type Writer = Prefixed<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        Prefixed::new(io::stderr())
    }
}

/// Writes [`TRACING_PREFIX`] before the first byte of each event.
#[derive(Debug)]
struct Prefixed<W> {
    inner: W,
    wrote_prefix: bool,
}

impl<W> Prefixed<W> {
    const fn new(inner: W) -> Self {
        Self {
            inner,
            wrote_prefix: false,
        }
    }
}

impl<W: Write> Write for Prefixed<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_prefix {
            self.inner.write_all(TRACING_PREFIX.as_bytes())?;
            self.wrote_prefix = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
