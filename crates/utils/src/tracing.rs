//! Logging setup and span helpers

use std::fmt::Display;
use tracing::{span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity count (`-v`, `-vv`, ...)
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing system.
///
/// `RUST_LOG` wins over `verbosity` when set. Events go to stderr in compact form.
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Span covering everything done for one task execution
pub fn task_span(task_id: &impl Display) -> Span {
    span!(Level::INFO, "task", task_id = %task_id)
}

/// Span for one resolver pass
pub fn resolver_span(name: &str, task_id: &impl Display) -> Span {
    span!(Level::DEBUG, "resolver", resolver = %name, task_id = %task_id)
}
