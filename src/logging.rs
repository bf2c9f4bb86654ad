//! Log output
//!
//! Every line is `[-] <UTC timestamp> <LEVEL>: <message>`. The filter defaults
//! to `info` and can be overridden with `RUST_LOG`.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Timestamp layout used in log lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Event formatter for runner log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerFormat;

impl<S, N> FormatEvent<S, N> for RunnerFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}", line_prefix(Utc::now(), *event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Prefix written before each message
pub fn line_prefix(at: DateTime<Utc>, level: Level) -> String {
    format!("[-] {} {}: ", at.format(TIMESTAMP_FORMAT), level)
}

/// Install the global subscriber writing to stdout
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(RunnerFormat)
        .with_writer(std::io::stdout)
        .try_init()
        .map_err(|e| Error::configuration(format!("Failed to install logger: {}", e)))
}
