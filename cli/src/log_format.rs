//! Plain-text event formatter that tags each line with the session it belongs to.
//!
//! Used by `logging::init()`. Lines logged inside the `session` span (and its children,
//! such as the keepalive task) start with `session_id=<root span id>` and the innermost
//! span name, so one session's lines can be grepped out of a shared log file.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Output format:
/// `TIMESTAMP session_id=ID span=NAME LEVEL target: fields` inside a span, otherwise
/// `TIMESTAMP LEVEL target: fields`.
#[derive(Default)]
pub struct SessionLineFormat {
    timer: SystemTime,
}

impl SessionLineFormat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, N> FormatEvent<S, N> for SessionLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        if let Some(span) = ctx.parent_span() {
            let root_id = span
                .scope()
                .from_root()
                .next()
                .map(|root| root.id().into_u64())
                .unwrap_or_else(|| span.id().into_u64());
            write!(writer, " session_id={} span={}", root_id, span.name())?;
        }

        let meta = event.metadata();
        write!(writer, " {} {}: ", meta.level(), meta.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
