//! Line formatter for the log sink.
//!
//! Lines are tab separated: timestamp, level, caller, thread tag, then the
//! span fields, the message and the event fields, e.g.
//! `2026-01-02 15:04:05.000 INFO src/handler.rs:42 <tid:7> request_id=r1 done`.
//! Formatting runs on the thread that emitted the event, so the thread tag
//! names the emitter even though the bytes reach disk on a worker thread.

use crate::level::FATAL_TARGET;
use chrono::Local;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static NEXT_THREAD_NUMBER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_NUMBER: u64 = NEXT_THREAD_NUMBER.fetch_add(1, Ordering::Relaxed);
}

/// Tag for the calling thread, `<tid:N>`.
///
/// `N` is assigned the first time a thread logs and stays fixed for the
/// thread's life. Empty if called while the thread is being torn down.
#[must_use]
pub fn thread_tag() -> String {
    THREAD_NUMBER
        .try_with(|n| format!("<tid:{n}>"))
        .unwrap_or_default()
}

/// Console-style event formatter used by every logger output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
        let meta = event.metadata();
        let level = if meta.target() == FATAL_TARGET {
            "FATAL"
        } else {
            meta.level().as_str()
        };

        write!(writer, "{}\t{level}\t", Local::now().format(TIME_FORMAT))?;
        match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => write!(writer, "{file}:{line}\t")?,
            _ => write!(writer, "{}\t", meta.target())?,
        }
        write!(writer, "{}\t", thread_tag())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{fields} ")?;
                    }
                }
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
