//! Leveled logging macros.
//!
//! Each macro takes a format string and arguments, optionally preceded by
//! `ctx: &RequestContext` to attach the request id and URL:
//!
//! ```
//! # let ctx = micro_log::RequestContext::with_id("req-1");
//! micro_log::info!("cache warmed in {}ms", 12);
//! micro_log::warn!(ctx: &ctx, "retrying upstream {}", "billing");
//! ```

/// Emit a formatted event at `level`, with or without a request context.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    (target: $target:expr, $level:expr, ctx: $ctx:expr, $($arg:tt)+) => {{
        let __ctx: &$crate::RequestContext = $ctx;
        $crate::__private::tracing::event!(
            target: $target,
            $level,
            request_id = %__ctx.id(),
            request_url = %__ctx.url(),
            "{}",
            ::std::format_args!($($arg)+)
        )
    }};
    (target: $target:expr, $level:expr, $($arg:tt)+) => {
        $crate::__private::tracing::event!(target: $target, $level, "{}", ::std::format_args!($($arg)+))
    };
    ($level:expr, ctx: $ctx:expr, $($arg:tt)+) => {{
        let __ctx: &$crate::RequestContext = $ctx;
        $crate::__private::tracing::event!(
            $level,
            request_id = %__ctx.id(),
            request_url = %__ctx.url(),
            "{}",
            ::std::format_args!($($arg)+)
        )
    }};
    ($level:expr, $($arg:tt)+) => {
        $crate::__private::tracing::event!($level, "{}", ::std::format_args!($($arg)+))
    };
}

/// Log at debug level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log_event!($crate::__private::tracing::Level::DEBUG, $($arg)+) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log_event!($crate::__private::tracing::Level::INFO, $($arg)+) };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log_event!($crate::__private::tracing::Level::WARN, $($arg)+) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log_event!($crate::__private::tracing::Level::ERROR, $($arg)+) };
}

/// Log at fatal level. The process is not terminated.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::__log_event!(target: $crate::FATAL_TARGET, $crate::__private::tracing::Level::ERROR, $($arg)+)
    };
}
