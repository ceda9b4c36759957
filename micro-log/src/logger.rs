//! Logger lifecycle: building the sink pipeline and installing it.

use crate::config::LoggerConfig;
use crate::context::RequestContext;
use crate::error::{LogError, LogResult};
use crate::format::LineFormat;
use crate::level::LogLevel;
use crate::request_id;
use crate::rotation::RotatingFileWriter;
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

/// Name of the background thread that writes to the log file.
const SINK_THREAD: &str = "micro-log-sink";

/// Whether a global logger has been installed.
///
/// Before that, events from the logging macros are discarded: no subscriber
/// exists, so nothing is formatted or written and nothing fails.
#[must_use]
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

/// Formatting layer writing lines at or above `level` to `writer`.
///
/// The logger uses this for its file and console outputs; it is public so
/// other sinks (test buffers, sockets) get byte-identical lines.
pub fn line_layer<W>(level: LogLevel, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(level.targets())
        .boxed()
}

/// Handle on a running logger.
///
/// Lines are handed to a background writer; dropping the handle flushes what
/// is pending and stops the writer, so keep it alive for as long as the
/// process logs.
#[derive(Debug)]
pub struct Logger {
    process_name: String,
    host: &'static str,
    log_file: PathBuf,
    level: LogLevel,
    _guard: WorkerGuard,
}

impl Logger {
    /// Build the sink pipeline without installing it.
    ///
    /// The returned [`Dispatch`] can be installed globally or used in a scope
    /// with [`tracing::dispatcher::with_default`].
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] if the configuration is invalid or the log file
    /// cannot be opened.
    pub fn build(config: &LoggerConfig) -> LogResult<(Self, Dispatch)> {
        config.validate()?;

        let sink = RotatingFileWriter::open(
            &config.output_dir,
            config.process_name.clone(),
            config.rotation_policy(),
        )?;
        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(true)
            .thread_name(SINK_THREAD)
            .finish(sink);

        let mut layers = vec![line_layer(config.level, writer)];
        if config.console {
            layers.push(line_layer(config.level, std::io::stdout));
        }
        let dispatch = Dispatch::new(tracing_subscriber::registry().with(layers));

        let logger = Self {
            process_name: config.process_name.clone(),
            host: request_id::local_host(),
            log_file: config.log_file(),
            level: config.level,
            _guard: guard,
        };
        Ok((logger, dispatch))
    }

    /// Build the pipeline and install it as the process-wide logger.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::AlreadyInitialized`] if a global logger exists, or
    /// the errors of [`Logger::build`].
    pub fn init(config: &LoggerConfig) -> LogResult<Self> {
        if is_initialized() {
            return Err(LogError::AlreadyInitialized);
        }

        let (logger, dispatch) = Self::build(config)?;
        tracing::dispatcher::set_global_default(dispatch)
            .map_err(|_| LogError::AlreadyInitialized)?;

        tracing::info!(
            process = %logger.process_name,
            file = %logger.log_file.display(),
            level = %logger.level,
            "logger initialized"
        );
        Ok(logger)
    }

    /// Start a request with a fresh id.
    #[must_use]
    pub fn new_request_context(&self) -> RequestContext {
        RequestContext::with_id(request_id::generate(&self.process_name, self.host))
    }

    /// Process name used in the file name and in request ids.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Path of the active log file.
    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Minimum level written.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn read_after_drop(logger: Logger) -> String {
        let path = logger.log_file().to_path_buf();
        drop(logger);
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_build_creates_log_file() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "orders");
        let (logger, _dispatch) = Logger::build(&config).unwrap();

        assert_eq!(logger.log_file(), tmp.path().join("orders.log"));
        assert!(logger.log_file().exists());
        assert_eq!(logger.process_name(), "orders");
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "");
        assert!(matches!(Logger::build(&config), Err(LogError::Config(_))));
    }

    #[test]
    fn test_level_filtering() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "svc").with_level(LogLevel::Info);
        let (logger, dispatch) = Logger::build(&config).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            crate::debug!("hidden X={}", 0);
            crate::info!("X={}", 1);
            crate::warn!("careful");
        });

        let content = read_after_drop(logger);
        assert!(!content.contains("hidden"));
        let line = content.lines().find(|l| l.contains("X=1")).unwrap();
        assert!(line.contains("\tINFO\t"));
        assert!(line.contains("<tid:"));
        assert!(content.lines().any(|l| l.contains("\tWARN\t") && l.contains("careful")));
    }

    #[test]
    fn test_fatal_level_only_writes_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "svc").with_level(LogLevel::Fatal);
        let (logger, dispatch) = Logger::build(&config).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            crate::error!("plain error");
            crate::fatal!("disk gone");
        });

        let content = read_after_drop(logger);
        assert!(!content.contains("plain error"));
        assert!(content.contains("\tFATAL\t"));
        assert!(content.contains("disk gone"));
    }

    #[test]
    fn test_context_fields_written() {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "svc").with_level(LogLevel::Debug);
        let (logger, dispatch) = Logger::build(&config).unwrap();
        let ctx = logger.new_request_context();
        ctx.set_url("/v1/pay");

        tracing::dispatcher::with_default(&dispatch, || {
            crate::info!(ctx: &ctx, "charged {} cents", 250);
            let _entered = ctx.span().entered();
            tracing::debug!(step = "settle", "inside span");
        });

        let content = read_after_drop(logger);
        let charged = content.lines().find(|l| l.contains("charged 250 cents")).unwrap();
        assert!(charged.contains(&format!("request_id={}", ctx.id())));
        assert!(charged.contains("request_url=/v1/pay"));

        let inside = content.lines().find(|l| l.contains("inside span")).unwrap();
        assert!(inside.contains(ctx.id()));
        assert!(inside.contains("step=\"settle\""));
    }

    #[test]
    fn test_span_fields_kept_above_info() {
        for level in [LogLevel::Warn, LogLevel::Error, LogLevel::Fatal] {
            let tmp = TempDir::new().unwrap();
            let config = LoggerConfig::new(tmp.path(), "svc").with_level(level);
            let (logger, dispatch) = Logger::build(&config).unwrap();
            let ctx = logger.new_request_context();
            ctx.set_url("/v1/refund");

            tracing::dispatcher::with_default(&dispatch, || {
                let _entered = ctx.span().entered();
                crate::info!("not written");
                crate::fatal!("upstream failed");
            });

            let content = read_after_drop(logger);
            assert!(!content.contains("not written"), "{level}");
            let line = content.lines().find(|l| l.contains("upstream failed")).unwrap();
            assert!(line.contains(&format!("request_id={}", ctx.id())), "{level}: {line}");
            assert!(line.contains("request_url=/v1/refund"), "{level}: {line}");
        }
    }

    #[test]
    fn test_new_request_context_uses_process_name() {
        let tmp = TempDir::new().unwrap();
        let (logger, _dispatch) = Logger::build(&LoggerConfig::new(tmp.path(), "billing")).unwrap();

        let a = logger.new_request_context();
        let b = logger.new_request_context();
        assert!(a.id().starts_with("billing-"));
        assert_ne!(a.id(), b.id());
    }
}
