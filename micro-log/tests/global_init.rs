//! Process-wide logger installation.
//!
//! Kept in its own test binary because the global dispatcher can be set only
//! once per process.

use micro_log::{LogError, LogLevel, Logger, LoggerConfig, is_initialized};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_init_once_then_reject() {
    let tmp = TempDir::new().unwrap();
    let config = LoggerConfig::new(tmp.path(), "gateway").with_level(LogLevel::Debug);

    let logger = Logger::init(&config).unwrap();
    assert!(is_initialized());

    let ctx = logger.new_request_context();
    ctx.set_url("/v1/quote");
    micro_log::info!(ctx: &ctx, "quote priced at {}", 99);

    let second = Logger::init(&LoggerConfig::new(tmp.path(), "other"));
    assert!(matches!(second, Err(LogError::AlreadyInitialized)));
    assert!(!tmp.path().join("other.log").exists());

    let path = logger.log_file().to_path_buf();
    drop(logger);
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("logger initialized"));
    let line = content
        .lines()
        .find(|l| l.contains("quote priced at 99"))
        .unwrap();
    assert!(line.contains(ctx.id()));
    assert!(line.contains("request_url=/v1/quote"));
}
