//! Property-based tests for micro-log.
//!
//! These tests verify universal properties across all inputs using proptest.

use micro_log::{LogLevel, Logger, LoggerConfig, RequestContext, RotatingFileWriter, RotationPolicy};
use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn emit(level: LogLevel, marker: &str) {
    match level {
        LogLevel::Debug => micro_log::debug!("{marker}"),
        LogLevel::Info => micro_log::info!("{marker}"),
        LogLevel::Warn => micro_log::warn!("{marker}"),
        LogLevel::Error => micro_log::error!("{marker}"),
        LogLevel::Fatal => micro_log::fatal!("{marker}"),
    }
}

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

// **Property 1: Level Filtering**
// *For any* minimum level, an event appears in the sink if and only if its
// level is at or above the minimum.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_level_filtering(min in any_level(), emitted in prop::collection::vec(any_level(), 1..8)) {
        let tmp = TempDir::new().unwrap();
        let config = LoggerConfig::new(tmp.path(), "prop").with_level(min);
        let (logger, dispatch) = Logger::build(&config).unwrap();

        let markers: Vec<(LogLevel, String)> = emitted
            .iter()
            .enumerate()
            .map(|(i, level)| (*level, format!("marker-{i}-{}", level.as_str())))
            .collect();

        tracing::dispatcher::with_default(&dispatch, || {
            for (level, marker) in &markers {
                emit(*level, marker);
            }
        });

        let path = logger.log_file().to_path_buf();
        drop(logger);
        let content = fs::read_to_string(path).unwrap();

        for (level, marker) in &markers {
            let written = content.lines().any(|l| l.ends_with(marker.as_str()));
            prop_assert_eq!(written, *level >= min, "{} at min {}", marker, min);
        }
    }
}

// **Property 2: Request Id Uniqueness**
// *For any* process name, contexts created in sequence never share an id.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_request_ids_distinct(name in "[a-z][a-z0-9-]{0,15}", count in 2usize..200) {
        let ids: HashSet<String> = (0..count)
            .map(|_| RequestContext::new(&name).id().to_string())
            .collect();
        prop_assert_eq!(ids.len(), count);
        let prefix = format!("{name}-");
        prop_assert!(ids.iter().all(|id| id.starts_with(&prefix)));
    }
}

// **Property 3: URL Round Trip**
// *For any* sequence of URLs, the context reports the last one written and
// its id never changes.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_set_url_round_trip(urls in prop::collection::vec("/[a-z0-9/_-]{0,30}", 1..10)) {
        let ctx = RequestContext::new("svc");
        let id = ctx.id().to_string();

        for url in &urls {
            ctx.set_url(url.clone());
            prop_assert_eq!(&ctx.url(), url);
        }
        prop_assert_eq!(ctx.id(), id.as_str());
    }
}

// **Property 4: Backup Count Bound**
// *For any* size limit and volume of writes, the number of backups never
// exceeds the configured maximum.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_rotation_bounds_backups(
        max_backups in 1usize..5,
        max_size in 64u64..512,
        lines in 10usize..80,
    ) {
        let tmp = TempDir::new().unwrap();
        let policy = RotationPolicy {
            max_size,
            max_age: None,
            max_backups,
        };
        let mut writer = RotatingFileWriter::open(tmp.path(), "prop", policy).unwrap();

        for i in 0..lines {
            writer
                .write_all(format!("line {i} with some padding to fill the file\n").as_bytes())
                .unwrap();
            prop_assert!(writer.backups().unwrap().len() <= max_backups);
        }
        prop_assert!(writer.size() <= max_size);
    }
}
