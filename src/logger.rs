// src/logger.rs
// =============================================================================
// Logger setup.
//
// We log through the `log` facade everywhere and use `env_logger` as the
// backend. RUST_LOG is read first and the --log-level flag overrides it, so
// `RUST_LOG=flink_check=debug` still works for quick debugging.
//
// Output format (one line per record):
//   2026-10-18 09:30:00 [INFO] [direct] reached https://a.example/ in 0.42s
// =============================================================================

use std::io::Write;

use anyhow::{Context, Result};
use log::LevelFilter;

// Dependencies are chatty at debug level; keep them quiet unless asked,
// and never louder than the requested level
const DEPENDENCY_CAPS: &[(&str, LevelFilter)] = &[
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("rustls", LevelFilter::Warn),
    ("html5ever", LevelFilter::Error),
    ("selectors", LevelFilter::Warn),
];

pub fn init_logger(level: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    apply_filters(&mut builder, level);

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    // try_init so tests that call this more than once do not panic
    builder.try_init().context("failed to initialise logger")?;
    Ok(())
}

fn apply_filters(builder: &mut env_logger::Builder, level: LevelFilter) {
    builder.filter_level(level);
    for (module, cap) in DEPENDENCY_CAPS {
        builder.filter_module(module, level.min(*cap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(logger: &env_logger::Logger, target: &str, level: log::Level) -> bool {
        let metadata = log::Metadata::builder().target(target).level(level).build();
        log::Log::enabled(logger, &metadata)
    }

    fn logger_at(level: LevelFilter) -> env_logger::Logger {
        let mut builder = env_logger::Builder::new();
        apply_filters(&mut builder, level);
        builder.build()
    }

    #[test]
    fn test_dependencies_never_louder_than_requested() {
        let logger = logger_at(LevelFilter::Warn);
        assert_eq!(logger.filter(), LevelFilter::Warn);
        assert!(!enabled(&logger, "reqwest::connect", log::Level::Info));
        assert!(enabled(&logger, "flink_check::pipeline", log::Level::Warn));
        assert!(!enabled(&logger, "flink_check::pipeline", log::Level::Info));
    }

    #[test]
    fn test_dependencies_stay_quiet_at_debug() {
        let logger = logger_at(LevelFilter::Debug);
        assert!(enabled(&logger, "flink_check::checker", log::Level::Debug));
        assert!(!enabled(&logger, "hyper::proto", log::Level::Debug));
        assert!(enabled(&logger, "hyper::proto", log::Level::Info));
        assert!(!enabled(&logger, "html5ever::tree_builder", log::Level::Warn));
    }

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let _ = init_logger(LevelFilter::Warn);
        assert!(init_logger(LevelFilter::Warn).is_err());
    }
}
