// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging stack: a file layer under the log dir plus a stderr layer whose
//! level is reloadable at runtime.
//!
//! The stderr level starts from the `-D`/`-T` flags and can be adjusted by
//! any authorized client through the `LogLevel` request.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::protocol::LogLevels;

type StderrHandle = reload::Handle<LevelFilter, Registry>;

/// Shared handle on the stderr verbosity.
#[derive(Clone)]
pub struct StderrVerbosity {
    handle: Option<StderrHandle>,
    levels: Arc<Mutex<LogLevels>>,
}

impl StderrVerbosity {
    /// Handleless instance for tests, where the global subscriber is not
    /// ours to reload.
    pub fn disabled() -> Self {
        Self { handle: None, levels: Arc::new(Mutex::new(LogLevels { debug: 0, trace: 0 })) }
    }

    /// Apply new levels. Debug runs 0..=2 and trace 0..=3; anything else is
    /// rejected. Returns the newly effective levels.
    pub fn set_levels(&self, debug: i32, trace: i32) -> Option<LogLevels> {
        if !(0..=2).contains(&debug) || !(0..=3).contains(&trace) {
            return None;
        }
        if let Some(handle) = &self.handle {
            handle.reload(stderr_filter(debug as u8, trace as u8)).ok()?;
        }
        let levels = LogLevels { debug, trace };
        *self.levels.lock() = levels;
        Some(levels)
    }

    pub fn levels(&self) -> LogLevels {
        *self.levels.lock()
    }
}

fn stderr_filter(debug: u8, trace: u8) -> LevelFilter {
    if trace > 0 {
        LevelFilter::TRACE
    } else if debug > 0 {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Install the global subscriber. The returned guard flushes the file
/// appender and must live as long as the process.
pub fn init(log_dir: &Path, debug: u8, trace: u8) -> (StderrVerbosity, Option<WorkerGuard>) {
    let (stderr_level, handle) = reload::Layer::new(stderr_filter(debug, trace));
    let stderr_layer =
        fmt::layer().with_writer(std::io::stderr).with_target(false).with_filter(stderr_level);

    let mut guard = None;
    let file_layer = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(log_dir, "pwrd.log");
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            let filter = EnvFilter::try_from_env("PWRD_LOG")
                .unwrap_or_else(|_| EnvFilter::new("debug"));
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_filter(filter))
        }
        // No log dir; stderr still works.
        Err(_) => None,
    };

    // try_init: tests may already have a subscriber installed.
    let _ = tracing_subscriber::registry().with(stderr_layer).with(file_layer).try_init();

    let levels = LogLevels { debug: i32::from(debug.min(2)), trace: i32::from(trace.min(3)) };
    (StderrVerbosity { handle: Some(handle), levels: Arc::new(Mutex::new(levels)) }, guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
