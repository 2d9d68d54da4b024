// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Logging setup
//!
//! Nothing is configured on import. The binary calls [`init`] once; library
//! users install whatever subscriber they like.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::{FlowError, FlowResult};

/// Filter used for `--verbose` when `RUST_LOG` is unset
pub const VERBOSE_FILTER: &str = "flowdef=debug";

/// Filter directive for the console and file layers
fn directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        VERBOSE_FILTER.to_string()
    } else {
        config.filter.clone()
    }
}

/// Install the global subscriber.
///
/// Console output goes to stderr so command output on stdout stays clean.
/// When `config.file` is set, events are also written there as JSON lines;
/// keep the returned guard alive until exit so the file gets flushed.
pub fn init(config: &LoggingConfig, verbose: bool) -> FlowResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(config, verbose)));

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| FlowError::Config {
                message: format!("log file '{}' has no file name", path.display()),
            })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            std::fs::create_dir_all(dir).map_err(|e| FlowError::FileWrite {
                path: dir.to_path_buf(),
                error: e.to_string(),
            })?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| FlowError::Config {
            message: format!("failed to install logger: {}", e),
        })?;

    Ok(guard)
}
