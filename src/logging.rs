// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Structured logging setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::{PipelineError, Result};

/// Install a stderr subscriber. `RUST_LOG` wins over `log_level`.
///
/// Calling this again once a global subscriber exists is a no-op.
pub fn init_logging(log_level: Option<&str>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|e| PipelineError::Logging(format!("invalid log filter: {}", e)))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);

    if Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!("logging initialized");
    }
    Ok(())
}

/// Times an operation and logs its duration at debug level when dropped
pub struct OperationTimer {
    operation: &'static str,
    start: std::time::Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: std::time::Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            tracing::debug!(
                operation = self.operation,
                duration_ms = self.elapsed_ms() as u64,
                "operation completed"
            );
        }
    }
}
