// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Redaction and aggregation core for contact-center interaction analytics
// Optional PyO3 bindings behind the `python` feature

pub mod aggregate;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod logging;
pub mod pii_filter;
pub mod pipeline;
pub mod redaction;
pub mod schema;
pub mod table;

#[cfg(feature = "python")]
pub mod python;

pub use aggregate::{AggregationEngine, AggregationRequest, AggregationView, KeywordGroup};
pub use config::{AggregationConfig, KeywordSource, PipelineConfig, TimeBucket};
pub use error::{PatternError, PipelineError, Result, SchemaResolutionError};
pub use logging::init_logging;
pub use pii_filter::{PatternRegistry, PiiCategory, RedactionConfig};
pub use pipeline::{Pipeline, PreparedTable};
pub use redaction::{CancellationToken, RedactedTable, RedactionEngine, RedactionSummary};
pub use schema::{CanonicalSchema, ColumnResolver, SemanticField};
pub use table::{CellValue, RawRecord, RawTable};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module: storyteller_core
///
/// # Examples
///
/// ```python
/// from storyteller_core import StorytellerPipeline
///
/// pipeline = StorytellerPipeline({"detect_name": True})
/// text, counts = pipeline.redact_text("Dear John, call 555-123-4567")
/// print(text)  # "Dear [NAME_REDACTED], call [PHONE_REDACTED]"
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn storyteller_core(m: &Bound<'_, pyo3::types::PyModule>) -> PyResult<()> {
    m.add_class::<python::StorytellerPipeline>()?;

    // Module metadata
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add(
        "__doc__",
        "PII redaction and aggregation core for interaction analytics",
    )?;

    Ok(())
}
