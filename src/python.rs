// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Python bindings for the host analytics application

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::aggregate::AggregationRequest;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PreparedTable};
use crate::redaction::CancellationToken;
use crate::table::{CellValue, RawRecord, RawTable};

fn to_py_err(err: PipelineError) -> PyErr {
    match err {
        PipelineError::Schema(_) | PipelineError::Config(_) | PipelineError::Pattern(_) => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Convert one Python cell: None, str and numbers map directly, anything
/// else (dates, timestamps) goes through `str()`.
fn cell_from_py(value: &Bound<'_, PyAny>) -> PyResult<CellValue> {
    if value.is_none() {
        return Ok(CellValue::Null);
    }
    if let Ok(text) = value.extract::<String>() {
        return Ok(CellValue::Text(text));
    }
    if let Ok(number) = value.extract::<f64>() {
        return Ok(CellValue::Number(number));
    }
    Ok(CellValue::Text(value.str()?.to_string()))
}

fn table_from_py(headers: Vec<String>, rows: &Bound<'_, PyList>) -> PyResult<RawTable> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let cells = row
            .try_iter()?
            .map(|cell| cell.and_then(|cell| cell_from_py(&cell)))
            .collect::<PyResult<Vec<_>>>()?;
        records.push(RawRecord::new(cells));
    }
    Ok(RawTable::new(headers, records))
}

/// Redaction and aggregation pipeline
///
/// # Example
///
/// ```python
/// from storyteller_core import StorytellerPipeline
///
/// pipeline = StorytellerPipeline({"time_bucket": "week", "top_n": 10})
/// pipeline.redact_text("Mail jane@example.com")  # ("Mail [EMAIL_REDACTED]", {...})
/// views = pipeline.run(headers, rows, '[{"kind": "category_tally"}]')
/// ```
#[pyclass]
pub struct StorytellerPipeline {
    pipeline: Pipeline,
    prepared: Option<PreparedTable>,
}

#[pymethods]
impl StorytellerPipeline {
    /// Create a pipeline from an optional config dict
    #[new]
    #[pyo3(signature = (config_dict=None))]
    pub fn new(config_dict: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let config = match config_dict {
            Some(dict) => PipelineConfig::from_py_dict(dict)
                .map_err(|e| PyValueError::new_err(format!("Invalid config: {}", e)))?,
            None => PipelineConfig::default(),
        };
        let pipeline = Pipeline::new(config).map_err(to_py_err)?;
        Ok(Self {
            pipeline,
            prepared: None,
        })
    }

    /// Build from a JSON configuration document
    #[staticmethod]
    pub fn from_json(config_json: &str) -> PyResult<Self> {
        let config = PipelineConfig::from_json_str(config_json).map_err(to_py_err)?;
        let pipeline = Pipeline::new(config).map_err(to_py_err)?;
        Ok(Self {
            pipeline,
            prepared: None,
        })
    }

    /// Redact a single string
    ///
    /// # Returns
    /// `(redacted_text, {"email": n, "phone": n, "credit_card": n, "name": n})`
    pub fn redact_text(&self, py: Python<'_>, text: &str) -> PyResult<(String, Py<PyAny>)> {
        let applied = self.pipeline.registry().apply(text);
        let counts = PyDict::new(py);
        counts.set_item("email", applied.counts.email)?;
        counts.set_item("phone", applied.counts.phone)?;
        counts.set_item("credit_card", applied.counts.credit_card)?;
        counts.set_item("name", applied.counts.name)?;
        Ok((applied.text.into_owned(), counts.into_any().unbind()))
    }

    /// Claimed spans as `[{"category": str, "start": int, "end": int}]`
    pub fn detect(&self, py: Python<'_>, text: &str) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for detection in self.pipeline.registry().detect(text) {
            let item = PyDict::new(py);
            item.set_item("category", detection.category.as_str())?;
            item.set_item("start", detection.start)?;
            item.set_item("end", detection.end)?;
            list.append(item)?;
        }
        Ok(list.into_any().unbind())
    }

    /// Resolve and redact a table, keeping it for later `aggregate` calls
    ///
    /// # Returns
    /// JSON audit record (run id, table shape, redaction counts)
    pub fn prepare(
        &mut self,
        py: Python<'_>,
        headers: Vec<String>,
        rows: &Bound<'_, PyList>,
    ) -> PyResult<String> {
        let table = table_from_py(headers, rows)?;
        let prepared = py
            .detach(|| self.pipeline.prepare(&table))
            .map_err(to_py_err)?;
        let audit = serde_json::to_string(&prepared.audit())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        self.prepared = Some(prepared);
        Ok(audit)
    }

    /// Compute one view over the prepared table; the request is JSON
    pub fn aggregate(&self, py: Python<'_>, request_json: &str) -> PyResult<String> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("call prepare() first"))?;
        let request: AggregationRequest = serde_json::from_str(request_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid request: {}", e)))?;
        py.detach(|| {
            self.pipeline
                .aggregate(prepared, &request)
                .and_then(|view| view.to_json())
        })
        .map_err(to_py_err)
    }

    /// Prepare and aggregate in one call; returns a JSON list of views
    pub fn run(
        &self,
        py: Python<'_>,
        headers: Vec<String>,
        rows: &Bound<'_, PyList>,
        requests_json: &str,
    ) -> PyResult<String> {
        let table = table_from_py(headers, rows)?;
        let requests: Vec<AggregationRequest> = serde_json::from_str(requests_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid requests: {}", e)))?;
        py.detach(|| -> crate::error::Result<String> {
            let (_, views) = self
                .pipeline
                .run(&table, &requests, &CancellationToken::new())?;
            Ok(serde_json::to_string(&views)?)
        })
        .map_err(to_py_err)
    }
}
