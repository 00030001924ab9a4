// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error types for the redaction and aggregation pipeline

use thiserror::Error;

use crate::schema::SemanticField;

/// Structural failure while mapping raw columns to the canonical schema.
///
/// Always fatal: the pipeline stops before any redaction or aggregation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaResolutionError {
    #[error(
        "required column {field} expected at position {position}, \
         but the table only has {column_count} columns"
    )]
    MissingColumn {
        field: SemanticField,
        position: usize,
        column_count: usize,
    },

    #[error("column for {field} is ambiguous, matching headers: {matches:?}")]
    AmbiguousColumn {
        field: SemanticField,
        matches: Vec<String>,
    },
}

/// Failure while compiling the pattern registry.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("failed to compile pattern '{pattern}': {source}")]
    Compile {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to compile pattern set: {0}")]
    Set(#[source] regex::Error),
}

/// Top-level error for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("pipeline run was cancelled")]
    Cancelled,
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
