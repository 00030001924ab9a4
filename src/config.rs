// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Pipeline configuration surface

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;
use crate::lexicon;
use crate::pii_filter::RedactionConfig;
use crate::schema::{ColumnAliases, SemanticField};

/// Time bucket granularity for rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Day,
    #[default]
    Week,
}

/// Which redacted text column feeds keyword and theme extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    /// Description, or the translation when the description is blank
    #[default]
    DescriptionWithFallback,
    Description,
    Translation,
    Both,
}

/// Share-of-total thresholds (percent) for severity levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 15.0,
            high: 8.0,
            medium: 4.0,
        }
    }
}

/// Bucket-over-bucket change thresholds (percent) for trend labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    pub spike: f64,
    pub up: f64,
    pub down: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            spike: 15.0,
            up: 5.0,
            down: -10.0,
        }
    }
}

/// One theme of the weighted phrase dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDefinition {
    pub name: String,
    pub phrases: Vec<(String, u32)>,
}

fn default_themes() -> Vec<ThemeDefinition> {
    lexicon::DEFAULT_THEMES
        .iter()
        .map(|(name, phrases)| ThemeDefinition {
            name: name.to_string(),
            phrases: phrases
                .iter()
                .map(|(phrase, weight)| (phrase.to_string(), *weight))
                .collect(),
        })
        .collect()
}

/// Options for the aggregation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub time_bucket: TimeBucket,
    pub category_weights: BTreeMap<String, f64>,
    pub stopwords: BTreeSet<String>,
    pub top_n: usize,
    pub keyword_source: KeywordSource,
    pub severity_thresholds: SeverityThresholds,
    pub trend_thresholds: TrendThresholds,
    pub themes: Vec<ThemeDefinition>,
    /// Rows per partition for partition-then-merge aggregation
    pub partition_rows: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            time_bucket: TimeBucket::Week,
            category_weights: BTreeMap::new(),
            stopwords: lexicon::DEFAULT_STOPWORDS.clone(),
            top_n: 20,
            keyword_source: KeywordSource::default(),
            severity_thresholds: SeverityThresholds::default(),
            trend_thresholds: TrendThresholds::default(),
            themes: default_themes(),
            partition_rows: 4096,
        }
    }
}

impl AggregationConfig {
    /// Weight for `category`, matched case-insensitively; 1.0 when unlisted
    pub fn category_weight(&self, category: &str) -> f64 {
        let wanted = category.trim().to_lowercase();
        self.category_weights
            .iter()
            .find(|(name, _)| name.trim().to_lowercase() == wanted)
            .map(|(_, weight)| *weight)
            .filter(|weight| weight.is_finite() && *weight >= 0.0)
            .unwrap_or(1.0)
    }
}

/// Full configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub text_fields: Vec<SemanticField>,
    pub aliases: ColumnAliases,
    pub redaction: RedactionConfig,
    pub aggregation: AggregationConfig,
    /// Minimum rows handed to one redaction task
    pub min_rows_per_task: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_fields: SemanticField::free_text_fields(),
            aliases: ColumnAliases::default(),
            redaction: RedactionConfig::default(),
            aggregation: AggregationConfig::default(),
            min_rows_per_task: 256,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    use super::{PipelineConfig, TimeBucket};
    use crate::schema::SemanticField;

    impl PipelineConfig {
        /// Extract configuration from Python dict
        pub fn from_py_dict(dict: &Bound<'_, PyDict>) -> PyResult<Self> {
            let mut config = Self::default();

            // Helper macro to extract plain values into a config path
            macro_rules! extract {
                ($key:literal => $($field:ident).+) => {
                    if let Some(value) = dict.get_item($key)? {
                        config.$($field).+ = value.extract()?;
                    }
                };
            }

            extract!("top_n" => aggregation.top_n);
            extract!("category_weights" => aggregation.category_weights);
            extract!("stopwords" => aggregation.stopwords);
            extract!("detect_email" => redaction.detect_email);
            extract!("detect_phone" => redaction.detect_phone);
            extract!("detect_credit_card" => redaction.detect_credit_card);
            extract!("detect_name" => redaction.detect_name);
            extract!("log_detections" => redaction.log_detections);

            if let Some(value) = dict.get_item("time_bucket")? {
                let bucket: String = value.extract()?;
                config.aggregation.time_bucket = match bucket.as_str() {
                    "day" => TimeBucket::Day,
                    "week" => TimeBucket::Week,
                    other => {
                        return Err(pyo3::exceptions::PyValueError::new_err(format!(
                            "Unknown time_bucket '{}'",
                            other
                        )))
                    }
                };
            }

            if let Some(value) = dict.get_item("text_fields")? {
                let names: Vec<String> = value.extract()?;
                config.text_fields = names
                    .iter()
                    .map(|name| {
                        SemanticField::parse(name).ok_or_else(|| {
                            pyo3::exceptions::PyValueError::new_err(format!(
                                "Unknown text field '{}'",
                                name
                            ))
                        })
                    })
                    .collect::<PyResult<Vec<_>>>()?;
            }

            Ok(config)
        }
    }
}
