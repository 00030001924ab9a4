// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Column resolution: raw headers/positions to the canonical schema

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaResolutionError;

/// Semantic fields the rest of the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    QueueName,
    Timestamp,
    Description,
    Partner,
    Country,
    DescriptionTranslation,
    Category,
    SubCategory,
}

impl SemanticField {
    /// Fields resolved by position, in ascending position order
    pub const FIXED: [(SemanticField, usize); 6] = [
        (SemanticField::QueueName, 0),
        (SemanticField::Timestamp, 9),
        (SemanticField::Description, 12),
        (SemanticField::Partner, 18),
        (SemanticField::Country, 20),
        (SemanticField::DescriptionTranslation, 21),
    ];

    pub const ALL: [SemanticField; 8] = [
        SemanticField::QueueName,
        SemanticField::Timestamp,
        SemanticField::Description,
        SemanticField::Partner,
        SemanticField::Country,
        SemanticField::DescriptionTranslation,
        SemanticField::Category,
        SemanticField::SubCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::QueueName => "queue_name",
            SemanticField::Timestamp => "timestamp",
            SemanticField::Description => "description",
            SemanticField::Partner => "partner",
            SemanticField::Country => "country",
            SemanticField::DescriptionTranslation => "description_translation",
            SemanticField::Category => "category",
            SemanticField::SubCategory => "sub_category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue_name" | "queue" => Some(SemanticField::QueueName),
            "timestamp" | "date" => Some(SemanticField::Timestamp),
            "description" => Some(SemanticField::Description),
            "partner" => Some(SemanticField::Partner),
            "country" => Some(SemanticField::Country),
            "description_translation" | "description_translated" => {
                Some(SemanticField::DescriptionTranslation)
            }
            "category" => Some(SemanticField::Category),
            "sub_category" | "subcategory" => Some(SemanticField::SubCategory),
            _ => None,
        }
    }

    /// Free-text fields eligible for redaction by default
    pub fn is_free_text(&self) -> bool {
        matches!(
            self,
            SemanticField::Description | SemanticField::DescriptionTranslation
        )
    }

    /// Default redaction targets: every free-text field
    pub fn free_text_fields() -> Vec<SemanticField> {
        Self::ALL
            .into_iter()
            .filter(SemanticField::is_free_text)
            .collect()
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias lists for dynamically named columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub category: Vec<String>,
    pub sub_category: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            category: vec!["Category".into(), "Cat".into()],
            sub_category: vec![
                "Sub-Category".into(),
                "SubCategory".into(),
                "Issue".into(),
                "Reason".into(),
            ],
        }
    }
}

/// Resolved field → column mapping for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    queue_name: usize,
    timestamp: usize,
    description: usize,
    partner: usize,
    country: usize,
    description_translation: usize,
    category: Option<usize>,
    sub_category: Option<usize>,
    headers: Vec<String>,
}

impl CanonicalSchema {
    /// Column position of `field`, or `None` if the field is absent
    pub fn column(&self, field: SemanticField) -> Option<usize> {
        match field {
            SemanticField::QueueName => Some(self.queue_name),
            SemanticField::Timestamp => Some(self.timestamp),
            SemanticField::Description => Some(self.description),
            SemanticField::Partner => Some(self.partner),
            SemanticField::Country => Some(self.country),
            SemanticField::DescriptionTranslation => Some(self.description_translation),
            SemanticField::Category => self.category,
            SemanticField::SubCategory => self.sub_category,
        }
    }

    /// Header text of the column `field` resolved to
    pub fn header(&self, field: SemanticField) -> Option<&str> {
        self.column(field)
            .and_then(|idx| self.headers.get(idx))
            .map(String::as_str)
    }

    pub fn has(&self, field: SemanticField) -> bool {
        self.column(field).is_some()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Maps a loaded table's headers to a [`CanonicalSchema`]
#[derive(Debug, Clone, Default)]
pub struct ColumnResolver {
    aliases: ColumnAliases,
}

impl ColumnResolver {
    pub fn new(aliases: ColumnAliases) -> Self {
        Self { aliases }
    }

    /// Resolve fixed-position and alias-matched columns.
    ///
    /// Fixed fields ignore header text entirely. Dynamic fields match when a
    /// header equals one of the aliases after trimming and lowercasing.
    pub fn resolve(&self, headers: &[String]) -> Result<CanonicalSchema, SchemaResolutionError> {
        let column_count = headers.len();

        // FIXED is ordered by position, so the first miss is the lowest one
        if let Some(&(field, position)) = SemanticField::FIXED
            .iter()
            .find(|(_, position)| *position >= column_count)
        {
            return Err(SchemaResolutionError::MissingColumn {
                field,
                position,
                column_count,
            });
        }

        let category = resolve_alias(headers, SemanticField::Category, &self.aliases.category)?;
        let sub_category =
            resolve_alias(headers, SemanticField::SubCategory, &self.aliases.sub_category)?;

        Ok(CanonicalSchema {
            queue_name: 0,
            timestamp: 9,
            description: 12,
            partner: 18,
            country: 20,
            description_translation: 21,
            category,
            sub_category,
            headers: headers.to_vec(),
        })
    }
}

fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}

fn resolve_alias(
    headers: &[String],
    field: SemanticField,
    aliases: &[String],
) -> Result<Option<usize>, SchemaResolutionError> {
    let wanted: Vec<String> = aliases.iter().map(|a| normalize_header(a)).collect();

    let matches: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let header = normalize_header(header);
            !header.is_empty() && wanted.contains(&header)
        })
        .map(|(idx, _)| idx)
        .collect();

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(SchemaResolutionError::AmbiguousColumn {
            field,
            matches: matches.iter().map(|&idx| headers[idx].clone()).collect(),
        }),
    }
}
