// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Configuration types for PII Filter

use serde::{Deserialize, Serialize};

/// PII categories, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Email,
    Phone,
    CreditCard,
    Name,
}

impl PiiCategory {
    /// All categories, highest priority first
    pub const ALL: [PiiCategory; 4] = [
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::CreditCard,
        PiiCategory::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::Email => "email",
            PiiCategory::Phone => "phone",
            PiiCategory::CreditCard => "credit_card",
            PiiCategory::Name => "name",
        }
    }

    /// Fixed replacement token
    pub fn token(&self) -> &'static str {
        match self {
            PiiCategory::Email => "[EMAIL_REDACTED]",
            PiiCategory::Phone => "[PHONE_REDACTED]",
            PiiCategory::CreditCard => "[CARD_REDACTED]",
            PiiCategory::Name => "[NAME_REDACTED]",
        }
    }

    /// Lower value wins when spans compete
    pub fn priority(&self) -> u8 {
        *self as u8
    }
}

/// Configuration for the pattern registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    // Detection flags
    pub detect_email: bool,
    pub detect_phone: bool,
    pub detect_credit_card: bool,
    pub detect_name: bool,

    // Name heuristic tuning, merged into the built-in lists
    pub extra_name_cues: Vec<String>,
    pub extra_non_name_words: Vec<String>,

    // Emit per-category counts (never matched text) at info level
    pub log_detections: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            detect_email: true,
            detect_phone: true,
            detect_credit_card: true,
            detect_name: true,
            extra_name_cues: Vec::new(),
            extra_non_name_words: Vec::new(),
            log_detections: true,
        }
    }
}

impl RedactionConfig {
    pub fn is_enabled(&self, category: PiiCategory) -> bool {
        match category {
            PiiCategory::Email => self.detect_email,
            PiiCategory::Phone => self.detect_phone,
            PiiCategory::CreditCard => self.detect_credit_card,
            PiiCategory::Name => self.detect_name,
        }
    }
}
