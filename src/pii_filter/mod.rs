// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// PII Filter - pattern registry for free-text redaction
//
// - RegexSet pre-screening so values without PII skip every detector
// - Priority-ordered span claiming (Email, Phone, CreditCard, Name)
// - Copy-on-write strings when nothing is replaced

pub mod config;
pub mod detector;
pub mod masking;
pub mod patterns;

pub use config::{PiiCategory, RedactionConfig};
pub use detector::{Applied, Detection, MatchCounts, PatternRegistry, SpanTracker};
