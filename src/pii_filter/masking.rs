// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Replacement of claimed spans with category tokens

use std::borrow::Cow;

use super::config::PiiCategory;
use super::detector::Detection;

/// Replace detected spans in `text` with their category token.
///
/// `detections` must be sorted by start offset and non-overlapping, which is
/// what `PatternRegistry::detect` returns.
///
/// # Returns
/// Borrowed input when there is nothing to replace
pub fn mask_spans<'a>(text: &'a str, detections: &[Detection]) -> Cow<'a, str> {
    if detections.is_empty() {
        // Zero-copy optimization when no masking needed
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len() + detections.len() * 8);
    let mut cursor = 0;
    for detection in detections {
        debug_assert!(detection.start >= cursor, "detections overlap or are unsorted");
        result.push_str(&text[cursor..detection.start]);
        result.push_str(detection.category.token());
        cursor = detection.end;
    }
    result.push_str(&text[cursor..]);

    Cow::Owned(result)
}

/// Remove every replacement token from `text`, leaving a space in its place
pub fn strip_tokens(text: &str) -> Cow<'_, str> {
    if !text.contains("_REDACTED]") {
        return Cow::Borrowed(text);
    }
    let mut result = text.to_string();
    for category in PiiCategory::ALL {
        result = result.replace(category.token(), " ");
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(category: PiiCategory, start: usize, end: usize) -> Detection {
        Detection {
            category,
            start,
            end,
        }
    }

    #[test]
    fn test_mask_spans_empty() {
        let text = "No PII here";
        let result = mask_spans(text, &[]);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, text); // Zero-copy
    }

    #[test]
    fn test_mask_spans_multiple() {
        let text = "a@b.io and 5551234567!";
        let result = mask_spans(
            text,
            &[det(PiiCategory::Email, 0, 6), det(PiiCategory::Phone, 11, 21)],
        );
        assert_eq!(result, "[EMAIL_REDACTED] and [PHONE_REDACTED]!");
    }

    #[test]
    fn test_mask_spans_at_edges() {
        let text = "John";
        let result = mask_spans(text, &[det(PiiCategory::Name, 0, 4)]);
        assert_eq!(result, "[NAME_REDACTED]");
    }

    #[test]
    fn test_strip_tokens() {
        let stripped = strip_tokens("refund [CARD_REDACTED] for [NAME_REDACTED]");
        assert!(!stripped.contains("REDACTED"));
        assert!(stripped.contains("refund"));
        assert!(matches!(strip_tokens("plain"), Cow::Borrowed(_)));
    }
}
