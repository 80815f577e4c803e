//! Shared error classification.

/// Grepable error code and retryable flag for structured error bodies and logs.
///
/// Nothing in this crate retries; `retryable` only tells the caller whether
/// trying again later could plausibly succeed.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

/// Trim an upstream error body to at most [`MAX_ERROR_BODY_CHARS`] characters.
pub(crate) fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("  quota exceeded \n"), "quota exceeded");
    }

    #[test]
    fn truncate_caps_long_bodies() {
        let out = truncate(&"é".repeat(300));
        assert_eq!(out.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
