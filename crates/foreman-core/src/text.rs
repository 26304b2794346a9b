//! Small text utilities shared across crates.

/// Truncate `text` to at most `max_chars` characters, appending an ellipsis
/// marker when anything was cut. Respects character boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// First non-empty line of `text`, trimmed. Empty string when there is none.
#[must_use]
pub fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}
