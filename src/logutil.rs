//! Helpers for keeping user-supplied text (character names, session reports,
//! campaign titles) on a single log line.

use std::fmt::Write;

/// Longest preview written to the log before truncating with `…`.
pub const LOG_PREVIEW_CHARS: usize = 120;

/// Escape a string for single-line logging, truncated to [`LOG_PREVIEW_CHARS`].
pub fn escape_log(s: &str) -> String {
    escape_log_with_limit(s, LOG_PREVIEW_CHARS)
}

/// Escape newlines, tabs, backslashes and other control characters, keeping at
/// most `max_chars` input characters.
pub fn escape_log_with_limit(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("Session 3\n\tBackLund"), "Session 3\\n\\tBackLund");
        assert_eq!(escape_log("a\u{1b}b"), "a\\x1Bb");
    }

    #[test]
    fn truncates_long_text() {
        let out = escape_log_with_limit("abcdef", 3);
        assert_eq!(out, "abc…");
    }
}
