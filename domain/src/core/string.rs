//! String helpers for log and event previews.

/// Shorten `s` to at most `max_len` bytes, appending `...` when cut.
///
/// Cuts only at UTF-8 character boundaries.
pub fn preview(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let target = max_len.saturating_sub(3);
    let mut end = target.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Collapse newlines and runs of whitespace into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_ascii() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("hello world", 8), "hello...");
    }

    #[test]
    fn test_preview_multibyte() {
        // each of these characters is 3 bytes
        assert_eq!(preview("あいうえお", 15), "あいうえお");
        assert_eq!(preview("あいうえお", 10), "あい...");
    }

    #[test]
    fn test_preview_tiny_limit() {
        assert_eq!(preview("abcdef", 2), "...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("{\n  \"city\": \"A\"\n}"), "{ \"city\": \"A\" }");
    }
}
