//! Text helpers shared by the table renderer and help text.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Truncate text to a maximum display width.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Truncate text with an ellipsis if it exceeds max width.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if display_width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let truncated = truncate_to_width(text, max_width.saturating_sub(1));
    format!("{truncated}…")
}

/// Left-align `text` in exactly `width` columns, truncating if needed.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let mut out = truncate_to_width(text, width);
    let pad = width.saturating_sub(display_width(&out));
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

/// Greedy wrap of whole items joined by `sep`. An item wider than `width`
/// gets a line to itself.
pub fn wrap_items<S: AsRef<str>>(items: &[S], sep: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for item in items {
        let item = item.as_ref();
        if current.is_empty() {
            current.push_str(item);
        } else if display_width(&current) + display_width(sep) + display_width(item) <= width {
            current.push_str(sep);
            current.push_str(item);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(item);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Widest cell per column, header included, capped at `max`.
pub fn column_widths(header: &[String], rows: &[Vec<String>], max: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell));
            }
        }
    }
    widths.into_iter().map(|w| w.min(max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello world", 6), "hello…");
        assert_eq!(truncate_with_ellipsis("hi", 6), "hi");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn test_pad_to_width() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("abcdef", 4), "abcd");
        assert_eq!(display_width(&pad_to_width("日本語", 5)), 5);
    }

    #[test]
    fn test_wrap_items() {
        let items = ["a:assign", "b:browse", "c:create", "d:delete"];
        assert_eq!(
            wrap_items(&items, "  ", 20),
            vec!["a:assign  b:browse", "c:create  d:delete"]
        );
        assert!(wrap_items::<&str>(&[], " ", 10).is_empty());
    }

    #[test]
    fn test_column_widths_capped() {
        let header = vec!["Key".to_string(), "Summary".to_string()];
        let rows = vec![vec!["EPM-1".to_string(), "x".repeat(80)]];
        assert_eq!(column_widths(&header, &rows, 50), vec![5, 50]);
    }
}
