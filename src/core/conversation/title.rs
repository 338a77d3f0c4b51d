use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::core::constants::{PLACEHOLDER_TITLE, TITLE_MAX_GRAPHEMES};

/// Derive a short conversation label from the first question asked.
///
/// Whitespace runs collapse to single spaces; anything past
/// [`TITLE_MAX_GRAPHEMES`] grapheme clusters is cut and marked with `...`.
pub fn derive_title(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }

    let graphemes: Vec<&str> = collapsed.graphemes(true).collect();
    if graphemes.len() <= TITLE_MAX_GRAPHEMES {
        return collapsed;
    }

    let mut truncated = graphemes[..TITLE_MAX_GRAPHEMES].concat().trim_end().to_string();
    truncated.push_str("...");
    truncated
}

/// Fit a title into `max_width` terminal columns, ending in `...` when cut.
pub fn shorten_for_display(title: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(title) <= max_width {
        return title.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let mut kept = String::new();
    for grapheme in title.graphemes(true) {
        let width = UnicodeWidthStr::width(grapheme);
        if used + width > budget {
            break;
        }
        used += width;
        kept.push_str(grapheme);
    }
    format!("{}...", kept.trim_end())
}
