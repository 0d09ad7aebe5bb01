use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub(crate) const TAB_STOP: usize = 4;

/// A slice of wrapped text together with the char offset it starts at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct WrapChunk {
    pub(crate) start: usize,
    pub(crate) text: String,
}

/// One user-perceived character with its char offset and column width.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Grapheme<'a> {
    pub(crate) start: usize,
    pub(crate) text: &'a str,
    pub(crate) width: usize,
}

impl Grapheme<'_> {
    fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Splits `value` into grapheme clusters measured the way ratatui measures
/// span content, so an emoji with its variation selector counts as two
/// columns.
pub(crate) fn graphemes(value: &str) -> Vec<Grapheme<'_>> {
    let mut start = 0;
    value
        .graphemes(true)
        .map(|text| {
            let grapheme = Grapheme {
                start,
                text,
                width: display_width(text),
            };
            start += text.chars().count();
            grapheme
        })
        .collect()
}

pub(crate) fn display_width(value: &str) -> usize {
    value.width()
}

/// Strips carriage returns, expands tabs to the next stop and replaces other
/// control characters with spaces.
pub(crate) fn normalize_content(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    let mut column = 0;

    for grapheme in value.graphemes(true) {
        if !grapheme.chars().any(char::is_control) {
            normalized.push_str(grapheme);
            column += display_width(grapheme);
            continue;
        }
        for ch in grapheme.chars() {
            match ch {
                '\r' => {}
                '\t' => {
                    let spaces = TAB_STOP - column % TAB_STOP;
                    normalized.extend(std::iter::repeat_n(' ', spaces));
                    column += spaces;
                }
                _ => {
                    normalized.push(' ');
                    column += 1;
                }
            }
        }
    }

    normalized
}

/// Longest prefix of `value` whose display width fits in `budget`.
pub(crate) fn take_width(value: &str, budget: usize) -> String {
    let mut kept = String::new();
    let mut used = 0;
    for grapheme in value.graphemes(true) {
        let width = display_width(grapheme);
        if used + width > budget {
            break;
        }
        kept.push_str(grapheme);
        used += width;
    }
    while display_width(&kept) > budget {
        kept.pop();
    }
    kept
}

pub(crate) fn truncate_to_width(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    if display_width(value) <= width {
        return value.to_string();
    }

    let (budget, ellipsis) = if width <= 3 { (width, "") } else { (width - 3, "...") };
    let mut truncated = take_width(value, budget);
    truncated.push_str(ellipsis);
    truncated
}

pub(crate) fn pad_to_width(value: String, width: usize) -> String {
    let len = display_width(&value);
    if len >= width {
        truncate_to_width(&value, width)
    } else {
        format!("{value}{}", " ".repeat(width - len))
    }
}

pub(crate) fn fit_line(value: &str, width: usize) -> String {
    let truncated = truncate_to_width(value, width);
    pad_to_width(truncated, width)
}

fn join(graphemes: &[Grapheme<'_>]) -> String {
    graphemes.iter().map(|grapheme| grapheme.text).collect()
}

/// Word-wraps `text` into chunks no wider than `width` columns.
///
/// Breaks after whitespace when a chunk would overflow, otherwise hard-breaks
/// between grapheme clusters. Whitespace at a break point is dropped from the
/// start of the next chunk. Always yields at least one chunk.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<WrapChunk> {
    let width = width.max(1);
    let graphemes = graphemes(text);
    if graphemes.is_empty() {
        return vec![WrapChunk {
            start: 0,
            text: String::new(),
        }];
    }

    let mut chunks = Vec::new();
    let mut position = 0;
    while position < graphemes.len() {
        let mut end = position;
        let mut used = 0;
        while end < graphemes.len() {
            let w = graphemes[end].width;
            if end > position && used + w > width {
                break;
            }
            used += w;
            end += 1;
        }

        if end == graphemes.len() {
            chunks.push(WrapChunk {
                start: graphemes[position].start,
                text: join(&graphemes[position..end]),
            });
            break;
        }

        let break_at = if graphemes[end].is_whitespace() {
            end
        } else {
            (position + 1..end)
                .rev()
                .find(|index| graphemes[index - 1].is_whitespace())
                .unwrap_or(end)
        };

        chunks.push(WrapChunk {
            start: graphemes[position].start,
            text: join(&graphemes[position..break_at]),
        });

        position = break_at;
        while position < graphemes.len() && graphemes[position].is_whitespace() {
            position += 1;
        }
    }

    if chunks.is_empty() {
        chunks.push(WrapChunk {
            start: 0,
            text: String::new(),
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{
        display_width, fit_line, normalize_content, take_width, truncate_to_width, wrap_text,
    };

    fn chunk_texts(text: &str, width: usize) -> Vec<String> {
        wrap_text(text, width)
            .into_iter()
            .map(|chunk| chunk.text)
            .collect()
    }

    #[test]
    fn truncate_adds_ellipsis_for_long_values() {
        assert_eq!(truncate_to_width("abcdefgh", 6), "abc...");
    }

    #[test]
    fn fit_line_pads_short_values() {
        assert_eq!(fit_line("abc", 5), "abc  ");
    }

    #[test]
    fn normalize_content_expands_tabs_to_stops() {
        assert_eq!(normalize_content("a\tb\r"), "a   b");
        assert_eq!(normalize_content("\tx"), "    x");
        assert_eq!(normalize_content("abcd\te"), "abcd    e");
    }

    #[test]
    fn normalize_content_replaces_control_characters() {
        assert_eq!(normalize_content("a\u{1b}b"), "a b");
    }

    #[test]
    fn wrap_prefers_breaking_after_whitespace() {
        assert_eq!(chunk_texts("hello world again", 8), ["hello ", "world ", "again"]);
    }

    #[test]
    fn wrap_hard_breaks_long_words() {
        assert_eq!(chunk_texts("abcdefghij", 4), ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_drops_whitespace_at_break() {
        let chunks = wrap_text("abcd    efgh", 4);
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "efgh");
        assert_eq!(chunks[1].start, 8);
    }

    #[test]
    fn wrap_of_empty_text_yields_one_chunk() {
        assert_eq!(chunk_texts("", 10), [""]);
        assert_eq!(chunk_texts("abc", 0), ["a", "b", "c"]);
    }

    #[test]
    fn wrap_counts_wide_characters_by_column() {
        assert_eq!(chunk_texts("日本語", 4), ["日本", "語"]);
    }

    #[test]
    fn emoji_with_variation_selector_counts_two_columns() {
        let hearts = "\u{2764}\u{fe0f}\u{2764}\u{fe0f}\u{2764}\u{fe0f}";
        let chunks = wrap_text(hearts, 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].start, 4);
        assert!(chunks.iter().all(|chunk| display_width(&chunk.text) <= 4));
        assert_eq!(display_width(&take_width(hearts, 3)), 2);
        assert_eq!(display_width(&fit_line(hearts, 5)), 5);
    }
}
