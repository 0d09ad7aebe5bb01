use crate::model::TextRange;

#[derive(Clone, Copy, Debug)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    is_space: bool,
}

/// Splits text into alternating whitespace / non-whitespace tokens with
/// char-offset spans.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, usize, bool)> = None;

    for (char_index, (byte_index, ch)) in text.char_indices().enumerate() {
        let is_space = ch.is_whitespace();
        match current {
            Some((_, _, kind)) if kind == is_space => {}
            Some((start_char, start_byte, kind)) => {
                tokens.push(Token {
                    text: &text[start_byte..byte_index],
                    start: start_char,
                    end: char_index,
                    is_space: kind,
                });
                current = Some((char_index, byte_index, is_space));
            }
            None => current = Some((char_index, byte_index, is_space)),
        }
    }

    if let Some((start_char, start_byte, kind)) = current {
        tokens.push(Token {
            text: &text[start_byte..],
            start: start_char,
            end: text.chars().count(),
            is_space: kind,
        });
    }

    tokens
}

fn words(text: &str) -> Vec<Token<'_>> {
    tokenize(text)
        .into_iter()
        .filter(|token| !token.is_space)
        .collect()
}

fn merge_ranges(ranges: Vec<TextRange>) -> Vec<TextRange> {
    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Returns the char ranges of words that differ between the two sides of a
/// changed line, found with an LCS over word tokens.
pub fn changed_word_ranges(old: &str, new: &str) -> (Vec<TextRange>, Vec<TextRange>) {
    let old_words = words(old);
    let new_words = words(new);
    let (n, m) = (old_words.len(), new_words.len());

    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if old_words[i].text == new_words[j].text {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut old_matched = vec![false; n];
    let mut new_matched = vec![false; m];
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old_words[i].text == new_words[j].text {
            old_matched[i] = true;
            new_matched[j] = true;
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    let unmatched = |tokens: &[Token<'_>], matched: &[bool]| {
        let ranges = tokens
            .iter()
            .zip(matched)
            .filter(|(_, matched)| !**matched)
            .map(|(token, _)| TextRange::new(token.start, token.end))
            .collect();
        merge_ranges(ranges)
    };

    (
        unmatched(&old_words, &old_matched),
        unmatched(&new_words, &new_matched),
    )
}

#[cfg(test)]
mod tests {
    use super::{changed_word_ranges, merge_ranges, tokenize};
    use crate::model::TextRange;

    #[test]
    fn tokenize_alternates_whitespace_and_words() {
        let tokens = tokenize("ab  cd");
        let spans: Vec<(usize, usize, bool)> = tokens
            .iter()
            .map(|token| (token.start, token.end, token.is_space))
            .collect();
        assert_eq!(spans, [(0, 2, false), (2, 4, true), (4, 6, false)]);
    }

    #[test]
    fn flags_only_the_changed_word() {
        let (old, new) = changed_word_ranges("let x = beta;", "let x = zeta;");
        assert_eq!(old, [TextRange::new(8, 13)]);
        assert_eq!(new, [TextRange::new(8, 13)]);
    }

    #[test]
    fn identical_lines_have_no_ranges() {
        let (old, new) = changed_word_ranges("same words here", "same  words here");
        assert!(old.is_empty());
        assert!(new.is_empty());
    }

    #[test]
    fn empty_side_yields_no_ranges_for_that_side() {
        let (old, new) = changed_word_ranges("", "added words");
        assert!(old.is_empty());
        assert_eq!(new, [TextRange::new(0, 5), TextRange::new(6, 11)]);
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let (old, new) = changed_word_ranges("é foo", "é bar");
        assert_eq!(old, [TextRange::new(2, 5)]);
        assert_eq!(new, [TextRange::new(2, 5)]);
    }

    #[test]
    fn tie_break_advances_old_side_first() {
        let (old, new) = changed_word_ranges("a b", "b a");
        assert_eq!(old, [TextRange::new(0, 1)]);
        assert_eq!(new, [TextRange::new(2, 3)]);
    }

    #[test]
    fn swapping_sides_swaps_ranges_without_ties() {
        let cases = [
            ("alpha beta gamma", "alpha zeta gamma"),
            ("let x = 1;", "let y = 2;"),
            ("one two", "one two three"),
        ];
        for (left, right) in cases {
            let (old, new) = changed_word_ranges(left, right);
            let (swapped_old, swapped_new) = changed_word_ranges(right, left);
            assert_eq!((old, new), (swapped_new, swapped_old), "{left:?} vs {right:?}");
        }
    }

    #[test]
    fn tie_break_is_positional_in_both_argument_orders() {
        // Equal LCS choices always drop the old token first, so a swap
        // reports the same positions instead of mirrored ones.
        assert_eq!(
            changed_word_ranges("b a", "a b"),
            changed_word_ranges("a b", "b a")
        );
    }

    #[test]
    fn touching_ranges_are_merged() {
        let merged = merge_ranges(vec![TextRange::new(0, 2), TextRange::new(2, 4)]);
        assert_eq!(merged, [TextRange::new(0, 4)]);
        let separate = merge_ranges(vec![TextRange::new(0, 2), TextRange::new(3, 4)]);
        assert_eq!(separate.len(), 2);
    }
}
