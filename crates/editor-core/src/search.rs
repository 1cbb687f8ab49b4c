use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::extension::ExtensionRegistry;
use crate::ops::Path;
use crate::tree::{inline_search_text, text_blocks_in_order};

/// A hit inside one text block; `range` is a global inline byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub block_path: Path,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub search_term: String,
    pub replace_term: String,
    pub case_sensitive: bool,
    pub results: Vec<SearchMatch>,
    /// Zero-based index into `results`.
    pub result_index: usize,
}

impl SearchState {
    pub fn current(&self) -> Option<&SearchMatch> {
        self.results.get(self.result_index)
    }
}

pub(crate) fn find_matches(
    doc: &Document,
    registry: &ExtensionRegistry,
    term: &str,
    case_sensitive: bool,
) -> Vec<SearchMatch> {
    if term.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for block in text_blocks_in_order(doc, registry) {
        let haystack = inline_search_text(&block.el.children);
        for range in find_in_text(&haystack, term, case_sensitive) {
            out.push(SearchMatch {
                block_path: block.path.clone(),
                range,
            });
        }
    }
    out
}

/// Non-overlapping occurrences of `needle`, as byte ranges of `haystack`.
fn find_in_text(haystack: &str, needle: &str, case_sensitive: bool) -> Vec<Range<usize>> {
    let fold = |c: char| -> char {
        if case_sensitive {
            c
        } else {
            c.to_lowercase().next().unwrap_or(c)
        }
    };

    let hay: Vec<(usize, char)> = haystack.char_indices().collect();
    let needle: Vec<char> = needle.chars().map(fold).collect();
    let mut out = Vec::new();
    if needle.is_empty() || needle.len() > hay.len() {
        return out;
    }

    let mut ix = 0usize;
    while ix + needle.len() <= hay.len() {
        let matched = needle
            .iter()
            .enumerate()
            .all(|(k, &c)| fold(hay[ix + k].1) == c);
        if matched {
            let start = hay[ix].0;
            let end = hay
                .get(ix + needle.len())
                .map(|(byte, _)| *byte)
                .unwrap_or(haystack.len());
            out.push(start..end);
            ix += needle.len();
        } else {
            ix += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::find_in_text;

    #[test]
    fn case_insensitive_matching_folds_both_sides() {
        assert_eq!(find_in_text("Foo foo FOO", "foo", false), vec![0..3, 4..7, 8..11]);
        assert_eq!(find_in_text("Foo foo FOO", "foo", true), vec![4..7]);
    }

    #[test]
    fn matches_do_not_overlap() {
        assert_eq!(find_in_text("aaaa", "aa", true), vec![0..2, 2..4]);
    }

    #[test]
    fn multibyte_ranges_are_byte_offsets() {
        assert_eq!(find_in_text("héllo hé", "hé", true), vec![0..3, 7..10]);
    }
}
