// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection — parse expressions such as "1-3, 5, 7-9" into an ordered,
// deduplicated list of 1-based page numbers.
//
// Grammar: tokens separated by commas, each either `n` or `a-b` (a <= b).
// Out-of-range singles and malformed tokens are skipped; ranges are clamped
// to the document. Order is the order of first appearance.

use std::collections::HashSet;

use folio_core::error::{FolioError, Result};
use tracing::debug;

/// Validated page numbers, each in `1..=total_pages`, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: Vec<u32>,
}

impl PageSelection {
    /// Parse `expression` against a document of `total_pages` pages.
    ///
    /// Fails with [`FolioError::EmptySelection`] when no valid page remains.
    pub fn parse(expression: &str, total_pages: u32) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut pages = Vec::new();
        let mut push = |page: u32| {
            if seen.insert(page) {
                pages.push(page);
            }
        };

        for token in expression.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('-') {
                Some((start, end)) => {
                    let (Ok(start), Ok(end)) =
                        (start.trim().parse::<u32>(), end.trim().parse::<u32>())
                    else {
                        debug!(token, "skipping malformed range");
                        continue;
                    };
                    if start > end {
                        debug!(token, "skipping descending range");
                        continue;
                    }
                    let (start, end) = (start.max(1), end.min(total_pages));
                    for page in start..=end {
                        push(page);
                    }
                }
                None => match token.parse::<u32>() {
                    Ok(page) if (1..=total_pages).contains(&page) => push(page),
                    _ => debug!(token, "skipping page outside document"),
                },
            }
        }

        if pages.is_empty() {
            return Err(FolioError::EmptySelection);
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    pub fn into_pages(self) -> Vec<u32> {
        self.pages
    }
}

/// Group `pages` into runs of consecutive ascending numbers, keeping order.
pub fn page_runs(pages: &[u32]) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &page in pages {
        match runs.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(page) => *end = page,
            _ => runs.push((page, page)),
        }
    }
    runs
}

/// Human-readable form of `pages`, e.g. `"1-3, 5"`.
pub fn describe_pages(pages: &[u32]) -> String {
    join_runs(pages, ", ")
}

/// Longest label [`pages_file_label`] returns.
pub const MAX_FILE_LABEL_LEN: usize = 64;

const TRUNCATED_SUFFIX: &str = "_etc";

/// File-name-safe form of `pages`, e.g. `"1-3_5"`. A label longer than
/// [`MAX_FILE_LABEL_LEN`] is cut at a run boundary and ends in `_etc`.
pub fn pages_file_label(pages: &[u32]) -> String {
    let full = join_runs(pages, "_");
    if full.len() <= MAX_FILE_LABEL_LEN {
        return full;
    }

    let mut label = String::new();
    for run in run_labels(pages) {
        let needed = label.len() + usize::from(!label.is_empty()) + run.len();
        if needed + TRUNCATED_SUFFIX.len() > MAX_FILE_LABEL_LEN {
            break;
        }
        if !label.is_empty() {
            label.push('_');
        }
        label.push_str(&run);
    }
    label.push_str(TRUNCATED_SUFFIX);
    label
}

fn join_runs(pages: &[u32], separator: &str) -> String {
    run_labels(pages).join(separator)
}

fn run_labels(pages: &[u32]) -> Vec<String> {
    page_runs(pages)
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn long_file_labels_are_cut_at_a_run_boundary() {
        let scattered: Vec<u32> = (1..=400).step_by(2).collect();
        let label = pages_file_label(&scattered);

        assert!(label.len() <= MAX_FILE_LABEL_LEN, "{label}");
        assert!(label.starts_with("1_3_5_7_"), "{label}");
        assert!(label.ends_with("_etc"), "{label}");
        // The text before the suffix is a whole number of runs.
        let kept = label.trim_end_matches("_etc");
        assert!(kept.split('_').all(|run| run.parse::<u32>().is_ok()), "{label}");

        assert_eq!(pages_file_label(&[1, 2, 3, 5]), "1-3_5");
    }

    #[test]
    fn parses_mixed_singles_and_ranges() {
        let selection = PageSelection::parse("1-3,5,7-9", 10).expect("parse");
        assert_eq!(selection.pages(), &[1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert!(matches!(
            PageSelection::parse("", 10),
            Err(FolioError::EmptySelection)
        ));
        assert!(matches!(
            PageSelection::parse(" , ,", 10),
            Err(FolioError::EmptySelection)
        ));
    }

    #[test]
    fn nothing_in_range_is_rejected() {
        assert!(matches!(
            PageSelection::parse("50", 10),
            Err(FolioError::EmptySelection)
        ));
        assert!(matches!(
            PageSelection::parse("0, 11, x", 10),
            Err(FolioError::EmptySelection)
        ));
    }

    #[test]
    fn first_seen_order_is_kept() {
        let selection = PageSelection::parse("5, 1-3, 2, 5", 10).expect("parse");
        assert_eq!(selection.pages(), &[5, 1, 2, 3]);
    }

    #[test]
    fn ranges_are_clamped_and_bad_tokens_skipped() {
        let selection = PageSelection::parse(" 8-20 , 3-1, abc, 0-2, 4-x ", 10).expect("parse");
        assert_eq!(selection.pages(), &[8, 9, 10, 1, 2]);
    }

    #[test]
    fn labels_collapse_runs() {
        assert_eq!(describe_pages(&[1, 2, 3, 5]), "1-3, 5");
        assert_eq!(pages_file_label(&[1, 2, 3, 5]), "1-3_5");
        assert_eq!(describe_pages(&[4]), "4");
        assert_eq!(describe_pages(&[3, 2, 1]), "3, 2, 1");
    }

    proptest! {
        #[test]
        fn parsed_pages_stay_in_bounds(
            expression in "[0-9 ,\\-]{0,40}",
            total in 1u32..60,
        ) {
            if let Ok(selection) = PageSelection::parse(&expression, total) {
                prop_assert!(!selection.is_empty());
                for &page in selection.pages() {
                    prop_assert!((1..=total).contains(&page));
                }
                let unique: HashSet<_> = selection.pages().iter().collect();
                prop_assert_eq!(unique.len(), selection.len());
            }
        }

        #[test]
        fn reparsing_a_selection_is_idempotent(
            pages in proptest::collection::vec(1u32..40, 1..20),
        ) {
            let expression = pages.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
            let first = PageSelection::parse(&expression, 40).expect("valid");
            let again = describe_pages(first.pages()).replace(' ', "");
            let second = PageSelection::parse(&again, 40).expect("valid");
            prop_assert_eq!(first, second);
        }
    }
}
