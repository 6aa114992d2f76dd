//! The merge/split directive: `"1-4,7-8,9"`.
//!
//! Tokens are separated by commas. A token is either a single page `N` or an
//! inclusive range `N-M` (1-based). Ranges are normalised with min/max, so
//! `"8-1"` covers pages 1 through 8. Whitespace around numbers is ignored and
//! empty tokens are skipped, which makes an empty directive mean "split every
//! page".
//!
//! Whether a single-page token becomes a merge group is decided by
//! [`SinglePagePolicy`]. Every token is range-checked either way, and all
//! errors surface here, before anything is rendered.

use crate::config::SinglePagePolicy;
use crate::error::SplitMergeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::num::IntErrorKind;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\s*-\s*(\d+))?$").unwrap());

/// A set of pages stitched into one composite image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    /// The directive token this group came from, trimmed.
    pub token: String,
    /// Member pages, ascending, 1-based, never empty.
    pub pages: Vec<usize>,
}

impl MergeGroup {
    fn new(token: &str, a: usize, b: usize) -> Self {
        let (lo, hi) = (a.min(b), a.max(b));
        Self {
            token: token.to_string(),
            pages: (lo..=hi).collect(),
        }
    }

    pub fn first_page(&self) -> usize {
        self.pages[0]
    }

    pub fn last_page(&self) -> usize {
        self.pages[self.pages.len() - 1]
    }
}

impl fmt::Display for MergeGroup {
    /// `"pages 1-3"`, or `"page 9"` for a group of one.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pages.len() == 1 {
            write!(f, "page {}", self.first_page())
        } else {
            write!(f, "pages {}-{}", self.first_page(), self.last_page())
        }
    }
}

/// One parsed token before range checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Single(usize),
    Range(usize, usize),
}

/// Parse a directive into merge groups, in declaration order.
///
/// Pages not covered by the returned groups are the split candidates; the
/// caller derives them with [`crate::pipeline::tracker::PageSetTracker`].
///
/// # Errors
/// * [`SplitMergeError::Parse`] for a token that is not `N` or `N-M`.
/// * [`SplitMergeError::Range`] for a page outside `1..=total_pages`.
pub fn parse_directive(
    directive: &str,
    total_pages: usize,
    policy: SinglePagePolicy,
) -> Result<Vec<MergeGroup>, SplitMergeError> {
    let mut groups = Vec::new();

    for raw in directive.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        match parse_token(token)? {
            Token::Single(page) => {
                check_range(token, page, total_pages)?;
                if policy == SinglePagePolicy::Merge {
                    groups.push(MergeGroup::new(token, page, page));
                }
            }
            Token::Range(a, b) => {
                check_range(token, a, total_pages)?;
                check_range(token, b, total_pages)?;
                groups.push(MergeGroup::new(token, a, b));
            }
        }
    }

    Ok(groups)
}

fn parse_token(token: &str) -> Result<Token, SplitMergeError> {
    let caps = TOKEN_RE.captures(token).ok_or_else(|| SplitMergeError::Parse {
        token: token.to_string(),
        reason: "expected a page number or a range like 3-7".into(),
    })?;

    // Too many digits for usize is still a page number, just out of range.
    let number = |s: &str| match s.parse::<usize>() {
        Ok(n) => Ok(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(usize::MAX),
        Err(e) => Err(SplitMergeError::Parse {
            token: token.to_string(),
            reason: format!("bad page number '{s}': {e}"),
        }),
    };

    let start = number(&caps[1])?;
    match caps.get(2) {
        Some(end) => Ok(Token::Range(start, number(end.as_str())?)),
        None => Ok(Token::Single(start)),
    }
}

fn check_range(token: &str, page: usize, total: usize) -> Result<(), SplitMergeError> {
    if page == 0 || page > total {
        return Err(SplitMergeError::Range {
            token: token.to_string(),
            page,
            total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(groups: &[MergeGroup]) -> Vec<Vec<usize>> {
        groups.iter().map(|g| g.pages.clone()).collect()
    }

    #[test]
    fn empty_directive_has_no_groups() {
        assert!(parse_directive("", 5, SinglePagePolicy::Split).unwrap().is_empty());
        assert!(parse_directive("  ", 5, SinglePagePolicy::Split).unwrap().is_empty());
    }

    #[test]
    fn ranges_expand_and_singles_stay_split() {
        let groups = parse_directive("1-4,7-8,9", 10, SinglePagePolicy::Split).unwrap();
        assert_eq!(pages(&groups), vec![vec![1, 2, 3, 4], vec![7, 8]]);
        assert_eq!(groups[0].token, "1-4");
    }

    #[test]
    fn singles_merge_into_themselves_under_merge_policy() {
        let groups = parse_directive("1-2,4", 5, SinglePagePolicy::Merge).unwrap();
        assert_eq!(pages(&groups), vec![vec![1, 2], vec![4]]);
        assert_eq!(groups[1].to_string(), "page 4");
    }

    #[test]
    fn reversed_bounds_are_normalised() {
        let groups = parse_directive("8-1", 8, SinglePagePolicy::Split).unwrap();
        assert_eq!(pages(&groups), vec![(1..=8).collect::<Vec<_>>()]);
        assert_eq!(groups[0].to_string(), "pages 1-8");
    }

    #[test]
    fn equal_bounds_form_a_group_of_one() {
        let groups = parse_directive("3-3", 5, SinglePagePolicy::Split).unwrap();
        assert_eq!(pages(&groups), vec![vec![3]]);
    }

    #[test]
    fn whitespace_and_empty_tokens_are_tolerated() {
        let groups = parse_directive(" 1 - 2 ,, 4-5 ,", 5, SinglePagePolicy::Split).unwrap();
        assert_eq!(pages(&groups), vec![vec![1, 2], vec![4, 5]]);
    }

    #[test]
    fn overlapping_groups_are_kept_as_declared() {
        let groups = parse_directive("1-3,2-4", 5, SinglePagePolicy::Split).unwrap();
        assert_eq!(pages(&groups), vec![vec![1, 2, 3], vec![2, 3, 4]]);
    }

    #[test]
    fn out_of_range_is_a_range_error() {
        let err = parse_directive("1-10", 5, SinglePagePolicy::Split).unwrap_err();
        match err {
            SplitMergeError::Range { token, page, total } => {
                assert_eq!(token, "1-10");
                assert_eq!(page, 10);
                assert_eq!(total, 5);
            }
            other => panic!("expected Range, got {other:?}"),
        }
    }

    #[test]
    fn single_tokens_are_range_checked_even_when_split() {
        let err = parse_directive("6", 5, SinglePagePolicy::Split).unwrap_err();
        assert!(matches!(err, SplitMergeError::Range { page: 6, .. }));
    }

    #[test]
    fn page_zero_is_a_range_error() {
        let err = parse_directive("0-2", 5, SinglePagePolicy::Split).unwrap_err();
        assert!(matches!(err, SplitMergeError::Range { page: 0, .. }));
    }

    #[test]
    fn malformed_tokens_are_parse_errors() {
        for bad in ["a", "1-b", "-3", "3-", "1-2-3", "1.5", "1 2"] {
            let err = parse_directive(bad, 10, SinglePagePolicy::Split).unwrap_err();
            assert!(
                matches!(err, SplitMergeError::Parse { .. }),
                "'{bad}' should be a parse error, got {err:?}"
            );
        }
    }

    #[test]
    fn huge_numbers_are_range_errors() {
        let err =
            parse_directive("1-99999999999999999999999", 5, SinglePagePolicy::Split).unwrap_err();
        match err {
            SplitMergeError::Range { token, page, total } => {
                assert_eq!(token, "1-99999999999999999999999");
                assert_eq!(page, usize::MAX);
                assert_eq!(total, 5);
            }
            other => panic!("expected Range, got {other:?}"),
        }

        let err =
            parse_directive("99999999999999999999999", 5, SinglePagePolicy::Split).unwrap_err();
        assert!(matches!(err, SplitMergeError::Range { .. }));
    }
}
