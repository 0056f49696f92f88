//! Maven version ordering.
//!
//! Maven versions do not compare like semver: `.` and `-` both split
//! segments, but `-` opens a nested sub-list that orders before a `.`
//! continuation, numeric and alphabetic segments compare by different
//! rules, and the well-known qualifiers rank below a release:
//! `alpha < beta < milestone < rc = cr < snapshot < "" < sp`.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Qualifier {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Token {
    // digits with leading zeros stripped; compared by (length, lexical),
    // which matches numeric order at arbitrary precision
    Numeric(String),
    Qualifier(Qualifier),
    Text(String),
    Sublist(Vec<Token>),
}

/// A parsed Maven version. Ordering is a total order; versions that
/// differ only in trailing zero segments are equal (`1 == 1.0 == 1.0.0`).
#[derive(Debug, Clone)]
pub struct MavenVersion {
    original: String,
    tokens: Vec<Token>,
}

impl MavenVersion {
    pub fn parse(version: &str) -> MavenVersion {
        let trimmed = version.trim();
        let mut tokens = assemble(tokenize(trimmed));
        normalize(&mut tokens);
        MavenVersion {
            original: trimmed.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for MavenVersion {}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_lists(&self.tokens, &other.tokens)
    }
}
impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Maven range expressions (`[1.0,2.0)` and friends) are not resolved by
/// this tool; callers detect them and record a problem instead.
pub fn is_version_range(version: &str) -> bool {
    let v = version.trim_start();
    v.starts_with('[') || v.starts_with('(')
}

/// Split into raw (separator, text) pairs. A digit/non-digit transition
/// acts as a `-` separator, so `1-sp1` and `1-sp-1` tokenise alike.
fn tokenize(version: &str) -> Vec<(char, String)> {
    let mut out = Vec::new();
    let mut sep = '.';
    let mut buf = String::new();
    let mut last_digit = false;
    for c in version.chars() {
        if c.is_whitespace() {
            continue;
        }
        if c == '.' || c == '-' {
            out.push((sep, std::mem::take(&mut buf)));
            sep = c;
        } else {
            if !buf.is_empty() && c.is_ascii_digit() != last_digit {
                out.push((sep, std::mem::take(&mut buf)));
                sep = '-';
            }
            last_digit = c.is_ascii_digit();
            buf.push(c);
        }
    }
    out.push((sep, buf));
    out
}

fn classify(text: &str) -> Token {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        let digits = text.trim_start_matches('0');
        return Token::Numeric(if digits.is_empty() {
            "0".to_string()
        } else {
            digits.to_string()
        });
    }
    match text.to_lowercase().as_str() {
        "alpha" => Token::Qualifier(Qualifier::Alpha),
        "beta" => Token::Qualifier(Qualifier::Beta),
        "milestone" => Token::Qualifier(Qualifier::Milestone),
        "rc" | "cr" => Token::Qualifier(Qualifier::Rc),
        "snapshot" => Token::Qualifier(Qualifier::Snapshot),
        "" | "ga" | "final" | "release" => Token::Qualifier(Qualifier::Release),
        "sp" => Token::Qualifier(Qualifier::Sp),
        other => Token::Text(other.to_string()),
    }
}

/// Nest tokens right-recursively: every `-` opens a sub-list that holds
/// everything after it, so the structure of `1-a.b-c` is `[1, [a, b, [c]]]`.
fn assemble(raw: Vec<(char, String)>) -> Vec<Token> {
    let mut stack: Vec<Vec<Token>> = vec![Vec::new()];
    for (i, (sep, text)) in raw.iter().enumerate() {
        if *sep == '-' && i > 0 {
            stack.push(Vec::new());
        }
        if let Some(current) = stack.last_mut() {
            current.push(classify(text));
        }
    }
    while stack.len() > 1 {
        let inner = match stack.pop() {
            Some(l) => l,
            None => break,
        };
        if let Some(parent) = stack.last_mut() {
            parent.push(Token::Sublist(inner));
        }
    }
    stack.pop().unwrap_or_default()
}

fn is_zero(token: &Token) -> bool {
    match token {
        Token::Numeric(n) => n == "0",
        Token::Qualifier(q) => *q == Qualifier::Release,
        Token::Text(t) => t.is_empty(),
        Token::Sublist(l) => l.is_empty(),
    }
}

fn normalize(tokens: &mut Vec<Token>) {
    for t in tokens.iter_mut() {
        if let Token::Sublist(inner) = t {
            normalize(inner);
        }
    }
    while tokens.last().map(is_zero) == Some(true) {
        tokens.pop();
    }
}

fn compare_lists(a: &[Token], b: &[Token]) -> Ordering {
    let max = a.len().max(b.len());
    for i in 0..max {
        let ord = match (a.get(i), b.get(i)) {
            (None, None) => Ordering::Equal,
            (Some(t), None) => compare_to_padding(t),
            (None, Some(t)) => compare_to_padding(t).reverse(),
            (Some(x), Some(y)) => compare_tokens(x, y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// How a token orders against the zero element padded in for a shorter
/// version: numeric against 0, alphabetic against the empty qualifier.
fn compare_to_padding(token: &Token) -> Ordering {
    match token {
        Token::Numeric(n) => {
            if n == "0" {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        Token::Qualifier(q) => q.cmp(&Qualifier::Release),
        // unknown qualifiers order above a release, like Maven's own
        // comparator
        Token::Text(_) => Ordering::Greater,
        Token::Sublist(l) => compare_lists(l, &[]),
    }
}

fn compare_decimal(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Numeric(x), Token::Numeric(y)) => compare_decimal(x, y),
        (Token::Qualifier(x), Token::Qualifier(y)) => x.cmp(y),
        (Token::Text(x), Token::Text(y)) => x.cmp(y),
        (Token::Sublist(x), Token::Sublist(y)) => compare_lists(x, y),

        // non-zero numbers beat any alphabetic token; zero compares as
        // the alphabetic token would against the empty qualifier
        (Token::Numeric(n), Token::Qualifier(_) | Token::Text(_)) => {
            if n == "0" {
                compare_to_padding(b).reverse()
            } else {
                Ordering::Greater
            }
        }
        (Token::Qualifier(_) | Token::Text(_), Token::Numeric(_)) => {
            compare_tokens(b, a).reverse()
        }

        (Token::Qualifier(_), Token::Text(_)) => Ordering::Less,
        (Token::Text(_), Token::Qualifier(_)) => Ordering::Greater,

        // a `-` sub-list precedes the `.` continuation at the same spot
        (Token::Sublist(_), _) => Ordering::Less,
        (_, Token::Sublist(_)) => Ordering::Greater,
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use std::cmp::Ordering;

    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        MavenVersion::parse(a).cmp(&MavenVersion::parse(b))
    }

    #[rstest]
    #[case::sublist_before_continuation("1-a", "1.a")]
    #[case::sublist_number_before_continuation("1-1", "1.1")]
    #[case::rc_equals_cr("1-rc1", "1-cr2")]
    #[case::snapshot_before_release("1-SNAPSHOT", "1")]
    #[case::alpha_before_beta("1-alpha", "1-beta")]
    #[case::beta_before_next_major("1-beta", "2-alpha")]
    #[case::text_before_number("a", "1")]
    #[case::text_lexical("a", "b")]
    #[case::shorter_numeric_prefix("1.1.2", "1.2")]
    #[case::release_before_sp("1", "1-sp")]
    #[case::sp_increments("1-sp1", "1-sp2")]
    #[case::prerelease_before_release("1-rc1", "1")]
    #[case::text_within_sublist_before_number("1-a", "1-1")]
    #[case::ten_after_nine("1.9", "1.10")]
    fn test_ordered(#[case] earlier: &str, #[case] later: &str) {
        assert_eq!(cmp(earlier, later), Ordering::Less);
        assert_eq!(cmp(later, earlier), Ordering::Greater);
    }

    #[rstest]
    #[case::trailing_zero("1.0", "1.0.0")]
    #[case::bare_and_zero("1", "1.0")]
    #[case::trailing_dash_zero("1", "1-0")]
    #[case::rc_is_cr("1-rc1", "1-cr1")]
    #[case::ga_is_release("161", "161-ga")]
    #[case::final_is_release("161", "161-final")]
    #[case::transition_is_separator("single-23", "single23")]
    #[case::case_insensitive("1.0-ALPHA", "1.0-alpha")]
    #[case::whitespace_ignored(" 1.0 ", "1.0")]
    fn test_equal(#[case] a: &str, #[case] b: &str) {
        assert_eq!(cmp(a, b), Ordering::Equal);
        assert_eq!(cmp(b, a), Ordering::Equal);
        assert_eq!(MavenVersion::parse(a), MavenVersion::parse(b));
    }

    #[test]
    fn test_sp_after_release() {
        assert_eq!(cmp("1-sp1", "1"), Ordering::Greater);
    }

    #[test]
    fn test_total_order_on_sample() {
        let sample = [
            "1-alpha", "1-beta", "1-milestone", "1-rc1", "1-rc2", "1-SNAPSHOT", "1", "1-sp1",
            "1.0.1", "1.1", "2",
        ];
        for window in sample.windows(2) {
            assert_eq!(
                cmp(window[0], window[1]),
                Ordering::Less,
                "{} should order before {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn test_large_numeric_segments() {
        assert_eq!(
            cmp("1.18446744073709551616", "1.18446744073709551617"),
            Ordering::Less
        );
        assert_eq!(cmp("1.002", "1.2"), Ordering::Equal);
    }

    #[test]
    fn test_is_snapshot() {
        assert!(MavenVersion::parse("1.0-SNAPSHOT").is_snapshot());
        assert!(!MavenVersion::parse("1.0").is_snapshot());
    }

    #[rstest]
    #[case::inclusive_range("[1.0,2.0]", true)]
    #[case::exclusive_range("(,2.0)", true)]
    #[case::exact_range("[1.5]", true)]
    #[case::bare_version("1.5", false)]
    fn test_range_detection(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_version_range(version), expected);
    }
}
