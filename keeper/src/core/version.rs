//! Version-string ordering for update reporting.
//!
//! Tags look like `2.3.1` or `2.5-a`: dot-separated numeric components with
//! an optional single trailing letter (`-` and other separators before the
//! letter are insignificant, so `1.1-a` and `1.1a` are the same version).
//! Comparisons are conservative: anything undecidable (multi-letter
//! suffixes, non-numeric components) is "not newer" / "not equal".
//!
//! [`is_newer`] and [`is_equal`] expect input already passed through
//! [`sanitize_version`]; a leading `v` on only one side makes the pair
//! undecidable.

/// Strip a leading "version"/"v" prefix and surrounding whitespace;
/// returns a lowercased version string.
pub fn sanitize_version(s: &str) -> String {
    let mut v = s.to_lowercase();
    if let Some(rest) = v.strip_prefix("version") {
        v = rest.to_string();
    }
    if let Some(rest) = v.strip_prefix('v') {
        v = rest.to_string();
    }
    v.trim().to_string()
}

/// Split a version component into (digits, separators, letters):
/// the longest digit prefix, then everything up to the first alphanumeric
/// character, then the rest. Lowercases the input.
///
/// `"123abc"` → `("123", "", "abc")`, `"123-Abc4"` → `("123", "-", "abc4")`,
/// `"-123"` → `("", "-", "123")`.
pub fn consume_digits(s: &str) -> (String, String, String) {
    let lower = s.to_lowercase();
    let digit_end = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, tail) = lower.split_at(digit_end);
    let sep_end = tail
        .find(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        .unwrap_or(tail.len());
    let (separators, letters) = tail.split_at(sep_end);
    (
        digits.to_string(),
        separators.to_string(),
        letters.to_string(),
    )
}

/// Numeric components (None where non-numeric) plus the trailing letter run.
fn components(version: &str) -> (Vec<Option<i64>>, String) {
    let lower = version.to_lowercase();
    let mut parts: Vec<String> = lower.split('.').map(str::to_string).collect();
    let last = parts.last().cloned().unwrap_or_default();
    let (digits, _, letters) = consume_digits(&last);
    if let Some(slot) = parts.last_mut() {
        *slot = digits;
    }
    let nums = parts.iter().map(|p| p.parse::<i64>().ok()).collect();
    (nums, letters)
}

/// True if `candidate` is a strictly newer version than `current`.
///
/// A bare version is newer than the same version with a letter suffix
/// (`1.1.0` > `1.1.0a`), and a trailing `.0` does not change ordering
/// (`1.1.0` is not newer than `1.1`). Undecidable pairs (letter-suffix on
/// both sides, multi-letter suffixes, non-numeric components) are not newer.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let (va, la) = components(candidate);
    let (vb, lb) = components(current);
    if la.len() > 1 || lb.len() > 1 {
        return false;
    }
    for i in 0..va.len() {
        if i >= vb.len() {
            // Extra trailing .0 is the same version, not a newer one.
            return va[i] != Some(0);
        }
        let (Some(x), Some(y)) = (va[i], vb[i]) else {
            return false;
        };
        if x > y {
            return true;
        }
        if x < y {
            return false;
        }
        if i == va.len() - 1 && !lb.is_empty() {
            return la.is_empty();
        }
    }
    false
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Num(i64),
    Raw(String),
}

fn parse_part(p: &str) -> Part {
    match p.parse::<i64>() {
        Ok(n) => Part::Num(n),
        Err(_) => Part::Raw(p.to_string()),
    }
}

/// True if both strings name the same version (`1.2.0` == `1.2`,
/// `1.1-a` == `1.1a`). Sanitizes both sides first.
pub fn is_equal(a: &str, b: &str) -> bool {
    let sa = sanitize_version(a);
    let sb = sanitize_version(b);
    let mut pa: Vec<String> = sa.split('.').map(str::to_string).collect();
    let mut pb: Vec<String> = sb.split('.').map(str::to_string).collect();
    if pb.len() > pa.len() {
        std::mem::swap(&mut pa, &mut pb);
    }
    let (da, _, la) = consume_digits(pa.last().map_or("", String::as_str));
    let (db, _, lb) = consume_digits(pb.last().map_or("", String::as_str));
    if la != lb {
        return false;
    }
    if la.len() > 1 || lb.len() > 1 {
        return false;
    }
    if let Some(slot) = pa.last_mut() {
        *slot = da;
    }
    if let Some(slot) = pb.last_mut() {
        *slot = db;
    }
    let va: Vec<Part> = pa.iter().map(|p| parse_part(p)).collect();
    let vb: Vec<Part> = pb.iter().map(|p| parse_part(p)).collect();
    for i in 0..va.len() {
        if i >= vb.len() {
            return va[i] == Part::Num(0);
        }
        if va[i] != vb[i] {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_digits_splits_components() {
        assert_eq!(
            consume_digits("123abc"),
            ("123".into(), "".into(), "abc".into())
        );
        assert_eq!(
            consume_digits("123-Abc4"),
            ("123".into(), "-".into(), "abc4".into())
        );
        assert_eq!(consume_digits("-123"), ("".into(), "-".into(), "123".into()));
        assert_eq!(consume_digits("abc4"), ("".into(), "".into(), "abc4".into()));
        assert_eq!(consume_digits("123"), ("123".into(), "".into(), "".into()));
    }

    #[test]
    fn sanitize_strips_prefixes() {
        assert_eq!(sanitize_version("v2.3.1"), "2.3.1");
        assert_eq!(sanitize_version("Version 2.3.1"), "2.3.1");
        assert_eq!(sanitize_version(" 2.3.1 "), "2.3.1");
    }

    #[test]
    fn newer_orders_numeric_components() {
        assert!(is_newer("1.2.1", "1.2.0"));
        assert!(is_newer("1.1.0", "1.1.0a"));
        assert!(is_newer("1.2.a", "1.1.0"));
        assert!(!is_newer("1.1.0", "1.1"));
        assert!(!is_newer("1.1.0", "1.1.0"));
        assert!(!is_newer("1.1.0a", "1.1.0"));
    }

    #[test]
    fn newer_is_false_for_undecidable_pairs() {
        assert!(!is_newer("1.1.0a", "1.1.0b"));
        assert!(!is_newer("1.1.0ab", "1.1.0a"));
        assert!(!is_newer("1.1.a", "1.1.0"));
        assert!(!is_newer("1.1a.0", "1.1.0"));
        // is_newer does not sanitize; one-sided prefixes are undecidable.
        assert!(!is_newer("v2.3.1", "2.3.0"));
        assert!(is_newer(&sanitize_version("v2.3.1"), "2.3.0"));
    }

    #[test]
    fn equal_ignores_trailing_zero_and_separators() {
        assert!(is_equal("1.2.3", "1.2.3"));
        assert!(is_equal("1.2.0", "1.2"));
        assert!(is_equal("1.2", "1.2.0"));
        assert!(is_equal("1.1-a", "1.1a"));
        assert!(is_equal("1.a", "1.a"));
        assert!(!is_equal("1.1.0", "1.2.0"));
        assert!(!is_equal("1.1.0", "1.1.1"));
        assert!(!is_equal("1.1.1-a", "1.1.1"));
    }

    #[test]
    fn equal_is_false_for_multi_letter_suffixes() {
        assert!(!is_equal("1.1.0ab", "1.1.0ab"));
    }
}
