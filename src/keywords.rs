//! Set operations over keyword sequences.
//!
//! Keywords come out of exiftool as an ordered list that may repeat entries.
//! Rule conditions, on the other hand, are sets. The three functions here
//! bridge the two with **exact**, case-sensitive string comparison: `"art"`
//! never matches `"cart"`.
//!
//! | Function | Result | Order |
//! |---|---|---|
//! | [`dedup`] | each keyword once | first occurrence in the input |
//! | [`intersection`] | elements of `b` also in `a`, once each | `b`'s order |
//! | [`difference`] | `a` with one occurrence cancelled per element of `b` | `a`'s order |
//!
//! Callers should treat the order of [`difference`] as incidental.

use std::collections::{HashMap, HashSet};

/// Remove repeated keywords, keeping the first occurrence of each.
pub fn dedup<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.as_ref())
        .filter(|k| seen.insert(*k))
        .map(String::from)
        .collect()
}

/// Keywords of `b` that also appear in `a`.
///
/// The result is deduplicated and follows the order of `b`.
///
/// ```text
/// intersection(["family", "beach"], ["beach", "work", "beach"]) == ["beach"]
/// ```
pub fn intersection<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let present: HashSet<&str> = a.iter().map(|k| k.as_ref()).collect();
    dedup(b)
        .into_iter()
        .filter(|k| present.contains(k.as_str()))
        .collect()
}

/// Multiset difference `a - b`.
///
/// Every occurrence in `b` cancels one occurrence in `a`. Whatever is left
/// of `a` is returned. Elements that only appear in `b` are ignored.
///
/// ```text
/// difference(["a", "a", "b"], ["a", "c"]) == ["a", "b"]
/// ```
pub fn difference<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let mut cancel: HashMap<&str, usize> = HashMap::new();
    for k in b {
        *cancel.entry(k.as_ref()).or_default() += 1;
    }

    let mut result = Vec::new();
    for k in a.iter().map(|k| k.as_ref()) {
        match cancel.get_mut(k) {
            Some(n) if *n > 0 => *n -= 1,
            _ => result.push(k.to_string()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(v: &[String]) -> BTreeSet<&str> {
        v.iter().map(String::as_str).collect()
    }

    // =========================================================================
    // dedup
    // =========================================================================

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        assert_eq!(
            dedup(&["b", "a", "b", "c", "a"]),
            vec!["b".to_string(), "a".into(), "c".into()]
        );
    }

    #[test]
    fn dedup_empty() {
        let empty: [&str; 0] = [];
        assert!(dedup(&empty).is_empty());
    }

    // =========================================================================
    // intersection
    // =========================================================================

    #[test]
    fn intersection_follows_order_of_second_argument() {
        let a = ["family", "beach", "sunset"];
        let b = ["sunset", "work", "family"];
        assert_eq!(intersection(&a, &b), vec!["sunset", "family"]);
    }

    #[test]
    fn intersection_deduplicates() {
        let a = ["beach", "beach"];
        let b = ["beach", "beach"];
        assert_eq!(intersection(&a, &b), vec!["beach"]);
    }

    #[test]
    fn intersection_is_exact_not_substring() {
        let a = ["cart", "artwork"];
        let b = ["art"];
        assert!(intersection(&a, &b).is_empty());
    }

    #[test]
    fn intersection_is_case_sensitive() {
        let a = ["Beach"];
        let b = ["beach"];
        assert!(intersection(&a, &b).is_empty());
    }

    #[test]
    fn intersection_with_empty_side() {
        let empty: [&str; 0] = [];
        assert!(intersection(&empty, &["a"]).is_empty());
        assert!(intersection(&["a"], &empty).is_empty());
    }

    // =========================================================================
    // difference
    // =========================================================================

    #[test]
    fn difference_drops_shared_keeps_rest() {
        let result = difference(&["family", "beach", "work"], &["work"]);
        assert_eq!(set(&result), BTreeSet::from(["family", "beach"]));
    }

    #[test]
    fn difference_cancels_one_for_one() {
        let result = difference(&["a", "a", "b"], &["a"]);
        assert_eq!(result.iter().filter(|k| *k == "a").count(), 1);
        assert!(result.contains(&"b".to_string()));
    }

    #[test]
    fn difference_ignores_elements_only_in_b() {
        let result = difference(&["a"], &["z"]);
        assert_eq!(result, vec!["a"]);
    }

    #[test]
    fn difference_everything_removed() {
        let result = difference(&["work", "draft"], &["draft", "work"]);
        assert!(result.is_empty());
    }

    #[test]
    fn difference_with_empty_b_is_identity() {
        let empty: [&str; 0] = [];
        assert_eq!(difference(&["x", "y"], &empty), vec!["x", "y"]);
    }
}
