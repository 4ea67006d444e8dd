//! Canonical ISBN identifiers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// ISBN-shaped token: optional "ISBN"/"ISBN-10"/"ISBN-13" label, optional
/// 978/979 prefix, a 9+ character digit/hyphen/space body and a check character.
/// Group 1 is the token without its label.
static ISBN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:ISBN(?:-1[03])?:?\s*)?((?:97[89][ -]?)?[0-9][0-9 -]{8,}[0-9Xx])")
        .expect("valid ISBN regex")
});

/// A checksum-validated ISBN-10 or ISBN-13, stored as digits (and a trailing
/// `X` for ISBN-10) only. The only way to build one is through [`Isbn::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Canonicalize and validate an ISBN-like string.
    ///
    /// Everything except digits and `X` is dropped. When the remaining run is
    /// longer than 13 characters (a greedy match that swallowed a trailing
    /// number), the 13- and 10-character prefixes are tried in that order.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical: String = raw
            .chars()
            .filter_map(|c| match c {
                '0'..='9' => Some(c),
                'x' | 'X' => Some('X'),
                _ => None,
            })
            .collect();

        let mut candidates = vec![canonical.as_str()];
        if canonical.len() > 13 {
            candidates.push(&canonical[..13]);
            candidates.push(&canonical[..10]);
        } else if canonical.len() > 10 && canonical.len() != 13 {
            candidates.push(&canonical[..10]);
        }

        candidates
            .into_iter()
            .find(|c| is_valid_isbn10(c) || is_valid_isbn13(c))
            .map(|c| Isbn(c.to_string()))
    }

    /// Scan free text for ISBN-shaped tokens, returning the first one that
    /// passes checksum validation (document order).
    pub fn find_in_text(text: &str) -> Option<Self> {
        ISBN_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| Isbn::parse(m.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Isbn {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Isbn::parse(&value).ok_or_else(|| format!("not a valid ISBN: {value}"))
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

/// ISBN-10 checksum: weighted sum (10..1) divisible by 11, `X` only as check digit.
pub fn is_valid_isbn10(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let mut sum = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        let value = match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

/// ISBN-13 checksum: alternating 1/3 weights, divisible by 10, 978/979 prefix.
pub fn is_valid_isbn13(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    if !(s.starts_with("978") || s.starts_with("979")) {
        return false;
    }
    let sum: u32 = bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 {
                d
            } else {
                d * 3
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonicalizes_labelled_isbn13() {
        let isbn = Isbn::parse("ISBN 978-3-16-148410-0").unwrap();
        assert_eq!(isbn.as_str(), "9783161484100");
        assert!(isbn.is_isbn13());
    }

    #[test]
    fn test_rejects_bad_checksum() {
        assert!(Isbn::parse("1234567890").is_none());
        assert!(Isbn::parse("9783161484101").is_none());
    }

    #[test]
    fn test_isbn10_with_check_x() {
        let isbn = Isbn::parse("0-8044-2957-x").unwrap();
        assert_eq!(isbn.as_str(), "080442957X");
        assert!(!isbn.is_isbn13());
    }

    #[test]
    fn test_find_in_text_skips_invalid_tokens() {
        let text = "Printed 1234567890 and later ISBN-13: 978-0-306-40615-7, reprint 2001.";
        let isbn = Isbn::find_in_text(text).unwrap();
        assert_eq!(isbn.as_str(), "9780306406157");
    }

    #[test]
    fn test_find_in_text_none() {
        assert!(Isbn::find_in_text("no identifiers in this sentence").is_none());
    }

    #[test]
    fn test_label_digits_are_not_part_of_identifier() {
        let isbn = Isbn::find_in_text("ISBN-10: 0306406152").unwrap();
        assert_eq!(isbn.as_str(), "0306406152");
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: Isbn = serde_json::from_str("\"9783161484100\"").unwrap();
        assert_eq!(ok.as_str(), "9783161484100");
        assert!(serde_json::from_str::<Isbn>("\"1234567890\"").is_err());
    }

    proptest! {
        #[test]
        fn accepted_identifiers_are_canonical(raw in "[0-9X -]{0,20}") {
            if let Some(isbn) = Isbn::parse(&raw) {
                let s = isbn.as_str();
                prop_assert!(s.len() == 10 || s.len() == 13);
                prop_assert!(s.chars().all(|c| c.is_ascii_digit() || c == 'X'));
                prop_assert!(is_valid_isbn10(s) || is_valid_isbn13(s));
            }
        }

        #[test]
        fn hyphenation_does_not_change_result(digits in "97[89][0-9]{9}") {
            let checked = {
                let sum: u32 = digits.bytes().enumerate()
                    .map(|(i, b)| (b - b'0') as u32 * if i % 2 == 0 { 1 } else { 3 })
                    .sum();
                format!("{}{}", digits, (10 - sum % 10) % 10)
            };
            let hyphenated = format!("{}-{}-{}", &checked[..3], &checked[3..8], &checked[8..]);
            prop_assert_eq!(Isbn::parse(&checked), Isbn::parse(&hyphenated));
            prop_assert!(Isbn::parse(&checked).is_some());
        }
    }
}
