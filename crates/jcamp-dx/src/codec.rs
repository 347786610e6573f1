//! ASDF character compression tables.
//!
//! JCAMP-DX compresses ordinate tables with three single-character forms
//! (see "Compression Table" in the JCAMP-DX 4.24 standard):
//!
//! - SQZ: a signed leading digit that starts a new, absolute value
//!   (`@`=+0, `A`..`I`=+1..+9, `a`..`i`=-1..-9). `+`, `-` and `,` are
//!   accepted in the same position for PAC and CSV style lines.
//! - DIF: a signed leading digit of a value that is a difference against
//!   the previously emitted value (`%`=0, `J`..`R`=1..9, `j`..`r`=-1..-9).
//! - DUP: a repeat count for the preceding character (`S`..`Z`=1..8, `s`=9).

use crate::error::{JcampError, Result};

/// Decode an SQZ character into the text that seeds a new numeral.
///
/// The comma form decodes to a single space so CSV lines behave like
/// whitespace-separated ones.
pub fn sqz_digit(c: char) -> Option<&'static str> {
    let s = match c {
        '@' => "+0",
        'A' => "+1",
        'B' => "+2",
        'C' => "+3",
        'D' => "+4",
        'E' => "+5",
        'F' => "+6",
        'G' => "+7",
        'H' => "+8",
        'I' => "+9",
        'a' => "-1",
        'b' => "-2",
        'c' => "-3",
        'd' => "-4",
        'e' => "-5",
        'f' => "-6",
        'g' => "-7",
        'h' => "-8",
        'i' => "-9",
        '+' => "+",
        '-' => "-",
        ',' => " ",
        _ => return None,
    };
    Some(s)
}

/// Decode a DIF character into its signed leading digit.
pub fn dif_digit(c: char) -> Option<i8> {
    match c {
        '%' => Some(0),
        'J'..='R' => Some((c as u8 - b'J' + 1) as i8),
        'j'..='r' => Some(-((c as u8 - b'j' + 1) as i8)),
        _ => None,
    }
}

/// Decode a DUP character into its repeat count.
pub fn dup_count(c: char) -> Option<usize> {
    match c {
        'S'..='Z' => Some((c as u8 - b'S' + 1) as usize),
        's' => Some(9),
        _ => None,
    }
}

/// Expand every DUP character of `line` into `count - 1` extra copies of
/// the character preceding it in the output built so far.
///
/// `"9U"` becomes `"999"`. The rewrite runs before tokenization because a
/// DUP may repeat any character, including SQZ/DIF characters or the
/// result of an earlier expansion.
pub fn expand_dup(line: &str) -> Result<String> {
    let mut out = String::with_capacity(line.len() * 2);
    for ch in line.chars() {
        match dup_count(ch) {
            Some(count) => {
                let prev = out.chars().last().ok_or_else(|| JcampError::DanglingCompression {
                    character: ch,
                    line: line.to_string(),
                })?;
                for _ in 1..count {
                    out.push(prev);
                }
            }
            None => out.push(ch),
        }
    }
    Ok(out)
}

/// Whether `c` may appear in a compressed ordinate line after DUP expansion.
pub fn is_data_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ' ' || sqz_digit(c).is_some() || dif_digit(c).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQZ_ALPHABET: &str = "@ABCDEFGHIabcdefghi+-,";
    const DIF_ALPHABET: &str = "%JKLMNOPQRjklmnopqr";
    const DUP_ALPHABET: &str = "STUVWXYZs";

    #[test]
    fn test_expand_dup() {
        assert_eq!(expand_dup("9U").unwrap(), "999");
        assert_eq!(expand_dup("99jU").unwrap(), "99jjj");
        assert_eq!(expand_dup("A0S").unwrap(), "A0");
        assert_eq!(expand_dup("1s").unwrap(), "111111111");
        assert_eq!(expand_dup("no dup here 123").unwrap(), "no dup here 123");
    }

    #[test]
    fn test_expand_dup_chains_on_output() {
        // The second DUP repeats the last character written, which came
        // from the first expansion.
        assert_eq!(expand_dup("5TT").unwrap(), "555");
    }

    #[test]
    fn test_expand_dup_leading_count_is_error() {
        match expand_dup("U12") {
            Err(JcampError::DanglingCompression { character, .. }) => assert_eq!(character, 'U'),
            other => panic!("expected DanglingCompression, got {:?}", other),
        }
    }

    #[test]
    fn test_sqz_table_complete() {
        for c in SQZ_ALPHABET.chars() {
            assert!(sqz_digit(c).is_some(), "SQZ char {} not decoded", c);
        }
        assert_eq!(sqz_digit('@'), Some("+0"));
        assert_eq!(sqz_digit('E'), Some("+5"));
        assert_eq!(sqz_digit('i'), Some("-9"));
        assert_eq!(sqz_digit(','), Some(" "));
        assert_eq!(sqz_digit('J'), None);
    }

    #[test]
    fn test_dif_table_complete() {
        for c in DIF_ALPHABET.chars() {
            assert!(dif_digit(c).is_some(), "DIF char {} not decoded", c);
        }
        assert_eq!(dif_digit('%'), Some(0));
        assert_eq!(dif_digit('J'), Some(1));
        assert_eq!(dif_digit('R'), Some(9));
        assert_eq!(dif_digit('j'), Some(-1));
        assert_eq!(dif_digit('r'), Some(-9));
        assert_eq!(dif_digit('A'), None);
    }

    #[test]
    fn test_dup_table_complete() {
        let counts: Vec<usize> = DUP_ALPHABET.chars().filter_map(dup_count).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(dup_count('%'), None);
    }

    #[test]
    fn test_alphabets_are_disjoint() {
        for c in SQZ_ALPHABET.chars() {
            assert!(!DIF_ALPHABET.contains(c));
            assert!(!DUP_ALPHABET.contains(c));
        }
        for c in DIF_ALPHABET.chars() {
            assert!(!DUP_ALPHABET.contains(c));
        }
    }

    #[test]
    fn test_is_data_char() {
        assert!(is_data_char('7'));
        assert!(is_data_char('.'));
        assert!(is_data_char(' '));
        assert!(is_data_char('@'));
        assert!(is_data_char('q'));
        assert!(!is_data_char('*'));
        assert!(!is_data_char('S'));
    }
}
