//! Data-table line parsers for the two supported tabular layouts.
//!
//! - `(XY..XY)`: free-format X,Y pairs separated by commas, semicolons or
//!   whitespace.
//! - `(X++(Y..Y))`: one abscissa followed by a run of ordinates, optionally
//!   compressed with SQZ/DIF/DUP characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{dif_digit, expand_dup, is_data_char, sqz_digit};
use crate::error::{JcampError, Result};

/// Tag of the X,Y pairs layout.
pub const DATA_FORMAT_XYXY: &str = "(XY..XY)";

/// Tag of the single X, multiple Y layout.
pub const DATA_FORMAT_XPPYY: &str = "(X++(Y..Y))";

/// Tabular layout of a data section, selected by the value of its
/// `##XYDATA=` / `##XYPOINTS=` / `##PEAK TABLE=` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataLayout {
    XyPairs,
    SingleXMultiY,
}

impl DataLayout {
    /// Select the layout for a data-section tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim() {
            DATA_FORMAT_XYXY => Ok(DataLayout::XyPairs),
            DATA_FORMAT_XPPYY => Ok(DataLayout::SingleXMultiY),
            other => Err(JcampError::UnsupportedDataType(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DataLayout::XyPairs => DATA_FORMAT_XYXY,
            DataLayout::SingleXMultiY => DATA_FORMAT_XPPYY,
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for DataLayout {
    type Err = JcampError;

    fn from_str(s: &str) -> Result<Self> {
        DataLayout::from_tag(s)
    }
}

/// One decoded `(X++(Y..Y))` line.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    /// Element 0 is the abscissa anchor, the rest are ordinates.
    pub values: Vec<f64>,
    /// The final ordinate was written in DIF form, so the next line starts
    /// with a Y-value check.
    pub ends_in_difference: bool,
}

/// Parse one data line with the given layout.
pub fn parse_dataset_line(line: &str, layout: DataLayout) -> Result<Vec<f64>> {
    match layout {
        DataLayout::XyPairs => parse_xy_pairs_line(line),
        DataLayout::SingleXMultiY => parse_single_x_multi_y_line(line),
    }
}

/// Parse a `(XY..XY)` line into a flat list of alternating X, Y values.
pub fn parse_xy_pairs_line(line: &str) -> Result<Vec<f64>> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<f64>().map_err(|_| JcampError::InvalidNumber {
                token: token.to_string(),
                line: line.to_string(),
            })
        })
        .collect()
}

/// Parse a `(X++(Y..Y))` line into `[x, y1, y2, ...]`.
pub fn parse_single_x_multi_y_line(line: &str) -> Result<Vec<f64>> {
    decode_single_x_multi_y_line(line).map(|decoded| decoded.values)
}

/// Numeral being accumulated by the `(X++(Y..Y))` scanner.
#[derive(Default)]
struct Numeral {
    text: String,
    /// DIF character that opened this numeral, if any.
    difference: Option<char>,
}

impl Numeral {
    fn seeded(text: &str, difference: Option<char>) -> Self {
        Self {
            text: text.to_string(),
            difference,
        }
    }

    /// Close the numeral, pushing its value. Returns whether a value was
    /// emitted and whether it was a difference.
    fn close(self, values: &mut Vec<f64>, line: &str) -> Result<Option<bool>> {
        let token = self.text.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let value: f64 = token.parse().map_err(|_| JcampError::InvalidNumber {
            token: token.to_string(),
            line: line.to_string(),
        })?;
        match self.difference {
            Some(character) => {
                let base = values.last().copied().ok_or_else(|| JcampError::DanglingCompression {
                    character,
                    line: line.to_string(),
                })?;
                values.push(base + value);
                Ok(Some(true))
            }
            None => {
                values.push(value);
                Ok(Some(false))
            }
        }
    }
}

/// Decode a `(X++(Y..Y))` line, keeping track of whether it ends in DIF
/// form.
pub fn decode_single_x_multi_y_line(line: &str) -> Result<DecodedLine> {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    let expanded = expand_dup(&collapsed)?;

    let mut values: Vec<f64> = Vec::new();
    let mut pending = Numeral::default();
    let mut ends_in_difference = false;

    for ch in expanded.chars() {
        if !is_data_char(ch) {
            return Err(JcampError::UnknownCharacter {
                character: ch,
                line: line.to_string(),
            });
        }
        if ch.is_ascii_digit() || ch == '.' {
            pending.text.push(ch);
            continue;
        }

        // What remains is a separator, an SQZ or a DIF character.
        let next = match (sqz_digit(ch), dif_digit(ch)) {
            (Some(seed), _) => Numeral::seeded(seed, None),
            (None, Some(digit)) => Numeral::seeded(&digit.to_string(), Some(ch)),
            (None, None) => Numeral::default(),
        };

        if let Some(was_difference) = std::mem::replace(&mut pending, next).close(&mut values, line)? {
            ends_in_difference = was_difference;
        }
    }
    if let Some(was_difference) = pending.close(&mut values, line)? {
        ends_in_difference = was_difference;
    }

    Ok(DecodedLine {
        values,
        ends_in_difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::dup_count;

    const TARGET: [f64; 6] = [99.0, 98.0, 97.0, 96.0, 98.0, 93.0];

    #[test]
    fn test_single_x_multi_y_equivalent_encodings() {
        for line in [
            "99 98 97 96 98 93",
            "99,98,97,96,98,93",
            "99+98+97+96+98+93",
            "99I8I7I6I8I3",
            "99jjjKn",
            "99jUKn",
        ] {
            assert_eq!(parse_single_x_multi_y_line(line).unwrap(), TARGET.to_vec(), "line {:?}", line);
        }
    }

    #[test]
    fn test_single_x_multi_y_unknown_character() {
        match parse_single_x_multi_y_line("99 98 *") {
            Err(JcampError::UnknownCharacter { character, line }) => {
                assert_eq!(character, '*');
                assert_eq!(line, "99 98 *");
            }
            other => panic!("expected UnknownCharacter, got {:?}", other),
        }
    }

    #[test]
    fn test_only_data_characters_decode() {
        for byte in 0x21u8..0x7f {
            let ch = byte as char;
            if dup_count(ch).is_some() {
                continue;
            }
            let result = decode_single_x_multi_y_line(&format!("1 2{}", ch));
            if is_data_char(ch) {
                assert!(
                    !matches!(result, Err(JcampError::UnknownCharacter { .. })),
                    "{:?} rejected",
                    ch
                );
            } else {
                assert!(
                    matches!(result, Err(JcampError::UnknownCharacter { character, .. }) if character == ch),
                    "{:?} accepted",
                    ch
                );
            }
        }
    }

    #[test]
    fn test_single_x_multi_y_collapses_whitespace() {
        let values = parse_single_x_multi_y_line("  450.5   12\t-3  ").unwrap();
        assert_eq!(values, vec![450.5, 12.0, -3.0]);
    }

    #[test]
    fn test_single_x_multi_y_sqz_negative_and_decimal() {
        let values = parse_single_x_multi_y_line("1000a23@B.5").unwrap();
        assert_eq!(values.len(), 4);
        assert!((values[0] - 1000.0).abs() < 1e-9);
        assert!((values[1] - -123.0).abs() < 1e-9);
        assert!((values[2] - 0.0).abs() < 1e-9);
        assert!((values[3] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_decode_reports_trailing_difference() {
        let decoded = decode_single_x_multi_y_line("1000A00KL%T").unwrap();
        assert_eq!(decoded.values, vec![1000.0, 100.0, 102.0, 105.0, 105.0, 105.0]);
        assert!(decoded.ends_in_difference);

        let decoded = decode_single_x_multi_y_line("1000A00B00").unwrap();
        assert_eq!(decoded.values, vec![1000.0, 100.0, 200.0]);
        assert!(!decoded.ends_in_difference);
    }

    #[test]
    fn test_difference_without_base_is_error() {
        assert!(matches!(
            decode_single_x_multi_y_line("J5"),
            Err(JcampError::DanglingCompression { character: 'J', .. })
        ));
    }

    #[test]
    fn test_lone_sign_is_invalid_number() {
        assert!(matches!(
            parse_single_x_multi_y_line("99 +"),
            Err(JcampError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_xy_pairs_separators() {
        let values = parse_xy_pairs_line("1.0, 100.0; 2.0 200.0\t3.0,300.0").unwrap();
        assert_eq!(values, vec![1.0, 100.0, 2.0, 200.0, 3.0, 300.0]);
    }

    #[test]
    fn test_xy_pairs_exponents() {
        let values = parse_xy_pairs_line("1.5E2, -2.0e-1").unwrap();
        assert!((values[0] - 150.0).abs() < 1e-9);
        assert!((values[1] - -0.2).abs() < 1e-12);
    }

    #[test]
    fn test_xy_pairs_rejects_garbage() {
        assert!(matches!(
            parse_xy_pairs_line("1.0, abc"),
            Err(JcampError::InvalidNumber { token, .. }) if token == "abc"
        ));
    }

    #[test]
    fn test_layout_from_tag() {
        assert_eq!(DataLayout::from_tag("(XY..XY)").unwrap(), DataLayout::XyPairs);
        assert_eq!(DataLayout::from_tag(" (X++(Y..Y)) ").unwrap(), DataLayout::SingleXMultiY);
        assert!(matches!(
            DataLayout::from_tag("(XYW..XYW)"),
            Err(JcampError::UnsupportedDataType(tag)) if tag == "(XYW..XYW)"
        ));
        assert_eq!("(XY..XY)".parse::<DataLayout>().unwrap().tag(), DATA_FORMAT_XYXY);
    }

    #[test]
    fn test_parse_dataset_line_dispatch() {
        assert_eq!(
            parse_dataset_line("1 2 3 4", DataLayout::XyPairs).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            parse_dataset_line("5J", DataLayout::SingleXMultiY).unwrap(),
            vec![5.0, 6.0]
        );
    }
}
