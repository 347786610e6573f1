//! Labelled-data-record (`##KEY=VALUE`) parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JcampError, Result};

/// Prefix of every labelled data record.
pub const HEADER_MARKER: &str = "##";
/// Prefix of comment lines.
pub const COMMENT_MARKER: &str = "$$";

pub const DATA_TYPE_KEY: &str = "data type";
pub const LINK_DATA_TYPE: &str = "link";
pub const END_KEY: &str = "end";
pub const TITLE_KEY: &str = "title";

/// Drop a trailing `$$` comment.
pub fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_MARKER) {
        Some(at) => line[..at].trim_end(),
        None => line,
    }
}

/// Keys whose record opens a data table.
pub const DATA_SECTION_KEYS: [&str; 3] = ["xydata", "xypoints", "peak table"];

/// A header value, coerced the way JCAMP-DX labels are usually read:
/// digits-only values are integers, then floats, then text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn coerce(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(v) = raw.parse::<i64>() {
                return HeaderValue::Int(v);
            }
        }
        match raw.parse::<f64>() {
            Ok(v) => HeaderValue::Float(v),
            Err(_) => HeaderValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Append a continuation line. The value becomes text.
    pub fn append_line(&mut self, text: &str) {
        *self = HeaderValue::Text(format!("{}\n{}", self, text));
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{}", v),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Text(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

/// Normalize a label: trimmed, lowercased, `datatype` folded into
/// `data type`.
pub fn normalize_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    if key == "datatype" {
        DATA_TYPE_KEY.to_string()
    } else {
        key
    }
}

/// Split a `##KEY=VALUE` line into its normalized key and trimmed value.
/// Returns `None` for lines that are not labelled data records.
pub fn split_label(line: &str) -> Option<(String, &str)> {
    let rest = line.trim().strip_prefix(HEADER_MARKER)?;
    let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
    Some((normalize_key(key), value.trim()))
}

/// Key of a second `##KEY=` record hidden inside a value.
fn embedded_label(value: &str) -> Option<String> {
    let start = value.find(HEADER_MARKER)?;
    let (key, _) = value[start + HEADER_MARKER.len()..].split_once('=')?;
    Some(normalize_key(key))
}

/// Header state threaded through the lines of one block.
#[derive(Debug, Clone)]
pub struct HeaderState {
    pub entries: BTreeMap<String, HeaderValue>,
    pub in_data_section: bool,
    pub last_key: Option<String>,
    /// `##DATA TYPE=LINK` was seen: this block holds nested blocks.
    pub compound: bool,
    /// Raw value of the record that opened the current data table.
    pub data_tag: Option<String>,
    /// Non-header lines outside a data table extend the previous value.
    pub allow_continuation: bool,
}

impl Default for HeaderState {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            in_data_section: false,
            last_key: None,
            compound: false,
            data_tag: None,
            allow_continuation: true,
        }
    }
}

/// What a line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// A `##KEY=VALUE` record stored under `key`.
    Record { key: String },
    /// Continuation of the multi-line value under `key`.
    Continuation { key: String },
    /// Anything else; the caller decides (usually a data line).
    NotHeader,
}

/// Interpret one raw line against the accumulated header state.
pub fn parse_header_line(line: &str, state: &mut HeaderState) -> Result<HeaderOutcome> {
    let line = line.trim();

    let Some((key, value)) = split_label(line) else {
        if state.allow_continuation && !state.in_data_section {
            if let Some(key) = state.last_key.clone() {
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.append_line(line);
                }
                return Ok(HeaderOutcome::Continuation { key });
            }
        }
        return Ok(HeaderOutcome::NotHeader);
    };

    if let Some(second) = embedded_label(value) {
        return Err(JcampError::MultiHeaderKey {
            line: line.to_string(),
            keys: vec![key, second],
        });
    }

    if key == DATA_TYPE_KEY && value.eq_ignore_ascii_case(LINK_DATA_TYPE) {
        state.compound = true;
    }

    state.entries.insert(key.clone(), HeaderValue::coerce(value));

    if DATA_SECTION_KEYS.contains(&key.as_str()) {
        state.in_data_section = true;
        state.data_tag = Some(value.to_string());
    } else if key == END_KEY {
        state.in_data_section = true;
    } else if state.in_data_section {
        state.in_data_section = false;
    }

    state.last_key = Some(key.clone());
    Ok(HeaderOutcome::Record { key })
}
