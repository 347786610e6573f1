//! Errors raised while decoding a JCAMP-DX file.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JcampError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line} is not valid UTF-8")]
    InvalidEncoding { line: usize },
    #[error("Unknown character '{character}' in line: {line}")]
    UnknownCharacter { character: char, line: String },
    #[error("Unsupported data table format: {0:?}")]
    UnsupportedDataType(String),
    #[error("Header line produced more than one key ({keys:?}): {line}")]
    MultiHeaderKey { line: String, keys: Vec<String> },
    #[error("Invalid number {token:?} in line: {line}")]
    InvalidNumber { token: String, line: String },
    #[error("Compression character '{character}' has nothing to apply to in line: {line}")]
    DanglingCompression { character: char, line: String },
    #[error("(X++(Y..Y)) data requires a LASTX header")]
    MissingLastX,
    #[error("Compound blocks nested deeper than {depth} levels")]
    NestingTooDeep { depth: usize },
}

pub type Result<T> = std::result::Result<T, JcampError>;
