/// Errors raised while converting between spectrum files and SciData documents

use std::io;

use jcamp_dx::JcampError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JCAMP-DX error: {0}")]
    Jcamp(#[from] JcampError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
    #[error("Document has no {0}")]
    MissingField(String),
    #[error("No unit mapping for {0:?}")]
    UnknownUnit(String),
    #[error("Attribute {property:?} has non-numeric value {value:?}")]
    InvalidAttribute { property: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
