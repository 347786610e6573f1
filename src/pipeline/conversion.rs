/// Format detection and conversion between spectrum files and SciData JSON-LD
///
/// Every supported format reads into a `SciDataDocument` and writes back
/// out of one, so any pair of formats converts through the document.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::data::jcamp::{read_jcamp, write_jcamp_with};
use crate::data::rruff::{read_rruff, write_rruff_with};
use crate::data::scidata::SciDataDocument;
use crate::data::scidata_jsonld::{read_scidata_jsonld, write_scidata_jsonld};
use crate::data::sections::WriteOptions;
use crate::error::{ConvertError, Result};

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoFormat {
    Jcamp,
    Rruff,
    ScidataJsonld,
}

impl IoFormat {
    pub const ALL: [IoFormat; 3] = [IoFormat::Jcamp, IoFormat::Rruff, IoFormat::ScidataJsonld];

    pub fn name(&self) -> &'static str {
        match self {
            IoFormat::Jcamp => "jcamp",
            IoFormat::Rruff => "rruff",
            IoFormat::ScidataJsonld => "scidata-jsonld",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            IoFormat::Jcamp => &["jdx", "dx", "jcamp"],
            IoFormat::Rruff => &["rruff"],
            IoFormat::ScidataJsonld => &["jsonld", "json"],
        }
    }

    /// Default writer options for the format.
    pub fn write_options(&self) -> WriteOptions {
        match self {
            IoFormat::Rruff => WriteOptions::rruff(),
            _ => WriteOptions::jcamp(),
        }
    }
}

impl fmt::Display for IoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for IoFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        IoFormat::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}

/// Detect the format of a path from its extension
pub fn detect_format(path: &Path) -> Result<IoFormat> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    IoFormat::ALL
        .into_iter()
        .find(|f| f.extensions().contains(&ext.as_str()))
        .ok_or_else(|| ConvertError::UnknownFormat(path.display().to_string()))
}

/// Read a file into a SciData document
pub fn read(path: &Path, format: IoFormat) -> Result<SciDataDocument> {
    log::info!("Reading {} as {}", path.display(), format);
    match format {
        IoFormat::Jcamp => read_jcamp(path),
        IoFormat::Rruff => read_rruff(path),
        IoFormat::ScidataJsonld => read_scidata_jsonld(path),
    }
}

/// Write a SciData document with the format's default options
pub fn write(path: &Path, doc: &SciDataDocument, format: IoFormat) -> Result<()> {
    write_with(path, doc, format, &format.write_options())
}

/// Write a SciData document. `options` apply to the text formats only.
pub fn write_with(path: &Path, doc: &SciDataDocument, format: IoFormat, options: &WriteOptions) -> Result<()> {
    log::info!("Writing {} as {}", path.display(), format);
    match format {
        IoFormat::Jcamp => write_jcamp_with(path, doc, options),
        IoFormat::Rruff => write_rruff_with(path, doc, options),
        IoFormat::ScidataJsonld => write_scidata_jsonld(path, doc),
    }
}

/// Convert `input` to `output`. Formats left as `None` are detected from
/// the file extensions. Returns the intermediate document.
pub fn convert(
    input: &Path,
    output: &Path,
    from: Option<IoFormat>,
    to: Option<IoFormat>,
) -> Result<SciDataDocument> {
    convert_with(input, output, from, to, None)
}

/// [`convert`] with explicit writer options.
pub fn convert_with(
    input: &Path,
    output: &Path,
    from: Option<IoFormat>,
    to: Option<IoFormat>,
    options: Option<&WriteOptions>,
) -> Result<SciDataDocument> {
    let from = match from {
        Some(f) => f,
        None => detect_format(input)?,
    };
    let to = match to {
        Some(f) => f,
        None => detect_format(output)?,
    };

    let doc = read(input, from)?;
    let defaults = to.write_options();
    write_with(output, &doc, to, options.unwrap_or(&defaults))?;
    Ok(doc)
}
