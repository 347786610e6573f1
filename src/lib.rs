//! Conversion of JCAMP-DX and RRUFF spectra to and from SciData JSON-LD.

pub mod data;
pub mod error;
pub mod pipeline;

pub use data::jcamp::{read_jcamp, translate_jcamp, write_jcamp, write_jcamp_with};
pub use data::rruff::{read_rruff, translate_rruff, write_rruff, write_rruff_with};
pub use data::scidata::SciDataDocument;
pub use data::scidata_jsonld::{read_scidata_jsonld, write_scidata_jsonld};
pub use data::sections::WriteOptions;
pub use error::{ConvertError, Result};
pub use pipeline::conversion::{convert, convert_with, detect_format, read, write, write_with, IoFormat};
