//! JCAMP-DX decoder.
//!
//! Reads JCAMP-DX 4.24/5.01 text blocks (and the RRUFF dialect) into a
//! [`ParsedBlock`]: the header records plus the decoded X/Y arrays.
//! Supports `(XY..XY)` and `(X++(Y..Y))` tables with SQZ/DIF/DUP
//! compression, and `##DATA TYPE=LINK` compound blocks.

pub mod block;
pub mod codec;
pub mod dataset;
pub mod error;
pub mod header;

pub use block::{read_block, read_block_file, read_block_lines, ParsedBlock, ReadOptions, MAX_NESTING_DEPTH};
pub use dataset::{parse_dataset_line, DataLayout, DATA_FORMAT_XPPYY, DATA_FORMAT_XYXY};
pub use error::{JcampError, Result};
pub use header::{parse_header_line, HeaderOutcome, HeaderState, HeaderValue};
