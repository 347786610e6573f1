pub mod jcamp;
pub mod rruff;
pub mod scidata;
pub mod scidata_jsonld;
pub mod sections;
