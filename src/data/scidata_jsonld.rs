/// SciData JSON-LD files (https://stuchalk.github.io/scidata/)

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::scidata::SciDataDocument;
use crate::error::Result;

/// Read a SciData JSON-LD file.
pub fn read_scidata_jsonld<P: AsRef<Path>>(path: P) -> Result<SciDataDocument> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write a document as indented JSON-LD.
pub fn write_scidata_jsonld<P: AsRef<Path>>(path: P, doc: &SciDataDocument) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, doc)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scidata::Author;

    #[test]
    fn test_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.jsonld");

        let mut doc = SciDataDocument::new("2024-01-01 00:00:00");
        doc.graph.title = Some("Quartz".to_string());
        doc.graph.author.push(Author {
            id: "author/1".to_string(),
            kind: "dc:creator".to_string(),
            name: "A. Person".to_string(),
        });
        write_scidata_jsonld(&path, &doc).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"@context\""));
        assert_eq!(read_scidata_jsonld(&path).unwrap(), doc);
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonld");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_scidata_jsonld(&path),
            Err(crate::error::ConvertError::Json(_))
        ));
    }
}
