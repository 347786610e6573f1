/// RRUFF <-> SciData JSON-LD
///
/// RRUFF (https://rruff.info) distributes Raman spectra of minerals as a
/// stripped-down JCAMP-DX dialect: a handful of `##KEY=VALUE` records
/// followed by bare `x, y` lines and `##END=`.
///
/// ```text
/// ##NAMES=Soddyite
/// ##RRUFFID=R060361
/// ##LASER_WAVELENGTH=780
/// ##URL=rruff.info/R060361
/// 107.9252, 831.4121
/// ##END=
/// ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use jcamp_dx::{read_block_file, ParsedBlock, ReadOptions};

use super::scidata::*;
use super::sections::*;
use crate::error::{ConvertError, Result};

/// Keys packed into the graph description, in order.
pub const DESCRIPTION_KEYS: [&str; 3] = ["DESCRIPTION", "LOCALITY", "STATUS"];

pub const UID_PREFIX: &str = "rruff:";

/// Reference publication of the RRUFF project.
pub const PROJECT_CITATION: &str = "Highlights in Mineralogical Crystallography 2015 1-30";
pub const PROJECT_DOI: &str = "10.1515/9783110417104-003";
pub const ENTRY_CITATION: &str = "RRUFF project database entry";

const RAMAN_TECHNIQUE: &str = "obo:CHMO_0000656";
const LASER_WAVELENGTH: &str = "Laser Wavelength";

/// Read a RRUFF file into a SciData document.
pub fn read_rruff<P: AsRef<Path>>(path: P) -> Result<SciDataDocument> {
    let block = read_block_file(path, &ReadOptions::rruff())?;
    Ok(translate_rruff(&block, &timestamp_now()))
}

/// Map a parsed RRUFF block onto a SciData document.
pub fn translate_rruff(block: &ParsedBlock, generated_at: &str) -> SciDataDocument {
    let text = |key: &str| block.header_text(key).filter(|s| !s.is_empty());

    let mut doc = SciDataDocument::new(generated_at);
    let graph = &mut doc.graph;
    graph.title = text("names");
    graph.publisher = text("owner");
    let segments: Vec<(&str, String)> = DESCRIPTION_KEYS
        .iter()
        .filter_map(|key| text(&key.to_lowercase()).map(|v| (*key, v)))
        .collect();
    graph.description = join_description(&segments);
    graph.uid = text("rruffid").map(|id| format!("{}{}", UID_PREFIX, id));

    if let Some(source) = text("source") {
        graph.author.push(author(1, "dc:creator", &source));
    }

    graph.sources.push(Source {
        id: "source/1/".to_string(),
        kind: "dc:source".to_string(),
        citation: Some(PROJECT_CITATION.to_string()),
        reftype: Some("journal article".to_string()),
        doi: Some(PROJECT_DOI.to_string()),
        url: Some(format!("https://doi.org/{}", PROJECT_DOI)),
    });
    if let Some(url) = text("url") {
        graph.sources.push(Source {
            id: format!("source/{}/", graph.sources.len() + 1),
            kind: "dc:source".to_string(),
            citation: Some(ENTRY_CITATION.to_string()),
            url: Some(format!("https://{}", url)),
            ..Default::default()
        });
    }

    let scidata = &mut graph.scidata;
    scidata.types = vec!["property value".to_string()];
    scidata.property = vec!["raman spectroscopy".to_string()];

    scidata.methodology.evaluation = vec!["experimental".to_string()];
    if let Some(wavelength) = block.header("laser_wavelength") {
        let mut laser = setting(1, "wavelength", LASER_WAVELENGTH, wavelength.clone());
        laser.value.unitref = Some("qudt:NanoM".to_string());
        scidata.methodology.aspects.push(Aspect {
            id: MEASUREMENT_ID.to_string(),
            kind: MEASUREMENT_TYPE.to_string(),
            technique_type: Some(SPECTROSCOPY_TECHNIQUE_TYPE.to_string()),
            technique: Some(RAMAN_TECHNIQUE.to_string()),
            instrument_type: Some("raman spectrometer".to_string()),
            instrument: Some("Unknown".to_string()),
            settings: vec![laser],
            ..Default::default()
        });
    }

    scidata.system.discipline = Some("w3i:Chemistry".to_string());
    scidata.system.subdiscipline = Some("w3i:AnalyticalChemistry".to_string());
    scidata.system.facets.push(Facet {
        id: "material/1/".to_string(),
        kind: TypeTag::Many(vec!["sdo:facet".to_string(), "sdo:material".to_string()]),
        name: text("names"),
        material_type: text("ideal chemistry"),
        ..Default::default()
    });

    let dataset = &mut scidata.dataset;
    dataset.source = Some("measurement/1".to_string());
    dataset.scope = Some("material/1".to_string());
    let axes = SpectrumAxes {
        x: &block.x,
        y: &block.y,
        x_unitref: unit_ref(&X_UNITS, "1/CM"),
        x_unitstr: None,
        y_unitstr: None,
        xfactor: block.xfactor,
        yfactor: block.yfactor,
        x_label: axis_label("Wave Numbers", Some("cm^-1")),
        y_label: axis_label("Intensity", Some("Arbitrary Units")),
    };
    let (group, series) = build_datagroup(&axes, &mut DatasetCursor::default());
    dataset.datagroup.push(group);
    dataset.dataseries.extend(series);

    log::debug!("Translated RRUFF entry {:?} ({} points)", doc.graph.uid, block.x.len());
    doc
}

/// Write a SciData document as a RRUFF file.
pub fn write_rruff<P: AsRef<Path>>(path: P, doc: &SciDataDocument) -> Result<()> {
    write_rruff_with(path, doc, &WriteOptions::rruff())
}

pub fn write_rruff_with<P: AsRef<Path>>(path: P, doc: &SciDataDocument, options: &WriteOptions) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_rruff_to(&mut out, doc, options)?;
    out.flush()?;
    Ok(())
}

/// Write the RRUFF text of a document to any writer.
pub fn write_rruff_to<W: Write>(out: &mut W, doc: &SciDataDocument, options: &WriteOptions) -> Result<()> {
    for line in rruff_header_lines(doc)? {
        writeln!(out, "{}", line)?;
    }
    write_data_section(out, &doc.graph.scidata.dataset, options)?;
    writeln!(out, "##END=")?;
    Ok(())
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| ConvertError::MissingField(field.to_string()))
}

fn rruff_header_lines(doc: &SciDataDocument) -> Result<Vec<String>> {
    let graph = &doc.graph;
    let scidata = &graph.scidata;
    let section = |key: &str| description_section(graph.description.as_deref(), key, &DESCRIPTION_KEYS);

    let names = required(graph.title.clone(), "@graph.title")?;
    let uid = required(graph.uid.clone(), "@graph.uid")?;
    let owner = required(graph.publisher.clone(), "@graph.publisher")?;
    let source = required(graph.author.first().map(|a| a.name.clone()), "@graph.author")?;

    let chemistry = scidata
        .system
        .facet("material")
        .and_then(|f| f.material_type.clone());
    let wavelength = scidata
        .methodology
        .aspect("measurement")
        .and_then(|m| m.setting(LASER_WAVELENGTH))
        .map(|s| s.value.number.to_string());
    let url = graph
        .sources
        .iter()
        .find(|s| s.citation.as_deref() == Some(ENTRY_CITATION))
        .and_then(|s| s.url.as_deref())
        .map(|u| u.strip_prefix("https://").unwrap_or(u).to_string());

    let records = [
        ("NAMES", Some(names)),
        ("RRUFFID", Some(uid.strip_prefix(UID_PREFIX).unwrap_or(&uid).to_string())),
        ("IDEAL CHEMISTRY", chemistry),
        ("LOCALITY", section("LOCALITY")),
        ("OWNER", Some(owner)),
        ("SOURCE", Some(source)),
        ("DESCRIPTION", section("DESCRIPTION")),
        ("STATUS", section("STATUS")),
        ("LASER_WAVELENGTH", wavelength),
        ("URL", url),
    ];
    Ok(records
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("##{}={}", key, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcamp_dx::{read_block_lines, HeaderValue};

    const SODDYITE: &str = "\
##NAMES=Soddyite
##RRUFFID=R060361
##IDEAL CHEMISTRY=(UO_2_)_2_SiO_4_&#183;2H_2_O
##LOCALITY=Musonoi Mine, Kolwezi, Shaba, Zaire
##OWNER=RRUFF
##SOURCE=Michael Scott
##DESCRIPTION=Yellow pyramidal crystals; with malachite and brochantite
##STATUS=The identification of this mineral has been confirmed by single-crystal X-ray diffraction.
##LASER_WAVELENGTH=780
##URL=rruff.info/R060361
107.9252, 831.4121
109.8537, 3246.546
1285.736, 66.16613
##END=
";

    fn soddyite() -> SciDataDocument {
        let block = read_block_lines(SODDYITE.lines(), &ReadOptions::rruff()).unwrap();
        translate_rruff(&block, "2024-01-01 00:00:00")
    }

    #[test]
    fn test_graph_section() {
        let doc = soddyite();
        let graph = &doc.graph;
        assert_eq!(graph.title.as_deref(), Some("Soddyite"));
        assert_eq!(graph.publisher.as_deref(), Some("RRUFF"));
        assert_eq!(graph.uid.as_deref(), Some("rruff:R060361"));
        assert_eq!(graph.author.len(), 1);
        assert_eq!(graph.author[0].name, "Michael Scott");
        assert_eq!(graph.author[0].kind, "dc:creator");
        assert_eq!(graph.sources.len(), 2);
        assert_eq!(graph.sources[0].doi.as_deref(), Some(PROJECT_DOI));
        assert_eq!(graph.sources[0].reftype.as_deref(), Some("journal article"));
        assert_eq!(graph.sources[1].id, "source/2/");
        assert_eq!(graph.sources[1].url.as_deref(), Some("https://rruff.info/R060361"));
        let description = graph.description.as_deref().unwrap();
        for word in ["DESCRIPTION", "LOCALITY", "STATUS", "pyramidal", "Kolwezi", "single-crystal"] {
            assert!(description.contains(word), "missing {}", word);
        }
    }

    #[test]
    fn test_methodology_and_system() {
        let doc = soddyite();
        let aspects = &doc.scidata().methodology.aspects;
        assert_eq!(aspects.len(), 1);
        assert_eq!(aspects[0].technique.as_deref(), Some("obo:CHMO_0000656"));
        assert_eq!(aspects[0].settings.len(), 1);
        assert_eq!(aspects[0].settings[0].value.number, HeaderValue::Int(780));
        assert_eq!(aspects[0].settings[0].value.unitref.as_deref(), Some("qudt:NanoM"));

        let facets = &doc.scidata().system.facets;
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].id, "material/1/");
        assert_eq!(facets[0].name.as_deref(), Some("Soddyite"));
        assert_eq!(facets[0].material_type.as_deref(), Some("(UO_2_)_2_SiO_4_&#183;2H_2_O"));
    }

    #[test]
    fn test_dataset_section() {
        let doc = soddyite();
        let dataset = &doc.scidata().dataset;
        assert_eq!(dataset.scope.as_deref(), Some("material/1"));
        let attributes = &dataset.datagroup[0].attributes;
        assert_eq!(attributes.len(), 11);
        let numbers: Vec<String> = attributes.iter().map(|a| a.value.number.to_string()).collect();
        assert_eq!(
            numbers,
            vec![
                "3", "107.9252", "1285.736", "107.9252", "1285.736", "831.4121", "66.16613", "66.16613",
                "3246.546", "1", "1"
            ]
        );
        assert_eq!(attributes[1].value.unitref.as_deref(), Some("qudt:PER-CentiM"));
        assert_eq!(dataset.dataseries[0].label, "Wave Numbers (cm^-1)");
        assert_eq!(dataset.dataseries[1].label, "Intensity (Arbitrary Units)");
        assert!(dataset.dataseries[1].parameter.valuearray.unitstr.is_none());
    }

    #[test]
    fn test_write_reproduces_source() {
        let mut out = Vec::new();
        write_rruff_to(&mut out, &soddyite(), &WriteOptions::rruff()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SODDYITE);
    }

    #[test]
    fn test_write_requires_uid() {
        let mut doc = soddyite();
        doc.graph.uid = None;
        let mut out = Vec::new();
        assert!(matches!(
            write_rruff_to(&mut out, &doc, &WriteOptions::rruff()),
            Err(ConvertError::MissingField(f)) if f == "@graph.uid"
        ));
    }

    #[test]
    fn test_no_laser_no_aspect() {
        let text = "##NAMES=Quartz\n##RRUFFID=R040031\n1, 2\n##END=";
        let block = read_block_lines(text.lines(), &ReadOptions::rruff()).unwrap();
        let doc = translate_rruff(&block, "t");
        assert!(doc.scidata().methodology.aspects.is_empty());
        assert_eq!(doc.graph.sources.len(), 1);
        assert!(doc.graph.author.is_empty());
    }
}
