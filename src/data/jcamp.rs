/// JCAMP-DX <-> SciData JSON-LD
///
/// JCAMP-DX (Joint Committee on Atomic and Molecular Physical Data - Data
/// Exchange) is a text format for spectra. File extensions: `.jdx`, `.dx`,
/// `.jcamp`.
///
/// Reading decodes the file with the `jcamp-dx` crate and maps the parsed
/// block onto the SciData graph:
///   - `##TITLE`, `##ORIGIN`, `##OWNER`, `##$REF ...` -> graph metadata
///   - `##JCAMP-DX`, `##CLASS`, `##CAS REGISTRY NO`, ... -> packed description
///   - `##SPECTROMETER/DATA SYSTEM`, `##PATH LENGTH`, ... -> methodology
///   - `##MOLFORM`, `##STATE`, `##PARTIAL_PRESSURE` -> system facets
///   - X/Y arrays -> one datagroup + two dataseries per spectrum
///
/// Writing rebuilds the header from those sections and emits the first
/// spectrum as a flat `(XY..XY)` table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use jcamp_dx::{read_block_file, HeaderValue, ParsedBlock, ReadOptions, DATA_FORMAT_XYXY};

use super::scidata::*;
use super::sections::*;
use crate::error::{ConvertError, Result};

/// Keys packed into the graph description, in order.
pub const DESCRIPTION_KEYS: [&str; 6] = [
    "JCAMP-DX",
    "CLASS",
    "CAS REGISTRY NO",
    "SAMPLE DESCRIPTION",
    "SOURCE REFERENCE",
    "XYDATA",
];

/// Citation parts, in citation order.
const REFERENCE_KEYS: [&str; 6] = [
    "$ref author",
    "$ref title",
    "$ref journal",
    "$ref volume",
    "$ref date",
    "$ref page",
];

/// Data-type fragments and the CHMO technique they denote.
const TECHNIQUES: [(&str, &str); 5] = [
    ("RAMAN", "obo:CHMO_0000656"),
    ("INFRARED", "obo:CHMO_0000630"),
    ("UV", "obo:CHMO_0000292"),
    ("NMR", "obo:CHMO_0000591"),
    ("MASS", "obo:CHMO_0000470"),
];

const PROCEDURE_TYPE: &str = "sdo:procedure";
const DATA_PROCESSING_TYPE: &str = "sdo:dataprocessing";
const JCAMP_VERSION: &str = "4.24";

/// Read a JCAMP-DX file into a SciData document.
pub fn read_jcamp<P: AsRef<Path>>(path: P) -> Result<SciDataDocument> {
    let block = read_block_file(path, &ReadOptions::default())?;
    Ok(translate_jcamp(&block, &timestamp_now()))
}

/// Map a parsed JCAMP-DX block onto a SciData document. `generated_at` is
/// used unless the block carries a `##LONG DATE`.
pub fn translate_jcamp(block: &ParsedBlock, generated_at: &str) -> SciDataDocument {
    let spectra = block.data_blocks();
    let primary = spectra.first().copied().unwrap_or(block);
    let fields = Fields(block);

    let mut doc = SciDataDocument::new(fields.text("long date").unwrap_or_else(|| generated_at.to_string()));
    doc.graph = graph_section(&fields, primary);

    let scidata = &mut doc.graph.scidata;
    scidata.types = vec!["property value".to_string()];
    let data_type = primary.data_type.clone().or_else(|| block.data_type.clone());
    scidata.property = data_type.iter().cloned().collect();
    scidata.methodology = methodology_section(&fields, data_type.as_deref());
    scidata.system = system_section(&fields, block.title.as_deref());
    scidata.dataset = dataset_section(&spectra);

    log::debug!(
        "Translated JCAMP-DX block {:?}: {} spectra",
        block.title,
        scidata.dataset.datagroup.len()
    );
    doc
}

/// Header lookups over a block and its children.
struct Fields<'a>(&'a ParsedBlock);

impl Fields<'_> {
    fn text(&self, key: &str) -> Option<String> {
        self.0
            .lookup(key)
            .map(HeaderValue::to_string)
            .filter(|s| !s.is_empty())
    }
}

fn graph_section(fields: &Fields<'_>, primary: &ParsedBlock) -> Graph {
    let mut graph = Graph {
        title: fields.0.title.clone(),
        publisher: fields.text("origin"),
        ..Default::default()
    };

    let mut segments: Vec<(&str, String)> = DESCRIPTION_KEYS[..5]
        .iter()
        .filter_map(|key| fields.text(&key.to_lowercase()).map(|v| (*key, v)))
        .collect();
    if let Some(tag) = &primary.xy_data_type {
        segments.push(("XYDATA", tag.clone()));
    }
    graph.description = join_description(&segments);

    if let Some(owner) = fields.text("owner") {
        graph.author.push(author(graph.author.len() + 1, "dc:rightsHolder", &owner));
    }
    if let Some(creator) = fields.text("$ref author") {
        graph.author.push(author(graph.author.len() + 1, "dc:creator", &creator));
    }

    let citation: Vec<String> = REFERENCE_KEYS.iter().filter_map(|k| fields.text(k)).collect();
    if !citation.is_empty() {
        graph.sources.push(Source {
            id: "source/1/".to_string(),
            kind: "dc:source".to_string(),
            citation: Some(citation.join(", ")),
            reftype: Some("journal article".to_string()),
            ..Default::default()
        });
    }
    graph
}

fn technique_for(data_type: &str) -> Option<&'static str> {
    let data_type = data_type.to_uppercase();
    TECHNIQUES
        .iter()
        .find(|(fragment, _)| data_type.contains(fragment))
        .map(|(_, code)| *code)
}

fn methodology_section(fields: &Fields<'_>, data_type: Option<&str>) -> Methodology {
    let mut methodology = Methodology {
        evaluation: vec!["experimental".to_string()],
        ..Default::default()
    };

    let instrument = fields.text("spectrometer/data system");
    let parameters = fields.text("instrument parameters");
    let path_length = fields.text("path length");
    let resolution = fields.text("resolution");

    if instrument.is_some() || parameters.is_some() || path_length.is_some() || resolution.is_some() {
        let mut settings = Vec::new();
        if let Some(parameters) = parameters {
            settings.push(setting(
                settings.len() + 1,
                "instrument",
                "Instrument Parameters",
                HeaderValue::Text(parameters),
            ));
        }
        if let Some(path_length) = path_length {
            let (number, unit) = split_quantity(&path_length);
            let mut s = setting(settings.len() + 1, "length", "Path Length", number);
            attach_unit(&mut s.value, unit, &LENGTH_UNITS);
            settings.push(s);
        }
        if let Some(resolution) = resolution {
            let (number, unit) = split_quantity(&resolution);
            let mut s = setting(settings.len() + 1, "resolution", "Resolution", number);
            s.value.unitstr = unit;
            settings.push(s);
        }
        methodology.aspects.push(Aspect {
            id: MEASUREMENT_ID.to_string(),
            kind: MEASUREMENT_TYPE.to_string(),
            technique_type: Some(SPECTROSCOPY_TECHNIQUE_TYPE.to_string()),
            technique: data_type.and_then(technique_for).map(str::to_string),
            instrument,
            settings,
            ..Default::default()
        });
    }

    let procedures = [
        ("sampling procedure", PROCEDURE_TYPE),
        ("data processing", DATA_PROCESSING_TYPE),
    ];
    let mut index = 1;
    for (key, kind) in procedures {
        if let Some(text) = fields.text(key) {
            methodology.aspects.push(Aspect {
                id: format!("procedure/{}/", index),
                kind: kind.to_string(),
                description: Some(text),
                ..Default::default()
            });
            index += 1;
        }
    }
    methodology
}

/// Put a unit on a value: as a code when the table knows it, else as text.
fn attach_unit(value: &mut NumericValue, unit: Option<String>, table: &[(&str, &'static str)]) {
    if let Some(unit) = unit {
        match unit_ref(table, &unit) {
            Some(code) => value.unitref = Some(code.to_string()),
            None => value.unitstr = Some(unit),
        }
    }
}

/// `"150 mmHg"` found inside a `##STATE` value such as `gas (150 mmHg, N2)`.
fn pressure_in_state(state: &str) -> Option<String> {
    let tokens: Vec<&str> = state
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ',' | ';'))
        .filter(|t| !t.is_empty())
        .collect();
    tokens.iter().enumerate().find_map(|(i, token)| {
        let lower = token.to_ascii_lowercase();
        let number = if lower == "mmhg" {
            *tokens.get(i.checked_sub(1)?)?
        } else {
            &token[..lower.strip_suffix("mmhg")?.len()]
        };
        number.parse::<f64>().ok()?;
        Some(format!("{} mmHg", number))
    })
}

fn system_section(fields: &Fields<'_>, title: Option<&str>) -> System {
    let mut system = System {
        discipline: Some("w3i:Chemistry".to_string()),
        subdiscipline: Some("w3i:AnalyticalChemistry".to_string()),
        ..Default::default()
    };
    let facet_type = |term: &str| TypeTag::Many(vec!["sdo:facet".to_string(), term.to_string()]);

    let formula = fields.text("molform");
    let casrn = fields.text("cas registry no");
    if formula.is_some() || casrn.is_some() {
        system.facets.push(Facet {
            id: "compound/1/".to_string(),
            kind: facet_type("sdo:compound"),
            name: title.map(str::to_string),
            formula,
            casrn,
            ..Default::default()
        });
    }

    let state = fields.text("state");
    if let Some(state) = &state {
        let phase = state
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty());
        system.facets.push(Facet {
            id: "substance/1/".to_string(),
            kind: facet_type("sdo:substance"),
            name: title.map(str::to_string),
            phase,
            ..Default::default()
        });
    }

    let pressure = fields
        .text("partial_pressure")
        .or_else(|| state.as_deref().and_then(pressure_in_state));
    if let Some(pressure) = pressure {
        let (number, unit) = split_quantity(&pressure);
        let mut value = NumericValue {
            id: "condition/1/value/".to_string(),
            kind: Some("sdo:value".to_string()),
            number,
            unitref: None,
            unitstr: None,
        };
        attach_unit(&mut value, unit, &PRESSURE_UNITS);
        system.facets.push(Facet {
            id: "condition/1/".to_string(),
            kind: facet_type("sdo:condition"),
            quantity: Some("pressure".to_string()),
            property: Some("Partial Pressure".to_string()),
            value: Some(value),
            ..Default::default()
        });
    }
    system
}

fn dataset_section(spectra: &[&ParsedBlock]) -> Dataset {
    let mut dataset = Dataset {
        source: Some("measurement/1".to_string()),
        scope: Some("material/1".to_string()),
        ..Default::default()
    };
    let mut cursor = DatasetCursor::default();
    for spectrum in spectra {
        let xunits = spectrum.xunits.as_deref();
        let x_unitref = xunits.and_then(|u| unit_ref(&X_UNITS, u));
        if let (Some(units), None) = (xunits, x_unitref) {
            log::debug!("No unit code for XUNITS={}", units);
        }
        let axes = SpectrumAxes {
            x: &spectrum.x,
            y: &spectrum.y,
            x_unitref,
            x_unitstr: xunits.filter(|_| x_unitref.is_none()).map(str::to_string),
            y_unitstr: spectrum.yunits.clone(),
            xfactor: spectrum.xfactor,
            yfactor: spectrum.yfactor,
            x_label: axis_label("Wave Numbers", xunits),
            y_label: axis_label("Intensity", spectrum.yunits.as_deref()),
        };
        let (group, series) = build_datagroup(&axes, &mut cursor);
        dataset.datagroup.push(group);
        dataset.dataseries.extend(series);
    }
    dataset
}

/// Write a SciData document as a JCAMP-DX file.
pub fn write_jcamp<P: AsRef<Path>>(path: P, doc: &SciDataDocument) -> Result<()> {
    write_jcamp_with(path, doc, &WriteOptions::jcamp())
}

pub fn write_jcamp_with<P: AsRef<Path>>(path: P, doc: &SciDataDocument, options: &WriteOptions) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_jcamp_to(&mut out, doc, options)?;
    out.flush()?;
    Ok(())
}

/// Write the JCAMP-DX text of a document to any writer.
pub fn write_jcamp_to<W: Write>(out: &mut W, doc: &SciDataDocument, options: &WriteOptions) -> Result<()> {
    for line in jcamp_header_lines(doc)? {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "##XYPOINTS={}", DATA_FORMAT_XYXY)?;
    write_data_section(out, &doc.graph.scidata.dataset, options)?;
    writeln!(out, "##END=")?;
    Ok(())
}

/// `"150 mmHg"` from a value, reversing its unit code strictly.
fn quantity_text(value: &NumericValue, table: &[(&str, &str)]) -> Result<String> {
    let unit = match (&value.unitref, &value.unitstr) {
        (Some(code), _) => Some(unit_from_ref(table, code)?.to_string()),
        (None, Some(text)) => Some(text.clone()),
        (None, None) => None,
    };
    Ok(match unit {
        Some(unit) => format!("{} {}", value.number, unit),
        None => value.number.to_string(),
    })
}

fn jcamp_header_lines(doc: &SciDataDocument) -> Result<Vec<String>> {
    let graph = &doc.graph;
    let scidata = &graph.scidata;
    let dataset = &scidata.dataset;
    let section = |key: &str| description_section(graph.description.as_deref(), key, &DESCRIPTION_KEYS);

    let title = graph
        .title
        .clone()
        .ok_or_else(|| ConvertError::MissingField("@graph.title".to_string()))?;
    let data_type = scidata
        .property
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::MissingField("scidata.property".to_string()))?;

    let measurement = scidata.methodology.aspect("measurement");
    let procedure = |kind: &str| {
        scidata
            .methodology
            .aspects
            .iter()
            .find(|a| a.kind == kind)
            .and_then(|a| a.description.clone())
    };
    let measured = |property: &str, table: &[(&str, &str)]| -> Result<Option<String>> {
        measurement
            .and_then(|m| m.setting(property))
            .map(|s| quantity_text(&s.value, table))
            .transpose()
    };
    let compound = scidata.system.facet("compound");
    let substance = scidata.system.facet("substance");
    let condition = scidata
        .system
        .facet("condition")
        .and_then(|f| f.value.as_ref())
        .map(|v| quantity_text(v, &PRESSURE_UNITS))
        .transpose()?;

    let (x_series, y_series) = spectrum_series(dataset)?;
    let x_unitref = dataset
        .datagroup
        .first()
        .and_then(|g| g.attribute(PROP_FIRST_X))
        .and_then(|a| a.value.unitref.clone())
        .or_else(|| x_series.parameter.valuearray.unitref.clone());
    let xunits = match x_unitref {
        Some(code) => Some(unit_from_ref(&X_UNITS, &code)?.to_string()),
        None => x_series.parameter.valuearray.unitstr.clone(),
    };

    let attribute_text = |property: &str| {
        dataset
            .datagroup
            .first()
            .and_then(|g| g.attribute(property))
            .map(|a| a.value.number.to_string())
    };
    let first_x = attribute_number(dataset, PROP_FIRST_X)?;
    let last_x = attribute_number(dataset, PROP_LAST_X)?;
    let npoints = attribute_number(dataset, PROP_COUNT)?;
    let delta_x = match (first_x, last_x, npoints) {
        (Some(first), Some(last), Some(n)) if n > 1.0 => Some((last - first) / (n - 1.0)),
        _ => None,
    };

    let records: Vec<(&str, Option<String>)> = vec![
        ("TITLE", Some(title)),
        ("JCAMP-DX", Some(section("JCAMP-DX").unwrap_or_else(|| JCAMP_VERSION.to_string()))),
        ("DATA TYPE", Some(data_type)),
        ("CLASS", section("CLASS")),
        ("ORIGIN", graph.publisher.clone()),
        (
            "OWNER",
            graph
                .author
                .iter()
                .find(|a| a.kind == "dc:rightsHolder")
                .map(|a| a.name.clone()),
        ),
        (
            "CAS REGISTRY NO",
            compound
                .and_then(|f| f.casrn.clone())
                .or_else(|| section("CAS REGISTRY NO")),
        ),
        ("MOLFORM", compound.and_then(|f| f.formula.clone())),
        ("SOURCE REFERENCE", section("SOURCE REFERENCE")),
        ("SPECTROMETER/DATA SYSTEM", measurement.and_then(|m| m.instrument.clone())),
        ("INSTRUMENT PARAMETERS", measured("Instrument Parameters", &[])?),
        ("STATE", substance.and_then(|f| f.phase.clone())),
        ("PARTIAL_PRESSURE", condition),
        ("PATH LENGTH", measured("Path Length", &LENGTH_UNITS)?),
        ("SAMPLING PROCEDURE", procedure(PROCEDURE_TYPE)),
        ("RESOLUTION", measured("Resolution", &[])?),
        ("DATA PROCESSING", procedure(DATA_PROCESSING_TYPE)),
        ("SAMPLE DESCRIPTION", section("SAMPLE DESCRIPTION")),
        ("XUNITS", xunits),
        ("YUNITS", y_series.parameter.valuearray.unitstr.clone()),
        ("XFACTOR", Some(attribute_text(PROP_X_FACTOR).unwrap_or_else(|| "1".to_string()))),
        ("YFACTOR", Some(attribute_text(PROP_Y_FACTOR).unwrap_or_else(|| "1".to_string()))),
        ("DELTAX", delta_x.map(|d| d.to_string())),
        ("FIRSTX", attribute_text(PROP_FIRST_X)),
        ("LASTX", attribute_text(PROP_LAST_X)),
        ("FIRSTY", attribute_text(PROP_FIRST_Y)),
        ("MAXX", attribute_text(PROP_MAX_X)),
        ("MINX", attribute_text(PROP_MIN_X)),
        ("MAXY", attribute_text(PROP_MAX_Y)),
        ("MINY", attribute_text(PROP_MIN_Y)),
        ("NPOINTS", attribute_text(PROP_COUNT)),
    ];

    Ok(records
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("##{}={}", key, v)))
        .collect())
}
