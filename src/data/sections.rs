/// Building blocks shared by the JCAMP-DX and RRUFF translators and writers
///
/// Unit tables, the `"KEY: value; KEY: value"` description packing, the
/// datagroup/dataseries builders and the flat `(XY..XY)` data-section writer.

use std::io::Write;

use jcamp_dx::HeaderValue;

use super::scidata::*;
use crate::error::{ConvertError, Result};

/// Separator between `KEY: value` segments of the graph description.
pub const DESCRIPTION_SEPARATOR: &str = "; ";

/// `generatedAt` timestamp layout.
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MEASUREMENT_ID: &str = "measurement/1/";
pub const MEASUREMENT_TYPE: &str = "cao:CAO_000152";
pub const SPECTROSCOPY_TECHNIQUE_TYPE: &str = "obo:CHMO_0000228";

pub const PROP_COUNT: &str = "Number of Data Points";
pub const PROP_FIRST_X: &str = "First X-axis Value";
pub const PROP_LAST_X: &str = "Last X-axis Value";
pub const PROP_MIN_X: &str = "Minimum X-axis Value";
pub const PROP_MAX_X: &str = "Maximum X-axis Value";
pub const PROP_FIRST_Y: &str = "First Y-axis Value";
pub const PROP_LAST_Y: &str = "Last Y-axis Value";
pub const PROP_MIN_Y: &str = "Minimum Y-axis Value";
pub const PROP_MAX_Y: &str = "Maximum Y-axis Value";
pub const PROP_X_FACTOR: &str = "X-axis Scaling Factor";
pub const PROP_Y_FACTOR: &str = "Y-axis Scaling Factor";

/// X-axis units and their QUDT unit codes.
pub const X_UNITS: [(&str, &str); 6] = [
    ("1/CM", "qudt:PER-CentiM"),
    ("NANOMETERS", "qudt:NanoM"),
    ("MICROMETERS", "qudt:MicroM"),
    ("HZ", "qudt:HZ"),
    ("PPM", "qudt:PPM"),
    ("SECONDS", "qudt:SEC"),
];

/// Path-length units.
pub const LENGTH_UNITS: [(&str, &str); 2] = [("CM", "qudt:CentiM"), ("MM", "qudt:MilliM")];

/// Pressure units.
pub const PRESSURE_UNITS: [(&str, &str); 1] = [("mmHg", "qudt:MilliM_HG")];

/// Unit code for `unit`, matched case-insensitively.
pub fn unit_ref(table: &[(&str, &'static str)], unit: &str) -> Option<&'static str> {
    let unit = unit.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(unit))
        .map(|(_, code)| *code)
}

/// Unit name for a unit code. Codes outside the table are an error.
pub fn unit_from_ref<'t>(table: &[(&'t str, &str)], unitref: &str) -> Result<&'t str> {
    table
        .iter()
        .find(|(_, code)| *code == unitref)
        .map(|(name, _)| *name)
        .ok_or_else(|| ConvertError::UnknownUnit(unitref.to_string()))
}

/// Current local time in `generatedAt` layout.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(GENERATED_AT_FORMAT).to_string()
}

/// Join `KEY: value` segments. `None` when there are none.
pub fn join_description(segments: &[(&str, String)]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    let joined = segments
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(DESCRIPTION_SEPARATOR);
    Some(joined)
}

/// Value of `key` inside a packed description. Segments that do not start
/// with one of `known_keys` belong to the value before them, since values
/// may contain the separator themselves.
pub fn description_section(description: Option<&str>, key: &str, known_keys: &[&str]) -> Option<String> {
    let description = description?;
    let mut sections: Vec<(&str, String)> = Vec::new();
    for part in description.split(DESCRIPTION_SEPARATOR) {
        let labelled = known_keys.iter().find_map(|k| {
            part.strip_prefix(k)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|rest| (*k, rest.strip_prefix(' ').unwrap_or(rest)))
        });
        match labelled {
            Some((k, value)) => sections.push((k, value.to_string())),
            None => {
                if let Some((_, value)) = sections.last_mut() {
                    value.push_str(DESCRIPTION_SEPARATOR);
                    value.push_str(part);
                }
            }
        }
    }
    sections
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, value)| value)
}

/// Split `"5 CM"` into its number and unit text.
pub fn split_quantity(text: &str) -> (HeaderValue, Option<String>) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((number, unit)) if number.parse::<f64>().is_ok() => {
            let unit = unit.trim();
            let unit = (!unit.is_empty()).then(|| unit.to_string());
            (HeaderValue::coerce(number), unit)
        }
        _ => (HeaderValue::coerce(text), None),
    }
}

pub fn setting(index: usize, quantity: &str, property: &str, number: HeaderValue) -> Setting {
    Setting {
        id: format!("setting/{}/", index),
        kind: "sdo:setting".to_string(),
        quantity: quantity.to_string(),
        property: property.to_string(),
        value: NumericValue {
            id: format!("setting/{}/value/", index),
            kind: None,
            number,
            unitref: None,
            unitstr: None,
        },
    }
}

pub fn author(index: usize, kind: &str, name: &str) -> Author {
    Author {
        id: format!("author/{}", index),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn attribute(index: usize, quantity: &str, property: &str, number: String, unitref: Option<&str>) -> Attribute {
    Attribute {
        id: format!("attribute/{}/", index),
        kind: "sdo:attribute".to_string(),
        quantity: quantity.to_string(),
        property: property.to_string(),
        value: NumericValue {
            id: format!("attribute/{}/value/", index),
            kind: Some("sdo:value".to_string()),
            number: HeaderValue::Text(number),
            unitref: unitref.map(str::to_string),
            unitstr: None,
        },
    }
}

/// One spectrum handed to [`build_datagroup`].
#[derive(Debug, Clone)]
pub struct SpectrumAxes<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    /// QUDT code of the X axis.
    pub x_unitref: Option<&'static str>,
    /// Free-text X unit, kept when no QUDT code is known.
    pub x_unitstr: Option<String>,
    /// Free-text Y unit.
    pub y_unitstr: Option<String>,
    pub xfactor: Option<f64>,
    pub yfactor: Option<f64>,
    pub x_label: String,
    pub y_label: String,
}

/// `"Wave Numbers (1/CM)"`, or the bare name without units.
pub fn axis_label(name: &str, units: Option<&str>) -> String {
    match units {
        Some(u) if !u.is_empty() => format!("{} ({})", name, u),
        _ => name.to_string(),
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Numbering state across datagroups of one document.
#[derive(Debug, Clone, Copy)]
pub struct DatasetCursor {
    pub group: usize,
    pub attribute: usize,
    pub series: usize,
}

impl Default for DatasetCursor {
    fn default() -> Self {
        Self {
            group: 1,
            attribute: 1,
            series: 1,
        }
    }
}

/// Build the datagroup and its two dataseries for one spectrum, advancing
/// the numbering cursor.
pub fn build_datagroup(axes: &SpectrumAxes<'_>, cursor: &mut DatasetCursor) -> (DataGroup, [DataSeries; 2]) {
    let mut attributes = Vec::with_capacity(11);
    let mut next = |quantity: &str, property: &str, number: String, unitref: Option<&str>| {
        attributes.push(attribute(cursor.attribute, quantity, property, number, unitref));
        cursor.attribute += 1;
    };

    next("count", PROP_COUNT, axes.x.len().to_string(), None);
    // An empty spectrum has no first/last/min/max values: it gets only the
    // count and the two scaling factors.
    if let (Some(&first_x), Some(&last_x), Some(&first_y), Some(&last_y)) =
        (axes.x.first(), axes.x.last(), axes.y.first(), axes.y.last())
    {
        let (min_x, max_x) = min_max(axes.x);
        let (min_y, max_y) = min_max(axes.y);
        next("metric", PROP_FIRST_X, first_x.to_string(), axes.x_unitref);
        next("metric", PROP_LAST_X, last_x.to_string(), axes.x_unitref);
        next("metric", PROP_MIN_X, min_x.to_string(), axes.x_unitref);
        next("metric", PROP_MAX_X, max_x.to_string(), axes.x_unitref);
        next("metric", PROP_FIRST_Y, first_y.to_string(), None);
        next("metric", PROP_LAST_Y, last_y.to_string(), None);
        next("metric", PROP_MIN_Y, min_y.to_string(), None);
        next("metric", PROP_MAX_Y, max_y.to_string(), None);
    }
    let factor = |f: Option<f64>| f.map_or_else(|| "1".to_string(), |v| v.to_string());
    next("metric", PROP_X_FACTOR, factor(axes.xfactor), None);
    next("metric", PROP_Y_FACTOR, factor(axes.yfactor), None);

    let x_series = cursor.series;
    let y_series = cursor.series + 1;
    cursor.series += 2;

    let group = DataGroup {
        id: format!("datagroup/{}/", cursor.group),
        kind: "sdo:datagroup".to_string(),
        group_type: Some("spectrum".to_string()),
        attributes,
        dataserieses: vec![format!("dataseries/{}/", x_series), format!("dataseries/{}/", y_series)],
    };
    cursor.group += 1;

    let independent = series(
        x_series,
        "sdo:independent",
        &axes.x_label,
        "x-axis",
        ("wavenumbers", "Wave Numbers"),
        axes.x.to_vec(),
        axes.x_unitref.map(str::to_string),
        axes.x_unitstr.clone(),
    );
    let dependent = series(
        y_series,
        "sdo:dependent",
        &axes.y_label,
        "y-axis",
        ("intensity", "Intensity"),
        axes.y.to_vec(),
        None,
        axes.y_unitstr.clone(),
    );
    (group, [independent, dependent])
}

#[allow(clippy::too_many_arguments)]
fn series(
    index: usize,
    kind: &str,
    label: &str,
    axis: &str,
    (quantity, property): (&str, &str),
    numberarray: Vec<f64>,
    unitref: Option<String>,
    unitstr: Option<String>,
) -> DataSeries {
    let id = format!("dataseries/{}/", index);
    DataSeries {
        id: id.clone(),
        kind: kind.to_string(),
        label: label.to_string(),
        axis: axis.to_string(),
        parameter: Parameter {
            id: format!("{}parameter/", id),
            kind: "sdo:parameter".to_string(),
            quantity: quantity.to_string(),
            property: property.to_string(),
            valuearray: ValueArray {
                id: format!("{}parameter/valuearray/", id),
                kind: "sdo:valuearray".to_string(),
                datatype: "decimal".to_string(),
                numberarray,
                unitref,
                unitstr,
            },
        },
    }
}

/// Writer options.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Decimal places of every data value.
    pub precision: usize,
    /// Cut each formatted value to at most this many characters.
    pub trim: Option<usize>,
}

impl WriteOptions {
    pub fn jcamp() -> Self {
        Self {
            precision: 6,
            trim: None,
        }
    }

    pub fn rruff() -> Self {
        Self {
            precision: 8,
            trim: Some(8),
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        let text = format!("{:.*}", self.precision, value);
        match self.trim {
            Some(width) if text.len() > width => {
                let cut: String = text.chars().take(width).collect();
                cut.trim_end_matches('.').to_string()
            }
            _ => text,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::jcamp()
    }
}

/// Numeric value of an attribute of the first datagroup.
pub fn attribute_number(dataset: &Dataset, property: &str) -> Result<Option<f64>> {
    let Some(attr) = dataset.datagroup.first().and_then(|g| g.attribute(property)) else {
        return Ok(None);
    };
    attr.value
        .number
        .as_f64()
        .map(Some)
        .ok_or_else(|| ConvertError::InvalidAttribute {
            property: property.to_string(),
            value: attr.value.number.to_string(),
        })
}

/// The independent and dependent dataseries of the first spectrum.
pub fn spectrum_series(dataset: &Dataset) -> Result<(&DataSeries, &DataSeries)> {
    let find = |kind: &str, fallback: usize| {
        dataset
            .dataseries
            .iter()
            .find(|s| s.kind == kind)
            .or_else(|| dataset.dataseries.get(fallback))
    };
    match (find("sdo:independent", 0), find("sdo:dependent", 1)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ConvertError::MissingField("dataset.dataseries".to_string())),
    }
}

/// Write the `x, y` data lines of the first spectrum, with the scaling
/// factors divided back out.
pub fn write_data_section<W: Write>(out: &mut W, dataset: &Dataset, options: &WriteOptions) -> Result<()> {
    let (x_series, y_series) = spectrum_series(dataset)?;
    let xfactor = attribute_number(dataset, PROP_X_FACTOR)?.unwrap_or(1.0);
    let yfactor = attribute_number(dataset, PROP_Y_FACTOR)?.unwrap_or(1.0);

    let xs = &x_series.parameter.valuearray.numberarray;
    let ys = &y_series.parameter.valuearray.numberarray;
    if xs.len() != ys.len() {
        log::warn!(
            "Dataseries lengths differ ({} x, {} y); writing {} points",
            xs.len(),
            ys.len(),
            xs.len().min(ys.len())
        );
    }
    for (x, y) in xs.iter().zip(ys) {
        writeln!(
            out,
            "{}, {}",
            options.format_value(x / xfactor),
            options.format_value(y / yfactor)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 3] = ["DESCRIPTION", "LOCALITY", "STATUS"];

    #[test]
    fn test_unit_tables() {
        assert_eq!(unit_ref(&X_UNITS, "1/cm"), Some("qudt:PER-CentiM"));
        assert_eq!(unit_ref(&X_UNITS, " NANOMETERS "), Some("qudt:NanoM"));
        assert_eq!(unit_ref(&X_UNITS, "FURLONGS"), None);
        assert_eq!(unit_from_ref(&LENGTH_UNITS, "qudt:CentiM").unwrap(), "CM");
        assert_eq!(unit_from_ref(&PRESSURE_UNITS, "qudt:MilliM_HG").unwrap(), "mmHg");
        assert!(matches!(
            unit_from_ref(&X_UNITS, "qudt:Parsec"),
            Err(ConvertError::UnknownUnit(u)) if u == "qudt:Parsec"
        ));
    }

    #[test]
    fn test_description_round_trip() {
        let description = join_description(&[
            ("DESCRIPTION", "Yellow crystals; with malachite".to_string()),
            ("LOCALITY", "Musonoi Mine, Kolwezi, Shaba, Zaire".to_string()),
            ("STATUS", "confirmed".to_string()),
        ])
        .unwrap();
        assert_eq!(
            description_section(Some(&description), "DESCRIPTION", &KEYS).as_deref(),
            Some("Yellow crystals; with malachite")
        );
        assert_eq!(
            description_section(Some(&description), "LOCALITY", &KEYS).as_deref(),
            Some("Musonoi Mine, Kolwezi, Shaba, Zaire")
        );
        assert_eq!(description_section(Some(&description), "STATUS", &KEYS).as_deref(), Some("confirmed"));
        assert_eq!(description_section(Some(&description), "OWNER", &KEYS), None);
        assert_eq!(description_section(None, "STATUS", &KEYS), None);
        assert_eq!(join_description(&[]), None);
    }

    #[test]
    fn test_split_quantity() {
        assert_eq!(split_quantity("5 CM"), (HeaderValue::Int(5), Some("CM".to_string())));
        assert_eq!(split_quantity("0.5  mm "), (HeaderValue::Float(0.5), Some("mm".to_string())));
        assert_eq!(split_quantity("4"), (HeaderValue::Int(4), None));
        assert_eq!(split_quantity("see notes"), (HeaderValue::Text("see notes".into()), None));
    }

    #[test]
    fn test_format_value() {
        let rruff = WriteOptions::rruff();
        assert_eq!(rruff.format_value(107.9252), "107.9252");
        assert_eq!(rruff.format_value(66.16613), "66.16613");
        assert_eq!(rruff.format_value(-12.3456789), "-12.3456");
        assert_eq!(rruff.format_value(12345678.9), "12345678");
        assert_eq!(WriteOptions::jcamp().format_value(1000.0), "1000.000000");
    }

    fn axes<'a>(x: &'a [f64], y: &'a [f64]) -> SpectrumAxes<'a> {
        SpectrumAxes {
            x,
            y,
            x_unitref: unit_ref(&X_UNITS, "1/CM"),
            x_unitstr: None,
            y_unitstr: Some("ABSORBANCE".to_string()),
            xfactor: None,
            yfactor: Some(0.5),
            x_label: axis_label("Wave Numbers", Some("1/CM")),
            y_label: axis_label("Intensity", Some("ABSORBANCE")),
        }
    }

    #[test]
    fn test_build_datagroup() {
        let x = [400.0, 450.5, 500.0];
        let y = [3.0, 1.0, 2.0];
        let mut cursor = DatasetCursor::default();
        let (group, [xs, ys]) = build_datagroup(&axes(&x, &y), &mut cursor);

        assert_eq!(group.id, "datagroup/1/");
        assert_eq!(group.attributes.len(), 11);
        let number = |prop: &str| group.attribute(prop).unwrap().value.number.to_string();
        assert_eq!(number(PROP_COUNT), "3");
        assert_eq!(number(PROP_FIRST_X), "400");
        assert_eq!(number(PROP_MAX_X), "500");
        assert_eq!(number(PROP_MIN_Y), "1");
        assert_eq!(number(PROP_LAST_Y), "2");
        assert_eq!(number(PROP_X_FACTOR), "1");
        assert_eq!(number(PROP_Y_FACTOR), "0.5");
        assert_eq!(
            group.attribute(PROP_MIN_X).unwrap().value.unitref.as_deref(),
            Some("qudt:PER-CentiM")
        );
        assert!(group.attribute(PROP_MIN_Y).unwrap().value.unitref.is_none());
        assert_eq!(group.attributes[10].id, "attribute/11/");

        assert_eq!(xs.id, "dataseries/1/");
        assert_eq!(xs.label, "Wave Numbers (1/CM)");
        assert_eq!(ys.parameter.valuearray.unitstr.as_deref(), Some("ABSORBANCE"));
        assert_eq!(ys.parameter.valuearray.numberarray, y.to_vec());
        assert_eq!(group.dataserieses, vec!["dataseries/1/", "dataseries/2/"]);

        let (second, [xs2, _]) = build_datagroup(&axes(&x, &y), &mut cursor);
        assert_eq!(second.id, "datagroup/2/");
        assert_eq!(second.attributes[0].id, "attribute/12/");
        assert_eq!(xs2.id, "dataseries/3/");
    }

    #[test]
    fn test_build_datagroup_empty_spectrum() {
        let mut cursor = DatasetCursor::default();
        let (group, [xs, ys]) = build_datagroup(&axes(&[], &[]), &mut cursor);
        let properties: Vec<&str> = group.attributes.iter().map(|a| a.property.as_str()).collect();
        assert_eq!(properties, vec![PROP_COUNT, PROP_X_FACTOR, PROP_Y_FACTOR]);
        assert_eq!(group.attributes[0].value.number, HeaderValue::Text("0".into()));
        assert_eq!(group.attributes[2].id, "attribute/3/");
        assert_eq!(group.attributes[2].value.number, HeaderValue::Text("0.5".into()));
        assert!(group.attribute(PROP_FIRST_X).is_none());
        assert!(xs.parameter.valuearray.numberarray.is_empty());
        assert!(ys.parameter.valuearray.numberarray.is_empty());
        assert_eq!(cursor.attribute, 4);
        assert_eq!(cursor.series, 3);
    }

    #[test]
    fn test_write_data_section_divides_factors() {
        let x = [400.0, 500.0];
        let y = [3.0, 1.0];
        let mut cursor = DatasetCursor::default();
        let (group, series) = build_datagroup(&axes(&x, &y), &mut cursor);
        let dataset = Dataset {
            datagroup: vec![group],
            dataseries: series.to_vec(),
            ..Default::default()
        };
        let mut out = Vec::new();
        let options = WriteOptions {
            precision: 1,
            trim: None,
        };
        write_data_section(&mut out, &dataset, &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "400.0, 6.0\n500.0, 2.0\n");
    }

    #[test]
    fn test_write_data_section_needs_series() {
        let mut out = Vec::new();
        assert!(matches!(
            write_data_section(&mut out, &Dataset::default(), &WriteOptions::default()),
            Err(ConvertError::MissingField(_))
        ));
    }

    #[test]
    fn test_bad_factor_attribute() {
        let x = [1.0];
        let mut cursor = DatasetCursor::default();
        let (mut group, series) = build_datagroup(&axes(&x, &x), &mut cursor);
        group.attributes.last_mut().unwrap().value.number = HeaderValue::Text("lots".into());
        let dataset = Dataset {
            datagroup: vec![group],
            dataseries: series.to_vec(),
            ..Default::default()
        };
        assert!(matches!(
            attribute_number(&dataset, PROP_Y_FACTOR),
            Err(ConvertError::InvalidAttribute { value, .. }) if value == "lots"
        ));
    }
}
