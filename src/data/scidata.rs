/// SciData JSON-LD document model
///
/// Typed mirror of the SciData framework document
/// (https://stuchalk.github.io/scidata/). Unrecognised keys of the open
/// records are kept in `extra` maps so documents read from disk survive a
/// round trip.

use std::collections::BTreeMap;

use jcamp_dx::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const SCIDATA_CONTEXT_URL: &str = "https://stuchalk.github.io/scidata/contexts/scidata.jsonld";
pub const SCIDATA_VERSION: u32 = 2;

/// Namespace prefixes declared in every document's `@context`.
pub const NAMESPACES: [(&str, &str); 9] = [
    ("sdo", "https://stuchalk.github.io/scidata/ontology/scidata.owl#"),
    ("sub", "https://stuchalk.github.io/scidata/ontology/substance.owl#"),
    ("chm", "https://stuchalk.github.io/scidata/ontology/chemical.owl#"),
    ("w3i", "https://w3id.org/skgo/modsci#"),
    ("cao", "http://champ-project.org/images/ontology/cao.owl#"),
    ("qudt", "http://qudt.org/vocab/unit/"),
    ("obo", "http://purl.obolibrary.org/obo/"),
    ("dc", "http://purl.org/dc/terms/"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// One entry of the `@context` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextEntry {
    Url(String),
    Prefixes(BTreeMap<String, String>),
}

/// The default SciData `@context`.
pub fn default_context() -> Vec<ContextEntry> {
    let prefixes = NAMESPACES
        .iter()
        .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
        .collect();
    vec![
        ContextEntry::Url(SCIDATA_CONTEXT_URL.to_string()),
        ContextEntry::Prefixes(prefixes),
    ]
}

/// A `@type` that is either a single term or a list of terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    One(String),
    Many(Vec<String>),
}

impl TypeTag {
    pub fn contains(&self, term: &str) -> bool {
        match self {
            TypeTag::One(t) => t == term,
            TypeTag::Many(ts) => ts.iter().any(|t| t == term),
        }
    }
}

impl Default for TypeTag {
    fn default() -> Self {
        TypeTag::One(String::new())
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        TypeTag::One(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SciDataDocument {
    #[serde(rename = "@context", default = "default_context")]
    pub context: Vec<ContextEntry>,
    #[serde(rename = "generatedAt", default)]
    pub generated_at: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@graph")]
    pub graph: Graph,
}

fn default_version() -> u32 {
    SCIDATA_VERSION
}

impl SciDataDocument {
    /// Empty document carrying the default context and section ids.
    pub fn new(generated_at: impl Into<String>) -> Self {
        Self {
            context: default_context(),
            generated_at: generated_at.into(),
            version: SCIDATA_VERSION,
            id: String::new(),
            graph: Graph::default(),
        }
    }

    pub fn scidata(&self) -> &SciData {
        &self.graph.scidata
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@type", default = "Graph::default_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Vec<Author>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub scidata: SciData,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Graph {
    fn default_type() -> String {
        "sdo:scidataFramework".to_string()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: Graph::default_type(),
            uid: None,
            title: None,
            publisher: None,
            description: None,
            author: Vec::new(),
            sources: Vec::new(),
            scidata: SciData::default(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reftype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SciData {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub property: Vec<String>,
    #[serde(default)]
    pub methodology: Methodology,
    #[serde(default)]
    pub system: System,
    #[serde(default)]
    pub dataset: Dataset,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Default for SciData {
    fn default() -> Self {
        Self {
            id: "scidata".to_string(),
            kind: "sdo:scientificData".to_string(),
            types: Vec::new(),
            property: Vec::new(),
            methodology: Methodology::default(),
            system: System::default(),
            dataset: Dataset::default(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(default)]
    pub evaluation: Vec<String>,
    #[serde(default)]
    pub aspects: Vec<Aspect>,
}

impl Default for Methodology {
    fn default() -> Self {
        Self {
            id: "methodology".to_string(),
            kind: "sdo:methodology".to_string(),
            evaluation: Vec::new(),
            aspects: Vec::new(),
        }
    }
}

impl Methodology {
    /// First aspect whose `@id` starts with `prefix`.
    pub fn aspect(&self, prefix: &str) -> Option<&Aspect> {
        self.aspects.iter().find(|a| a.id.starts_with(prefix))
    }
}

/// A measurement or procedure aspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aspect {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<Setting>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Aspect {
    /// Setting whose property matches `property`, ignoring case.
    pub fn setting(&self, property: &str) -> Option<&Setting> {
        self.settings
            .iter()
            .find(|s| s.property.eq_ignore_ascii_case(property))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub quantity: String,
    pub property: String,
    pub value: NumericValue,
}

/// `value` record of a setting, attribute or facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub number: HeaderValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitstr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdiscipline: Option<String>,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

impl Default for System {
    fn default() -> Self {
        Self {
            id: "system/".to_string(),
            kind: "sdo:system".to_string(),
            discipline: None,
            subdiscipline: None,
            facets: Vec::new(),
        }
    }
}

impl System {
    /// First facet whose `@id` starts with `prefix`.
    pub fn facet(&self, prefix: &str) -> Option<&Facet> {
        self.facets.iter().find(|f| f.id.starts_with(prefix))
    }
}

/// A compound, substance, condition or material facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<NumericValue>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub datagroup: Vec<DataGroup>,
    #[serde(default)]
    pub dataseries: Vec<DataSeries>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            id: "dataset/".to_string(),
            kind: "sdo:dataset".to_string(),
            source: None,
            scope: None,
            datagroup: Vec::new(),
            dataseries: Vec::new(),
        }
    }
}

/// Summary statistics of one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGroup {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub dataserieses: Vec<String>,
}

impl DataGroup {
    pub fn attribute(&self, property: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.property.eq_ignore_ascii_case(property))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub quantity: String,
    pub property: String,
    pub value: NumericValue,
}

/// One axis of a spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub axis: String,
    pub parameter: Parameter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub quantity: String,
    pub property: String,
    pub valuearray: ValueArray,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueArray {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub datatype: String,
    pub numberarray: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitstr: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_shape() {
        let doc = SciDataDocument::new("2024-01-01 00:00:00");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["@id"], "");
        assert_eq!(json["generatedAt"], "2024-01-01 00:00:00");
        assert_eq!(json["@context"][0], SCIDATA_CONTEXT_URL);
        assert_eq!(json["@context"][1]["qudt"], "http://qudt.org/vocab/unit/");
        assert_eq!(json["@graph"]["@type"], "sdo:scidataFramework");
        assert_eq!(json["@graph"]["scidata"]["@id"], "scidata");
        assert_eq!(json["@graph"]["scidata"]["methodology"]["@type"], "sdo:methodology");
        assert_eq!(json["@graph"]["scidata"]["system"]["@id"], "system/");
        assert_eq!(json["@graph"]["scidata"]["dataset"]["@id"], "dataset/");
        assert!(json["@graph"].get("uid").is_none());
    }

    #[test]
    fn test_unknown_keys_survive() {
        let text = r#"{
            "@context": ["https://example.org/ctx.jsonld"],
            "version": 2,
            "@id": "",
            "generatedAt": "now",
            "@graph": {
                "@id": "",
                "@type": "sdo:scidataFramework",
                "toc": ["sdo:methodology"],
                "scidata": {
                    "@id": "scidata",
                    "@type": "sdo:scientificData",
                    "system": {
                        "@id": "system/",
                        "@type": "sdo:system",
                        "facets": [{
                            "@id": "material/1/",
                            "@type": ["sdo:facet", "sdo:material"],
                            "materialType": "SiO2",
                            "hardness": 7
                        }]
                    }
                }
            }
        }"#;
        let doc: SciDataDocument = serde_json::from_str(text).unwrap();
        assert_eq!(doc.graph.extra["toc"], serde_json::json!(["sdo:methodology"]));
        let facet = doc.scidata().system.facet("material").unwrap();
        assert!(facet.kind.contains("sdo:material"));
        assert_eq!(facet.material_type.as_deref(), Some("SiO2"));
        assert_eq!(facet.extra["hardness"], 7);

        let again: SciDataDocument = serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn test_numeric_value_number_kinds() {
        let setting: NumericValue =
            serde_json::from_str(r#"{"@id": "setting/1/value/", "number": 780, "unitref": "qudt:NanoM"}"#).unwrap();
        assert_eq!(setting.number, HeaderValue::Int(780));
        let attribute: NumericValue =
            serde_json::from_str(r#"{"@id": "attribute/1/value/", "@type": "sdo:value", "number": "2444"}"#).unwrap();
        assert_eq!(attribute.number, HeaderValue::Text("2444".into()));
        assert_eq!(
            serde_json::to_value(&attribute).unwrap()["number"],
            serde_json::json!("2444")
        );
    }
}
