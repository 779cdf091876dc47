//! Declarative form definitions
//!
//! A form is described by a YAML document: ordered steps (each owning a
//! fixed set of field paths), per-field rules, and cross-field rules.
//! Definitions are pure data; they compile into a
//! [`FormValidator`](crate::schema::validator::FormValidator).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::path::{FieldPath, Segment};
use crate::core::record::{FileMeta, Record, RecordError, Value};

/// A complete form: identity, step order, field rules, cross-field rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Short name used on the command line (`passport`)
    pub name: String,

    /// Human-readable title shown in the wizard header
    pub title: String,

    /// Ordered wizard steps
    pub steps: Vec<StepDef>,

    /// Per-field declarations
    pub fields: Vec<FieldDef>,

    /// Rules spanning more than one field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cross_rules: Vec<CrossRuleDef>,
}

/// A named step owning a fixed set of field paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub name: String,
    pub fields: Vec<FieldPath>,
}

/// Field kinds drive both prompting and the shape check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Bool,
    Select,
    File,
    List,
}

/// One field's declaration: addressing, kind, and chained rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub path: FieldPath,

    /// Label used in prompts and fallback messages
    pub label: String,

    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Message when a required field is absent or blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_message: Option<String>,

    /// Allowed values for `select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDef>,

    /// Item declaration for `list` fields; its path is relative to an entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<FieldDef>>,
}

impl FieldDef {
    /// The message for a missing or blank required value
    pub fn required_message(&self) -> String {
        self.required_message
            .clone()
            .unwrap_or_else(|| format!("{} is required", self.label))
    }
}

/// A single-field rule with its human-readable messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleDef {
    /// String length bounds, measured on the trimmed value
    Length {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_message: Option<String>,
    },

    /// Regex format check
    Pattern { pattern: String, message: String },

    /// Numeric range on a text value parsed as a number
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        message: String,
    },

    /// Date-of-birth style check: the value must parse as `YYYY-MM-DD`
    /// and fall within `now - max years ..= now - min years`
    Age {
        #[serde(default)]
        min: u32,
        #[serde(default = "default_max_age")]
        max: u32,
        message: String,
    },

    /// File attachment constraints; each sub-condition has its own message
    Attachment {
        max_bytes: u64,
        types: Vec<String>,
        type_message: String,
        size_message: String,
    },

    /// Boolean that must be exactly `true` (declarations)
    Accepted { message: String },
}

fn default_max_age() -> u32 {
    120
}

/// A rule whose outcome depends on more than one field, reported against
/// one designated path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossRuleDef {
    /// A repeatable group must be non-empty iff a boolean flag is true.
    /// Violations attach to the list's path, not the flag's.
    ListMatchesFlag {
        flag: FieldPath,
        list: FieldPath,
        require_message: String,
        forbid_message: String,
    },
}

impl FormDefinition {
    /// Parse a definition from its YAML source
    pub fn from_yaml(source: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(source)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Field paths owned by the step at `index`
    pub fn step_fields(&self, index: usize) -> &[FieldPath] {
        self.steps
            .get(index)
            .map(|s| s.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Find the declaration for an exact field path
    pub fn field(&self, path: &FieldPath) -> Option<&FieldDef> {
        self.fields.iter().find(|f| &f.path == path)
    }

    /// Rebuild a record from a stored JSON document, guided by field
    /// kinds. Keys the definition does not declare are ignored.
    pub fn record_from_json(&self, json: &JsonValue) -> Result<Record, RecordError> {
        let mut record = Record::new();
        for field in &self.fields {
            let Some(value) = lookup_json(json, &field.path) else {
                continue;
            };
            match field.kind {
                FieldKind::Bool => {
                    if let Some(b) = value.as_bool() {
                        record.set(&field.path, Value::Bool(b))?;
                    }
                }
                FieldKind::File => {
                    if let Some(meta) = file_from_json(value) {
                        record.set(&field.path, Value::File(meta))?;
                    }
                }
                FieldKind::List => {
                    let Some(elements) = value.as_array() else {
                        continue;
                    };
                    let Some(item) = field.item.as_deref() else {
                        continue;
                    };
                    for (i, element) in elements.iter().enumerate() {
                        record.append_entry(&field.path)?;
                        let entry_path = field.path.child(Segment::Index(i));
                        let item_path = entry_path.join(&item.path);
                        // entries are objects keyed by the item path, but a
                        // bare scalar entry is accepted as shorthand
                        let item_value = lookup_json(element, &item.path).or(Some(element));
                        if let Some(text) = item_value.and_then(text_from_json) {
                            record.set(&item_path, Value::Text(text))?;
                        }
                    }
                }
                FieldKind::Text | FieldKind::Date | FieldKind::Select => {
                    if let Some(text) = text_from_json(value) {
                        record.set(&field.path, Value::Text(text))?;
                    }
                }
            }
        }
        Ok(record)
    }
}

fn lookup_json<'a>(json: &'a JsonValue, path: &FieldPath) -> Option<&'a JsonValue> {
    let mut current = json;
    for segment in path.segments() {
        current = match segment {
            Segment::Key(k) => current.as_object()?.get(k)?,
            Segment::Index(i) => current.as_array()?.get(*i)?,
        };
    }
    Some(current)
}

fn text_from_json(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn file_from_json(value: &JsonValue) -> Option<FileMeta> {
    let obj = value.as_object()?;
    Some(FileMeta {
        name: obj.get("name")?.as_str()?.to_string(),
        media_type: obj.get("type")?.as_str()?.to_string(),
        size: obj.get("size")?.as_u64()?,
    })
}
