//! Record values with explicit presence and stable repeatable-group entries

use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use ulid::Ulid;

use crate::core::path::{FieldPath, Segment};

/// Descriptor for a selected file attachment.
///
/// The file-selection layer supplies exactly these three attributes; the
/// file contents are never read by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original file name
    pub name: String,

    /// MIME type, e.g. `application/pdf`
    #[serde(rename = "type")]
    pub media_type: String,

    /// Size in bytes
    pub size: u64,
}

/// Stable identity of a repeatable-group entry.
///
/// Generated at append time; array positions shift on removal, the id
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Ulid);

impl EntryId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a repeatable group
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub value: Value,
}

impl Entry {
    fn empty() -> Self {
        Self {
            id: EntryId::new(),
            value: Value::Group(BTreeMap::new()),
        }
    }
}

/// A field value.
///
/// Dates are carried as `Text`; "does not parse" is a validation outcome,
/// not a construction failure.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Bool(bool),
    File(FileMeta),
    Group(BTreeMap<String, Value>),
    List(Vec<Entry>),
}

impl Value {
    /// JSON form of this value; entry ids are display-only and omitted
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::File(meta) => json!({
                "name": meta.name,
                "type": meta.media_type,
                "size": meta.size,
            }),
            Value::Group(map) => {
                let mut out = JsonMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                JsonValue::Object(out)
            }
            Value::List(entries) => {
                JsonValue::Array(entries.iter().map(|e| e.value.to_json()).collect())
            }
        }
    }
}

/// A form record: field name to value, groups nested, repeatable groups
/// as ordered entry lists. Fields may be absent until visited.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up the value at `path`, if present
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut segments = path.segments().iter();
        let mut current = match segments.next()? {
            Segment::Key(k) => self.fields.get(k)?,
            Segment::Index(_) => return None,
        };
        for segment in segments {
            current = match (segment, current) {
                (Segment::Key(k), Value::Group(map)) => map.get(k)?,
                (Segment::Index(i), Value::List(entries)) => &entries.get(*i)?.value,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set the value at `path`, creating intermediate groups as needed.
    ///
    /// Index segments must refer to existing entries; entries are only
    /// created through [`Record::append_entry`]. A rejected set leaves
    /// the record untouched: the path is checked read-only before any
    /// group is created.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), RecordError> {
        let mut walked = Vec::new();
        Self::check_set(&self.fields, path.segments(), &mut walked)?;

        let segments = path.segments();
        let (last, prefix) = segments.split_last().ok_or(RecordError::EmptyPath)?;

        let mut current: &mut BTreeMap<String, Value> = &mut self.fields;
        let mut walked: Vec<Segment> = Vec::new();
        for segment in prefix {
            walked.push(segment.clone());
            match segment {
                Segment::Key(k) => {
                    let entry = current
                        .entry(k.clone())
                        .or_insert_with(|| Value::Group(BTreeMap::new()));
                    current = match entry {
                        Value::Group(map) => map,
                        Value::List(entries) => {
                            // next segment must index into the list
                            return Self::descend_list(entries, segments, walked, value);
                        }
                        _ => return Err(RecordError::NotAGroup(join_segments(&walked))),
                    };
                }
                Segment::Index(_) => {
                    return Err(RecordError::NotAList(join_segments(&walked)));
                }
            }
        }

        match last {
            Segment::Key(k) => {
                current.insert(k.clone(), value);
                Ok(())
            }
            Segment::Index(_) => Err(RecordError::NotAList(path.to_string())),
        }
    }

    // Read-only mirror of the `set` walk. Every error the mutation could
    // hit is raised here first, so no intermediate group outlives a
    // failed edit.
    fn check_set(
        map: &BTreeMap<String, Value>,
        segments: &[Segment],
        walked: &mut Vec<Segment>,
    ) -> Result<(), RecordError> {
        let Some((first, rest)) = segments.split_first() else {
            return Err(RecordError::EmptyPath);
        };
        walked.push(first.clone());
        let Segment::Key(key) = first else {
            return Err(RecordError::NotAList(join_segments(walked)));
        };
        if rest.is_empty() {
            return Ok(());
        }
        match map.get(key) {
            // absent subtree: the mutation creates groups, never entries
            None => {
                if rest.iter().any(|s| matches!(s, Segment::Index(_))) {
                    Err(RecordError::NotAList(join_segments(walked)))
                } else {
                    Ok(())
                }
            }
            Some(Value::Group(sub)) => Self::check_set(sub, rest, walked),
            Some(Value::List(entries)) => {
                let group_path = join_segments(walked);
                let Some((next, after)) = rest.split_first() else {
                    return Err(RecordError::NotAGroup(group_path));
                };
                let Segment::Index(index) = next else {
                    return Err(RecordError::NotAGroup(group_path));
                };
                let entry = entries
                    .get(*index)
                    .ok_or(RecordError::NoSuchEntry { group: group_path.clone(), index: *index })?;
                walked.push(next.clone());
                if after.is_empty() {
                    return Ok(());
                }
                match &entry.value {
                    Value::Group(sub) => Self::check_set(sub, after, walked),
                    _ => Err(RecordError::NotAGroup(group_path)),
                }
            }
            Some(_) => Err(RecordError::NotAGroup(join_segments(walked))),
        }
    }

    // Continues a `set` walk that entered a list value.
    fn descend_list(
        entries: &mut [Entry],
        segments: &[Segment],
        walked: Vec<Segment>,
        value: Value,
    ) -> Result<(), RecordError> {
        let group_path = join_segments(&walked);
        let mut rest = segments[walked.len()..].iter();
        let index = match rest.next() {
            Some(Segment::Index(i)) => *i,
            _ => return Err(RecordError::NotAGroup(group_path)),
        };
        let entry = entries
            .get_mut(index)
            .ok_or(RecordError::NoSuchEntry { group: group_path.clone(), index })?;

        // remaining segments address into the entry's group
        let remaining: Vec<Segment> = rest.cloned().collect();
        if remaining.is_empty() {
            entry.value = value;
            return Ok(());
        }
        match &mut entry.value {
            Value::Group(map) => {
                let mut sub = Record { fields: std::mem::take(map) };
                let sub_path = FieldPath::from_segments(remaining)
                    .map_err(|_| RecordError::EmptyPath)?;
                let result = sub.set(&sub_path, value);
                *map = sub.fields;
                result
            }
            _ => Err(RecordError::NotAGroup(group_path)),
        }
    }

    /// Append an empty entry to the repeatable group at `group`, creating
    /// the group if absent. Returns the new entry's stable id.
    pub fn append_entry(&mut self, group: &FieldPath) -> Result<EntryId, RecordError> {
        let entries = self.list_mut(group, true)?;
        let entry = Entry::empty();
        let id = entry.id;
        entries.push(entry);
        Ok(id)
    }

    /// Remove the entry at `index` from the group, shifting later entries
    /// down. Returns the removed entry's id.
    pub fn remove_entry(&mut self, group: &FieldPath, index: usize) -> Result<EntryId, RecordError> {
        let group_path = group.to_string();
        let entries = self.list_mut(group, false)?;
        if index >= entries.len() {
            return Err(RecordError::NoSuchEntry { group: group_path, index });
        }
        Ok(entries.remove(index).id)
    }

    /// Number of entries in the group; zero when the group is absent
    pub fn entry_count(&self, group: &FieldPath) -> usize {
        match self.get(group) {
            Some(Value::List(entries)) => entries.len(),
            _ => 0,
        }
    }

    /// Entry ids of the group, in display order
    pub fn entry_ids(&self, group: &FieldPath) -> Vec<EntryId> {
        match self.get(group) {
            Some(Value::List(entries)) => entries.iter().map(|e| e.id).collect(),
            _ => Vec::new(),
        }
    }

    /// Drop every field
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// The submission payload: the record serialized as-is
    pub fn to_json(&self) -> JsonValue {
        let mut out = JsonMap::new();
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.to_json());
        }
        JsonValue::Object(out)
    }

    fn list_mut(
        &mut self,
        group: &FieldPath,
        create: bool,
    ) -> Result<&mut Vec<Entry>, RecordError> {
        let group_path = group.to_string();
        let segments = group.segments();
        let (last, prefix) = segments.split_last().ok_or(RecordError::EmptyPath)?;

        let mut current: &mut BTreeMap<String, Value> = &mut self.fields;
        let mut walked: Vec<Segment> = Vec::new();
        for segment in prefix {
            walked.push(segment.clone());
            match segment {
                Segment::Key(k) => {
                    let entry = current
                        .entry(k.clone())
                        .or_insert_with(|| Value::Group(BTreeMap::new()));
                    current = match entry {
                        Value::Group(map) => map,
                        _ => return Err(RecordError::NotAGroup(join_segments(&walked))),
                    };
                }
                Segment::Index(_) => {
                    return Err(RecordError::NotAList(join_segments(&walked)));
                }
            }
        }

        let key = match last {
            Segment::Key(k) => k.clone(),
            Segment::Index(_) => return Err(RecordError::NotAList(group_path)),
        };
        if create {
            let slot = current
                .entry(key)
                .or_insert_with(|| Value::List(Vec::new()));
            match slot {
                Value::List(entries) => Ok(entries),
                _ => Err(RecordError::NotAList(group_path)),
            }
        } else {
            match current.get_mut(&key) {
                Some(Value::List(entries)) => Ok(entries),
                Some(_) => Err(RecordError::NotAList(group_path)),
                None => Err(RecordError::NoSuchGroup(group_path)),
            }
        }
    }
}

fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.as_key())
        .collect::<Vec<_>>()
        .join(".")
}

/// Errors that can occur when editing a record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("field path is empty")]
    EmptyPath,

    #[error("'{0}' is not a group")]
    NotAGroup(String),

    #[error("'{0}' is not a repeatable group")]
    NotAList(String),

    #[error("repeatable group '{0}' does not exist")]
    NoSuchGroup(String),

    #[error("no entry {index} in repeatable group '{group}'")]
    NoSuchEntry { group: String, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_set_and_get_nested() {
        let mut record = Record::new();
        record
            .set(&path("address.zip"), Value::Text("62701".to_string()))
            .unwrap();
        match record.get(&path("address.zip")) {
            Some(Value::Text(s)) => assert_eq!(s, "62701"),
            other => panic!("unexpected value: {:?}", other),
        }
        assert!(record.get(&path("address.street")).is_none());
    }

    #[test]
    fn test_absent_field_is_none() {
        let record = Record::new();
        assert!(record.get(&path("firstName")).is_none());
    }

    #[test]
    fn test_append_and_set_entry_field() {
        let mut record = Record::new();
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap();
        match record.get(&path("spouseNames.0.name")) {
            Some(Value::Text(s)) => assert_eq!(s, "Ann"),
            other => panic!("unexpected value: {:?}", other),
        }
        assert_eq!(record.entry_count(&path("spouseNames")), 1);
    }

    #[test]
    fn test_remove_entry_shifts_indices_and_keeps_ids() {
        let mut record = Record::new();
        let first = record.append_entry(&path("children")).unwrap();
        let second = record.append_entry(&path("children")).unwrap();
        assert_ne!(first, second);
        record
            .set(&path("children.1.name"), Value::Text("Ben".to_string()))
            .unwrap();

        let removed = record.remove_entry(&path("children"), 0).unwrap();
        assert_eq!(removed, first);
        assert_eq!(record.entry_count(&path("children")), 1);
        assert_eq!(record.entry_ids(&path("children")), vec![second]);
        // the surviving entry is now at index 0
        match record.get(&path("children.0.name")) {
            Some(Value::Text(s)) => assert_eq!(s, "Ben"),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_remove_entry_out_of_bounds() {
        let mut record = Record::new();
        record.append_entry(&path("children")).unwrap();
        let err = record.remove_entry(&path("children"), 5).unwrap_err();
        assert!(matches!(err, RecordError::NoSuchEntry { index: 5, .. }));
    }

    #[test]
    fn test_set_through_missing_index_fails() {
        let mut record = Record::new();
        let err = record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap_err();
        // no entry has been appended, and spouseNames is not a group
        assert!(matches!(
            err,
            RecordError::NotAList(_) | RecordError::NoSuchEntry { .. } | RecordError::NotAGroup(_)
        ));
    }

    #[test]
    fn test_failed_set_leaves_record_unchanged() {
        let mut record = Record::new();
        record
            .set(&path("firstName"), Value::Text("Jane".to_string()))
            .unwrap();

        // no entry appended: the edit is rejected and must not create
        // an empty group under spouseNames
        record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap_err();
        assert!(record.get(&path("spouseNames")).is_none());

        // a bad index into an existing group leaves it untouched too
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.3.name"), Value::Text("Ann".to_string()))
            .unwrap_err();
        assert_eq!(record.entry_count(&path("spouseNames")), 1);
        assert!(record.get(&path("spouseNames.0.name")).is_none());

        // descending through a scalar is rejected without residue
        record
            .set(&path("firstName.sub"), Value::Text("x".to_string()))
            .unwrap_err();
        match record.get(&path("firstName")) {
            Some(Value::Text(s)) => assert_eq!(s, "Jane"),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_to_json_payload_shape() {
        let mut record = Record::new();
        record
            .set(&path("firstName"), Value::Text("Jane".to_string()))
            .unwrap();
        record
            .set(&path("agreeToDeclaration"), Value::Bool(true))
            .unwrap();
        record
            .set(
                &path("certificate"),
                Value::File(FileMeta {
                    name: "cert.pdf".to_string(),
                    media_type: "application/pdf".to_string(),
                    size: 1024,
                }),
            )
            .unwrap();
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap();

        let payload = record.to_json();
        assert_eq!(payload["firstName"], "Jane");
        assert_eq!(payload["agreeToDeclaration"], true);
        assert_eq!(payload["certificate"]["type"], "application/pdf");
        assert_eq!(payload["spouseNames"][0]["name"], "Ann");
        // entry ids never leak into the payload
        assert!(payload["spouseNames"][0].get("id").is_none());
    }

    #[test]
    fn test_clear_empties_record() {
        let mut record = Record::new();
        record
            .set(&path("firstName"), Value::Text("Jane".to_string()))
            .unwrap();
        record.clear();
        assert!(record.is_empty());
    }
}
