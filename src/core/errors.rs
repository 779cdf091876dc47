//! Validation report - a tagged tree of field error messages
//!
//! Field and cross-field errors are data, never propagated as `Err`:
//! validation always returns a report, and an empty report means valid.

use std::collections::BTreeMap;

use crate::core::path::FieldPath;

/// A node in the error tree: either messages for one path, or children.
///
/// A `Leaf` at an intermediate position marks the whole subtree as
/// erroneous, which is how group-level cross-field errors (e.g. on
/// `spouseNames` as a whole) surface without naming an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNode {
    /// Ordered messages attached to this exact path (UI shows the first)
    Leaf(Vec<String>),
    /// Nested errors keyed by the next path segment
    Branch(BTreeMap<String, ErrorNode>),
}

/// The outcome of validating a record: empty means valid, otherwise a
/// tree of messages addressed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    root: BTreeMap<String, ErrorNode>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.root.is_empty()
    }

    /// Attach a message at `path`.
    ///
    /// Intermediate branches are created as needed. If an existing leaf is
    /// met mid-path the message is appended there, since that leaf already
    /// covers the subtree. Attaching where a branch sits replaces it with
    /// a leaf: a group-level error is what the UI shows.
    pub fn attach(&mut self, path: &FieldPath, message: impl Into<String>) {
        let message = message.into();
        let segments = path.segments();
        let mut current = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            let key = segment.as_key();
            let at_last = i == segments.len() - 1;
            if at_last {
                match current.entry(key).or_insert_with(|| ErrorNode::Leaf(Vec::new())) {
                    ErrorNode::Leaf(messages) => messages.push(message),
                    node @ ErrorNode::Branch(_) => *node = ErrorNode::Leaf(vec![message]),
                }
                return;
            }
            let node = current
                .entry(key)
                .or_insert_with(|| ErrorNode::Branch(BTreeMap::new()));
            match node {
                ErrorNode::Leaf(messages) => {
                    messages.push(message);
                    return;
                }
                ErrorNode::Branch(children) => current = children,
            }
        }
    }

    /// Whether `path` carries an error.
    ///
    /// Returns true as soon as a leaf is met, even before the final
    /// segment; returns false when a segment is absent or the walk ends on
    /// a branch. The early stop is what lets an error on `spouseNames`
    /// answer for `spouseNames.0.name`.
    pub fn has_error_at(&self, path: &FieldPath) -> bool {
        let mut current = &self.root;
        for segment in path.segments() {
            match current.get(&segment.as_key()) {
                None => return false,
                Some(ErrorNode::Leaf(_)) => return true,
                Some(ErrorNode::Branch(children)) => current = children,
            }
        }
        false
    }

    /// First message on the walk to `path`, honoring the early-leaf rule
    pub fn first_message(&self, path: &FieldPath) -> Option<&str> {
        let mut current = &self.root;
        for segment in path.segments() {
            match current.get(&segment.as_key())? {
                ErrorNode::Leaf(messages) => return messages.first().map(String::as_str),
                ErrorNode::Branch(children) => current = children,
            }
        }
        None
    }

    /// All `(path, messages)` pairs in path order, for display
    pub fn flatten(&self) -> Vec<(String, &[String])> {
        let mut out = Vec::new();
        collect(&self.root, String::new(), &mut out);
        out
    }

    /// Total number of messages in the report
    pub fn error_count(&self) -> usize {
        self.flatten().iter().map(|(_, msgs)| msgs.len()).sum()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for (path, messages) in other.flatten() {
            if let Ok(parsed) = FieldPath::parse(&path) {
                for message in messages {
                    self.attach(&parsed, message.clone());
                }
            }
        }
    }
}

fn collect<'a>(
    nodes: &'a BTreeMap<String, ErrorNode>,
    prefix: String,
    out: &mut Vec<(String, &'a [String])>,
) {
    for (key, node) in nodes {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match node {
            ErrorNode::Leaf(messages) => out.push((path, messages.as_slice())),
            ErrorNode::Branch(children) => collect(children, path, out),
        }
    }
}
