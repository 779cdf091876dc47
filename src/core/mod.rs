//! Core data model - field paths, records, and validation reports

pub mod errors;
pub mod path;
pub mod record;

pub use errors::{ErrorNode, ValidationReport};
pub use path::{FieldPath, PathError, Segment};
pub use record::{EntryId, FileMeta, Record, RecordError, Value};
