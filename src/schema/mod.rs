//! Schema system - form definitions, registry, and validation

pub mod definition;
pub mod registry;
pub mod report;
pub mod validator;

pub use definition::{CrossRuleDef, FieldDef, FieldKind, FormDefinition, RuleDef, StepDef};
pub use registry::FormRegistry;
pub use report::RecordValidationError;
pub use validator::{FormValidator, SchemaError};
