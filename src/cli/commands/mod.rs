//! Command implementations

pub mod completions;
pub mod forms;
pub mod run;
pub mod schema;
pub mod validate;
