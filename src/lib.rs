//! Intake: multi-step application-form toolkit
//!
//! Declarative validation schemas and a step-gated wizard controller for
//! application intake forms (passport, citizenship, family information),
//! plus a terminal front end that runs them interactively.

pub mod cli;
pub mod core;
pub mod schema;
pub mod wizard;
