//! Wizard controller - step sequencing, validation gating, submission

pub mod controller;
pub mod submit;

pub use controller::{StepOutcome, SubmitOutcome, Wizard, WizardError, WizardState};
pub use submit::{FileSubmitter, StdoutSubmitter, SubmitError, Submitter};
