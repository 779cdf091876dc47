//! The wizard state machine
//!
//! Sequences a form's steps, gates forward navigation on partial
//! validation of the current step's fields, and gates submission on full
//! validation. The record is exclusively owned by the wizard and mutated
//! only through its edit operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::core::errors::ValidationReport;
use crate::core::path::FieldPath;
use crate::core::record::{EntryId, Record, RecordError, Value};
use crate::schema::definition::FormDefinition;
use crate::schema::validator::{FormValidator, SchemaError};
use crate::wizard::submit::{SubmitError, Submitter};

/// Controller state. `Done` is terminal; only `reset` leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Editing the step at this index (0-based, always within bounds)
    Editing(usize),
    /// Submission in flight; navigation is disabled
    Submitting,
    /// Submitted; the record has been handed to the collaborator
    Done,
}

/// Outcome of an `advance` attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the step at this index
    Advanced(usize),
    /// Current step failed partial validation; errors are surfaced
    Rejected,
    /// Already at the last step; advancing is a no-op
    AtLastStep,
}

/// Outcome of a `submit` attempt
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Full validation failed; still editing the last step
    Rejected,
    /// Collaborator accepted the payload; wizard is `Done`
    Delivered,
    /// Collaborator failed; wizard is still `Done`, the failure is the
    /// caller's to log or surface
    DeliveryFailed(SubmitError),
}

/// Errors for operations attempted in the wrong state
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("fields can only be edited while a step is open")]
    NotEditing,

    #[error("submission is only valid from the final step")]
    NotAtFinalStep,

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// A running form: definition, compiled validator, record, step pointer
pub struct Wizard {
    definition: FormDefinition,
    validator: FormValidator,
    record: Record,
    state: WizardState,
    errors: ValidationReport,
}

impl Wizard {
    /// Start a wizard at `Editing(0)` with an empty record
    pub fn new(definition: FormDefinition) -> Result<Self, SchemaError> {
        let validator = FormValidator::new(&definition)?;
        Ok(Self {
            definition,
            validator,
            record: Record::new(),
            state: WizardState::Editing(0),
            errors: ValidationReport::new(),
        })
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Errors surfaced by the last rejected advance or submit
    pub fn errors(&self) -> &ValidationReport {
        &self.errors
    }

    /// Current step index while editing
    pub fn current_step(&self) -> Option<usize> {
        match self.state {
            WizardState::Editing(i) => Some(i),
            _ => None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.definition.step_count()
    }

    /// Record a user edit at `path`
    pub fn set_field(&mut self, path: &FieldPath, value: Value) -> Result<(), WizardError> {
        self.editing()?;
        self.record.set(path, value)?;
        Ok(())
    }

    /// Append an empty entry to a repeatable group
    pub fn append_entry(&mut self, group: &FieldPath) -> Result<EntryId, WizardError> {
        self.editing()?;
        Ok(self.record.append_entry(group)?)
    }

    /// Remove a repeatable-group entry by display position.
    ///
    /// Indices are not stable identities: surfaced errors are dropped so
    /// stale index-keyed messages cannot attach to the wrong entry; the
    /// next validation recomputes them.
    pub fn remove_entry(&mut self, group: &FieldPath, index: usize) -> Result<EntryId, WizardError> {
        self.editing()?;
        let id = self.record.remove_entry(group, index)?;
        self.errors = ValidationReport::new();
        Ok(id)
    }

    /// Attempt to move to the next step, gated on partial validation of
    /// the current step's fields. A no-op at the last step.
    pub fn advance(&mut self, now: NaiveDate) -> Result<StepOutcome, WizardError> {
        let WizardState::Editing(step) = self.state else {
            return Err(WizardError::NotEditing);
        };
        if step + 1 >= self.definition.step_count() {
            return Ok(StepOutcome::AtLastStep);
        }
        let targets = self.definition.step_fields(step);
        let report = self.validator.validate_paths(&self.record, now, Some(targets));
        if report.is_valid() {
            self.errors = ValidationReport::new();
            self.state = WizardState::Editing(step + 1);
            Ok(StepOutcome::Advanced(step + 1))
        } else {
            self.errors = report;
            Ok(StepOutcome::Rejected)
        }
    }

    /// Move to the previous step unconditionally; a no-op at step 0
    pub fn retreat(&mut self) -> Result<usize, WizardError> {
        let WizardState::Editing(step) = self.state else {
            return Err(WizardError::NotEditing);
        };
        let previous = step.saturating_sub(1);
        self.state = WizardState::Editing(previous);
        Ok(previous)
    }

    /// Full-validate and hand the payload to the submission collaborator.
    ///
    /// On validation failure the wizard stays on the last step with
    /// errors surfaced. Once validation passes the wizard always ends in
    /// `Done`; a collaborator failure is returned, not swallowed.
    pub fn submit(
        &mut self,
        now: NaiveDate,
        submitter: &mut dyn Submitter,
    ) -> Result<SubmitOutcome, WizardError> {
        let WizardState::Editing(step) = self.state else {
            return Err(WizardError::NotEditing);
        };
        if step + 1 != self.definition.step_count() {
            return Err(WizardError::NotAtFinalStep);
        }

        let report = self.validator.validate(&self.record, now);
        if !report.is_valid() {
            self.errors = report;
            return Ok(SubmitOutcome::Rejected);
        }

        self.errors = ValidationReport::new();
        self.state = WizardState::Submitting;
        let payload = self.record.to_json();
        let delivery = submitter.submit(&self.definition.name, &payload);
        self.state = WizardState::Done;

        Ok(match delivery {
            Ok(()) => SubmitOutcome::Delivered,
            Err(e) => SubmitOutcome::DeliveryFailed(e),
        })
    }

    /// Clear the record and re-enter `Editing(0)`; valid from any state
    pub fn reset(&mut self) {
        self.record.clear();
        self.errors = ValidationReport::new();
        self.state = WizardState::Editing(0);
    }

    fn editing(&self) -> Result<(), WizardError> {
        match self.state {
            WizardState::Editing(_) => Ok(()),
            _ => Err(WizardError::NotEditing),
        }
    }
}
