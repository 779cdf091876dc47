//! Form validation with full and path-targeted (partial) runs
//!
//! A [`FormDefinition`] compiles once into a [`FormValidator`]; validation
//! itself is a pure function of `(record, now, targets)` and produces a
//! [`ValidationReport`]. "now" is passed explicitly so repeated runs
//! within one interaction are deterministic.

use chrono::{Months, NaiveDate};
use regex::Regex;
use thiserror::Error;

use crate::core::errors::ValidationReport;
use crate::core::path::{FieldPath, Segment};
use crate::core::record::{Record, Value};
use crate::schema::definition::{
    CrossRuleDef, FieldDef, FieldKind, FormDefinition, RuleDef,
};

/// Errors raised while compiling a form definition
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form definition '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_yml::Error,
    },

    #[error("invalid pattern on field '{path}': {source}")]
    BadPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("list field '{0}' declares no item")]
    MissingItem(String),

    #[error("select field '{0}' declares no options")]
    MissingOptions(String),

    #[error("cross rule references undeclared field '{0}'")]
    UnknownField(String),

    #[error("duplicate form name '{0}'")]
    DuplicateForm(String),
}

/// A compiled validator for one form
pub struct FormValidator {
    fields: Vec<CompiledField>,
    cross: Vec<CrossRuleDef>,
}

struct CompiledField {
    path: FieldPath,
    label: String,
    kind: FieldKind,
    required: bool,
    required_message: String,
    options: Vec<String>,
    checks: Vec<Check>,
    item: Option<Box<CompiledField>>,
}

enum Check {
    Length {
        min: Option<usize>,
        max: Option<usize>,
        min_message: Option<String>,
        max_message: Option<String>,
    },
    Pattern {
        regex: Regex,
        message: String,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
        message: String,
    },
    Age {
        min: u32,
        max: u32,
        message: String,
    },
    Attachment {
        max_bytes: u64,
        types: Vec<String>,
        type_message: String,
        size_message: String,
    },
    Accepted {
        message: String,
    },
}

impl FormValidator {
    /// Compile a definition, checking rule shapes and regex patterns
    pub fn new(definition: &FormDefinition) -> Result<Self, SchemaError> {
        let fields = definition
            .fields
            .iter()
            .map(compile_field)
            .collect::<Result<Vec<_>, _>>()?;

        for rule in &definition.cross_rules {
            let CrossRuleDef::ListMatchesFlag { flag, list, .. } = rule;
            for path in [flag, list] {
                if definition.field(path).is_none() {
                    return Err(SchemaError::UnknownField(path.to_string()));
                }
            }
        }

        Ok(Self {
            fields,
            cross: definition.cross_rules.clone(),
        })
    }

    /// Validate every rule, including cross-field rules. Used before
    /// submission.
    pub fn validate(&self, record: &Record, now: NaiveDate) -> ValidationReport {
        self.validate_paths(record, now, None)
    }

    /// Validate only rules covered by `targets`; rules whose dependencies
    /// fall outside the set are skipped, so unfilled later steps never
    /// block earlier ones. `None` means everything.
    pub fn validate_paths(
        &self,
        record: &Record,
        now: NaiveDate,
        targets: Option<&[FieldPath]>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();

        for field in &self.fields {
            if covered(&field.path, targets) {
                check_field(field, &field.path, record, now, &mut report);
            }
        }

        for rule in &self.cross {
            let CrossRuleDef::ListMatchesFlag {
                flag,
                list,
                require_message,
                forbid_message,
            } = rule;
            if !(covered(flag, targets) && covered(list, targets)) {
                continue;
            }
            let flag_set = matches!(record.get(flag), Some(Value::Bool(true)));
            let count = record.entry_count(list);
            if flag_set && count == 0 {
                report.attach(list, require_message.clone());
            } else if !flag_set && count > 0 {
                report.attach(list, forbid_message.clone());
            }
        }

        report
    }
}

fn covered(path: &FieldPath, targets: Option<&[FieldPath]>) -> bool {
    match targets {
        None => true,
        Some(set) => set.iter().any(|t| t.overlaps(path)),
    }
}

fn compile_field(def: &FieldDef) -> Result<CompiledField, SchemaError> {
    let checks = def
        .rules
        .iter()
        .map(|rule| compile_rule(rule, &def.path))
        .collect::<Result<Vec<_>, _>>()?;

    let item = match (def.kind, &def.item) {
        (FieldKind::List, Some(item)) => Some(Box::new(compile_field(item)?)),
        (FieldKind::List, None) => return Err(SchemaError::MissingItem(def.path.to_string())),
        _ => None,
    };
    if def.kind == FieldKind::Select && def.options.is_empty() {
        return Err(SchemaError::MissingOptions(def.path.to_string()));
    }

    Ok(CompiledField {
        path: def.path.clone(),
        label: def.label.clone(),
        kind: def.kind,
        required: def.required,
        required_message: def.required_message(),
        options: def.options.clone(),
        checks,
        item,
    })
}

fn compile_rule(rule: &RuleDef, path: &FieldPath) -> Result<Check, SchemaError> {
    Ok(match rule {
        RuleDef::Length { min, max, min_message, max_message } => Check::Length {
            min: *min,
            max: *max,
            min_message: min_message.clone(),
            max_message: max_message.clone(),
        },
        RuleDef::Pattern { pattern, message } => Check::Pattern {
            regex: Regex::new(pattern).map_err(|source| SchemaError::BadPattern {
                path: path.to_string(),
                source,
            })?,
            message: message.clone(),
        },
        RuleDef::Range { min, max, message } => Check::Range {
            min: *min,
            max: *max,
            message: message.clone(),
        },
        RuleDef::Age { min, max, message } => Check::Age {
            min: *min,
            max: *max,
            message: message.clone(),
        },
        RuleDef::Attachment { max_bytes, types, type_message, size_message } => {
            Check::Attachment {
                max_bytes: *max_bytes,
                types: types.clone(),
                type_message: type_message.clone(),
                size_message: size_message.clone(),
            }
        }
        RuleDef::Accepted { message } => Check::Accepted {
            message: message.clone(),
        },
    })
}

// Validates one field at `path` (which differs from `field.path` for
// repeatable-group items).
fn check_field(
    field: &CompiledField,
    path: &FieldPath,
    record: &Record,
    now: NaiveDate,
    report: &mut ValidationReport,
) {
    let value = record.get(path);

    let Some(value) = value else {
        if field.required {
            report.attach(path, field.required_message.clone());
        }
        return;
    };

    match field.kind {
        FieldKind::Text | FieldKind::Date | FieldKind::Select => {
            let Value::Text(text) = value else {
                report.attach(path, format!("{} is invalid", field.label));
                return;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                if field.required {
                    report.attach(path, field.required_message.clone());
                }
                return;
            }
            if field.kind == FieldKind::Select
                && !field.options.iter().any(|o| o == trimmed)
            {
                report.attach(
                    path,
                    format!("{} must be one of: {}", field.label, field.options.join(", ")),
                );
                return;
            }
            for check in &field.checks {
                run_text_check(check, trimmed, field, path, now, report);
            }
        }
        FieldKind::Bool => {
            let Value::Bool(flag) = value else {
                report.attach(path, format!("{} is invalid", field.label));
                return;
            };
            for check in &field.checks {
                if let Check::Accepted { message } = check {
                    if !*flag {
                        report.attach(path, message.clone());
                    }
                }
            }
        }
        FieldKind::File => {
            let Value::File(meta) = value else {
                report.attach(path, format!("{} is invalid", field.label));
                return;
            };
            for check in &field.checks {
                if let Check::Attachment { max_bytes, types, type_message, size_message } = check {
                    if !types.iter().any(|t| t == &meta.media_type) {
                        report.attach(path, type_message.clone());
                    }
                    if meta.size > *max_bytes {
                        report.attach(path, size_message.clone());
                    }
                }
            }
        }
        FieldKind::List => {
            let Value::List(_) = value else {
                report.attach(path, format!("{} is invalid", field.label));
                return;
            };
            if let Some(item) = &field.item {
                for i in 0..record.entry_count(path) {
                    let item_path = path.child(Segment::Index(i)).join(&item.path);
                    check_field(item, &item_path, record, now, report);
                }
            }
        }
    }
}

fn run_text_check(
    check: &Check,
    text: &str,
    field: &CompiledField,
    path: &FieldPath,
    now: NaiveDate,
    report: &mut ValidationReport,
) {
    match check {
        Check::Length { min, max, min_message, max_message } => {
            let len = text.chars().count();
            if let Some(min) = min {
                if len < *min {
                    let message = min_message.clone().unwrap_or_else(|| {
                        format!("{} must be at least {} characters", field.label, min)
                    });
                    report.attach(path, message);
                }
            }
            if let Some(max) = max {
                if len > *max {
                    let message = max_message.clone().unwrap_or_else(|| {
                        format!("{} must be at most {} characters", field.label, max)
                    });
                    report.attach(path, message);
                }
            }
        }
        Check::Pattern { regex, message } => {
            if !regex.is_match(text) {
                report.attach(path, message.clone());
            }
        }
        Check::Range { min, max, message } => match text.parse::<f64>() {
            Ok(n) => {
                let below = min.map(|m| n < m).unwrap_or(false);
                let above = max.map(|m| n > m).unwrap_or(false);
                if below || above {
                    report.attach(path, message.clone());
                }
            }
            Err(_) => report.attach(path, message.clone()),
        },
        Check::Age { min, max, message } => {
            let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") else {
                report.attach(path, message.clone());
                return;
            };
            // calendar bounds: the exact form of `min <= age <= max`
            let earliest = now - Months::new(12 * max);
            let latest = now - Months::new(12 * min);
            if date < earliest || date > latest {
                report.attach(path, message.clone());
            }
        }
        // attachment and accepted checks never apply to text values
        Check::Attachment { .. } | Check::Accepted { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::FileMeta;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    fn family_validator() -> FormValidator {
        let def = FormDefinition::from_yaml(
            r#"
name: family
title: Family Information
steps:
  - name: Applicant
    fields: [firstName, dateOfBirth]
  - name: Spouse
    fields: [hasSpouse, spouseNames]
fields:
  - path: firstName
    label: First name
    kind: text
    required: true
    required_message: First name is required
    rules:
      - type: length
        min: 2
        max: 50
        min_message: First name must be at least 2 characters
        max_message: First name must be at most 50 characters
  - path: dateOfBirth
    label: Date of birth
    kind: date
    required: true
    required_message: Date of birth is required
    rules:
      - type: age
        max: 120
        message: Please enter a valid date of birth
  - path: hasSpouse
    label: Spouse declared
    kind: bool
    required: true
    required_message: Please answer the spouse question
  - path: spouseNames
    label: Spouse names
    kind: list
    item:
      path: name
      label: Spouse name
      kind: text
      required: true
      required_message: Spouse name is required
cross_rules:
  - type: list_matches_flag
    flag: hasSpouse
    list: spouseNames
    require_message: Please add at least one spouse name
    forbid_message: Spouse names must be empty when no spouse is declared
"#,
        )
        .unwrap();
        FormValidator::new(&def).unwrap()
    }

    fn valid_record() -> Record {
        let mut record = Record::new();
        record
            .set(&path("firstName"), Value::Text("Jane".to_string()))
            .unwrap();
        record
            .set(&path("dateOfBirth"), Value::Text("1990-04-12".to_string()))
            .unwrap();
        record.set(&path("hasSpouse"), Value::Bool(false)).unwrap();
        record
    }

    #[test]
    fn test_valid_record_passes_full_validation() {
        let validator = family_validator();
        let report = validator.validate(&valid_record(), now());
        assert!(report.is_valid(), "expected valid, got {:?}", report.flatten());
    }

    #[test]
    fn test_missing_required_reports_exact_path_only() {
        let validator = family_validator();
        let mut record = valid_record();
        record.clear();
        record
            .set(&path("dateOfBirth"), Value::Text("1990-04-12".to_string()))
            .unwrap();
        record.set(&path("hasSpouse"), Value::Bool(false)).unwrap();

        let report = validator.validate(&record, now());
        assert!(report.has_error_at(&path("firstName")));
        assert_eq!(
            report.first_message(&path("firstName")),
            Some("First name is required")
        );
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_length_bounds() {
        let validator = family_validator();
        let mut record = valid_record();
        record
            .set(&path("firstName"), Value::Text("J".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("firstName")),
            Some("First name must be at least 2 characters")
        );

        record
            .set(&path("firstName"), Value::Text("J".repeat(51)))
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("firstName")),
            Some("First name must be at most 50 characters")
        );
    }

    #[test]
    fn test_age_exactly_120_years_passes() {
        let validator = family_validator();
        let mut record = valid_record();
        record
            .set(&path("dateOfBirth"), Value::Text("1906-08-26".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(!report.has_error_at(&path("dateOfBirth")));
    }

    #[test]
    fn test_age_120_years_and_a_day_fails() {
        let validator = family_validator();
        let mut record = valid_record();
        record
            .set(&path("dateOfBirth"), Value::Text("1906-08-25".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("dateOfBirth")),
            Some("Please enter a valid date of birth")
        );
    }

    #[test]
    fn test_future_date_of_birth_fails() {
        let validator = family_validator();
        let mut record = valid_record();
        record
            .set(&path("dateOfBirth"), Value::Text("2026-08-27".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(report.has_error_at(&path("dateOfBirth")));
    }

    #[test]
    fn test_unparseable_date_fails() {
        let validator = family_validator();
        let mut record = valid_record();
        record
            .set(&path("dateOfBirth"), Value::Text("not-a-date".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(report.has_error_at(&path("dateOfBirth")));
    }

    #[test]
    fn test_cross_field_spouse_cases() {
        let validator = family_validator();

        // hasSpouse=true, empty list -> error on the list path
        let mut record = valid_record();
        record.set(&path("hasSpouse"), Value::Bool(true)).unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("spouseNames")),
            Some("Please add at least one spouse name")
        );
        assert!(!report.has_error_at(&path("hasSpouse")));

        // hasSpouse=false, non-empty list -> mismatch on the list path
        let mut record = valid_record();
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("spouseNames")),
            Some("Spouse names must be empty when no spouse is declared")
        );

        // hasSpouse=false, empty list -> passes
        let report = validator.validate(&valid_record(), now());
        assert!(report.is_valid());

        // hasSpouse=true with a name -> passes
        let mut record = valid_record();
        record.set(&path("hasSpouse"), Value::Bool(true)).unwrap();
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.0.name"), Value::Text("Ann".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(report.is_valid(), "got {:?}", report.flatten());
    }

    #[test]
    fn test_list_item_rules_run_per_entry() {
        let validator = family_validator();
        let mut record = valid_record();
        record.set(&path("hasSpouse"), Value::Bool(true)).unwrap();
        record.append_entry(&path("spouseNames")).unwrap();
        record.append_entry(&path("spouseNames")).unwrap();
        record
            .set(&path("spouseNames.1.name"), Value::Text("Ann".to_string()))
            .unwrap();

        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("spouseNames.0.name")),
            Some("Spouse name is required")
        );
        assert!(!report.has_error_at(&path("spouseNames.1.name")));
    }

    #[test]
    fn test_partial_validation_skips_later_steps() {
        let validator = family_validator();
        let mut record = Record::new();
        record
            .set(&path("firstName"), Value::Text("Jane".to_string()))
            .unwrap();
        record
            .set(&path("dateOfBirth"), Value::Text("1990-04-12".to_string()))
            .unwrap();

        // step-1 targets: hasSpouse is required but absent, yet not targeted
        let targets = [path("firstName"), path("dateOfBirth")];
        let report = validator.validate_paths(&record, now(), Some(&targets));
        assert!(report.is_valid(), "got {:?}", report.flatten());

        // full validation still reports the absent flag
        let report = validator.validate(&record, now());
        assert!(report.has_error_at(&path("hasSpouse")));
    }

    #[test]
    fn test_partial_validation_skips_uncovered_cross_rule() {
        let validator = family_validator();
        let mut record = Record::new();
        record.set(&path("hasSpouse"), Value::Bool(true)).unwrap();

        // the cross rule depends on spouseNames too; targeting only the
        // flag must not fire it
        let targets = [path("hasSpouse")];
        let report = validator.validate_paths(&record, now(), Some(&targets));
        assert!(report.is_valid());

        // covering both dependencies fires it
        let targets = [path("hasSpouse"), path("spouseNames")];
        let report = validator.validate_paths(&record, now(), Some(&targets));
        assert!(report.has_error_at(&path("spouseNames")));
    }

    #[test]
    fn test_attachment_rules() {
        let def = FormDefinition::from_yaml(
            r#"
name: docs
title: Documents
steps:
  - name: Documents
    fields: [certificate]
fields:
  - path: certificate
    label: Citizenship certificate
    kind: file
    required: true
    required_message: Citizenship certificate file is required
    rules:
      - type: attachment
        max_bytes: 5242880
        types: [image/jpeg, application/pdf]
        type_message: File must be a JPEG image or PDF
        size_message: File must be 5MB or smaller
"#,
        )
        .unwrap();
        let validator = FormValidator::new(&def).unwrap();

        // 5 MiB + 1 byte PDF: size message only, type check passes
        let mut record = Record::new();
        record
            .set(
                &path("certificate"),
                Value::File(FileMeta {
                    name: "cert.pdf".to_string(),
                    media_type: "application/pdf".to_string(),
                    size: 5 * 1024 * 1024 + 1,
                }),
            )
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("certificate")),
            Some("File must be 5MB or smaller")
        );
        assert_eq!(report.error_count(), 1);

        // wrong type at an acceptable size
        record
            .set(
                &path("certificate"),
                Value::File(FileMeta {
                    name: "cert.gif".to_string(),
                    media_type: "image/gif".to_string(),
                    size: 1024,
                }),
            )
            .unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&path("certificate")),
            Some("File must be a JPEG image or PDF")
        );

        // missing file is the required case
        let report = validator.validate(&Record::new(), now());
        assert_eq!(
            report.first_message(&path("certificate")),
            Some("Citizenship certificate file is required")
        );
    }

    #[test]
    fn test_accepted_declaration() {
        let def = FormDefinition::from_yaml(
            r#"
name: decl
title: Declaration
steps:
  - name: Declaration
    fields: [agreeToDeclaration]
fields:
  - path: agreeToDeclaration
    label: Declaration
    kind: bool
    required: true
    required_message: You must accept the declaration
    rules:
      - type: accepted
        message: You must accept the declaration
"#,
        )
        .unwrap();
        let validator = FormValidator::new(&def).unwrap();
        let decl = path("agreeToDeclaration");

        // unchecked (absent) fails
        let report = validator.validate(&Record::new(), now());
        assert!(report.has_error_at(&decl));

        // false fails
        let mut record = Record::new();
        record.set(&decl, Value::Bool(false)).unwrap();
        let report = validator.validate(&record, now());
        assert_eq!(
            report.first_message(&decl),
            Some("You must accept the declaration")
        );

        // true passes
        record.set(&decl, Value::Bool(true)).unwrap();
        let report = validator.validate(&record, now());
        assert!(report.is_valid());
    }

    #[test]
    fn test_select_membership() {
        let def = FormDefinition::from_yaml(
            r#"
name: sel
title: Select
steps:
  - name: Only
    fields: [gender]
fields:
  - path: gender
    label: Gender
    kind: select
    required: true
    options: [Male, Female, X, PreferNotToSay]
"#,
        )
        .unwrap();
        let validator = FormValidator::new(&def).unwrap();

        let mut record = Record::new();
        record
            .set(&path("gender"), Value::Text("Robot".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(report.has_error_at(&path("gender")));

        record
            .set(&path("gender"), Value::Text("X".to_string()))
            .unwrap();
        let report = validator.validate(&record, now());
        assert!(report.is_valid());
    }

    #[test]
    fn test_compile_rejects_bad_definitions() {
        let bad_list = FormDefinition::from_yaml(
            r#"
name: bad
title: Bad
steps: []
fields:
  - path: names
    label: Names
    kind: list
"#,
        )
        .unwrap();
        assert!(matches!(
            FormValidator::new(&bad_list),
            Err(SchemaError::MissingItem(_))
        ));

        let bad_cross = FormDefinition::from_yaml(
            r#"
name: bad
title: Bad
steps: []
fields:
  - path: hasSpouse
    label: Spouse declared
    kind: bool
cross_rules:
  - type: list_matches_flag
    flag: hasSpouse
    list: spouseNames
    require_message: x
    forbid_message: y
"#,
        )
        .unwrap();
        assert!(matches!(
            FormValidator::new(&bad_cross),
            Err(SchemaError::UnknownField(_))
        ));
    }
}
