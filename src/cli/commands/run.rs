//! `intake run` command - interactive form wizard
//!
//! Walks the user through a form's steps, one prompt per field. Each
//! step must pass validation before the next opens; on the final step
//! the full record is validated and handed to the submitter.
//!
//! Re-prompting is selective: a second pass over a step only asks for
//! fields that are blank or carry a validation error, so accepted
//! answers stay put.

use chrono::Local;
use chrono::NaiveDate;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::file_meta_for;
use crate::cli::GlobalOpts;
use crate::core::path::{FieldPath, Segment};
use crate::core::record::{Record, Value};
use crate::schema::definition::{FieldDef, FieldKind};
use crate::schema::registry::FormRegistry;
use crate::wizard::controller::{StepOutcome, SubmitOutcome, Wizard};
use crate::wizard::submit::{FileSubmitter, StdoutSubmitter, Submitter};

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Form to run (see `intake forms`)
    pub form: String,

    /// Write the submitted payload to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let registry = FormRegistry::load().into_diagnostic()?;
    let Some(definition) = registry.get(&args.form) else {
        return Err(miette::miette!(
            "Unknown form: '{}'. Available forms: {}",
            args.form,
            registry.names().join(", ")
        ));
    };

    let mut wizard = Wizard::new(definition.clone()).into_diagnostic()?;
    let theme = ColorfulTheme::default();
    let today = Local::now().date_naive();

    if !global.quiet {
        println!();
        println!(
            "{} {}",
            style("◆").cyan(),
            style(&wizard.definition().title).bold()
        );
        println!("{}", style("─".repeat(50)).dim());
    }

    loop {
        let Some(step) = wizard.current_step() else {
            break;
        };
        let last_step = step + 1 == wizard.step_count();

        print_step_header(&wizard, step);
        prompt_step(&mut wizard, step, &theme)?;

        if last_step {
            if try_submit(&mut wizard, today, &args, global)? {
                break;
            }
            continue;
        }

        match wizard.advance(today).into_diagnostic()? {
            StepOutcome::Advanced(_) => {}
            StepOutcome::Rejected => print_errors(&wizard),
            StepOutcome::AtLastStep => unreachable!("advance is not called on the last step"),
        }
    }

    Ok(())
}

/// Full-validate and deliver; returns true when the wizard reached `Done`
fn try_submit(
    wizard: &mut Wizard,
    today: NaiveDate,
    args: &RunArgs,
    global: &GlobalOpts,
) -> Result<bool> {
    let mut file_submitter;
    let mut stdout_submitter;
    let submitter: &mut dyn Submitter = match &args.output {
        Some(path) => {
            file_submitter = FileSubmitter::new(path);
            &mut file_submitter
        }
        None => {
            stdout_submitter = StdoutSubmitter;
            &mut stdout_submitter
        }
    };

    match wizard.submit(today, submitter).into_diagnostic()? {
        SubmitOutcome::Rejected => {
            print_errors(wizard);
            Ok(false)
        }
        SubmitOutcome::Delivered => {
            if !global.quiet {
                println!();
                match &args.output {
                    Some(path) => println!(
                        "{} Application submitted, payload written to {}",
                        style("✓").green().bold(),
                        path.display()
                    ),
                    None => println!(
                        "{} Application submitted",
                        style("✓").green().bold()
                    ),
                }
            }
            Ok(true)
        }
        SubmitOutcome::DeliveryFailed(e) => {
            Err(miette::miette!("Submission delivery failed: {}", e))
        }
    }
}

fn print_step_header(wizard: &Wizard, step: usize) {
    let name = &wizard.definition().steps[step].name;
    println!();
    println!(
        "{} Step {}/{}: {}",
        style("→").blue(),
        step + 1,
        wizard.step_count(),
        style(name).bold()
    );
}

fn print_errors(wizard: &Wizard) {
    println!();
    for (path, messages) in wizard.errors().flatten() {
        for message in messages {
            println!("{} {}: {}", style("✗").red(), style(path.as_str()).dim(), message);
        }
    }
    println!("{}", style("Please correct the fields above.").yellow());
}

/// Prompt every field of `step` that is blank or currently in error
fn prompt_step(wizard: &mut Wizard, step: usize, theme: &ColorfulTheme) -> Result<()> {
    let paths: Vec<FieldPath> = wizard.definition().step_fields(step).to_vec();
    for path in paths {
        let Some(field) = wizard.definition().field(&path).cloned() else {
            continue;
        };
        let answered = wizard.record().get(&path).is_some();
        let errored = wizard.errors().has_error_at(&path);
        if answered && !errored && field.kind != FieldKind::List {
            continue;
        }
        prompt_field(wizard, &path, &field, theme)?;
    }
    Ok(())
}

fn prompt_field(
    wizard: &mut Wizard,
    path: &FieldPath,
    field: &FieldDef,
    theme: &ColorfulTheme,
) -> Result<()> {
    match field.kind {
        FieldKind::Text | FieldKind::Date => {
            let prompt = if field.kind == FieldKind::Date {
                format!("{} (YYYY-MM-DD)", field.label)
            } else {
                field.label.clone()
            };
            let value: String = Input::with_theme(theme)
                .with_prompt(&prompt)
                .allow_empty(!field.required)
                .interact_text()
                .into_diagnostic()?;
            if !value.is_empty() {
                wizard
                    .set_field(path, Value::Text(value))
                    .into_diagnostic()?;
            }
        }
        FieldKind::Select => {
            let selection = Select::with_theme(theme)
                .with_prompt(&field.label)
                .items(&field.options)
                .default(0)
                .interact()
                .into_diagnostic()?;
            wizard
                .set_field(path, Value::Text(field.options[selection].clone()))
                .into_diagnostic()?;
        }
        FieldKind::Bool => {
            let answer = Confirm::with_theme(theme)
                .with_prompt(&field.label)
                .default(false)
                .interact()
                .into_diagnostic()?;
            wizard.set_field(path, Value::Bool(answer)).into_diagnostic()?;
        }
        // an unreadable path re-prompts; earlier answers are never lost
        FieldKind::File => loop {
            let value: String = Input::with_theme(theme)
                .with_prompt(format!("{} (file path)", field.label))
                .allow_empty(!field.required)
                .interact_text()
                .into_diagnostic()?;
            if value.is_empty() {
                break;
            }
            match file_meta_for(Path::new(&value)) {
                Ok(meta) => {
                    wizard.set_field(path, Value::File(meta)).into_diagnostic()?;
                    break;
                }
                Err(e) => println!("{} {}: {}", style("✗").red(), value, e),
            }
        },
        FieldKind::List => prompt_list(wizard, path, field, theme)?,
    }
    Ok(())
}

/// One round of the repeatable-group menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListAction {
    Add,
    Edit(usize),
    Remove(usize),
    Done,
}

/// Menu items for a repeatable group: add, then edit/remove per entry,
/// then done. Layout must stay in sync with [`list_action`].
fn list_menu(record: &Record, group: &FieldPath, item: &FieldDef) -> Vec<String> {
    let label = item.label.to_lowercase();
    let mut items = vec![format!("Add a {}", label)];
    for i in 0..record.entry_count(group) {
        let item_path = group.child(Segment::Index(i)).join(&item.path);
        let current = match record.get(&item_path) {
            Some(Value::Text(s)) if !s.trim().is_empty() => s.clone(),
            _ => "(blank)".to_string(),
        };
        items.push(format!("Edit {} #{}: {}", label, i + 1, current));
        items.push(format!("Remove {} #{}", label, i + 1));
    }
    items.push("Done".to_string());
    items
}

/// Map a menu selection back to its action for a group of `count` entries
fn list_action(choice: usize, count: usize) -> ListAction {
    if choice == 0 {
        ListAction::Add
    } else if choice == 1 + 2 * count {
        ListAction::Done
    } else if (choice - 1) % 2 == 0 {
        ListAction::Edit((choice - 1) / 2)
    } else {
        ListAction::Remove((choice - 1) / 2)
    }
}

/// Edit a repeatable group: add, re-edit, or remove entries until done
fn prompt_list(
    wizard: &mut Wizard,
    group: &FieldPath,
    field: &FieldDef,
    theme: &ColorfulTheme,
) -> Result<()> {
    let Some(item) = field.item.as_deref() else {
        return Ok(());
    };
    loop {
        let count = wizard.record().entry_count(group);
        let items = list_menu(wizard.record(), group, item);
        let choice = Select::with_theme(theme)
            .with_prompt(&field.label)
            .items(&items)
            .default(items.len() - 1)
            .interact()
            .into_diagnostic()?;
        match list_action(choice, count) {
            ListAction::Done => return Ok(()),
            ListAction::Add => {
                wizard.append_entry(group).into_diagnostic()?;
                let index = wizard.record().entry_count(group) - 1;
                prompt_list_item(wizard, group, item, index, theme)?;
            }
            ListAction::Edit(index) => prompt_list_item(wizard, group, item, index, theme)?,
            ListAction::Remove(index) => {
                wizard.remove_entry(group, index).into_diagnostic()?;
            }
        }
    }
}

fn prompt_list_item(
    wizard: &mut Wizard,
    group: &FieldPath,
    item: &FieldDef,
    index: usize,
    theme: &ColorfulTheme,
) -> Result<()> {
    let value: String = Input::with_theme(theme)
        .with_prompt(&item.label)
        .interact_text()
        .into_diagnostic()?;
    let item_path = group.child(Segment::Index(index)).join(&item.path);
    wizard
        .set_field(&item_path, Value::Text(value))
        .into_diagnostic()?;
    Ok(())
}
