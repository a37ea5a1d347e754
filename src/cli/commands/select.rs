//! `qbom select` command - Validate selections against group rules
//!
//! Selection files are JSON in the HTTP API's shape, either the bare
//! `{category: {group: [assembly, ...]}}` map or wrapped in `{"selections": ...}`.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{
    format_money, format_qty, load_required, open_project_with_config, print_updated, require_id,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Catalog;
use crate::entities::{Assembly, Group, Template};
use crate::selection::{
    default_selection, toggle, validate_selection, Selection, ValidationOutcome,
};

#[derive(Subcommand, Debug)]
pub enum SelectCommands {
    /// Validate a selection file; exits non-zero when invalid
    Validate(ValidateArgs),

    /// Print the default selection for a template's groups
    Defaults(DefaultsArgs),

    /// Select or deselect an assembly in a selection file, following the group's rules
    Toggle(ToggleArgs),
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// JSON selection file
    #[arg(long)]
    pub file: PathBuf,

    /// Validate against this template's groups instead of the groups named in the file
    #[arg(long, short = 't')]
    pub template: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DefaultsArgs {
    /// Template ID or short ID (@N)
    #[arg(long, short = 't')]
    pub template: String,
}

#[derive(clap::Args, Debug)]
pub struct ToggleArgs {
    /// JSON selection file, created when missing
    #[arg(long)]
    pub file: PathBuf,

    /// Group ID or short ID (@N)
    pub group: String,

    /// Assembly ID or short ID (@N)
    pub assembly: String,
}

/// Read a selection JSON file in either accepted shape.
///
/// No category id can be `selections`, so a top-level `selections` key
/// always means the wrapped shape.
pub fn read_selection_file(path: &Path) -> Result<Selection> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))?;
    let invalid =
        |e: serde_json::Error| miette::miette!("Invalid selection file {}: {}", path.display(), e);

    let mut value: serde_json::Value = serde_json::from_str(&content).map_err(invalid)?;
    let body = match value.as_object_mut().and_then(|map| map.remove("selections")) {
        Some(inner) => inner,
        None => value,
    };
    serde_json::from_value(body).map_err(invalid)
}

pub fn run(cmd: SelectCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SelectCommands::Validate(args) => run_validate(args, global),
        SelectCommands::Defaults(args) => run_defaults(args, global),
        SelectCommands::Toggle(args) => run_toggle(args, global),
    }
}

fn run_validate(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let selection = read_selection_file(&args.file)?;
    let catalog = Catalog::load(&project)?;

    let groups = match &args.template {
        Some(reference) => {
            let template_id = require_id::<Template>(&project, reference)?;
            catalog.groups_for_template(&template_id)?
        }
        None => catalog.groups_by_ids(&selection.group_ids()),
    };
    let outcome = validate_selection(&selection, &groups);

    print_outcome(global, &outcome, config.currency())?;
    if outcome.is_valid {
        Ok(())
    } else {
        Err(miette::miette!(
            "Selection is invalid ({} error(s))",
            outcome.errors.len()
        ))
    }
}

fn run_defaults(args: DefaultsArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let template_id = require_id::<Template>(&project, &args.template)?;
    let catalog = Catalog::load(&project)?;
    let groups = catalog.groups_for_template(&template_id)?;
    let selection = default_selection(&groups);

    match global.format {
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&selection).into_diagnostic()?),
        _ => println!("{}", serde_json::to_string_pretty(&selection).into_diagnostic()?),
    }
    Ok(())
}

fn run_toggle(args: ToggleArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, group) = load_required::<Group>(&project, &args.group)?;
    let (_, assembly) = load_required::<Assembly>(&project, &args.assembly)?;
    let resolved = Catalog::load(&project)?.resolve_group(&group);

    let mut selection = if args.file.exists() {
        read_selection_file(&args.file)?
    } else {
        Selection::new()
    };

    if group.item(&assembly.id).is_none() {
        return Err(miette::miette!(
            "{} is not an item of group {}",
            assembly.name,
            group.name
        ));
    }
    if !toggle(&mut selection, &resolved, &assembly.id) {
        println!(
            "{} {} stays as it is in {} [{}]",
            style("!").yellow(),
            assembly.name,
            group.name,
            group.group_type
        );
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&selection).into_diagnostic()?;
    std::fs::write(&args.file, json + "\n")
        .map_err(|e| miette::miette!("Cannot write {}: {}", args.file.display(), e))?;

    let selected = selection
        .selected(&group.category_id, &group.id)
        .contains(&assembly.id);
    print_updated(format!(
        "{} {} in {}",
        if selected { "Selected" } else { "Deselected" },
        style(&assembly.name).yellow(),
        style(&group.name).cyan()
    ));
    Ok(())
}

/// Print a validation outcome as JSON/YAML, or as a readable summary
pub fn print_outcome(global: &GlobalOpts, outcome: &ValidationOutcome, currency: &str) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(outcome).into_diagnostic()?);
            return Ok(());
        }
        _ => {}
    }

    for category in &outcome.breakdown {
        println!(
            "{}  {}",
            style(&category.category_name).bold(),
            style(format_money(category.subtotal, currency)).dim()
        );
        for group in &category.groups {
            println!("  {} [{}]", group.group_name, group.group_type);
            for asm in &group.assemblies {
                println!(
                    "    {} × {}  {}",
                    format_qty(asm.quantity),
                    asm.name,
                    format_money(asm.cost, currency)
                );
            }
        }
    }

    if !global.quiet {
        for warning in &outcome.warnings {
            println!("{} {}", style("!").yellow(), warning);
        }
    }
    for error in &outcome.errors {
        println!("{} {}", style("✗").red(), error.message);
    }

    println!();
    println!(
        "{}: {}",
        style("Total").bold(),
        style(format_money(outcome.total_cost, currency)).green()
    );
    if outcome.is_valid {
        println!("{} Selection is valid", style("✓").green());
    }
    Ok(())
}
