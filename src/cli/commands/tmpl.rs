//! `qbom tmpl` command - Templates (assembly bundles with selection groups)

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::select::{print_outcome, read_selection_file};
use crate::cli::helpers::{
    format_money, format_qty, load_required, open_project_with_config, parse_id_qty,
    print_created, print_entity, print_list, print_updated, remember_listing, require_id,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Catalog;
use crate::core::loader;
use crate::entities::template::TemplateLine;
use crate::entities::{Assembly, Group, Template};
use crate::selection::{default_selection, validate_selection};

#[derive(Subcommand, Debug)]
pub enum TmplCommands {
    /// List templates with their cost
    List,

    /// Create a template
    New(NewArgs),

    /// Show a template's assemblies and groups
    Show(ShowArgs),

    /// Add an assembly line to a template
    #[command(name = "add")]
    AddAssembly(AddAssemblyArgs),

    /// Attach a selection group to a template
    AddGroup(AddGroupArgs),

    /// Break down a template's cost by assembly
    Cost(CostArgs),

    /// Validate a selection and, if valid, make it the template's assembly list
    Apply(ApplyArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 'N')]
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Assembly lines as ID:QTY (repeatable)
    #[arg(long = "assembly", short = 'a')]
    pub assemblies: Vec<String>,

    /// Groups to attach (repeatable)
    #[arg(long = "group", short = 'g')]
    pub groups: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Template ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddAssemblyArgs {
    /// Template ID or short ID (@N)
    pub template: String,

    /// Assembly ID or short ID (@N)
    pub assembly: String,

    #[arg(default_value = "1")]
    pub quantity: f64,
}

#[derive(clap::Args, Debug)]
pub struct AddGroupArgs {
    /// Template ID or short ID (@N)
    pub template: String,

    /// Group ID or short ID (@N)
    pub group: String,
}

#[derive(clap::Args, Debug)]
pub struct CostArgs {
    /// Template ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ApplyArgs {
    /// Template ID or short ID (@N)
    pub id: String,

    /// JSON selection file
    #[arg(long, conflicts_with = "defaults", required_unless_present = "defaults")]
    pub file: Option<PathBuf>,

    /// Use the groups' default selection
    #[arg(long)]
    pub defaults: bool,
}

pub fn run(cmd: TmplCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TmplCommands::List => run_list(global),
        TmplCommands::New(args) => run_new(args, global),
        TmplCommands::Show(args) => run_show(args, global),
        TmplCommands::AddAssembly(args) => run_add_assembly(args, global),
        TmplCommands::AddGroup(args) => run_add_group(args, global),
        TmplCommands::Cost(args) => run_cost(args, global),
        TmplCommands::Apply(args) => run_apply(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let catalog = Catalog::load(&project)?;
    let mut templates: Vec<&Template> = catalog.templates.values().collect();
    templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    if templates.is_empty() && global.format == OutputFormat::Auto {
        println!("No templates found.");
        return Ok(());
    }

    remember_listing(&project, templates.iter().map(|t| &t.id));
    let rows = templates
        .iter()
        .enumerate()
        .map(|(i, t)| {
            vec![
                format!("@{}", i + 1),
                t.id.to_string(),
                truncate_str(&t.name, 40),
                t.assemblies.len().to_string(),
                t.groups.len().to_string(),
                format!("{:.2}", catalog.template_cost(t)),
            ]
        })
        .collect();

    print_list(
        global.format,
        &templates,
        &["SHORT", "ID", "NAME", "ASSEMBLIES", "GROUPS", config.currency()],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;

    let mut template = Template::new(&args.name, config.author());
    template.description = args.description;
    for line in &args.assemblies {
        let (reference, qty) = parse_id_qty(line)?;
        let assembly_id = require_id::<Assembly>(&project, &reference)?;
        template.add_assembly(assembly_id, qty);
    }
    for reference in &args.groups {
        template.add_group(require_id::<Group>(&project, reference)?);
    }

    let path = loader::save_entity(&project, &template)?;
    print_created(
        "template",
        &template.id,
        &path,
        &format!(
            "{} | {} assembly line(s) | {} group(s)",
            style(&template.name).yellow(),
            template.assemblies.len(),
            template.groups.len()
        ),
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, template) = load_required::<Template>(&project, &args.id)?;
    let catalog = Catalog::load(&project)?;

    print_entity(global.format, &template, || {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}: {}", style("ID").bold(), style(&template.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&template.name).yellow());
        if let Some(desc) = &template.description {
            println!("{}: {}", style("Description").bold(), desc);
        }
        println!();
        println!("{} ({})", style("Assemblies").bold(), template.assemblies.len());
        for line in &template.assemblies {
            println!(
                "  {} × {}",
                format_qty(line.quantity),
                catalog.assembly_name(&line.assembly_id)
            );
        }
        println!();
        println!("{} ({})", style("Groups").bold(), template.groups.len());
        for group_id in &template.groups {
            match catalog.groups.iter().find(|g| &g.id == group_id) {
                Some(g) => println!("  {} [{}]", g.name, g.group_type),
                None => println!("  {} {}", group_id, style("(missing)").red()),
            }
        }
        println!();
        println!(
            "{}: {}",
            style("Total").bold(),
            style(format_money(catalog.template_cost(&template), config.currency())).green()
        );
        println!("{}", style("─".repeat(60)).dim());
    })
}

fn run_add_assembly(args: AddAssemblyArgs, global: &GlobalOpts) -> Result<()> {
    if args.quantity <= 0.0 {
        return Err(miette::miette!("Quantity must be positive"));
    }
    let (project, _) = open_project_with_config(global)?;
    let (_, mut template) = load_required::<Template>(&project, &args.template)?;
    let (_, assembly) = load_required::<Assembly>(&project, &args.assembly)?;

    template.add_assembly(assembly.id.clone(), args.quantity);
    template.entity_revision += 1;
    loader::save_entity(&project, &template)?;

    print_updated(format!(
        "Added {} × {} to {}",
        format_qty(args.quantity),
        style(&assembly.name).yellow(),
        style(&template.name).cyan()
    ));
    Ok(())
}

fn run_add_group(args: AddGroupArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut template) = load_required::<Template>(&project, &args.template)?;
    let (_, group) = load_required::<Group>(&project, &args.group)?;

    if !template.add_group(group.id.clone()) {
        println!(
            "{} {} is already attached to {}",
            style("!").yellow(),
            group.name,
            template.name
        );
        return Ok(());
    }
    template.entity_revision += 1;
    loader::save_entity(&project, &template)?;

    print_updated(format!(
        "Attached group {} to {}",
        style(&group.name).yellow(),
        style(&template.name).cyan()
    ));
    Ok(())
}

fn run_cost(args: CostArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, template) = load_required::<Template>(&project, &args.id)?;
    let catalog = Catalog::load(&project)?;
    let total = catalog.template_cost(&template);

    if global.format == OutputFormat::Json {
        let lines: Vec<serde_json::Value> = template
            .assemblies
            .iter()
            .map(|line| {
                let unit_cost = catalog.assembly_cost(&line.assembly_id);
                serde_json::json!({
                    "assembly_id": line.assembly_id,
                    "quantity": line.quantity,
                    "unit_cost": unit_cost,
                    "cost": unit_cost * line.quantity,
                })
            })
            .collect();
        let out = serde_json::json!({ "id": template.id, "lines": lines, "total": total });
        println!("{}", out);
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["ASSEMBLY", "QTY", "UNIT COST", "COST"]);
    for line in &template.assemblies {
        let unit_cost = catalog.assembly_cost(&line.assembly_id);
        builder.push_record([
            catalog.assembly_name(&line.assembly_id),
            format_qty(line.quantity),
            format!("{:.2}", unit_cost),
            format!("{:.2}", unit_cost * line.quantity),
        ]);
    }

    println!("{}", style(&template.name).bold());
    println!("{}", builder.build().with(Style::rounded()));
    println!(
        "{}: {}",
        style("Total").bold(),
        style(format_money(total, config.currency())).green()
    );
    Ok(())
}

fn run_apply(args: ApplyArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, mut template) = load_required::<Template>(&project, &args.id)?;
    let catalog = Catalog::load(&project)?;
    let groups = catalog.groups_for_template(&template.id)?;

    let selection = match &args.file {
        Some(path) => read_selection_file(path)?,
        None => default_selection(&groups),
    };
    let outcome = validate_selection(&selection, &groups);
    print_outcome(global, &outcome, config.currency())?;

    if !outcome.is_valid {
        return Err(miette::miette!(
            "Selection is invalid; {} was not changed",
            template.name
        ));
    }

    let lines = outcome
        .selected_lines()
        .into_iter()
        .map(|(assembly_id, quantity)| TemplateLine {
            assembly_id,
            quantity,
        })
        .collect();
    template.replace_assemblies(lines);
    loader::save_entity(&project, &template)?;

    if global.format == OutputFormat::Auto {
        print_updated(format!(
            "{} now has {} assembly line(s)",
            style(&template.name).cyan(),
            template.assemblies.len()
        ));
    }
    Ok(())
}
