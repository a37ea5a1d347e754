//! `qbom grp` command - Assembly groups and their items

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    format_money, format_qty, load_required, open_project_with_config, print_created,
    print_entity, print_list, print_updated, remember_listing, require_id,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Catalog;
use crate::core::loader;
use crate::entities::{Assembly, Category, Group, Template};
use crate::selection::GroupType;

#[derive(Subcommand, Debug)]
pub enum GrpCommands {
    /// List groups
    List(ListArgs),

    /// Create a group in a category
    New(NewArgs),

    /// Show a group with resolved items and costs
    Show(ShowArgs),

    /// Add an assembly to a group
    #[command(name = "add")]
    AddItem(AddItemArgs),

    /// Remove an assembly from a group
    #[command(name = "rm")]
    RemoveItem(RemoveItemArgs),

    /// Mark two assemblies in a CONFLICT group as mutually exclusive
    Conflict(ConflictArgs),

    /// Delete a group and its items, detaching it from templates
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only groups in this category (ID or @N)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Only groups of this type
    #[arg(long, short = 't')]
    pub group_type: Option<GroupType>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 'N')]
    pub name: String,

    /// required, choose-one, optional or conflict
    #[arg(long = "type", short = 't')]
    pub group_type: GroupType,

    /// Owning category (ID or @N)
    #[arg(long, short = 'c')]
    pub category: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Display order within the category
    #[arg(long, default_value = "0")]
    pub sort_order: i32,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Group ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddItemArgs {
    /// Group ID or short ID (@N)
    pub group: String,

    /// Assembly ID or short ID (@N)
    pub assembly: String,

    /// Multiplier applied to the assembly's unit cost
    #[arg(long, default_value = "1")]
    pub qty: f64,

    /// Pre-select this item in default selections
    #[arg(long)]
    pub default: bool,

    /// Assemblies already in the group that this one excludes (repeatable)
    #[arg(long = "conflicts-with")]
    pub conflicts_with: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveItemArgs {
    /// Group ID or short ID (@N)
    pub group: String,

    /// Assembly ID or short ID (@N)
    pub assembly: String,
}

#[derive(clap::Args, Debug)]
pub struct ConflictArgs {
    /// Group ID or short ID (@N)
    pub group: String,

    /// First assembly
    pub a: String,

    /// Second assembly
    pub b: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Group ID or short ID (@N)
    pub id: String,
}

pub fn run(cmd: GrpCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        GrpCommands::List(args) => run_list(args, global),
        GrpCommands::New(args) => run_new(args, global),
        GrpCommands::Show(args) => run_show(args, global),
        GrpCommands::AddItem(args) => run_add_item(args, global),
        GrpCommands::RemoveItem(args) => run_remove_item(args, global),
        GrpCommands::Conflict(args) => run_conflict(args, global),
        GrpCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let catalog = Catalog::load(&project)?;

    let category = match &args.category {
        Some(reference) => Some(require_id::<Category>(&project, reference)?),
        None => None,
    };

    let groups: Vec<_> = catalog
        .all_groups()
        .into_iter()
        .filter(|g| category.as_ref().is_none_or(|c| &g.category_id == c))
        .filter(|g| args.group_type.is_none_or(|t| g.group_type == t))
        .collect();

    if groups.is_empty() && global.format == OutputFormat::Auto {
        println!("No groups found.");
        return Ok(());
    }

    remember_listing(&project, groups.iter().map(|g| &g.id));
    let rows = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            vec![
                format!("@{}", i + 1),
                g.id.to_string(),
                g.name.clone(),
                g.group_type.to_string(),
                g.category_name.clone(),
                g.items.len().to_string(),
            ]
        })
        .collect();

    print_list(
        global.format,
        &groups,
        &["SHORT", "ID", "NAME", "TYPE", "CATEGORY", "ITEMS"],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, category) = load_required::<Category>(&project, &args.category)?;

    let mut group = Group::new(&args.name, args.group_type, category.id.clone(), config.author());
    group.description = args.description;
    group.sort_order = args.sort_order;

    let path = loader::save_entity(&project, &group)?;
    print_created(
        "group",
        &group.id,
        &path,
        &format!(
            "{} | {} | in {}",
            style(&group.name).yellow(),
            group.group_type,
            category.name
        ),
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, group) = load_required::<Group>(&project, &args.id)?;
    let catalog = Catalog::load(&project)?;
    let resolved = catalog.resolve_group(&group);

    print_entity(global.format, &group, || {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}: {}", style("ID").bold(), style(&resolved.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&resolved.name).yellow());
        println!("{}: {}", style("Type").bold(), resolved.group_type);
        println!("{}: {}", style("Category").bold(), resolved.category_name);
        if let Some(desc) = &group.description {
            println!("{}: {}", style("Description").bold(), desc);
        }
        println!();
        println!("{} ({})", style("Items").bold(), resolved.items.len());
        for item in &resolved.items {
            let marker = if item.is_default { style("*").green() } else { style(" ") };
            println!(
                "  {} {} × {}  {}",
                marker,
                format_qty(item.quantity),
                item.assembly_name,
                style(format_money(item.cost(), config.currency())).dim()
            );
            if !item.conflicts_with.is_empty() {
                let names: Vec<String> = item
                    .conflicts_with
                    .iter()
                    .map(|id| resolved.display_name(id))
                    .collect();
                println!("      {} {}", style("conflicts with").red(), names.join(", "));
            }
        }
        println!("{}", style("─".repeat(60)).dim());
    })
}

fn run_add_item(args: AddItemArgs, global: &GlobalOpts) -> Result<()> {
    if args.qty <= 0.0 {
        return Err(miette::miette!("Quantity must be positive"));
    }
    let (project, _) = open_project_with_config(global)?;
    let (_, mut group) = load_required::<Group>(&project, &args.group)?;
    let (_, assembly) = load_required::<Assembly>(&project, &args.assembly)?;

    let mut conflicts = Vec::new();
    for reference in &args.conflicts_with {
        conflicts.push(require_id::<Assembly>(&project, reference)?);
    }
    if !conflicts.is_empty() && group.group_type != GroupType::Conflict {
        println!(
            "{} conflicts only affect validation in CONFLICT groups ({} is {})",
            style("!").yellow(),
            group.name,
            group.group_type
        );
    }

    group
        .add_item(assembly.id.clone(), args.qty, args.default)
        .map_err(|e| miette::miette!("{}", e))?;
    for other in &conflicts {
        group
            .mark_conflict(&assembly.id, other)
            .map_err(|e| miette::miette!("{}", e))?;
    }
    group.entity_revision += 1;
    loader::save_entity(&project, &group)?;

    print_updated(format!(
        "Added {} to {}",
        style(&assembly.name).yellow(),
        style(&group.name).cyan()
    ));
    Ok(())
}

fn run_remove_item(args: RemoveItemArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut group) = load_required::<Group>(&project, &args.group)?;
    let assembly_id = require_id::<Assembly>(&project, &args.assembly)?;

    group
        .remove_item(&assembly_id)
        .map_err(|e| miette::miette!("{}", e))?;
    group.entity_revision += 1;
    loader::save_entity(&project, &group)?;

    print_updated(format!("Removed {} from {}", assembly_id, style(&group.name).cyan()));
    Ok(())
}

fn run_conflict(args: ConflictArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut group) = load_required::<Group>(&project, &args.group)?;
    let a = require_id::<Assembly>(&project, &args.a)?;
    let b = require_id::<Assembly>(&project, &args.b)?;

    group
        .mark_conflict(&a, &b)
        .map_err(|e| miette::miette!("{}", e))?;
    group.entity_revision += 1;
    loader::save_entity(&project, &group)?;

    print_updated(format!("Marked {} and {} as conflicting", a, b));
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (path, group) = load_required::<Group>(&project, &args.id)?;

    let mut detached = 0;
    let templates: Vec<Template> = loader::load_all(&project)?;
    for mut template in templates {
        let before = template.groups.len();
        template.groups.retain(|g| g != &group.id);
        if template.groups.len() != before {
            template.entity_revision += 1;
            loader::save_entity(&project, &template)?;
            detached += 1;
        }
    }

    loader::delete_entity(&path)?;
    print_updated(format!(
        "Deleted group {} ({} item(s))",
        style(&group.name).yellow(),
        group.items.len()
    ));
    if detached > 0 {
        println!("   detached from {} template(s)", detached);
    }
    Ok(())
}
