//! `qbom asm` command - Assembly management

use clap::Subcommand;
use console::style;
use miette::Result;
use std::collections::HashMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    format_money, format_qty, load_required, open_project_with_config, parse_id_qty,
    print_created, print_entity, print_list, print_updated, remember_listing, require_id,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::loader;
use crate::entities::assembly::Assembly;
use crate::entities::material::Material;

#[derive(Subcommand, Debug)]
pub enum AsmCommands {
    /// List assemblies with their unit cost
    List(ListArgs),

    /// Create a new assembly
    New(NewArgs),

    /// Show an assembly's details
    Show(ShowArgs),

    /// Add a material line to an assembly
    #[command(name = "add")]
    AddMaterial(AddMaterialArgs),

    /// Remove a material line from an assembly
    #[command(name = "rm")]
    RemoveMaterial(RemoveMaterialArgs),

    /// Break down an assembly's unit cost by material
    Cost(CostArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in name and description
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Assembly name
    #[arg(long, short = 'N')]
    pub name: String,

    /// Unit the assembly is counted in (set, m2, ...)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Material lines as ID:QTY (repeatable)
    #[arg(long = "material", short = 'm')]
    pub materials: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Assembly ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AddMaterialArgs {
    /// Assembly ID or short ID (@N)
    pub assembly: String,

    /// Material ID or short ID (@N)
    pub material: String,

    /// Quantity of the material per assembly
    #[arg(default_value = "1")]
    pub quantity: f64,

    /// Line notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveMaterialArgs {
    /// Assembly ID or short ID (@N)
    pub assembly: String,

    /// Material ID or short ID (@N)
    pub material: String,
}

#[derive(clap::Args, Debug)]
pub struct CostArgs {
    /// Assembly ID or short ID (@N)
    pub id: String,
}

pub fn run(cmd: AsmCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AsmCommands::List(args) => run_list(args, global),
        AsmCommands::New(args) => run_new(args, global),
        AsmCommands::Show(args) => run_show(args, global),
        AsmCommands::AddMaterial(args) => run_add_material(args, global),
        AsmCommands::RemoveMaterial(args) => run_remove_material(args, global),
        AsmCommands::Cost(args) => run_cost(args, global),
    }
}

fn material_map(project: &crate::core::Project) -> Result<HashMap<EntityId, Material>> {
    let materials: Vec<Material> = loader::load_all(project)?;
    Ok(materials.into_iter().map(|m| (m.id.clone(), m)).collect())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let mut assemblies: Vec<Assembly> = loader::load_all(&project)?;

    if let Some(search) = &args.search {
        let needle = search.to_lowercase();
        assemblies.retain(|a| {
            a.name.to_lowercase().contains(&needle)
                || a.description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        });
    }
    assemblies.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    if args.count {
        println!("{}", assemblies.len());
        return Ok(());
    }
    if assemblies.is_empty() && global.format == OutputFormat::Auto {
        println!("No assemblies found.");
        return Ok(());
    }

    let materials = material_map(&project)?;
    remember_listing(&project, assemblies.iter().map(|a| &a.id));
    let rows = assemblies
        .iter()
        .enumerate()
        .map(|(i, a)| {
            vec![
                format!("@{}", i + 1),
                a.id.to_string(),
                truncate_str(&a.name, 40),
                a.unit.clone().unwrap_or_default(),
                a.materials.len().to_string(),
                format!("{:.2}", a.unit_cost(&materials)),
            ]
        })
        .collect();

    print_list(
        global.format,
        &assemblies,
        &["SHORT", "ID", "NAME", "UNIT", "LINES", config.currency()],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;

    let mut assembly = Assembly::new(&args.name, config.author());
    assembly.unit = args.unit;
    assembly.description = args.description;

    for line in &args.materials {
        let (reference, qty) = parse_id_qty(line)?;
        let material_id = require_id::<Material>(&project, &reference)?;
        assembly.add_material(material_id, qty);
    }

    let path = loader::save_entity(&project, &assembly)?;
    let materials = material_map(&project)?;
    print_created(
        "assembly",
        &assembly.id,
        &path,
        &format!(
            "{} | {} line(s) | unit cost {}",
            style(&assembly.name).yellow(),
            assembly.materials.len(),
            format_money(assembly.unit_cost(&materials), config.currency())
        ),
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, asm) = load_required::<Assembly>(&project, &args.id)?;
    let materials = material_map(&project)?;

    print_entity(global.format, &asm, || {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}: {}", style("ID").bold(), style(&asm.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&asm.name).yellow());
        if let Some(unit) = &asm.unit {
            println!("{}: {}", style("Unit").bold(), unit);
        }
        if let Some(desc) = &asm.description {
            println!("{}: {}", style("Description").bold(), desc);
        }
        println!();
        println!("{} ({} lines)", style("Materials").bold(), asm.materials.len());
        for line in &asm.materials {
            match materials.get(&line.material_id) {
                Some(m) => println!(
                    "  {} × {} {}",
                    format_qty(line.quantity),
                    m.unit,
                    m.name
                ),
                None => println!(
                    "  {} × {} {}",
                    format_qty(line.quantity),
                    line.material_id,
                    style("(missing)").red()
                ),
            }
        }
        println!();
        println!(
            "{}: {}",
            style("Unit cost").bold(),
            style(format_money(asm.unit_cost(&materials), config.currency())).green()
        );
        println!("{}", style("─".repeat(60)).dim());
    })
}

fn run_add_material(args: AddMaterialArgs, global: &GlobalOpts) -> Result<()> {
    if args.quantity <= 0.0 {
        return Err(miette::miette!("Quantity must be positive"));
    }
    let (project, _) = open_project_with_config(global)?;
    let (_, mut asm) = load_required::<Assembly>(&project, &args.assembly)?;
    let (_, mat) = load_required::<Material>(&project, &args.material)?;

    asm.add_material(mat.id.clone(), args.quantity);
    if let Some(notes) = args.notes {
        if let Some(line) = asm.materials.iter_mut().find(|l| l.material_id == mat.id) {
            line.notes = Some(notes);
        }
    }
    asm.entity_revision += 1;
    loader::save_entity(&project, &asm)?;

    print_updated(format!(
        "Added {} × {} to {}",
        format_qty(args.quantity),
        style(&mat.name).yellow(),
        style(&asm.name).cyan()
    ));
    Ok(())
}

fn run_remove_material(args: RemoveMaterialArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut asm) = load_required::<Assembly>(&project, &args.assembly)?;
    let material_id = require_id::<Material>(&project, &args.material)?;

    if !asm.remove_material(&material_id) {
        return Err(miette::miette!(
            "{} is not in assembly {}",
            material_id,
            asm.name
        ));
    }
    asm.entity_revision += 1;
    loader::save_entity(&project, &asm)?;

    print_updated(format!("Removed {} from {}", material_id, style(&asm.name).cyan()));
    Ok(())
}

fn run_cost(args: CostArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, asm) = load_required::<Assembly>(&project, &args.id)?;
    let materials = material_map(&project)?;
    let total = asm.unit_cost(&materials);

    if global.format == OutputFormat::Json {
        let lines: Vec<serde_json::Value> = asm
            .materials
            .iter()
            .map(|line| {
                let price = materials.get(&line.material_id).map(|m| m.price);
                serde_json::json!({
                    "material_id": line.material_id,
                    "quantity": line.quantity,
                    "unit_price": price,
                    "cost": price.unwrap_or(0.0) * line.quantity,
                })
            })
            .collect();
        let out = serde_json::json!({ "id": asm.id, "lines": lines, "unit_cost": total });
        println!("{}", out);
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["MATERIAL", "QTY", "UNIT", "PRICE", "COST"]);
    for line in &asm.materials {
        let (name, unit, price) = match materials.get(&line.material_id) {
            Some(m) => (m.name.clone(), m.unit.clone(), m.price),
            None => (format!("{} (missing)", line.material_id), String::new(), 0.0),
        };
        builder.push_record([
            name,
            format_qty(line.quantity),
            unit,
            format!("{:.2}", price),
            format!("{:.2}", price * line.quantity),
        ]);
    }

    println!("{}", style(&asm.name).bold());
    println!("{}", builder.build().with(Style::rounded()));
    println!(
        "{}: {}",
        style("Unit cost").bold(),
        style(format_money(total, config.currency())).green()
    );

    let missing: Vec<_> = asm.missing_materials(&materials).collect();
    if !missing.is_empty() {
        println!(
            "{} {} material(s) not in the catalog are costed at 0",
            style("!").yellow(),
            missing.len()
        );
    }
    Ok(())
}
