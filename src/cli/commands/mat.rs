//! `qbom mat` command - Material catalog

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    format_money, load_required, open_project_with_config, print_created,
    print_entity, print_list, print_updated, remember_listing, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader;
use crate::entities::material::Material;

#[derive(Subcommand, Debug)]
pub enum MatCommands {
    /// List materials
    List(ListArgs),

    /// Add a material to the catalog
    New(NewArgs),

    /// Show a material's details
    Show(ShowArgs),

    /// Change a material's unit price
    SetPrice(SetPriceArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in name, SKU and supplier
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by catalog category label
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Material name
    #[arg(long, short = 'N')]
    pub name: String,

    /// Unit of measure (m, m2, pcs, bag, ...)
    #[arg(long, short = 'u')]
    pub unit: String,

    /// Price per unit
    #[arg(long, short = 'p')]
    pub price: f64,

    /// Supplier stock code
    #[arg(long)]
    pub sku: Option<String>,

    #[arg(long)]
    pub supplier: Option<String>,

    /// Catalog category label (free text)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Tags (repeatable)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Material ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct SetPriceArgs {
    /// Material ID or short ID (@N)
    pub id: String,

    /// New price per unit
    pub price: f64,
}

pub fn run(cmd: MatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MatCommands::List(args) => run_list(args, global),
        MatCommands::New(args) => run_new(args, global),
        MatCommands::Show(args) => run_show(args, global),
        MatCommands::SetPrice(args) => run_set_price(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let mut materials: Vec<Material> = loader::load_all(&project)?;

    if let Some(search) = &args.search {
        let needle = search.to_lowercase();
        materials.retain(|m| {
            m.name.to_lowercase().contains(&needle)
                || m.sku.as_ref().is_some_and(|s| s.to_lowercase().contains(&needle))
                || m.supplier
                    .as_ref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
        });
    }
    if let Some(category) = &args.category {
        materials.retain(|m| {
            m.category
                .as_ref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
        });
    }
    materials.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    if let Some(limit) = args.limit {
        materials.truncate(limit);
    }

    if args.count {
        println!("{}", materials.len());
        return Ok(());
    }
    if materials.is_empty() && global.format == OutputFormat::Auto {
        println!("No materials found.");
        return Ok(());
    }

    remember_listing(&project, materials.iter().map(|m| &m.id));
    let rows = materials
        .iter()
        .enumerate()
        .map(|(i, m)| {
            vec![
                format!("@{}", i + 1),
                m.id.to_string(),
                truncate_str(&m.name, 40),
                m.unit.clone(),
                format!("{:.2}", m.price),
                m.supplier.clone().unwrap_or_default(),
            ]
        })
        .collect();

    print_list(
        global.format,
        &materials,
        &["SHORT", "ID", "NAME", "UNIT", config.currency(), "SUPPLIER"],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if args.price < 0.0 {
        return Err(miette::miette!("Price cannot be negative"));
    }
    let (project, config) = open_project_with_config(global)?;

    let mut material = Material::new(&args.name, &args.unit, args.price, config.author());
    material.sku = args.sku;
    material.supplier = args.supplier;
    material.category = args.category;
    material.tags = args.tags;

    let path = loader::save_entity(&project, &material)?;
    print_created(
        "material",
        &material.id,
        &path,
        &format!(
            "{} | {} per {}",
            style(&material.name).yellow(),
            format_money(material.price, config.currency()),
            material.unit
        ),
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, mat) = load_required::<Material>(&project, &args.id)?;

    print_entity(global.format, &mat, || {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}: {}", style("ID").bold(), style(&mat.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&mat.name).yellow());
        println!(
            "{}: {} per {}",
            style("Price").bold(),
            format_money(mat.price, config.currency()),
            mat.unit
        );
        if let Some(sku) = &mat.sku {
            println!("{}: {}", style("SKU").bold(), sku);
        }
        if let Some(supplier) = &mat.supplier {
            println!("{}: {}", style("Supplier").bold(), supplier);
        }
        if let Some(category) = &mat.category {
            println!("{}: {}", style("Category").bold(), category);
        }
        if !mat.tags.is_empty() {
            println!("{}: {}", style("Tags").bold(), mat.tags.join(", "));
        }
        println!("{}", style("─".repeat(60)).dim());
        println!(
            "{}: {} | {}: {} | {}: {}",
            style("Author").dim(),
            mat.author,
            style("Created").dim(),
            mat.created.format("%Y-%m-%d %H:%M"),
            style("Revision").dim(),
            mat.entity_revision
        );
    })
}

fn run_set_price(args: SetPriceArgs, global: &GlobalOpts) -> Result<()> {
    if args.price < 0.0 {
        return Err(miette::miette!("Price cannot be negative"));
    }
    let (project, config) = open_project_with_config(global)?;
    let (_, mut mat) = load_required::<Material>(&project, &args.id)?;

    let old = mat.price;
    mat.set_price(args.price);
    loader::save_entity(&project, &mat)?;

    print_updated(format!(
        "{} price {} → {}",
        style(&mat.name).yellow(),
        format_money(old, config.currency()),
        style(format_money(mat.price, config.currency())).cyan()
    ));
    Ok(())
}
