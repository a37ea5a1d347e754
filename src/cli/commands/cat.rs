//! `qbom cat` command - Assembly categories

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    open_project_with_config, print_created, print_list, remember_listing,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader;
use crate::entities::{Category, Group};

#[derive(Subcommand, Debug)]
pub enum CatCommands {
    /// List categories in display order
    List,

    /// Create a category
    New(NewArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Category name (e.g. "Sanitary & Plumbing")
    #[arg(long, short = 'N')]
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Display order among categories
    #[arg(long, default_value = "0")]
    pub sort_order: i32,
}

pub fn run(cmd: CatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatCommands::List => run_list(global),
        CatCommands::New(args) => run_new(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let mut categories: Vec<Category> = loader::load_all(&project)?;
    let groups: Vec<Group> = loader::load_all(&project)?;
    categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));

    if categories.is_empty() && global.format == OutputFormat::Auto {
        println!("No categories found.");
        return Ok(());
    }

    remember_listing(&project, categories.iter().map(|c| &c.id));
    let rows = categories
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let group_count = groups.iter().filter(|g| g.category_id == c.id).count();
            vec![
                format!("@{}", i + 1),
                c.id.to_string(),
                c.name.clone(),
                c.sort_order.to_string(),
                group_count.to_string(),
            ]
        })
        .collect();

    print_list(
        global.format,
        &categories,
        &["SHORT", "ID", "NAME", "ORDER", "GROUPS"],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;

    let mut category = Category::new(&args.name, config.author());
    category.description = args.description;
    category.sort_order = args.sort_order;

    let path = loader::save_entity(&project, &category)?;
    print_created(
        "category",
        &category.id,
        &path,
        &style(&category.name).yellow().to_string(),
    );
    Ok(())
}
