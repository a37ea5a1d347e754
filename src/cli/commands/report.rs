//! `qbom report` command - Bills of quantities

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    format_money, format_qty, load_required, open_project_with_config, write_csv,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::{Boq, Catalog};
use crate::entities::{Job, Template};

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Material bill of quantities for a job (template lines × job quantity)
    Boq(BoqArgs),

    /// Material bill of quantities for one build of a template
    TemplateBoq(TemplateBoqArgs),
}

#[derive(clap::Args, Debug)]
pub struct BoqArgs {
    /// Job ID or short ID (@N)
    pub job: String,

    /// Also write the table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TemplateBoqArgs {
    /// Template ID or short ID (@N)
    pub template: String,

    /// Also write the table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Boq(args) => run_boq(args, global),
        ReportCommands::TemplateBoq(args) => run_template_boq(args, global),
    }
}

fn run_boq(args: BoqArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, job) = load_required::<Job>(&project, &args.job)?;
    if job.template_id.is_none() {
        return Err(miette::miette!(
            "Job {} has no template; create it with --template",
            job.name
        ));
    }
    let catalog = Catalog::load(&project)?;
    let boq = catalog.job_boq(&job)?;

    let title = format!("{} (× {})", job.name, format_qty(job.quantity));
    output_boq(global, &title, &boq, args.csv, config.currency())
}

fn run_template_boq(args: TemplateBoqArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let (_, template) = load_required::<Template>(&project, &args.template)?;
    let catalog = Catalog::load(&project)?;
    let boq = catalog.bill_of_quantities(&template.assemblies, 1.0);

    output_boq(global, &template.name, &boq, args.csv, config.currency())
}

fn output_boq(
    global: &GlobalOpts,
    title: &str,
    boq: &Boq,
    csv: Option<PathBuf>,
    currency: &str,
) -> Result<()> {
    let headers = ["MATERIAL", "QTY", "UNIT", "PRICE", "TOTAL"];
    let rows: Vec<Vec<String>> = boq
        .lines
        .iter()
        .map(|l| {
            vec![
                l.name.clone(),
                format_qty(l.quantity),
                l.unit.clone(),
                format!("{:.2}", l.unit_price),
                format!("{:.2}", l.total),
            ]
        })
        .collect();

    if let Some(path) = &csv {
        let file = File::create(path).into_diagnostic()?;
        write_csv(file, &headers, &rows)?;
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(boq).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(boq).into_diagnostic()?);
        }
        OutputFormat::Csv => write_csv(std::io::stdout(), &headers, &rows)?,
        OutputFormat::Tsv => {
            println!("{}", headers.join("\t"));
            for row in &rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Auto => {
            let mut builder = Builder::default();
            builder.push_record(headers);
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", style(title).bold());
            println!("{}", builder.build().with(Style::rounded()));
            println!(
                "{}: {}",
                style("Total").bold(),
                style(format_money(boq.total, currency)).green()
            );
            if !boq.missing.is_empty() {
                println!(
                    "{} {} referenced item(s) missing from the catalog were skipped",
                    style("!").yellow(),
                    boq.missing.len()
                );
            }
            if let Some(path) = &csv {
                println!("   {}", style(path.display()).dim());
            }
        }
    }
    Ok(())
}
