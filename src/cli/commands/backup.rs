//! `qbom backup` command - Snapshot and restore every entity

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{open_project, print_list, print_updated};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::backup::{create_backup, list_backups, restore_backup};

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Write a checksummed JSON snapshot of the project
    Create(CreateArgs),

    /// Restore a snapshot into the project
    Restore(RestoreArgs),

    /// List snapshots in .qbom/backups, newest first
    List,
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Output file (default: .qbom/backups/qbom-backup-<timestamp>.json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RestoreArgs {
    /// Snapshot file
    pub file: PathBuf,

    /// Replace existing entities instead of refusing
    #[arg(long)]
    pub force: bool,
}

pub fn run(cmd: BackupCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BackupCommands::Create(args) => run_create(args, global),
        BackupCommands::Restore(args) => run_restore(args, global),
        BackupCommands::List => run_list(global),
    }
}

fn run_create(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, snapshot) = create_backup(&project, args.output.as_deref())?;

    print_updated(format!(
        "Backed up {} entities",
        style(snapshot.entities.len()).cyan()
    ));
    println!("   {}", style(path.display()).dim());
    Ok(())
}

fn run_restore(args: RestoreArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let snapshot = restore_backup(&project, &args.file, args.force)?;

    print_updated(format!(
        "Restored {} entities from snapshot taken {}",
        style(snapshot.entities.len()).cyan(),
        snapshot.created.format("%Y-%m-%d %H:%M")
    ));
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let backups = list_backups(&project)?;

    if backups.is_empty() && global.format == OutputFormat::Auto {
        println!("No backups found.");
        return Ok(());
    }

    let rows = backups
        .iter()
        .map(|b| {
            vec![
                b.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                b.created.format("%Y-%m-%d %H:%M:%S").to_string(),
                b.entities.to_string(),
                if b.valid { "ok" } else { "invalid" }.to_string(),
            ]
        })
        .collect();

    print_list(
        global.format,
        &backups,
        &["FILE", "CREATED", "ENTITIES", "CHECK"],
        rows,
    )
}
