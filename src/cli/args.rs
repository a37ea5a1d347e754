//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    asm::AsmCommands, backup::BackupCommands, cat::CatCommands, completions::CompletionsArgs,
    grp::GrpCommands, init::InitArgs, job::JobCommands, mat::MatCommands,
    report::ReportCommands, select::SelectCommands, serve::ServeArgs, tmpl::TmplCommands,
};

#[derive(Parser)]
#[command(name = "qbom")]
#[command(author, version, about = "QuickBom construction estimating toolkit")]
#[command(
    long_about = "Materials, assemblies, selection-rule templates and jobs as plain-text YAML files, with a selection validator and HTTP API."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .qbom/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new QuickBom project
    Init(InitArgs),

    /// Material catalog (priced items)
    #[command(subcommand)]
    Mat(MatCommands),

    /// Assemblies (bills of materials)
    #[command(subcommand)]
    Asm(AsmCommands),

    /// Assembly categories
    #[command(subcommand)]
    Cat(CatCommands),

    /// Assembly groups (REQUIRED, CHOOSE_ONE, OPTIONAL, CONFLICT)
    #[command(subcommand)]
    Grp(GrpCommands),

    /// Templates (assembly bundles with selection groups)
    #[command(subcommand)]
    Tmpl(TmplCommands),

    /// Jobs (construction projects and timelines)
    #[command(subcommand)]
    Job(JobCommands),

    /// Validate selections against group rules
    #[command(subcommand)]
    Select(SelectCommands),

    /// Reports (bill of quantities)
    #[command(subcommand)]
    Report(ReportCommands),

    /// Snapshot and restore every entity
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Run the HTTP API
    Serve(ServeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table for lists, readable summary for single entities
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// CSV format (for spreadsheets)
    Csv,
}
