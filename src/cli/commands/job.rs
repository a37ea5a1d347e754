//! `qbom job` command - Jobs and their timelines

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{
    format_qty, load_required, open_project_with_config, print_created, print_entity,
    print_list, print_updated, remember_listing, require_id, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader;
use crate::entities::job::{JobStatus, JobTask};
use crate::entities::{Job, Template};

const TIMELINE_WIDTH: i64 = 40;

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// List jobs
    List(ListArgs),

    /// Create a job
    New(NewArgs),

    /// Show a job's details
    Show(ShowArgs),

    /// Change a job's status
    Status(StatusArgs),

    /// Add a timeline task
    Task(TaskArgs),

    /// Draw the job's timeline
    Timeline(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// planning, active, on-hold, completed or cancelled
    #[arg(long, short = 's')]
    pub status: Option<JobStatus>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 'N')]
    pub name: String,

    #[arg(long)]
    pub client: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Template the bill of quantities comes from (ID or @N)
    #[arg(long, short = 't')]
    pub template: Option<String>,

    /// Number of times the template is built
    #[arg(long, default_value = "1")]
    pub quantity: f64,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Job ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Job ID or short ID (@N)
    pub id: String,

    pub status: JobStatus,
}

#[derive(clap::Args, Debug)]
pub struct TaskArgs {
    /// Job ID or short ID (@N)
    pub job: String,

    #[arg(long, short = 'N')]
    pub name: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: NaiveDate,

    /// Percent complete
    #[arg(long, default_value = "0")]
    pub progress: u8,
}

pub fn run(cmd: JobCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        JobCommands::List(args) => run_list(args, global),
        JobCommands::New(args) => run_new(args, global),
        JobCommands::Show(args) => run_show(args, global),
        JobCommands::Status(args) => run_status(args, global),
        JobCommands::Task(args) => run_task(args, global),
        JobCommands::Timeline(args) => run_timeline(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let mut jobs: Vec<Job> = loader::load_all(&project)?;
    if let Some(status) = args.status {
        jobs.retain(|j| j.status == status);
    }
    jobs.sort_by(|a, b| b.created.cmp(&a.created));

    if jobs.is_empty() && global.format == OutputFormat::Auto {
        println!("No jobs found.");
        return Ok(());
    }

    remember_listing(&project, jobs.iter().map(|j| &j.id));
    let rows = jobs
        .iter()
        .enumerate()
        .map(|(i, j)| {
            vec![
                format!("@{}", i + 1),
                j.id.to_string(),
                truncate_str(&j.name, 30),
                j.client.clone().unwrap_or_default(),
                j.status.to_string(),
                format!("{:.0}%", j.progress()),
            ]
        })
        .collect();

    print_list(
        global.format,
        &jobs,
        &["SHORT", "ID", "NAME", "CLIENT", "STATUS", "PROGRESS"],
        rows,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if args.quantity <= 0.0 {
        return Err(miette::miette!("Quantity must be positive"));
    }
    let (project, config) = open_project_with_config(global)?;

    let mut job = Job::new(&args.name, config.author());
    job.client = args.client;
    job.location = args.location;
    job.quantity = args.quantity;
    if let Some(reference) = &args.template {
        job.template_id = Some(require_id::<Template>(&project, reference)?);
    }

    let path = loader::save_entity(&project, &job)?;
    print_created(
        "job",
        &job.id,
        &path,
        &format!("{} | {}", style(&job.name).yellow(), job.status),
    );
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, job) = load_required::<Job>(&project, &args.id)?;

    print_entity(global.format, &job, || {
        println!("{}", style("─".repeat(60)).dim());
        println!("{}: {}", style("ID").bold(), style(&job.id).cyan());
        println!("{}: {}", style("Name").bold(), style(&job.name).yellow());
        if let Some(client) = &job.client {
            println!("{}: {}", style("Client").bold(), client);
        }
        if let Some(location) = &job.location {
            println!("{}: {}", style("Location").bold(), location);
        }
        println!("{}: {}", style("Status").bold(), job.status);
        if let Some(template_id) = &job.template_id {
            println!(
                "{}: {} × {}",
                style("Template").bold(),
                template_id,
                format_qty(job.quantity)
            );
        }
        if let Some((start, end)) = job.span() {
            println!("{}: {} → {}", style("Schedule").bold(), start, end);
        }
        println!("{}: {:.0}%", style("Progress").bold(), job.progress());
        println!("{}", style("─".repeat(60)).dim());
    })
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut job) = load_required::<Job>(&project, &args.id)?;

    let old = job.status;
    job.status = args.status;
    job.entity_revision += 1;
    loader::save_entity(&project, &job)?;

    print_updated(format!(
        "{} {} → {}",
        style(&job.name).yellow(),
        old,
        style(job.status).cyan()
    ));
    Ok(())
}

fn run_task(args: TaskArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, mut job) = load_required::<Job>(&project, &args.job)?;

    let task = JobTask {
        name: args.name,
        start: args.start,
        end: args.end,
        progress: args.progress,
    };
    let days = task.duration_days();
    let name = task.name.clone();
    job.add_task(task).map_err(|e| miette::miette!("{}", e))?;
    job.entity_revision += 1;
    loader::save_entity(&project, &job)?;

    print_updated(format!(
        "Added task {} ({} day(s)) to {}",
        style(name).yellow(),
        days,
        style(&job.name).cyan()
    ));
    Ok(())
}

fn run_timeline(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _) = open_project_with_config(global)?;
    let (_, job) = load_required::<Job>(&project, &args.id)?;

    let Some((start, end)) = job.span() else {
        println!("{} has no tasks.", job.name);
        return Ok(());
    };

    if matches!(global.format, OutputFormat::Json | OutputFormat::Yaml) {
        return print_entity(global.format, &job.tasks, || {});
    }

    println!(
        "{}  {} → {}",
        style(&job.name).bold(),
        start,
        end
    );
    let name_width = job
        .tasks
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    for task in &job.tasks {
        println!(
            "  {:<width$}  {}  {:>3}%",
            truncate_str(&task.name, 24),
            timeline_bar(task, start, end),
            task.progress,
            width = name_width
        );
    }
    println!("  {:<width$}  {:.0}% complete", "", job.progress(), width = name_width);
    Ok(())
}

/// Scale a task onto a fixed-width bar spanning the job, filled by progress.
/// Hand-edited files may hold out-of-range dates or progress, so every
/// segment is clamped to the bar.
fn timeline_bar(task: &JobTask, start: NaiveDate, end: NaiveDate) -> String {
    let span = ((end - start).num_days() + 1).max(1);
    let offset =
        ((task.start - start).num_days() * TIMELINE_WIDTH / span).clamp(0, TIMELINE_WIDTH);
    let length = (task.duration_days().max(1) * TIMELINE_WIDTH / span)
        .max(1)
        .min(TIMELINE_WIDTH - offset);
    let done = length * i64::from(task.progress.min(100)) / 100;

    let mut bar = " ".repeat(width(offset));
    bar.push_str(&"█".repeat(width(done)));
    bar.push_str(&"░".repeat(width(length - done)));
    bar.push_str(&" ".repeat(width(TIMELINE_WIDTH - offset - length)));
    bar
}

fn width(cells: i64) -> usize {
    usize::try_from(cells).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_timeline_bar_scales_to_span() {
        let task = JobTask {
            name: "Slab".into(),
            start: date("2026-01-11"),
            end: date("2026-01-20"),
            progress: 50,
        };
        let bar = timeline_bar(&task, date("2026-01-01"), date("2026-01-20"));
        assert_eq!(bar.chars().count(), TIMELINE_WIDTH as usize);
        assert_eq!(bar.chars().take_while(|c| *c == ' ').count(), 20);
        assert_eq!(bar.chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 10);
    }

    #[test]
    fn test_timeline_bar_clamps_out_of_range_progress() {
        let task = JobTask {
            name: "Roof".into(),
            start: date("2026-01-01"),
            end: date("2026-01-20"),
            progress: 150,
        };
        let bar = timeline_bar(&task, date("2026-01-01"), date("2026-01-20"));
        assert_eq!(bar.chars().count(), TIMELINE_WIDTH as usize);
        assert_eq!(bar.chars().filter(|c| *c == '█').count(), TIMELINE_WIDTH as usize);
        assert_eq!(bar.chars().filter(|c| *c == '░').count(), 0);
    }

    #[test]
    fn test_timeline_bar_tolerates_reversed_dates() {
        let task = JobTask {
            name: "Fence".into(),
            start: date("2026-02-10"),
            end: date("2026-02-01"),
            progress: 0,
        };
        let bar = timeline_bar(&task, date("2026-02-10"), date("2026-02-01"));
        assert_eq!(bar.chars().count(), TIMELINE_WIDTH as usize);

        // Task starting after the job ends still fits the bar
        let late = JobTask {
            name: "Paint".into(),
            start: date("2026-03-01"),
            end: date("2026-03-05"),
            progress: 40,
        };
        let bar = timeline_bar(&late, date("2026-01-01"), date("2026-01-10"));
        assert_eq!(bar.chars().count(), TIMELINE_WIDTH as usize);
    }
}
