//! Shared helper functions for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::loader;
use crate::core::project::Project;
use crate::core::shortid::{self, ShortIdIndex};
use crate::core::Config;

/// Open the project named by `--project`, or discover it from the cwd
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Project plus its layered config
pub fn open_project_with_config(global: &GlobalOpts) -> Result<(Project, Config)> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    Ok((project, config))
}

/// Load an entity by `@N` alias, full ID or unique partial ID
pub fn load_required<T: Entity>(project: &Project, reference: &str) -> Result<(PathBuf, T)> {
    let resolved = shortid::resolve_reference(project, reference);
    loader::load_entity::<T>(project, &resolved)?.ok_or_else(|| {
        miette::miette!(
            "No {} found matching '{}'",
            T::PREFIX.as_str().to_lowercase(),
            reference
        )
    })
}

/// Resolve a reference to the id of an existing entity
pub fn require_id<T: Entity>(project: &Project, reference: &str) -> Result<EntityId> {
    let (_, entity) = load_required::<T>(project, reference)?;
    Ok(entity.id().clone())
}

pub fn print_created(kind: &str, id: &EntityId, path: &Path, detail: &str) {
    println!(
        "{} Created {} {}",
        style("✓").green(),
        kind,
        style(id).cyan()
    );
    println!("   {}", style(path.display()).dim());
    if !detail.is_empty() {
        println!("   {}", detail);
    }
}

pub fn print_updated(message: impl std::fmt::Display) {
    println!("{} {}", style("✓").green(), message);
}

/// Number the listed entities `@1..@N` for follow-up commands
pub fn remember_listing<'a>(project: &Project, ids: impl IntoIterator<Item = &'a EntityId>) {
    let mut index = ShortIdIndex::new();
    index.rebuild(ids);
    if let Err(e) = index.save(project) {
        tracing::debug!(error = %e, "could not save short id index");
    }
}

/// Truncate a string to max_len chars, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_money(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

/// Trim trailing zeros from quantities ("2" rather than "2.000")
pub fn format_qty(qty: f64) -> String {
    let s = format!("{:.3}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Print a list in the requested format.
///
/// JSON and YAML serialize `items`; the tabular formats use `headers`/`rows`.
pub fn print_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(items).into_diagnostic()?);
        }
        OutputFormat::Csv => write_csv(io::stdout(), headers, &rows)?,
        OutputFormat::Tsv => {
            println!("{}", headers.join("\t"));
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Auto => {
            let mut builder = Builder::default();
            builder.push_record(headers.iter().copied());
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}

/// Print one entity: raw YAML, JSON, or the caller's readable summary
pub fn print_entity<T: Serialize>(
    format: OutputFormat,
    entity: &T,
    summary: impl FnOnce(),
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entity).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(entity).into_diagnostic()?);
        }
        _ => summary(),
    }
    Ok(())
}

pub fn write_csv<W: io::Write>(writer: W, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers).into_diagnostic()?;
    for row in rows {
        wtr.write_record(row).into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()?;
    Ok(())
}

/// Parse `ID:QTY`, defaulting the quantity to 1
pub fn parse_id_qty(input: &str) -> Result<(String, f64)> {
    match input.rsplit_once(':') {
        Some((id, qty)) => {
            let qty: f64 = qty
                .parse()
                .map_err(|_| miette::miette!("Invalid quantity in '{}'", input))?;
            Ok((id.to_string(), qty))
        }
        None => Ok((input.to_string(), 1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_format_qty() {
        assert_eq!(format_qty(2.0), "2");
        assert_eq!(format_qty(2.5), "2.5");
        assert_eq!(format_qty(0.125), "0.125");
        assert_eq!(format_qty(0.0), "0");
    }

    #[test]
    fn test_parse_id_qty() {
        assert_eq!(parse_id_qty("@1:3").unwrap(), ("@1".to_string(), 3.0));
        assert_eq!(parse_id_qty("MAT-01").unwrap(), ("MAT-01".to_string(), 1.0));
        assert!(parse_id_qty("@1:lots").is_err());
    }

    #[test]
    fn test_write_csv_quotes_fields() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &["name", "qty"], &[vec!["Sand, washed".to_string(), "2".to_string()]])
            .unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "name,qty\n\"Sand, washed\",2\n");
    }
}
