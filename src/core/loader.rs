//! Entity loading utilities
//!
//! Generic helpers for reading and writing entity files, so command and
//! server code never touch paths directly.

use miette::Diagnostic;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::{Project, ENTITY_SUFFIX};

/// Errors raised while reading or writing entity files
#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("failed to access {path}: {source}")]
    #[diagnostic(code(qbom::loader::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    #[diagnostic(
        code(qbom::loader::yaml),
        help("check the file's indentation and field names")
    )]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("failed to serialize {id}: {source}")]
    #[diagnostic(code(qbom::loader::serialize))]
    Serialize {
        id: EntityId,
        #[source]
        source: serde_yml::Error,
    },

    #[error("'{query}' matches more than one {prefix} ({count} files)")]
    #[diagnostic(code(qbom::loader::ambiguous), help("use more characters of the ID"))]
    Ambiguous {
        query: String,
        prefix: EntityPrefix,
        count: usize,
    },
}

/// Load all entities of type T from the project
///
/// Files that fail to parse are skipped with a warning.
pub fn load_all<T: Entity>(project: &Project) -> Result<Vec<T>, LoaderError> {
    let mut entities = Vec::new();

    for path in project.iter_entity_files(T::PREFIX) {
        let content = read(&path)?;
        match serde_yml::from_str::<T>(&content) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed entity file");
            }
        }
    }

    tracing::debug!(prefix = %T::PREFIX, count = entities.len(), "loaded entities");
    Ok(entities)
}

/// Load all entities of type T, failing on the first file that does not parse
pub fn load_all_strict<T: Entity>(project: &Project) -> Result<Vec<T>, LoaderError> {
    project
        .iter_entity_files(T::PREFIX)
        .map(|path| read_entity(&path))
        .collect()
}

/// Find an entity file by ID (supports partial matching)
///
/// A full ID resolves directly; anything else must match exactly one file
/// stem in the entity directory.
pub fn find_entity_file(
    project: &Project,
    prefix: EntityPrefix,
    query: &str,
) -> Result<Option<PathBuf>, LoaderError> {
    if let Ok(id) = EntityId::parse_as(query, prefix) {
        let path = project.entity_path(&id);
        return Ok(path.exists().then_some(path));
    }

    let needle = query.to_uppercase();
    let matches: Vec<PathBuf> = project
        .iter_entity_files(prefix)
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(ENTITY_SUFFIX))
                .is_some_and(|stem| stem.to_uppercase().contains(&needle))
        })
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.into_iter().next()),
        count => Err(LoaderError::Ambiguous {
            query: query.to_string(),
            prefix,
            count,
        }),
    }
}

/// Load a single entity by full or partial ID
pub fn load_entity<T: Entity>(
    project: &Project,
    query: &str,
) -> Result<Option<(PathBuf, T)>, LoaderError> {
    let Some(path) = find_entity_file(project, T::PREFIX, query)? else {
        return Ok(None);
    };
    let entity = read_entity(&path)?;
    Ok(Some((path, entity)))
}

/// Read and parse one entity file
pub fn read_entity<T: Entity>(path: &Path) -> Result<T, LoaderError> {
    let content = read(path)?;
    serde_yml::from_str(&content).map_err(|source| LoaderError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an entity to its canonical path, returning that path
pub fn save_entity<T: Entity>(project: &Project, entity: &T) -> Result<PathBuf, LoaderError> {
    let path = project.entity_path(entity.id());
    let yaml = serde_yml::to_string(entity).map_err(|source| LoaderError::Serialize {
        id: entity.id().clone(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LoaderError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, yaml).map_err(|source| LoaderError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(id = %entity.id(), path = %path.display(), "saved entity");
    Ok(path)
}

/// Remove an entity file
pub fn delete_entity(path: &Path) -> Result<(), LoaderError> {
    fs::remove_file(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::material::Material;
    use tempfile::tempdir;

    #[test]
    fn test_load_all_empty_project() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let materials: Vec<Material> = load_all(&project).unwrap();
        assert!(materials.is_empty());
    }

    #[test]
    fn test_save_then_load_by_partial_id() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let material = Material::new("Cement 50kg", "bag", 9.5, "tester");
        save_entity(&project, &material).unwrap();

        let full = material.id.to_string();
        let partial = &full[full.len() - 8..];
        let (_, loaded) = load_entity::<Material>(&project, partial).unwrap().unwrap();
        assert_eq!(loaded.id, material.id);
        assert_eq!(loaded.price, 9.5);
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        save_entity(&project, &Material::new("Sand", "m3", 30.0, "tester")).unwrap();
        let bad = project
            .entity_dir(EntityPrefix::Mat)
            .join("MAT-BROKEN.qbom.yaml");
        fs::write(&bad, "name: [unclosed").unwrap();

        let materials: Vec<Material> = load_all(&project).unwrap();
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn test_strict_load_reports_malformed_file() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        save_entity(&project, &Material::new("Sand", "m3", 30.0, "tester")).unwrap();
        let bad = project
            .entity_dir(EntityPrefix::Mat)
            .join("MAT-BROKEN.qbom.yaml");
        fs::write(&bad, "name: [unclosed").unwrap();

        let err = load_all_strict::<Material>(&project).unwrap_err();
        assert!(matches!(err, LoaderError::Yaml { ref path, .. } if path == &bad));
    }

    #[test]
    fn test_missing_entity_is_none() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Mat).to_string();
        assert!(load_entity::<Material>(&project, &id).unwrap().is_none());
    }
}
