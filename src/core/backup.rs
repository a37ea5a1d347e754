//! Backup and restore of every entity as one JSON snapshot
//!
//! A snapshot carries a SHA-256 checksum of its entity payload. Restore
//! refuses a snapshot whose checksum does not match.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::EntityPrefix;
use crate::core::loader::{self, LoaderError};
use crate::core::project::Project;
use crate::entities::{Assembly, Category, Group, Job, Material, Template};

/// Snapshot format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error, Diagnostic)]
pub enum BackupError {
    #[error("failed to access {path}: {source}")]
    #[diagnostic(code(qbom::backup::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid backup: {source}")]
    #[diagnostic(code(qbom::backup::format))]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("backup checksum mismatch (expected {expected}, computed {actual})")]
    #[diagnostic(
        code(qbom::backup::checksum),
        help("the file was modified or truncated after it was written")
    )]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported backup version {0}")]
    #[diagnostic(code(qbom::backup::version))]
    UnsupportedVersion(u32),

    #[error("project already contains {0} entities")]
    #[diagnostic(
        code(qbom::backup::not_empty),
        help("use --force to replace the current entities with the backup")
    )]
    NotEmpty(usize),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] LoaderError),
}

/// Every entity in the project
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackupContents {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl BackupContents {
    /// Load every entity, failing on any file that does not parse
    pub fn load(project: &Project) -> Result<Self, LoaderError> {
        Ok(Self {
            materials: loader::load_all_strict(project)?,
            assemblies: loader::load_all_strict(project)?,
            categories: loader::load_all_strict(project)?,
            groups: loader::load_all_strict(project)?,
            templates: loader::load_all_strict(project)?,
            jobs: loader::load_all_strict(project)?,
        })
    }

    pub fn len(&self) -> usize {
        self.materials.len()
            + self.assemblies.len()
            + self.categories.len()
            + self.groups.len()
            + self.templates.len()
            + self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn checksum(&self) -> Result<String, serde_json::Error> {
        let payload = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Write every entity, returning the paths written
    fn save_all(&self, project: &Project) -> Result<HashSet<PathBuf>, LoaderError> {
        let mut written = HashSet::with_capacity(self.len());
        save_each(project, &self.materials, &mut written)?;
        save_each(project, &self.assemblies, &mut written)?;
        save_each(project, &self.categories, &mut written)?;
        save_each(project, &self.groups, &mut written)?;
        save_each(project, &self.templates, &mut written)?;
        save_each(project, &self.jobs, &mut written)?;
        Ok(written)
    }
}

fn save_each<T: Entity>(
    project: &Project,
    entities: &[T],
    written: &mut HashSet<PathBuf>,
) -> Result<(), LoaderError> {
    for entity in entities {
        written.insert(loader::save_entity(project, entity)?);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created: DateTime<Utc>,
    pub checksum: String,
    pub entities: BackupContents,
}

impl Snapshot {
    pub fn capture(project: &Project) -> Result<Self, BackupError> {
        let entities = BackupContents::load(project)?;
        let checksum = entities.checksum().map_err(|source| BackupError::Format {
            path: project.root().to_path_buf(),
            source,
        })?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            created: Utc::now(),
            checksum,
            entities,
        })
    }

    /// Read a snapshot and verify its version and checksum
    pub fn read(path: &Path) -> Result<Self, BackupError> {
        let content = fs::read_to_string(path).map_err(|source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| BackupError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(BackupError::UnsupportedVersion(snapshot.version));
        }
        let actual = snapshot
            .entities
            .checksum()
            .map_err(|source| BackupError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        if actual != snapshot.checksum {
            return Err(BackupError::ChecksumMismatch {
                expected: snapshot.checksum,
                actual,
            });
        }
        Ok(snapshot)
    }
}

/// What `backup list` shows for one file
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub created: DateTime<Utc>,
    pub entities: usize,
    pub valid: bool,
}

/// Write a snapshot of the project. Defaults to `.qbom/backups/`.
pub fn create_backup(project: &Project, output: Option<&Path>) -> Result<(PathBuf, Snapshot), BackupError> {
    let snapshot = Snapshot::capture(project)?;
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => project.backups_dir().join(format!(
            "qbom-backup-{}.json",
            snapshot.created.format("%Y%m%d-%H%M%S%3f")
        )),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BackupError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(&snapshot).map_err(|source| BackupError::Format {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| BackupError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), entities = snapshot.entities.len(), "backup written");
    Ok((path, snapshot))
}

/// Restore a snapshot into the project.
///
/// Without `force`, the project must hold no entities. With `force`, every
/// existing entity file must parse; the snapshot is written first and then
/// files the snapshot does not contain are removed, so the project matches
/// the snapshot exactly.
pub fn restore_backup(project: &Project, path: &Path, force: bool) -> Result<Snapshot, BackupError> {
    let snapshot = Snapshot::read(path)?;

    let existing: Vec<PathBuf> = EntityPrefix::all()
        .iter()
        .flat_map(|prefix| project.iter_entity_files(*prefix))
        .collect();
    if !existing.is_empty() {
        if !force {
            return Err(BackupError::NotEmpty(existing.len()));
        }
        BackupContents::load(project)?;
    }

    let written = snapshot.entities.save_all(project)?;
    let stale: Vec<&PathBuf> = existing.iter().filter(|f| !written.contains(*f)).collect();
    for file in &stale {
        loader::delete_entity(file)?;
    }
    if !stale.is_empty() {
        tracing::debug!(removed = stale.len(), "removed entities absent from backup");
    }
    tracing::info!(path = %path.display(), entities = snapshot.entities.len(), "backup restored");
    Ok(snapshot)
}

/// Backups in `.qbom/backups/`, newest first
pub fn list_backups(project: &Project) -> Result<Vec<BackupInfo>, BackupError> {
    let dir = project.backups_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
    {
        let path = entry.path().to_path_buf();
        let info = match Snapshot::read(&path) {
            Ok(snapshot) => BackupInfo {
                created: snapshot.created,
                entities: snapshot.entities.len(),
                valid: true,
                path,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable backup");
                BackupInfo {
                    created: DateTime::<Utc>::MIN_UTC,
                    entities: 0,
                    valid: false,
                    path,
                }
            }
        };
        backups.push(info);
    }
    backups.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::model::GroupType;
    use tempfile::tempdir;

    fn seeded() -> (tempfile::TempDir, Project) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let cement = Material::new("Cement", "bag", 9.5, "t");
        let mut slab = Assembly::new("Slab", "t");
        slab.add_material(cement.id.clone(), 7.0);
        let cat = Category::new("Structure", "t");
        let mut grp = Group::new("Floor", GroupType::Required, cat.id.clone(), "t");
        grp.add_item(slab.id.clone(), 1.0, true).unwrap();

        loader::save_entity(&project, &cement).unwrap();
        loader::save_entity(&project, &slab).unwrap();
        loader::save_entity(&project, &cat).unwrap();
        loader::save_entity(&project, &grp).unwrap();
        (tmp, project)
    }

    #[test]
    fn test_backup_restore_into_empty_project() {
        let (_tmp, project) = seeded();
        let (path, snapshot) = create_backup(&project, None).unwrap();
        assert!(path.starts_with(project.backups_dir()));
        assert_eq!(snapshot.entities.len(), 4);

        let target_dir = tempdir().unwrap();
        let target = Project::init(target_dir.path()).unwrap();
        restore_backup(&target, &path, false).unwrap();

        let groups: Vec<Group> = loader::load_all(&target).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 1);
    }

    #[test]
    fn test_restore_requires_force_when_not_empty() {
        let (_tmp, project) = seeded();
        let (path, _) = create_backup(&project, None).unwrap();
        loader::save_entity(&project, &Material::new("Extra", "pcs", 1.0, "t")).unwrap();

        let err = restore_backup(&project, &path, false).unwrap_err();
        assert!(matches!(err, BackupError::NotEmpty(5)));

        restore_backup(&project, &path, true).unwrap();
        let materials: Vec<Material> = loader::load_all(&project).unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, "Cement");
    }

    #[test]
    fn test_backup_refuses_unparsable_entity() {
        let (_tmp, project) = seeded();
        fs::write(
            project.entity_dir(EntityPrefix::Mat).join("MAT-BROKEN.qbom.yaml"),
            "name: [unclosed",
        )
        .unwrap();

        let err = create_backup(&project, None).unwrap_err();
        assert!(matches!(err, BackupError::Loader(LoaderError::Yaml { .. })));
        assert!(list_backups(&project).unwrap().is_empty());
    }

    #[test]
    fn test_forced_restore_keeps_unparsable_entity() {
        let (_tmp, project) = seeded();
        let (path, _) = create_backup(&project, None).unwrap();
        let broken = project
            .entity_dir(EntityPrefix::Mat)
            .join("MAT-BROKEN.qbom.yaml");
        fs::write(&broken, "name: [unclosed").unwrap();

        let err = restore_backup(&project, &path, true).unwrap_err();
        assert!(matches!(err, BackupError::Loader(LoaderError::Yaml { .. })));
        assert!(broken.exists());
        let materials: Vec<Material> = loader::load_all(&project).unwrap();
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn test_tampered_backup_rejected() {
        let (_tmp, project) = seeded();
        let (path, _) = create_backup(&project, None).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("Cement", "Lime")).unwrap();

        let err = Snapshot::read(&path).unwrap_err();
        assert!(matches!(err, BackupError::ChecksumMismatch { .. }));

        let listed = list_backups(&project).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].valid);
    }
}
