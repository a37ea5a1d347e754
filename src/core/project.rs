//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Name of the marker directory at the project root
pub const PROJECT_DIR: &str = ".qbom";

/// File suffix for entity files
pub const ENTITY_SUFFIX: &str = ".qbom.yaml";

/// Represents a QuickBom project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .qbom/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root)
    }

    /// Force initialization even if .qbom/ exists
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let qbom_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(qbom_dir.join("backups"))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(qbom_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(Self::entity_directory(*prefix)))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# QuickBom project configuration

# Default author for new entities (can be overridden by global config)
# author: ""

# Currency label used in cost output
# currency: "USD"

# Default output format (auto, yaml, json, tsv, csv)
# default_format: auto

# HTTP API (qbom serve)
# server:
#   address: "127.0.0.1"
#   port: 4680

# Logging (RUST_LOG overrides level)
# log:
#   level: "warn"
#   json: false
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .qbom configuration directory
    pub fn qbom_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Directory holding backup snapshots
    pub fn backups_dir(&self) -> PathBuf {
        self.qbom_dir().join("backups")
    }

    /// Get the path for an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.root
            .join(Self::entity_directory(id.prefix()))
            .join(format!("{}{}", id, ENTITY_SUFFIX))
    }

    /// Get the directory for a given entity prefix
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Mat => "catalog/materials",
            EntityPrefix::Asm => "catalog/assemblies",
            EntityPrefix::Cat => "catalog/categories",
            EntityPrefix::Grp => "catalog/groups",
            EntityPrefix::Tmpl => "templates",
            EntityPrefix::Job => "jobs",
        }
    }

    /// Absolute directory for a given entity prefix
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Self::entity_directory(prefix))
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(prefix))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(ENTITY_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a QuickBom project (searched from {searched_from:?}). Run 'qbom init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("QuickBom project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
