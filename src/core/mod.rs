//! Core module - fundamental types and utilities

pub mod backup;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod project;
pub mod shortid;

pub use backup::{BackupError, Snapshot};
pub use catalog::{Boq, BoqLine, Catalog, CatalogError};
pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use loader::LoaderError;
pub use project::{Project, ProjectError};
pub use shortid::ShortIdIndex;
