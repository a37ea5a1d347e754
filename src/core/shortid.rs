//! Session aliases (`@1`, `@2`, ...) for the rows of the last listing
//!
//! `qbom <entity> list` rewrites the index; other commands accept an alias
//! anywhere they accept an ID.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::identity::EntityId;
use crate::core::project::Project;

const INDEX_FILE: &str = "shortids.json";

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    entries: BTreeMap<u32, EntityId>,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(project: &Project) -> PathBuf {
        project.qbom_dir().join(INDEX_FILE)
    }

    /// Load the project's index; a missing or unreadable index is empty
    pub fn load(project: &Project) -> Self {
        fs::read_to_string(Self::path(project))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(project), content)
    }

    /// Replace the index with the given ids, numbered from 1 in order
    pub fn rebuild<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        self.entries = ids
            .into_iter()
            .zip(1u32..)
            .map(|(id, n)| (n, id.clone()))
            .collect();
    }

    /// Alias number for an id, if it was in the last listing
    pub fn short_id(&self, id: &EntityId) -> Option<u32> {
        self.entries
            .iter()
            .find_map(|(n, entry)| (entry == id).then_some(*n))
    }

    /// Turn `@N` (or a bare `N`) into a full id; anything else passes through
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let digits = reference.strip_prefix('@').unwrap_or(reference);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Some(reference.to_string());
        }
        digits
            .parse::<u32>()
            .ok()
            .and_then(|n| self.entries.get(&n))
            .map(EntityId::to_string)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a user-supplied reference against the project's alias index
pub fn resolve_reference(project: &Project, reference: &str) -> String {
    ShortIdIndex::load(project)
        .resolve(reference)
        .unwrap_or_else(|| reference.to_string())
}
