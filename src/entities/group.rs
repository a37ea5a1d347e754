//! Assembly group entity - a selection constraint over assemblies
//!
//! Items live inside the group file, so deleting a group removes its items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::selection::model::GroupType;

/// Membership of one assembly inside a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupItem {
    /// Assembly ID (ASM-...)
    pub assembly_id: EntityId,

    /// Multiplier applied to the assembly's unit cost
    #[serde(default = "default_quantity")]
    pub quantity: f64,

    /// Assemblies this one cannot be selected with (CONFLICT groups only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<EntityId>,

    /// Pre-selected when seeding a selection
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,

    #[serde(default)]
    pub sort_order: i32,
}

fn default_quantity() -> f64 {
    1.0
}

/// Assembly group entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier (GRP-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Constraint applied to selections within this group
    pub group_type: GroupType,

    /// Owning category (CAT-...)
    pub category_id: EntityId,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub items: Vec<GroupItem>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

/// Errors from editing a group's items
#[derive(Debug, Error, PartialEq)]
pub enum GroupError {
    #[error("assembly {assembly} is already in group {group}")]
    DuplicateItem { group: EntityId, assembly: EntityId },

    #[error("assembly {assembly} is not in group {group}")]
    MissingItem { group: EntityId, assembly: EntityId },

    #[error("an assembly cannot conflict with itself")]
    SelfConflict,
}

impl Entity for Group {
    const PREFIX: EntityPrefix = EntityPrefix::Grp;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        group_type: GroupType,
        category_id: EntityId,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Grp),
            name: name.into(),
            description: None,
            group_type,
            category_id,
            sort_order: 0,
            items: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Add an assembly to the group. (group, assembly) pairs are unique.
    pub fn add_item(
        &mut self,
        assembly_id: EntityId,
        quantity: f64,
        is_default: bool,
    ) -> Result<&mut GroupItem, GroupError> {
        if self.item(&assembly_id).is_some() {
            return Err(GroupError::DuplicateItem {
                group: self.id.clone(),
                assembly: assembly_id,
            });
        }

        let sort_order = self.items.iter().map(|i| i.sort_order + 1).max().unwrap_or(0);
        self.items.push(GroupItem {
            assembly_id,
            quantity,
            conflicts_with: Vec::new(),
            is_default,
            sort_order,
        });
        let last = self.items.len() - 1;
        Ok(&mut self.items[last])
    }

    /// Remove an assembly from the group
    pub fn remove_item(&mut self, assembly_id: &EntityId) -> Result<GroupItem, GroupError> {
        let pos = self
            .items
            .iter()
            .position(|i| &i.assembly_id == assembly_id)
            .ok_or_else(|| GroupError::MissingItem {
                group: self.id.clone(),
                assembly: assembly_id.clone(),
            })?;
        let removed = self.items.remove(pos);
        for item in &mut self.items {
            item.conflicts_with.retain(|c| c != assembly_id);
        }
        Ok(removed)
    }

    /// Record a mutual conflict between two member assemblies
    pub fn mark_conflict(&mut self, a: &EntityId, b: &EntityId) -> Result<(), GroupError> {
        if a == b {
            return Err(GroupError::SelfConflict);
        }
        if let Some(missing) = [a, b].into_iter().find(|id| self.item(id).is_none()) {
            return Err(GroupError::MissingItem {
                group: self.id.clone(),
                assembly: missing.clone(),
            });
        }
        for (this, other) in [(a, b), (b, a)] {
            if let Some(item) = self.items.iter_mut().find(|i| &i.assembly_id == this) {
                if !item.conflicts_with.contains(other) {
                    item.conflicts_with.push(other.clone());
                }
            }
        }
        Ok(())
    }

    /// Look up the item for an assembly
    pub fn item(&self, assembly_id: &EntityId) -> Option<&GroupItem> {
        self.items.iter().find(|i| &i.assembly_id == assembly_id)
    }

    /// Items in display order
    pub fn sorted_items(&self) -> Vec<&GroupItem> {
        let mut items: Vec<&GroupItem> = self.items.iter().collect();
        items.sort_by_key(|i| i.sort_order);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(kind: GroupType) -> Group {
        Group::new("Toilets", kind, EntityId::new(EntityPrefix::Cat), "a")
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut grp = group(GroupType::Optional);
        let asm = EntityId::new(EntityPrefix::Asm);
        grp.add_item(asm.clone(), 1.0, false).unwrap();
        let err = grp.add_item(asm, 2.0, false).unwrap_err();
        assert!(matches!(err, GroupError::DuplicateItem { .. }));
        assert_eq!(grp.items.len(), 1);
    }

    #[test]
    fn test_sort_order_increments() {
        let mut grp = group(GroupType::ChooseOne);
        grp.add_item(EntityId::new(EntityPrefix::Asm), 1.0, false).unwrap();
        grp.add_item(EntityId::new(EntityPrefix::Asm), 1.0, true).unwrap();
        assert_eq!(grp.items[0].sort_order, 0);
        assert_eq!(grp.items[1].sort_order, 1);
    }

    #[test]
    fn test_mark_conflict_is_mutual() {
        let mut grp = group(GroupType::Conflict);
        let a = EntityId::new(EntityPrefix::Asm);
        let b = EntityId::new(EntityPrefix::Asm);
        grp.add_item(a.clone(), 1.0, false).unwrap();
        grp.add_item(b.clone(), 1.0, false).unwrap();
        grp.mark_conflict(&a, &b).unwrap();
        grp.mark_conflict(&a, &b).unwrap();

        assert_eq!(grp.item(&a).unwrap().conflicts_with, vec![b.clone()]);
        assert_eq!(grp.item(&b).unwrap().conflicts_with, vec![a.clone()]);
        assert_eq!(grp.mark_conflict(&a, &a), Err(GroupError::SelfConflict));
    }

    #[test]
    fn test_remove_item_clears_conflict_references() {
        let mut grp = group(GroupType::Conflict);
        let a = EntityId::new(EntityPrefix::Asm);
        let b = EntityId::new(EntityPrefix::Asm);
        grp.add_item(a.clone(), 1.0, false).unwrap();
        grp.add_item(b.clone(), 1.0, false).unwrap();
        grp.mark_conflict(&a, &b).unwrap();

        grp.remove_item(&b).unwrap();
        assert!(grp.item(&a).unwrap().conflicts_with.is_empty());
        assert!(grp.remove_item(&b).is_err());
    }

    #[test]
    fn test_group_yaml_uses_screaming_type() {
        let grp = group(GroupType::ChooseOne);
        let yaml = serde_yml::to_string(&grp).unwrap();
        assert!(yaml.contains("group_type: CHOOSE_ONE"));
    }
}
