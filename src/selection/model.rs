//! Constraint model: group types, resolved groups, selections and outcomes
//!
//! Everything here is plain data. Groups arrive already resolved against the
//! catalog (names and unit costs filled in), so the validator never touches
//! the store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::core::identity::EntityId;

/// Constraint applied to the selections inside one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    /// Every item must be selected
    Required,
    /// Exactly one item must be selected
    ChooseOne,
    /// Any subset
    Optional,
    /// Items listed in each other's conflict lists cannot be selected together
    Conflict,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Required => "REQUIRED",
            GroupType::ChooseOne => "CHOOSE_ONE",
            GroupType::Optional => "OPTIONAL",
            GroupType::Conflict => "CONFLICT",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "REQUIRED" => Ok(GroupType::Required),
            "CHOOSE_ONE" => Ok(GroupType::ChooseOne),
            "OPTIONAL" => Ok(GroupType::Optional),
            "CONFLICT" => Ok(GroupType::Conflict),
            _ => Err(format!(
                "Invalid group type: {}. Use required, choose-one, optional, or conflict",
                s
            )),
        }
    }
}

/// A group item with its assembly resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub assembly_id: EntityId,
    pub assembly_name: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<EntityId>,
    #[serde(default)]
    pub is_default: bool,
    /// Σ material price × quantity for the assembly
    pub unit_cost: f64,
    #[serde(default)]
    pub sort_order: i32,
}

impl ResolvedItem {
    pub fn cost(&self) -> f64 {
        self.unit_cost * self.quantity
    }
}

/// A group with its category and items resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedGroup {
    pub id: EntityId,
    pub name: String,
    pub category_id: EntityId,
    pub category_name: String,
    pub group_type: GroupType,
    #[serde(default)]
    pub sort_order: i32,
    /// Items in display order
    pub items: Vec<ResolvedItem>,
}

impl ResolvedGroup {
    pub fn item(&self, assembly_id: &EntityId) -> Option<&ResolvedItem> {
        self.items.iter().find(|i| &i.assembly_id == assembly_id)
    }

    /// Assembly name for display, falling back to the raw id
    pub fn display_name(&self, assembly_id: &EntityId) -> String {
        self.item(assembly_id)
            .map(|i| i.assembly_name.clone())
            .unwrap_or_else(|| assembly_id.to_string())
    }
}

/// Selected assemblies keyed by category id, then group id
///
/// Parsed at the boundary: every key and value must be a well-formed entity
/// id, so a payload with garbage ids never reaches the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<EntityId, BTreeMap<EntityId, Vec<EntityId>>>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected assembly ids for a group (empty when absent)
    pub fn selected(&self, category_id: &EntityId, group_id: &EntityId) -> &[EntityId] {
        self.0
            .get(category_id)
            .and_then(|groups| groups.get(group_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable selection list for a group, created empty when absent
    pub fn group_mut(&mut self, category_id: &EntityId, group_id: &EntityId) -> &mut Vec<EntityId> {
        self.0
            .entry(category_id.clone())
            .or_default()
            .entry(group_id.clone())
            .or_default()
    }

    pub fn set(&mut self, category_id: &EntityId, group_id: &EntityId, assemblies: Vec<EntityId>) {
        *self.group_mut(category_id, group_id) = assemblies;
    }

    /// Every group id referenced, across all categories
    pub fn group_ids(&self) -> BTreeSet<EntityId> {
        self.0
            .values()
            .flat_map(|groups| groups.keys().cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &EntityId, &[EntityId])> {
        self.0.iter().flat_map(|(cat, groups)| {
            groups
                .iter()
                .map(move |(grp, selected)| (cat, grp, selected.as_slice()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|groups| groups.is_empty())
    }
}

/// Kind of validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Required,
    ChooseOne,
    Conflict,
    /// Part of the wire vocabulary; the validator never produces it
    CategoryRequired,
}

/// Structured context attached to a validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    Count {
        expected: usize,
        selected: usize,
    },
    Conflict {
        #[serde(rename = "assemblyId")]
        assembly_id: EntityId,
        #[serde(rename = "conflictsWith")]
        conflicts_with: Vec<EntityId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<EntityId>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// A selected assembly and what it costs within its group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAssembly {
    pub assembly_id: EntityId,
    pub name: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBreakdown {
    pub group_id: EntityId,
    pub group_name: String,
    pub group_type: GroupType,
    pub assemblies: Vec<SelectedAssembly>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category_id: EntityId,
    pub category_name: String,
    pub groups: Vec<GroupBreakdown>,
    pub subtotal: f64,
}

/// Result of validating a selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub total_cost: f64,
    pub breakdown: Vec<CategoryBreakdown>,
}

impl ValidationOutcome {
    /// Selected assemblies with their item quantities, merged across groups
    pub fn selected_lines(&self) -> Vec<(EntityId, f64)> {
        let mut lines: Vec<(EntityId, f64)> = Vec::new();
        let selected = self
            .breakdown
            .iter()
            .flat_map(|c| &c.groups)
            .flat_map(|g| &g.assemblies);
        for asm in selected {
            match lines.iter_mut().find(|(id, _)| id == &asm.assembly_id) {
                Some((_, qty)) => *qty += asm.quantity,
                None => lines.push((asm.assembly_id.clone(), asm.quantity)),
            }
        }
        lines
    }

    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_group_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&GroupType::ChooseOne).unwrap(),
            "\"CHOOSE_ONE\""
        );
        assert_eq!("choose-one".parse::<GroupType>().unwrap(), GroupType::ChooseOne);
        assert!("pick".parse::<GroupType>().is_err());
    }

    #[test]
    fn test_selection_parses_nested_ids() {
        let cat = EntityId::new(EntityPrefix::Cat);
        let grp = EntityId::new(EntityPrefix::Grp);
        let asm = EntityId::new(EntityPrefix::Asm);
        let json = format!(r#"{{"{}": {{"{}": ["{}"]}}}}"#, cat, grp, asm);

        let selection: Selection = serde_json::from_str(&json).unwrap();
        assert_eq!(selection.selected(&cat, &grp), &[asm]);
        assert!(selection.group_ids().contains(&grp));
        assert!(selection.selected(&grp, &cat).is_empty());
    }

    #[test]
    fn test_selection_rejects_malformed_ids() {
        let json = r#"{"not-an-id": {"GRP-x": [1, 2]}}"#;
        assert!(serde_json::from_str::<Selection>(json).is_err());
    }

    #[test]
    fn test_error_serializes_type_and_camel_case() {
        let grp = EntityId::new(EntityPrefix::Grp);
        let err = ValidationError {
            kind: ErrorKind::ChooseOne,
            group_id: Some(grp.clone()),
            message: "pick one".to_string(),
            details: Some(ErrorDetails::Count {
                expected: 1,
                selected: 2,
            }),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "choose_one");
        assert_eq!(value["groupId"], grp.to_string());
        assert_eq!(value["details"]["selected"], 2);
    }
}
