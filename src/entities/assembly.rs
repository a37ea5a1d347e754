//! Assembly entity - a bill of materials with a derived unit cost

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::material::Material;

/// BOM line item - references a material with quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialLine {
    /// Material ID (MAT-...)
    pub material_id: EntityId,

    /// Quantity of the material per assembly
    pub quantity: f64,

    /// Assembly-specific notes (e.g., "Cut to length on site")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Assembly entity - materials that are installed together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    /// Unique identifier (ASM-...)
    pub id: EntityId,

    /// Assembly name
    pub name: String,

    /// Detailed description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit the assembly is counted in (e.g. "set", "m2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Bill of materials
    #[serde(default)]
    pub materials: Vec<MaterialLine>,

    /// Classification tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author name
    pub author: String,

    /// Revision counter for entity updates
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

impl Entity for Assembly {
    const PREFIX: EntityPrefix = EntityPrefix::Asm;

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

impl Assembly {
    /// Create a new assembly with required fields
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Asm),
            name: name.into(),
            description: None,
            unit: None,
            materials: Vec::new(),
            tags: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Add a material line, merging into an existing line for the same material
    pub fn add_material(&mut self, material_id: EntityId, quantity: f64) {
        if let Some(line) = self.materials.iter_mut().find(|l| l.material_id == material_id) {
            line.quantity += quantity;
        } else {
            self.materials.push(MaterialLine {
                material_id,
                quantity,
                notes: None,
            });
        }
    }

    /// Remove a material line, returning whether anything was removed
    pub fn remove_material(&mut self, material_id: &EntityId) -> bool {
        let before = self.materials.len();
        self.materials.retain(|l| &l.material_id != material_id);
        self.materials.len() != before
    }

    /// Unit cost: Σ(material.price × quantity). Unknown materials contribute 0.
    pub fn unit_cost(&self, materials: &HashMap<EntityId, Material>) -> f64 {
        self.materials
            .iter()
            .filter_map(|line| {
                materials
                    .get(&line.material_id)
                    .map(|m| m.price * line.quantity)
            })
            .fold(0.0, |acc, cost| acc + cost)
    }

    /// Material IDs referenced by this assembly that are not in the catalog
    pub fn missing_materials<'a>(
        &'a self,
        materials: &'a HashMap<EntityId, Material>,
    ) -> impl Iterator<Item = &'a EntityId> + 'a {
        self.materials
            .iter()
            .map(|l| &l.material_id)
            .filter(move |id| !materials.contains_key(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(items: &[&Material]) -> HashMap<EntityId, Material> {
        items.iter().map(|m| (m.id.clone(), (*m).clone())).collect()
    }

    #[test]
    fn test_unit_cost_sums_material_lines() {
        let pipe = Material::new("Pipe", "m", 100.0, "a");
        let glue = Material::new("Glue", "tube", 7.5, "a");
        let mut asm = Assembly::new("Drain run", "a");
        asm.add_material(pipe.id.clone(), 2.0);
        asm.add_material(glue.id.clone(), 2.0);

        assert_eq!(asm.unit_cost(&catalog(&[&pipe, &glue])), 215.0);
    }

    #[test]
    fn test_unknown_material_contributes_nothing() {
        let pipe = Material::new("Pipe", "m", 100.0, "a");
        let mut asm = Assembly::new("Drain run", "a");
        asm.add_material(pipe.id.clone(), 1.0);
        asm.add_material(EntityId::new(EntityPrefix::Mat), 3.0);

        let map = catalog(&[&pipe]);
        assert_eq!(asm.unit_cost(&map), 100.0);
        assert_eq!(asm.missing_materials(&map).count(), 1);
    }

    #[test]
    fn test_add_material_merges_lines() {
        let pipe = Material::new("Pipe", "m", 1.0, "a");
        let mut asm = Assembly::new("Run", "a");
        asm.add_material(pipe.id.clone(), 1.5);
        asm.add_material(pipe.id.clone(), 2.0);
        assert_eq!(asm.materials.len(), 1);
        assert_eq!(asm.materials[0].quantity, 3.5);

        assert!(asm.remove_material(&pipe.id));
        assert!(!asm.remove_material(&pipe.id));
    }
}
