//! Template entity - a bundle of assemblies used to seed a job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::assembly::Assembly;
use crate::entities::material::Material;

/// One assembly in a template, with how many of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLine {
    pub assembly_id: EntityId,
    pub quantity: f64,
}

/// Template entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier (TMPL-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Assemblies in this template
    #[serde(default)]
    pub assemblies: Vec<TemplateLine>,

    /// Assembly groups offered when configuring this template (GRP-...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<EntityId>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

impl Entity for Template {
    const PREFIX: EntityPrefix = EntityPrefix::Tmpl;

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

impl Template {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Tmpl),
            name: name.into(),
            description: None,
            assemblies: Vec::new(),
            groups: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Add an assembly, merging quantities for repeated assemblies
    pub fn add_assembly(&mut self, assembly_id: EntityId, quantity: f64) {
        if let Some(line) = self
            .assemblies
            .iter_mut()
            .find(|l| l.assembly_id == assembly_id)
        {
            line.quantity += quantity;
        } else {
            self.assemblies.push(TemplateLine {
                assembly_id,
                quantity,
            });
        }
    }

    /// Attach a group; returns false if it was already attached
    pub fn add_group(&mut self, group_id: EntityId) -> bool {
        if self.groups.contains(&group_id) {
            return false;
        }
        self.groups.push(group_id);
        true
    }

    /// Replace the assembly list, bumping the revision
    pub fn replace_assemblies(&mut self, lines: Vec<TemplateLine>) {
        self.assemblies.clear();
        for line in lines {
            self.add_assembly(line.assembly_id, line.quantity);
        }
        self.entity_revision += 1;
    }

    /// Total cost: Σ assembly unit cost × line quantity
    pub fn total_cost(
        &self,
        assemblies: &HashMap<EntityId, Assembly>,
        materials: &HashMap<EntityId, Material>,
    ) -> f64 {
        self.assemblies
            .iter()
            .filter_map(|line| {
                assemblies
                    .get(&line.assembly_id)
                    .map(|a| a.unit_cost(materials) * line.quantity)
            })
            .fold(0.0, |acc, cost| acc + cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assembly_merges() {
        let mut tmpl = Template::new("Bathroom", "a");
        let asm = EntityId::new(EntityPrefix::Asm);
        tmpl.add_assembly(asm.clone(), 1.0);
        tmpl.add_assembly(asm, 2.0);
        assert_eq!(tmpl.assemblies.len(), 1);
        assert_eq!(tmpl.assemblies[0].quantity, 3.0);
    }

    #[test]
    fn test_add_group_once() {
        let mut tmpl = Template::new("Bathroom", "a");
        let grp = EntityId::new(EntityPrefix::Grp);
        assert!(tmpl.add_group(grp.clone()));
        assert!(!tmpl.add_group(grp));
    }

    #[test]
    fn test_total_cost() {
        let brick = Material::new("Brick", "pcs", 0.5, "a");
        let mut wall = Assembly::new("Wall m2", "a");
        wall.add_material(brick.id.clone(), 60.0);

        let mut tmpl = Template::new("Shed", "a");
        tmpl.add_assembly(wall.id.clone(), 10.0);
        tmpl.add_assembly(EntityId::new(EntityPrefix::Asm), 5.0);

        let assemblies = HashMap::from([(wall.id.clone(), wall)]);
        let materials = HashMap::from([(brick.id.clone(), brick)]);
        assert_eq!(tmpl.total_cost(&assemblies, &materials), 300.0);
    }

    #[test]
    fn test_replace_assemblies_bumps_revision() {
        let mut tmpl = Template::new("Kitchen", "a");
        tmpl.add_assembly(EntityId::new(EntityPrefix::Asm), 1.0);
        let keep = EntityId::new(EntityPrefix::Asm);
        tmpl.replace_assemblies(vec![TemplateLine {
            assembly_id: keep.clone(),
            quantity: 2.0,
        }]);
        assert_eq!(tmpl.assemblies.len(), 1);
        assert_eq!(tmpl.assemblies[0].assembly_id, keep);
        assert_eq!(tmpl.entity_revision, 2);
    }
}
