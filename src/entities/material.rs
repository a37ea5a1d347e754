//! Material entity - catalog items purchased by unit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};

/// A Material entity - something bought by the unit (bag, m, pcs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier (MAT-...)
    pub id: EntityId,

    /// Display name
    pub name: String,

    /// Unit of measure
    pub unit: String,

    /// Price per unit
    pub price: f64,

    /// Stock keeping unit / supplier code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Preferred supplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    /// Free-form catalog category (e.g. "Plumbing")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Tags for filtering
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

impl Entity for Material {
    const PREFIX: EntityPrefix = EntityPrefix::Mat;

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

impl Material {
    /// Create a new material with required fields
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        price: f64,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Mat),
            name: name.into(),
            unit: unit.into(),
            price,
            sku: None,
            supplier: None,
            category: None,
            tags: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Update the unit price, bumping the revision
    pub fn set_price(&mut self, price: f64) {
        self.price = price;
        self.entity_revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_creation() {
        let mat = Material::new("PVC pipe 110mm", "m", 4.25, "Author");
        assert!(mat.id.to_string().starts_with("MAT-"));
        assert_eq!(mat.unit, "m");
        assert_eq!(mat.entity_revision, 1);
    }

    #[test]
    fn test_set_price_bumps_revision() {
        let mut mat = Material::new("Gravel", "m3", 40.0, "Author");
        mat.set_price(42.5);
        assert_eq!(mat.price, 42.5);
        assert_eq!(mat.entity_revision, 2);
    }

    #[test]
    fn test_optional_fields_omitted_from_yaml() {
        let mat = Material::new("Sand", "m3", 30.0, "Author");
        let yaml = serde_yml::to_string(&mat).unwrap();
        assert!(!yaml.contains("sku"));
        assert!(!yaml.contains("tags"));
        assert!(!yaml.contains("status"));
    }

    #[test]
    fn test_older_file_with_status_still_loads() {
        let yaml = "id: MAT-01HC2JB7SMQX7RS1Y0GFKBHPTD\nname: Sand\nunit: m3\nprice: 30.0\nstatus: draft\ncreated: 2026-01-05T09:00:00Z\nauthor: a\n";
        let mat: Material = serde_yml::from_str(yaml).unwrap();
        assert_eq!(mat.name, "Sand");
        assert_eq!(mat.entity_revision, 1);
    }
}
