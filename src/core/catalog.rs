//! Catalog snapshot and group-fetch strategies
//!
//! A [`Catalog`] is an in-memory read of every catalog entity. The validator
//! only ever sees [`ResolvedGroup`]s produced here, either by the group ids a
//! selection references or by template scope.

use miette::Diagnostic;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::loader::{self, LoaderError};
use crate::core::project::Project;
use crate::entities::template::TemplateLine;
use crate::entities::{Assembly, Category, Group, Job, Material, Template};
use crate::selection::model::{ResolvedGroup, ResolvedItem};

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] LoaderError),

    #[error("template not found: {0}")]
    #[diagnostic(code(qbom::catalog::template_not_found), help("run 'qbom tmpl list' to see templates"))]
    TemplateNotFound(String),
}

/// Everything needed to resolve groups and cost assemblies
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub materials: HashMap<EntityId, Material>,
    pub assemblies: HashMap<EntityId, Assembly>,
    pub categories: HashMap<EntityId, Category>,
    pub groups: Vec<Group>,
    pub templates: HashMap<EntityId, Template>,
}

/// One aggregated material in a bill of quantities
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BoqLine {
    pub material_id: EntityId,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Flattened material totals
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Boq {
    pub lines: Vec<BoqLine>,
    pub total: f64,
    /// Assembly or material ids referenced but not in the catalog
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<EntityId>,
}

impl Catalog {
    /// Read every catalog entity from the project
    pub fn load(project: &Project) -> Result<Self, CatalogError> {
        let catalog = Self {
            materials: by_id(loader::load_all::<Material>(project)?, |m| &m.id),
            assemblies: by_id(loader::load_all::<Assembly>(project)?, |a| &a.id),
            categories: by_id(loader::load_all::<Category>(project)?, |c| &c.id),
            groups: loader::load_all::<Group>(project)?,
            templates: by_id(loader::load_all::<Template>(project)?, |t| &t.id),
        };
        tracing::debug!(
            materials = catalog.materials.len(),
            assemblies = catalog.assemblies.len(),
            groups = catalog.groups.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Unit cost of an assembly (0 when unknown)
    pub fn assembly_cost(&self, assembly_id: &EntityId) -> f64 {
        self.assemblies
            .get(assembly_id)
            .map(|a| a.unit_cost(&self.materials))
            .unwrap_or(0.0)
    }

    pub fn assembly_name(&self, assembly_id: &EntityId) -> String {
        self.assemblies
            .get(assembly_id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| assembly_id.to_string())
    }

    /// Fill in category, assembly names and unit costs for one group
    pub fn resolve_group(&self, group: &Group) -> ResolvedGroup {
        let category_name = self
            .categories
            .get(&group.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| group.category_id.to_string());

        let items = group
            .sorted_items()
            .into_iter()
            .map(|item| ResolvedItem {
                assembly_id: item.assembly_id.clone(),
                assembly_name: self.assembly_name(&item.assembly_id),
                quantity: item.quantity,
                conflicts_with: item.conflicts_with.clone(),
                is_default: item.is_default,
                unit_cost: self.assembly_cost(&item.assembly_id),
                sort_order: item.sort_order,
            })
            .collect();

        ResolvedGroup {
            id: group.id.clone(),
            name: group.name.clone(),
            category_id: group.category_id.clone(),
            category_name,
            group_type: group.group_type,
            sort_order: group.sort_order,
            items,
        }
    }

    /// Resolve the groups a selection references. Unknown ids are dropped.
    pub fn groups_by_ids(&self, ids: &BTreeSet<EntityId>) -> Vec<ResolvedGroup> {
        let groups = self.groups.iter().filter(|g| ids.contains(&g.id));
        self.resolve_sorted(groups)
    }

    /// Resolve the groups attached to a template
    pub fn groups_for_template(&self, template_id: &EntityId) -> Result<Vec<ResolvedGroup>, CatalogError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| CatalogError::TemplateNotFound(template_id.to_string()))?;
        let groups = self
            .groups
            .iter()
            .filter(|g| template.groups.contains(&g.id));
        Ok(self.resolve_sorted(groups))
    }

    /// Every group, resolved, in display order
    pub fn all_groups(&self) -> Vec<ResolvedGroup> {
        self.resolve_sorted(self.groups.iter())
    }

    // Category sort order, then group sort order, then names for stability
    fn resolve_sorted<'a>(&self, groups: impl Iterator<Item = &'a Group>) -> Vec<ResolvedGroup> {
        let mut resolved: Vec<ResolvedGroup> = groups.map(|g| self.resolve_group(g)).collect();
        resolved.sort_by(|a, b| {
            let cat_order = |g: &ResolvedGroup| {
                self.categories
                    .get(&g.category_id)
                    .map(|c| c.sort_order)
                    .unwrap_or(i32::MAX)
            };
            cat_order(a)
                .cmp(&cat_order(b))
                .then_with(|| a.category_name.cmp(&b.category_name))
                .then_with(|| a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.name.cmp(&b.name))
        });
        resolved
    }

    /// Total cost of a template's assembly lines
    pub fn template_cost(&self, template: &Template) -> f64 {
        template.total_cost(&self.assemblies, &self.materials)
    }

    /// Flatten assembly lines into aggregated material quantities
    pub fn bill_of_quantities(&self, lines: &[TemplateLine], multiplier: f64) -> Boq {
        let mut boq = Boq::default();
        for line in lines {
            let Some(assembly) = self.assemblies.get(&line.assembly_id) else {
                push_unique(&mut boq.missing, &line.assembly_id);
                continue;
            };
            for ml in &assembly.materials {
                let Some(material) = self.materials.get(&ml.material_id) else {
                    push_unique(&mut boq.missing, &ml.material_id);
                    continue;
                };
                let quantity = ml.quantity * line.quantity * multiplier;
                match boq.lines.iter_mut().find(|l| l.material_id == material.id) {
                    Some(existing) => existing.quantity += quantity,
                    None => boq.lines.push(BoqLine {
                        material_id: material.id.clone(),
                        name: material.name.clone(),
                        unit: material.unit.clone(),
                        quantity,
                        unit_price: material.price,
                        total: 0.0,
                    }),
                }
            }
        }

        for line in &mut boq.lines {
            line.total = line.quantity * line.unit_price;
        }
        boq.lines.sort_by(|a, b| a.name.cmp(&b.name));
        boq.total = boq.lines.iter().fold(0.0, |acc, l| acc + l.total);
        boq
    }

    /// Bill of quantities for a job: its template's lines × job quantity
    pub fn job_boq(&self, job: &Job) -> Result<Boq, CatalogError> {
        let Some(template_id) = &job.template_id else {
            return Ok(Boq::default());
        };
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| CatalogError::TemplateNotFound(template_id.to_string()))?;
        Ok(self.bill_of_quantities(&template.assemblies, job.quantity))
    }
}

fn by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &EntityId) -> HashMap<EntityId, T> {
    items.into_iter().map(|item| (id(&item).clone(), item)).collect()
}

fn push_unique(ids: &mut Vec<EntityId>, id: &EntityId) {
    if !ids.contains(id) {
        ids.push(id.clone());
    }
}
