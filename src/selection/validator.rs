//! Selection validator
//!
//! One synchronous pass over the resolved groups. Failures are collected, never
//! short-circuited, so a caller sees every problem at once. Cost accumulation
//! is independent of validity.

use std::collections::HashSet;
use tracing::debug;

use super::model::{
    CategoryBreakdown, ErrorDetails, ErrorKind, GroupBreakdown, GroupType, ResolvedGroup,
    SelectedAssembly, Selection, ValidationError, ValidationOutcome,
};
use crate::core::identity::EntityId;

/// Validate a selection against resolved group definitions.
///
/// Groups are partitioned by category in first-appearance order. Selection
/// entries naming groups that are not in `groups` are ignored.
pub fn validate_selection(selection: &Selection, groups: &[ResolvedGroup]) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut breakdown: Vec<CategoryBreakdown> = Vec::new();

    for group in groups {
        let selected = selection.selected(&group.category_id, &group.id);

        check_group(group, selected, &mut errors, &mut warnings);
        let group_breakdown = cost_group(group, selected, &mut warnings);

        let category = match breakdown
            .iter_mut()
            .position(|c| c.category_id == group.category_id)
        {
            Some(pos) => &mut breakdown[pos],
            None => {
                breakdown.push(CategoryBreakdown {
                    category_id: group.category_id.clone(),
                    category_name: group.category_name.clone(),
                    groups: Vec::new(),
                    subtotal: 0.0,
                });
                let last = breakdown.len() - 1;
                &mut breakdown[last]
            }
        };
        category.subtotal += group_breakdown.subtotal;
        category.groups.push(group_breakdown);
    }

    let total_cost = breakdown.iter().fold(0.0, |acc, c| acc + c.subtotal);
    debug!(
        groups = groups.len(),
        errors = errors.len(),
        warnings = warnings.len(),
        total_cost,
        "validated selection"
    );

    ValidationOutcome {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        total_cost,
        breakdown,
    }
}

fn check_group(
    group: &ResolvedGroup,
    selected: &[EntityId],
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<String>,
) {
    match group.group_type {
        GroupType::Required => {
            if selected.len() != group.items.len() {
                errors.push(ValidationError {
                    kind: ErrorKind::Required,
                    group_id: Some(group.id.clone()),
                    message: format!(
                        "Group '{}' requires all {} assemblies to be selected ({} selected)",
                        group.name,
                        group.items.len(),
                        selected.len()
                    ),
                    details: Some(ErrorDetails::Count {
                        expected: group.items.len(),
                        selected: selected.len(),
                    }),
                });
            } else if distinct_members(group, selected) != group.items.len() {
                // Count matches, the set does not. Kept as a pass.
                warnings.push(format!(
                    "Group '{}' has the required number of selections but not every assembly in it",
                    group.name
                ));
            }
        }
        GroupType::ChooseOne => {
            if selected.len() != 1 {
                errors.push(ValidationError {
                    kind: ErrorKind::ChooseOne,
                    group_id: Some(group.id.clone()),
                    message: format!(
                        "Group '{}' requires exactly one assembly to be selected ({} selected)",
                        group.name,
                        selected.len()
                    ),
                    details: Some(ErrorDetails::Count {
                        expected: 1,
                        selected: selected.len(),
                    }),
                });
            }
        }
        GroupType::Optional => {}
        GroupType::Conflict => {
            let mut seen = HashSet::new();
            for id in selected {
                if !seen.insert(id) {
                    continue;
                }
                let Some(item) = group.item(id) else {
                    continue;
                };

                let mut conflicting: Vec<&EntityId> = Vec::new();
                for other in selected {
                    if other != id
                        && item.conflicts_with.contains(other)
                        && !conflicting.contains(&other)
                    {
                        conflicting.push(other);
                    }
                }
                if conflicting.is_empty() {
                    continue;
                }

                let names: Vec<String> =
                    conflicting.iter().map(|c| group.display_name(c)).collect();
                errors.push(ValidationError {
                    kind: ErrorKind::Conflict,
                    group_id: Some(group.id.clone()),
                    message: format!(
                        "'{}' cannot be selected together with {} in group '{}'",
                        item.assembly_name,
                        names
                            .iter()
                            .map(|n| format!("'{}'", n))
                            .collect::<Vec<_>>()
                            .join(", "),
                        group.name
                    ),
                    details: Some(ErrorDetails::Conflict {
                        assembly_id: id.clone(),
                        conflicts_with: conflicting.into_iter().cloned().collect(),
                    }),
                });
            }
        }
    }
}

fn distinct_members(group: &ResolvedGroup, selected: &[EntityId]) -> usize {
    selected
        .iter()
        .filter(|id| group.item(id).is_some())
        .collect::<HashSet<_>>()
        .len()
}

fn cost_group(
    group: &ResolvedGroup,
    selected: &[EntityId],
    warnings: &mut Vec<String>,
) -> GroupBreakdown {
    let mut assemblies = Vec::new();
    for id in selected {
        match group.item(id) {
            Some(item) => assemblies.push(SelectedAssembly {
                assembly_id: id.clone(),
                name: item.assembly_name.clone(),
                quantity: item.quantity,
                unit_cost: item.unit_cost,
                cost: item.cost(),
            }),
            None => warnings.push(format!(
                "Assembly {} is not part of group '{}' and was not costed",
                id, group.name
            )),
        }
    }

    GroupBreakdown {
        group_id: group.id.clone(),
        group_name: group.name.clone(),
        group_type: group.group_type,
        subtotal: assemblies.iter().fold(0.0, |acc, a| acc + a.cost),
        assemblies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::selection::model::ResolvedItem;

    fn item(name: &str, unit_cost: f64, quantity: f64) -> ResolvedItem {
        ResolvedItem {
            assembly_id: EntityId::new(EntityPrefix::Asm),
            assembly_name: name.to_string(),
            quantity,
            conflicts_with: Vec::new(),
            is_default: false,
            unit_cost,
            sort_order: 0,
        }
    }

    fn group(kind: GroupType, category: &EntityId, items: Vec<ResolvedItem>) -> ResolvedGroup {
        ResolvedGroup {
            id: EntityId::new(EntityPrefix::Grp),
            name: format!("{} group", kind),
            category_id: category.clone(),
            category_name: "Sanitary & Plumbing".to_string(),
            group_type: kind,
            sort_order: 0,
            items,
        }
    }

    fn select(group: &ResolvedGroup, ids: &[&EntityId]) -> Selection {
        let mut selection = Selection::new();
        selection.set(
            &group.category_id,
            &group.id,
            ids.iter().map(|id| (*id).clone()).collect(),
        );
        selection
    }

    fn cat() -> EntityId {
        EntityId::new(EntityPrefix::Cat)
    }

    #[test]
    fn test_choose_one_cost_example() {
        // A: one material at 100 × 2, item qty 1. B: 50 × 1, item qty 3.
        let g = group(
            GroupType::ChooseOne,
            &cat(),
            vec![item("A", 200.0, 1.0), item("B", 50.0, 3.0)],
        );
        let a = g.items[0].assembly_id.clone();
        let b = g.items[1].assembly_id.clone();

        let only_a = validate_selection(&select(&g, &[&a]), std::slice::from_ref(&g));
        assert!(only_a.is_valid);
        assert_eq!(only_a.total_cost, 200.0);

        let both = validate_selection(&select(&g, &[&a, &b]), std::slice::from_ref(&g));
        assert!(!both.is_valid);
        assert_eq!(both.errors.len(), 1);
        assert_eq!(both.errors[0].kind, ErrorKind::ChooseOne);
        assert_eq!(both.total_cost, 350.0);
    }

    #[test]
    fn test_choose_one_requires_a_selection() {
        let g = group(GroupType::ChooseOne, &cat(), vec![item("A", 1.0, 1.0)]);
        let outcome = validate_selection(&Selection::new(), std::slice::from_ref(&g));
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors[0].group_id.as_ref(), Some(&g.id));
        assert_eq!(
            outcome.errors[0].details,
            Some(ErrorDetails::Count {
                expected: 1,
                selected: 0
            })
        );
    }

    #[test]
    fn test_required_count_only() {
        let g = group(
            GroupType::Required,
            &cat(),
            vec![item("A", 1.0, 1.0), item("B", 1.0, 1.0), item("C", 1.0, 1.0)],
        );
        let ids: Vec<EntityId> = g.items.iter().map(|i| i.assembly_id.clone()).collect();
        let groups = std::slice::from_ref(&g);

        let missing_one = validate_selection(&select(&g, &[&ids[0], &ids[1]]), groups);
        assert_eq!(missing_one.errors.len(), 1);
        assert_eq!(missing_one.errors[0].kind, ErrorKind::Required);
        assert!(missing_one.errors[0].message.contains("all 3"));

        // N-1 correct plus a duplicate still passes the count check.
        let duplicate = validate_selection(&select(&g, &[&ids[0], &ids[1], &ids[1]]), groups);
        assert!(duplicate.is_valid);
        assert_eq!(duplicate.warnings.len(), 1);

        let foreign = EntityId::new(EntityPrefix::Asm);
        let with_foreign = validate_selection(&select(&g, &[&ids[0], &ids[1], &foreign]), groups);
        assert!(with_foreign.is_valid);
        assert_eq!(with_foreign.total_cost, 2.0);
        assert_eq!(with_foreign.warnings.len(), 2);

        let all = validate_selection(&select(&g, &[&ids[2], &ids[0], &ids[1]]), groups);
        assert!(all.is_valid);
        assert!(all.warnings.is_empty());
    }

    #[test]
    fn test_conflict_pairs() {
        let mut a = item("Bathtub", 900.0, 1.0);
        let b = item("Walk-in shower", 700.0, 1.0);
        let c = item("Towel rail", 50.0, 2.0);
        a.conflicts_with.push(b.assembly_id.clone());
        let (a_id, b_id, c_id) = (
            a.assembly_id.clone(),
            b.assembly_id.clone(),
            c.assembly_id.clone(),
        );
        let g = group(GroupType::Conflict, &cat(), vec![a, b, c]);
        let groups = std::slice::from_ref(&g);

        let clash = validate_selection(&select(&g, &[&a_id, &b_id, &c_id]), groups);
        assert!(!clash.is_valid);
        let conflicts: Vec<_> = clash.errors_of(ErrorKind::Conflict).collect();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("Walk-in shower"));
        assert_eq!(clash.total_cost, 1700.0);

        assert!(validate_selection(&select(&g, &[&a_id, &c_id]), groups).is_valid);
        assert!(validate_selection(&select(&g, &[&b_id]), groups).is_valid);
    }

    #[test]
    fn test_mutual_conflict_reports_each_item() {
        let mut a = item("Gas hob", 300.0, 1.0);
        let mut b = item("Induction hob", 400.0, 1.0);
        a.conflicts_with.push(b.assembly_id.clone());
        b.conflicts_with.push(a.assembly_id.clone());
        let (a_id, b_id) = (a.assembly_id.clone(), b.assembly_id.clone());
        let g = group(GroupType::Conflict, &cat(), vec![a, b]);

        let outcome = validate_selection(&select(&g, &[&a_id, &b_id]), std::slice::from_ref(&g));
        assert_eq!(outcome.errors_of(ErrorKind::Conflict).count(), 2);
    }

    #[test]
    fn test_optional_always_passes() {
        let g = group(
            GroupType::Optional,
            &cat(),
            vec![item("A", 10.0, 1.0), item("B", 20.0, 2.0)],
        );
        let ids: Vec<&EntityId> = g.items.iter().map(|i| &i.assembly_id).collect();
        let groups = std::slice::from_ref(&g);

        assert!(validate_selection(&Selection::new(), groups).is_valid);
        let all = validate_selection(&select(&g, &ids), groups);
        assert!(all.is_valid);
        assert_eq!(all.total_cost, 50.0);
    }

    #[test]
    fn test_unknown_groups_ignored_and_breakdown_by_category() {
        let plumbing = cat();
        let finishes = cat();
        let g1 = group(GroupType::ChooseOne, &plumbing, vec![item("Basin", 120.0, 1.0)]);
        let g2 = group(GroupType::Optional, &finishes, vec![item("Tiles", 30.0, 10.0)]);
        let g3 = group(GroupType::Optional, &plumbing, vec![item("Trap", 5.0, 2.0)]);

        let mut selection = Selection::new();
        selection.set(&plumbing, &g1.id, vec![g1.items[0].assembly_id.clone()]);
        selection.set(&finishes, &g2.id, vec![g2.items[0].assembly_id.clone()]);
        selection.set(&plumbing, &g3.id, vec![g3.items[0].assembly_id.clone()]);
        selection.set(
            &plumbing,
            &EntityId::new(EntityPrefix::Grp),
            vec![EntityId::new(EntityPrefix::Asm)],
        );

        let outcome = validate_selection(&selection, &[g1.clone(), g2.clone(), g3.clone()]);
        assert!(outcome.is_valid);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.total_cost, 430.0);

        assert_eq!(outcome.breakdown.len(), 2);
        assert_eq!(outcome.breakdown[0].category_id, plumbing);
        assert_eq!(outcome.breakdown[0].groups.len(), 2);
        assert_eq!(outcome.breakdown[0].subtotal, 130.0);
        assert_eq!(outcome.breakdown[1].subtotal, 300.0);
    }

    #[test]
    fn test_selection_under_wrong_category_is_not_seen() {
        let g = group(GroupType::ChooseOne, &cat(), vec![item("A", 1.0, 1.0)]);
        let mut selection = Selection::new();
        selection.set(&cat(), &g.id, vec![g.items[0].assembly_id.clone()]);

        let outcome = validate_selection(&selection, std::slice::from_ref(&g));
        assert_eq!(outcome.errors[0].kind, ErrorKind::ChooseOne);
    }

    #[test]
    fn test_outcome_json_shape() {
        let g = group(GroupType::ChooseOne, &cat(), vec![item("A", 200.0, 1.0)]);
        let a = g.items[0].assembly_id.clone();
        let outcome = validate_selection(&select(&g, &[&a]), std::slice::from_ref(&g));
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["isValid"], true);
        assert_eq!(value["totalCost"], 200.0);
        assert_eq!(value["breakdown"][0]["groups"][0]["assemblies"][0]["cost"], 200.0);
        assert_eq!(outcome.selected_lines(), vec![(a, 1.0)]);
    }
}
