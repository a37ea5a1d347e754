//! Seeding and toggling selections the way an interactive selector does

use super::model::{GroupType, ResolvedGroup, Selection};
use crate::core::identity::EntityId;

/// Seed a selection from group defaults.
///
/// REQUIRED selects every item, CHOOSE_ONE the default-flagged item or else the
/// first one, OPTIONAL and CONFLICT the default-flagged items. Every group gets
/// an entry, possibly empty.
pub fn default_selection(groups: &[ResolvedGroup]) -> Selection {
    let mut selection = Selection::new();
    for group in groups {
        let mut items: Vec<_> = group.items.iter().collect();
        items.sort_by_key(|i| i.sort_order);

        let chosen: Vec<EntityId> = match group.group_type {
            GroupType::Required => items.iter().map(|i| i.assembly_id.clone()).collect(),
            GroupType::ChooseOne => items
                .iter()
                .find(|i| i.is_default)
                .or_else(|| items.first())
                .map(|i| vec![i.assembly_id.clone()])
                .unwrap_or_default(),
            GroupType::Optional | GroupType::Conflict => items
                .iter()
                .filter(|i| i.is_default)
                .map(|i| i.assembly_id.clone())
                .collect(),
        };
        selection.set(&group.category_id, &group.id, chosen);
    }
    selection
}

/// Toggle an assembly within a group. Returns false when nothing changed.
pub fn toggle(selection: &mut Selection, group: &ResolvedGroup, assembly_id: &EntityId) -> bool {
    if group.item(assembly_id).is_none() || group.group_type == GroupType::Required {
        return false;
    }

    let current = selection.group_mut(&group.category_id, &group.id);
    let was_selected = current.contains(assembly_id);

    match group.group_type {
        GroupType::Required => false,
        GroupType::ChooseOne => {
            if was_selected && current.len() == 1 {
                return false;
            }
            *current = vec![assembly_id.clone()];
            true
        }
        GroupType::Optional => {
            flip(current, assembly_id, was_selected);
            true
        }
        GroupType::Conflict => {
            flip(current, assembly_id, was_selected);
            if !was_selected {
                current.retain(|other| other == assembly_id || !in_conflict(group, assembly_id, other));
            }
            true
        }
    }
}

fn flip(current: &mut Vec<EntityId>, assembly_id: &EntityId, was_selected: bool) {
    if was_selected {
        current.retain(|id| id != assembly_id);
    } else {
        current.push(assembly_id.clone());
    }
}

/// Conflict in either direction
fn in_conflict(group: &ResolvedGroup, a: &EntityId, b: &EntityId) -> bool {
    let lists = |x: &EntityId, y: &EntityId| {
        group
            .item(x)
            .is_some_and(|i| i.conflicts_with.contains(y))
    };
    lists(a, b) || lists(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::selection::model::ResolvedItem;
    use crate::selection::validate_selection;

    fn group(kind: GroupType, items: &[(&str, bool, i32)]) -> ResolvedGroup {
        ResolvedGroup {
            id: EntityId::new(EntityPrefix::Grp),
            name: "Fixtures".to_string(),
            category_id: EntityId::new(EntityPrefix::Cat),
            category_name: "Sanitary".to_string(),
            group_type: kind,
            sort_order: 0,
            items: items
                .iter()
                .map(|(name, is_default, sort_order)| ResolvedItem {
                    assembly_id: EntityId::new(EntityPrefix::Asm),
                    assembly_name: name.to_string(),
                    quantity: 1.0,
                    conflicts_with: Vec::new(),
                    is_default: *is_default,
                    unit_cost: 10.0,
                    sort_order: *sort_order,
                })
                .collect(),
        }
    }

    #[test]
    fn test_defaults_per_group_type() {
        let required = group(GroupType::Required, &[("A", false, 0), ("B", false, 1)]);
        let choose_default = group(GroupType::ChooseOne, &[("A", false, 0), ("B", true, 1)]);
        let choose_first = group(GroupType::ChooseOne, &[("A", false, 5), ("B", false, 1)]);
        let optional = group(GroupType::Optional, &[("A", false, 0), ("B", true, 1)]);
        let conflict = group(GroupType::Conflict, &[("A", false, 0)]);
        let groups = vec![
            required.clone(),
            choose_default.clone(),
            choose_first.clone(),
            optional.clone(),
            conflict.clone(),
        ];

        let sel = default_selection(&groups);
        assert_eq!(sel.selected(&required.category_id, &required.id).len(), 2);
        assert_eq!(
            sel.selected(&choose_default.category_id, &choose_default.id),
            &[choose_default.items[1].assembly_id.clone()]
        );
        assert_eq!(
            sel.selected(&choose_first.category_id, &choose_first.id),
            &[choose_first.items[1].assembly_id.clone()]
        );
        assert_eq!(
            sel.selected(&optional.category_id, &optional.id),
            &[optional.items[1].assembly_id.clone()]
        );
        assert!(sel.selected(&conflict.category_id, &conflict.id).is_empty());
        assert_eq!(sel.group_ids().len(), 5);

        assert!(validate_selection(&sel, &groups).is_valid);
    }

    #[test]
    fn test_toggle_choose_one_replaces() {
        let g = group(GroupType::ChooseOne, &[("A", true, 0), ("B", false, 1)]);
        let (a, b) = (g.items[0].assembly_id.clone(), g.items[1].assembly_id.clone());
        let mut sel = default_selection(std::slice::from_ref(&g));

        assert!(!toggle(&mut sel, &g, &a));
        assert!(toggle(&mut sel, &g, &b));
        assert_eq!(sel.selected(&g.category_id, &g.id), &[b]);
    }

    #[test]
    fn test_toggle_required_is_fixed() {
        let g = group(GroupType::Required, &[("A", false, 0)]);
        let a = g.items[0].assembly_id.clone();
        let mut sel = default_selection(std::slice::from_ref(&g));
        assert!(!toggle(&mut sel, &g, &a));
        assert_eq!(sel.selected(&g.category_id, &g.id).len(), 1);

        // An untouched selection gains no empty entry
        let mut fresh = Selection::new();
        assert!(!toggle(&mut fresh, &g, &a));
        assert!(fresh.is_empty());
        assert_eq!(fresh, Selection::new());
    }

    #[test]
    fn test_toggle_conflict_deselects_either_direction() {
        let mut g = group(
            GroupType::Conflict,
            &[("Bath", false, 0), ("Shower", false, 1), ("Rail", false, 2)],
        );
        let (bath, shower, rail) = (
            g.items[0].assembly_id.clone(),
            g.items[1].assembly_id.clone(),
            g.items[2].assembly_id.clone(),
        );
        g.items[0].conflicts_with.push(shower.clone());
        let mut sel = Selection::new();

        assert!(toggle(&mut sel, &g, &shower));
        assert!(toggle(&mut sel, &g, &rail));
        assert!(toggle(&mut sel, &g, &bath));
        assert_eq!(sel.selected(&g.category_id, &g.id), &[rail.clone(), bath.clone()]);

        // Selecting shower drops bath, which lists it.
        assert!(toggle(&mut sel, &g, &shower));
        assert_eq!(sel.selected(&g.category_id, &g.id), &[rail, shower]);
    }

    #[test]
    fn test_toggle_unknown_assembly() {
        let g = group(GroupType::Optional, &[("A", false, 0)]);
        let mut sel = Selection::new();
        assert!(!toggle(&mut sel, &g, &EntityId::new(EntityPrefix::Asm)));
        assert!(sel.is_empty());
    }
}
