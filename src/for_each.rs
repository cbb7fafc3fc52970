//! Reconciliation of repeated blocks.
//!
//! A `ForEach` element's children are matched against the new component list in six phases:
//!
//! 1. children at the front are updated in order while they match
//! 2. matching children at the back are identified, without updating them yet
//! 3. the remaining old children are collected by key; unkeyed ones are torn down
//! 4. the remaining new components are resolved against the collected children by key, reusing
//!    the child when it can be updated and inflating a new one otherwise
//! 5. collected children that were not reused are torn down
//! 6. the children identified in phase 2 are updated in order
//!
//! Render slots are handed out left to right through all phases, with a running render node
//! count as the base for each next child.

use crate::component::{Component, ComposeId};
use crate::element::ElementId;
use crate::tree::ElementTree;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Hands out slots and render slots to the children placed so far.
struct Placement {
    parent: ElementId,
    base: usize,
    slot: usize,
    count: usize,
    children: Vec<ElementId>,
}

impl Placement {
    fn place(
        &mut self,
        tree: &mut ElementTree,
        child: Option<ElementId>,
        component: &Arc<Component>,
    ) {
        let render_slot = self.base + self.count;
        if let Some(child) =
            tree.update_child_with_slot(self.parent, child, Some(component), self.slot, render_slot)
        {
            self.slot += 1;
            self.count += tree.count_render_node(child);
            self.children.push(child);
        }
    }
}

fn can_update(tree: &ElementTree, child: ElementId, component: &Component) -> bool {
    tree.element(child)
        .map_or(false, |element| element.can_update(component))
}

pub(crate) fn update_children(
    tree: &mut ElementTree,
    id: ElementId,
    components: &[Arc<Component>],
) {
    let old = tree.children(id).to_vec();
    let mut placement = Placement {
        parent: id,
        base: tree.child_render_base(id),
        slot: 0,
        count: 0,
        children: Vec::with_capacity(components.len()),
    };

    let mut old_start = 0;
    let mut old_end = old.len();
    let mut new_start = 0;
    let mut new_end = components.len();

    // 1. prefix
    while old_start < old_end
        && new_start < new_end
        && can_update(tree, old[old_start], &components[new_start])
    {
        placement.place(tree, Some(old[old_start]), &components[new_start]);
        old_start += 1;
        new_start += 1;
    }

    // 2. suffix
    while old_start < old_end
        && new_start < new_end
        && can_update(tree, old[old_end - 1], &components[new_end - 1])
    {
        old_end -= 1;
        new_end -= 1;
    }

    // 3. collect the middle
    let mut keyed: HashMap<ComposeId, ElementId> = HashMap::new();
    let mut collected = Vec::new();
    for &child in &old[old_start..old_end] {
        let key = tree.element(child).and_then(|element| element.key()).cloned();
        match key {
            Some(key) => {
                if keyed.contains_key(&key) {
                    warn!("duplicate key {} in repeated block {:?}; dropping {:?}", key, id, child);
                    tree.update_child_with_slot(id, Some(child), None, 0, 0);
                } else {
                    keyed.insert(key.clone(), child);
                    collected.push((key, child));
                }
            }
            None => {
                tree.update_child_with_slot(id, Some(child), None, 0, 0);
            }
        }
    }

    // 4. resolve the middle
    for component in &components[new_start..new_end] {
        let reused = component.key().and_then(|key| keyed.remove(key));
        if let Some(child) = reused {
            trace!("reusing {:?} for key {:?}", child, component.key());
        }
        // a keyed child that cannot be updated is replaced
        placement.place(tree, reused, component);
    }

    // 5. drop what was not reused
    for (key, child) in collected {
        if keyed.get(&key) == Some(&child) {
            tree.update_child_with_slot(id, Some(child), None, 0, 0);
        }
    }

    // 6. apply the suffix
    for (child, component) in old[old_end..].iter().zip(&components[new_end..]) {
        placement.place(tree, Some(*child), component);
    }

    tree.set_children(id, placement.children, placement.count);
}

#[cfg(test)]
mod tests {
    use crate::component::Component;
    use crate::element::ElementId;
    use crate::tree::tests::{assert_render_order, text, tree};
    use crate::tree::ElementTree;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn keyed(key: u64) -> Arc<Component> {
        Arc::new(Component::composed(key, text(&format!("item {}", key))))
    }

    fn mount_list(tree: &mut ElementTree, children: Vec<Arc<Component>>) -> ElementId {
        tree.mount(Arc::new(Component::for_each("list", children)))
            .unwrap()
    }

    fn keys_to_ids(tree: &ElementTree, list: ElementId) -> HashMap<String, ElementId> {
        tree.children(list)
            .iter()
            .map(|child| {
                let key = tree.element(*child).unwrap().key().unwrap().to_string();
                (key, *child)
            })
            .collect()
    }

    fn slots(tree: &ElementTree, list: ElementId) -> Vec<usize> {
        tree.children(list)
            .iter()
            .map(|child| tree.element(*child).unwrap().slot())
            .collect()
    }

    #[test]
    fn reorder_reuses_keyed_children() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![keyed(1), keyed(2), keyed(3)]);
        let before = tree.children(list).to_vec();
        let (a, b, c) = (before[0], before[1], before[2]);
        let len = tree.len();

        tree.update_children(list, &[keyed(1), keyed(3), keyed(2)]);

        assert_eq!(tree.children(list), &[a, c, b][..]);
        assert_eq!(slots(&tree, list), vec![0, 1, 2]);
        assert_eq!(tree.len(), len, "nothing was rebuilt");
        assert_render_order(&tree);
    }

    #[test]
    fn append_unkeyed() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![text("a"), text("b")]);
        let before = tree.children(list).to_vec();

        tree.update_children(list, &[text("a"), text("b"), text("c")]);

        let after = tree.children(list);
        assert_eq!(&after[..2], &before[..]);
        assert_eq!(tree.element(after[2]).unwrap().slot(), 2);
        assert_eq!(tree.element(after[2]).unwrap().render_slot(), 2);
        assert_eq!(tree.count_render_node(list), 3);
        assert_render_order(&tree);
    }

    #[test]
    fn removal_tears_down_keyed_child() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![keyed(9)]);
        let x = tree.children(list)[0];
        let node = tree.render_nodes(x)[0];

        tree.update_children(list, &[]);

        assert!(tree.children(list).is_empty());
        assert!(!tree.contains(x));
        assert!(!tree.render_tree().contains(node));
        assert_eq!(tree.count_render_node(list), 0);
        assert_render_order(&tree);
    }

    #[test]
    fn unkeyed_middle_children_are_rebuilt() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![keyed(1), text("x"), keyed(2)]);
        let old_x = tree.children(list)[1];

        tree.update_children(list, &[keyed(2), text("x"), keyed(1)]);

        let after = tree.children(list).to_vec();
        assert!(!tree.contains(old_x));
        assert_eq!(after.len(), 3);
        assert_render_order(&tree);
    }

    #[test]
    fn duplicate_keys_keep_the_first() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![text("head"), keyed(5), keyed(5), keyed(6)]);
        let first = tree.children(list)[1];
        let second = tree.children(list)[2];

        tree.update_children(list, &[keyed(6), keyed(5)]);

        assert_eq!(tree.children(list)[1], first);
        assert!(!tree.contains(second));
        assert_eq!(tree.count_render_node(list), 2);
        assert_render_order(&tree);
    }

    #[test]
    fn keyed_match_of_another_kind_is_replaced() {
        let mut tree = tree();
        let list = mount_list(&mut tree, vec![text("head"), keyed(1)]);
        let old = tree.children(list)[1];

        let replacement = Arc::new(Component::multi_composed(1u64, vec![text("a"), text("b")]));
        tree.update_children(list, &[replacement]);

        let after = tree.children(list).to_vec();
        assert_eq!(after.len(), 1);
        assert_ne!(after[0], old);
        assert!(!tree.contains(old));
        assert_eq!(tree.count_render_node(list), 2);
        assert_render_order(&tree);
    }

    #[test]
    fn nested_list_keeps_sibling_render_order() {
        let mut tree = tree();
        let column = Arc::new(
            Component::flex(crate::render_object::FlexSpec::column()).with_children(vec![
                text("before"),
                Arc::new(Component::for_each("list", vec![keyed(1), keyed(2)])),
                text("after"),
            ]),
        );
        let column = tree.mount(column).unwrap();
        let list = tree.children(column)[1];
        let after = tree.children(column)[2];

        tree.update_children(list, &[keyed(3), keyed(2), keyed(1), keyed(4)]);

        assert_eq!(tree.element(list).unwrap().render_slot(), 1);
        assert_eq!(tree.element(after).unwrap().render_slot(), 5);
        assert_render_order(&tree);
    }

    fn unique_keys() -> impl Strategy<Value = Vec<u64>> {
        proptest::collection::hash_set(0u64..24, 0..12).prop_flat_map(|keys| {
            let keys: Vec<u64> = keys.into_iter().collect();
            Just(keys).prop_shuffle()
        })
    }

    /// Mixes children with zero, one and two render nodes.
    fn keyed_mixed(key: u64) -> Arc<Component> {
        match key % 3 {
            0 => Arc::new(Component::composed(key, Component::empty())),
            1 => keyed(key),
            _ => Arc::new(Component::multi_composed(key, vec![text("a"), text("b")])),
        }
    }

    proptest! {
        #[test]
        fn keyed_children_are_reused_or_destroyed(old in unique_keys(), new in unique_keys()) {
            let mut tree = tree();
            let list = mount_list(&mut tree, old.iter().map(|k| keyed_mixed(*k)).collect());
            let before = keys_to_ids(&tree, list);

            let components: Vec<_> = new.iter().map(|k| keyed_mixed(*k)).collect();
            tree.update_children(list, &components);
            let after = keys_to_ids(&tree, list);

            for (key, id) in &before {
                match after.get(key) {
                    Some(new_id) => prop_assert_eq!(new_id, id, "key {} was rebuilt", key),
                    None => prop_assert!(!tree.contains(*id), "key {} survived", key),
                }
            }
            let order: Vec<String> = tree.children(list)
                .iter()
                .map(|child| tree.element(*child).unwrap().key().unwrap().to_string())
                .collect();
            let expected: Vec<String> = new.iter().map(|k| k.to_string()).collect();
            prop_assert_eq!(order, expected);
            prop_assert_eq!(slots(&tree, list), (0..new.len()).collect::<Vec<_>>());
            assert_render_order(&tree);
        }

        #[test]
        fn render_count_matches_children(old in unique_keys(), new in unique_keys()) {
            let mut tree = tree();
            let list = mount_list(&mut tree, old.iter().map(|k| keyed_mixed(*k)).collect());
            let components: Vec<_> = new.iter().map(|k| keyed_mixed(*k)).collect();
            tree.update_children(list, &components);

            let sum: usize = tree.children(list)
                .iter()
                .map(|child| tree.count_render_node(*child))
                .sum();
            prop_assert_eq!(tree.count_render_node(list), sum);
            prop_assert_eq!(tree.render_nodes(list).len(), sum);
        }

        #[test]
        fn same_components_twice_is_idempotent(old in unique_keys(), new in unique_keys()) {
            let mut tree = tree();
            let list = mount_list(&mut tree, old.iter().map(|k| keyed_mixed(*k)).collect());
            let components: Vec<_> = new.iter().map(|k| keyed_mixed(*k)).collect();

            tree.update_children(list, &components);
            let children = tree.children(list).to_vec();
            let slots_before = slots(&tree, list);
            let len = tree.len();

            tree.update_children(list, &components);
            prop_assert_eq!(tree.children(list), &children[..]);
            prop_assert_eq!(slots(&tree, list), slots_before);
            prop_assert_eq!(tree.len(), len);
        }
    }
}
