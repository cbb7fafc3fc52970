//! Reconciliation of composite elements whose child count is expected to stay the same.

use crate::component::{Component, UpdateType};
use crate::element::ElementId;
use crate::tree::ElementTree;
use std::cmp;
use std::sync::Arc;
use tracing::warn;

/// Matches children to components by position.
///
/// A first build inflates everything. Afterwards the counts have to agree unless the owning
/// component asks for a rebuild; on a mismatch the update is skipped and the children are left as
/// they were.
pub(crate) fn update_children(
    tree: &mut ElementTree,
    id: ElementId,
    components: &[Arc<Component>],
) {
    let old = tree.children(id).to_vec();
    let base = tree.child_render_base(id);

    if !old.is_empty()
        && old.len() != components.len()
        && tree.update_type(id) != UpdateType::Rebuild
    {
        warn!(
            "children of {:?} changed from {} to {} without a rebuild; skipping update",
            id,
            old.len(),
            components.len()
        );
        return;
    }

    let mut children = Vec::with_capacity(components.len());
    let mut count = 0;
    for i in 0..cmp::max(old.len(), components.len()) {
        let child = old.get(i).copied();
        let component = components.get(i);
        let slot = children.len();
        if let Some(child) = tree.update_child_with_slot(id, child, component, slot, base + count) {
            count += tree.count_render_node(child);
            children.push(child);
        }
    }

    tree.set_children(id, children, count);
}
