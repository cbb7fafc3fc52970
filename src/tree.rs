use crate::component::{Component, ComponentKind, UpdateType};
use crate::element::{Element, ElementId, ElementKind};
use crate::layout::LayoutParam;
use crate::render::{RenderId, RenderTree};
use crate::{for_each, multi_composed};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// A tree of elements and the render tree they maintain.
///
/// Elements own their children. Each element's render nodes are kept in order among the children
/// of its render parent, starting at its `render_slot`; reconciling a child list places render
/// nodes left to right, so everything before the current render slot is already in its final
/// position.
#[derive(Debug)]
pub struct ElementTree {
    elements: HashMap<ElementId, Element>,
    render: RenderTree,
    root: ElementId,
}

impl ElementTree {
    pub fn new(root_param: LayoutParam) -> ElementTree {
        let render = RenderTree::new(root_param);
        let root = ElementId::new();
        let root_node = render.root();

        let mut elements = HashMap::new();
        elements.insert(
            root,
            Element {
                kind: ElementKind::Root,
                component: None,
                parent: None,
                children: Vec::new(),
                slot: 0,
                render_slot: 0,
                render_node: Some(root_node),
                render_parent: root_node,
                count_render_node: 1,
            },
        );

        ElementTree {
            elements,
            render,
            root,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Number of live elements, including the root.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements.get(&id).map_or(&[], |element| &element.children)
    }

    pub fn count_render_node(&self, id: ElementId) -> usize {
        self.elements
            .get(&id)
            .map_or(0, |element| element.count_render_node)
    }

    pub fn render_tree(&self) -> &RenderTree {
        &self.render
    }

    pub fn render_tree_mut(&mut self) -> &mut RenderTree {
        &mut self.render
    }

    /// Collects the render nodes an element contributes to its render parent, in order.
    pub fn render_nodes(&self, id: ElementId) -> Vec<RenderId> {
        let mut nodes = Vec::new();
        self.collect_render_nodes(id, &mut nodes);
        nodes
    }

    fn collect_render_nodes(&self, id: ElementId, nodes: &mut Vec<RenderId>) {
        if let Some(element) = self.elements.get(&id) {
            match element.render_node {
                Some(node) => nodes.push(node),
                None => {
                    for child in &element.children {
                        self.collect_render_nodes(*child, nodes);
                    }
                }
            }
        }
    }

    /// Replaces the root's content with `component`, reusing the current content where possible.
    ///
    /// Returns the element built for it.
    pub fn mount(&mut self, component: Arc<Component>) -> Option<ElementId> {
        let root = self.root;
        self.update_children(root, &[component]);
        self.children(root).first().copied()
    }

    /// Reconciles the children of an element against a new component list.
    ///
    /// Uses the diff appropriate for the element's kind, then re-slots the render nodes of the
    /// element's later siblings in case its render node count changed.
    pub fn update_children(&mut self, id: ElementId, components: &[Arc<Component>]) {
        let (kind, count_before) = match self.elements.get(&id) {
            Some(element) => (element.kind, element.count_render_node),
            None => {
                warn!("update_children: no such element {:?}", id);
                return;
            }
        };
        self.update_children_by_kind(id, kind, components);
        if self.count_render_node(id) != count_before {
            self.refresh_render_slots(id);
        }
    }

    fn update_children_by_kind(
        &mut self,
        id: ElementId,
        kind: ElementKind,
        components: &[Arc<Component>],
    ) {
        match kind {
            ElementKind::ForEach => for_each::update_children(self, id, components),
            ElementKind::MultiComposed => multi_composed::update_children(self, id, components),
            ElementKind::Composed if components.len() > 1 => {
                warn!(
                    "composed element {:?} given {} children; only the first is used",
                    id,
                    components.len()
                );
                self.update_children_in_order(id, &components[..1]);
            }
            ElementKind::Empty => self.update_children_in_order(id, &[]),
            ElementKind::Root | ElementKind::Render(_) | ElementKind::Composed => {
                self.update_children_in_order(id, components)
            }
        }
    }

    /// Rebuilds an element's children from its own component.
    fn perform_build(&mut self, id: ElementId) {
        let (kind, components) = match self.elements.get(&id) {
            Some(element) => (
                element.kind,
                element
                    .component
                    .as_ref()
                    .map(|component| component.children().to_vec())
                    .unwrap_or_default(),
            ),
            None => return,
        };
        self.update_children_by_kind(id, kind, &components);
    }

    /// Matches children to components by position.
    fn update_children_in_order(
        &mut self,
        id: ElementId,
        components: &[Arc<Component>],
    ) {
        let old = self.children(id).to_vec();
        let base = self.child_render_base(id);
        let mut children = Vec::with_capacity(components.len());
        let mut count = 0;

        for (slot, component) in components.iter().enumerate() {
            let child = old.get(slot).copied();
            if let Some(child) =
                self.update_child_with_slot(id, child, Some(component), slot, base + count)
            {
                count += self.count_render_node(child);
                children.push(child);
            }
        }
        for child in old.iter().skip(components.len()) {
            self.update_child_with_slot(id, Some(*child), None, 0, 0);
        }

        self.set_children(id, children, count);
    }

    /// Reconciles one child.
    ///
    /// - no component: the child is torn down
    /// - no child: the component is inflated into a new element
    /// - an updatable child: the child is moved to the given slots and rebuilt if the component
    ///   changed
    /// - otherwise the child is replaced
    ///
    /// Returns the resulting child, if any.
    pub(crate) fn update_child_with_slot(
        &mut self,
        parent: ElementId,
        child: Option<ElementId>,
        component: Option<&Arc<Component>>,
        slot: usize,
        render_slot: usize,
    ) -> Option<ElementId> {
        let component = match component {
            Some(component) => component,
            None => {
                if let Some(child) = child {
                    self.deactivate(child);
                }
                return None;
            }
        };

        let child = match child {
            Some(child) => child,
            None => return self.inflate(parent, component, slot, render_slot),
        };

        let (can_update, unchanged) = match self.elements.get(&child) {
            Some(element) => (
                element.can_update(component),
                element
                    .component
                    .as_ref()
                    .map_or(false, |current| Arc::ptr_eq(current, component)),
            ),
            None => {
                warn!("update_child_with_slot: no such element {:?}", child);
                return self.inflate(parent, component, slot, render_slot);
            }
        };

        if !can_update {
            self.deactivate(child);
            return self.inflate(parent, component, slot, render_slot);
        }

        if let Some(element) = self.elements.get_mut(&child) {
            element.slot = slot;
        }
        if unchanged {
            self.change_render_slot(child, render_slot);
            return Some(child);
        }

        let render_node = match self.elements.get_mut(&child) {
            Some(element) => {
                element.component = Some(Arc::clone(component));
                element.render_slot = render_slot;
                element.render_node
            }
            None => None,
        };
        if let Some(node) = render_node {
            if let ComponentKind::Render(spec) = component.kind() {
                // failures are logged by the render tree and leave the node as it was
                let _ = self.render.update(node, spec);
            }
            self.render.move_position(node, render_slot);
        }
        self.perform_build(child);
        Some(child)
    }

    /// Creates an element (and its render node, if any) for a component and builds its children.
    fn inflate(
        &mut self,
        parent: ElementId,
        component: &Arc<Component>,
        slot: usize,
        render_slot: usize,
    ) -> Option<ElementId> {
        let render_parent = match self.elements.get(&parent) {
            Some(element) => element.render_node.unwrap_or(element.render_parent),
            None => {
                warn!("inflate: no such parent element {:?}", parent);
                return None;
            }
        };

        let kind = ElementKind::from(component.tag());
        let render_node = match component.kind() {
            ComponentKind::Render(spec) => {
                let node = self.render.create(spec);
                self.render.add_child(render_parent, node, render_slot);
                Some(node)
            }
            _ => None,
        };

        let id = ElementId::new();
        trace!("inflating {:?} as {:?} at slot {}", kind, id, slot);
        self.elements.insert(
            id,
            Element {
                kind,
                component: Some(Arc::clone(component)),
                parent: Some(parent),
                children: Vec::new(),
                slot,
                render_slot,
                render_node,
                render_parent,
                count_render_node: if render_node.is_some() { 1 } else { 0 },
            },
        );

        self.perform_build(id);
        Some(id)
    }

    /// Tears down an element and its subtree, detaching and disposing its render nodes.
    ///
    /// The parent's child list is left to the caller.
    fn deactivate(&mut self, id: ElementId) {
        let element = match self.elements.remove(&id) {
            Some(element) => element,
            None => {
                warn!("deactivate: no such element {:?}", id);
                return;
            }
        };
        trace!("deactivating {:?}", id);

        match element.render_node {
            Some(node) => {
                if let Some(parent) = self.render.parent(node) {
                    self.render.remove_child(parent, node);
                }
                self.render.dispose(node);
                // the render subtree is gone; the elements only need forgetting
                let mut stack = element.children;
                while let Some(id) = stack.pop() {
                    if let Some(element) = self.elements.remove(&id) {
                        stack.extend(element.children);
                    }
                }
            }
            None => {
                for child in element.children {
                    self.deactivate(child);
                }
            }
        }
    }

    /// Moves an element's render nodes to start at `render_slot`.
    fn change_render_slot(&mut self, id: ElementId, render_slot: usize) {
        let (render_node, children) = match self.elements.get_mut(&id) {
            Some(element) => {
                element.render_slot = render_slot;
                match element.render_node {
                    Some(node) => (Some(node), Vec::new()),
                    None => (None, element.children.clone()),
                }
            }
            None => return,
        };

        match render_node {
            Some(node) => self.render.move_position(node, render_slot),
            None => {
                let mut slot = render_slot;
                for child in children {
                    self.change_render_slot(child, slot);
                    slot += self.count_render_node(child);
                }
            }
        }
    }

    /// Render slot of an element's first child: 0 below an element with its own render node,
    /// otherwise the element's own render slot.
    pub(crate) fn child_render_base(&self, id: ElementId) -> usize {
        match self.elements.get(&id) {
            Some(element) if element.render_node.is_some() => 0,
            Some(element) => element.render_slot,
            None => 0,
        }
    }

    pub(crate) fn update_type(&self, id: ElementId) -> UpdateType {
        self.elements
            .get(&id)
            .and_then(|element| element.component.as_ref())
            .map_or_else(UpdateType::default, |component| component.update_type())
    }

    /// Stores the result of a reconciliation pass.
    pub(crate) fn set_children(&mut self, id: ElementId, children: Vec<ElementId>, count: usize) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.children = children;
            if !element.kind.owns_render_node() {
                element.count_render_node = count;
            }
        }
    }

    /// After an element's render node count changed, re-slots its later siblings and updates the
    /// counts of its composite ancestors, up to the nearest element that owns a render node.
    fn refresh_render_slots(&mut self, id: ElementId) {
        let mut current = id;
        while let Some(parent) = self.elements.get(&current).and_then(|element| element.parent) {
            let base = self.child_render_base(parent);
            let mut count = 0;
            for child in self.children(parent).to_vec() {
                self.change_render_slot(child, base + count);
                count += self.count_render_node(child);
            }

            match self.elements.get_mut(&parent) {
                Some(element) if !element.kind.owns_render_node() => {
                    element.count_render_node = count;
                }
                _ => break,
            }
            current = parent;
        }
    }
}
