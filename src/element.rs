use crate::component::{Component, ComponentTag, ComposeId};
use crate::render::RenderId;
use crate::render_object::RenderKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static ELEMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies a live element. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn new() -> ElementId {
        ElementId(ELEMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Owns the root render node.
    Root,
    /// Owns one render node; its children attach below that node.
    Render(RenderKind),
    /// A single child, transparent for render slots.
    Composed,
    MultiComposed,
    ForEach,
    /// Produces no render nodes.
    Empty,
}

impl ElementKind {
    pub fn owns_render_node(self) -> bool {
        match self {
            ElementKind::Root | ElementKind::Render(_) => true,
            _ => false,
        }
    }
}

impl From<ComponentTag> for ElementKind {
    fn from(tag: ComponentTag) -> Self {
        match tag {
            ComponentTag::Render(kind) => ElementKind::Render(kind),
            ComponentTag::Composed => ElementKind::Composed,
            ComponentTag::MultiComposed => ElementKind::MultiComposed,
            ComponentTag::ForEach => ElementKind::ForEach,
            ComponentTag::Empty => ElementKind::Empty,
        }
    }
}

/// A live node in the element tree.
#[derive(Debug)]
pub struct Element {
    pub(crate) kind: ElementKind,
    /// The component this element was last built from.
    pub(crate) component: Option<Arc<Component>>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    /// Position among the parent's children.
    pub(crate) slot: usize,
    /// Position among the render parent's children, or the first such position for composites.
    pub(crate) render_slot: usize,
    pub(crate) render_node: Option<RenderId>,
    /// The render node that this element's render nodes are attached to.
    pub(crate) render_parent: RenderId,
    pub(crate) count_render_node: usize,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn component(&self) -> Option<&Arc<Component>> {
        self.component.as_ref()
    }

    pub fn key(&self) -> Option<&ComposeId> {
        self.component.as_ref().and_then(|component| component.key())
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn render_slot(&self) -> usize {
        self.render_slot
    }

    pub fn render_node(&self) -> Option<RenderId> {
        self.render_node
    }

    /// Number of render nodes this element contributes to its render parent.
    pub fn count_render_node(&self) -> usize {
        self.count_render_node
    }

    /// Returns true if this element may be updated in place with `component`.
    pub fn can_update(&self, component: &Component) -> bool {
        self.component
            .as_ref()
            .map_or(false, |current| current.can_update(component))
    }
}
