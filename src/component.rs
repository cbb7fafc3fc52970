use crate::render_object::{FlexSpec, RenderKind, RenderSpec, TextSpec, TextureSpec};
use core::fmt;
use std::sync::Arc;

/// A stable identity key used to match keyed children across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComposeId(String);

impl ComposeId {
    pub fn new(id: impl Into<String>) -> ComposeId {
        ComposeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComposeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComposeId {
    fn from(id: &str) -> Self {
        ComposeId(id.to_owned())
    }
}

impl From<String> for ComposeId {
    fn from(id: String) -> Self {
        ComposeId(id)
    }
}

impl From<u64> for ComposeId {
    fn from(id: u64) -> Self {
        ComposeId(id.to_string())
    }
}

/// How a composite treats a change in the shape of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateType {
    /// Children are expected to keep their count; only attributes change.
    Attr,
    /// Children may be rebuilt from scratch.
    Rebuild,
}

impl Default for UpdateType {
    fn default() -> Self {
        UpdateType::Attr
    }
}

/// The kinds of components.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    /// Produces exactly one render node.
    Render(RenderSpec),
    /// Wraps (at most) one child and produces whatever that child produces.
    Composed,
    /// A group of children whose count is expected to stay stable.
    MultiComposed,
    /// A dynamic list of children, reconciled by key.
    ForEach,
    /// Produces nothing.
    Empty,
}

/// The tag used to decide whether an element can be updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    Render(RenderKind),
    Composed,
    MultiComposed,
    ForEach,
    Empty,
}

/// A declarative, short-lived description of a UI node.
///
/// Components are cheap to create and are consumed by reconciliation. Elements keep an `Arc` to the
/// component they were last built from, which is also used to skip rebuilding unchanged subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    kind: ComponentKind,
    key: Option<ComposeId>,
    update_type: UpdateType,
    children: Vec<Arc<Component>>,
}

impl Component {
    fn new(kind: ComponentKind) -> Component {
        Component {
            kind,
            key: None,
            update_type: UpdateType::default(),
            children: Vec::new(),
        }
    }

    /// A component producing one render node.
    pub fn render(spec: RenderSpec) -> Component {
        Component::new(ComponentKind::Render(spec))
    }

    pub fn flex(spec: FlexSpec) -> Component {
        Component::render(RenderSpec::Flex(spec))
    }

    pub fn text(spec: TextSpec) -> Component {
        Component::render(RenderSpec::Text(spec))
    }

    pub fn texture(spec: TextureSpec) -> Component {
        Component::render(RenderSpec::Texture(spec))
    }

    /// A keyed wrapper around a single child.
    pub fn composed(key: impl Into<ComposeId>, child: impl Into<Arc<Component>>) -> Component {
        Component::new(ComponentKind::Composed)
            .with_key(key)
            .with_children(vec![child.into()])
    }

    /// A group of children with a stable count.
    pub fn multi_composed(key: impl Into<ComposeId>, children: Vec<Arc<Component>>) -> Component {
        Component::new(ComponentKind::MultiComposed)
            .with_key(key)
            .with_children(children)
    }

    /// A repeated block reconciled by key.
    pub fn for_each(key: impl Into<ComposeId>, children: Vec<Arc<Component>>) -> Component {
        Component::new(ComponentKind::ForEach)
            .with_key(key)
            .with_children(children)
    }

    pub fn empty() -> Component {
        Component::new(ComponentKind::Empty)
    }

    pub fn with_key(mut self, key: impl Into<ComposeId>) -> Component {
        self.key = Some(key.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Arc<Component>>) -> Component {
        self.children = children;
        self
    }

    pub fn with_update_type(mut self, update_type: UpdateType) -> Component {
        self.update_type = update_type;
        self
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn tag(&self) -> ComponentTag {
        match &self.kind {
            ComponentKind::Render(spec) => ComponentTag::Render(spec.kind()),
            ComponentKind::Composed => ComponentTag::Composed,
            ComponentKind::MultiComposed => ComponentTag::MultiComposed,
            ComponentKind::ForEach => ComponentTag::ForEach,
            ComponentKind::Empty => ComponentTag::Empty,
        }
    }

    pub fn key(&self) -> Option<&ComposeId> {
        self.key.as_ref()
    }

    pub fn update_type(&self) -> UpdateType {
        self.update_type
    }

    /// Children in render order.
    pub fn children(&self) -> &[Arc<Component>] {
        &self.children
    }

    /// Returns true if an element built from `self` may be updated in place with `other`.
    ///
    /// Requires the same tag and the same key; two unkeyed components of the same tag match.
    pub fn can_update(&self, other: &Component) -> bool {
        self.tag() == other.tag() && self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> Component {
        Component::text(TextSpec::new(content, 12.))
    }

    #[test]
    fn can_update_requires_same_tag_and_key() {
        assert!(text("a").can_update(&text("b")), "unkeyed texts match by type");
        assert!(
            !text("a").can_update(&Component::flex(FlexSpec::column())),
            "different render kinds never match"
        );
        assert!(
            text("a").with_key(1u64).can_update(&text("b").with_key(1u64)),
            "same key matches"
        );
        assert!(
            !text("a").with_key(1u64).can_update(&text("a").with_key(2u64)),
            "different keys never match"
        );
        assert!(
            !text("a").with_key(1u64).can_update(&text("a")),
            "keyed never matches unkeyed"
        );
        assert!(
            !Component::empty().can_update(&Component::composed("x", Component::empty())),
            "empty vs composed"
        );
    }

    #[test]
    fn compose_id_conversions() {
        assert_eq!(ComposeId::from(7u64), ComposeId::from("7"));
        assert_eq!(ComposeId::new("row").to_string(), "row");
    }
}
