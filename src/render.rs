//! The render tree: retained layout and paint state.
//!
//! Render nodes live in an arena keyed by [`RenderId`]. A node exclusively owns its children;
//! the parent is only reachable through its id, which is simply missing from the arena once the
//! parent has been disposed.
//!
//! Every node goes through the same cycle each frame:
//!
//! ```text
//! Idle -> update -> NeedsLayout -> layout -> LaidOut -> NeedsPaint -> paint -> Idle
//! ```
//!
//! Animation ticks enter the cycle at `NeedsLayout` or `NeedsPaint` directly.

use crate::compositor::Compositor;
use crate::error::UpdateError;
use crate::layout::LayoutParam;
use crate::rect::Rect;
use crate::render_object::{RenderKind, RenderObject, RenderSpec};
use cgmath::{EuclideanSpace, Point2, Vector2, Zero};
use std::collections::HashMap;
use std::mem;
use tracing::{debug, error, trace, warn};

/// Identifies a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderId(u64);

/// Where a render node is in the frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
    Idle,
    NeedsLayout,
    LaidOut,
    NeedsPaint,
}

/// A property change driven by an animation, bypassing `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationTick {
    /// Paint-only; re-enters at `NeedsPaint`.
    Opacity(u8),
    /// Moves the node relative to where layout put it; re-enters at `NeedsLayout`.
    Offset(Vector2<f64>),
}

/// A node in the render tree.
#[derive(Debug)]
pub struct RenderNode {
    object: RenderObject,
    parent: Option<RenderId>,
    children: Vec<RenderId>,
    depth: usize,
    state: RenderState,
    need_layout: bool,
    need_render: bool,
    layout_param: LayoutParam,
    layout_size: Vector2<f64>,
    /// Position relative to the parent, assigned by the parent's layout.
    position: Point2<f64>,
    animation_offset: Vector2<f64>,
    opacity: u8,
}

impl RenderNode {
    fn new(object: RenderObject) -> RenderNode {
        RenderNode {
            object,
            parent: None,
            children: Vec::new(),
            depth: 0,
            state: RenderState::NeedsLayout,
            need_layout: true,
            need_render: false,
            layout_param: LayoutParam::default(),
            layout_size: Vector2::zero(),
            position: Point2::new(0., 0.),
            animation_offset: Vector2::zero(),
            opacity: u8::max_value(),
        }
    }

    pub fn object(&self) -> &RenderObject {
        &self.object
    }

    pub fn kind(&self) -> RenderKind {
        self.object.kind()
    }

    pub fn parent(&self) -> Option<RenderId> {
        self.parent
    }

    pub fn children(&self) -> &[RenderId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn needs_layout(&self) -> bool {
        self.need_layout
    }

    pub fn needs_render(&self) -> bool {
        self.need_render
    }

    pub fn layout_param(&self) -> LayoutParam {
        self.layout_param
    }

    pub fn layout_size(&self) -> Vector2<f64> {
        self.layout_size
    }

    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    fn takes_boundary(&self) -> bool {
        self.kind().capabilities().takes_boundary
    }

    fn is_repaint_boundary(&self) -> bool {
        self.kind().capabilities().repaint_boundary
    }

    fn set_need_layout(&mut self) {
        self.need_layout = true;
        self.state = RenderState::NeedsLayout;
    }
}

/// The render tree.
#[derive(Debug)]
pub struct RenderTree {
    nodes: HashMap<RenderId, RenderNode>,
    root: RenderId,
    next_id: u64,
    /// Nodes whose layout has to be redone at the next flush.
    dirty_layout: Vec<RenderId>,
    /// Repaint boundaries that have to be repainted at the next flush.
    dirty_render: Vec<RenderId>,
    /// Disposed nodes whose platform resources have not been released yet.
    released: Vec<RenderId>,
    /// Area painted by the last paint flush.
    damage: Option<Rect>,
}

impl RenderTree {
    /// Creates a tree with a root node constrained by `root_param`.
    pub fn new(root_param: LayoutParam) -> RenderTree {
        let root = RenderId(0);
        let mut root_node = RenderNode::new(RenderObject::Root);
        root_node.layout_param = root_param;

        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);

        RenderTree {
            nodes,
            root,
            next_id: 1,
            dirty_layout: vec![root],
            dirty_render: Vec::new(),
            released: Vec::new(),
            damage: None,
        }
    }

    pub fn root(&self) -> RenderId {
        self.root
    }

    pub fn node(&self, id: RenderId) -> Option<&RenderNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: RenderId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: RenderId) -> &[RenderId] {
        self.nodes.get(&id).map_or(&[], |node| &node.children)
    }

    pub fn parent(&self, id: RenderId) -> Option<RenderId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn layout_size(&self, id: RenderId) -> Vector2<f64> {
        self.nodes
            .get(&id)
            .map_or_else(Vector2::zero, |node| node.layout_size)
    }

    pub(crate) fn object(&self, id: RenderId) -> Option<&RenderObject> {
        self.nodes.get(&id).map(|node| &node.object)
    }

    pub(crate) fn object_mut(&mut self, id: RenderId) -> Option<&mut RenderObject> {
        self.nodes.get_mut(&id).map(|node| &mut node.object)
    }

    pub(crate) fn set_position(&mut self, id: RenderId, position: Point2<f64>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = position;
        }
    }

    /// Creates a detached node from declared properties.
    pub fn create(&mut self, spec: &RenderSpec) -> RenderId {
        let id = RenderId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, RenderNode::new(RenderObject::from_spec(spec)));
        trace!("created render node {:?} ({:?})", id, spec.kind());
        id
    }

    /// Inserts `child` among the children of `parent` at index `slot` (clamped).
    pub fn add_child(&mut self, parent: RenderId, child: RenderId, slot: usize) {
        if !self.nodes.contains_key(&child) {
            warn!("add_child: no such child {:?}", child);
            return;
        }
        let depth = match self.nodes.get_mut(&parent) {
            Some(node) => {
                if node.children.contains(&child) {
                    warn!("add_child: {:?} is already a child of {:?}", child, parent);
                    return;
                }
                let pos = slot.min(node.children.len());
                node.children.insert(pos, child);
                node.depth
            }
            None => {
                warn!("add_child: no such parent {:?}", parent);
                return;
            }
        };

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        self.set_depth(child, depth + 1);
        self.mark_need_layout(parent);
    }

    /// Detaches `child` from `parent`. The child stays in the arena.
    pub fn remove_child(&mut self, parent: RenderId, child: RenderId) {
        match self.nodes.get_mut(&parent) {
            Some(node) => match node.children.iter().position(|id| *id == child) {
                Some(pos) => {
                    node.children.remove(pos);
                }
                None => {
                    warn!("remove_child: {:?} is not a child of {:?}", child, parent);
                    return;
                }
            },
            None => {
                warn!("remove_child: no such parent {:?}", parent);
                return;
            }
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
        self.mark_need_layout(parent);
    }

    /// Moves a node to index `slot` among its siblings.
    pub fn move_position(&mut self, id: RenderId, slot: usize) {
        let parent = match self.parent(id) {
            Some(parent) => parent,
            None => {
                warn!("move_position: {:?} has no parent", id);
                return;
            }
        };
        let moved = match self.nodes.get_mut(&parent) {
            Some(node) => {
                let current = node.children.iter().position(|child| *child == id);
                match current {
                    Some(current) if current == slot => false,
                    Some(current) => {
                        node.children.remove(current);
                        let pos = slot.min(node.children.len());
                        node.children.insert(pos, id);
                        true
                    }
                    None => {
                        warn!("move_position: {:?} is missing from its parent", id);
                        false
                    }
                }
            }
            None => false,
        };
        if moved {
            self.mark_need_layout(parent);
        }
    }

    /// Removes a detached node and all its descendants from the arena.
    ///
    /// The compositor is told to release them at the next paint flush.
    pub fn dispose(&mut self, id: RenderId) {
        if id == self.root {
            warn!("dispose: refusing to dispose the root node");
            return;
        }
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
                self.released.push(id);
            }
        }
    }

    fn set_depth(&mut self, id: RenderId, depth: usize) {
        let mut stack = vec![(id, depth)];
        while let Some((id, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.depth = depth;
                stack.extend(node.children.iter().map(|child| (*child, depth + 1)));
            }
        }
    }

    /// Copies declared properties into a node and schedules its layout.
    ///
    /// On a kind mismatch the node is left as it was.
    pub fn update(&mut self, id: RenderId, spec: &RenderSpec) -> Result<(), UpdateError> {
        let node = match self.nodes.get_mut(&id) {
            Some(node) => node,
            None => {
                warn!("update: no such render node {:?}", id);
                return Err(UpdateError::NoSuchNode(id));
            }
        };
        let update = node.kind().capabilities().update;
        if let Err(err) = update(&mut node.object, spec) {
            error!("failed to update render node {:?}: {}", id, err);
            return Err(err);
        }
        self.mark_need_layout(id);
        Ok(())
    }

    /// Marks a node as needing layout, propagating up to the nearest layout boundary.
    pub fn mark_need_layout(&mut self, id: RenderId) {
        self.mark_need_layout_with(id, false, false);
    }

    /// Marks a node as needing layout.
    ///
    /// - `self_only`: queue this node itself instead of propagating to the parent
    /// - `force_parent`: mark every ancestor, even ones that already need layout
    pub fn mark_need_layout_with(&mut self, id: RenderId, self_only: bool, force_parent: bool) {
        let mut current = id;
        let mut self_only = self_only;
        loop {
            let parent = match self.nodes.get(&current) {
                Some(node) => node.parent.filter(|parent| self.nodes.contains_key(parent)),
                None => {
                    warn!("mark_need_layout: no such render node {:?}", current);
                    return;
                }
            };
            let node = match self.nodes.get_mut(&current) {
                Some(node) => node,
                None => return,
            };

            let add_self = if force_parent {
                node.set_need_layout();
                parent.is_none()
            } else if !node.need_layout {
                node.set_need_layout();
                node.takes_boundary() || self_only || parent.is_none()
            } else {
                return;
            };

            if add_self {
                self.dirty_layout.push(current);
                return;
            }
            match parent {
                Some(parent) => {
                    current = parent;
                    self_only = false;
                }
                None => return,
            }
        }
    }

    /// Marks a node as needing paint, propagating up to the nearest repaint boundary.
    pub fn mark_need_render(&mut self, id: RenderId) {
        let mut current = id;
        loop {
            let node = match self.nodes.get_mut(&current) {
                Some(node) => node,
                None => return,
            };
            if node.state != RenderState::NeedsLayout {
                node.state = RenderState::NeedsPaint;
            }
            if node.need_render {
                return;
            }
            node.need_render = true;
            if node.is_repaint_boundary() {
                self.dirty_render.push(current);
                return;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    /// Lays out a node with the given constraints; a no-op if neither the constraints nor the node
    /// changed since the last layout.
    pub fn layout(&mut self, id: RenderId, param: LayoutParam) {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                if node.layout_param != param {
                    node.layout_param = param;
                    node.set_need_layout();
                }
            }
            None => return,
        }
        self.on_layout(id);
    }

    fn on_layout(&mut self, id: RenderId) {
        let (kind, param) = match self.nodes.get(&id) {
            Some(node) if node.need_layout => (node.kind(), node.layout_param),
            _ => return,
        };

        let size = (kind.capabilities().layout)(self, id, param);

        if let Some(node) = self.nodes.get_mut(&id) {
            node.layout_size = size;
            node.need_layout = false;
            node.state = RenderState::LaidOut;
        }
        self.mark_need_render(id);
    }

    /// Lays out every dirty node, shallowest first. Returns how many were processed.
    pub fn flush_layout(&mut self) -> usize {
        let mut dirty = mem::replace(&mut self.dirty_layout, Vec::new());
        dirty.retain(|id| self.nodes.contains_key(id));
        dirty.sort_by_key(|id| (self.nodes[id].depth, *id));
        dirty.dedup();

        let mut count = 0;
        for id in dirty {
            if self.nodes.get(&id).map_or(false, |node| node.need_layout) {
                self.on_layout(id);
                count += 1;
            }
        }
        count
    }

    /// Applies an animation tick to a node.
    pub fn on_animation_callback(&mut self, id: RenderId, tick: AnimationTick) {
        let node = match self.nodes.get_mut(&id) {
            Some(node) => node,
            None => {
                debug!("animation tick for disposed render node {:?}", id);
                return;
            }
        };
        match tick {
            AnimationTick::Opacity(opacity) => {
                node.opacity = opacity;
                self.mark_need_render(id);
            }
            AnimationTick::Offset(offset) => {
                node.animation_offset = offset;
                self.mark_need_layout_with(id, true, false);
            }
        }
    }

    /// Window-coordinate origin of a node.
    pub fn global_offset(&self, id: RenderId) -> Point2<f64> {
        let mut offset = Vector2::zero();
        let mut current = Some(id);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(node) => {
                    offset += node.position.to_vec() + node.animation_offset;
                    current = node.parent;
                }
                None => break,
            }
        }
        Point2::from_vec(offset)
    }

    /// Releases disposed nodes and repaints every dirty repaint boundary. Returns how many nodes
    /// were painted.
    ///
    /// A boundary whose subtree could not be fully painted stays dirty for the next flush.
    pub fn flush_render<C: Compositor + ?Sized>(&mut self, compositor: &mut C) -> usize {
        for id in mem::replace(&mut self.released, Vec::new()) {
            if let Err(err) = compositor.release(id) {
                error!("failed to release render node {:?}: {}", id, err);
            }
        }

        self.damage = None;
        let mut dirty = mem::replace(&mut self.dirty_render, Vec::new());
        dirty.retain(|id| self.nodes.contains_key(id));
        dirty.sort_by_key(|id| (self.nodes[id].depth, *id));
        dirty.dedup();

        let mut painted = 0;
        for boundary in dirty {
            if !self.nodes.get(&boundary).map_or(false, |node| node.need_render) {
                // already painted as part of an outer boundary
                continue;
            }
            let origin = self.global_offset(boundary);
            let parent_origin = origin
                - self.nodes[&boundary].position.to_vec()
                - self.nodes[&boundary].animation_offset;
            let mut failed = false;
            self.paint_subtree(boundary, parent_origin, compositor, &mut painted, &mut failed);
            if failed {
                if let Some(node) = self.nodes.get_mut(&boundary) {
                    node.need_render = true;
                    node.state = RenderState::NeedsPaint;
                }
                self.dirty_render.push(boundary);
            }
        }
        painted
    }

    fn paint_subtree<C: Compositor + ?Sized>(
        &mut self,
        id: RenderId,
        parent_origin: Point2<f64>,
        compositor: &mut C,
        painted: &mut usize,
        failed: &mut bool,
    ) {
        let (record, origin, children) = match self.nodes.get(&id) {
            Some(node) => {
                let origin = parent_origin + node.position.to_vec() + node.animation_offset;
                let rect = Rect::new(origin, node.layout_size);
                let paint = node.kind().capabilities().paint;
                (paint(&node.object, rect, node.opacity), origin, node.children.clone())
            }
            None => return,
        };

        match compositor.paint(id, &record) {
            Ok(()) => {
                *painted += 1;
                let rect = record.rect();
                self.damage = Some(self.damage.map_or(rect, |damage| damage.union(rect)));
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.need_render = false;
                    if !node.need_layout {
                        node.state = RenderState::Idle;
                    }
                }
            }
            Err(err) => {
                error!("failed to paint render node {:?}: {}", id, err);
                *failed = true;
                return;
            }
        }

        for child in children {
            self.paint_subtree(child, origin, compositor, painted, failed);
        }
    }

    /// The union of everything painted by the last call to `flush_render`.
    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    /// Returns true if nothing is waiting for layout or paint.
    pub fn is_clean(&self) -> bool {
        self.dirty_layout.is_empty() && self.dirty_render.is_empty() && self.released.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::RecordingCompositor;
    use crate::render_object::{FlexSpec, PaintRecord, TextSpec, TextureSpec};

    fn tree() -> RenderTree {
        RenderTree::new(LayoutParam::loose(Vector2::new(100., 100.)))
    }

    fn text(content: &str) -> RenderSpec {
        RenderSpec::Text(TextSpec::new(content, 10.))
    }

    #[test]
    fn add_move_and_remove_children() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.create(&text("a"));
        let b = tree.create(&text("b"));
        let c = tree.create(&text("c"));
        tree.add_child(root, a, 0);
        tree.add_child(root, b, 1);
        tree.add_child(root, c, 99);
        assert_eq!(tree.children(root), &[a, b, c][..]);
        assert_eq!(tree.node(c).unwrap().depth(), 1);

        tree.add_child(root, a, 2);
        assert_eq!(tree.children(root), &[a, b, c][..], "duplicate add is ignored");

        tree.move_position(c, 0);
        assert_eq!(tree.children(root), &[c, a, b][..]);
        tree.move_position(c, 2);
        assert_eq!(tree.children(root), &[a, b, c][..]);

        tree.remove_child(root, b);
        assert_eq!(tree.children(root), &[a, c][..]);
        assert_eq!(tree.parent(b), None);
        tree.remove_child(root, b);
        assert_eq!(tree.children(root), &[a, c][..], "removing a non-child is ignored");
    }

    #[test]
    fn dispose_removes_subtree_and_reports_release() {
        let mut tree = tree();
        let root = tree.root();
        let column = tree.create(&RenderSpec::Flex(FlexSpec::column()));
        let leaf = tree.create(&text("a"));
        tree.add_child(root, column, 0);
        tree.add_child(column, leaf, 0);
        assert_eq!(tree.node(leaf).unwrap().depth(), 2);

        tree.remove_child(root, column);
        tree.dispose(column);
        assert!(!tree.contains(column));
        assert!(!tree.contains(leaf));

        let mut compositor = RecordingCompositor::default();
        tree.flush_layout();
        tree.flush_render(&mut compositor);
        let mut released = compositor.released.clone();
        released.sort();
        assert_eq!(released, vec![column, leaf]);
    }

    #[test]
    fn lifecycle_update_layout_paint() {
        let mut tree = tree();
        let root = tree.root();
        let node = tree.create(&text("hello"));
        tree.add_child(root, node, 0);
        assert_eq!(tree.node(node).unwrap().state(), RenderState::NeedsLayout);

        tree.flush_layout();
        assert_eq!(tree.node(node).unwrap().state(), RenderState::NeedsPaint);
        assert_eq!(tree.layout_size(node), Vector2::new(25., 12.));

        let mut compositor = RecordingCompositor::default();
        assert_eq!(tree.flush_render(&mut compositor), 2, "root and text painted");
        assert_eq!(tree.node(node).unwrap().state(), RenderState::Idle);
        assert!(tree.is_clean());

        tree.update(node, &text("hi")).unwrap();
        assert_eq!(tree.node(node).unwrap().state(), RenderState::NeedsLayout);
        assert!(
            tree.node(root).unwrap().needs_layout(),
            "text is not a layout boundary; root is marked"
        );
        tree.flush_layout();
        assert_eq!(tree.layout_size(node), Vector2::new(10., 12.));
    }

    #[test]
    fn update_with_wrong_kind_leaves_node_untouched() {
        let mut tree = tree();
        let root = tree.root();
        let node = tree.create(&text("a"));
        tree.add_child(root, node, 0);
        tree.flush_layout();
        let mut compositor = RecordingCompositor::default();
        tree.flush_render(&mut compositor);

        let err = tree
            .update(node, &RenderSpec::Flex(FlexSpec::row()))
            .unwrap_err();
        assert!(matches!(err, UpdateError::TypeMismatch { .. }));
        assert_eq!(tree.node(node).unwrap().state(), RenderState::Idle);
        assert_eq!(tree.node(node).unwrap().object(), &RenderObject::Text(TextSpec::new("a", 10.)));
    }

    #[test]
    fn layout_boundary_stops_propagation() {
        let mut tree = tree();
        let root = tree.root();
        let texture = tree.create(&RenderSpec::Texture(TextureSpec::new(1, Vector2::new(4., 2.))));
        tree.add_child(root, texture, 0);
        tree.flush_layout();
        let mut compositor = RecordingCompositor::default();
        tree.flush_render(&mut compositor);

        tree.mark_need_layout(texture);
        assert!(!tree.node(root).unwrap().needs_layout(), "texture takes the boundary");
        assert_eq!(tree.flush_layout(), 1);
        assert_eq!(tree.layout_size(texture), Vector2::new(100., 100.));

        tree.mark_need_layout_with(texture, false, true);
        assert!(tree.node(root).unwrap().needs_layout(), "force_parent reaches the root");
    }

    #[test]
    fn animation_ticks_reenter_the_cycle() {
        let mut tree = tree();
        let root = tree.root();
        let node = tree.create(&text("a"));
        tree.add_child(root, node, 0);
        tree.flush_layout();
        let mut compositor = RecordingCompositor::default();
        tree.flush_render(&mut compositor);

        tree.on_animation_callback(node, AnimationTick::Opacity(128));
        assert_eq!(tree.node(node).unwrap().state(), RenderState::NeedsPaint);
        assert!(!tree.node(node).unwrap().needs_layout());
        compositor.painted.clear();
        tree.flush_render(&mut compositor);
        assert!(compositor.painted.iter().any(|(id, record)| *id == node
            && matches!(record, PaintRecord::Text { opacity: 128, .. })));

        tree.on_animation_callback(node, AnimationTick::Offset(Vector2::new(3., 4.)));
        assert_eq!(tree.node(node).unwrap().state(), RenderState::NeedsLayout);
        tree.flush_layout();
        compositor.painted.clear();
        tree.flush_render(&mut compositor);
        let (_, record) = compositor
            .painted
            .iter()
            .find(|(id, _)| *id == node)
            .expect("text repainted");
        assert_eq!(record.rect().origin, Point2::new(3., 4.));
        assert_eq!(
            tree.damage(),
            Some(Rect::new(Point2::new(0., 0.), Vector2::new(100., 100.))),
            "root repainted with its subtree"
        );
    }

    #[test]
    fn failed_paint_keeps_boundary_dirty() {
        let mut tree = tree();
        let root = tree.root();
        let node = tree.create(&text("a"));
        tree.add_child(root, node, 0);
        tree.flush_layout();

        let mut compositor = RecordingCompositor::default();
        compositor.fail_on = Some(node);
        tree.flush_render(&mut compositor);
        assert!(tree.node(node).unwrap().needs_render());
        assert!(!tree.is_clean());

        compositor.fail_on = None;
        tree.flush_render(&mut compositor);
        assert!(!tree.node(node).unwrap().needs_render());
        assert!(tree.is_clean());
    }
}
