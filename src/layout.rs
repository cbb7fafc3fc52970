//! Layout constraints and the layout bodies of the simple render kinds.

use crate::render::{RenderId, RenderTree};
use crate::render_object::{Axis, RenderObject};
use cgmath::{Point2, Vector2, Zero};
use std::f64;

/// Text measurement: horizontal advance per glyph, relative to the font size.
const GLYPH_ADVANCE_RATIO: f64 = 0.5;
/// Text measurement: line height relative to the font size.
const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Size constraints handed from a render node to its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParam {
    pub min: Vector2<f64>,
    pub max: Vector2<f64>,
}

impl LayoutParam {
    pub fn new(min: Vector2<f64>, max: Vector2<f64>) -> LayoutParam {
        LayoutParam { min, max }
    }

    /// Allows any size between zero and `max`.
    pub fn loose(max: Vector2<f64>) -> LayoutParam {
        LayoutParam::new(Vector2::zero(), max)
    }

    /// Allows exactly `size`.
    pub fn tight(size: Vector2<f64>) -> LayoutParam {
        LayoutParam::new(size, size)
    }

    /// Unconstrained.
    pub fn unbounded() -> LayoutParam {
        LayoutParam::loose(Vector2::new(f64::INFINITY, f64::INFINITY))
    }

    /// Returns true if either maximum dimension is infinite.
    pub fn has_infinite_max(&self) -> bool {
        self.max.x.is_infinite() || self.max.y.is_infinite()
    }

    /// Clamps a size into the constraints.
    pub fn constrain(&self, size: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            size.x.max(self.min.x).min(self.max.x),
            size.y.max(self.min.y).min(self.max.y),
        )
    }
}

impl Default for LayoutParam {
    fn default() -> Self {
        LayoutParam::loose(Vector2::zero())
    }
}

impl Axis {
    fn main(self, v: Vector2<f64>) -> f64 {
        match self {
            Axis::Row => v.x,
            Axis::Column => v.y,
        }
    }

    fn cross(self, v: Vector2<f64>) -> f64 {
        match self {
            Axis::Row => v.y,
            Axis::Column => v.x,
        }
    }

    fn pack(self, main: f64, cross: f64) -> Vector2<f64> {
        match self {
            Axis::Row => Vector2::new(main, cross),
            Axis::Column => Vector2::new(cross, main),
        }
    }
}

/// Lays out every child with the same constraints at the origin and returns the largest size.
fn stack_children(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Vector2<f64> {
    let mut size = param.min;
    for child in tree.children(id).to_vec() {
        tree.layout(child, param);
        tree.set_position(child, Point2::new(0., 0.));
        let child_size = tree.layout_size(child);
        size.x = size.x.max(child_size.x);
        size.y = size.y.max(child_size.y);
    }
    size
}

/// The root fills its constraints and stacks its children.
pub(crate) fn layout_root(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Vector2<f64> {
    let size = stack_children(tree, id, LayoutParam::loose(param.max));
    if param.has_infinite_max() {
        param.constrain(size)
    } else {
        param.max
    }
}

/// Places children one after another along the main axis.
pub(crate) fn layout_flex(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Vector2<f64> {
    let spec = match tree.object(id) {
        Some(RenderObject::Flex(spec)) => *spec,
        _ => return param.min,
    };
    let axis = spec.axis;
    let child_param = LayoutParam::loose(axis.pack(f64::INFINITY, axis.cross(param.max)));

    let mut main = 0.;
    let mut cross: f64 = 0.;
    for (i, child) in tree.children(id).to_vec().into_iter().enumerate() {
        if i > 0 {
            main += spec.spacing;
        }
        tree.layout(child, child_param);
        let offset = axis.pack(main, 0.);
        tree.set_position(child, Point2::new(offset.x, offset.y));

        let child_size = tree.layout_size(child);
        main += axis.main(child_size);
        cross = cross.max(axis.cross(child_size));
    }

    param.constrain(axis.pack(main, cross))
}

/// Measures text with a fixed glyph advance, wrapping at the maximum width.
pub(crate) fn layout_text(tree: &mut RenderTree, id: RenderId, param: LayoutParam) -> Vector2<f64> {
    let (glyphs, font_size) = match tree.object(id) {
        Some(RenderObject::Text(spec)) => (spec.content.chars().count(), spec.font_size),
        _ => return param.min,
    };
    let advance = font_size * GLYPH_ADVANCE_RATIO;
    let line_height = font_size * LINE_HEIGHT_RATIO;
    let natural_width = glyphs as f64 * advance;

    let (width, lines) = if param.max.x.is_finite() && natural_width > param.max.x && advance > 0.
    {
        let per_line = (param.max.x / advance).floor().max(1.);
        (param.max.x, (glyphs as f64 / per_line).ceil())
    } else {
        (natural_width, 1.)
    };

    let size = param.constrain(Vector2::new(width, lines * line_height));
    stack_children(tree, id, LayoutParam::loose(size));
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_object::{FlexSpec, RenderSpec, TextSpec};

    fn tree() -> RenderTree {
        RenderTree::new(LayoutParam::loose(Vector2::new(100., 100.)))
    }

    #[test]
    fn constrain_clamps_both_ends() {
        let param = LayoutParam::new(Vector2::new(10., 10.), Vector2::new(50., 50.));
        assert_eq!(param.constrain(Vector2::new(0., 80.)), Vector2::new(10., 50.));
        assert!(!param.has_infinite_max());
        assert!(LayoutParam::unbounded().has_infinite_max());
    }

    #[test]
    fn text_wraps_at_max_width() {
        let mut tree = tree();
        let root = tree.root();
        // 10 glyphs of 10px font = 50px natural width; max 20px gives 4 glyphs per line
        let text = tree.create(&RenderSpec::Text(TextSpec::new("abcdefghij", 10.)));
        tree.add_child(root, text, 0);
        tree.layout(text, LayoutParam::loose(Vector2::new(20., 100.)));
        assert_eq!(tree.layout_size(text), Vector2::new(20., 36.), "three lines of 12px");
    }

    #[test]
    fn column_stacks_children_with_spacing() {
        let mut tree = tree();
        let root = tree.root();
        let column = tree.create(&RenderSpec::Flex(FlexSpec::column().with_spacing(4.)));
        tree.add_child(root, column, 0);
        let a = tree.create(&RenderSpec::Text(TextSpec::new("ab", 10.)));
        let b = tree.create(&RenderSpec::Text(TextSpec::new("abcd", 10.)));
        tree.add_child(column, a, 0);
        tree.add_child(column, b, 1);

        tree.flush_layout();

        assert_eq!(tree.layout_size(column), Vector2::new(20., 28.));
        assert_eq!(tree.node(a).unwrap().position(), Point2::new(0., 0.));
        assert_eq!(tree.node(b).unwrap().position(), Point2::new(0., 16.));
    }

    #[test]
    fn row_places_children_side_by_side() {
        let mut tree = tree();
        let root = tree.root();
        let row = tree.create(&RenderSpec::Flex(FlexSpec::row()));
        tree.add_child(root, row, 0);
        let a = tree.create(&RenderSpec::Text(TextSpec::new("ab", 10.)));
        let b = tree.create(&RenderSpec::Text(TextSpec::new("abc", 10.)));
        tree.add_child(row, a, 0);
        tree.add_child(row, b, 1);

        tree.flush_layout();

        assert_eq!(tree.layout_size(row), Vector2::new(25., 12.));
        assert_eq!(tree.node(b).unwrap().position(), Point2::new(10., 0.));
        assert_eq!(tree.layout_size(root), Vector2::new(100., 100.), "root fills its bounds");
    }
}
