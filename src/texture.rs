//! Texture sizing: how an external surface of a given source size is fitted into its layout box.

use crate::layout::LayoutParam;
use crate::render::{RenderId, RenderTree};
use crate::render_object::RenderObject;
use cgmath::{Point2, Vector2, Zero};

/// Percent-based positions are expressed out of this.
const PERCENT_TRANSLATE: f64 = 100.;

/// How the texture content is scaled into the layout box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFit {
    /// Scale to fit entirely, keeping the aspect ratio.
    Contain,
    /// Scale to cover the box entirely, keeping the aspect ratio.
    Cover,
    /// Stretch to the box.
    Fill,
    /// Use the source size.
    None,
    /// `None` if the box is wider than the source, `Contain` otherwise.
    ScaleDown,
}

impl Default for ImageFit {
    fn default() -> Self {
        ImageFit::Contain
    }
}

impl ImageFit {
    /// Computes the draw size for a source of `source` size in a box of `layout` size.
    ///
    /// A source with a zero dimension has no aspect ratio; the ratio-based fits draw nothing.
    pub fn draw_size(self, source: Vector2<f64>, layout: Vector2<f64>) -> Vector2<f64> {
        let has_ratio = source.x > 0. && source.y > 0.;
        match self {
            ImageFit::Fill => layout,
            ImageFit::None => source,
            _ if !has_ratio => Vector2::zero(),
            ImageFit::Contain => {
                let source_ratio = source.x / source.y;
                let layout_ratio = layout.x / layout.y;
                if source_ratio < layout_ratio {
                    Vector2::new(source_ratio * layout.y, layout.y)
                } else {
                    Vector2::new(layout.x, layout.x / source_ratio)
                }
            }
            ImageFit::Cover => {
                let source_ratio = source.x / source.y;
                let layout_ratio = layout.x / layout.y;
                if source_ratio < layout_ratio {
                    Vector2::new(layout.x, layout.x / source_ratio)
                } else {
                    Vector2::new(layout.y * source_ratio, layout.y)
                }
            }
            ImageFit::ScaleDown => {
                if layout.x > source.x {
                    ImageFit::None.draw_size(source, layout)
                } else {
                    ImageFit::Contain.draw_size(source, layout)
                }
            }
        }
    }
}

/// One coordinate of an object position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionValue {
    /// Absolute offset from the leading edge.
    Px(f64),
    /// Percentage of the free space (layout size minus draw size).
    Percent(f64),
}

impl PositionValue {
    fn resolve(self, layout: f64, draw: f64) -> f64 {
        match self {
            PositionValue::Px(px) => px,
            PositionValue::Percent(percent) => percent * (layout - draw) / PERCENT_TRANSLATE,
        }
    }
}

/// Where the drawn content sits inside the layout box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePosition {
    pub x: PositionValue,
    pub y: PositionValue,
}

impl Default for ImagePosition {
    /// Centered.
    fn default() -> Self {
        ImagePosition {
            x: PositionValue::Percent(50.),
            y: PositionValue::Percent(50.),
        }
    }
}

impl ImagePosition {
    /// Returns the offset of the drawn content from the layout box origin.
    pub fn alignment(&self, layout: Vector2<f64>, draw: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            self.x.resolve(layout.x, draw.x),
            self.y.resolve(layout.y, draw.y),
        )
    }
}

/// Textures fill finite constraints, or wrap their children otherwise.
pub(crate) fn layout_texture(
    tree: &mut RenderTree,
    id: RenderId,
    param: LayoutParam,
) -> Vector2<f64> {
    let mut size = param.min;
    for child in tree.children(id).to_vec() {
        tree.layout(child, param);
        tree.set_position(child, Point2::new(0., 0.));
        let child_size = tree.layout_size(child);
        size.x = size.x.max(child_size.x);
        size.y = size.y.max(child_size.y);
    }

    let layout_size = if param.has_infinite_max() {
        size
    } else {
        param.max
    };

    if let Some(RenderObject::Texture(texture)) = tree.object_mut(id) {
        texture.draw_size = texture
            .spec
            .fit
            .draw_size(texture.spec.source_size, layout_size);
        texture.alignment = texture
            .spec
            .position
            .alignment(layout_size, texture.draw_size);
    }

    layout_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x, y)
    }

    #[test]
    fn contain_and_cover_keep_aspect_ratio() {
        // 2:1 source into a square box
        let source = v(200., 100.);
        let layout = v(100., 100.);
        assert_eq!(ImageFit::Contain.draw_size(source, layout), v(100., 50.));
        assert_eq!(ImageFit::Cover.draw_size(source, layout), v(200., 100.));

        // 1:2 source into a square box
        let source = v(50., 100.);
        assert_eq!(ImageFit::Contain.draw_size(source, layout), v(50., 100.));
        assert_eq!(ImageFit::Cover.draw_size(source, layout), v(100., 200.));
    }

    #[test]
    fn fill_none_and_scale_down() {
        let source = v(40., 20.);
        let layout = v(100., 100.);
        assert_eq!(ImageFit::Fill.draw_size(source, layout), layout);
        assert_eq!(ImageFit::None.draw_size(source, layout), source);
        assert_eq!(
            ImageFit::ScaleDown.draw_size(source, layout),
            source,
            "box wider than source keeps the source size"
        );
        assert_eq!(
            ImageFit::ScaleDown.draw_size(v(400., 200.), layout),
            v(100., 50.),
            "larger source is contained"
        );
    }

    #[test]
    fn zero_sized_source_draws_nothing() {
        let layout = v(100., 100.);
        assert_eq!(ImageFit::Contain.draw_size(v(0., 10.), layout), v(0., 0.));
        assert_eq!(ImageFit::Cover.draw_size(v(10., 0.), layout), v(0., 0.));
        assert_eq!(ImageFit::Fill.draw_size(v(0., 0.), layout), layout);
    }

    #[test]
    fn object_position_px_and_percent() {
        let layout = v(100., 100.);
        let draw = v(100., 50.);
        assert_eq!(ImagePosition::default().alignment(layout, draw), v(0., 25.));

        let position = ImagePosition {
            x: PositionValue::Px(7.),
            y: PositionValue::Percent(100.),
        };
        assert_eq!(position.alignment(layout, draw), v(7., 50.));
    }
}
