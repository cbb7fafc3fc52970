//! The closed set of render node kinds.
//!
//! Each kind has a declared property set ([`RenderSpec`]), a retained state ([`RenderObject`]) and
//! an entry in a capability table that says how to update, lay out and paint it.

use crate::error::UpdateError;
use crate::layout::{self, LayoutParam};
use crate::rect::Rect;
use crate::render::{RenderId, RenderTree};
use crate::texture::{self, ImageFit, ImagePosition};
use cgmath::{Vector2, Zero};

/// Types of render nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Root,
    Flex,
    Text,
    Texture,
}

/// Main axis of a flex container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexSpec {
    pub axis: Axis,
    /// Space between adjacent children.
    pub spacing: f64,
}

impl FlexSpec {
    pub fn row() -> FlexSpec {
        FlexSpec {
            axis: Axis::Row,
            spacing: 0.,
        }
    }

    pub fn column() -> FlexSpec {
        FlexSpec {
            axis: Axis::Column,
            spacing: 0.,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> FlexSpec {
        self.spacing = spacing;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub content: String,
    pub font_size: f64,
}

impl TextSpec {
    pub fn new(content: impl Into<String>, font_size: f64) -> TextSpec {
        TextSpec {
            content: content.into(),
            font_size,
        }
    }
}

/// An externally produced surface (video, camera, plugin) drawn into the layout box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSpec {
    pub texture_id: i64,
    pub source_size: Vector2<f64>,
    pub fit: ImageFit,
    pub position: ImagePosition,
}

impl TextureSpec {
    pub fn new(texture_id: i64, source_size: Vector2<f64>) -> TextureSpec {
        TextureSpec {
            texture_id,
            source_size,
            fit: ImageFit::default(),
            position: ImagePosition::default(),
        }
    }

    pub fn with_fit(mut self, fit: ImageFit) -> TextureSpec {
        self.fit = fit;
        self
    }

    pub fn with_position(mut self, position: ImagePosition) -> TextureSpec {
        self.position = position;
        self
    }
}

/// Declared properties of a render node, as carried by a component.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderSpec {
    Flex(FlexSpec),
    Text(TextSpec),
    Texture(TextureSpec),
}

impl RenderSpec {
    pub fn kind(&self) -> RenderKind {
        match self {
            RenderSpec::Flex(_) => RenderKind::Flex,
            RenderSpec::Text(_) => RenderKind::Text,
            RenderSpec::Texture(_) => RenderKind::Texture,
        }
    }
}

/// Retained texture state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureObject {
    pub spec: TextureSpec,
    /// Size of the drawn content, computed during layout.
    pub draw_size: Vector2<f64>,
    /// Offset of the drawn content inside the layout box, computed during layout.
    pub alignment: Vector2<f64>,
}

/// Retained per-kind state of a render node.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderObject {
    Root,
    Flex(FlexSpec),
    Text(TextSpec),
    Texture(TextureObject),
}

impl RenderObject {
    pub(crate) fn from_spec(spec: &RenderSpec) -> RenderObject {
        match spec {
            RenderSpec::Flex(spec) => RenderObject::Flex(*spec),
            RenderSpec::Text(spec) => RenderObject::Text(spec.clone()),
            RenderSpec::Texture(spec) => RenderObject::Texture(TextureObject {
                spec: *spec,
                draw_size: Vector2::zero(),
                alignment: Vector2::zero(),
            }),
        }
    }

    pub fn kind(&self) -> RenderKind {
        match self {
            RenderObject::Root => RenderKind::Root,
            RenderObject::Flex(_) => RenderKind::Flex,
            RenderObject::Text(_) => RenderKind::Text,
            RenderObject::Texture(_) => RenderKind::Texture,
        }
    }
}

/// What a node hands to the compositor when painted.
///
/// Rectangles are in window coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintRecord {
    Container {
        rect: Rect,
        opacity: u8,
    },
    Text {
        rect: Rect,
        content: String,
        font_size: f64,
        opacity: u8,
    },
    Texture {
        texture_id: i64,
        rect: Rect,
        draw_rect: Rect,
        opacity: u8,
    },
}

impl PaintRecord {
    pub fn rect(&self) -> Rect {
        match self {
            PaintRecord::Container { rect, .. }
            | PaintRecord::Text { rect, .. }
            | PaintRecord::Texture { rect, .. } => *rect,
        }
    }
}

/// Per-kind behavior.
pub(crate) struct Capabilities {
    /// Copies declared properties into the retained state.
    pub(crate) update: fn(&mut RenderObject, &RenderSpec) -> Result<(), UpdateError>,
    /// Lays out children and returns the node's own size.
    pub(crate) layout: fn(&mut RenderTree, RenderId, LayoutParam) -> Vector2<f64>,
    /// Produces the paint record for a node placed at `rect`.
    pub(crate) paint: fn(&RenderObject, Rect, u8) -> PaintRecord,
    /// Layout invalidation stops at this node instead of propagating to the parent.
    pub(crate) takes_boundary: bool,
    /// Paint invalidation stops at this node.
    pub(crate) repaint_boundary: bool,
}

static ROOT: Capabilities = Capabilities {
    update: update_root,
    layout: layout::layout_root,
    paint: paint_container,
    takes_boundary: true,
    repaint_boundary: true,
};

static FLEX: Capabilities = Capabilities {
    update: update_flex,
    layout: layout::layout_flex,
    paint: paint_container,
    takes_boundary: false,
    repaint_boundary: false,
};

static TEXT: Capabilities = Capabilities {
    update: update_text,
    layout: layout::layout_text,
    paint: paint_text,
    takes_boundary: false,
    repaint_boundary: false,
};

static TEXTURE: Capabilities = Capabilities {
    update: update_texture,
    layout: texture::layout_texture,
    paint: paint_texture,
    takes_boundary: true,
    repaint_boundary: true,
};

impl RenderKind {
    pub(crate) fn capabilities(self) -> &'static Capabilities {
        match self {
            RenderKind::Root => &ROOT,
            RenderKind::Flex => &FLEX,
            RenderKind::Text => &TEXT,
            RenderKind::Texture => &TEXTURE,
        }
    }
}

fn mismatch(object: &RenderObject, spec: &RenderSpec) -> UpdateError {
    UpdateError::TypeMismatch {
        expected: object.kind(),
        found: spec.kind(),
    }
}

fn update_root(object: &mut RenderObject, spec: &RenderSpec) -> Result<(), UpdateError> {
    Err(mismatch(object, spec))
}

fn update_flex(object: &mut RenderObject, spec: &RenderSpec) -> Result<(), UpdateError> {
    match (object, spec) {
        (RenderObject::Flex(current), RenderSpec::Flex(spec)) => {
            *current = *spec;
            Ok(())
        }
        (object, spec) => Err(mismatch(object, spec)),
    }
}

fn update_text(object: &mut RenderObject, spec: &RenderSpec) -> Result<(), UpdateError> {
    match (object, spec) {
        (RenderObject::Text(current), RenderSpec::Text(spec)) => {
            current.clone_from(spec);
            Ok(())
        }
        (object, spec) => Err(mismatch(object, spec)),
    }
}

fn update_texture(object: &mut RenderObject, spec: &RenderSpec) -> Result<(), UpdateError> {
    match (object, spec) {
        (RenderObject::Texture(current), RenderSpec::Texture(spec)) => {
            current.spec = *spec;
            Ok(())
        }
        (object, spec) => Err(mismatch(object, spec)),
    }
}

fn paint_container(_: &RenderObject, rect: Rect, opacity: u8) -> PaintRecord {
    PaintRecord::Container { rect, opacity }
}

fn paint_text(object: &RenderObject, rect: Rect, opacity: u8) -> PaintRecord {
    match object {
        RenderObject::Text(spec) => PaintRecord::Text {
            rect,
            content: spec.content.clone(),
            font_size: spec.font_size,
            opacity,
        },
        _ => paint_container(object, rect, opacity),
    }
}

fn paint_texture(object: &RenderObject, rect: Rect, opacity: u8) -> PaintRecord {
    match object {
        RenderObject::Texture(texture) => PaintRecord::Texture {
            texture_id: texture.spec.texture_id,
            rect,
            draw_rect: (rect + texture.alignment).with_size(texture.draw_size),
            opacity,
        },
        _ => paint_container(object, rect, opacity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    #[test]
    fn update_copies_matching_properties() {
        let mut object = RenderObject::from_spec(&RenderSpec::Text(TextSpec::new("a", 10.)));
        let update = RenderKind::Text.capabilities().update;
        update(&mut object, &RenderSpec::Text(TextSpec::new("b", 20.))).unwrap();
        assert_eq!(object, RenderObject::Text(TextSpec::new("b", 20.)));
    }

    #[test]
    fn update_rejects_other_kinds_and_leaves_state() {
        let mut object = RenderObject::from_spec(&RenderSpec::Flex(FlexSpec::row()));
        let update = RenderKind::Flex.capabilities().update;
        let err = update(&mut object, &RenderSpec::Text(TextSpec::new("b", 20.))).unwrap_err();
        assert_eq!(
            err,
            UpdateError::TypeMismatch {
                expected: RenderKind::Flex,
                found: RenderKind::Text,
            }
        );
        assert_eq!(object, RenderObject::Flex(FlexSpec::row()), "state untouched");
    }

    #[test]
    fn texture_paint_offsets_draw_rect() {
        let object = RenderObject::Texture(TextureObject {
            spec: TextureSpec::new(3, Vector2::new(10., 10.)),
            draw_size: Vector2::new(10., 10.),
            alignment: Vector2::new(5., 0.),
        });
        let rect = Rect::new(Point2::new(1., 1.), Vector2::new(20., 10.));
        match (RenderKind::Texture.capabilities().paint)(&object, rect, 255) {
            PaintRecord::Texture {
                texture_id,
                draw_rect,
                ..
            } => {
                assert_eq!(texture_id, 3);
                assert_eq!(draw_rect.origin, Point2::new(6., 1.));
            }
            other => panic!("expected texture record, got {:?}", other),
        }
    }
}
