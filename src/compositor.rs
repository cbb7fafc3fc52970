//! Traits for compositors.

use crate::render::RenderId;
use crate::render_object::PaintRecord;
use core::fmt;

/// Receives paint output from the render tree.
///
/// Implemented by whatever owns the platform layers. Calls happen on the UI thread, during
/// [`RenderTree::flush_render`](crate::render::RenderTree::flush_render).
pub trait Compositor {
    /// Error type.
    type Error: fmt::Display;

    /// Paints a node. The record's rectangles are in window coordinates.
    fn paint(&mut self, node: RenderId, record: &PaintRecord) -> Result<(), Self::Error>;

    /// Releases any resources held for a node that has been torn down.
    fn release(&mut self, node: RenderId) -> Result<(), Self::Error>;
}
