//! UI reconciliation core.
//!
//! # Conceptual overview
//!
//! ## Components, elements and render nodes
//! A component is a declarative description of a UI node: a kind, an optional key, and a list of
//! child components. Components are cheap to create and are thrown away once they have been
//! reconciled. Elements are the live instances built from components. An element keeps the
//! component it was last built from, owns its child elements, and owns at most one render node.
//! Render nodes hold layout and paint state and form their own tree, which skips elements that
//! produce no render node of their own.
//!
//! When a new component tree arrives, each element diffs its children against the new child
//! components. Children that can be updated (same kind, same key) are kept and updated in place;
//! everything else is torn down and rebuilt. Repeated blocks match children by key so that
//! reordered items keep their identity.
//!
//! ## Slots
//! Every element has a slot (its position among its siblings) and a render slot (the position of
//! its first render node among the children of its render parent). Elements that produce zero or
//! several render nodes shift the render slots of everything after them, so each diff keeps a
//! running count of the render nodes placed so far.
//!
//! ## Frames
//! Render nodes that changed are marked as needing layout, which propagates up to the nearest node
//! that bounds layout. A frame lays out every dirty node, shallowest first, and then repaints every
//! dirty repaint boundary through a [`Compositor`].
//!
//! ## Threads
//! All of this is owned by a [`Container`] and confined to the thread that created it. Other
//! threads post tasks to it through a [`ContainerHandle`].
//!
//! ## Coordinate System
//! The origin is at the top left corner of the window's content area, with positive y pointing
//! down.

pub mod component;
pub mod compositor;
pub mod config;
pub mod container;
pub mod element;
pub mod error;
pub mod executor;
mod for_each;
pub mod layout;
mod multi_composed;
pub mod rect;
pub mod render;
pub mod render_object;
pub mod texture;
pub mod tree;

pub use component::{Component, ComponentKind, ComposeId, UpdateType};
pub use compositor::Compositor;
pub use config::PipelineConfig;
pub use container::{Container, ContainerHandle, ContainerId, FrameStats};
pub use element::{Element, ElementId, ElementKind};
pub use error::{ConfigError, ExecutorError, UpdateError};
pub use executor::{TaskExecutor, TaskType};
pub use layout::LayoutParam;
pub use rect::Rect;
pub use render::{AnimationTick, RenderId, RenderNode, RenderState, RenderTree};
pub use render_object::{FlexSpec, PaintRecord, RenderKind, RenderSpec, TextSpec, TextureSpec};
pub use tree::ElementTree;
