//! Error types.
//!
//! Reconciliation itself never fails; these are returned from the edges where a caller can react
//! (render updates, task round trips, configuration).

use crate::executor::TaskType;
use crate::render::RenderId;
use crate::render_object::RenderKind;
use std::io;
use thiserror::Error;

/// Errors from updating a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The declared properties are for a different kind of render node.
    #[error("cannot update {expected:?} render node with {found:?} properties")]
    TypeMismatch {
        expected: RenderKind,
        found: RenderKind,
    },
    /// The render node does not exist (anymore).
    #[error("no such render node: {0:?}")]
    NoSuchNode(RenderId),
}

/// Errors from posting tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The receiving side of the queue is gone.
    #[error("task queue has been disconnected")]
    Disconnected,
    /// A synchronous task did not complete in time.
    #[error("synchronous task timed out after {0} ms")]
    Timeout(u64),
    /// A synchronous task was posted from the thread that is supposed to run it.
    #[error("cannot wait for a {0:?} task on its own thread")]
    SameThread(TaskType),
}

/// Errors from loading a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
