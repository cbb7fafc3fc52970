//! Containers: one window's worth of UI state, and the thread it lives on.

use crate::component::Component;
use crate::compositor::Compositor;
use crate::config::PipelineConfig;
use crate::element::ElementId;
use crate::error::ExecutorError;
use crate::executor::{TaskExecutor, TaskType};
use crate::rect::Rect;
use crate::render::{AnimationTick, RenderId};
use crate::tree::ElementTree;
use cgmath::{Vector2, Zero};
use core::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(Uuid);

impl ContainerId {
    fn new() -> ContainerId {
        ContainerId(Uuid::new_v4())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a frame did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// UI tasks run
    pub tasks: usize,
    /// Dirty layout roots processed
    pub laid_out: usize,
    /// Render nodes painted
    pub painted: usize,
    /// Window area that was repainted
    pub damage: Option<Rect>,
}

/// A UI session: the element tree of one window and the executor that feeds it.
///
/// The container lives on the thread that created it, which becomes the UI thread. Other threads
/// talk to it through a [`ContainerHandle`].
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    config: PipelineConfig,
    tree: ElementTree,
    executor: Arc<TaskExecutor<ElementTree>>,
}

impl Container {
    /// Creates a container and binds the current thread as its UI thread.
    pub fn new(config: PipelineConfig) -> Container {
        let executor = Arc::new(TaskExecutor::new());
        executor.bind_current_thread(TaskType::Ui);
        let id = ContainerId::new();
        debug!("created container {}", id);

        Container {
            id,
            tree: ElementTree::new(config.root_layout_param()),
            config,
            executor,
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn executor(&self) -> &Arc<TaskExecutor<ElementTree>> {
        &self.executor
    }

    /// Reconciles the tree against a new root component.
    pub fn rebuild(&mut self, component: Arc<Component>) -> Option<ElementId> {
        self.tree.mount(component)
    }

    /// Runs one frame: pending UI tasks, then layout, then paint.
    pub fn flush_frame<C: Compositor + ?Sized>(&mut self, compositor: &mut C) -> FrameStats {
        let tasks = self
            .executor
            .run_pending_ui(&mut self.tree, self.config.max_ui_tasks_per_frame);
        let render = self.tree.render_tree_mut();
        let laid_out = render.flush_layout();
        let painted = render.flush_render(compositor);

        FrameStats {
            tasks,
            laid_out,
            painted,
            damage: render.damage(),
        }
    }

    /// Returns a handle for talking to this container from other threads.
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle {
            id: self.id,
            executor: Arc::clone(&self.executor),
            sync_timeout: self.config.sync_task_timeout(),
        }
    }
}

/// A thread-safe handle to a container.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    id: ContainerId,
    executor: Arc<TaskExecutor<ElementTree>>,
    sync_timeout: Duration,
}

impl ContainerHandle {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Applies an animation tick on the UI thread at the next frame.
    pub fn post_animation_tick(
        &self,
        node: RenderId,
        tick: AnimationTick,
    ) -> Result<(), ExecutorError> {
        self.executor.post_ui_task(move |tree: &mut ElementTree| {
            tree.render_tree_mut().on_animation_callback(node, tick);
        })
    }

    /// Replaces the root component on the UI thread at the next frame.
    pub fn post_rebuild(&self, component: Arc<Component>) -> Result<(), ExecutorError> {
        self.executor.post_ui_task(move |tree: &mut ElementTree| {
            tree.mount(component);
        })
    }

    /// Asks the UI thread for a node's laid out size.
    ///
    /// Gives up after the configured timeout and returns a zero size instead.
    pub fn layout_size(&self, node: RenderId) -> Vector2<f64> {
        let result = self
            .executor
            .post_sync_ui_task(self.sync_timeout, move |tree: &mut ElementTree| {
                tree.render_tree().layout_size(node)
            });
        match result {
            Ok(size) => size,
            Err(err) => {
                warn!("layout size of {:?} unavailable: {}", node, err);
                Vector2::zero()
            }
        }
    }
}
