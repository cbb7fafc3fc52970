//! Task queues that marshal work onto the threads that own it.
//!
//! Element and render trees are confined to the UI thread. Other threads hand work to it by posting
//! UI tasks, which receive `&mut` access to the UI thread's state when the UI thread drains its
//! queue.

use crate::error::ExecutorError;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Kinds of task queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Platform,
    Ui,
    Io,
    Gpu,
    Js,
    /// Runs on a worker thread owned by the executor.
    Background,
}

const DRAINED_TYPES: [TaskType; 4] = [
    TaskType::Platform,
    TaskType::Io,
    TaskType::Gpu,
    TaskType::Js,
];

pub type Task = Box<dyn FnOnce() + Send>;
pub type UiTask<U> = Box<dyn FnOnce(&mut U) + Send>;

struct Queue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Queue<T> {
    fn new() -> Queue<T> {
        let (sender, receiver) = channel::unbounded();
        Queue { sender, receiver }
    }
}

enum Pending<U> {
    Task(TaskType, Task),
    Ui(UiTask<U>),
}

struct Delayed<U> {
    due: Instant,
    task: Pending<U>,
}

/// Per-thread task queues for one container.
///
/// `U` is the state owned by the UI thread.
pub struct TaskExecutor<U> {
    ui: Queue<UiTask<U>>,
    queues: HashMap<TaskType, Queue<Task>>,
    delayed: Mutex<Vec<Delayed<U>>>,
    owners: Mutex<HashMap<TaskType, ThreadId>>,
    background: Mutex<Option<Sender<Task>>>,
}

impl<U> TaskExecutor<U> {
    pub fn new() -> TaskExecutor<U> {
        TaskExecutor {
            ui: Queue::new(),
            queues: DRAINED_TYPES.iter().map(|ty| (*ty, Queue::new())).collect(),
            delayed: Mutex::new(Vec::new()),
            owners: Mutex::new(HashMap::new()),
            background: Mutex::new(None),
        }
    }

    /// Makes the current thread the owner of a task type.
    pub fn bind_current_thread(&self, ty: TaskType) {
        if ty == TaskType::Background {
            warn!("the background worker cannot be rebound");
            return;
        }
        self.owners.lock().insert(ty, thread::current().id());
    }

    /// Returns true if the current thread owns the task type.
    pub fn will_run_on_current_thread(&self, ty: TaskType) -> bool {
        self.owners.lock().get(&ty) == Some(&thread::current().id())
    }

    /// Posts a task to run on the owner of `ty`.
    pub fn post_task<F>(&self, ty: TaskType, task: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Pending::Task(ty, Box::new(task)))
    }

    /// Posts a task that needs the UI thread's state.
    pub fn post_ui_task<F>(&self, task: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(&mut U) + Send + 'static,
    {
        self.send(Pending::Ui(Box::new(task)))
    }

    /// Posts a task that becomes runnable after `delay`.
    pub fn post_delayed_task<F>(&self, ty: TaskType, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.delayed.lock().push(Delayed {
            due: Instant::now() + delay,
            task: Pending::Task(ty, Box::new(task)),
        });
    }

    pub fn post_delayed_ui_task<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce(&mut U) + Send + 'static,
    {
        self.delayed.lock().push(Delayed {
            due: Instant::now() + delay,
            task: Pending::Ui(Box::new(task)),
        });
    }

    fn send(&self, task: Pending<U>) -> Result<(), ExecutorError> {
        match task {
            Pending::Ui(task) => self
                .ui
                .sender
                .send(task)
                .map_err(|_| ExecutorError::Disconnected),
            Pending::Task(TaskType::Ui, task) => self
                .ui
                .sender
                .send(Box::new(move |_: &mut U| task()))
                .map_err(|_| ExecutorError::Disconnected),
            Pending::Task(TaskType::Background, task) => self
                .background_sender()?
                .send(task)
                .map_err(|_| ExecutorError::Disconnected),
            Pending::Task(ty, task) => match self.queues.get(&ty) {
                Some(queue) => queue
                    .sender
                    .send(task)
                    .map_err(|_| ExecutorError::Disconnected),
                None => Err(ExecutorError::Disconnected),
            },
        }
    }

    fn background_sender(&self) -> Result<Sender<Task>, ExecutorError> {
        let mut background = self.background.lock();
        if let Some(sender) = &*background {
            return Ok(sender.clone());
        }

        let (sender, receiver) = channel::unbounded::<Task>();
        let handle = thread::Builder::new()
            .name("ace-background".into())
            .spawn(move || {
                for task in receiver {
                    task();
                }
            });
        match handle {
            Ok(handle) => {
                self.owners
                    .lock()
                    .insert(TaskType::Background, handle.thread().id());
            }
            Err(err) => {
                error!("failed to spawn background worker: {}", err);
                return Err(ExecutorError::Disconnected);
            }
        }
        *background = Some(sender.clone());
        Ok(sender)
    }

    /// Moves delayed tasks that are due into their queues.
    fn promote_due(&self) {
        let now = Instant::now();
        let mut due: Vec<Delayed<U>> = {
            let mut delayed = self.delayed.lock();
            let (due, waiting): (Vec<_>, Vec<_>) =
                delayed.drain(..).partition(|task| task.due <= now);
            *delayed = waiting;
            due
        };
        due.sort_by_key(|task| task.due);
        for task in due {
            if let Err(err) = self.send(task.task) {
                error!("failed to queue delayed task: {}", err);
            }
        }
    }

    fn check_owner(&self, ty: TaskType) -> bool {
        match self.owners.lock().get(&ty) {
            Some(owner) if *owner != thread::current().id() => {
                warn!("refusing to run {:?} tasks outside of their thread", ty);
                false
            }
            _ => true,
        }
    }

    /// Runs every queued task of a type that does not need the UI state. Returns how many ran.
    pub fn run_pending(&self, ty: TaskType) -> usize {
        let queue = match self.queues.get(&ty) {
            Some(queue) => queue,
            None => {
                warn!("{:?} tasks cannot be drained with run_pending", ty);
                return 0;
            }
        };
        if !self.check_owner(ty) {
            return 0;
        }
        self.promote_due();

        let mut count = 0;
        loop {
            match queue.receiver.try_recv() {
                Ok(task) => {
                    task();
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Runs queued UI tasks against the UI state, at most `limit` of them (0 for no limit).
    /// Returns how many ran.
    pub fn run_pending_ui(&self, ui: &mut U, limit: usize) -> usize {
        if !self.check_owner(TaskType::Ui) {
            return 0;
        }
        self.promote_due();

        let mut count = 0;
        while limit == 0 || count < limit {
            match self.ui.receiver.try_recv() {
                Ok(task) => {
                    task(ui);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if count > 0 {
            debug!("ran {} UI tasks", count);
        }
        count
    }

    /// Runs a task on the owner of `ty` and waits at most `timeout` for its result.
    ///
    /// Runs inline if the current thread is the owner.
    pub fn post_sync_task<F, R>(
        &self,
        ty: TaskType,
        timeout: Duration,
        task: F,
    ) -> Result<R, ExecutorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.will_run_on_current_thread(ty) {
            return Ok(task());
        }
        let (sender, receiver) = channel::bounded(1);
        self.post_task(ty, move || {
            let _ = sender.send(task());
        })?;
        wait(&receiver, ty, timeout)
    }

    /// Runs a task against the UI state and waits at most `timeout` for its result.
    ///
    /// Must not be called on the UI thread, which could never get to the task while waiting.
    pub fn post_sync_ui_task<F, R>(&self, timeout: Duration, task: F) -> Result<R, ExecutorError>
    where
        F: FnOnce(&mut U) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.will_run_on_current_thread(TaskType::Ui) {
            return Err(ExecutorError::SameThread(TaskType::Ui));
        }
        let (sender, receiver) = channel::bounded(1);
        self.post_ui_task(move |ui| {
            let _ = sender.send(task(ui));
        })?;
        wait(&receiver, TaskType::Ui, timeout)
    }
}

fn wait<R>(receiver: &Receiver<R>, ty: TaskType, timeout: Duration) -> Result<R, ExecutorError> {
    match receiver.recv_timeout(timeout) {
        Ok(result) => Ok(result),
        Err(RecvTimeoutError::Timeout) => {
            let millis = timeout.as_millis() as u64;
            warn!("{:?} task did not finish within {} ms", ty, millis);
            Err(ExecutorError::Timeout(millis))
        }
        // the task was dropped without running
        Err(RecvTimeoutError::Disconnected) => Err(ExecutorError::Disconnected),
    }
}

impl<U> Default for TaskExecutor<U> {
    fn default() -> Self {
        TaskExecutor::new()
    }
}

impl<U> fmt::Debug for TaskExecutor<U> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("owners", &*self.owners.lock())
            .field("ui_pending", &self.ui.receiver.len())
            .field("delayed", &self.delayed.lock().len())
            .finish()
    }
}
