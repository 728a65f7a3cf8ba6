//! Bridge from blocking call sites onto asynchronous protocol code.
//!
//! All MCP traffic in the process runs on one [`RuntimeExecutor`]: a worker
//! thread that owns a single-threaded tokio runtime. Synchronous callers
//! submit a future and park until its output comes back. Tests substitute
//! [`InlineExecutor`], which polls the future to completion on the caller's
//! own thread.

use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, ThreadId};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to start background runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("background runtime has stopped")]
    Stopped,
    #[error("background task ended without producing a result")]
    Dropped,
    #[error("blocking submit from the executor's own thread would deadlock")]
    Reentrant,
}

pub trait TaskExecutor: Send + Sync {
    /// Queues a task; it must eventually be polled to completion.
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), ExecutorError>;

    /// Whether the current thread is the one that drives submitted tasks.
    fn is_worker_thread(&self) -> bool {
        false
    }
}

impl dyn TaskExecutor {
    /// Runs `future` on the executor and blocks the calling thread on its output.
    pub fn block_on<F, T>(&self, future: F) -> Result<T, ExecutorError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_worker_thread() {
            return Err(ExecutorError::Reentrant);
        }

        let (tx, rx) = std_mpsc::sync_channel(1);
        self.spawn(Box::pin(async move {
            let _ = tx.send(future.await);
        }))?;
        rx.recv().map_err(|_| ExecutorError::Dropped)
    }
}

/// Dedicated worker thread owning a current-thread tokio runtime.
pub struct RuntimeExecutor {
    sender: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
    worker: ThreadId,
}

static SHARED: OnceCell<Arc<RuntimeExecutor>> = OnceCell::new();

impl RuntimeExecutor {
    pub fn start(thread_name: &str) -> Result<Self, ExecutorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ExecutorError::Runtime)?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<BoxFuture<'static, ()>>();

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(task) = receiver.recv().await {
                        tokio::spawn(task);
                    }
                });
                debug!("background executor drained");
            })
            .map_err(ExecutorError::Runtime)?;

        debug!(thread = thread_name, "background executor started");
        Ok(Self {
            sender,
            worker: handle.thread().id(),
        })
    }

    /// The process-wide executor, started on first use.
    pub fn shared() -> Result<Arc<RuntimeExecutor>, ExecutorError> {
        SHARED
            .get_or_try_init(|| RuntimeExecutor::start("reagent-mcp").map(Arc::new))
            .cloned()
    }
}

impl TaskExecutor for RuntimeExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), ExecutorError> {
        self.sender.send(task).map_err(|_| ExecutorError::Stopped)
    }

    fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker
    }
}

/// Polls each task to completion on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), ExecutorError> {
        futures::executor::block_on(task);
        Ok(())
    }
}
