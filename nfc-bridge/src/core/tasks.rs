//! Background task management
//!
//! Registers, starts and shuts down the bridge's long-running tasks.
//!
//! # Task kinds
//!
//! - [`TaskKind::Worker`] - blocking worker on the blocking pool (reader loop)
//! - [`TaskKind::Listener`] - async event listener

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Task kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Long-running blocking worker
    Worker,
    /// Event listener
    Listener,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Worker => write!(f, "Worker"),
            TaskKind::Listener => write!(f, "Listener"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
///
/// tasks.spawn_blocking("nfc_reader", move || handler.run());
/// tasks.spawn("tag_notifier", TaskKind::Listener, async move {
///     // consume events
/// });
///
/// // Graceful shutdown
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Use an existing token as the shutdown signal
    pub fn with_token(shutdown: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            shutdown,
        }
    }

    /// Token tasks watch for the shutdown signal
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register and start an async task
    ///
    /// Panics are caught and logged. A task finishing before shutdown is
    /// logged as unexpected.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let wrapped_future = async move {
            let result = AssertUnwindSafe(future).catch_unwind().await;
            report_exit(name, kind, &shutdown, result);
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    /// Register and start a blocking worker on the blocking pool
    pub fn spawn_blocking<F>(&mut self, name: &'static str, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let kind = TaskKind::Worker;
        let shutdown = self.shutdown.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(f));
            report_exit(name, kind, &shutdown, result);
        });
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Log a summary of registered tasks
    pub fn log_summary(&self) {
        let workers = self
            .tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Worker)
            .count();
        tracing::info!(
            "Background tasks registered: {} total (Worker: {}, Listener: {})",
            self.tasks.len(),
            workers,
            self.tasks.len() - workers
        );
    }

    /// Number of tasks that already terminated
    pub fn check_health(&self) -> usize {
        let failed = self
            .tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .inspect(|t| {
                tracing::error!(task = %t.name, kind = %t.kind, "Background task unexpectedly finished");
            })
            .count();
        if failed > 0 {
            tracing::error!(
                failed,
                total = self.tasks.len(),
                "Background task health check: {} task(s) failed",
                failed
            );
        }
        failed
    }

    /// Graceful shutdown: cancel and wait for every task
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn report_exit(
    name: &'static str,
    kind: TaskKind,
    shutdown: &CancellationToken,
    result: Result<(), Box<dyn std::any::Any + Send>>,
) {
    match result {
        Ok(()) if shutdown.is_cancelled() => {
            tracing::debug!(task = %name, kind = %kind, "Background task stopped");
        }
        Ok(()) => {
            tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
        }
        Err(panic_info) => {
            let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            tracing::error!(
                task = %name,
                kind = %kind,
                panic = %panic_msg,
                "Background task panicked! This is a bug that should be reported."
            );
        }
    }
}
