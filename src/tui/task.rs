//! Background work polled from the input loop.
//!
//! A worker gets its inputs up front and reports once through a oneshot
//! channel. It never sees the view or the table; the loop picks up the
//! result on its next tick.

use std::future::Future;
use tokio::sync::oneshot::{self, error::TryRecvError};

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T> {
    NotStarted,
    Running,
    Completed(T),
    Failed(String),
}

pub struct TaskHandle<T> {
    state: TaskState<T>,
    rx: Option<oneshot::Receiver<Result<T, String>>>,
}

impl<T: Send + 'static> Default for TaskHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskHandle<T> {
    pub fn new() -> Self {
        Self {
            state: TaskState::NotStarted,
            rx: None,
        }
    }

    /// Spawn `work` unless a previous run is still going. Returns whether a
    /// worker was started.
    pub fn start<F>(&mut self, work: F) -> bool
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = work.await.map_err(|e| format!("{:#}", e));
            if tx.send(result).is_err() {
                tracing::debug!("Background task finished after its handle was dropped");
            }
        });

        self.rx = Some(rx);
        self.state = TaskState::Running;
        true
    }

    /// Non-blocking check for completion.
    pub fn poll(&mut self) -> &TaskState<T> {
        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(Ok(value)) => {
                    self.state = TaskState::Completed(value);
                    self.rx = None;
                }
                Ok(Err(message)) => {
                    self.state = TaskState::Failed(message);
                    self.rx = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    self.state = TaskState::Failed("background task stopped unexpectedly".into());
                    self.rx = None;
                }
            }
        }
        &self.state
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.poll(), TaskState::Running)
    }

    /// Hand over a finished result and go back to `NotStarted`.
    pub fn take_finished(&mut self) -> Option<Result<T, String>> {
        match self.poll() {
            TaskState::Completed(_) | TaskState::Failed(_) => {
                match std::mem::replace(&mut self.state, TaskState::NotStarted) {
                    TaskState::Completed(value) => Some(Ok(value)),
                    TaskState::Failed(message) => Some(Err(message)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
