use crate::error::{Result, StrataError};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::JoinHandle;

/// Progress of a non-blocking transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransferState {
    /// Issued but not yet picked up by the runtime.
    Posted = 0,
    InProgress = 1,
    /// Finished, successfully or not. [`TransferHandle::wait`] yields the outcome.
    Complete = 2,
}

impl TransferState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TransferState::Posted,
            1 => TransferState::InProgress,
            _ => TransferState::Complete,
        }
    }
}

/// A handle to a non-blocking strided transfer.
///
/// The transfer runs in a spawned task. Call `wait()` to obtain its result,
/// or `test()` to poll for completion. Buffers handed to the transfer are
/// owned by the task and come back through `wait()`.
///
/// If dropped without calling `wait()`, the background task is aborted.
pub struct TransferHandle<T> {
    inner: Option<JoinHandle<Result<T>>>,
    state: Arc<AtomicU8>,
}

impl<T: Send + 'static> TransferHandle<T> {
    /// Spawn `fut` as a non-blocking transfer and return a handle.
    pub(crate) fn spawn(fut: impl Future<Output = Result<T>> + Send + 'static) -> Self {
        let state = Arc::new(AtomicU8::new(TransferState::Posted as u8));
        let task_state = Arc::clone(&state);
        let inner = tokio::spawn(async move {
            task_state.store(TransferState::InProgress as u8, Ordering::Release);
            let out = fut.await;
            task_state.store(TransferState::Complete as u8, Ordering::Release);
            out
        });
        Self {
            inner: Some(inner),
            state,
        }
    }

    pub fn state(&self) -> TransferState {
        TransferState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns true once the transfer has finished (non-blocking).
    pub fn test(&self) -> bool {
        self.state() == TransferState::Complete
            || self.inner.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the transfer to complete and propagate any error.
    pub async fn wait(mut self) -> Result<T> {
        let handle = self
            .inner
            .take()
            .ok_or_else(|| StrataError::TaskFailed("transfer handle already consumed".into()))?;
        handle
            .await
            .map_err(|e| StrataError::TaskFailed(format!("transfer task failed: {e}")))?
    }
}

impl<T> Drop for TransferHandle<T> {
    fn drop(&mut self) {
        if let Some(handle) = &self.inner {
            handle.abort();
        }
    }
}

/// A set of non-blocking transfers waited on together.
pub struct TransferGroup<T> {
    handles: Vec<TransferHandle<T>>,
}

impl<T: Send + 'static> TransferGroup<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn push(&mut self, h: TransferHandle<T>) {
        self.handles.push(h);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every transfer in the group.
    ///
    /// All tasks are awaited regardless of errors. Returns the outputs in
    /// push order, or the first error encountered.
    pub async fn wait_all(self) -> Result<Vec<T>> {
        let mut outputs = Vec::with_capacity(self.handles.len());
        let mut first_err = None;
        for h in self.handles {
            match h.wait().await {
                Ok(v) => outputs.push(v),
                Err(e) if first_err.is_none() => first_err = Some(e),
                Err(_) => {}
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}

impl<T: Send + 'static> Default for TransferGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}
