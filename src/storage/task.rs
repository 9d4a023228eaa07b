// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Transfer tasks: handles over one in-flight upload or download.
//!
//! A backend starts its operation on the runtime and hands back a
//! [`TaskHandle`]. The handle resolves exactly once, to the operation's result
//! or to [`Error::Canceled`] when it was cancelled first.

use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::metadata::{from_resource, FullMetadata};
use super::native::ObjectResource;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Success,
    Canceled,
    Error,
}

/// Point-in-time view of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub state: TaskState,
}

impl TaskSnapshot {
    fn running(total_bytes: u64) -> Self {
        Self {
            bytes_transferred: 0,
            total_bytes,
            state: TaskState::Running,
        }
    }

    /// Progress as a percentage (0.0 to 100.0).
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.state == TaskState::Success {
                100.0
            } else {
                0.0
            };
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Lets the running operation publish progress into its task.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: Arc<watch::Sender<TaskSnapshot>>,
}

impl ProgressReporter {
    /// Record `bytes` more transferred, capped at the total.
    pub fn advance(&self, bytes: u64) {
        self.sender.send_modify(|snapshot| {
            snapshot.bytes_transferred = snapshot
                .bytes_transferred
                .saturating_add(bytes)
                .min(snapshot.total_bytes);
        });
    }

    /// Replace the total once the real payload size is known.
    pub fn set_total(&self, total_bytes: u64) {
        self.sender.send_modify(|snapshot| {
            snapshot.total_bytes = total_bytes;
            snapshot.bytes_transferred = snapshot.bytes_transferred.min(total_bytes);
        });
    }

    fn finish(&self, succeeded: bool) {
        self.sender.send_if_modified(|snapshot| {
            if snapshot.state != TaskState::Running {
                return false;
            }
            if succeeded {
                snapshot.bytes_transferred = snapshot.total_bytes;
                snapshot.state = TaskState::Success;
            } else {
                snapshot.state = TaskState::Error;
            }
            true
        });
    }
}

/// Backend pending-operation handle.
#[derive(Debug)]
pub struct TaskHandle<T> {
    handle: JoinHandle<Result<T>>,
    snapshots: Arc<watch::Sender<TaskSnapshot>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Start `operation` on the runtime and return its handle immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(total_bytes: u64, operation: F) -> Self
    where
        F: FnOnce(ProgressReporter) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (sender, _) = watch::channel(TaskSnapshot::running(total_bytes));
        let snapshots = Arc::new(sender);
        let reporter = ProgressReporter {
            sender: Arc::clone(&snapshots),
        };
        let operation = operation(reporter.clone());

        let handle = tokio::spawn(async move {
            let result = operation.await;
            reporter.finish(result.is_ok());
            result
        });

        Self { handle, snapshots }
    }

    /// A task that fails with `error` without doing any work.
    pub fn failed(error: Error) -> Self {
        Self::spawn(0, move |_| async move { Err(error) })
    }
}

impl<T> TaskHandle<T> {
    pub fn snapshot(&self) -> TaskSnapshot {
        *self.snapshots.borrow()
    }

    /// Receive every snapshot change from now on.
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.snapshots.subscribe()
    }

    /// Cancel the operation. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        if self.handle.is_finished() {
            return false;
        }
        self.handle.abort();
        let canceled = self.snapshots.send_if_modified(|snapshot| {
            if snapshot.state == TaskState::Running {
                snapshot.state = TaskState::Canceled;
                true
            } else {
                false
            }
        });
        if canceled {
            let snapshot = self.snapshot();
            debug!(
                "Canceled transfer task bytes_transferred={} total_bytes={}",
                snapshot.bytes_transferred, snapshot.total_bytes
            );
        }
        canceled
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().handle.poll_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => Poll::Ready(Err(
                Error::Canceled("transfer task was canceled".to_string()),
            )),
            Poll::Ready(Err(join_error)) => {
                Poll::Ready(Err(Error::unknown("task-failed", join_error.to_string())))
            }
        }
    }
}

/// An upload started by a reference. Awaiting it yields the stored object's metadata.
#[derive(Debug)]
pub struct UploadTask {
    inner: TaskHandle<ObjectResource>,
}

impl UploadTask {
    pub(crate) fn new(inner: TaskHandle<ObjectResource>) -> Self {
        Self { inner }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.inner.subscribe()
    }

    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }
}

impl Future for UploadTask {
    type Output = Result<FullMetadata>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner)
            .poll(cx)
            .map(|result| result.map(from_resource))
    }
}

/// A download into a local file. Awaiting it yields the number of bytes written.
#[derive(Debug)]
pub struct DownloadTask {
    inner: TaskHandle<u64>,
}

impl DownloadTask {
    pub(crate) fn new(inner: TaskHandle<u64>) -> Self {
        Self { inner }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.inner.subscribe()
    }

    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }
}

impl Future for DownloadTask {
    type Output = Result<u64>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_task_resolves_with_result() {
        let task = TaskHandle::spawn(10, |progress| async move {
            progress.advance(4);
            Ok(42u32)
        });
        assert_eq!(task.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_task_success_snapshot() {
        let task = TaskHandle::spawn(10, |progress| async move {
            progress.advance(4);
            Ok(())
        });
        let mut updates = task.subscribe();
        updates
            .wait_for(|snapshot| snapshot.state == TaskState::Success)
            .await
            .unwrap();

        let snapshot = task.snapshot();
        assert_eq!(snapshot.bytes_transferred, 10);
        assert_eq!(snapshot.percent(), 100.0);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_task_failure_propagates() {
        let task: TaskHandle<()> = TaskHandle::failed(Error::NotFound("x".to_string()));
        let mut updates = task.subscribe();
        let result = task.await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        updates
            .wait_for(|snapshot| snapshot.state == TaskState::Error)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let (_keep_open, blocker) = oneshot::channel::<()>();
        let task = TaskHandle::spawn(100, |_| async move {
            let _ = blocker.await;
            Ok(())
        });

        assert_eq!(task.snapshot().state, TaskState::Running);
        assert!(task.cancel());
        assert_eq!(task.snapshot().state, TaskState::Canceled);

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap();
        assert!(matches!(result, Err(Error::Canceled(_))));
    }

    #[tokio::test]
    async fn test_progress_is_capped_at_total() {
        let (release, blocker) = oneshot::channel::<()>();
        let task = TaskHandle::spawn(8, |progress| async move {
            progress.advance(5);
            progress.advance(5);
            let _ = blocker.await;
            Ok(())
        });

        let mut updates = task.subscribe();
        updates
            .wait_for(|snapshot| snapshot.bytes_transferred == 8)
            .await
            .unwrap();
        assert_eq!(task.snapshot().state, TaskState::Running);
        release.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_set_total() {
        let task = TaskHandle::spawn(3, |progress| async move {
            progress.set_total(12);
            progress.advance(6);
            Ok(())
        });
        let mut updates = task.subscribe();
        let snapshot = *updates
            .wait_for(|snapshot| snapshot.state == TaskState::Success)
            .await
            .unwrap();
        assert_eq!(snapshot.total_bytes, 12);
        assert_eq!(snapshot.bytes_transferred, 12);
    }

    #[test]
    fn test_percent() {
        let snapshot = TaskSnapshot {
            bytes_transferred: 25,
            total_bytes: 100,
            state: TaskState::Running,
        };
        assert_eq!(snapshot.percent(), 25.0);
        assert_eq!(TaskSnapshot::running(0).percent(), 0.0);
    }
}
