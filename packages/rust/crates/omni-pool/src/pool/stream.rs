//! Consumer-facing handles: the read stream and the shutdown signal.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::PoolError;

/// Live stream of elements for one read session.
///
/// Ends when the session is cancelled, the pool shuts down, or the session fails.
/// Dropping the stream cancels its session.
pub struct ReadStream<T> {
    items: mpsc::Receiver<T>,
    terminal: oneshot::Receiver<PoolError>,
    cancel: CancellationToken,
}

impl<T> ReadStream<T> {
    pub(super) fn new(
        items: mpsc::Receiver<T>,
        terminal: oneshot::Receiver<PoolError>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            items,
            terminal,
            cancel,
        }
    }

    /// Next element, or `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<T> {
        self.items.recv().await
    }

    /// Stop this session only. Elements already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Error that ended the session, if it ended with one.
    pub fn terminal_error(&mut self) -> Option<PoolError> {
        self.terminal.try_recv().ok()
    }
}

impl<T> Stream for ReadStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().items.poll_recv(cx)
    }
}

impl<T> Drop for ReadStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Fires when the pool stops accepting feeds and read requests.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    closed: CancellationToken,
}

impl ShutdownSignal {
    pub(super) fn new(closed: CancellationToken) -> Self {
        Self { closed }
    }

    /// Resolves once the pool has closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// True once the pool has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
