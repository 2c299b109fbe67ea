//! Pool handle: the public Feed / Read surface over the coordinator task.

mod coordinator;
mod stream;
mod tasks;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::buffer::WindowedBuffer;
use crate::config::PoolConfig;
use crate::error::Result;
use crate::policy::RetentionPolicy;
use crate::session::{ReadSession, StartOffset};

use coordinator::Coordinator;
pub use stream::{ReadStream, ShutdownSignal};

/// State shared between the handle, the coordinator and every spawned task.
struct Shared<T> {
    feed_tx: mpsc::Sender<T>,
    requests: mpsc::Sender<ReadSession<T>>,
    /// Fired by the coordinator once it stops taking events.
    closed: CancellationToken,
    tracker: TaskTracker,
    policy: RetentionPolicy,
    sink_capacity: usize,
    next_session: AtomicU64,
}

/// Shared append-only window read by many concurrent sessions.
///
/// Producers hand the pool a stream via [`Pool::feed`]; consumers call [`Pool::read`]
/// with a start offset and receive every later element as a live stream. No reader or
/// producer can block another: the buffer is owned by one coordinator task and all
/// delivery happens in per-session tasks.
///
/// Must be created inside a tokio runtime. The pool runs until the `shutdown` token
/// given at construction is cancelled.
pub struct Pool<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Pool<T> {
    /// Start a pool with `policy`, default channel capacities and `initial` elements at
    /// offsets `0..n`.
    ///
    /// # Errors
    ///
    /// [`crate::PoolError::Configuration`] if the policy sets no limit.
    pub fn new(
        shutdown: CancellationToken,
        policy: RetentionPolicy,
        initial: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        Self::with_config(shutdown, PoolConfig::with_policy(policy), initial)
    }

    /// Start a pool from a full [`PoolConfig`]. Channel capacities below one are raised
    /// to one; the seed is trimmed to the policy before the first event.
    ///
    /// # Errors
    ///
    /// [`crate::PoolError::Configuration`] if the config fails validation.
    pub fn with_config(
        shutdown: CancellationToken,
        config: PoolConfig,
        initial: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        config.validate()?;
        let config = config.normalized();

        let (feed_tx, feed_rx) = mpsc::channel::<T>(config.feed_capacity);
        let (requests, request_rx) = mpsc::channel::<ReadSession<T>>(config.request_capacity);

        let shared = Arc::new(Shared {
            feed_tx,
            requests,
            closed: CancellationToken::new(),
            tracker: TaskTracker::new(),
            policy: config.policy,
            sink_capacity: config.sink_capacity,
            next_session: AtomicU64::new(0),
        });

        let coordinator = Coordinator::new(
            Arc::clone(&shared),
            WindowedBuffer::with_elements(initial),
            feed_rx,
            request_rx,
        );
        shared.tracker.spawn(coordinator.run(shutdown));

        Ok(Self { shared })
    }

    /// Relay every item of `producer` into the pool until it ends, `cancel` fires, or
    /// the pool closes. Returns a signal that fires when the pool stops accepting feeds.
    pub fn feed<S>(&self, cancel: CancellationToken, producer: S) -> ShutdownSignal
    where
        S: Stream<Item = T> + Send + 'static,
    {
        self.shared.tracker.spawn(tasks::forward_feed(
            producer,
            self.shared.feed_tx.clone(),
            cancel,
            self.shared.closed.clone(),
        ));
        self.shutdown_signal()
    }

    /// Stream every element from `offset` on (`StartOffset::Earliest`, or any negative
    /// `i64`, for the oldest retained element).
    ///
    /// The stream closes when `cancel` fires, the stream is dropped, or the pool shuts
    /// down; in the last case [`ReadStream::terminal_error`] reports why.
    pub fn read(&self, cancel: CancellationToken, offset: impl Into<StartOffset>) -> ReadStream<T> {
        let session_cancel = cancel.child_token();
        let (sink, items) = mpsc::channel(self.shared.sink_capacity);
        let (errors_tx, errors_rx) = oneshot::channel();
        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed);
        let session = ReadSession::new(id, session_cancel.clone(), sink, errors_tx, offset);
        tracing::trace!(session = id, start = ?session.position(), "read session created");

        let shared = Arc::clone(&self.shared);
        self.shared
            .tracker
            .spawn(async move { shared.submit(session).await });

        ReadStream::new(items, errors_rx, session_cancel)
    }
}

impl<T> Pool<T> {
    /// Retention policy the pool was started with.
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        self.shared.policy
    }

    /// Signal observing pool closure.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal::new(self.shared.closed.clone())
    }

    /// True once the coordinator has stopped taking events.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Wait until the governing token fired and every internal task has exited.
    pub async fn wait_for_close(&self) {
        self.shared.tracker.wait().await;
    }
}
