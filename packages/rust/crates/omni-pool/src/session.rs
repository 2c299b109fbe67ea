//! Read sessions: a consumer's streaming identity across repeated resubmission.
//!
//! A session carries its own position as `committed + pending`. The coordinator only
//! reads that self-reported position; it keeps no per-session state between events.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::PoolError;

/// Where a read starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartOffset {
    /// Oldest element still retained when the request is first serviced.
    Earliest,
    /// A concrete offset.
    At(u64),
}

impl From<u64> for StartOffset {
    fn from(offset: u64) -> Self {
        Self::At(offset)
    }
}

/// Negative offsets mean "earliest available".
impl From<i64> for StartOffset {
    fn from(offset: i64) -> Self {
        u64::try_from(offset).map_or(Self::Earliest, Self::At)
    }
}

/// Per-consumer request handle: cancellation, output sink, error sink and position.
pub struct ReadSession<T> {
    id: u64,
    cancel: CancellationToken,
    sink: mpsc::Sender<T>,
    errors: Option<oneshot::Sender<PoolError>>,
    committed: StartOffset,
    pending: u64,
}

impl<T> ReadSession<T> {
    /// Build a session that pushes into `sink` and reports terminal errors on `errors`.
    pub fn new(
        id: u64,
        cancel: CancellationToken,
        sink: mpsc::Sender<T>,
        errors: oneshot::Sender<PoolError>,
        start: impl Into<StartOffset>,
    ) -> Self {
        Self {
            id,
            cancel,
            sink,
            errors: Some(errors),
            committed: start.into(),
            pending: 0,
        }
    }

    /// Session identifier (for logs).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Committed offset plus everything pushed since the last commit.
    ///
    /// Stays `Earliest` until the coordinator resolves it.
    #[must_use]
    pub fn position(&self) -> StartOffset {
        match self.committed {
            StartOffset::Earliest => StartOffset::Earliest,
            StartOffset::At(offset) => StartOffset::At(offset + self.pending),
        }
    }

    /// Elements pushed since the last commit.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Pin the session to `offset` and reset the delivered count.
    pub fn commit(&mut self, offset: u64) {
        self.committed = StartOffset::At(offset);
        self.pending = 0;
    }

    /// True once the session's token fired or its consumer dropped the stream.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.sink.is_closed()
    }

    /// Resolves when the session is cancelled or its consumer went away.
    pub async fn cancelled(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = self.sink.closed() => {}
        }
    }

    /// Push `items` in order, stopping at the first cancellation of the session or
    /// of `shutdown`. Returns the number pushed; it is added to the position.
    pub async fn push_all<I>(&mut self, items: I, shutdown: &CancellationToken) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut pushed: usize = 0;
        for item in items {
            let delivered = tokio::select! {
                biased;
                () = self.cancel.cancelled() => false,
                () = shutdown.cancelled() => false,
                sent = self.sink.send(item) => sent.is_ok(),
            };
            if !delivered {
                break;
            }
            pushed += 1;
        }
        self.pending += u64::try_from(pushed).unwrap_or(u64::MAX);
        pushed
    }

    /// Deliver a terminal error and drop the session, closing its consumer stream.
    pub fn report_error(mut self, error: PoolError) {
        tracing::warn!(session = self.id, "read session terminated: {error}");
        if let Some(errors) = self.errors.take() {
            let _ = errors.send(error);
        }
    }
}

impl<T> fmt::Debug for ReadSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSession")
            .field("id", &self.id)
            .field("committed", &self.committed)
            .field("pending", &self.pending)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
