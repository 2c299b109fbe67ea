//! Tasks running off the coordinator loop: feed forwarding, parking, delivery and
//! request submission.

use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{PoolError, SessionStage};
use crate::session::ReadSession;

use super::Shared;

enum Wake {
    Cancelled,
    Closed,
    Gate,
}

pub(super) async fn forward_feed<T, S>(
    producer: S,
    feed_tx: mpsc::Sender<T>,
    cancel: CancellationToken,
    closed: CancellationToken,
) where
    S: Stream<Item = T>,
{
    let mut producer = pin!(producer);
    let mut forwarded: u64 = 0;
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            () = closed.cancelled() => None,
            item = producer.next() => item,
        };
        let Some(item) = next else {
            break;
        };
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = closed.cancelled() => false,
            sent = feed_tx.send(item) => sent.is_ok(),
        };
        if !sent {
            break;
        }
        forwarded += 1;
    }
    tracing::trace!(forwarded, "feed finished");
}

impl<T: Send + 'static> Shared<T> {
    /// Hand `session` to the coordinator, or fail it if the pool is gone.
    pub(super) async fn submit(&self, session: ReadSession<T>) {
        let permit = tokio::select! {
            biased;
            () = session.cancelled() => {
                tracing::trace!(session = session.id(), "read session cancelled before submit");
                return;
            }
            () = self.closed.cancelled() => None,
            permit = self.requests.reserve() => permit.ok(),
        };
        match permit {
            Some(permit) => permit.send(session),
            None => session.report_error(PoolError::SessionAborted(SessionStage::Queued)),
        }
    }

    /// Park until the gate fires, then resubmit.
    pub(super) async fn wait_and_resubmit(
        self: Arc<Self>,
        session: ReadSession<T>,
        gate: CancellationToken,
    ) {
        let wake = tokio::select! {
            biased;
            () = session.cancelled() => Wake::Cancelled,
            () = self.closed.cancelled() => Wake::Closed,
            () = gate.cancelled() => Wake::Gate,
        };
        match wake {
            Wake::Cancelled => {
                tracing::trace!(session = session.id(), "parked read session cancelled");
            }
            Wake::Closed => session.report_error(PoolError::SessionAborted(SessionStage::Parked)),
            Wake::Gate => self.submit(session).await,
        }
    }

    /// Push `items` to the session's consumer, then resubmit for the next offset.
    pub(super) async fn deliver_and_resubmit(
        self: Arc<Self>,
        mut session: ReadSession<T>,
        items: Vec<T>,
    ) {
        let offered = items.len();
        let pushed = session.push_all(items, &self.closed).await;
        if pushed < offered {
            tracing::trace!(
                session = session.id(),
                pushed,
                offered,
                "delivery stopped early"
            );
        }
        self.submit(session).await;
    }
}
