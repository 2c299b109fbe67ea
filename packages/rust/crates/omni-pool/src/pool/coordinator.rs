//! Coordinator: the single task owning the window.
//!
//! Takes one event at a time (element arrival, read request, shutdown), so the
//! buffer needs no lock. Anything that may block on a consumer runs in a spawned task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::buffer::WindowedBuffer;
use crate::error::{PoolError, SessionStage};
use crate::gate::WaitGate;
use crate::session::{ReadSession, StartOffset};

use super::Shared;

pub(super) struct Coordinator<T> {
    shared: Arc<Shared<T>>,
    buffer: WindowedBuffer<T>,
    gate: WaitGate,
    feed_rx: mpsc::Receiver<T>,
    request_rx: mpsc::Receiver<ReadSession<T>>,
}

impl<T: Clone + Send + 'static> Coordinator<T> {
    pub(super) fn new(
        shared: Arc<Shared<T>>,
        buffer: WindowedBuffer<T>,
        feed_rx: mpsc::Receiver<T>,
        request_rx: mpsc::Receiver<ReadSession<T>>,
    ) -> Self {
        let mut coordinator = Self {
            shared,
            buffer,
            gate: WaitGate::new(),
            feed_rx,
            request_rx,
        };
        coordinator.apply_policy();
        coordinator
    }

    pub(super) async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            elements = self.buffer.len(),
            base_offset = self.buffer.base_offset(),
            max_bytes = self.shared.policy.max_bytes,
            max_count = self.shared.policy.max_count,
            "pool is starting"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(item) = self.feed_rx.recv() => self.on_element(item),
                Some(session) = self.request_rx.recv() => self.on_request(session),
            }
        }

        self.shut_down().await;
    }

    fn on_element(&mut self, item: T) {
        self.buffer.push(item);
        self.apply_policy();
        if self.gate.release() {
            tracing::trace!(
                tail_offset = self.buffer.tail_offset(),
                generation = self.gate.generation(),
                "wait-gate released"
            );
        }
    }

    fn on_request(&mut self, mut session: ReadSession<T>) {
        if session.is_cancelled() {
            tracing::trace!(session = session.id(), "dropping cancelled read session");
            return;
        }

        let base = self.buffer.base_offset();
        let position = match session.position() {
            StartOffset::Earliest => {
                session.commit(base);
                base
            }
            StartOffset::At(offset) if offset < base => {
                tracing::warn!(
                    session = session.id(),
                    requested = offset,
                    base_offset = base,
                    skipped = base - offset,
                    "requested offset was evicted, resuming at oldest retained element"
                );
                session.commit(base);
                base
            }
            StartOffset::At(offset) => offset,
        };

        let shared = Arc::clone(&self.shared);
        if self.buffer.length_from(position) == 0 {
            let gate = self.gate.acquire();
            self.shared
                .tracker
                .spawn(shared.wait_and_resubmit(session, gate));
        } else {
            let items = self.buffer.slice_from(position);
            self.shared
                .tracker
                .spawn(shared.deliver_and_resubmit(session, items));
        }
    }

    fn apply_policy(&mut self) {
        let policy = self.shared.policy;
        let mut evicted = 0;
        if policy.max_bytes > 0 {
            evicted += self.buffer.trim_to_size(policy.max_bytes);
        }
        if policy.max_count > 0 {
            evicted += self.buffer.trim_to_count(policy.max_count);
        }
        if evicted > 0 {
            tracing::debug!(
                evicted,
                base_offset = self.buffer.base_offset(),
                retained = self.buffer.len(),
                "retention policy trimmed window"
            );
        }
    }

    async fn shut_down(mut self) {
        // Closed must fire before the channels close so feeds and parked sessions stop
        // instead of racing a dead receiver.
        self.shared.closed.cancel();
        self.feed_rx.close();
        self.request_rx.close();

        // `recv` keeps yielding until every outstanding permit is used or dropped.
        let mut aborted = 0_usize;
        while let Some(session) = self.request_rx.recv().await {
            if session.is_cancelled() {
                continue;
            }
            session.report_error(PoolError::SessionAborted(SessionStage::Queued));
            aborted += 1;
        }
        self.gate.release();
        self.shared.tracker.close();

        tracing::info!(
            elements = self.buffer.len(),
            base_offset = self.buffer.base_offset(),
            aborted,
            "pool shutting down"
        );
    }
}
