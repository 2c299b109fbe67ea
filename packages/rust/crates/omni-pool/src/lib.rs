//! omni-pool: in-memory, append-only, offset-addressed data window.
//!
//! Many producers append, many readers stream from any offset, and a retention
//! policy evicts the oldest elements once a byte or count ceiling is exceeded.
//!
//! # Architecture
//!
//! ```text
//! Pool::feed(stream) ──► forward task ──► feed channel ─┐
//!                                                        ▼
//!                                   Coordinator (owns WindowedBuffer)
//!                                     append → trim → release WaitGate
//!                                                        ▲
//! Pool::read(offset) ──► ReadSession ──► request channel ┘
//!                          │  no data: park on WaitGate, resubmit on release
//!                          └─ data:    deliver slice off-loop, resubmit
//! ```
//!
//! Logging goes through `tracing`; install a subscriber to see it.

mod buffer;
mod config;
mod error;
mod gate;
mod policy;
mod pool;
mod session;

pub use buffer::WindowedBuffer;
pub use config::{
    DEFAULT_FEED_CAPACITY, DEFAULT_REQUEST_CAPACITY, DEFAULT_SINK_CAPACITY, PoolConfig,
};
pub use error::{PoolError, Result, SessionStage};
pub use gate::WaitGate;
pub use policy::{DEFAULT_MAX_BYTES, RetentionPolicy};
pub use pool::{Pool, ReadStream, ShutdownSignal};
pub use session::{ReadSession, StartOffset};
