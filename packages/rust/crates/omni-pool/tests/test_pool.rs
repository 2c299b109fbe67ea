//! Integration tests for `Pool`: feed, read, retention and shutdown.

#![allow(missing_docs)]

use std::time::Duration;

use futures::{StreamExt, stream};
use omni_pool::{
    Pool, PoolConfig, PoolError, ReadStream, RetentionPolicy, SessionStage, StartOffset,
};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(50);

async fn next<T>(stream: &mut ReadStream<T>) -> T {
    tokio::time::timeout(WAIT, stream.recv())
        .await
        .expect("element should arrive in time")
        .expect("stream should stay open")
}

async fn take<T>(stream: &mut ReadStream<T>, n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(next(stream).await);
    }
    out
}

async fn assert_parked<T: std::fmt::Debug>(stream: &mut ReadStream<T>) {
    let idle = tokio::time::timeout(QUIET, stream.recv()).await;
    assert!(idle.is_err(), "expected no element, got {idle:?}");
}

fn count_pool<T: Clone + Send + 'static>(
    max_count: usize,
    seed: Vec<T>,
) -> (CancellationToken, Pool<T>) {
    let shutdown = CancellationToken::new();
    let pool = Pool::new(shutdown.clone(), RetentionPolicy::by_count(max_count), seed)
        .expect("pool should start");
    (shutdown, pool)
}

#[tokio::test]
async fn unconstrained_policy_is_rejected() {
    let result = Pool::new(
        CancellationToken::new(),
        RetentionPolicy::default().with_max_bytes(0),
        vec![1_u32],
    );
    assert!(matches!(result, Err(PoolError::Configuration(_))));
}

#[tokio::test]
async fn policy_is_introspectable() {
    let (shutdown, pool) = count_pool::<u32>(7, Vec::new());
    assert_eq!(pool.policy(), RetentionPolicy::by_count(7));
    assert!(!pool.is_closed());
    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn append_evicts_head_and_stale_read_resumes_at_base() {
    let (shutdown, pool) = count_pool(3, vec!["a", "b", "c"]);

    // Offset 3 only exists once `d` is appended (and trimmed in the same event).
    let mut tail = pool.read(CancellationToken::new(), 3_u64);
    pool.feed(CancellationToken::new(), stream::iter(vec!["d"]));
    assert_eq!(next(&mut tail).await, "d");

    let mut stale = pool.read(CancellationToken::new(), 0_u64);
    assert_eq!(take(&mut stale, 3).await, vec!["b", "c", "d"]);
    assert_parked(&mut stale).await;

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn concurrent_reads_at_different_offsets() {
    let (shutdown, pool) = count_pool(16, vec!["x", "y", "z"]);

    let mut a = pool.read(CancellationToken::new(), 0_u64);
    let mut b = pool.read(CancellationToken::new(), 2_u64);
    assert_eq!(take(&mut a, 3).await, vec!["x", "y", "z"]);
    assert_eq!(take(&mut b, 1).await, vec!["z"]);
    assert_parked(&mut a).await;
    assert_parked(&mut b).await;

    pool.feed(CancellationToken::new(), stream::iter(vec!["w"]));
    assert_eq!(next(&mut a).await, "w");
    assert_eq!(next(&mut b).await, "w");

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn feed_without_readers_is_retained() {
    let (shutdown, pool) = count_pool::<&str>(16, Vec::new());

    pool.feed(CancellationToken::new(), stream::iter(vec!["p", "q"]));
    let mut reader = pool.read(CancellationToken::new(), 0_i64);
    assert_eq!(take(&mut reader, 2).await, vec!["p", "q"]);

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn negative_offset_reads_from_earliest() {
    let (shutdown, pool) = count_pool(2, vec![1_u32, 2, 3, 4]);

    let mut reader = pool.read(CancellationToken::new(), -1_i64);
    assert_eq!(take(&mut reader, 2).await, vec![3, 4]);

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn read_ahead_of_tail_waits_for_offset() {
    let (shutdown, pool) = count_pool::<u32>(64, Vec::new());

    let mut reader = pool.read(CancellationToken::new(), 5_u64);
    pool.feed(CancellationToken::new(), stream::iter(0..10_u32));
    assert_eq!(take(&mut reader, 5).await, vec![5, 6, 7, 8, 9]);

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn count_ceiling_holds_after_many_appends() {
    let (shutdown, pool) = count_pool::<u32>(5, Vec::new());

    let mut last = pool.read(CancellationToken::new(), 99_u64);
    pool.feed(CancellationToken::new(), stream::iter(0..100_u32));
    assert_eq!(next(&mut last).await, 99);

    let mut earliest = pool.read(CancellationToken::new(), StartOffset::Earliest);
    assert_eq!(take(&mut earliest, 5).await, vec![95, 96, 97, 98, 99]);
    assert_parked(&mut earliest).await;

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn byte_ceiling_holds_after_many_appends() {
    let shutdown = CancellationToken::new();
    // Five u64 slots fit in 44 bytes.
    let pool = Pool::new(shutdown.clone(), RetentionPolicy::by_bytes(44), Vec::<u64>::new())
        .expect("pool should start");

    let mut last = pool.read(CancellationToken::new(), 19_u64);
    pool.feed(CancellationToken::new(), stream::iter(0..20_u64));
    assert_eq!(next(&mut last).await, 19);

    let mut earliest = pool.read(CancellationToken::new(), StartOffset::Earliest);
    assert_eq!(take(&mut earliest, 5).await, vec![15, 16, 17, 18, 19]);
    assert_parked(&mut earliest).await;

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn reader_sees_every_element_in_order() {
    let (shutdown, pool) = count_pool::<u32>(1_000, Vec::new());

    let mut reader = pool.read(CancellationToken::new(), StartOffset::Earliest);
    pool.feed(CancellationToken::new(), stream::iter(0..300_u32));
    assert_eq!(take(&mut reader, 300).await, (0..300).collect::<Vec<_>>());

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_are_serialized_without_loss() {
    let (shutdown, pool) = count_pool::<u32>(1_000, Vec::new());

    let mut reader = pool.read(CancellationToken::new(), 0_u64);
    pool.feed(CancellationToken::new(), stream::iter(0..100_u32));
    pool.feed(CancellationToken::new(), stream::iter(100..200_u32));

    let received = take(&mut reader, 200).await;
    let low: Vec<u32> = received.iter().copied().filter(|v| *v < 100).collect();
    let high: Vec<u32> = received.iter().copied().filter(|v| *v >= 100).collect();
    assert_eq!(low, (0..100).collect::<Vec<_>>());
    assert_eq!(high, (100..200).collect::<Vec<_>>());
    assert_parked(&mut reader).await;

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_reader_does_not_stall_fast_reader() {
    let (shutdown, pool) = count_pool::<u32>(1_000, Vec::new());

    // Never polled: its delivery task blocks on a full sink after one element.
    let _slow = pool.read(CancellationToken::new(), 0_u64);
    let mut fast = pool.read(CancellationToken::new(), 0_u64);
    pool.feed(CancellationToken::new(), stream::iter(0..200_u32));

    assert_eq!(take(&mut fast, 200).await, (0..200).collect::<Vec<_>>());

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn cancelling_one_reader_leaves_others_running() {
    let (shutdown, pool) = count_pool(16, vec![1_u32, 2]);

    let cancel = CancellationToken::new();
    let mut cancelled = pool.read(cancel.clone(), 0_u64);
    let mut other = pool.read(CancellationToken::new(), 0_u64);
    assert_eq!(take(&mut cancelled, 2).await, vec![1, 2]);

    cancel.cancel();
    let end = tokio::time::timeout(WAIT, cancelled.recv()).await;
    assert!(matches!(end, Ok(None)));
    assert!(cancelled.terminal_error().is_none());

    pool.feed(CancellationToken::new(), stream::iter(vec![3_u32]));
    assert_eq!(take(&mut other, 3).await, vec![1, 2, 3]);

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test]
async fn read_stream_is_a_stream() {
    let (shutdown, pool) = count_pool(16, vec!["s", "t", "u"]);

    let reader = pool.read(CancellationToken::new(), 0_u64);
    let first_two: Vec<&str> = tokio::time::timeout(WAIT, reader.take(2).collect())
        .await
        .expect("stream should yield");
    assert_eq!(first_two, vec!["s", "t"]);

    shutdown.cancel();
    pool.wait_for_close().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_parked_sessions() {
    let (shutdown, pool) = count_pool::<u32>(8, Vec::new());

    let mut a = pool.read(CancellationToken::new(), StartOffset::Earliest);
    let mut b = pool.read(CancellationToken::new(), 4_u64);
    let signal = pool.feed(CancellationToken::new(), stream::pending::<u32>());
    // Let both sessions reach the wait-gate.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!signal.is_closed());

    shutdown.cancel();
    for reader in [&mut a, &mut b] {
        let end = tokio::time::timeout(WAIT, reader.recv()).await;
        assert!(matches!(end, Ok(None)));
        assert!(matches!(
            reader.terminal_error(),
            Some(PoolError::SessionAborted(SessionStage::Parked))
        ));
    }

    tokio::time::timeout(WAIT, signal.closed())
        .await
        .expect("shutdown signal should fire");
    tokio::time::timeout(WAIT, pool.wait_for_close())
        .await
        .expect("pool should drain");
    assert!(pool.is_closed());
}

#[tokio::test]
async fn nothing_is_accepted_after_shutdown() {
    let (shutdown, pool) = count_pool(8, vec![1_u32]);
    shutdown.cancel();
    pool.wait_for_close().await;

    let signal = pool.feed(CancellationToken::new(), stream::iter(vec![2_u32]));
    assert!(signal.is_closed());

    let mut late = pool.read(CancellationToken::new(), 0_u64);
    let end = tokio::time::timeout(WAIT, late.recv()).await;
    assert!(matches!(end, Ok(None)));
    assert!(matches!(
        late.terminal_error(),
        Some(PoolError::SessionAborted(SessionStage::Queued))
    ));
}

#[tokio::test(start_paused = true)]
async fn elements_queued_at_shutdown_never_reach_readers() {
    let (shutdown, pool) = count_pool::<u32>(8, Vec::new());
    let mut reader = pool.read(CancellationToken::new(), StartOffset::Earliest);
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The feed task may queue elements before the coordinator sees the cancellation.
    let signal = pool.feed(CancellationToken::new(), stream::iter(vec![1_u32, 2, 3]));
    shutdown.cancel();

    let end = tokio::time::timeout(WAIT, reader.recv()).await;
    assert!(matches!(end, Ok(None)));
    assert!(matches!(
        reader.terminal_error(),
        Some(PoolError::SessionAborted(SessionStage::Parked))
    ));
    tokio::time::timeout(WAIT, signal.closed())
        .await
        .expect("shutdown signal should fire");
    pool.wait_for_close().await;
}

#[tokio::test(start_paused = true)]
async fn delivery_blocked_at_shutdown_is_aborted() {
    let shutdown = CancellationToken::new();
    let config = PoolConfig {
        sink_capacity: 1,
        ..PoolConfig::with_policy(RetentionPolicy::by_count(8))
    };
    let pool = Pool::with_config(shutdown.clone(), config, vec![1_u32, 2, 3, 4, 5])
        .expect("pool should start");

    let mut reader = pool.read(CancellationToken::new(), 0_u64);
    // Delivery fills the one-slot sink and blocks on the second element.
    tokio::time::sleep(Duration::from_millis(10)).await;

    shutdown.cancel();
    tokio::time::timeout(WAIT, pool.shutdown_signal().closed())
        .await
        .expect("shutdown signal should fire");

    let mut received = Vec::new();
    while let Some(item) = tokio::time::timeout(WAIT, reader.recv())
        .await
        .expect("stream should close in time")
    {
        received.push(item);
    }
    assert_eq!(received, vec![1]);
    assert!(matches!(
        reader.terminal_error(),
        Some(PoolError::SessionAborted(SessionStage::Queued))
    ));
    pool.wait_for_close().await;
}

#[tokio::test]
async fn config_capacities_are_clamped() {
    let shutdown = CancellationToken::new();
    let config = PoolConfig {
        policy: RetentionPolicy::by_count(4),
        feed_capacity: 0,
        request_capacity: 0,
        sink_capacity: 0,
    };
    let pool = Pool::with_config(shutdown.clone(), config, vec![10_u32, 11])
        .expect("pool should start");

    let mut reader = pool.read(CancellationToken::new(), 0_u64);
    assert_eq!(take(&mut reader, 2).await, vec![10, 11]);

    shutdown.cancel();
    pool.wait_for_close().await;
}
