//! omni-pool demo: seed a pool, feed it stdin lines, and stream it to N readers.
//!
//! Logging: set `RUST_LOG=omni_pool=debug` to see coordinator and session logs on stderr.

mod cli;

use std::io::BufRead;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use omni_pool::{Pool, PoolConfig, ReadStream};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; else info
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("omni_pool=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = resolve_config(&cli)?;
    let feed_capacity = config.feed_capacity.max(1);
    let shutdown = CancellationToken::new();
    let pool = Pool::with_config(shutdown.clone(), config, cli.seed.clone())?;

    for index in 0..cli.readers {
        let stream = pool.read(shutdown.child_token(), cli.from);
        tokio::spawn(print_reader(format!("reader-{index:03}"), stream));
    }

    let mut lines = stdin_lines(feed_capacity);
    let closed = pool.feed(
        shutdown.child_token(),
        stream::poll_fn(move |cx| lines.poll_recv(cx)),
    );

    wait_for_stop(cli.run_secs).await?;
    tracing::info!("stopping pool");
    shutdown.cancel();
    closed.closed().await;
    pool.wait_for_close().await;
    tracing::info!("pool closed");
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<PoolConfig> {
    let mut config = match &cli.config {
        Some(path) => PoolConfig::load(path)
            .with_context(|| format!("failed to load pool config {}", path.display()))?,
        None => PoolConfig::default(),
    };
    if let Some(max_count) = cli.max_count {
        config.policy.max_count = max_count;
    }
    if let Some(max_bytes) = cli.max_bytes {
        config.policy.max_bytes = max_bytes;
    }
    Ok(config)
}

/// Stdin is read on a plain thread so a pending read never holds up runtime shutdown.
fn stdin_lines(capacity: usize) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(capacity);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn print_reader(name: String, mut stream: ReadStream<String>) {
    tracing::debug!("{name}: reading started");
    while let Some(line) = stream.recv().await {
        println!("{name}: {line}");
    }
    if let Some(error) = stream.terminal_error() {
        tracing::debug!("{name}: {error}");
    }
    tracing::debug!("{name}: reading closed");
}

async fn wait_for_stop(run_secs: Option<u64>) -> anyhow::Result<()> {
    match run_secs {
        Some(secs) => {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => signal?,
                () = tokio::time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }
    Ok(())
}
