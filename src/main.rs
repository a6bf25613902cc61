//! Entry point for `paddleball`.
//!
//! Parses CLI arguments and dispatches into either **server** (reflector) or
//! **client** (sender + receiver + engine) mode.  All measurement work is
//! delegated to library modules; `main.rs` owns only process setup (logging,
//! signal handling, argument parsing, task wiring).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::task::JoinError;

use paddleball::config::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE, DEFAULT_SEND_QUEUE};
use paddleball::receiver::ReceiverStats;
use paddleball::report::text_line;
use paddleball::socket::ProbeSocket;
use paddleball::{queue, receiver, reflector, sender};
use paddleball::{CumulativeStats, Engine, EngineConfig, OutputMode, SenderConfig};

/// Measure loss, duplication, reordering and RTT with bounced UDP probes.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Reflect probes back to whoever sent them.
    Server {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
    },
    /// Send probes to a server and report what comes back.
    Client {
        /// Reflector address (e.g. 192.0.2.1:9000).
        #[arg(short, long)]
        server: SocketAddr,
        /// Sender identity stamped on every probe.
        #[arg(long, default_value_t = 1)]
        id: i64,
        /// Probes per second.
        #[arg(short, long, default_value_t = DEFAULT_RATE)]
        rate: u32,
        /// Stop after this many probes.
        #[arg(short, long)]
        count: Option<u64>,
        /// Capacity of the inbound probe queue.
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        queue_capacity: usize,
        /// Capacity of the outbound send queue.
        #[arg(long, default_value_t = DEFAULT_SEND_QUEUE)]
        send_queue: usize,
        /// Report interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// `text` for readable lines, anything else tags JSON records.
        #[arg(short, long, default_value = "text")]
        output: OutputMode,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    match Cli::parse().mode {
        Mode::Server { bind } => {
            let socket = ProbeSocket::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            tokio::select! {
                res = reflector::serve(&socket) => res?,
                _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
            }
        }
        Mode::Client {
            server,
            id,
            rate,
            count,
            queue_capacity,
            send_queue,
            interval_ms,
            output,
        } => {
            let engine_config = EngineConfig {
                tick: Duration::from_millis(interval_ms.max(1)),
                output,
            };
            let sender_config = SenderConfig {
                id,
                rate,
                queue_capacity: send_queue,
                count,
            };
            run_client(server, engine_config, sender_config, queue_capacity).await?;
        }
    }
    Ok(())
}

async fn run_client(
    server: SocketAddr,
    engine_config: EngineConfig,
    sender_config: SenderConfig,
    queue_capacity: usize,
) -> anyhow::Result<()> {
    let local: SocketAddr = if server.is_ipv4() {
        "0.0.0.0:0".parse()?
    } else {
        "[::]:0".parse()?
    };
    let socket = Arc::new(ProbeSocket::bind(local).await.context("binding client socket")?);
    let settle = engine_config.tick * 2;

    let (tx, rx) = queue::bounded(queue_capacity);
    let (handle, engine_task) = Engine::new(engine_config).spawn(rx);

    let rx_socket = Arc::clone(&socket);
    let mut receiver_task =
        tokio::spawn(async move { receiver::run(&rx_socket, Some(server), tx).await });

    let tx_socket = Arc::clone(&socket);
    let mut sender_task =
        tokio::spawn(async move { sender::run(sender_config, &tx_socket, server).await });

    tokio::select! {
        res = &mut sender_task => {
            let stats = res??;
            log::info!(
                "sent {} probes ({} discarded by send queue)",
                stats.sent,
                stats.queue_drops
            );
            // Give the last echoes time to come back before closing the queue.
            tokio::time::sleep(settle).await;
            receiver_task.abort();
            match receiver_outcome(receiver_task.await) {
                Ok(Some(rx)) => log::debug!("[rx] stopped: {rx:?}"),
                Ok(None) => {}
                Err(e) => log::error!("[rx] {e:#}"),
            }
            let totals = engine_task.await?;
            print_summary(&totals, 0, queue_capacity);
        }
        res = &mut receiver_task => {
            // The queue is closed now; the engine flushes and stops.
            sender_task.abort();
            let totals = engine_task.await?;
            print_summary(&totals, 0, queue_capacity);
            if let Some(rx) = receiver_outcome(res).context("receiver failed")? {
                log::warn!("[rx] stopped early: {rx:?}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            sender_task.abort();
            let snap = handle.snapshot().await?;
            print_summary(&snap.cumulative, snap.queue_len, snap.queue_capacity);
        }
    }
    Ok(())
}

/// Outcome of the joined receiver task.
///
/// Cancellation after `abort()` yields `Ok(None)`; socket errors and panics
/// are returned.
fn receiver_outcome(
    joined: Result<paddleball::Result<ReceiverStats>, JoinError>,
) -> anyhow::Result<Option<ReceiverStats>> {
    match joined {
        Ok(res) => Ok(Some(res?)),
        Err(e) if e.is_cancelled() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_summary(totals: &CumulativeStats, queue_len: usize, queue_cap: usize) {
    if totals.totals.received == 0 {
        log::info!("no probes received");
        return;
    }
    println!(
        "total over {} intervals: {}",
        totals.intervals,
        text_line(&totals.totals, queue_len, queue_cap)
    );
}
