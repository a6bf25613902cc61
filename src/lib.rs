//! `paddleball` — a probe-based network quality meter.
//!
//! A client bounces numbered probes off a reflector and classifies what comes
//! back, once per interval, into received / dropped / duplicated / reordered
//! counts plus round-trip-time statistics.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  probes   ┌───────────┐  echoes   ┌──────────┐
//!  │  Sender  │──────────▶│ Reflector │──────────▶│ Receiver │
//!  └──────────┘           └───────────┘           └────┬─────┘
//!                                                      │ bounded queue
//!                                                 ┌────▼─────────────────┐
//!                                                 │        Engine        │
//!                                                 │  WindowPair          │
//!                                                 │  SerialTracker       │
//!                                                 │  classifier::process │
//!                                                 └────┬────────────┬────┘
//!                                                      │            │
//!                                             CumulativeStats   Reporter
//! ```
//!
//! Each module has a single responsibility:
//! - [`probe`]       — probe packet type and wire format
//! - [`tracker`]     — next-expected serial per sender identity
//! - [`window`]      — closed / open window pair
//! - [`classifier`]  — per-window loss / duplicate / reorder classification
//! - [`stats`]       — interval and cumulative statistics
//! - [`report`]      — text and JSON interval reports
//! - [`engine`]      — single-threaded event loop driving the above
//! - [`queue`]       — bounded inbound probe queue
//! - [`socket`]      — async UDP socket speaking probes
//! - [`receiver`]    — socket → queue task
//! - [`sender`]      — paced probe emitter with outbound queue accounting
//! - [`reflector`]   — server side echo loop
//! - [`simulator`]   — seeded fault model for tests
//! - [`config`]      — run configuration
//! - [`error`]       — crate error type

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod queue;
pub mod receiver;
pub mod reflector;
pub mod report;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod stats;
pub mod tracker;
pub mod window;

pub use config::{EngineConfig, OutputMode, SenderConfig};
pub use engine::{Engine, EngineHandle};
pub use error::{Error, Result};
pub use probe::Probe;
pub use stats::{CumulativeStats, IntervalStats};
