//! Closed / open window pair.
//!
//! Arrivals accumulate in the *open* window.  At every interval boundary the
//! open window becomes the *closed* window for the following boundary and a
//! fresh open window starts.  While a closed window is classified, the open
//! window (holding only what arrived since the last boundary) serves as its
//! lookahead.
//!
//! ```text
//!   tick N-1          tick N            tick N+1
//!      │    window A     │    window B     │
//!      │  (open → closed)│  (open)         │
//!      │                 │                 │
//!      └── at tick N: classify A with B as lookahead; B becomes closed
//! ```

use crate::probe::Probe;

/// The two arrival-ordered buffers the engine rotates every tick.
#[derive(Debug, Default)]
pub struct WindowPair {
    closed: Vec<Probe>,
    open: Vec<Probe>,
}

impl WindowPair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arrival to the open window.
    pub fn push(&mut self, probe: Probe) {
        self.open.push(probe);
    }

    /// Window awaiting classification at the next boundary.
    pub fn closed(&self) -> &[Probe] {
        &self.closed
    }

    /// Window currently accepting arrivals.
    pub fn open(&self) -> &[Probe] {
        &self.open
    }

    /// Borrow `(closed, lookahead)` for classification.
    pub fn analysis(&self) -> (&[Probe], &[Probe]) {
        (&self.closed, &self.open)
    }

    /// Interval boundary: the open window becomes the closed one and a new,
    /// empty open window starts.  The previously closed window is discarded.
    pub fn rotate(&mut self) {
        self.closed = std::mem::take(&mut self.open);
    }

    /// `true` when neither window holds any probe.
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.open.is_empty()
    }
}
