//! Next-expected serial per sender identity.
//!
//! [`SerialTracker`] is the cursor the classifier drives: for every identity
//! seen so far it holds the serial it expects next.  Entries are created on
//! first sight of an identity and only ever move forward.

use std::collections::HashMap;

/// Map of sender identity → next expected serial.
#[derive(Debug, Default, Clone)]
pub struct SerialTracker {
    expected: HashMap<i64, i64>,
}

impl SerialTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected serial for `id`, or `None` if the identity was never seen.
    pub fn expected(&self, id: i64) -> Option<i64> {
        self.expected.get(&id).copied()
    }

    /// Record the first packet of a new identity carrying `serial`.
    ///
    /// The identity then expects `serial + 1`.
    pub fn start(&mut self, id: i64, serial: i64) {
        self.expected.insert(id, serial + 1);
    }

    /// Step the cursor of `id` forward by one.  Unknown identities are ignored.
    pub fn advance(&mut self, id: i64) {
        if let Some(next) = self.expected.get_mut(&id) {
            *next += 1;
        }
    }

    /// Jump the cursor of `id` to `serial` if it is currently behind it.
    ///
    /// Returns how many serials were skipped (zero when the identity is
    /// unknown or already at or past `serial`).
    pub fn fast_forward(&mut self, id: i64, serial: i64) -> i64 {
        match self.expected.get_mut(&id) {
            Some(next) if *next < serial => {
                let skipped = serial - *next;
                *next = serial;
                skipped
            }
            _ => 0,
        }
    }

    /// Number of identities tracked.
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}
