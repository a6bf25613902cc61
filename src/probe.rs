//! Probe packets and their wire format.
//!
//! A [`Probe`] is the unit of measurement: one numbered datagram sent by a
//! sender identity, bounced off the reflector and read back by the receiver.
//! This module is responsible for:
//! - Defining the in-memory probe (identity, serial, timestamps, upstream
//!   queue drops).
//! - Serialising a probe into its fixed-size datagram.
//! - Deserialising a datagram back into a probe, rejecting malformed input.
//!
//! Pure data transformation; sockets live in [`crate::socket`].
//!
//! # Wire format
//!
//! All integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Identity (i64)                          |
//! +                                                               +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Serial (i64)                           |
//! +                                                               +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              Creation time, ns since Unix epoch (i64)         |
//! +                                                               +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Upstream queue drops (i64)                  |
//! +                                                               +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Checksum            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total size: [`PROBE_LEN`] = 34 bytes.  The receipt time is never sent; it
//! is stamped locally when the echoed probe is read off the socket.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Byte length of an encoded probe.
pub const PROBE_LEN: usize = 34;

// Byte offsets of each field within the datagram.
const OFF_ID: usize = 0;
const OFF_SERIAL: usize = 8;
const OFF_CREATED: usize = 16;
const OFF_UPSTREAM_DROPS: usize = 24;
const OFF_CHECKSUM: usize = 32;

/// One probe as seen by the measurement engine.
///
/// Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Sender identity; serials are only comparable within one identity.
    pub id: i64,
    /// Sequence number assigned by the sender.
    pub serial: i64,
    /// When the sender created the probe.
    pub created: DateTime<Utc>,
    /// When the echoed probe was read back.
    pub received: DateTime<Utc>,
    /// Probes the sender's own outbound queue discarded before this one.
    pub upstream_drops: i64,
}

impl Probe {
    /// Build a fresh probe stamped with the current time.
    ///
    /// `received` is set equal to `created` until the receiver re-stamps it.
    pub fn new(id: i64, serial: i64, upstream_drops: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            serial,
            created: now,
            received: now,
            upstream_drops,
        }
    }

    /// Round-trip time: receipt minus creation.
    ///
    /// A receipt stamped before creation (clock step) counts as zero.
    pub fn rtt(&self) -> Duration {
        (self.received - self.created)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Serialise this probe into a newly allocated datagram.
    ///
    /// Creation times outside the range representable as i64 nanoseconds
    /// (years 1677..2262) are clamped to the epoch.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PROBE_LEN];
        let created_ns = self.created.timestamp_nanos_opt().unwrap_or_default();

        buf[OFF_ID..OFF_ID + 8].copy_from_slice(&self.id.to_be_bytes());
        buf[OFF_SERIAL..OFF_SERIAL + 8].copy_from_slice(&self.serial.to_be_bytes());
        buf[OFF_CREATED..OFF_CREATED + 8].copy_from_slice(&created_ns.to_be_bytes());
        buf[OFF_UPSTREAM_DROPS..OFF_UPSTREAM_DROPS + 8]
            .copy_from_slice(&self.upstream_drops.to_be_bytes());

        let csum = internet_checksum(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());
        buf
    }

    /// Parse a probe from a raw datagram, stamping it as received at
    /// `received`.
    pub fn decode(buf: &[u8], received: DateTime<Utc>) -> Result<Self, DecodeError> {
        if buf.len() != PROBE_LEN {
            return Err(DecodeError::BadLength(buf.len()));
        }

        let checksum = u16::from_be_bytes([buf[OFF_CHECKSUM], buf[OFF_CHECKSUM + 1]]);
        let mut scratch = [0u8; PROBE_LEN];
        scratch.copy_from_slice(buf);
        scratch[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&0u16.to_be_bytes());
        if internet_checksum(&scratch) != checksum {
            return Err(DecodeError::ChecksumFailed);
        }

        let created_ns = read_i64(buf, OFF_CREATED);
        Ok(Self {
            id: read_i64(buf, OFF_ID),
            serial: read_i64(buf, OFF_SERIAL),
            created: Utc.timestamp_nanos(created_ns),
            received,
            upstream_drops: read_i64(buf, OFF_UPSTREAM_DROPS),
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram is {0} bytes, expected 34")]
    BadLength(usize),
    #[error("checksum verification failed")]
    ChecksumFailed,
}

fn read_i64(buf: &[u8], off: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[off..off + 8]);
    i64::from_be_bytes(raw)
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// The caller must zero the checksum field within `data` first.
fn internet_checksum(data: &[u8]) -> u16 {
    let words = data.chunks(2).map(|pair| match *pair {
        [hi, lo] => u32::from(u16::from_be_bytes([hi, lo])),
        // Odd trailing byte, padded with a zero low byte.
        [hi] => u32::from(hi) << 8,
        _ => 0,
    });

    let mut sum: u32 = words.sum();
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_restores_fields_and_stamps_receipt() {
        let sent = Probe::new(7, 42, 3);
        let later = sent.created + chrono::Duration::milliseconds(5);

        let got = Probe::decode(&sent.encode(), later).unwrap();
        assert_eq!(got.id, 7);
        assert_eq!(got.serial, 42);
        assert_eq!(got.upstream_drops, 3);
        assert_eq!(got.created, sent.created);
        assert_eq!(got.rtt(), Duration::from_millis(5));
    }

    #[test]
    fn negative_serial_survives_the_wire() {
        let sent = Probe::new(-1, -5, 0);
        let got = Probe::decode(&sent.encode(), sent.created).unwrap();
        assert_eq!(got.id, -1);
        assert_eq!(got.serial, -5);
    }

    #[test]
    fn encoded_length_is_fixed() {
        assert_eq!(Probe::new(1, 1, 0).encode().len(), PROBE_LEN);
    }

    #[test]
    fn short_buffer_rejected() {
        assert_eq!(
            Probe::decode(&[0u8; PROBE_LEN - 1], Utc::now()),
            Err(DecodeError::BadLength(PROBE_LEN - 1))
        );
    }

    #[test]
    fn trailing_garbage_rejected() {
        let mut bytes = Probe::new(1, 1, 0).encode();
        bytes.push(0);
        assert_eq!(
            Probe::decode(&bytes, Utc::now()),
            Err(DecodeError::BadLength(PROBE_LEN + 1))
        );
    }

    #[test]
    fn checksum_matches_rfc1071_example() {
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2);
        assert_eq!(internet_checksum(&[0x01]), 0xfeff);
    }

    #[test]
    fn corrupt_byte_fails_checksum() {
        let mut bytes = Probe::new(1, 99, 0).encode();
        bytes[OFF_SERIAL + 7] ^= 0xff;
        assert_eq!(
            Probe::decode(&bytes, Utc::now()),
            Err(DecodeError::ChecksumFailed)
        );
    }

    #[test]
    fn serial_big_endian_on_wire() {
        let bytes = Probe::new(0, 0x0102_0304_0506_0708, 0).encode();
        assert_eq!(
            &bytes[OFF_SERIAL..OFF_SERIAL + 8],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn receipt_before_creation_is_zero_rtt() {
        let mut p = Probe::new(1, 1, 0);
        p.received = p.created - chrono::Duration::milliseconds(1);
        assert_eq!(p.rtt(), Duration::ZERO);
    }
}
