//! BLE-MIDI 13-bit timestamps.
//!
//! Layout:
//! ```text
//! Header byte:     1 0 t12 t11 t10 t9 t8 t7   (high 6 bits)
//! Timestamp byte:  1 t6 t5 t4 t3 t2 t1 t0     (low 7 bits)
//! ```
//! Both bytes carry bit 7 set. The header starts every packet; a
//! timestamp byte precedes each message inside it.

/// Timestamps wrap at 2^13 ms.
pub const TIMESTAMP_MASK: u16 = 0x1FFF;

/// A 13-bit millisecond timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(u16);

impl Timestamp {
    /// Mask a free-running millisecond counter down to 13 bits.
    pub const fn from_millis(now_ms: u32) -> Self {
        Self((now_ms as u16) & TIMESTAMP_MASK)
    }

    /// The raw 13-bit value.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Packet header byte (high 6 bits).
    pub const fn header(self) -> u8 {
        0x80 | ((self.0 >> 7) & 0x3F) as u8
    }

    /// Per-message timestamp byte (low 7 bits).
    pub const fn low(self) -> u8 {
        0x80 | (self.0 & 0x7F) as u8
    }
}

/// Encode a millisecond clock reading as `(header, timestamp)` bytes.
pub const fn encode_timestamp(now_ms: u32) -> (u8, u8) {
    let ts = Timestamp::from_millis(now_ms);
    (ts.header(), ts.low())
}
