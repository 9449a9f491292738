//! Outgoing BLE-MIDI packet builder.
//!
//! Packet layout:
//! ```text
//! [header][ts][status][data...][ts][status][data...]...
//! ```
//! Every add is all-or-nothing: when a message does not fit, the buffer is
//! left untouched and the add returns `false`. The caller then flushes the
//! packet and retries on a fresh one. SysEx is the only message allowed to
//! span packets; continuation packets carry the header followed by raw
//! payload bytes, and the closing `[ts][F7]` may land in a later packet.
//!
//! Each message re-emits its timestamp byte even when it shares the
//! millisecond with the previous one. That is valid BLE-MIDI, just not the
//! most compact encoding.

use heapless::Vec;

use super::timestamp::Timestamp;
use crate::config::{MAX_PACKET_SIZE, MIN_PACKET_SIZE};

/// SysEx start status byte.
pub const SYSEX_START: u8 = 0xF0;

/// SysEx end status byte.
pub const SYSEX_END: u8 = 0xF7;

const fn clamp_capacity(capacity: usize) -> usize {
    if capacity < MIN_PACKET_SIZE {
        MIN_PACKET_SIZE
    } else if capacity > MAX_PACKET_SIZE {
        MAX_PACKET_SIZE
    } else {
        capacity
    }
}

/// Remaining part of a SysEx message that did not fit in the current packet.
///
/// Returned by [`PacketBuilder::begin_sysex`] and advanced by
/// [`PacketBuilder::continue_sysex`] until [`is_done`](Self::is_done).
#[derive(Debug)]
pub struct SysExCursor<'a> {
    remaining: &'a [u8],
    terminated: bool,
    generation: u16,
}

impl<'a> SysExCursor<'a> {
    /// Payload bytes not written yet.
    pub fn remaining(&self) -> &'a [u8] {
        self.remaining
    }

    /// `true` once the payload and the `F7` terminator have been written,
    /// or the transfer was abandoned by [`PacketBuilder::reset`].
    pub fn is_done(&self) -> bool {
        self.remaining.is_empty() && self.terminated
    }

    fn finish(&mut self) {
        self.remaining = &[];
        self.terminated = true;
    }
}

/// Accumulates MIDI messages into one BLE-MIDI packet.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    buffer: Vec<u8, MAX_PACKET_SIZE>,
    capacity: usize,
    /// Bumped by `reset()`; cursors from older generations are abandoned.
    generation: u16,
}

impl PacketBuilder {
    /// Create an empty builder. `capacity` is clamped to
    /// `MIN_PACKET_SIZE..=MAX_PACKET_SIZE`.
    pub const fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::new(),
            capacity: clamp_capacity(capacity),
            generation: 0,
        }
    }

    /// Maximum packet size for subsequent adds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the maximum packet size.
    ///
    /// Bytes already in the buffer are never dropped; if the open packet is
    /// larger than the new capacity, adds fail until it is flushed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = clamp_capacity(capacity);
    }

    /// Current packet contents.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Start a new packet with the header byte for `ts`.
    ///
    /// Adds call this themselves when the buffer is empty.
    pub fn open(&mut self, ts: Timestamp) {
        self.buffer.clear();
        self.push(ts.header());
    }

    /// Empty the buffer after it has been sent. In-flight SysEx cursors stay
    /// valid.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Discard the buffer without sending it and abandon any in-flight SysEx
    /// transfer. The abandoned message is lost.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Append a one-byte message (e.g. Tune Request).
    #[must_use]
    pub fn add_single_byte(&mut self, byte: u8, ts: Timestamp) -> bool {
        if !self.reserve(2, ts) {
            return false;
        }
        self.push(ts.low());
        self.push(byte);
        true
    }

    /// Append a System Real-Time message (Clock, Start, Stop, ...).
    #[must_use]
    pub fn add_realtime(&mut self, byte: u8, ts: Timestamp) -> bool {
        debug_assert!(byte >= 0xF8, "not a real-time status byte");
        self.add_single_byte(byte, ts)
    }

    /// Append a two-byte message (Program Change, Channel Pressure, ...).
    #[must_use]
    pub fn add_2b(&mut self, status: u8, data1: u8, ts: Timestamp) -> bool {
        if !self.reserve(3, ts) {
            return false;
        }
        self.push(ts.low());
        self.push(status);
        self.push(data1);
        true
    }

    /// Append a three-byte message (Note On/Off, Control Change, ...).
    #[must_use]
    pub fn add_3b(&mut self, status: u8, data1: u8, data2: u8, ts: Timestamp) -> bool {
        if !self.reserve(4, ts) {
            return false;
        }
        self.push(ts.low());
        self.push(status);
        self.push(data1);
        self.push(data2);
        true
    }

    /// Start a SysEx transfer. `data` is the payload without `F0`/`F7` and
    /// must only contain 7-bit data bytes.
    ///
    /// Writes `[ts][F0]`, then as much payload as fits, then `[ts][F7]` if
    /// everything fit. Returns `None` (buffer unchanged) when not even
    /// `[ts][F0]` fits.
    pub fn begin_sysex<'a>(&mut self, data: &'a [u8], ts: Timestamp) -> Option<SysExCursor<'a>> {
        debug_assert!(data.iter().all(|&b| b < 0x80));
        if !self.reserve(2, ts) {
            return None;
        }
        self.push(ts.low());
        self.push(SYSEX_START);

        let mut cursor = SysExCursor {
            remaining: data,
            terminated: false,
            generation: self.generation,
        };
        self.write_sysex(&mut cursor, ts);
        Some(cursor)
    }

    /// Continue a SysEx transfer in a fresh packet.
    ///
    /// Flush the open packet first: whatever is still in the buffer is
    /// discarded, since the continuation must start its own packet.
    /// Returns the number of bytes written; `0` means the transfer is
    /// complete (or was abandoned by `reset()`).
    pub fn continue_sysex(&mut self, cursor: &mut SysExCursor<'_>, ts: Timestamp) -> usize {
        if cursor.generation != self.generation {
            if !cursor.is_done() {
                warn!(
                    "SysEx transfer abandoned, {} bytes lost",
                    cursor.remaining.len()
                );
            }
            cursor.finish();
            return 0;
        }
        if cursor.is_done() {
            return 0;
        }
        if !self.is_empty() {
            warn!("SysEx continued over an unsent packet, {} bytes lost", self.len());
        }
        self.open(ts);
        self.write_sysex(cursor, ts);
        self.buffer.len()
    }

    fn write_sysex(&mut self, cursor: &mut SysExCursor<'_>, ts: Timestamp) {
        let room = self.capacity.saturating_sub(self.buffer.len());
        let (chunk, rest) = cursor
            .remaining
            .split_at(room.min(cursor.remaining.len()));
        let copied = self.buffer.extend_from_slice(chunk);
        debug_assert!(copied.is_ok());
        cursor.remaining = rest;

        // A continuation packet holding a single data byte followed by
        // [ts][F7] reads back as data + status under the receive heuristic,
        // so the terminator goes to the next packet instead.
        if cursor.remaining.is_empty()
            && !cursor.terminated
            && self.has_space_for(2)
            && !self.is_lone_continuation_byte()
        {
            self.push(ts.low());
            self.push(SYSEX_END);
            cursor.terminated = true;
        }
    }

    fn is_lone_continuation_byte(&self) -> bool {
        self.buffer.len() == 2 && self.buffer[1] & 0x80 == 0
    }

    fn has_space_for(&self, bytes: usize) -> bool {
        bytes <= self.capacity.saturating_sub(self.buffer.len())
    }

    /// Check that `bytes` fit (plus the header if the packet is not open
    /// yet) and open the packet if needed.
    fn reserve(&mut self, bytes: usize, ts: Timestamp) -> bool {
        let needed = if self.is_empty() { bytes + 1 } else { bytes };
        if !self.has_space_for(needed) {
            return false;
        }
        if self.is_empty() {
            self.open(ts);
        }
        true
    }

    fn push(&mut self, byte: u8) {
        // Capacity never exceeds MAX_PACKET_SIZE, and callers check space.
        let pushed = self.buffer.push(byte);
        debug_assert!(pushed.is_ok());
    }
}
