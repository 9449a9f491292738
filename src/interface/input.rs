//! Receive path: received packets → MIDI bytes → events → mailbox.
//!
//! [`on_write`](BleMidiInput::on_write) runs in the BLE write context and
//! only strips timestamps into a bounded byte queue.
//! [`pump`](BleMidiInput::pump) runs on the consumer side, parses queued
//! bytes and posts events. Events the mailbox cannot take yet are parked
//! and offered again on the next pump, so nothing is dropped and nothing
//! spins.

use heapless::Deque;

use crate::blemidi::{decode, is_ambiguous};
use crate::config::RX_QUEUE_SIZE;
use crate::error::Error;
use crate::mailbox::Mailbox;
use crate::midi::stream::MidiReader;
use crate::midi::MidiEvent;

/// One byte completes at most two events.
const PARKED_EVENTS: usize = 2;

/// Incoming half of a BLE-MIDI link.
#[derive(Debug)]
pub struct BleMidiInput<const Q: usize = RX_QUEUE_SIZE> {
    queue: Deque<u8, Q>,
    reader: MidiReader,
    /// Parsed events refused by the mailbox, oldest first.
    stalled: Deque<MidiEvent, PARKED_EVENTS>,
}

impl<const Q: usize> BleMidiInput<Q> {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            reader: MidiReader::new(),
            stalled: Deque::new(),
        }
    }

    /// Accept one received packet.
    ///
    /// All-or-nothing: when the forwarded bytes do not fit in the queue the
    /// whole packet is refused with [`Error::RxOverflow`]. Returns the
    /// number of MIDI bytes queued.
    pub fn on_write(&mut self, packet: &[u8]) -> Result<usize, Error> {
        let count = decode(packet).count();
        if count > Q - self.queue.len() {
            warn!(
                "BLE-MIDI receive queue full, dropping {} byte packet",
                packet.len()
            );
            return Err(Error::RxOverflow);
        }
        if is_ambiguous(packet) {
            warn!("ambiguous BLE-MIDI packet, byte 2 read as status");
        }
        for decoded in decode(packet) {
            // Space was checked above.
            let _ = self.queue.push_back(decoded.byte);
        }
        Ok(count)
    }

    /// Parse queued bytes and post the resulting events to `mailbox`.
    ///
    /// Stops as soon as the mailbox refuses an event. Returns the number of
    /// events posted.
    pub fn pump(&mut self, mailbox: &mut Mailbox<MidiEvent>) -> usize {
        let mut posted = 0;
        loop {
            while let Some(event) = self.stalled.pop_front() {
                if let Err(event) = mailbox.post(event) {
                    // Just popped, so there is room.
                    let _ = self.stalled.push_front(event);
                    return posted;
                }
                posted += 1;
            }

            let Some(byte) = self.queue.pop_front() else {
                return posted;
            };
            let stalled = &mut self.stalled;
            self.reader.feed(byte, |event| {
                // Emptied above, and a byte completes at most two events.
                let _ = stalled.push_back(event);
            });
        }
    }

    /// MIDI bytes waiting to be parsed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// `true` while an event is waiting for the mailbox.
    pub fn is_stalled(&self) -> bool {
        !self.stalled.is_empty()
    }
}

impl<const Q: usize> Default for BleMidiInput<Q> {
    fn default() -> Self {
        Self::new()
    }
}
