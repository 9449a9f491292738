//! Send path: packs outgoing messages and hands finished packets to the
//! transport.
//!
//! A packet goes out when the next message no longer fits, when it has been
//! open for the latency budget (checked on every send and on the periodic
//! [`update`](BleMidiOutput::update) tick), or on an explicit
//! [`publish`](BleMidiOutput::publish).

use super::Transport;
use crate::blemidi::{is_data, FlushScheduler, PacketBuilder, Timestamp, SYSEX_END, SYSEX_START};
use crate::config::{ATT_HEADER_SIZE, DEFAULT_ATT_MTU, MAX_MESSAGE_LATENCY_MS};
use crate::error::{BleError, Error};
use crate::midi::MidiEvent;

const fn capacity_for_mtu(mtu: u16) -> usize {
    mtu.saturating_sub(ATT_HEADER_SIZE) as usize
}

/// Outgoing half of a BLE-MIDI link.
#[derive(Debug)]
pub struct BleMidiOutput<T> {
    builder: PacketBuilder,
    scheduler: FlushScheduler,
    transport: T,
    /// Capacity from an MTU change, applied at the next publish.
    pending_capacity: Option<usize>,
}

impl<T> BleMidiOutput<T> {
    /// Send path sized for the default ATT MTU; call
    /// [`update_mtu`](Self::update_mtu) once the exchange has happened.
    pub const fn new(transport: T) -> Self {
        Self {
            builder: PacketBuilder::new(capacity_for_mtu(DEFAULT_ATT_MTU)),
            scheduler: FlushScheduler::new(MAX_MESSAGE_LATENCY_MS),
            transport,
            pending_capacity: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The packet being built.
    pub fn builder(&self) -> &PacketBuilder {
        &self.builder
    }

    /// Current packet capacity (not counting a pending MTU change).
    pub fn capacity(&self) -> usize {
        self.builder.capacity()
    }
}

impl<T: Transport> BleMidiOutput<T> {
    /// Send any complete MIDI message.
    pub fn send(&mut self, event: &MidiEvent, now_ms: u32) -> Result<(), Error> {
        if let MidiEvent::SysEx(payload) = event {
            return self.send_sysex_payload(payload, now_ms);
        }
        let raw = event.to_raw().ok_or(Error::InvalidMessage)?;
        match *raw {
            [byte] if matches!(event, MidiEvent::Realtime(_)) => self.send_realtime(byte, now_ms),
            [status] => self.send_single_byte(status, now_ms),
            [status, data1] => self.send_2b(status, data1, now_ms),
            [status, data1, data2] => self.send_3b(status, data1, data2, now_ms),
            _ => Err(Error::InvalidMessage),
        }
    }

    pub fn send_3b(&mut self, status: u8, data1: u8, data2: u8, now_ms: u32) -> Result<(), Error> {
        self.add_with_retry(now_ms, |b, ts| b.add_3b(status, data1, data2, ts))
    }

    pub fn send_2b(&mut self, status: u8, data1: u8, now_ms: u32) -> Result<(), Error> {
        self.add_with_retry(now_ms, |b, ts| b.add_2b(status, data1, ts))
    }

    pub fn send_realtime(&mut self, byte: u8, now_ms: u32) -> Result<(), Error> {
        self.add_with_retry(now_ms, |b, ts| b.add_realtime(byte, ts))
    }

    pub fn send_single_byte(&mut self, byte: u8, now_ms: u32) -> Result<(), Error> {
        self.add_with_retry(now_ms, |b, ts| b.add_single_byte(byte, ts))
    }

    /// Send a SysEx message given with its `F0 ... F7` framing.
    ///
    /// Messages shorter than two bytes are ignored. A missing `F0` or `F7`
    /// is tolerated. Long messages are split over as many packets as
    /// needed; all but the last are published before this returns.
    ///
    /// Returns `Error::Ble(BleError::QueueFull)` without sending anything
    /// when the transport cannot take all of those packets right now. If a
    /// packet of the transfer is refused anyway, the rest is abandoned and
    /// the error returned.
    pub fn send_sysex(&mut self, message: &[u8], now_ms: u32) -> Result<(), Error> {
        if message.len() < 2 {
            return Ok(());
        }
        let payload = message.strip_prefix(&[SYSEX_START]).unwrap_or(message);
        let payload = payload.strip_suffix(&[SYSEX_END]).unwrap_or(payload);
        self.send_sysex_payload(payload, now_ms)
    }

    fn send_sysex_payload(&mut self, payload: &[u8], now_ms: u32) -> Result<(), Error> {
        if !payload.iter().all(|&b| is_data(b)) {
            warn!("SysEx payload contains status bytes, not sent");
            return Err(Error::InvalidMessage);
        }
        self.flush_if_due(now_ms);

        let ts = Timestamp::from_millis(now_ms);
        let needed = self.sysex_publishes(payload, ts);
        let space = self.transport.queue_space();
        if needed > space {
            warn!("SysEx needs {} packets, transport has room for {}", needed, space);
            return Err(BleError::QueueFull.into());
        }

        let mut cursor = match self.builder.begin_sysex(payload, ts) {
            Some(cursor) => cursor,
            None => {
                self.publish_sysex()?;
                self.builder
                    .begin_sysex(payload, ts)
                    .ok_or(Error::MessageTooLarge)?
            }
        };
        self.scheduler.mark_open(now_ms);

        while !cursor.is_done() {
            self.publish_sysex()?;
            if self.builder.continue_sysex(&mut cursor, ts) == 0 {
                break;
            }
            self.scheduler.mark_open(now_ms);
        }
        Ok(())
    }

    /// Periodic tick: publish the open packet once its latency budget is
    /// spent.
    pub fn update(&mut self, now_ms: u32) {
        self.flush_if_due(now_ms);
    }

    /// Notify the open packet (if any) and start afresh.
    ///
    /// A failed notification is logged and the packet is dropped; there is
    /// nobody to deliver it to.
    pub fn publish(&mut self) {
        if let Err(e) = self.try_publish() {
            warn!("BLE-MIDI notify failed: {}", e);
        }
    }

    fn try_publish(&mut self) -> Result<(), BleError> {
        let sent = if self.builder.is_empty() {
            Ok(())
        } else {
            trace!("notify {} bytes", self.builder.len());
            self.transport.notify(self.builder.buffer())
        };
        self.builder.clear();
        if let Some(capacity) = self.pending_capacity.take() {
            self.builder.set_capacity(capacity);
        }
        self.scheduler.clear();
        sent
    }

    /// Publish a packet of a SysEx transfer. When it is refused the
    /// transfer is abandoned, so the peer sees an unterminated SysEx
    /// rather than one with bytes missing in the middle.
    fn publish_sysex(&mut self) -> Result<(), Error> {
        self.try_publish().map_err(|e| {
            warn!("SysEx transfer cut short: {}", e);
            self.builder.reset();
            e.into()
        })
    }

    /// Packets a SysEx transfer publishes before its last one is left
    /// open, worked out on a copy of the builder.
    fn sysex_publishes(&self, payload: &[u8], ts: Timestamp) -> usize {
        let mut scratch = self.builder.clone();
        let mut published = 0;
        let mut cursor = match scratch.begin_sysex(payload, ts) {
            Some(cursor) => cursor,
            None => {
                published += 1;
                scratch.clear();
                if let Some(capacity) = self.pending_capacity {
                    scratch.set_capacity(capacity);
                }
                match scratch.begin_sysex(payload, ts) {
                    Some(cursor) => cursor,
                    // Refused later with MessageTooLarge.
                    None => return 0,
                }
            }
        };
        while !cursor.is_done() {
            published += 1;
            scratch.clear();
            if scratch.continue_sysex(&mut cursor, ts) == 0 {
                break;
            }
        }
        published
    }

    /// Pick up a renegotiated MTU.
    ///
    /// The new capacity is applied right away when no packet is open,
    /// otherwise at the next publish.
    pub fn update_mtu(&mut self) {
        let mtu = self.transport.negotiated_mtu();
        let capacity = capacity_for_mtu(mtu);
        debug!("ATT MTU {} -> packet capacity {}", mtu, capacity);
        if self.builder.is_empty() {
            self.builder.set_capacity(capacity);
            self.pending_capacity = None;
        } else {
            self.pending_capacity = Some(capacity);
        }
    }

    /// Drop everything pending, including an in-flight SysEx transfer, and
    /// fall back to the default MTU for the next connection.
    pub fn on_disconnect(&mut self) {
        if !self.builder.is_empty() {
            debug!("discarding {} unsent bytes", self.builder.len());
        }
        self.builder.reset();
        self.builder.set_capacity(capacity_for_mtu(DEFAULT_ATT_MTU));
        self.pending_capacity = None;
        self.scheduler.clear();
    }

    fn flush_if_due(&mut self, now_ms: u32) {
        if self.scheduler.is_due(now_ms) {
            self.publish();
        }
    }

    fn add_with_retry(
        &mut self,
        now_ms: u32,
        mut add: impl FnMut(&mut PacketBuilder, Timestamp) -> bool,
    ) -> Result<(), Error> {
        self.flush_if_due(now_ms);

        let ts = Timestamp::from_millis(now_ms);
        if !add(&mut self.builder, ts) {
            self.publish();
            if !add(&mut self.builder, ts) {
                warn!("message does not fit in an empty packet");
                return Err(Error::MessageTooLarge);
            }
        }
        self.scheduler.mark_open(now_ms);
        Ok(())
    }
}
