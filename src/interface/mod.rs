//! BLE-MIDI link endpoints on top of the codec.
//!
//! - [`BleMidiOutput`]: send path, owns the packet builder and the flush
//!   scheduler, talks to a [`Transport`].
//! - [`BleMidiInput`]: receive path with a bounded byte queue and a
//!   mailbox hand-off.
//! - [`BluetoothMidiInterface`]: both halves behind one value, for callers
//!   that drive send and receive from the same context.

mod input;
mod output;


pub use input::BleMidiInput;
pub use output::BleMidiOutput;

use crate::error::{BleError, Error};
use crate::mailbox::Mailbox;
use crate::midi::MidiEvent;

/// The BLE side of the link.
pub trait Transport {
    /// Send one finished packet to the subscribed central.
    fn notify(&mut self, packet: &[u8]) -> Result<(), BleError>;

    /// ATT MTU of the current connection.
    fn negotiated_mtu(&self) -> u16;

    /// Packets `notify` can take right now. A SysEx transfer is only
    /// started when all of its packets fit.
    fn queue_space(&self) -> usize {
        usize::MAX
    }
}

/// Send and receive path of one BLE-MIDI link.
#[derive(Debug)]
pub struct BluetoothMidiInterface<T> {
    output: BleMidiOutput<T>,
    input: BleMidiInput,
    mailbox: Mailbox<MidiEvent>,
}

impl<T> BluetoothMidiInterface<T> {
    pub fn new(transport: T) -> Self {
        Self {
            output: BleMidiOutput::new(transport),
            input: BleMidiInput::new(),
            mailbox: Mailbox::new(),
        }
    }

    pub fn output(&self) -> &BleMidiOutput<T> {
        &self.output
    }

    pub fn input(&self) -> &BleMidiInput {
        &self.input
    }
}

impl<T: Transport> BluetoothMidiInterface<T> {
    pub fn send(&mut self, event: &MidiEvent, now_ms: u32) -> Result<(), Error> {
        self.output.send(event, now_ms)
    }

    pub fn send_sysex(&mut self, message: &[u8], now_ms: u32) -> Result<(), Error> {
        self.output.send_sysex(message, now_ms)
    }

    /// Periodic tick for the send path.
    pub fn update(&mut self, now_ms: u32) {
        self.output.update(now_ms);
    }

    pub fn publish(&mut self) {
        self.output.publish();
    }

    pub fn update_mtu(&mut self) {
        self.output.update_mtu();
    }

    pub fn on_disconnect(&mut self) {
        self.output.on_disconnect();
    }

    /// Feed a packet written by the central.
    pub fn on_write(&mut self, packet: &[u8]) -> Result<usize, Error> {
        self.input.on_write(packet)
    }

    /// Next received event, if one is complete.
    pub fn read(&mut self) -> Option<MidiEvent> {
        self.input.pump(&mut self.mailbox);
        self.mailbox.take()
    }
}
