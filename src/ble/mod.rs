//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertiser** - advertises the BLE-MIDI service until a central
//!    connects.
//! 2. **GATT server** - exposes the BLE-MIDI I/O characteristic. Writes
//!    from the central go to the receive task, packets built by the send
//!    path go out as notifications.
//! 3. **Transport** - the send path runs under a blocking mutex and cannot
//!    await, so [`QueuedTransport`] hands finished packets to the
//!    connection task through a channel. The channel only drains once the
//!    lock is released, so a SysEx transfer is refused up front when its
//!    packets do not all fit.
//!
//! Communication with other tasks is done via Embassy channels defined
//! in the crate root.

pub mod server;

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use blemidi::config::DEFAULT_ATT_MTU;
use blemidi::{BleError, Transport};

use crate::{Packet, TX_PACKETS};

/// ATT MTU of the current connection.
pub static NEGOTIATED_MTU: AtomicU16 = AtomicU16::new(DEFAULT_ATT_MTU);

/// The central enabled notifications on the I/O characteristic.
pub static SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// Send-path transport backed by the TX packet channel.
pub struct QueuedTransport;

impl Transport for QueuedTransport {
    fn notify(&mut self, packet: &[u8]) -> Result<(), BleError> {
        if !SUBSCRIBED.load(Ordering::Relaxed) {
            return Err(BleError::NotConnected);
        }
        let packet = Packet::from_slice(packet).map_err(|_| BleError::NotifyFailed)?;
        TX_PACKETS
            .try_send(packet)
            .map_err(|_| BleError::QueueFull)
    }

    fn negotiated_mtu(&self) -> u16 {
        NEGOTIATED_MTU.load(Ordering::Relaxed)
    }

    fn queue_space(&self) -> usize {
        TX_PACKETS.free_capacity()
    }
}
