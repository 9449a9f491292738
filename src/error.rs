//! Unified error type for blemidi.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.
//!
//! A full outgoing packet is not an error: the builder reports it with a
//! `false` return and the caller flushes and retries.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The BLE stack rejected an operation.
    Ble(BleError),

    // MIDI receive path
    /// A received packet does not fit in the receive queue.
    RxOverflow,

    // MIDI send path
    /// A message does not fit even in an empty packet.
    MessageTooLarge,

    /// A SysEx payload contains a byte with bit 7 set.
    InvalidMessage,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// No central is connected or subscribed.
    NotConnected,
    /// The outgoing packet queue is full; retry once it drains.
    QueueFull,
    /// The notification could not be queued.
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
