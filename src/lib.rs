//! BLE-MIDI firmware library.
//!
//! Everything that does not touch hardware lives here so it can be tested
//! on the host (no embedded hardware required):
//!
//! - **blemidi**: BLE-MIDI packet codec (timestamps, builder, parser,
//!   flush scheduling).
//! - **midi**: MIDI message model (on midly) and the byte-level stream reader.
//! - **interface**: send and receive paths on top of the codec.
//! - **controls**: touch pad debouncing and encoder accumulation, mapped
//!   to Control Change messages.
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is built with `--features embedded`.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration & Errors
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;

pub use error::{BleError, Error};

// ═══════════════════════════════════════════════════════════════════════════
// BLE-MIDI Codec
// ═══════════════════════════════════════════════════════════════════════════

pub mod blemidi;
pub mod midi;

pub use midi::MidiEvent;

// ═══════════════════════════════════════════════════════════════════════════
// Link Endpoints
// ═══════════════════════════════════════════════════════════════════════════

pub mod interface;
pub mod mailbox;

pub use interface::{BleMidiInput, BleMidiOutput, BluetoothMidiInterface, Transport};
pub use mailbox::Mailbox;

// ═══════════════════════════════════════════════════════════════════════════
// Controls
// ═══════════════════════════════════════════════════════════════════════════

pub mod controls;
