//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// BLE

/// Advertised device name.
pub const BLE_DEVICE_NAME: &str = "blemidi";

/// BLE-MIDI service UUID.
pub const BLE_MIDI_SERVICE_UUID: &str = "03B80E5A-EDE8-4B33-A751-6CE34EC4C700";

/// BLE-MIDI I/O characteristic UUID (read, write without response, notify).
pub const BLE_MIDI_CHARACTERISTIC_UUID: &str = "7772E5DB-3868-4112-A1A9-F2669D106BF3";

/// BLE-MIDI service UUID in little-endian byte order, for advertisement data.
pub const BLE_MIDI_SERVICE_UUID_LE: [u8; 16] = [
    0x00, 0xC7, 0xC4, 0x4E, 0xE3, 0x6C, 0x51, 0xA7, 0x33, 0x4B, 0xE8, 0xED, 0x5A, 0x0E, 0xB8, 0x03,
];

/// BLE connection interval range (in 1.25 ms units).
/// BLE-MIDI asks for 7.5 ms - 15 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

/// How often the connection task re-reads the ATT MTU (ms).
pub const MTU_POLL_MS: u64 = 250;

// BLE-MIDI packets

/// ATT MTU every link starts with before the exchange.
pub const DEFAULT_ATT_MTU: u16 = 23;

/// Largest ATT MTU we configure the SoftDevice for.
pub const MAX_ATT_MTU: u16 = 247;

/// ATT notification overhead (opcode + attribute handle).
pub const ATT_HEADER_SIZE: u16 = 3;

/// Largest BLE-MIDI packet we ever build.
pub const MAX_PACKET_SIZE: usize = (MAX_ATT_MTU - ATT_HEADER_SIZE) as usize;

/// Smallest useful packet: header + timestamp + a 3-byte message.
pub const MIN_PACKET_SIZE: usize = 5;

/// How long a partially filled packet may wait before it is sent (ms).
pub const MAX_MESSAGE_LATENCY_MS: u32 = 10;

/// Interval of the periodic flush tick (ms).
pub const FLUSH_TICK_MS: u64 = 1;

// MIDI receive path

/// Largest SysEx payload (without F0/F7) the receive path reassembles.
pub const SYSEX_BUFFER_SIZE: usize = 128;

/// Forwarded bytes buffered between the BLE callback and the MIDI parser.
pub const RX_QUEUE_SIZE: usize = 256;

/// Raw packets buffered between the GATT callback and the receive task.
///
/// The GATT callback cannot wait, so a packet that arrives while this queue
/// is full is dropped (and logged). Decoded events are never dropped after
/// that point, but the queue fills when the application stops reading
/// `MIDI_IN`: then at most this many packets wait, at most 244 bytes each.
pub const RX_PACKET_QUEUE_DEPTH: usize = 16;

/// Built packets buffered between the send path and the notify loop.
///
/// A SysEx send publishes all but its last packet before returning, and
/// is refused when they do not all fit. 16 slots cover a
/// `SYSEX_BUFFER_SIZE` payload at the default MTU with room to spare.
pub const TX_PACKET_QUEUE_DEPTH: usize = 16;

/// Received events buffered for the application.
pub const MIDI_IN_QUEUE_DEPTH: usize = 8;

// Controls

/// Touch pad debounce time (ms).
pub const TOUCH_DEBOUNCE_MS: u32 = 25;

/// Measurement at or above which a pad counts as touched.
pub const TOUCH_THRESHOLD: u16 = 850;

/// Touch pad polling interval (ms).
pub const TOUCH_POLL_MS: u64 = 1;

/// Encoder pulses per detent.
pub const ENCODER_PULSES_PER_STEP: u8 = 4;

/// Encoder speed multiplier.
pub const ENCODER_SPEED_MULTIPLY: i8 = 1;

/// MIDI channel (0-based) used by all controls.
pub const MIDI_CHANNEL: u8 = 0;

/// First Control Change number assigned to the touch pads.
pub const TOUCH_PAD_FIRST_CC: u8 = 0x10;

/// Control Change number of the rotary encoder.
pub const ENCODER_CC: u8 = 0x14;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Touch pad 0    → P0.02 (AIN0)
//   Touch pad 1    → P0.03 (AIN1)
//   Touch pad 2    → P0.04 (AIN2)
//   Touch pad 3    → P0.05 (AIN3)
//   Encoder A      → P0.11
//   Encoder B      → P0.12
//   Status LED     → P0.13
//
// Each pad is read as an analog level from a touch front-end.

/// Number of touch pads.
pub const TOUCH_PAD_COUNT: usize = 4;
