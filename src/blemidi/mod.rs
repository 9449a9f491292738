//! BLE-MIDI transport codec.
//!
//! - **timestamp**: 13-bit header/timestamp byte encoding.
//! - **builder**: packs outgoing messages into capacity-bounded packets,
//!   fragmenting SysEx across packets.
//! - **parser**: strips timestamps from received packets.
//! - **scheduler**: bounds how long a partially filled packet may wait.

pub mod builder;
pub mod parser;
pub mod scheduler;
pub mod timestamp;


pub use builder::{PacketBuilder, SysExCursor, SYSEX_END, SYSEX_START};
pub use parser::{decode, is_ambiguous, is_data, parse_packet, DecodedByte, PacketBytes};
pub use scheduler::FlushScheduler;
pub use timestamp::{encode_timestamp, Timestamp};
