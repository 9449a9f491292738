//! MIDI message model shared by the send and receive paths.
//!
//! Channel, system common and real-time messages use midly's types. SysEx
//! is the one message midly only lends out as a borrowed slice, so it is
//! copied into a fixed-size payload here; that keeps every event owned
//! and able to travel through channels and mailboxes without `alloc`.
//! SysEx payloads are kept without the `F0`/`F7` framing.

pub mod stream;

use heapless::Vec;
use midly::io::Cursor;

pub use midly::live::{LiveEvent, SystemCommon, SystemRealtime};
pub use midly::num::{u14, u4, u7};
pub use midly::MidiMessage;

use crate::config::SYSEX_BUFFER_SIZE;

/// SysEx payload (data bytes only).
pub type SysExData = Vec<u8, SYSEX_BUFFER_SIZE>;

/// Raw bytes of any message other than SysEx.
pub type RawMessage = Vec<u8, 3>;

/// A complete MIDI message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MidiEvent {
    /// Channel voice message.
    Midi { channel: u4, message: MidiMessage },
    /// System common message other than SysEx. Undefined ones keep only
    /// their status byte.
    Common(SystemCommon<'static>),
    /// Single-byte real-time message.
    Realtime(SystemRealtime),
    /// System exclusive message.
    SysEx(SysExData),
}

impl MidiEvent {
    pub const fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        MidiEvent::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOn {
                key: u7::new(note),
                vel: u7::new(velocity),
            },
        }
    }

    pub const fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        MidiEvent::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOff {
                key: u7::new(note),
                vel: u7::new(velocity),
            },
        }
    }

    pub const fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        MidiEvent::Midi {
            channel: u4::new(channel),
            message: MidiMessage::Controller {
                controller: u7::new(controller),
                value: u7::new(value),
            },
        }
    }

    pub const fn program_change(channel: u8, program: u8) -> Self {
        MidiEvent::Midi {
            channel: u4::new(channel),
            message: MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        }
    }

    /// Take ownership of a parsed event.
    ///
    /// Returns `None` for a SysEx payload longer than `SYSEX_BUFFER_SIZE`.
    pub fn from_live(event: LiveEvent<'_>) -> Option<Self> {
        let common = match event {
            LiveEvent::Midi { channel, message } => {
                return Some(MidiEvent::Midi { channel, message })
            }
            LiveEvent::Realtime(realtime) => return Some(MidiEvent::Realtime(realtime)),
            LiveEvent::Common(common) => common,
        };
        let common = match common {
            SystemCommon::SysEx(data) => {
                return match SysExData::from_slice(u7::slice_as_int(data)) {
                    Ok(payload) => Some(MidiEvent::SysEx(payload)),
                    Err(()) => {
                        warn!("SysEx longer than {} bytes, dropping it", SYSEX_BUFFER_SIZE);
                        None
                    }
                };
            }
            SystemCommon::MidiTimeCodeQuarterFrame(kind, value) => {
                SystemCommon::MidiTimeCodeQuarterFrame(kind, value)
            }
            SystemCommon::SongPosition(position) => SystemCommon::SongPosition(position),
            SystemCommon::SongSelect(song) => SystemCommon::SongSelect(song),
            SystemCommon::TuneRequest => SystemCommon::TuneRequest,
            SystemCommon::Undefined(status, _) => SystemCommon::Undefined(status, &[]),
        };
        Some(MidiEvent::Common(common))
    }

    /// Wire bytes of the message, status first. `None` for SysEx, which
    /// the send path frames itself.
    pub fn to_raw(&self) -> Option<RawMessage> {
        let live = match *self {
            MidiEvent::Midi { channel, message } => LiveEvent::Midi { channel, message },
            MidiEvent::Common(common) => LiveEvent::Common(common),
            MidiEvent::Realtime(realtime) => LiveEvent::Realtime(realtime),
            MidiEvent::SysEx(_) => return None,
        };
        let mut raw = [0u8; 3];
        let len = {
            let mut out = Cursor::new(&mut raw);
            live.write(&mut out).ok()?;
            out.cursor()
        };
        RawMessage::from_slice(&raw[..len]).ok()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MidiEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            MidiEvent::SysEx(payload) => defmt::write!(f, "SysEx({} bytes)", payload.len()),
            event => match event.to_raw() {
                Some(raw) => defmt::write!(f, "{=[u8]:x}", &raw[..]),
                None => defmt::write!(f, "?"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_mask_fields() {
        assert_eq!(
            MidiEvent::control_change(0x12, 0x90, 0xFF),
            MidiEvent::Midi {
                channel: u4::new(2),
                message: MidiMessage::Controller {
                    controller: u7::new(0x10),
                    value: u7::new(0x7F),
                },
            }
        );
    }

    #[test]
    fn raw_bytes_follow_message_length() {
        let raw = |event: MidiEvent| event.to_raw().unwrap().to_vec();
        assert_eq!(raw(MidiEvent::note_on(1, 60, 100)), vec![0x91, 60, 100]);
        assert_eq!(raw(MidiEvent::program_change(0, 5)), vec![0xC0, 5]);
        assert_eq!(raw(MidiEvent::Realtime(SystemRealtime::TimingClock)), vec![0xF8]);
        assert_eq!(
            raw(MidiEvent::Common(SystemCommon::SongPosition(u14::new(0x10 | 0x02 << 7)))),
            vec![0xF2, 0x10, 0x02]
        );
        assert_eq!(raw(MidiEvent::Common(SystemCommon::TuneRequest)), vec![0xF6]);
        assert_eq!(MidiEvent::SysEx(SysExData::new()).to_raw(), None);
    }

    #[test]
    fn parsed_events_become_owned() {
        let live = LiveEvent::parse(&[0x93, 0x3C, 0x40]).unwrap();
        assert_eq!(MidiEvent::from_live(live), Some(MidiEvent::note_on(3, 0x3C, 0x40)));

        let payload = [0x7Eu8, 0x7F, 0x06, 0x01];
        let live = LiveEvent::Common(SystemCommon::SysEx(u7::slice_from_int(&payload)));
        let mut expected = SysExData::new();
        expected.extend_from_slice(&payload).unwrap();
        assert_eq!(MidiEvent::from_live(live), Some(MidiEvent::SysEx(expected)));
    }

    #[test]
    fn overlong_sysex_is_not_kept() {
        let payload = [0x11u8; SYSEX_BUFFER_SIZE + 1];
        let live = LiveEvent::Common(SystemCommon::SysEx(u7::slice_from_int(&payload)));
        assert_eq!(MidiEvent::from_live(live), None);
    }
}
