//! Raw MIDI byte stream to owned events.
//!
//! Parsing is midly's [`MidiStream`]: running status, real-time bytes in
//! the middle of other messages and SysEx reassembly all happen there.
//! This wrapper only turns its borrowed events into [`MidiEvent`]s and
//! closes system common messages as soon as their data is in.

use core::fmt;

use midly::live::LiveEvent;
use midly::stream::MidiStream;

use super::MidiEvent;
use crate::config::SYSEX_BUFFER_SIZE;

midly::stack_buffer! {
    /// Message being assembled. One byte larger than the SysEx payload we
    /// keep, so an overlong SysEx is still seen whole and refused.
    struct StreamBuffer([u8; SYSEX_BUFFER_SIZE + 1]);
}

/// Stateful byte-level MIDI reader.
pub struct MidiReader {
    stream: MidiStream<StreamBuffer>,
    /// Open system common message: status and data bytes seen so far.
    common: Option<(u8, usize)>,
}

impl MidiReader {
    pub fn new() -> Self {
        Self {
            stream: MidiStream::with_buffer(StreamBuffer::new()),
            common: None,
        }
    }

    /// Feed one byte, handing every message it completes to `handle_ev`.
    ///
    /// A byte completes at most two messages: a status byte can close the
    /// message before it and be a one-byte message itself.
    pub fn feed(&mut self, byte: u8, mut handle_ev: impl FnMut(MidiEvent)) {
        self.stream.feed(&[byte], |live| deliver(live, &mut handle_ev));

        // A raw stream ends system common messages at the next status
        // byte. BLE-MIDI never splits them, so do not wait for one.
        self.track_common(byte);
        if self.common_complete() {
            self.common = None;
            self.stream.flush(|live| deliver(live, &mut handle_ev));
        }
    }

    fn track_common(&mut self, byte: u8) {
        match byte {
            0x00..=0x7F => {
                if let Some((_, seen)) = &mut self.common {
                    *seen += 1;
                }
            }
            0xF8..=0xFF => {}
            0xF1..=0xF6 => self.common = Some((byte, 0)),
            _ => self.common = None,
        }
    }

    fn common_complete(&self) -> bool {
        matches!(
            self.common,
            Some((0xF1 | 0xF3, 1)) | Some((0xF2, 2)) | Some((0xF4..=0xF6, _))
        )
    }
}

impl Default for MidiReader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MidiReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiReader")
            .field("common", &self.common)
            .finish_non_exhaustive()
    }
}

fn deliver(live: LiveEvent<'_>, handle_ev: &mut impl FnMut(MidiEvent)) {
    if let Some(event) = MidiEvent::from_live(live) {
        handle_ev(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{u14, SysExData, SystemCommon, SystemRealtime};

    fn read_all(bytes: &[u8]) -> Vec<MidiEvent> {
        let mut reader = MidiReader::new();
        let mut events = Vec::new();
        for &byte in bytes {
            reader.feed(byte, |ev| events.push(ev));
        }
        events
    }

    fn sysex(payload: &[u8]) -> MidiEvent {
        let mut data = SysExData::new();
        data.extend_from_slice(payload).unwrap();
        MidiEvent::SysEx(data)
    }

    #[test]
    fn note_on_completes_on_last_data_byte() {
        let mut reader = MidiReader::new();
        let mut events = Vec::new();
        for byte in [0x90, 0x3C] {
            reader.feed(byte, |ev| events.push(ev));
        }
        assert!(events.is_empty());
        reader.feed(0x7F, |ev| events.push(ev));
        assert_eq!(events, vec![MidiEvent::note_on(0, 0x3C, 0x7F)]);
    }

    #[test]
    fn running_status_reuses_previous_status() {
        assert_eq!(
            read_all(&[0x91, 0x3C, 0x7F, 0x3E, 0x40, 0x40, 0x00]),
            vec![
                MidiEvent::note_on(1, 0x3C, 0x7F),
                MidiEvent::note_on(1, 0x3E, 0x40),
                MidiEvent::note_on(1, 0x40, 0x00),
            ]
        );
    }

    #[test]
    fn realtime_does_not_break_running_message() {
        assert_eq!(
            read_all(&[0xB0, 0x07, 0xF8, 0x64]),
            vec![
                MidiEvent::Realtime(SystemRealtime::TimingClock),
                MidiEvent::control_change(0, 0x07, 0x64),
            ]
        );
    }

    #[test]
    fn data_without_status_is_ignored() {
        assert!(read_all(&[0x3C, 0x7F]).is_empty());
    }

    #[test]
    fn system_common_is_delivered_without_waiting() {
        assert_eq!(
            read_all(&[0xF2, 0x10, 0x02]),
            vec![MidiEvent::Common(SystemCommon::SongPosition(u14::new(
                0x10 | 0x02 << 7
            )))]
        );
        assert_eq!(
            read_all(&[0xF6]),
            vec![MidiEvent::Common(SystemCommon::TuneRequest)]
        );
    }

    #[test]
    fn system_common_clears_running_status() {
        assert_eq!(
            read_all(&[0x90, 0x3C, 0x7F, 0xF6, 0x3C, 0x7F]),
            vec![
                MidiEvent::note_on(0, 0x3C, 0x7F),
                MidiEvent::Common(SystemCommon::TuneRequest),
            ]
        );
    }

    #[test]
    fn sysex_is_reassembled() {
        assert_eq!(
            read_all(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]),
            vec![sysex(&[0x7E, 0x7F, 0x06, 0x01])]
        );
    }

    #[test]
    fn realtime_inside_sysex() {
        assert_eq!(
            read_all(&[0xF0, 0x01, 0xF8, 0x02, 0xF7]),
            vec![
                MidiEvent::Realtime(SystemRealtime::TimingClock),
                sysex(&[0x01, 0x02]),
            ]
        );
    }

    #[test]
    fn oversized_sysex_is_dropped() {
        let mut bytes = vec![0xF0];
        bytes.extend(core::iter::repeat(0x11).take(SYSEX_BUFFER_SIZE + 8));
        bytes.push(0xF7);
        bytes.extend_from_slice(&[0x90, 0x3C, 0x7F]);
        assert_eq!(read_all(&bytes), vec![MidiEvent::note_on(0, 0x3C, 0x7F)]);
    }
}
