//! Incoming BLE-MIDI packet parser.
//!
//! Strips the header and timestamp bytes from a received packet and yields
//! the remaining MIDI bytes in their original order, ready to be fed one at
//! a time into a running-status byte parser.
//!
//! Timestamp bytes and status bytes both have bit 7 set, so they are told
//! apart by position:
//!
//! - byte 0 is the header and is never forwarded;
//! - byte 1 is forwarded only if it is a data byte (a continuation packet
//!   that starts with running-status or SysEx data), otherwise it is the
//!   first timestamp;
//! - after that, a high-bit byte that follows a timestamp is a status byte,
//!   and a high-bit byte that follows anything else is a timestamp. Every
//!   high-bit byte toggles the rule.

/// `true` for MIDI data bytes (bit 7 clear).
#[inline]
pub const fn is_data(byte: u8) -> bool {
    byte & 0x80 == 0
}

/// One MIDI byte recovered from a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedByte {
    pub byte: u8,
    /// The byte directly before this one was read as a timestamp (or the
    /// header).
    pub after_timestamp: bool,
}

/// Iterator over the MIDI bytes of one packet. See [`decode`].
#[derive(Clone, Debug)]
pub struct PacketBytes<'a> {
    rest: &'a [u8],
    at_first: bool,
    prev_was_timestamp: bool,
}

/// Walk a received packet.
///
/// Packets of one byte or less, and packets whose first byte is not a
/// header, yield nothing.
pub fn decode(packet: &[u8]) -> PacketBytes<'_> {
    let rest = match packet {
        [header, rest @ ..] if !rest.is_empty() && !is_data(*header) => rest,
        _ => &[],
    };
    PacketBytes {
        rest,
        at_first: true,
        prev_was_timestamp: true,
    }
}

/// `true` when the packet matches the pattern the toggle rule cannot
/// resolve: a data byte right after the header followed by a high-bit byte.
/// That byte is forwarded as a status byte although it may be a genuine
/// timestamp.
pub fn is_ambiguous(packet: &[u8]) -> bool {
    matches!(packet, [header, first, second, ..]
        if !is_data(*header) && is_data(*first) && !is_data(*second))
}

impl Iterator for PacketBytes<'_> {
    type Item = DecodedByte;

    fn next(&mut self) -> Option<DecodedByte> {
        while let Some((&byte, rest)) = self.rest.split_first() {
            self.rest = rest;
            let after_timestamp = self.prev_was_timestamp;

            if self.at_first {
                self.at_first = false;
                if is_data(byte) {
                    return Some(DecodedByte {
                        byte,
                        after_timestamp,
                    });
                }
                // First timestamp; the flag is already set.
                continue;
            }

            if is_data(byte) {
                self.prev_was_timestamp = false;
                return Some(DecodedByte {
                    byte,
                    after_timestamp,
                });
            }

            self.prev_was_timestamp = !self.prev_was_timestamp;
            if after_timestamp {
                return Some(DecodedByte {
                    byte,
                    after_timestamp,
                });
            }
        }
        None
    }
}

/// Feed every MIDI byte of `packet` to `forward`, in order.
pub fn parse_packet(packet: &[u8], mut forward: impl FnMut(u8)) {
    for decoded in decode(packet) {
        forward(decoded.byte);
    }
}
