//! Controls mapped to Control Change messages.

use super::debounce::{ButtonState, DebounceConfig, TouchButton};
use super::encoder::EncoderDelta;
use crate::midi::MidiEvent;

/// Touch pad sending CC value 127 on touch and 0 on release.
#[derive(Clone, Debug)]
pub struct CcTouchButton {
    button: TouchButton,
    channel: u8,
    controller: u8,
}

impl CcTouchButton {
    pub const ON_VALUE: u8 = 0x7F;
    pub const OFF_VALUE: u8 = 0x00;

    pub const fn new(config: DebounceConfig, channel: u8, controller: u8) -> Self {
        Self {
            button: TouchButton::new(config),
            channel,
            controller,
        }
    }

    pub fn invert(&mut self) {
        self.button.invert();
    }

    pub fn controller(&self) -> u8 {
        self.controller
    }

    pub fn update(&mut self, measurement: u16, now_ms: u32) -> Option<MidiEvent> {
        let value = match self.button.update(measurement, now_ms) {
            ButtonState::Falling => Self::ON_VALUE,
            ButtonState::Rising => Self::OFF_VALUE,
            ButtonState::Pressed | ButtonState::Released => return None,
        };
        Some(MidiEvent::control_change(
            self.channel,
            self.controller,
            value,
        ))
    }

    pub fn state(&self) -> ButtonState {
        self.button.state()
    }
}

/// Rotary encoder sending relative Control Change messages.
///
/// Deltas are sent in 7-bit two's complement (1 = +1, 0x7F = -1) and
/// clamped to `-64..=63` per message.
#[derive(Clone, Debug)]
pub struct CcRotaryEncoder {
    delta: EncoderDelta,
    channel: u8,
    controller: u8,
}

impl CcRotaryEncoder {
    pub const fn new(delta: EncoderDelta, channel: u8, controller: u8) -> Self {
        Self {
            delta,
            channel,
            controller,
        }
    }

    pub fn controller(&self) -> u8 {
        self.controller
    }

    /// Feed the encoder's absolute pulse count.
    pub fn update(&mut self, position: i32) -> Option<MidiEvent> {
        let delta = self.delta.update(position)?;
        Some(MidiEvent::control_change(
            self.channel,
            self.controller,
            relative_value(delta),
        ))
    }
}

/// Encode a signed delta as a 7-bit two's complement CC value.
pub const fn relative_value(delta: i32) -> u8 {
    let clamped = if delta < -64 {
        -64
    } else if delta > 63 {
        63
    } else {
        delta
    };
    (clamped as u8) & 0x7F
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: DebounceConfig = DebounceConfig {
        debounce_ms: 5,
        threshold: 500,
    };

    #[test]
    fn touch_sends_on_then_off() {
        let mut pad = CcTouchButton::new(FAST, 2, 0x10);
        assert_eq!(pad.update(0, 0), None);
        assert_eq!(
            pad.update(900, 1),
            Some(MidiEvent::control_change(2, 0x10, 0x7F))
        );
        assert_eq!(pad.update(900, 2), None);
        assert_eq!(pad.update(900, 50), None);
        assert_eq!(
            pad.update(0, 100),
            Some(MidiEvent::control_change(2, 0x10, 0x00))
        );
        assert_eq!(pad.update(0, 101), None);
        assert_eq!(pad.state(), ButtonState::Released);
    }

    #[test]
    fn relative_values() {
        assert_eq!(relative_value(1), 0x01);
        assert_eq!(relative_value(-1), 0x7F);
        assert_eq!(relative_value(63), 0x3F);
        assert_eq!(relative_value(-64), 0x40);
        assert_eq!(relative_value(500), 0x3F);
        assert_eq!(relative_value(-500), 0x40);
    }

    #[test]
    fn encoder_sends_relative_cc() {
        let mut enc = CcRotaryEncoder::new(EncoderDelta::new(1, 4), 0, 0x14);
        assert_eq!(enc.update(2), None);
        assert_eq!(
            enc.update(8),
            Some(MidiEvent::control_change(0, 0x14, 0x02))
        );
        assert_eq!(
            enc.update(4),
            Some(MidiEvent::control_change(0, 0x14, 0x7F))
        );
    }
}
