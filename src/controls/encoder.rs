//! Rotary encoder step accumulation.

use crate::config::{ENCODER_PULSES_PER_STEP, ENCODER_SPEED_MULTIPLY};

/// Turns an absolute pulse count into step deltas.
///
/// Pulses that do not make up a whole step are carried over to the next
/// update, so slow turning is never lost.
#[derive(Clone, Debug)]
pub struct EncoderDelta {
    speed_multiply: i32,
    pulses_per_step: i32,
    offset: i32,
}

impl EncoderDelta {
    /// A zero `speed_multiply` or `pulses_per_step` is treated as 1. A
    /// negative `speed_multiply` reverses the direction.
    pub const fn new(speed_multiply: i8, pulses_per_step: u8) -> Self {
        Self {
            speed_multiply: if speed_multiply == 0 {
                1
            } else {
                speed_multiply as i32
            },
            pulses_per_step: if pulses_per_step == 0 {
                1
            } else {
                pulses_per_step as i32
            },
            offset: 0,
        }
    }

    /// Steps since the last reported delta, or `None` when the encoder has
    /// not moved a whole step.
    pub fn update(&mut self, position: i32) -> Option<i32> {
        let delta = position.wrapping_sub(self.offset) * self.speed_multiply / self.pulses_per_step;
        if delta == 0 {
            return None;
        }
        self.offset = self
            .offset
            .wrapping_add(delta * self.pulses_per_step / self.speed_multiply);
        Some(delta)
    }
}

impl Default for EncoderDelta {
    fn default() -> Self {
        Self::new(ENCODER_SPEED_MULTIPLY, ENCODER_PULSES_PER_STEP)
    }
}
