//! Two-bit shift-register debouncer and the touch pad built on it.
//!
//! The debounced level history is kept in two bits (previous, current):
//!
//! ```text
//!   Released   Falling   Pressed   Rising
//!     0b11      0b10      0b00      0b01
//! ```
//!
//! Levels are active-low: "pressed" is logical low. A change of the raw
//! input starts a bounce window; while it is open the debounced level
//! holds.

use crate::config::{TOUCH_DEBOUNCE_MS, TOUCH_THRESHOLD};

/// Debounced button state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonState {
    /// Low to low.
    Pressed = 0b00,
    /// High to high.
    Released = 0b11,
    /// High to low: the press edge.
    Falling = 0b10,
    /// Low to high: the release edge.
    Rising = 0b01,
}

impl ButtonState {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => ButtonState::Pressed,
            0b10 => ButtonState::Falling,
            0b01 => ButtonState::Rising,
            _ => ButtonState::Released,
        }
    }
}

/// Per-instance debounce settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebounceConfig {
    /// Bounce window (ms).
    pub debounce_ms: u32,
    /// Touch measurement at or above which a pad counts as touched.
    pub threshold: u16,
}

impl DebounceConfig {
    pub const DEFAULT: Self = Self {
        debounce_ms: TOUCH_DEBOUNCE_MS,
        threshold: TOUCH_THRESHOLD,
    };
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Debug)]
pub struct Debouncer {
    debounce_ms: u32,
    /// Debounced levels, previous in bit 1 and current in bit 0.
    debounced: u8,
    bouncing: bool,
    prev_input: bool,
    prev_bounce_time: u32,
    invert: bool,
}

impl Debouncer {
    /// Starts out released (high).
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            debounced: 0b11,
            bouncing: false,
            prev_input: true,
            prev_bounce_time: 0,
            invert: false,
        }
    }

    /// Treat a high input as pressed from now on.
    pub fn invert(&mut self) {
        self.invert = true;
    }

    /// Sample the raw input level (`true` = high) at `now_ms`.
    pub fn update(&mut self, level: bool, now_ms: u32) -> ButtonState {
        let input = level != self.invert;

        if self.bouncing {
            self.bouncing = now_ms.wrapping_sub(self.prev_bounce_time) <= self.debounce_ms;
        }

        let prev_state = self.debounced & 0b01 != 0;
        let new_state = if self.bouncing { prev_state } else { input };
        self.debounced = (u8::from(prev_state) << 1) | u8::from(new_state);

        if input != self.prev_input {
            self.bouncing = true;
            self.prev_input = input;
            self.prev_bounce_time = now_ms;
        }
        self.state()
    }

    /// State computed by the last `update()`.
    pub fn state(&self) -> ButtonState {
        ButtonState::from_bits(self.debounced)
    }

    /// Milliseconds since the raw input last changed.
    pub fn stable_time(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.prev_bounce_time)
    }
}

/// A capacitive touch pad read as a button.
///
/// A measurement at or above the threshold counts as touched, which is
/// the pressed (low) level, so [`ButtonState::Falling`] marks the start of
/// a touch.
#[derive(Clone, Debug)]
pub struct TouchButton {
    debouncer: Debouncer,
    threshold: u16,
}

impl TouchButton {
    pub const fn new(config: DebounceConfig) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce_ms),
            threshold: config.threshold,
        }
    }

    pub fn invert(&mut self) {
        self.debouncer.invert();
    }

    pub fn update(&mut self, measurement: u16, now_ms: u32) -> ButtonState {
        self.debouncer.update(measurement < self.threshold, now_ms)
    }

    pub fn state(&self) -> ButtonState {
        self.debouncer.state()
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_press_and_release() {
        let mut db = Debouncer::new(25);
        assert_eq!(db.update(true, 0), ButtonState::Released);
        assert_eq!(db.update(false, 10), ButtonState::Falling);
        assert_eq!(db.update(false, 11), ButtonState::Pressed);
        assert_eq!(db.update(false, 100), ButtonState::Pressed);
        assert_eq!(db.update(true, 200), ButtonState::Rising);
        assert_eq!(db.update(true, 201), ButtonState::Released);
    }

    #[test]
    fn bounces_inside_window_are_ignored() {
        let mut db = Debouncer::new(25);
        assert_eq!(db.update(false, 0), ButtonState::Falling);
        assert_eq!(db.update(true, 1), ButtonState::Pressed);
        assert_eq!(db.update(false, 2), ButtonState::Pressed);
        assert_eq!(db.update(true, 3), ButtonState::Pressed);
        // Settled high, but the window restarted at t=3.
        assert_eq!(db.update(true, 28), ButtonState::Pressed);
        assert_eq!(db.update(true, 29), ButtonState::Rising);
        assert_eq!(db.update(true, 30), ButtonState::Released);
    }

    #[test]
    fn inverted_input() {
        let mut db = Debouncer::new(25);
        db.invert();
        assert_eq!(db.update(false, 0), ButtonState::Released);
        assert_eq!(db.update(true, 100), ButtonState::Falling);
    }

    #[test]
    fn stable_time_counts_from_last_change() {
        let mut db = Debouncer::new(25);
        db.update(false, 40);
        assert_eq!(db.stable_time(100), 60);
    }

    #[test]
    fn touch_above_threshold_presses() {
        let config = DebounceConfig {
            debounce_ms: 5,
            threshold: 500,
        };
        let mut pad = TouchButton::new(config);
        assert_eq!(pad.update(100, 0), ButtonState::Released);
        assert_eq!(pad.update(499, 1), ButtonState::Released);
        assert_eq!(pad.update(500, 2), ButtonState::Falling);
        assert_eq!(pad.update(800, 3), ButtonState::Pressed);
        assert_eq!(pad.update(100, 20), ButtonState::Rising);
        assert_eq!(pad.state(), ButtonState::Rising);
    }

    #[test]
    fn instances_keep_their_own_config() {
        let mut a = TouchButton::new(DebounceConfig {
            debounce_ms: 5,
            threshold: 100,
        });
        let b = TouchButton::new(DebounceConfig::default());
        assert_eq!(a.update(200, 0), ButtonState::Falling);
        assert_eq!(a.threshold(), 100);
        assert_eq!(b.threshold(), TOUCH_THRESHOLD);
    }
}
