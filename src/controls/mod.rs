//! Physical controls and their MIDI mappings.
//!
//! Everything here is sampled: the caller reads the hardware and passes the
//! raw value together with a millisecond timestamp, so the logic runs on
//! the host as well as on the target.

pub mod button;
pub mod debounce;
pub mod encoder;

pub use button::{relative_value, CcRotaryEncoder, CcTouchButton};
pub use debounce::{ButtonState, DebounceConfig, Debouncer, TouchButton};
pub use encoder::EncoderDelta;
