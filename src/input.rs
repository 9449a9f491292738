//! Control sampling tasks.
//!
//!   - touch pads: SAADC levels, debounced, sent as CC on/off
//!   - encoder: QDEC pulse count, sent as relative CC
//!   - flush tick: bounds the latency of partially filled packets
//!
//! All of them feed the shared send path through [`crate::send`].

use blemidi::config::{
    ENCODER_CC, FLUSH_TICK_MS, MIDI_CHANNEL, TOUCH_PAD_COUNT, TOUCH_PAD_FIRST_CC, TOUCH_POLL_MS,
};
use blemidi::controls::{CcRotaryEncoder, CcTouchButton, DebounceConfig, EncoderDelta};
use defmt::debug;
use embassy_nrf::peripherals::QDEC;
use embassy_nrf::qdec::Qdec;
use embassy_nrf::saadc::Saadc;
use embassy_time::{Duration, Ticker};

use crate::{now_ms, send, with_output};

/// Poll every pad once per `TOUCH_POLL_MS`.
pub async fn touch_task(mut saadc: Saadc<'static, TOUCH_PAD_COUNT>) -> ! {
    saadc.calibrate().await;

    let config = DebounceConfig::default();
    let mut pads: [CcTouchButton; TOUCH_PAD_COUNT] = core::array::from_fn(|i| {
        CcTouchButton::new(config, MIDI_CHANNEL, TOUCH_PAD_FIRST_CC + i as u8)
    });
    let mut samples = [0i16; TOUCH_PAD_COUNT];
    let mut ticker = Ticker::every(Duration::from_millis(TOUCH_POLL_MS));

    loop {
        saadc.sample(&mut samples).await;
        let now = now_ms();
        for (pad, &sample) in pads.iter_mut().zip(samples.iter()) {
            // Negative readings are noise around ground.
            let level = sample.max(0) as u16;
            if let Some(event) = pad.update(level, now) {
                debug!("pad CC {} -> {}", pad.controller(), event);
                send(&event);
            }
        }
        ticker.next().await;
    }
}

pub async fn encoder_task(mut qdec: Qdec<'static, QDEC>) -> ! {
    let mut encoder = CcRotaryEncoder::new(EncoderDelta::default(), MIDI_CHANNEL, ENCODER_CC);
    let mut position: i32 = 0;

    loop {
        position = position.wrapping_add(i32::from(qdec.read().await));
        if let Some(event) = encoder.update(position) {
            debug!("encoder -> {}", event);
            send(&event);
        }
    }
}

pub async fn flush_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(FLUSH_TICK_MS));
    loop {
        ticker.next().await;
        let now = now_ms();
        with_output(|out| out.update(now));
    }
}
