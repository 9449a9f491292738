//! blemidi firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Tasks:
//!   - softdevice: runs the SoftDevice event loop
//!   - ble: advertising, GATT server, notifications, MTU tracking
//!   - receive: BLE-MIDI packets → MIDI events
//!   - midi_in: consumes received events (status LED)
//!   - touch / encoder: controls → MIDI events
//!   - flush: periodic flush of partially filled packets
//!
//! The send path is shared by the control tasks, the flush tick and the BLE
//! task, so it lives behind a critical-section mutex and never awaits.

#![no_std]
#![no_main]

mod ble;
mod input;

use core::cell::RefCell;
use core::mem;

use blemidi::config::{BLE_DEVICE_NAME, MAX_ATT_MTU, MAX_PACKET_SIZE, MIDI_IN_QUEUE_DEPTH};
use blemidi::config::{RX_PACKET_QUEUE_DEPTH, TX_PACKET_QUEUE_DEPTH};
use blemidi::midi::MidiMessage;
use blemidi::{BleMidiOutput, MidiEvent};
use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive, Pin};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::{bind_interrupts, peripherals, qdec, saadc};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::server::Server;
use crate::ble::QueuedTransport;

/// One BLE-MIDI packet.
pub type Packet = heapless::Vec<u8, MAX_PACKET_SIZE>;

/// Packets built by the send path, waiting for notification.
pub static TX_PACKETS: Channel<CriticalSectionRawMutex, Packet, TX_PACKET_QUEUE_DEPTH> =
    Channel::new();

/// Packets written by the central.
pub static RX_PACKETS: Channel<CriticalSectionRawMutex, Packet, RX_PACKET_QUEUE_DEPTH> =
    Channel::new();

/// Decoded incoming MIDI events.
pub static MIDI_IN: Channel<CriticalSectionRawMutex, MidiEvent, MIDI_IN_QUEUE_DEPTH> =
    Channel::new();

static OUTPUT: Mutex<CriticalSectionRawMutex, RefCell<BleMidiOutput<QueuedTransport>>> =
    Mutex::new(RefCell::new(BleMidiOutput::new(QueuedTransport)));

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    QDEC => qdec::InterruptHandler<peripherals::QDEC>;
});

/// Run `f` with exclusive access to the send path.
pub fn with_output<R>(f: impl FnOnce(&mut BleMidiOutput<QueuedTransport>) -> R) -> R {
    OUTPUT.lock(|cell| f(&mut cell.borrow_mut()))
}

/// Milliseconds since boot, wrapping.
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Queue an event on the send path.
pub fn send(event: &MidiEvent) {
    let now = now_ms();
    if let Err(e) = with_output(|out| out.send(event, now)) {
        warn!("MIDI send failed: {}", e);
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    ble::server::ble_task(sd, server).await
}

#[embassy_executor::task]
async fn receive_task() -> ! {
    ble::server::receive_task().await
}

#[embassy_executor::task]
async fn touch_task(saadc: saadc::Saadc<'static, { blemidi::config::TOUCH_PAD_COUNT }>) -> ! {
    input::touch_task(saadc).await
}

#[embassy_executor::task]
async fn encoder_task(qdec: qdec::Qdec<'static, peripherals::QDEC>) -> ! {
    input::encoder_task(qdec).await
}

#[embassy_executor::task]
async fn flush_task() -> ! {
    input::flush_task().await
}

/// Log received events and light the LED while a note is held.
#[embassy_executor::task]
async fn midi_in_task(led: AnyPin) -> ! {
    // nRF52840-DK LEDs are active-low.
    let mut led = Output::new(led, Level::High, OutputDrive::Standard);
    loop {
        let event = MIDI_IN.receive().await;
        info!("MIDI in: {}", event);
        if let MidiEvent::Midi { message, .. } = event {
            match message {
                MidiMessage::NoteOn { vel, .. } if vel.as_int() > 0 => led.set_low(),
                MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. } => led.set_high(),
                _ => {}
            }
        }
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: MAX_ATT_MTU,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("blemidi starting");

    // Interrupt priorities 0, 1 and 4 are reserved by the SoftDevice.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::SAADC.set_priority(Priority::P3);
    interrupt::QDEC.set_priority(Priority::P3);

    let sd = Softdevice::enable(&softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server = SERVER.init(unwrap!(Server::new(sd)));
    unwrap!(spawner.spawn(softdevice_task(sd)));

    let saadc = saadc::Saadc::new(
        p.SAADC,
        Irqs,
        saadc::Config::default(),
        [
            saadc::ChannelConfig::single_ended(p.P0_02),
            saadc::ChannelConfig::single_ended(p.P0_03),
            saadc::ChannelConfig::single_ended(p.P0_04),
            saadc::ChannelConfig::single_ended(p.P0_05),
        ],
    );
    let qdec = qdec::Qdec::new(p.QDEC, Irqs, p.P0_11, p.P0_12, qdec::Config::default());

    unwrap!(spawner.spawn(ble_task(sd, server)));
    unwrap!(spawner.spawn(receive_task()));
    unwrap!(spawner.spawn(midi_in_task(p.P0_13.degrade())));
    unwrap!(spawner.spawn(touch_task(saadc)));
    unwrap!(spawner.spawn(encoder_task(qdec)));
    unwrap!(spawner.spawn(flush_task()));
}
