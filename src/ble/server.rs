//! BLE-MIDI GATT server, advertising and the connection lifecycle.

use core::sync::atomic::Ordering;

use blemidi::config::{
    BLE_ADV_INTERVAL, BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN, BLE_DEVICE_NAME,
    BLE_MIDI_SERVICE_UUID_LE, BLE_SLAVE_LATENCY, BLE_SUP_TIMEOUT, DEFAULT_ATT_MTU,
    MAX_PACKET_SIZE, MTU_POLL_MS,
};
use blemidi::{BleMidiInput, Mailbox, MidiEvent};
use defmt::{info, warn};
use embassy_futures::select::{select3, Either3};
use embassy_time::{Duration, Ticker};
use heapless::Vec;
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};

use super::{NEGOTIATED_MTU, SUBSCRIBED};
use crate::{with_output, MIDI_IN, RX_PACKETS, TX_PACKETS};

/// BLE-MIDI service with its single I/O characteristic.
///
/// Reads return an empty value; writes carry incoming packets and
/// notifications carry outgoing ones.
#[nrf_softdevice::gatt_service(uuid = "03B80E5A-EDE8-4B33-A751-6CE34EC4C700")]
pub struct MidiService {
    #[characteristic(
        uuid = "7772E5DB-3868-4112-A1A9-F2669D106BF3",
        read,
        write_without_response,
        notify
    )]
    pub io: Vec<u8, MAX_PACKET_SIZE>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub midi: MidiService,
}

const ADV_DATA_LEN: usize = 3 + 2 + 16;
const SCAN_DATA_LEN: usize = 2 + BLE_DEVICE_NAME.len();

/// Flags + complete list of 128-bit service UUIDs.
static ADV_DATA: [u8; ADV_DATA_LEN] = adv_data();

/// Complete local name.
static SCAN_DATA: [u8; SCAN_DATA_LEN] = scan_data();

const fn adv_data() -> [u8; ADV_DATA_LEN] {
    let mut data = [0u8; ADV_DATA_LEN];
    data[0] = 0x02;
    data[1] = raw::BLE_GAP_AD_TYPE_FLAGS as u8;
    data[2] = raw::BLE_GAP_ADV_FLAGS_LE_ONLY_GENERAL_DISC_MODE as u8;
    data[3] = 0x11;
    data[4] = raw::BLE_GAP_AD_TYPE_128BIT_SERVICE_UUID_COMPLETE as u8;
    let mut i = 0;
    while i < BLE_MIDI_SERVICE_UUID_LE.len() {
        data[5 + i] = BLE_MIDI_SERVICE_UUID_LE[i];
        i += 1;
    }
    data
}

const fn scan_data() -> [u8; SCAN_DATA_LEN] {
    let name = BLE_DEVICE_NAME.as_bytes();
    let mut data = [0u8; SCAN_DATA_LEN];
    data[0] = (name.len() + 1) as u8;
    data[1] = raw::BLE_GAP_AD_TYPE_COMPLETE_LOCAL_NAME as u8;
    let mut i = 0;
    while i < name.len() {
        data[2 + i] = name[i];
        i += 1;
    }
    data
}

/// Advertise, serve one connection, repeat.
pub async fn ble_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    let config = peripheral::Config {
        interval: BLE_ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        info!("Advertising as {}", BLE_DEVICE_NAME);
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {:?}", e);
                continue;
            }
        };
        info!("Central connected");

        request_conn_params(&conn);

        let ended = select3(
            gatt_server::run(&conn, server, on_server_event),
            notify_loop(server, &conn),
            mtu_watch(&conn),
        )
        .await;
        if let Either3::First(e) = ended {
            info!("Central disconnected: {:?}", e);
        }

        on_disconnect();
    }
}

/// Ask for the short connection interval BLE-MIDI wants.
fn request_conn_params(conn: &Connection) {
    let params = raw::ble_gap_conn_params_t {
        min_conn_interval: BLE_CONN_INTERVAL_MIN,
        max_conn_interval: BLE_CONN_INTERVAL_MAX,
        slave_latency: BLE_SLAVE_LATENCY,
        conn_sup_timeout: BLE_SUP_TIMEOUT,
    };
    if let Err(e) = conn.set_conn_params(params) {
        warn!("connection parameter update rejected: {:?}", e);
    }
}

fn on_server_event(event: ServerEvent) {
    match event {
        ServerEvent::Midi(MidiServiceEvent::IoWrite(packet)) => {
            // Never block the SoftDevice event path.
            if RX_PACKETS.try_send(packet).is_err() {
                warn!("BLE-MIDI RX channel full - dropping packet");
            }
        }
        ServerEvent::Midi(MidiServiceEvent::IoCccdWrite { notifications }) => {
            info!("BLE-MIDI notifications: {}", notifications);
            SUBSCRIBED.store(notifications, Ordering::Relaxed);
        }
    }
}

async fn notify_loop(server: &Server, conn: &Connection) -> ! {
    loop {
        let packet = TX_PACKETS.receive().await;
        if let Err(e) = server.midi.io_notify(conn, &packet) {
            warn!("BLE-MIDI notify failed: {:?}", e);
        }
    }
}

/// Track MTU exchanges and resize the send path.
async fn mtu_watch(conn: &Connection) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(MTU_POLL_MS));
    loop {
        let mtu = conn.att_mtu();
        if NEGOTIATED_MTU.swap(mtu, Ordering::Relaxed) != mtu {
            info!("ATT MTU is now {}", mtu);
            with_output(|out| out.update_mtu());
        }
        ticker.next().await;
    }
}

fn on_disconnect() {
    SUBSCRIBED.store(false, Ordering::Relaxed);
    NEGOTIATED_MTU.store(DEFAULT_ATT_MTU, Ordering::Relaxed);
    with_output(|out| out.on_disconnect());
    while TX_PACKETS.try_receive().is_ok() {}
}

/// Turn received packets into events for the application.
///
/// The mailbox is drained into `MIDI_IN` with an awaiting send, so a slow
/// consumer holds events back instead of losing them.
pub async fn receive_task() -> ! {
    let mut input: BleMidiInput = BleMidiInput::new();
    let mut mailbox: Mailbox<MidiEvent> = Mailbox::new();

    loop {
        let packet = RX_PACKETS.receive().await;
        if let Err(e) = input.on_write(&packet) {
            warn!("BLE-MIDI packet dropped: {}", e);
        }

        loop {
            input.pump(&mut mailbox);
            match mailbox.take() {
                Some(event) => MIDI_IN.send(event).await,
                None => break,
            }
        }
    }
}
