//! Integration tests for blemidi host-testable logic.
//!
//! Two `BluetoothMidiInterface`s are wired back to back: packets notified
//! by one are written into the other, as a central would do.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use blemidi::controls::{CcRotaryEncoder, CcTouchButton, DebounceConfig, EncoderDelta};
use blemidi::midi::{SysExData, SystemRealtime};
use blemidi::{BleError, BluetoothMidiInterface, MidiEvent, Transport};

type Wire = Rc<RefCell<VecDeque<Vec<u8>>>>;

struct Loopback {
    wire: Wire,
    mtu: u16,
}

impl Transport for Loopback {
    fn notify(&mut self, packet: &[u8]) -> Result<(), BleError> {
        self.wire.borrow_mut().push_back(packet.to_vec());
        Ok(())
    }

    fn negotiated_mtu(&self) -> u16 {
        self.mtu
    }
}

fn link(mtu: u16) -> (BluetoothMidiInterface<Loopback>, Wire) {
    let wire = Wire::default();
    let mut device = BluetoothMidiInterface::new(Loopback {
        wire: wire.clone(),
        mtu,
    });
    device.update_mtu();
    (device, wire)
}

/// Deliver every packet on the wire to `peer` and read back all events.
fn deliver(wire: &Wire, peer: &mut BluetoothMidiInterface<Loopback>) -> Vec<MidiEvent> {
    let mut events = Vec::new();
    while let Some(packet) = wire.borrow_mut().pop_front() {
        peer.on_write(&packet).expect("packet fits the receive queue");
        while let Some(event) = peer.read() {
            events.push(event);
        }
    }
    events
}

#[test]
fn controls_reach_the_peer() {
    let (mut device, wire) = link(23);
    let (mut host, _) = link(23);

    let config = DebounceConfig {
        debounce_ms: 5,
        threshold: 500,
    };
    let mut pad = CcTouchButton::new(config, 0, 0x10);
    let mut knob = CcRotaryEncoder::new(EncoderDelta::new(1, 4), 0, 0x14);

    let mut sent = Vec::new();
    let inputs = [(0u32, 0u16, 0i32), (1, 900, 4), (2, 900, 8), (40, 0, 4)];
    for (now, touch, position) in inputs {
        for event in [pad.update(touch, now), knob.update(position)]
            .into_iter()
            .flatten()
        {
            device.send(&event, now).unwrap();
            sent.push(event);
        }
        device.update(now);
    }
    device.publish();

    assert_eq!(
        sent,
        vec![
            MidiEvent::control_change(0, 0x10, 0x7F),
            MidiEvent::control_change(0, 0x14, 0x01),
            MidiEvent::control_change(0, 0x14, 0x01),
            MidiEvent::control_change(0, 0x10, 0x00),
            MidiEvent::control_change(0, 0x14, 0x7F),
        ]
    );
    assert_eq!(deliver(&wire, &mut host), sent);
}

#[test]
fn sysex_between_channel_messages() {
    let (mut device, wire) = link(23);
    let (mut host, _) = link(23);

    let payload: Vec<u8> = (0..50u8).map(|b| b & 0x7F).collect();
    let mut framed = vec![0xF0];
    framed.extend_from_slice(&payload);
    framed.push(0xF7);

    device.send(&MidiEvent::note_on(3, 60, 100), 0).unwrap();
    device.send_sysex(&framed, 1).unwrap();
    device.send(&MidiEvent::Realtime(SystemRealtime::TimingClock), 2).unwrap();
    device.send(&MidiEvent::note_off(3, 60, 0), 3).unwrap();
    device.publish();

    assert!(wire.borrow().len() > 2);
    assert!(wire.borrow().iter().all(|p| p.len() <= 20));

    let mut sysex = SysExData::new();
    sysex.extend_from_slice(&payload).unwrap();
    assert_eq!(
        deliver(&wire, &mut host),
        vec![
            MidiEvent::note_on(3, 60, 100),
            MidiEvent::SysEx(sysex),
            MidiEvent::Realtime(SystemRealtime::TimingClock),
            MidiEvent::note_off(3, 60, 0),
        ]
    );
}

#[test]
fn larger_mtu_needs_fewer_packets() {
    let burst: Vec<MidiEvent> = (0..40).map(|n| MidiEvent::note_on(0, n, 64)).collect();

    let mut counts = Vec::new();
    for mtu in [23, 185] {
        let (mut device, wire) = link(mtu);
        let (mut host, _) = link(mtu);
        for event in &burst {
            device.send(event, 0).unwrap();
        }
        device.publish();
        counts.push(wire.borrow().len());
        assert_eq!(deliver(&wire, &mut host), burst);
    }
    // 4 notes per 20-byte packet vs 45 per 182-byte packet.
    assert_eq!(counts, vec![10, 1]);
}

#[test]
fn latency_budget_flushes_trickling_messages() {
    let (mut device, wire) = link(23);
    for now in 0..30 {
        if now % 7 == 0 {
            device.send(&MidiEvent::Realtime(SystemRealtime::TimingClock), now).unwrap();
        }
        device.update(now);
    }
    // Opened at 0, 14 and 28; flushed at 10 and 24, 28 still open.
    assert_eq!(wire.borrow().len(), 2);
    assert_eq!(wire.borrow()[0], vec![0x80, 0x80, 0xF8, 0x87, 0xF8]);
}

#[test]
fn disconnect_drops_unsent_messages() {
    let (mut device, wire) = link(23);
    device.send(&MidiEvent::note_on(0, 60, 100), 0).unwrap();
    device.on_disconnect();
    device.update(100);
    device.publish();
    assert!(wire.borrow().is_empty());
}
