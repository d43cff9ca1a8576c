//! Output sanitisation through the full pipeline.

use std::sync::Arc;

use segue::{Engine, MidiEvent, Thru};

use crate::helpers::ControlledBackend;

fn engine_with_ports(ports: usize) -> (Arc<ControlledBackend>, Arc<Engine>) {
    let backend = ControlledBackend::new(ports);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine.start(None, None).unwrap();
    backend.tick();
    backend.take_output();
    (backend, engine)
}

#[test]
fn test_out_of_range_channel_dropped() {
    let (backend, _engine) = engine_with_ports(1);
    backend.feed(MidiEvent::note_on(0, 16, 60, 64));
    backend.tick();
    assert!(backend.take_output().is_empty());
}

#[test]
fn test_out_of_range_port_dropped() {
    let (backend, _engine) = engine_with_ports(2);
    backend.feed(MidiEvent::note_on(2, 0, 60, 64));
    backend.feed(MidiEvent::note_on(1, 0, 60, 64));
    backend.tick();
    assert_eq!(backend.take_output(), vec![MidiEvent::note_on(1, 0, 60, 64)]);
}

#[test]
fn test_sysex_validation() {
    let (backend, _engine) = engine_with_ports(1);
    backend.feed(MidiEvent::sysex(0, vec![0xF0, 0x7E, 0xF7]));
    backend.feed(MidiEvent::sysex(0, vec![0xF0, 0x7E]));
    backend.tick();
    assert_eq!(
        backend.take_output(),
        vec![MidiEvent::sysex(0, vec![0xF0, 0x7E, 0xF7])]
    );
}

#[test]
fn test_pitch_bend_clamp() {
    let (backend, _engine) = engine_with_ports(1);
    backend.feed(MidiEvent::pitch_bend(0, 0, 99999));
    backend.feed(MidiEvent::pitch_bend(0, 0, -99999));
    backend.tick();
    assert_eq!(
        backend.take_output(),
        vec![
            MidiEvent::pitch_bend(0, 0, 8191),
            MidiEvent::pitch_bend(0, 0, -8192),
        ]
    );
}

#[test]
fn test_sanitised_output_is_idempotent() {
    let (backend, _engine) = engine_with_ports(1);
    let junk = vec![
        MidiEvent::note_on(0, 0, 60, 500),
        MidiEvent::pitch_bend(0, 0, 123456),
        MidiEvent::ctrl(0, 0, 64, -3),
        MidiEvent::aftertouch(0, 0, 1000),
        MidiEvent::note_on(3, 0, 60, 64),
        MidiEvent::program(0, 0, 200),
    ];
    for ev in junk {
        backend.feed(ev);
    }
    backend.tick();
    let first = backend.take_output();

    for ev in &first {
        backend.feed(ev.clone());
    }
    backend.tick();
    assert_eq!(backend.take_output(), first);
}
