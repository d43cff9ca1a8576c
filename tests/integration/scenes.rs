//! Scene switching: ownership across switches, init/exit sequencing,
//! async flushes, hook notification.

use std::sync::Arc;

use parking_lot::Mutex;
use segue::{ControlHook, Engine, MidiEvent, Thru};

use crate::helpers::{AppendCtrl, ChannelTag, ControlledBackend};

#[test]
fn test_sustain_release_routed_through_old_scene() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine
        .add_scene(0, Arc::new(ChannelTag(1)), None, None)
        .unwrap();
    engine
        .add_scene(1, Arc::new(ChannelTag(2)), None, None)
        .unwrap();
    engine.start(None, None).unwrap();

    backend.feed(MidiEvent::ctrl(0, 0, 64, 127));
    backend.tick();
    assert_eq!(backend.take_output(), vec![MidiEvent::ctrl(0, 1, 64, 127)]);

    engine.switch_scene(Some(1), None);
    backend.feed(MidiEvent::ctrl(0, 0, 7, 10));
    backend.tick();
    backend.take_output();
    assert_eq!(engine.current_scene(), Some((1, 0)));

    // the release pairs with the press, through scene 0's patch
    backend.feed(MidiEvent::ctrl(0, 0, 64, 0));
    backend.tick();
    assert_eq!(backend.take_output(), vec![MidiEvent::ctrl(0, 1, 64, 0)]);
}

#[test]
fn test_note_off_routed_through_old_scene() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine
        .add_scene(0, Arc::new(ChannelTag(1)), None, None)
        .unwrap();
    engine
        .add_scene(1, Arc::new(ChannelTag(2)), None, None)
        .unwrap();
    engine.start(None, None).unwrap();

    backend.feed(MidiEvent::note_on(0, 0, 60, 100));
    backend.tick();
    backend.take_output();

    engine.switch_scene(Some(1), None);
    backend.feed(MidiEvent::ctrl(0, 0, 7, 10));
    backend.tick();
    backend.take_output();

    backend.feed(MidiEvent::note_off(0, 0, 60, 0));
    backend.feed(MidiEvent::note_on(0, 0, 62, 100));
    backend.tick();
    assert_eq!(
        backend.take_output(),
        vec![
            MidiEvent::note_off(0, 1, 60, 0),
            MidiEvent::note_on(0, 2, 62, 100),
        ]
    );
}

#[test]
fn test_exit_then_init_on_switch_without_input() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine
        .add_scene(0, Arc::new(Thru), None, Some(Arc::new(AppendCtrl(20))))
        .unwrap();
    engine
        .add_scene(1, Arc::new(Thru), Some(Arc::new(AppendCtrl(21))), None)
        .unwrap();
    engine.start(None, None).unwrap();
    backend.tick();
    // scene 0 has no init patch, so arming produced nothing
    assert!(backend.take_output().is_empty());

    engine.switch_scene(Some(1), None);
    engine.run_async();

    assert_eq!(
        backend.take_output(),
        vec![MidiEvent::ctrl(0, 0, 20, 1), MidiEvent::ctrl(0, 0, 21, 1)]
    );
    assert_eq!(engine.current_scene(), Some((1, 0)));
}

#[test]
fn test_init_patch_runs_on_startup() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine
        .add_scene(0, Arc::new(Thru), Some(Arc::new(AppendCtrl(30))), None)
        .unwrap();
    engine.start(None, None).unwrap();
    backend.tick();

    assert_eq!(backend.take_output(), vec![MidiEvent::ctrl(0, 0, 30, 1)]);
    assert_eq!(engine.current_scene(), Some((0, 0)));
}

#[test]
fn test_run_async_without_pending_is_a_no_op() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine.start(None, None).unwrap();
    backend.tick();
    backend.take_output();

    engine.run_async();
    assert!(backend.take_output().is_empty());
}

#[test]
fn test_async_handle_flushes_pending_switch() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine
        .add_scene(1, Arc::new(Thru), Some(Arc::new(AppendCtrl(40))), None)
        .unwrap();
    engine.start(None, None).unwrap();
    backend.tick();
    backend.take_output();

    let handle = engine.async_handle();
    engine.switch_scene(Some(1), None);
    handle.run();

    assert_eq!(backend.take_output(), vec![MidiEvent::ctrl(0, 0, 40, 1)]);
    assert_eq!(engine.current_scene(), Some((1, 0)));
}

#[test]
fn test_async_handle_survives_engine_drop() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    let handle = engine.async_handle();
    drop(engine);
    // upgrades fail silently once the engine is gone
    handle.run();
}

struct RecordingHook {
    calls: Mutex<Vec<(i32, i32)>>,
}

impl ControlHook for RecordingHook {
    fn scene_switch(&self, scene: i32, subscene: i32) {
        self.calls.lock().push((scene, subscene));
    }
}

#[test]
fn test_hook_notified_with_pending_values() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine.add_scene(1, Arc::new(Thru), None, None).unwrap();
    let hook = Arc::new(RecordingHook {
        calls: Mutex::new(Vec::new()),
    });
    engine.set_hook(hook.clone());
    engine.start(None, None).unwrap();
    backend.tick();

    engine.switch_scene(Some(1), None);
    engine.run_async();

    // arming notified (0, -1), the explicit switch (1, -1)
    assert_eq!(*hook.calls.lock(), vec![(0, -1), (1, -1)]);
}

#[test]
fn test_hook_not_called_with_single_scene() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    let hook = Arc::new(RecordingHook {
        calls: Mutex::new(Vec::new()),
    });
    engine.set_hook(hook.clone());
    engine.start(None, None).unwrap();
    backend.tick();

    assert!(hook.calls.lock().is_empty());
}

#[test]
fn test_switch_convergence_after_arbitrary_requests() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine.add_scene(1, Arc::new(Thru), None, None).unwrap();
    engine.add_scene(1, Arc::new(Thru), None, None).unwrap();
    engine.start(None, None).unwrap();
    backend.tick();

    engine.switch_scene(Some(9), None);
    engine.switch_scene(Some(1), Some(5));
    engine.switch_scene(None, Some(1));
    engine.run_async();
    assert_eq!(engine.current_scene(), Some((1, 1)));

    // nothing pending: a further flush changes nothing
    engine.run_async();
    assert_eq!(engine.current_scene(), Some((1, 1)));
    backend.take_output();
}

#[test]
fn test_invalid_target_leaves_scene_and_clears_pending() {
    let backend = ControlledBackend::new(1);
    let engine = Engine::new(backend.clone(), false);
    engine.add_scene(0, Arc::new(Thru), None, None).unwrap();
    engine.add_scene(1, Arc::new(Thru), None, None).unwrap();
    engine.start(None, None).unwrap();
    backend.tick();

    engine.switch_scene(Some(1), Some(3));
    engine.run_async();
    assert_eq!(engine.current_scene(), Some((0, 0)));

    engine.run_async();
    assert_eq!(engine.current_scene(), Some((0, 0)));
}
