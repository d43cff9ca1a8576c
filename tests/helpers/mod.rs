//! Shared fixtures: a hand-driven backend and distinguishable patches.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use segue::backend::{Backend, CycleCallback, InitCallback};
use segue::{EventBuffer, EventRange, MidiEvent, Patch, Result};

/// Backend driven explicitly from the test body: queue input with
/// [`ControlledBackend::feed`], run callbacks with
/// [`ControlledBackend::tick`], inspect output with
/// [`ControlledBackend::take_output`].
pub struct ControlledBackend {
    ports: usize,
    input: Mutex<VecDeque<MidiEvent>>,
    output: Mutex<Vec<MidiEvent>>,
    init: Mutex<Option<InitCallback>>,
    cycle: Mutex<Option<CycleCallback>>,
}

impl ControlledBackend {
    pub fn new(ports: usize) -> Arc<Self> {
        Arc::new(Self {
            ports,
            input: Mutex::new(VecDeque::new()),
            output: Mutex::new(Vec::new()),
            init: Mutex::new(None),
            cycle: Mutex::new(None),
        })
    }

    pub fn feed(&self, ev: MidiEvent) {
        self.input.lock().push_back(ev);
    }

    /// Run the init callback if it has not run yet, then one cycle.
    pub fn tick(&self) {
        if let Some(init) = self.init.lock().take() {
            init();
        }
        if let Some(cycle) = self.cycle.lock().as_mut() {
            cycle();
        }
    }

    pub fn take_output(&self) -> Vec<MidiEvent> {
        std::mem::take(&mut *self.output.lock())
    }
}

impl Backend for ControlledBackend {
    fn start(&self, init: InitCallback, cycle: CycleCallback) -> Result<()> {
        *self.init.lock() = Some(init);
        *self.cycle.lock() = Some(cycle);
        Ok(())
    }

    fn stop(&self) {
        *self.cycle.lock() = None;
    }

    fn input_event(&self) -> Option<MidiEvent> {
        self.input.lock().pop_front()
    }

    fn output_event(&self, ev: &MidiEvent) {
        self.output.lock().push(ev.clone());
    }

    fn num_out_ports(&self) -> usize {
        self.ports
    }
}

/// Stamps every event in its range with a fixed channel, making it obvious
/// which patch processed an event.
pub struct ChannelTag(pub u8);

impl Patch for ChannelTag {
    fn process(&self, buffer: &mut EventBuffer, range: EventRange) {
        let mut cursor = range.cursor();
        while let Some(pos) = cursor.advance(buffer) {
            if let Some(ev) = buffer.get_mut(pos) {
                ev.channel = self.0;
            }
        }
    }
}

/// Appends one controller event with the given parameter number; used to
/// tag init and exit patch runs with valid MIDI.
pub struct AppendCtrl(pub u8);

impl Patch for AppendCtrl {
    fn process(&self, buffer: &mut EventBuffer, _range: EventRange) {
        buffer.push(MidiEvent::ctrl(0, 0, self.0, 1));
    }
}
