//! The backend seam: where events come from and go to.
//!
//! A backend binds the engine to a MIDI driver. It owns the realtime
//! dispatch thread: after [`Backend::start`] it calls the init callback
//! once, then the cycle callback whenever input may be waiting. The engine
//! polls [`Backend::input_event`] from inside the cycle callback and
//! pushes results through [`Backend::output_events`].

use segue_midi::MidiEvent;

use crate::error::Result;

#[cfg(feature = "midi-io")]
mod midir_backend;

#[cfg(feature = "midi-io")]
pub use midir_backend::MidirBackend;

/// Invoked once by the backend before the first cycle.
pub type InitCallback = Box<dyn FnOnce() + Send>;

/// Invoked by the backend once per driver tick.
pub type CycleCallback = Box<dyn FnMut() + Send>;

pub trait Backend: Send + Sync {
    /// Arm the backend. It must call `init` once, then `cycle` repeatedly
    /// from its dispatch thread until stopped.
    fn start(&self, init: InitCallback, cycle: CycleCallback) -> Result<()>;

    /// Halt dispatch. Idempotent; blocks until no cycle is in flight.
    fn stop(&self);

    /// Non-blocking input poll.
    fn input_event(&self) -> Option<MidiEvent>;

    /// Enqueue one event for transmission.
    fn output_event(&self, ev: &MidiEvent);

    /// Enqueue a batch in order.
    fn output_events(&self, events: &mut dyn Iterator<Item = &MidiEvent>) {
        for ev in events {
            self.output_event(ev);
        }
    }

    fn num_out_ports(&self) -> usize;
}
