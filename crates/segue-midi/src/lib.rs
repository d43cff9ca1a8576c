//! MIDI event model for the segue router.
//!
//! [`MidiEvent`] is the value type that flows through the routing engine:
//! a discriminated payload ([`EventKind`]) plus the output port and channel
//! it is addressed to. Payload value fields are deliberately wider than the
//! MIDI wire format (`i32`) so that out-of-range values produced by
//! processing units survive until the engine's sanitisation stage.
//!
//! The wire codec ([`MidiEvent::to_bytes`] / [`MidiEvent::from_bytes`])
//! translates between events and raw MIDI byte streams for hardware I/O.

mod codec;
mod event;

pub use codec::DecodeError;
pub use event::{EventKind, MidiEvent};
