//! The terminal sanitisation stage.
//!
//! Every event leaving the engine passes through [`Sanitize`]: values are
//! clamped to the MIDI ranges, events that cannot be repaired are removed
//! from the buffer, and the internal `Dummy` sentinel never gets out.

use std::sync::Arc;

use segue_midi::{EventKind, MidiEvent};

use crate::backend::Backend;
use crate::buffer::{EventBuffer, EventRange};
use crate::diag::{WarnProducer, Warning};
use crate::patch::Patch;

/// Built-in patch enforcing MIDI range correctness on its range.
pub struct Sanitize {
    backend: Arc<dyn Backend>,
    verbose: bool,
    log: WarnProducer,
}

impl Sanitize {
    pub(crate) fn new(backend: Arc<dyn Backend>, verbose: bool, log: WarnProducer) -> Self {
        Self {
            backend,
            verbose,
            log,
        }
    }

    fn warn(&self, warning: Warning) {
        if self.verbose {
            self.log.emit(warning);
        }
    }

    /// Clamp `ev` into range, returning false if it must be dropped.
    fn check(&self, ev: &mut MidiEvent) -> bool {
        let num_ports = self.backend.num_out_ports();
        if ev.port >= num_ports {
            // a warning would be pointless with no output ports at all
            if num_ports > 0 {
                self.warn(Warning::InvalidPort);
            }
            return false;
        }

        if ev.channel > 15 {
            self.warn(Warning::InvalidChannel);
            return false;
        }

        match &mut ev.kind {
            EventKind::NoteOn { note, velocity } | EventKind::NoteOff { note, velocity } => {
                if *note > 127 {
                    self.warn(Warning::InvalidNote);
                    return false;
                }
                *velocity = (*velocity).clamp(0, 127);
                true
            }
            EventKind::Ctrl { param, value } => {
                if *param > 127 {
                    self.warn(Warning::InvalidCtrlParam);
                    return false;
                }
                *value = (*value).clamp(0, 127);
                true
            }
            EventKind::PitchBend { value } => {
                *value = (*value).clamp(-8192, 8191);
                true
            }
            EventKind::Aftertouch { value } => {
                *value = (*value).clamp(0, 127);
                true
            }
            EventKind::Program { value } => {
                if !(0..=127).contains(value) {
                    self.warn(Warning::InvalidProgram);
                    return false;
                }
                true
            }
            EventKind::SysEx(bytes) => {
                if bytes.len() < 2 || bytes[0] != 0xF0 || bytes[bytes.len() - 1] != 0xF7 {
                    self.warn(Warning::InvalidSysEx);
                    return false;
                }
                true
            }
            EventKind::PolyAftertouch { .. }
            | EventKind::SysCmQFrame
            | EventKind::SysCmSongPos
            | EventKind::SysCmSongSel
            | EventKind::SysCmTuneReq
            | EventKind::SysRtClock
            | EventKind::SysRtStart
            | EventKind::SysRtContinue
            | EventKind::SysRtStop
            | EventKind::SysRtSensing
            | EventKind::SysRtReset => true,
            EventKind::Dummy => false,
        }
    }
}

impl Patch for Sanitize {
    fn process(&self, buffer: &mut EventBuffer, range: EventRange) {
        let mut cursor = range.cursor();
        while let Some(pos) = cursor.advance(buffer) {
            let keep = match buffer.get_mut(pos) {
                Some(ev) => self.check(ev),
                None => continue,
            };
            if !keep {
                buffer.remove(pos);
            }
        }
    }
}
