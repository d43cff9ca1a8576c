//! The event value type and its payload variants.

use std::sync::Arc;

/// Discriminated MIDI event payload.
///
/// Channel voice payloads keep their value fields as `i32` rather than the
/// wire-level 7-bit range: processing units may scale or offset values
/// freely, and the sanitiser clamps or drops on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { note: u8, velocity: i32 },
    NoteOff { note: u8, velocity: i32 },
    Ctrl { param: u8, value: i32 },
    PitchBend { value: i32 },
    Aftertouch { value: i32 },
    PolyAftertouch { note: u8, value: i32 },
    Program { value: i32 },
    /// Complete system-exclusive message, `0xF0 .. 0xF7` inclusive.
    /// The byte sequence is shared, so cloning an event is cheap.
    SysEx(Arc<[u8]>),
    SysCmQFrame,
    SysCmSongPos,
    SysCmSongSel,
    SysCmTuneReq,
    SysRtClock,
    SysRtStart,
    SysRtContinue,
    SysRtStop,
    SysRtSensing,
    SysRtReset,
    /// Internal sentinel used to drive scene init/exit patches.
    /// Never emitted on an output port.
    Dummy,
}

/// A single MIDI event addressed to an output port and channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEvent {
    pub port: usize,
    /// MIDI channel, 0-15 for well-formed events.
    pub channel: u8,
    pub kind: EventKind,
}

impl MidiEvent {
    #[inline]
    pub fn new(port: usize, channel: u8, kind: EventKind) -> Self {
        Self {
            port,
            channel,
            kind,
        }
    }

    #[inline]
    pub fn note_on(port: usize, channel: u8, note: u8, velocity: i32) -> Self {
        Self::new(port, channel, EventKind::NoteOn { note, velocity })
    }

    #[inline]
    pub fn note_off(port: usize, channel: u8, note: u8, velocity: i32) -> Self {
        Self::new(port, channel, EventKind::NoteOff { note, velocity })
    }

    #[inline]
    pub fn ctrl(port: usize, channel: u8, param: u8, value: i32) -> Self {
        Self::new(port, channel, EventKind::Ctrl { param, value })
    }

    #[inline]
    pub fn pitch_bend(port: usize, channel: u8, value: i32) -> Self {
        Self::new(port, channel, EventKind::PitchBend { value })
    }

    #[inline]
    pub fn aftertouch(port: usize, channel: u8, value: i32) -> Self {
        Self::new(port, channel, EventKind::Aftertouch { value })
    }

    #[inline]
    pub fn poly_aftertouch(port: usize, channel: u8, note: u8, value: i32) -> Self {
        Self::new(port, channel, EventKind::PolyAftertouch { note, value })
    }

    #[inline]
    pub fn program(port: usize, channel: u8, value: i32) -> Self {
        Self::new(port, channel, EventKind::Program { value })
    }

    #[inline]
    pub fn sysex(port: usize, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(port, 0, EventKind::SysEx(bytes.into()))
    }

    /// The sentinel event fed through scene init and exit patches.
    #[inline]
    pub fn dummy() -> Self {
        Self::new(0, 0, EventKind::Dummy)
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { .. })
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(self.kind, EventKind::NoteOff { .. })
    }

    #[inline]
    pub fn is_note(&self) -> bool {
        self.is_note_on() || self.is_note_off()
    }

    #[inline]
    pub fn is_ctrl(&self) -> bool {
        matches!(self.kind, EventKind::Ctrl { .. })
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, EventKind::Dummy)
    }

    /// System common and system realtime messages are not bound to a
    /// channel; the sanitiser passes them through unchanged.
    #[inline]
    pub fn is_system(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SysEx(_)
                | EventKind::SysCmQFrame
                | EventKind::SysCmSongPos
                | EventKind::SysCmSongSel
                | EventKind::SysCmTuneReq
                | EventKind::SysRtClock
                | EventKind::SysRtStart
                | EventKind::SysRtContinue
                | EventKind::SysRtStop
                | EventKind::SysRtSensing
                | EventKind::SysRtReset
        )
    }

    /// Note number for note-on, note-off and polyphonic aftertouch events.
    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOn { note, .. }
            | EventKind::NoteOff { note, .. }
            | EventKind::PolyAftertouch { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<i32> {
        match self.kind {
            EventKind::NoteOn { velocity, .. } | EventKind::NoteOff { velocity, .. } => {
                Some(velocity)
            }
            _ => None,
        }
    }
}
