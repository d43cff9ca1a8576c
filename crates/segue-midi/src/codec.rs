//! Wire codec: events to and from raw MIDI byte streams.
//!
//! Encoding masks data bytes to 7 bits and clamps wide values, so an event
//! that already passed sanitisation encodes losslessly. `Dummy` has no wire
//! form. System common messages whose payloads the router does not model
//! encode with zeroed data bytes.

use std::sync::Arc;

use thiserror::Error;

use crate::event::{EventKind, MidiEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty MIDI message")]
    Empty,

    #[error("truncated MIDI message (status {status:#04x}, got {len} bytes)")]
    Truncated { status: u8, len: usize },

    #[error("unknown status byte {0:#04x}")]
    UnknownStatus(u8),

    #[error("system exclusive message not terminated with 0xF7")]
    UnterminatedSysEx,
}

#[inline]
fn data(value: i32) -> u8 {
    value.clamp(0, 127) as u8
}

impl MidiEvent {
    /// Encode to raw MIDI bytes, or `None` for the internal `Dummy` event.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let channel = self.channel.min(15);
        let bytes = match &self.kind {
            EventKind::NoteOn { note, velocity } => {
                vec![0x90 | channel, note & 0x7F, data(*velocity)]
            }
            EventKind::NoteOff { note, velocity } => {
                vec![0x80 | channel, note & 0x7F, data(*velocity)]
            }
            EventKind::PolyAftertouch { note, value } => {
                vec![0xA0 | channel, note & 0x7F, data(*value)]
            }
            EventKind::Ctrl { param, value } => {
                vec![0xB0 | channel, param & 0x7F, data(*value)]
            }
            EventKind::Program { value } => vec![0xC0 | channel, data(*value)],
            EventKind::Aftertouch { value } => vec![0xD0 | channel, data(*value)],
            EventKind::PitchBend { value } => {
                let unsigned = (value + 8192).clamp(0, 16383) as u16;
                let lsb = (unsigned & 0x7F) as u8;
                let msb = ((unsigned >> 7) & 0x7F) as u8;
                vec![0xE0 | channel, lsb, msb]
            }
            EventKind::SysEx(bytes) => bytes.to_vec(),
            EventKind::SysCmQFrame => vec![0xF1, 0],
            EventKind::SysCmSongPos => vec![0xF2, 0, 0],
            EventKind::SysCmSongSel => vec![0xF3, 0],
            EventKind::SysCmTuneReq => vec![0xF6],
            EventKind::SysRtClock => vec![0xF8],
            EventKind::SysRtStart => vec![0xFA],
            EventKind::SysRtContinue => vec![0xFB],
            EventKind::SysRtStop => vec![0xFC],
            EventKind::SysRtSensing => vec![0xFE],
            EventKind::SysRtReset => vec![0xFF],
            EventKind::Dummy => return None,
        };
        Some(bytes)
    }

    /// Decode a single complete MIDI message.
    ///
    /// The decoded event carries port 0; hardware backends stamp the input
    /// port index afterwards. A note-on with velocity 0 decodes as a
    /// note-off, matching its meaning on the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let status = *bytes.first().ok_or(DecodeError::Empty)?;

        let need = |n: usize| {
            if bytes.len() < n {
                Err(DecodeError::Truncated {
                    status,
                    len: bytes.len(),
                })
            } else {
                Ok(())
            }
        };

        if status < 0xF0 {
            let channel = status & 0x0F;
            let kind = match status & 0xF0 {
                0x80 => {
                    need(3)?;
                    EventKind::NoteOff {
                        note: bytes[1] & 0x7F,
                        velocity: (bytes[2] & 0x7F) as i32,
                    }
                }
                0x90 => {
                    need(3)?;
                    let note = bytes[1] & 0x7F;
                    let velocity = (bytes[2] & 0x7F) as i32;
                    if velocity == 0 {
                        EventKind::NoteOff { note, velocity }
                    } else {
                        EventKind::NoteOn { note, velocity }
                    }
                }
                0xA0 => {
                    need(3)?;
                    EventKind::PolyAftertouch {
                        note: bytes[1] & 0x7F,
                        value: (bytes[2] & 0x7F) as i32,
                    }
                }
                0xB0 => {
                    need(3)?;
                    EventKind::Ctrl {
                        param: bytes[1] & 0x7F,
                        value: (bytes[2] & 0x7F) as i32,
                    }
                }
                0xC0 => {
                    need(2)?;
                    EventKind::Program {
                        value: (bytes[1] & 0x7F) as i32,
                    }
                }
                0xD0 => {
                    need(2)?;
                    EventKind::Aftertouch {
                        value: (bytes[1] & 0x7F) as i32,
                    }
                }
                0xE0 => {
                    need(3)?;
                    let unsigned = ((bytes[1] & 0x7F) as i32) | (((bytes[2] & 0x7F) as i32) << 7);
                    EventKind::PitchBend {
                        value: unsigned - 8192,
                    }
                }
                _ => return Err(DecodeError::UnknownStatus(status)),
            };
            return Ok(MidiEvent::new(0, channel, kind));
        }

        let kind = match status {
            0xF0 => {
                if bytes.len() < 2 || bytes.last() != Some(&0xF7) {
                    return Err(DecodeError::UnterminatedSysEx);
                }
                EventKind::SysEx(Arc::from(bytes))
            }
            0xF1 => {
                need(2)?;
                EventKind::SysCmQFrame
            }
            0xF2 => {
                need(3)?;
                EventKind::SysCmSongPos
            }
            0xF3 => {
                need(2)?;
                EventKind::SysCmSongSel
            }
            0xF6 => EventKind::SysCmTuneReq,
            0xF8 => EventKind::SysRtClock,
            0xFA => EventKind::SysRtStart,
            0xFB => EventKind::SysRtContinue,
            0xFC => EventKind::SysRtStop,
            0xFE => EventKind::SysRtSensing,
            0xFF => EventKind::SysRtReset,
            other => return Err(DecodeError::UnknownStatus(other)),
        };
        Ok(MidiEvent::new(0, 0, kind))
    }
}
