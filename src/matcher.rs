//! Per-event patch selection with note and sustain ownership.
//!
//! A note-off must reach the patch that handled its note-on, and a sustain
//! release the patch that saw the press, even when the active scene changed
//! in between. Ownership lives in fixed-capacity tables that never allocate
//! once built; overflow silently evicts the least-recently-inserted entry.

use std::collections::VecDeque;

use segue_midi::{EventKind, MidiEvent};

use crate::config::{MAX_SIMULTANEOUS_NOTES, MAX_SUSTAIN_PEDALS};
use crate::patch::PatchRef;

/// Sustain pedal controller number.
const CC_SUSTAIN: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoteKey {
    port: usize,
    channel: u8,
    note: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SustainKey {
    port: usize,
    channel: u8,
}

/// Fixed-capacity map in insertion order.
///
/// Inserting an existing key replaces its value in place. Inserting into a
/// full table evicts the oldest entry. Lookup is a linear scan, which for
/// these capacities stays cheaper than hashing and keeps the table free of
/// allocation at steady state.
struct BoundedPatchMap<K: Copy + Eq> {
    entries: VecDeque<(K, PatchRef)>,
    capacity: usize,
}

impl<K: Copy + Eq> BoundedPatchMap<K> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn insert(&mut self, key: K, value: PatchRef) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, value));
    }

    fn remove(&mut self, key: K) -> Option<PatchRef> {
        let idx = self.entries.iter().position(|(k, _)| *k == key)?;
        self.entries.remove(idx).map(|(_, v)| v)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Routes each event to the patch that owns it.
pub(crate) struct PatchMatcher {
    note_owners: BoundedPatchMap<NoteKey>,
    sustain_owners: BoundedPatchMap<SustainKey>,
}

impl PatchMatcher {
    pub(crate) fn new() -> Self {
        Self {
            note_owners: BoundedPatchMap::new(MAX_SIMULTANEOUS_NOTES),
            sustain_owners: BoundedPatchMap::new(MAX_SUSTAIN_PEDALS),
        }
    }

    /// Select the patch for `ev`.
    ///
    /// Note-ons and full sustain presses record `current` as owner of the
    /// key; the matching note-off or sustain release is routed back to the
    /// recorded patch if it is still registered. Everything else, including
    /// half-pedal sustain values (1..=126), goes to `current`.
    pub(crate) fn match_patch(&mut self, ev: &MidiEvent, current: &PatchRef) -> PatchRef {
        match ev.kind {
            EventKind::NoteOn { note, .. } => {
                let key = NoteKey {
                    port: ev.port,
                    channel: ev.channel,
                    note,
                };
                self.note_owners.insert(key, current.clone());
            }
            EventKind::NoteOff { note, .. } => {
                let key = NoteKey {
                    port: ev.port,
                    channel: ev.channel,
                    note,
                };
                if let Some(owner) = self.note_owners.remove(key) {
                    return owner;
                }
            }
            EventKind::Ctrl { param, value } if param == CC_SUSTAIN && value == 127 => {
                let key = SustainKey {
                    port: ev.port,
                    channel: ev.channel,
                };
                self.sustain_owners.insert(key, current.clone());
            }
            EventKind::Ctrl { param, value } if param == CC_SUSTAIN && value == 0 => {
                let key = SustainKey {
                    port: ev.port,
                    channel: ev.channel,
                };
                if let Some(owner) = self.sustain_owners.remove(key) {
                    return owner;
                }
            }
            _ => {}
        }
        current.clone()
    }

    #[cfg(test)]
    pub(crate) fn note_count(&self) -> usize {
        self.note_owners.len()
    }

    #[cfg(test)]
    pub(crate) fn sustain_count(&self) -> usize {
        self.sustain_owners.len()
    }
}
