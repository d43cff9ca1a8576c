//! The per-cycle event buffer.
//!
//! One buffer holds everything produced during a single processing cycle.
//! It only ever grows within a cycle: removal tombstones the slot instead
//! of shifting, so a [`Pos`] handed out by [`EventBuffer::push`] stays
//! valid until the next [`EventBuffer::clear`].
//!
//! An [`EventRange`] carries no end. Its [`Cursor`] re-reads the buffer
//! length on every step, so a patch that appends events while a range over
//! the same buffer is being walked will see those events later in the same
//! walk.

use segue_midi::MidiEvent;

use crate::config::BUFFER_RESERVE;

/// Stable position of an event within one cycle's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos(usize);

impl Pos {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Sub-range of a buffer, from a fixed start to the live end.
#[derive(Debug, Clone, Copy)]
pub struct EventRange {
    start: usize,
}

impl EventRange {
    #[inline]
    pub fn start(&self) -> Pos {
        Pos(self.start)
    }

    #[inline]
    pub fn cursor(&self) -> Cursor {
        Cursor { next: self.start }
    }
}

/// Walks a range, skipping removed slots and picking up events appended
/// after the walk began.
#[derive(Debug)]
pub struct Cursor {
    next: usize,
}

impl Cursor {
    pub fn advance(&mut self, buffer: &EventBuffer) -> Option<Pos> {
        while self.next < buffer.slots.len() {
            let pos = Pos(self.next);
            self.next += 1;
            if buffer.slots[pos.0].is_some() {
                return Some(pos);
            }
        }
        None
    }
}

/// Grow-only event sequence for one processing cycle.
#[derive(Debug, Default)]
pub struct EventBuffer {
    slots: Vec<Option<MidiEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(BUFFER_RESERVE),
        }
    }

    /// Drop all events. Positions from earlier cycles become invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Append an event, returning its stable position.
    #[inline]
    pub fn push(&mut self, ev: MidiEvent) -> Pos {
        self.slots.push(Some(ev));
        Pos(self.slots.len() - 1)
    }

    /// Range from `pos` to the live end of the buffer.
    #[inline]
    pub fn range_from(&self, pos: Pos) -> EventRange {
        EventRange { start: pos.0 }
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&MidiEvent> {
        self.slots.get(pos.0).and_then(|slot| slot.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut MidiEvent> {
        self.slots.get_mut(pos.0).and_then(|slot| slot.as_mut())
    }

    /// Remove the event at `pos`. Other positions are unaffected.
    #[inline]
    pub fn remove(&mut self, pos: Pos) -> Option<MidiEvent> {
        self.slots.get_mut(pos.0).and_then(|slot| slot.take())
    }

    /// Number of slots, including removed ones; the bound a cursor walks to.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the buffer holds no live events.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Live events in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Clone the live events out, in insertion order.
    pub fn to_vec(&self) -> Vec<MidiEvent> {
        self.iter().cloned().collect()
    }
}
