//! The patch seam.
//!
//! A patch is a graph of processing units compiled elsewhere; the engine
//! only needs the one operation: process a buffer over a range, mutating,
//! removing, or appending events in place. Patches are shared by reference
//! count between scene registrations and note/sustain bookkeeping.

use std::sync::Arc;

use crate::buffer::{EventBuffer, EventRange};

/// A processing graph applied to a range of buffered events.
///
/// Implementations must not block: `process` runs on the realtime thread
/// under the engine's process mutex.
pub trait Patch: Send + Sync {
    fn process(&self, buffer: &mut EventBuffer, range: EventRange);
}

/// Shared handle to a patch.
pub type PatchRef = Arc<dyn Patch>;

/// Pass-through patch: leaves every event untouched.
#[derive(Debug, Default)]
pub struct Thru;

impl Patch for Thru {
    fn process(&self, _buffer: &mut EventBuffer, _range: EventRange) {}
}
