//! Build-time capacity constants.

/// Capacity of the note ownership table. Notes sounding beyond this many
/// at once evict the oldest entry.
pub const MAX_SIMULTANEOUS_NOTES: usize = 64;

/// Capacity of the sustain pedal ownership table, one slot per held pedal
/// per (port, channel).
pub const MAX_SUSTAIN_PEDALS: usize = 16;

/// Events reserved in each working buffer up front, so typical cycles run
/// without allocating.
pub const BUFFER_RESERVE: usize = 1024;

/// Capacity of the lock-free warning channel between the realtime path and
/// the logger thread.
pub const WARN_QUEUE_SIZE: usize = 256;
