//! # Segue - realtime MIDI event router
//!
//! Segue receives MIDI events from a backend, routes each one through a
//! user-defined graph of processing units (a patch), and emits the result.
//! Patches are organised into scenes that can be switched live without
//! breaking running notes or held sustain pedals, with init and exit
//! patches smoothing the transition.
//!
//! ## Architecture
//!
//! - **segue-midi** - the [`MidiEvent`] value type and wire codec
//! - [`EventBuffer`] - the per-cycle working area with live-end ranges
//! - [`Patch`] - the seam for externally compiled processing graphs
//! - [`SceneRegistry`] / scene matcher - scene storage plus note and
//!   sustain ownership, so releases reach the patch that saw the press
//! - [`Engine`] - the dispatcher: init/cycle callbacks, scene switching,
//!   synchronous injection, sanitised output
//! - [`Backend`] - the driver seam; a `midir` implementation ships behind
//!   the `midi-io` feature
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use segue::{Engine, MidiEvent, Thru};
//! use segue::backend::MidirBackend;
//!
//! let backend = MidirBackend::open(
//!     "segue",
//!     &["keyboard".into()],
//!     &["synth".into()],
//! )?;
//!
//! let engine = Engine::new(backend, true);
//! engine.add_scene(0, Arc::new(Thru), None, None)?;
//! engine.start(None, None)?;
//! ```
//!
//! ## Realtime discipline
//!
//! A single mutex serialises all state mutation; the hot path never
//! allocates in steady state, never blocks beyond that mutex, and reports
//! malformed events through a lock-free channel to a logger thread.

pub mod backend;
pub mod config;
pub mod error;

mod buffer;
mod diag;
mod engine;
mod matcher;
mod patch;
mod sanitize;
mod scene;
mod time;

pub use backend::Backend;
pub use buffer::{Cursor, EventBuffer, EventRange, Pos};
pub use engine::{AsyncHandle, ControlHook, CycleStats, Engine};
pub use error::{Error, Result};
pub use patch::{Patch, PatchRef, Thru};
pub use scene::{Scene, SceneRegistry};
pub use time::monotonic_seconds;

pub use segue_midi::{DecodeError, EventKind, MidiEvent};

#[cfg(feature = "midi-io")]
pub use backend::MidirBackend;
