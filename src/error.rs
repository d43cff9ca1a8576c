//! Error types for the routing engine.
//!
//! Setup-time misuse (unknown scenes, double configuration) fails loudly
//! here; the realtime path never surfaces errors, it drops and continues.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no scenes registered")]
    NoScenes,

    #[error("scene {scene} subscene {subscene} not registered")]
    SceneNotFound { scene: i32, subscene: i32 },

    #[error("scene id {0} is negative")]
    InvalidSceneId(i32),

    #[error("global processing patches already installed")]
    ProcessingAlreadySet,

    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Backend(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Backend(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
