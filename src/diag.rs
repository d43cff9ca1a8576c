//! Realtime-safe diagnostics.
//!
//! The hot path must not allocate or block to report a malformed event, so
//! warnings are `Copy` records pushed onto a lock-free ring buffer and
//! drained by a dedicated logger thread, which emits them via `tracing`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapProd, HeapRb,
};
use tracing::warn;

use crate::config::WARN_QUEUE_SIZE;

const DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Warning record, small and allocation-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Warning {
    InvalidPort,
    InvalidChannel,
    InvalidNote,
    InvalidCtrlParam,
    InvalidProgram,
    InvalidSysEx,
}

impl Warning {
    fn message(self) -> &'static str {
        match self {
            Warning::InvalidPort => "invalid output port, event discarded",
            Warning::InvalidChannel => "invalid channel, event discarded",
            Warning::InvalidNote => "invalid note number, event discarded",
            Warning::InvalidCtrlParam => "invalid controller number, event discarded",
            Warning::InvalidProgram => "invalid program number, event discarded",
            Warning::InvalidSysEx => "invalid sysex, event discarded",
        }
    }
}

/// Producer half, held by the sanitiser.
pub(crate) struct WarnProducer {
    producer: Mutex<HeapProd<Warning>>,
}

impl WarnProducer {
    /// Enqueue a warning. Never blocks; drops the record if the queue is
    /// full or momentarily contended.
    pub(crate) fn emit(&self, warning: Warning) {
        if let Some(mut producer) = self.producer.try_lock() {
            let _ = producer.try_push(warning);
        }
    }
}

/// Owns the logger thread; dropping it drains and stops the thread.
pub(crate) struct RtLog {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RtLog {
    pub(crate) fn spawn() -> (Self, WarnProducer) {
        let rb = HeapRb::<Warning>::new(WARN_QUEUE_SIZE);
        let (producer, mut consumer) = rb.split();
        let stop = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("segue-log".to_string())
            .spawn(move || loop {
                while let Some(warning) = consumer.try_pop() {
                    warn!("{}", warning.message());
                }
                if stop_flag.load(Ordering::Acquire) {
                    break;
                }
                thread::sleep(DRAIN_INTERVAL);
            })
            .expect("failed to spawn logger thread");

        (
            Self {
                stop,
                handle: Some(handle),
            },
            WarnProducer {
                producer: Mutex::new(producer),
            },
        )
    }
}

impl Drop for RtLog {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
