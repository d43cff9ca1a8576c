//! Hardware backend on top of `midir`.
//!
//! Input connections decode raw bytes in the driver callback and hand the
//! events to a bounded channel; a named cycle thread wakes the engine per
//! event. Output goes through a second channel to a writer thread owning
//! one connection per output port, so driver calls never happen on the
//! engine's cycle thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use segue_midi::MidiEvent;
use tracing::debug;

use super::{Backend, CycleCallback, InitCallback};
use crate::error::{Error, Result};

const INPUT_QUEUE_SIZE: usize = 1024;
const OUTPUT_QUEUE_SIZE: usize = 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum OutCommand {
    Send { port: usize, bytes: Vec<u8> },
    Shutdown,
}

pub struct MidirBackend {
    in_rx: Receiver<MidiEvent>,
    /// Events pulled off the channel by the cycle thread but not yet
    /// consumed through `input_event`.
    pending: Arc<Mutex<VecDeque<MidiEvent>>>,
    out_tx: Sender<OutCommand>,
    num_out_ports: usize,
    running: Arc<AtomicBool>,
    cycle_thread: Mutex<Option<JoinHandle<()>>>,
    _inputs: Mutex<Vec<MidiInputConnection<()>>>,
}

impl MidirBackend {
    /// Connect to the named input and output ports. Port names match by
    /// case-insensitive substring; each must resolve to an existing port.
    pub fn open(client_name: &str, in_ports: &[String], out_ports: &[String]) -> Result<Arc<Self>> {
        let (in_tx, in_rx) = bounded(INPUT_QUEUE_SIZE);

        let mut inputs = Vec::with_capacity(in_ports.len());
        for (index, name) in in_ports.iter().enumerate() {
            inputs.push(Self::connect_input(client_name, name, index, in_tx.clone())?);
        }

        let mut outputs = Vec::with_capacity(out_ports.len());
        for name in out_ports {
            outputs.push(Self::connect_output(client_name, name)?);
        }
        let num_out_ports = outputs.len();

        let (out_tx, out_rx) = bounded(OUTPUT_QUEUE_SIZE);
        thread::Builder::new()
            .name("segue-midi-out".to_string())
            .spawn(move || Self::output_thread(out_rx, outputs))
            .map_err(|e| Error::Backend(e.to_string()))?;

        Ok(Arc::new(Self {
            in_rx,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            out_tx,
            num_out_ports,
            running: Arc::new(AtomicBool::new(false)),
            cycle_thread: Mutex::new(None),
            _inputs: Mutex::new(inputs),
        }))
    }

    pub fn list_input_ports() -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(input) = MidiInput::new("segue-port-list") {
            for port in input.ports() {
                if let Ok(name) = input.port_name(&port) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn list_output_ports() -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(output) = MidiOutput::new("segue-port-list") {
            for port in output.ports() {
                if let Ok(name) = output.port_name(&port) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn connect_input(
        client_name: &str,
        port_name: &str,
        index: usize,
        in_tx: Sender<MidiEvent>,
    ) -> Result<MidiInputConnection<()>> {
        let input = MidiInput::new(client_name)?;
        let ports = input.ports();
        let port = ports
            .iter()
            .find(|p| {
                input
                    .port_name(p)
                    .map(|n| n.to_lowercase().contains(&port_name.to_lowercase()))
                    .unwrap_or(false)
            })
            .ok_or_else(|| Error::Backend(format!("no MIDI input port matching '{port_name}'")))?;

        let connection = input.connect(
            port,
            "segue-in",
            move |_timestamp, message, _| match MidiEvent::from_bytes(message) {
                Ok(mut ev) => {
                    ev.port = index;
                    if in_tx.try_send(ev).is_err() {
                        debug!("MIDI input queue full, dropping event");
                    }
                }
                Err(err) => debug!("undecodable MIDI input: {err}"),
            },
            (),
        )?;
        Ok(connection)
    }

    fn connect_output(client_name: &str, port_name: &str) -> Result<MidiOutputConnection> {
        let output = MidiOutput::new(client_name)?;
        let ports = output.ports();
        let port = ports
            .iter()
            .find(|p| {
                output
                    .port_name(p)
                    .map(|n| n.to_lowercase().contains(&port_name.to_lowercase()))
                    .unwrap_or(false)
            })
            .ok_or_else(|| Error::Backend(format!("no MIDI output port matching '{port_name}'")))?;

        Ok(output.connect(port, "segue-out")?)
    }

    fn output_thread(rx: Receiver<OutCommand>, mut connections: Vec<MidiOutputConnection>) {
        while let Ok(command) = rx.recv() {
            match command {
                OutCommand::Send { port, bytes } => {
                    if let Some(connection) = connections.get_mut(port) {
                        if let Err(err) = connection.send(&bytes) {
                            debug!("MIDI send failed: {err}");
                        }
                    }
                }
                OutCommand::Shutdown => break,
            }
        }
    }
}

impl Backend for MidirBackend {
    fn start(&self, init: InitCallback, mut cycle: CycleCallback) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Backend("backend already started".to_string()));
        }

        let running = Arc::clone(&self.running);
        let in_rx = self.in_rx.clone();
        let pending = Arc::clone(&self.pending);

        let handle = thread::Builder::new()
            .name("segue-cycle".to_string())
            .spawn(move || {
                init();
                while running.load(Ordering::SeqCst) {
                    match in_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(ev) => {
                            pending.lock().push_back(ev);
                            cycle();
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| Error::Backend(e.to_string()))?;

        *self.cycle_thread.lock() = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.cycle_thread.lock().take() {
            let _ = handle.join();
        }
    }

    fn input_event(&self) -> Option<MidiEvent> {
        if let Some(ev) = self.pending.lock().pop_front() {
            return Some(ev);
        }
        self.in_rx.try_recv().ok()
    }

    fn output_event(&self, ev: &MidiEvent) {
        let Some(bytes) = ev.to_bytes() else {
            return;
        };
        if ev.port >= self.num_out_ports {
            return;
        }
        if self
            .out_tx
            .try_send(OutCommand::Send {
                port: ev.port,
                bytes,
            })
            .is_err()
        {
            debug!("MIDI output queue full or closed, dropping event");
        }
    }

    fn num_out_ports(&self) -> usize {
        self.num_out_ports
    }
}

impl Drop for MidirBackend {
    fn drop(&mut self) {
        self.stop();
        let _ = self.out_tx.send(OutCommand::Shutdown);
    }
}
