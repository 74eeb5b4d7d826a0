//! MIDI constants, note naming and device I/O.
//!
//! Output is the trainer's sound: [`MidiOut`] subscribes to the bus and
//! forwards every played note to an external synth. Input ports are opened
//! with [`connect_input`] and deliver raw bytes over a channel.

use std::sync::mpsc;

use anyhow::{anyhow, Context};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::bus::{Listener, Signal};

/// Note On status (high nibble)
pub const NOTE_ON: u8 = 0x90;

/// Note Off status (high nibble)
pub const NOTE_OFF: u8 = 0x80;

/// Velocity used for every note the trainer plays
pub const DEFAULT_VELOCITY: u8 = 100;

/// Middle C (C4)
pub const MIDDLE_C: u8 = 60;

// On a piano keyboard, 21 is A0 and 108 is C8
pub const SOUND_LOW: u8 = 59;
pub const SOUND_HIGH: u8 = 72;
pub const KEYBOARD_LOW: u8 = 58;
pub const KEYBOARD_HIGH: u8 = 74;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name, e.g. 60 -> "C4".
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// True for the black keys of a piano.
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Raw note on/off message.
pub fn note_message(channel: u8, pitch: u8, on: bool) -> [u8; 3] {
    if on {
        [NOTE_ON | (channel & 0x0F), pitch, DEFAULT_VELOCITY]
    } else {
        [NOTE_OFF | (channel & 0x0F), pitch, 0]
    }
}

/// Pick a port whose name contains `wanted`, else IAC Driver, else the first one.
fn choose_port(names: &[String], wanted: Option<&str>) -> usize {
    wanted
        .and_then(|w| names.iter().position(|n| n.contains(w)))
        .or_else(|| names.iter().position(|n| n.contains("IAC")))
        .unwrap_or(0)
}

/// Wrapper for MIDI output connection.
pub struct MidiOut {
    connection: MidiOutputConnection,
    channel: u8,
    pub port_name: String,
}

impl MidiOut {
    /// Connect to an output port; `channel` is 0-indexed.
    pub fn new(wanted: Option<&str>, channel: u8) -> anyhow::Result<Self> {
        let midi_out =
            MidiOutput::new("eartrainer-out").context("failed to create MIDI output")?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(anyhow!("no MIDI output ports found"));
        }

        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();
        let port_idx = choose_port(&names, wanted);
        let port_name = names[port_idx].clone();

        let connection = midi_out
            .connect(&ports[port_idx], "eartrainer-out")
            .map_err(|e| anyhow!("failed to connect MIDI output: {}", e))?;

        log::info!("MIDI output connected to: {}", port_name);
        Ok(Self {
            connection,
            channel,
            port_name,
        })
    }

    /// Send a MIDI message.
    pub fn send(&mut self, message: &[u8]) -> anyhow::Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("failed to send MIDI: {}", e))
    }
}

impl Listener for MidiOut {
    fn on_signal(&mut self, signal: &Signal) {
        if let Signal::SequencerNotePlayed { pitch, on, .. } = signal {
            let message = note_message(self.channel, *pitch, *on);
            if let Err(e) = self.send(&message) {
                log::warn!("{e}");
            }
        }
    }
}

/// Open an input port and forward every message to `tx`.
///
/// Returns the connection (which must be kept alive) and the port name.
pub fn connect_input(
    wanted: Option<&str>,
    tx: mpsc::Sender<Vec<u8>>,
) -> anyhow::Result<(MidiInputConnection<()>, String)> {
    let midi_in = MidiInput::new("eartrainer-in").context("failed to create MIDI input")?;

    let ports = midi_in.ports();
    if ports.is_empty() {
        return Err(anyhow!("no MIDI input ports found"));
    }

    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    let port_idx = choose_port(&names, wanted);
    let port_name = names[port_idx].clone();

    let connection = midi_in
        .connect(
            &ports[port_idx],
            "eartrainer-in",
            move |_timestamp, message, _| {
                let _ = tx.send(message.to_vec());
            },
            (),
        )
        .map_err(|e| anyhow!("failed to connect MIDI input: {}", e))?;

    log::info!("MIDI input connected to: {}", port_name);
    Ok((connection, port_name))
}
