//! Turns keyboard, on-screen piano and MIDI input into trainer requests.
//!
//! Every source ends up as either a [`Request::Play`] (free play, which is
//! also how answers are given) or a transport request.

use std::ops::RangeInclusive;

use midly::live::LiveEvent;
use midly::MidiMessage;

/// Computer keys laid out like one octave of a piano, starting at the tonic.
pub const PIANO_KEYS: [char; 13] = [
    'a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j', 'k',
];

/// Raw input from one of the collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A character typed on the computer keyboard
    Key(char),
    /// A key of the on-screen piano was clicked
    Piano(u8),
    /// Raw bytes from a MIDI input port
    Midi(Vec<u8>),
}

/// What the trainer is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Play(u8),
    StartTest,
    StopTest,
    /// Start when idle, stop when a test is running
    ToggleTest,
    SetDegrees(Vec<i32>),
}

pub struct InputNormalizer {
    key_root: u8,
    keyboard_range: RangeInclusive<u8>,
}

impl InputNormalizer {
    pub fn new(key_root: u8, keyboard_range: RangeInclusive<u8>) -> Self {
        Self {
            key_root,
            keyboard_range,
        }
    }

    pub fn normalize(&self, event: &InputEvent) -> Option<Request> {
        match event {
            InputEvent::Key(c) => self.key_request(*c),
            InputEvent::Piano(pitch) => self
                .keyboard_range
                .contains(pitch)
                .then_some(Request::Play(*pitch)),
            InputEvent::Midi(bytes) => midi_request(bytes),
        }
    }

    fn key_request(&self, c: char) -> Option<Request> {
        if c == ' ' {
            return Some(Request::ToggleTest);
        }
        let c = c.to_ascii_lowercase();
        PIANO_KEYS
            .iter()
            .position(|&k| k == c)
            .map(|offset| Request::Play(self.key_root.saturating_add(offset as u8)))
    }
}

/// Note-on with a non-zero velocity plays; everything else is ignored.
fn midi_request(bytes: &[u8]) -> Option<Request> {
    match LiveEvent::parse(bytes) {
        Ok(LiveEvent::Midi {
            message: MidiMessage::NoteOn { key, vel },
            ..
        }) if vel.as_int() > 0 => Some(Request::Play(key.as_int())),
        Ok(_) => None,
        Err(e) => {
            log::debug!("ignoring malformed MIDI message {:02X?}: {}", bytes, e);
            None
        }
    }
}
