//! In-process message bus between the trainer core and its collaborators.
//!
//! Every signal the core emits is one variant of [`Signal`]. Listeners are
//! called synchronously, in subscription order, before `publish` returns.

use std::sync::mpsc;

use crate::clock::{NoteCategory, NotePlayed};
use crate::session::{TestItem, TestResults};

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A scheduled or immediate note was played (drives notation and key highlighting)
    SequencerNotePlayed {
        pitch: u8,
        on: bool,
        category: NoteCategory,
    },
    /// A new cadence + test note batch was scheduled
    SequencerCadenceStarted { test_degree: u8 },
    /// The test note sounded; the next note-on is the answer
    SequencerTestNotePlayed,
    /// The scheduler drained its pending set and stopped
    SequenceFinished,
    TesterStarted,
    TesterNoteAnswered {
        item: TestItem,
        results: TestResults,
    },
    TesterFinished { results: TestResults },
}

impl From<NotePlayed> for Signal {
    fn from(note: NotePlayed) -> Self {
        Signal::SequencerNotePlayed {
            pitch: note.pitch,
            on: note.on,
            category: note.category,
        }
    }
}

/// Receives every published signal.
pub trait Listener {
    fn on_signal(&mut self, signal: &Signal);
}

/// Forwards signals to a channel, e.g. for a UI that polls on its own schedule.
impl Listener for mpsc::Sender<Signal> {
    fn on_signal(&mut self, signal: &Signal) {
        // A dropped receiver just means nobody is watching anymore
        let _ = self.send(signal.clone());
    }
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn Listener>) {
        self.listeners.push(listener);
    }

    /// Convenience for subscribing a fresh channel.
    pub fn channel(&mut self) -> mpsc::Receiver<Signal> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(Box::new(tx));
        rx
    }

    pub fn publish(&mut self, signal: Signal) {
        log::trace!("signal: {signal:?}");
        for listener in &mut self.listeners {
            listener.on_signal(&signal);
        }
    }
}
