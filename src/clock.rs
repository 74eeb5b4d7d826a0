//! Logical clock and note event scheduling.
//!
//! This module handles:
//! - Counting timer ticks while a sequence is running
//! - Holding the pending note events keyed by the tick they are due on
//! - Firing due events and stopping the clock once nothing is left
//!
//! The scheduler knows nothing about cadences or tests. Musical structure is
//! built by [`crate::sequence::SequenceBuilder`] and handed over as plain
//! [`ScheduledEvent`] batches.

use std::ops::RangeInclusive;

use thiserror::Error;

/// Tag distinguishing why a note was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteCategory {
    Cadence1,
    Cadence2,
    Cadence3,
    Cadence4,
    Testing,
    Immediate,
}

impl NoteCategory {
    /// Category of the n-th cadence chord (0-indexed).
    pub fn cadence(index: usize) -> Self {
        match index {
            0 => NoteCategory::Cadence1,
            1 => NoteCategory::Cadence2,
            2 => NoteCategory::Cadence3,
            _ => NoteCategory::Cadence4,
        }
    }

    pub fn is_cadence(&self) -> bool {
        matches!(
            self,
            NoteCategory::Cadence1
                | NoteCategory::Cadence2
                | NoteCategory::Cadence3
                | NoteCategory::Cadence4
        )
    }
}

/// A single note on/off waiting for its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// MIDI note number
    pub pitch: u8,
    /// True for note on
    pub on: bool,
    pub due_tick: u64,
    pub category: NoteCategory,
}

/// The "note played" signal emitted when an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePlayed {
    pub pitch: u8,
    pub on: bool,
    pub category: NoteCategory,
}

impl From<&ScheduledEvent> for NotePlayed {
    fn from(event: &ScheduledEvent) -> Self {
        Self {
            pitch: event.pitch,
            on: event.on,
            category: event.category,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("event due at tick {due} is before the current tick {current}")]
    InThePast { due: u64, current: u64 },
}

/// Transport position of the logical clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockState {
    pub current_tick: u64,
    pub running: bool,
}

/// What a single timer tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Events that fired this tick, note-offs first
    pub fired: Vec<NotePlayed>,
    /// True when this tick drained the pending set and stopped the clock
    pub finished: bool,
}

/// Owns the clock and the pending event set.
///
/// # Tick Behavior
/// A tick fires every pending event due on `current_tick`, then advances the
/// tick. If nothing is left pending afterwards the clock stops and the
/// outcome is flagged `finished`. Events scheduled while handling a tick's
/// output are due at or after the advanced tick, so they never fire in the
/// sweep that created them.
pub struct Scheduler {
    clock: ClockState,
    pending: Vec<ScheduledEvent>,
    ticks_between_chords: u64,
    sound_range: RangeInclusive<u8>,
}

impl Scheduler {
    pub fn new(ticks_between_chords: u64, sound_range: RangeInclusive<u8>) -> Self {
        Self {
            clock: ClockState::default(),
            pending: Vec::new(),
            ticks_between_chords,
            sound_range,
        }
    }

    pub fn clock(&self) -> ClockState {
        self.clock
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.current_tick
    }

    pub fn is_running(&self) -> bool {
        self.clock.running
    }

    pub fn ticks_between_chords(&self) -> u64 {
        self.ticks_between_chords
    }

    pub fn pending(&self) -> &[ScheduledEvent] {
        &self.pending
    }

    /// True while a cadence or test note is still queued.
    ///
    /// Free-play note-offs don't count, so a sounding key never blocks a test
    /// from starting.
    pub fn is_sequence_playing(&self) -> bool {
        self.pending
            .iter()
            .any(|e| e.category != NoteCategory::Immediate)
    }

    /// Add an event to the pending set.
    pub fn schedule(&mut self, event: ScheduledEvent) -> Result<(), ScheduleError> {
        if event.due_tick < self.clock.current_tick {
            return Err(ScheduleError::InThePast {
                due: event.due_tick,
                current: self.clock.current_tick,
            });
        }
        self.pending.push(event);
        Ok(())
    }

    /// Schedule a whole batch, stopping at the first rejected event.
    pub fn schedule_all<I>(&mut self, events: I) -> Result<(), ScheduleError>
    where
        I: IntoIterator<Item = ScheduledEvent>,
    {
        for event in events {
            self.schedule(event)?;
        }
        Ok(())
    }

    /// Play a note right now.
    ///
    /// The note-on is returned for immediate delivery; only the matching
    /// note-off is queued, `ticks_between_chords` ticks later. Pitches outside
    /// the instrument range are dropped and `None` is returned.
    pub fn play_now(&mut self, pitch: u8) -> Option<NotePlayed> {
        if !self.sound_range.contains(&pitch) {
            log::debug!(
                "dropping play request for {} outside {:?}",
                pitch,
                self.sound_range
            );
            return None;
        }
        self.pending.push(ScheduledEvent {
            pitch,
            on: false,
            due_tick: self.clock.current_tick + self.ticks_between_chords,
            category: NoteCategory::Immediate,
        });
        self.clock.running = true;
        Some(NotePlayed {
            pitch,
            on: true,
            category: NoteCategory::Immediate,
        })
    }

    /// Start counting ticks without rewinding.
    pub fn start(&mut self) {
        self.clock.running = true;
    }

    /// Clear everything and rewind to tick 0.
    ///
    /// Returns note-offs for notes that are currently sounding, i.e. pending
    /// offs whose note-on has already fired, so callers can release them.
    pub fn reset(&mut self) -> Vec<NotePlayed> {
        let released = self.sounding(|_| true);
        self.pending.clear();
        self.clock = ClockState::default();
        released
    }

    /// Rewind to tick 0 for a new sequence, keeping free-play notes.
    ///
    /// Sequenced events are purged and their sounding notes returned like
    /// [`Scheduler::reset`]. Pending `Immediate` events keep their distance
    /// from the current tick, so a note just played still rings out.
    pub fn rewind(&mut self) -> Vec<NotePlayed> {
        let released = self.sounding(|e| e.category != NoteCategory::Immediate);
        let now = self.clock.current_tick;
        self.pending.retain(|e| e.category == NoteCategory::Immediate);
        for event in &mut self.pending {
            event.due_tick = event.due_tick.saturating_sub(now);
        }
        self.clock = ClockState {
            current_tick: 0,
            running: !self.pending.is_empty(),
        };
        released
    }

    /// Pending offs selected by `filter` whose note-on has already fired.
    fn sounding(&self, filter: impl Fn(&ScheduledEvent) -> bool) -> Vec<NotePlayed> {
        self.pending
            .iter()
            .filter(|off| !off.on && filter(off))
            .filter(|off| {
                !self.pending.iter().any(|on| {
                    on.on
                        && on.pitch == off.pitch
                        && on.category == off.category
                        && on.due_tick <= off.due_tick
                })
            })
            .map(NotePlayed::from)
            .collect()
    }

    /// Advance the clock by one timer tick.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.clock.running {
            return TickOutcome::default();
        }

        let now = self.clock.current_tick;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|e| e.due_tick == now);
        self.pending = rest;
        // false sorts first
        due.sort_by_key(|e| e.on);

        self.clock.current_tick += 1;

        let finished = self.pending.is_empty();
        if finished {
            self.clock.running = false;
        }

        TickOutcome {
            fired: due.iter().map(NotePlayed::from).collect(),
            finished,
        }
    }
}
