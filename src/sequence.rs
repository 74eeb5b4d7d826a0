//! Expands chords and cadences into scheduled note events.
//!
//! A chord is just several single-note events sharing a due tick; the
//! scheduler has no chord concept.

use crate::clock::{NoteCategory, ScheduledEvent};

/// Semitone offsets from the tonic for the I, IV, V, I cadence.
pub const CADENCE_CHORDS: [[i8; 3]; 4] = [
    [0, 4, 7],  // I
    [5, 9, 12], // IV
    [7, -1, 2], // V
    [0, 4, 7],  // I
];

/// Chord slot (in units of chord spacing) where the test note starts.
pub const TEST_NOTE_SLOT: u64 = 8;

/// Builds event batches with a fixed inter-chord spacing.
#[derive(Debug, Clone, Copy)]
pub struct SequenceBuilder {
    pub ticks_between_chords: u64,
}

impl SequenceBuilder {
    pub fn new(ticks_between_chords: u64) -> Self {
        Self {
            ticks_between_chords,
        }
    }

    /// One event per pitch, all due on `at_tick`.
    pub fn build_chord(
        &self,
        pitches: &[u8],
        on: bool,
        at_tick: u64,
        category: NoteCategory,
    ) -> Vec<ScheduledEvent> {
        pitches
            .iter()
            .map(|&pitch| ScheduledEvent {
                pitch,
                on,
                due_tick: at_tick,
                category,
            })
            .collect()
    }

    /// A note-on chord at `at_tick` and its note-off one spacing later.
    pub fn build_terminated_chord(
        &self,
        pitches: &[u8],
        at_tick: u64,
        category: NoteCategory,
    ) -> Vec<ScheduledEvent> {
        let mut events = self.build_chord(pitches, true, at_tick, category);
        events.extend(self.build_chord(
            pitches,
            false,
            at_tick + self.ticks_between_chords,
            category,
        ));
        events
    }

    /// The I, IV, V, I cadence in the key of `root`, starting at `at_tick`.
    pub fn build_cadence(&self, root: u8, at_tick: u64) -> Vec<ScheduledEvent> {
        CADENCE_CHORDS
            .iter()
            .enumerate()
            .flat_map(|(i, offsets)| {
                let pitches: Vec<u8> = offsets
                    .iter()
                    .map(|&offset| transpose(root, offset))
                    .collect();
                self.build_terminated_chord(
                    &pitches,
                    at_tick + i as u64 * self.ticks_between_chords,
                    NoteCategory::cadence(i),
                )
            })
            .collect()
    }

    /// The cadence followed by the test note `root + test_degree`.
    pub fn build_cadence_plus_test_note(
        &self,
        root: u8,
        test_degree: u8,
        at_tick: u64,
    ) -> Vec<ScheduledEvent> {
        let mut events = self.build_cadence(root, at_tick);
        events.extend(self.build_terminated_chord(
            &[test_note(root, test_degree)],
            at_tick + TEST_NOTE_SLOT * self.ticks_between_chords,
            NoteCategory::Testing,
        ));
        events
    }
}

/// MIDI pitch of a scale degree in the key of `root`.
pub fn test_note(root: u8, degree: u8) -> u8 {
    root.saturating_add(degree).min(127)
}

fn transpose(root: u8, offset: i8) -> u8 {
    (root as i16 + offset as i16).clamp(0, 127) as u8
}
