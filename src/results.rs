//! Results page: per-degree statistics and finished-session history.
//!
//! Fed from the bus; the core never reads it back.

use chrono::{DateTime, Local};

use crate::bus::Signal;
use crate::session::TestResults;

pub const ITEMS_PER_OCTAVE: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegreeStats {
    pub num_tests: u32,
    pub num_correct: u32,
}

impl DegreeStats {
    /// Percentage correct, or None before the first test.
    pub fn score(&self) -> Option<f64> {
        (self.num_tests > 0).then(|| self.num_correct as f64 * 100.0 / self.num_tests as f64)
    }
}

/// A test that ran to completion or was stopped.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub ended_at: DateTime<Local>,
    pub results: TestResults,
}

#[derive(Debug, Clone)]
pub struct ResultsPage {
    key_root: u8,
    degrees: [DegreeStats; ITEMS_PER_OCTAVE],
    history: Vec<SessionRecord>,
}

impl ResultsPage {
    pub fn new(key_root: u8) -> Self {
        Self {
            key_root,
            degrees: [DegreeStats::default(); ITEMS_PER_OCTAVE],
            history: Vec::new(),
        }
    }

    pub fn key_root(&self) -> u8 {
        self.key_root
    }

    pub fn degrees(&self) -> &[DegreeStats; ITEMS_PER_OCTAVE] {
        &self.degrees
    }

    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.degrees = [DegreeStats::default(); ITEMS_PER_OCTAVE];
        self.history.clear();
    }

    /// Update from a bus signal; unrelated signals are ignored.
    pub fn apply(&mut self, signal: &Signal) {
        self.apply_at(signal, Local::now());
    }

    /// Update with a specific timestamp (for testing).
    pub fn apply_at(&mut self, signal: &Signal, now: DateTime<Local>) {
        match signal {
            Signal::TesterNoteAnswered { item, .. } => {
                let index = item.test_note as i16 - self.key_root as i16;
                if (0..ITEMS_PER_OCTAVE as i16).contains(&index) {
                    let stats = &mut self.degrees[index as usize];
                    stats.num_tests += 1;
                    if item.correct {
                        stats.num_correct += 1;
                    }
                }
            }
            Signal::TesterFinished { results } => {
                self.history.push(SessionRecord {
                    ended_at: now,
                    results: results.clone(),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TestItem;
    use chrono::TimeZone;

    fn answered(test_note: u8, correct: bool) -> Signal {
        Signal::TesterNoteAnswered {
            item: TestItem {
                test_degree: test_note.saturating_sub(60),
                test_note,
                answer_note: if correct { test_note } else { 0 },
                correct,
            },
            results: TestResults::default(),
        }
    }

    #[test]
    fn test_counts_per_degree() {
        let mut page = ResultsPage::new(60);
        page.apply(&answered(60, true));
        page.apply(&answered(60, false));
        page.apply(&answered(67, true));

        assert_eq!(
            page.degrees()[0],
            DegreeStats {
                num_tests: 2,
                num_correct: 1
            }
        );
        assert_eq!(page.degrees()[7].num_correct, 1);
        assert_eq!(page.degrees()[0].score(), Some(50.0));
        assert_eq!(page.degrees()[1].score(), None);
    }

    #[test]
    fn test_out_of_octave_ignored() {
        let mut page = ResultsPage::new(60);
        page.apply(&answered(59, true));
        page.apply(&answered(72, true));
        assert!(page.degrees().iter().all(|d| d.num_tests == 0));
    }

    #[test]
    fn test_finished_sessions_recorded() {
        let mut page = ResultsPage::new(60);
        let when = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let results = TestResults {
            total_notes: 3,
            notes_tested: 3,
            num_correct: 2,
            num_wrong: 1,
            finished: true,
            test_items: Vec::new(),
        };
        page.apply_at(
            &Signal::TesterFinished {
                results: results.clone(),
            },
            when,
        );
        page.apply(&Signal::TesterStarted);

        assert_eq!(page.history().len(), 1);
        assert_eq!(page.history()[0].ended_at, when);
        assert_eq!(page.history()[0].results, results);

        page.clear();
        assert!(page.history().is_empty());
    }
}
