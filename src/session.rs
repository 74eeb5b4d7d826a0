//! Test session state machine.
//!
//! A session plays a cadence followed by a test note for each degree drawn
//! from the pool, judges the next note-on after the test note as the answer,
//! and accumulates [`TestResults`].
//!
//! ```text
//! Idle --start_test--> CadencePlaying --test note on--> AwaitingAnswer
//!   ^                        ^                               |
//!   |                        |                          note on (answer)
//!   |                        |                               v
//!   +---stop_test---  <------+-------- pool left ------ AnswerJudged
//!                                                            |
//!                                      Finished <-- pool empty
//! ```
//!
//! The session never blocks: waiting for an answer is just a state, resumed by
//! whichever note-on arrives next.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::{EventBus, Signal};
use crate::clock::{NoteCategory, NotePlayed, Scheduler};
use crate::sequence::{test_note, SequenceBuilder};

pub const DEGREE_MIN: u8 = 0;
pub const DEGREE_MAX: u8 = 11;

pub const TEST_I_IV_V: [u8; 3] = [0, 5, 7];
pub const TEST_I_TO_VII: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
pub const TEST_SHARPED: [u8; 5] = [1, 3, 6, 8, 10];
pub const TEST_ALL: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CadencePlaying,
    AwaitingAnswer,
    AnswerJudged,
    Finished,
}

/// One judged answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestItem {
    pub test_degree: u8,
    pub test_note: u8,
    pub answer_note: u8,
    pub correct: bool,
}

/// Running totals for one test session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestResults {
    /// Pool size when the test started
    pub total_notes: usize,
    /// Test notes scheduled so far
    pub notes_tested: usize,
    pub num_correct: usize,
    pub num_wrong: usize,
    pub finished: bool,
    pub test_items: Vec<TestItem>,
}

/// The degree under test and its MIDI pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CurrentTest {
    degree: u8,
    note: u8,
}

pub struct Session {
    state: SessionState,
    degrees_to_test: Vec<u8>,
    pool: Vec<u8>,
    results: TestResults,
    waiting_for_answer: bool,
    current: Option<CurrentTest>,
    key_root: u8,
    builder: SequenceBuilder,
    rng: StdRng,
}

impl Session {
    pub fn new(key_root: u8, builder: SequenceBuilder, degrees: &[i32]) -> Self {
        Self::with_rng(key_root, builder, degrees, StdRng::from_entropy())
    }

    /// Create a session with a specific random source (for reproducible picks).
    pub fn with_rng(key_root: u8, builder: SequenceBuilder, degrees: &[i32], rng: StdRng) -> Self {
        Self {
            state: SessionState::Idle,
            degrees_to_test: filter_degrees(degrees),
            pool: Vec::new(),
            results: TestResults::default(),
            waiting_for_answer: false,
            current: None,
            key_root,
            builder,
            rng,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn results(&self) -> &TestResults {
        &self.results
    }

    pub fn pool(&self) -> &[u8] {
        &self.pool
    }

    pub fn degrees_to_test(&self) -> &[u8] {
        &self.degrees_to_test
    }

    pub fn waiting_for_answer(&self) -> bool {
        self.waiting_for_answer
    }

    pub fn key_root(&self) -> u8 {
        self.key_root
    }

    /// MIDI pitch the current answer is judged against.
    pub fn expected_test_note(&self) -> Option<u8> {
        self.current.map(|c| c.note)
    }

    pub fn current_degree(&self) -> Option<u8> {
        self.current.map(|c| c.degree)
    }

    /// True between a start and the end of the test.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            SessionState::CadencePlaying | SessionState::AwaitingAnswer | SessionState::AnswerJudged
        )
    }

    /// Replace the configured pool.
    ///
    /// Any running test is stopped first. Degrees outside 0..=11 are dropped;
    /// if nothing is left every degree is tested.
    pub fn set_degrees_to_test(
        &mut self,
        degrees: &[i32],
        scheduler: &mut Scheduler,
        bus: &mut EventBus,
    ) {
        self.stop_test(scheduler, bus);
        self.state = SessionState::Idle;
        self.degrees_to_test = filter_degrees(degrees);
        log::debug!("degrees to test: {:?}", self.degrees_to_test);
    }

    /// Begin a new test over the configured degrees.
    ///
    /// Ignored while a test is active or a cadence is still queued. Returns
    /// whether the test started.
    pub fn start_test(&mut self, scheduler: &mut Scheduler, bus: &mut EventBus) -> bool {
        if self.is_active() || scheduler.is_sequence_playing() {
            log::debug!("start ignored, sequence already running");
            return false;
        }
        if self.degrees_to_test.is_empty() {
            log::debug!("start ignored, nothing to test");
            return false;
        }

        self.pool = self.degrees_to_test.clone();
        self.results = TestResults {
            total_notes: self.pool.len(),
            ..Default::default()
        };
        self.waiting_for_answer = false;
        self.current = None;
        self.state = SessionState::CadencePlaying;
        log::info!("test started with {} notes", self.pool.len());
        bus.publish(Signal::TesterStarted);

        self.pick_next(scheduler, bus);
        true
    }

    /// Draw the next degree and schedule its cadence, or finish if the pool is empty.
    ///
    /// Each draw removes a single occurrence, so duplicates in the pool weight
    /// the selection.
    pub fn pick_next(&mut self, scheduler: &mut Scheduler, bus: &mut EventBus) {
        if !self.is_active() {
            log::debug!("pick ignored in state {:?}", self.state);
            return;
        }
        if self.pool.is_empty() {
            self.finish(scheduler, bus);
            return;
        }

        let index = self.rng.gen_range(0..self.pool.len());
        let degree = self.pool.remove(index);
        let note = test_note(self.key_root, degree);
        self.current = Some(CurrentTest { degree, note });
        self.results.notes_tested += 1;
        self.waiting_for_answer = false;

        release(scheduler.rewind(), bus);
        let batch = self
            .builder
            .build_cadence_plus_test_note(self.key_root, degree, scheduler.current_tick());
        let scheduled = scheduler.schedule_all(batch);
        debug_assert!(scheduled.is_ok(), "cadence batch rejected: {scheduled:?}");
        if let Err(e) = scheduled {
            log::error!("cadence batch rejected: {e}");
        }
        scheduler.start();

        self.state = SessionState::CadencePlaying;
        log::debug!("testing degree {} (note {})", degree, note);
        bus.publish(Signal::SequencerCadenceStarted {
            test_degree: degree,
        });
    }

    /// React to a "note played" signal from the scheduler or free play.
    pub fn on_note_played(
        &mut self,
        note: NotePlayed,
        scheduler: &mut Scheduler,
        bus: &mut EventBus,
    ) {
        if !note.on {
            return;
        }
        match self.state {
            SessionState::CadencePlaying if note.category == NoteCategory::Testing => {
                self.waiting_for_answer = true;
                self.state = SessionState::AwaitingAnswer;
                bus.publish(Signal::SequencerTestNotePlayed);
            }
            SessionState::AwaitingAnswer if note.category != NoteCategory::Testing => {
                self.judge(note.pitch, scheduler, bus);
            }
            _ => {}
        }
    }

    /// Stop the running test, publishing the partial results.
    ///
    /// From `Finished` this just returns to `Idle`; from `Idle` it does nothing.
    /// `TesterFinished` already went out when the pool ran dry, and sending it
    /// again would record the session twice on the results page.
    pub fn stop_test(&mut self, scheduler: &mut Scheduler, bus: &mut EventBus) {
        match self.state {
            SessionState::Idle => return,
            SessionState::Finished => {
                self.state = SessionState::Idle;
                return;
            }
            _ => {}
        }

        release(scheduler.reset(), bus);
        self.waiting_for_answer = false;
        self.current = None;
        self.state = SessionState::Idle;
        log::info!(
            "test stopped after {} of {} notes",
            self.results.notes_tested,
            self.results.total_notes
        );
        bus.publish(Signal::TesterFinished {
            results: self.results.clone(),
        });
    }

    fn judge(&mut self, answer_note: u8, scheduler: &mut Scheduler, bus: &mut EventBus) {
        debug_assert!(
            self.waiting_for_answer && self.current.is_some(),
            "answer judged with no armed test note"
        );
        let Some(current) = self.current.filter(|_| self.waiting_for_answer) else {
            log::error!("answer judged with no armed test note");
            return;
        };
        self.waiting_for_answer = false;
        self.state = SessionState::AnswerJudged;

        let item = TestItem {
            test_degree: current.degree,
            test_note: current.note,
            answer_note,
            correct: answer_note == current.note,
        };
        if item.correct {
            self.results.num_correct += 1;
        } else {
            self.results.num_wrong += 1;
        }
        self.results.test_items.push(item);
        log::debug!("answer {:?}", item);
        bus.publish(Signal::TesterNoteAnswered {
            item,
            results: self.results.clone(),
        });

        self.pick_next(scheduler, bus);
    }

    fn finish(&mut self, scheduler: &mut Scheduler, bus: &mut EventBus) {
        release(scheduler.rewind(), bus);
        self.waiting_for_answer = false;
        self.current = None;
        self.results.finished = true;
        self.state = SessionState::Finished;
        log::info!(
            "test finished: {} correct, {} wrong",
            self.results.num_correct,
            self.results.num_wrong
        );
        bus.publish(Signal::TesterFinished {
            results: self.results.clone(),
        });
    }
}

/// Keep only valid degrees, falling back to all of them when none survive.
pub fn filter_degrees(degrees: &[i32]) -> Vec<u8> {
    let valid: Vec<u8> = degrees
        .iter()
        .filter(|&&d| (DEGREE_MIN as i32..=DEGREE_MAX as i32).contains(&d))
        .map(|&d| d as u8)
        .collect();
    if valid.len() != degrees.len() {
        log::debug!("dropped {} invalid degrees", degrees.len() - valid.len());
    }
    if valid.is_empty() {
        TEST_ALL.to_vec()
    } else {
        valid
    }
}

fn release(notes: Vec<NotePlayed>, bus: &mut EventBus) {
    for note in notes {
        bus.publish(note.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Harness {
        session: Session,
        scheduler: Scheduler,
        bus: EventBus,
        rx: mpsc::Receiver<Signal>,
    }

    impl Harness {
        fn new(degrees: &[i32]) -> Self {
            let mut bus = EventBus::new();
            let rx = bus.channel();
            Self {
                session: Session::with_rng(
                    60,
                    SequenceBuilder::new(5),
                    degrees,
                    StdRng::seed_from_u64(7),
                ),
                scheduler: Scheduler::new(5, 59..=72),
                bus,
                rx,
            }
        }

        fn start(&mut self) -> bool {
            self.session.start_test(&mut self.scheduler, &mut self.bus)
        }

        fn pick(&mut self) {
            self.session.pick_next(&mut self.scheduler, &mut self.bus);
        }

        fn stop(&mut self) {
            self.session.stop_test(&mut self.scheduler, &mut self.bus);
        }

        fn note(&mut self, pitch: u8, on: bool, category: NoteCategory) {
            self.session.on_note_played(
                NotePlayed { pitch, on, category },
                &mut self.scheduler,
                &mut self.bus,
            );
        }

        /// Run the clock until the test note arms.
        fn play_until_armed(&mut self) {
            for _ in 0..100 {
                let outcome = self.scheduler.tick();
                for note in outcome.fired {
                    self.note(note.pitch, note.on, note.category);
                }
                if self.session.waiting_for_answer() {
                    return;
                }
            }
            panic!("test note never armed");
        }

        fn signals(&self) -> Vec<Signal> {
            self.rx.try_iter().collect()
        }
    }

    fn finished_count(signals: &[Signal]) -> usize {
        signals
            .iter()
            .filter(|s| matches!(s, Signal::TesterFinished { .. }))
            .count()
    }

    #[test]
    fn test_filter_degrees() {
        assert_eq!(filter_degrees(&[0, 5, 12, -1, 7]), vec![0, 5, 7]);
        assert_eq!(filter_degrees(&[0, 0, 5]), vec![0, 0, 5]);
        assert_eq!(filter_degrees(&[12, 99]), TEST_ALL.to_vec());
        assert_eq!(filter_degrees(&[]), TEST_ALL.to_vec());
    }

    #[test]
    fn test_start_emits_and_schedules() {
        let mut h = Harness::new(&[0, 5, 7]);
        assert!(h.start());
        assert_eq!(h.session.state(), SessionState::CadencePlaying);
        assert_eq!(h.session.results().total_notes, 3);
        assert_eq!(h.session.results().notes_tested, 1);
        assert_eq!(h.session.pool().len(), 2);
        assert!(h.scheduler.is_running());
        assert_eq!(h.scheduler.pending().len(), 26);

        let signals = h.signals();
        assert_eq!(signals[0], Signal::TesterStarted);
        assert!(matches!(
            signals[1],
            Signal::SequencerCadenceStarted { test_degree } if [0, 5, 7].contains(&test_degree)
        ));
    }

    #[test]
    fn test_start_ignored_while_active() {
        let mut h = Harness::new(&[0, 5]);
        assert!(h.start());
        assert!(!h.start());
        assert_eq!(h.session.results().notes_tested, 1);
    }

    #[test]
    fn test_start_ignored_while_sequence_queued() {
        let mut h = Harness::new(&[0]);
        let builder = SequenceBuilder::new(5);
        h.scheduler
            .schedule_all(builder.build_cadence(60, 0))
            .unwrap();
        assert!(!h.start());
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_free_play_does_not_block_start() {
        let mut h = Harness::new(&[0]);
        h.scheduler.play_now(64);
        assert!(h.start());
    }

    #[test]
    fn test_degree_pool_exhaustion() {
        let mut h = Harness::new(&[0, 0, 5]);
        h.start();
        assert_eq!(h.session.pool().len(), 2);
        h.pick();
        assert_eq!(h.session.pool().len(), 1);
        h.pick();
        assert!(h.session.pool().is_empty());
        assert_eq!(h.session.state(), SessionState::CadencePlaying);

        h.pick();
        assert_eq!(h.session.state(), SessionState::Finished);
        assert!(h.session.results().finished);
        assert_eq!(h.session.results().notes_tested, 3);

        let signals = h.signals();
        let finished: Vec<_> = signals
            .iter()
            .filter_map(|s| match s {
                Signal::TesterFinished { results } => Some(results),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].notes_tested, 3);
    }

    #[test]
    fn test_pick_removes_single_occurrence() {
        let mut h = Harness::new(&[3, 3, 3, 3]);
        h.start();
        assert_eq!(h.session.pool(), &[3, 3, 3]);
        assert_eq!(h.session.current_degree(), Some(3));
    }

    #[test]
    fn test_every_degree_is_drawn_once() {
        let mut h = Harness::new(&[0, 1, 2, 3, 4]);
        h.start();
        let mut drawn = vec![h.session.current_degree().unwrap()];
        for _ in 0..4 {
            h.pick();
            drawn.push(h.session.current_degree().unwrap());
        }
        drawn.sort();
        assert_eq!(drawn, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_test_note_arms_answer() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();
        assert_eq!(h.session.state(), SessionState::AwaitingAnswer);
        assert_eq!(h.scheduler.current_tick(), 41);
        assert!(h.signals().contains(&Signal::SequencerTestNotePlayed));
    }

    #[test]
    fn test_correct_answer() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();
        assert_eq!(h.session.expected_test_note(), Some(60));

        h.note(60, true, NoteCategory::Immediate);
        assert!(!h.session.waiting_for_answer());

        let item = h.session.results().test_items[0];
        assert!(item.correct);
        assert_eq!(item.test_degree, 0);
        assert_eq!(item.test_note, 60);
        assert_eq!(item.answer_note, 60);
        assert_eq!(h.session.results().num_correct, 1);
    }

    #[test]
    fn test_wrong_answer() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();

        h.note(61, true, NoteCategory::Immediate);
        assert!(!h.session.waiting_for_answer());

        let results = h.session.results();
        assert!(!results.test_items[0].correct);
        assert_eq!(results.test_items[0].answer_note, 61);
        assert_eq!(results.num_wrong, 1);
        assert_eq!(results.num_correct, 0);
    }

    #[test]
    fn test_answer_emits_note_answered_then_finishes() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();
        h.signals();

        h.note(60, true, NoteCategory::Immediate);
        let signals = h.signals();
        let answered = signals
            .iter()
            .position(|s| matches!(s, Signal::TesterNoteAnswered { item, .. } if item.correct))
            .unwrap();
        let finished = signals
            .iter()
            .position(|s| matches!(s, Signal::TesterFinished { results } if results.finished))
            .unwrap();
        assert!(answered < finished);
        assert_eq!(h.session.state(), SessionState::Finished);
    }

    #[test]
    fn test_answer_schedules_next_cadence() {
        let mut h = Harness::new(&[0, 7]);
        h.start();
        h.play_until_armed();
        h.note(60, true, NoteCategory::Immediate);

        assert_eq!(h.session.state(), SessionState::CadencePlaying);
        assert_eq!(h.session.results().notes_tested, 2);
        assert_eq!(h.scheduler.current_tick(), 0);
        assert_eq!(h.scheduler.pending().len(), 26);
    }

    #[test]
    fn test_note_off_never_judged() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();

        h.note(60, false, NoteCategory::Testing);
        h.note(60, false, NoteCategory::Immediate);
        assert!(h.session.waiting_for_answer());
        assert!(h.session.results().test_items.is_empty());
    }

    #[test]
    fn test_test_note_off_from_clock_not_judged() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();
        // Let the test note's own note-off fire
        for _ in 0..10 {
            for note in h.scheduler.tick().fired {
                h.note(note.pitch, note.on, note.category);
            }
        }
        assert!(h.session.results().test_items.is_empty());
        assert_eq!(h.session.state(), SessionState::AwaitingAnswer);
    }

    #[test]
    fn test_note_on_before_arming_ignored() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.note(62, true, NoteCategory::Immediate);
        assert!(h.session.results().test_items.is_empty());
        assert_eq!(h.session.state(), SessionState::CadencePlaying);
    }

    #[test]
    fn test_stop_publishes_partial_results_and_purges() {
        let mut h = Harness::new(&[0, 5]);
        h.start();
        h.stop();
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.scheduler.pending().is_empty());
        assert!(!h.scheduler.is_running());

        let signals = h.signals();
        assert_eq!(finished_count(&signals), 1);
        let Some(Signal::TesterFinished { results }) = signals.last() else {
            panic!("expected TesterFinished");
        };
        assert!(!results.finished);
        assert_eq!(results.notes_tested, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut h = Harness::new(&[0]);
        h.stop();
        assert!(h.signals().is_empty());

        h.start();
        h.stop();
        h.stop();
        assert_eq!(finished_count(&h.signals()), 1);
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_stop_after_finish_is_silent() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.pick();
        assert_eq!(h.session.state(), SessionState::Finished);
        h.signals();

        h.stop();
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.signals().is_empty());
    }

    #[test]
    fn test_setting_degrees_stops_active_test() {
        let mut h = Harness::new(&[0, 5]);
        h.start();
        h.play_until_armed();
        h.session
            .set_degrees_to_test(&[2, 4, 40], &mut h.scheduler, &mut h.bus);

        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(!h.session.waiting_for_answer());
        assert_eq!(h.session.degrees_to_test(), &[2, 4]);
        assert_eq!(finished_count(&h.signals()), 1);

        // Answers after cancellation are ignored
        h.note(60, true, NoteCategory::Immediate);
        assert!(h.session.results().test_items.is_empty());
    }

    #[test]
    fn test_restart_after_finish_replaces_results() {
        let mut h = Harness::new(&[0]);
        h.start();
        h.play_until_armed();
        h.note(61, true, NoteCategory::Immediate);
        assert_eq!(h.session.state(), SessionState::Finished);

        assert!(h.start());
        assert_eq!(h.session.results().test_items.len(), 0);
        assert!(!h.session.results().finished);
    }

    #[test]
    fn test_stop_releases_sounding_notes() {
        let mut h = Harness::new(&[0]);
        h.start();
        // First chord sounds
        h.scheduler.tick();
        h.signals();

        h.stop();
        let released: Vec<u8> = h
            .signals()
            .iter()
            .filter_map(|s| match s {
                Signal::SequencerNotePlayed { pitch, on: false, .. } => Some(*pitch),
                _ => None,
            })
            .collect();
        assert_eq!(released.len(), 3);
        assert!(released.contains(&60));
        assert!(released.contains(&64));
        assert!(released.contains(&67));
    }
}
