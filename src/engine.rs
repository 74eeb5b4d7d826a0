//! The trainer core: scheduler, session and bus driven by one timer.
//!
//! All work happens inside [`Trainer::tick`] and [`Trainer::handle`], each of
//! which runs to completion before returning. Hosts call `tick` every
//! `tick_ms` milliseconds and feed normalized input through `handle` in
//! between.

use crate::bus::{EventBus, Listener, Signal};
use crate::clock::{ClockState, NotePlayed, Scheduler};
use crate::config::TrainerConfig;
use crate::input::Request;
use crate::sequence::SequenceBuilder;
use crate::session::{Session, SessionState, TestResults};

pub struct Trainer {
    scheduler: Scheduler,
    session: Session,
    bus: EventBus,
}

impl Trainer {
    pub fn new(config: &TrainerConfig) -> Self {
        let config = &config.clone().validated();
        let session = Session::new(
            config.key_root,
            SequenceBuilder::new(config.ticks_between_chords),
            &config.degrees_to_test,
        );
        Self::with_session(config, session)
    }

    /// Build a trainer around an existing session (e.g. one with a seeded rng).
    pub fn with_session(config: &TrainerConfig, session: Session) -> Self {
        let config = config.clone().validated();
        Self {
            scheduler: Scheduler::new(config.ticks_between_chords, config.sound_range()),
            session,
            bus: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Listener>) {
        self.bus.subscribe(listener);
    }

    pub fn signals(&mut self) -> std::sync::mpsc::Receiver<Signal> {
        self.bus.channel()
    }

    pub fn clock(&self) -> ClockState {
        self.scheduler.clock()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn results(&self) -> &TestResults {
        self.session.results()
    }

    pub fn is_testing(&self) -> bool {
        self.session.is_active()
    }

    pub fn waiting_for_answer(&self) -> bool {
        self.session.waiting_for_answer()
    }

    pub fn degrees_to_test(&self) -> &[u8] {
        self.session.degrees_to_test()
    }

    pub fn key_root(&self) -> u8 {
        self.session.key_root()
    }

    /// One timer period elapsed.
    pub fn tick(&mut self) {
        let outcome = self.scheduler.tick();
        for note in outcome.fired {
            self.dispatch(note);
        }
        if outcome.finished {
            self.bus.publish(Signal::SequenceFinished);
        }
    }

    pub fn handle(&mut self, request: Request) {
        match request {
            Request::Play(pitch) => self.play(pitch),
            Request::StartTest => self.start_test(),
            Request::StopTest => self.stop_test(),
            Request::ToggleTest => {
                if self.session.is_active() {
                    self.stop_test();
                } else {
                    self.start_test();
                }
            }
            Request::SetDegrees(degrees) => self.set_degrees(&degrees),
        }
    }

    /// Free play; while a test note is armed this is also the answer.
    pub fn play(&mut self, pitch: u8) {
        if let Some(note) = self.scheduler.play_now(pitch) {
            self.dispatch(note);
        }
    }

    pub fn start_test(&mut self) {
        self.session.start_test(&mut self.scheduler, &mut self.bus);
    }

    pub fn stop_test(&mut self) {
        self.session.stop_test(&mut self.scheduler, &mut self.bus);
    }

    pub fn set_degrees(&mut self, degrees: &[i32]) {
        self.session
            .set_degrees_to_test(degrees, &mut self.scheduler, &mut self.bus);
    }

    fn dispatch(&mut self, note: NotePlayed) {
        self.bus.publish(note.into());
        self.session
            .on_note_played(note, &mut self.scheduler, &mut self.bus);
    }
}
