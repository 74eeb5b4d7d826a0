//! Ear Trainer - plays a cadence and a test note, then scores your answer.
//!
//! Answer on the on-screen piano, the computer keyboard (a w s e d f t g y h
//! u j k, space to start/stop) or a MIDI keyboard. Notes are sent to a MIDI
//! output (preferring IAC Driver on macOS) for sound.
//!
//! Logging is controlled with RUST_LOG; it defaults to Info.

mod ui;

use std::collections::HashSet;
use std::sync::mpsc;

use iced::event::{self, Event};
use iced::keyboard::{self, key::Named, Key};
use iced::time::{self, milliseconds};
use iced::widget::{button, column, container, pick_list, row, text};
use iced::{window, Center, Element, Fill, Subscription, Theme};
use log::LevelFilter;

use eartrainer::bus::Signal;
use eartrainer::config::TrainerConfig;
use eartrainer::engine::Trainer;
use eartrainer::input::{InputEvent, InputNormalizer, Request};
use eartrainer::midi::{self, MidiOut};
use eartrainer::results::ResultsPage;
use eartrainer::session::{SessionState, TestItem};

use ui::piano::view_piano;
use ui::results_table::view_results_table;
use ui::DegreePreset;

fn main() -> iced::Result {
    let mut log_builder = env_logger::builder();
    if std::env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Info);
    }
    log_builder.init();

    iced::application(EarTrainer::new, EarTrainer::update, EarTrainer::view)
        .title("Ear Trainer")
        .subscription(EarTrainer::subscription)
        .theme(EarTrainer::theme)
        .run()
}

struct EarTrainer {
    config: TrainerConfig,
    trainer: Trainer,
    normalizer: InputNormalizer,
    signals: mpsc::Receiver<Signal>,
    midi_rx: mpsc::Receiver<Vec<u8>>,
    results: ResultsPage,
    sounding: HashSet<u8>,
    last_item: Option<TestItem>,
    input_name: String,
    output_name: String,
    _midi_connection: Option<midir::MidiInputConnection<()>>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Input(InputEvent),
    StartStop,
    PresetSelected(DegreePreset),
}

impl EarTrainer {
    fn new() -> Self {
        let config = TrainerConfig::load(TrainerConfig::default_path()).unwrap_or_else(|e| {
            log::warn!("{e:#}; using defaults");
            TrainerConfig::default()
        });

        let mut trainer = Trainer::new(&config);
        let signals = trainer.signals();

        let output_name = match MidiOut::new(config.midi_output.as_deref(), config.channel_index())
        {
            Ok(out) => {
                let name = out.port_name.clone();
                trainer.subscribe(Box::new(out));
                name
            }
            Err(e) => {
                log::warn!("{e:#}");
                "No MIDI output".to_string()
            }
        };

        let (midi_tx, midi_rx) = mpsc::channel();
        let (midi_connection, input_name) =
            match midi::connect_input(config.midi_input.as_deref(), midi_tx) {
                Ok((conn, name)) => (Some(conn), name),
                Err(e) => {
                    log::warn!("{e:#}");
                    (None, "No MIDI input".to_string())
                }
            };

        Self {
            normalizer: InputNormalizer::new(config.key_root, config.keyboard_range()),
            results: ResultsPage::new(config.key_root),
            config,
            trainer,
            signals,
            midi_rx,
            sounding: HashSet::new(),
            last_item: None,
            input_name,
            output_name,
            _midi_connection: midi_connection,
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::Tick => {
                // Input that arrived since the last tick is handled before the clock moves
                let pending: Vec<Vec<u8>> = self.midi_rx.try_iter().collect();
                for bytes in pending {
                    self.handle_input(InputEvent::Midi(bytes));
                }
                self.trainer.tick();
            }
            Message::Input(event) => self.handle_input(event),
            Message::StartStop => self.trainer.handle(Request::ToggleTest),
            Message::PresetSelected(preset) => {
                self.trainer.handle(Request::SetDegrees(preset.degrees()));
                self.config.degrees_to_test = preset.degrees();
                if let Err(e) = self.config.save(TrainerConfig::default_path()) {
                    log::warn!("{e:#}");
                }
            }
        }
        self.drain_signals();
    }

    fn handle_input(&mut self, event: InputEvent) {
        if let Some(request) = self.normalizer.normalize(&event) {
            self.trainer.handle(request);
        }
    }

    fn drain_signals(&mut self) {
        let signals: Vec<Signal> = self.signals.try_iter().collect();
        for signal in &signals {
            self.results.apply(signal);
            match signal {
                Signal::SequencerNotePlayed { pitch, on, .. } => {
                    if *on {
                        self.sounding.insert(*pitch);
                    } else {
                        self.sounding.remove(pitch);
                    }
                }
                Signal::TesterStarted => self.last_item = None,
                Signal::TesterNoteAnswered { item, .. } => self.last_item = Some(*item),
                _ => {}
            }
        }
    }

    fn status(&self) -> String {
        let results = self.trainer.results();
        match self.trainer.state() {
            SessionState::Idle if results.total_notes == 0 => {
                "Press space or Start to begin".to_string()
            }
            SessionState::Idle => format!(
                "Stopped after {} of {} notes",
                results.notes_tested, results.total_notes
            ),
            SessionState::CadencePlaying | SessionState::AnswerJudged => format!(
                "Listen... note {} of {}",
                results.notes_tested, results.total_notes
            ),
            SessionState::AwaitingAnswer => "Which note was that?".to_string(),
            SessionState::Finished => format!(
                "Done: {} correct, {} wrong",
                results.num_correct, results.num_wrong
            ),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let running = self.trainer.is_testing();
        let transport_label = if running { "⏹ Stop" } else { "▶ Start" };

        let last_answer = match self.last_item {
            Some(item) if item.correct => format!("✔ {}", midi::note_name(item.test_note)),
            Some(item) => format!(
                "✘ was {}, you played {}",
                midi::note_name(item.test_note),
                midi::note_name(item.answer_note)
            ),
            None => String::new(),
        };

        let transport = row![
            button(text(transport_label).size(18)).on_press(Message::StartStop),
            pick_list(
                DegreePreset::ALL,
                DegreePreset::matching(self.trainer.degrees_to_test()),
                Message::PresetSelected,
            )
            .placeholder("Custom"),
        ]
        .spacing(12)
        .align_y(Center);

        let content = column![
            text("Ear Trainer").size(36),
            text(format!("🎹 {}  ·  🔊 {}", self.input_name, self.output_name)).size(14),
            transport,
            text(self.status()).size(24),
            text(last_answer).size(18),
            view_piano(self.config.keyboard_range(), &self.sounding, |note| {
                Message::Input(InputEvent::Piano(note))
            }),
            view_results_table(
                self.results.degrees(),
                self.trainer.key_root(),
                self.trainer.degrees_to_test(),
                self.last_item,
            ),
        ]
        .spacing(10)
        .align_x(Center);

        container(content)
            .width(Fill)
            .height(Fill)
            .center_x(Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            time::every(milliseconds(self.config.tick_ms)).map(|_| Message::Tick),
            event::listen_with(on_event),
        ])
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl Default for EarTrainer {
    fn default() -> Self {
        Self::new()
    }
}

fn on_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    let Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) = event else {
        return None;
    };
    match key {
        Key::Named(Named::Space) => Some(Message::Input(InputEvent::Key(' '))),
        Key::Character(c) => c.chars().next().map(|c| Message::Input(InputEvent::Key(c))),
        _ => None,
    }
}
