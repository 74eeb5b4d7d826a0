//! Drill - console ear trainer without the GUI.
//!
//! Type piano keys (a w s e d f t g y h u j k) and press Enter to answer, an
//! empty line to start/stop the test, `q` to quit. A MIDI keyboard works too.
//!
//! Usage: cargo run --bin drill [-- --config <path>]

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;

use eartrainer::bus::Signal;
use eartrainer::config::TrainerConfig;
use eartrainer::engine::Trainer;
use eartrainer::input::{InputEvent, InputNormalizer, Request};
use eartrainer::midi::{self, note_name, MidiOut};
use eartrainer::results::ResultsPage;

enum Command {
    Input(InputEvent),
    Toggle,
    Quit,
}

fn main() -> anyhow::Result<()> {
    let mut log_builder = env_logger::builder();
    if std::env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Warn);
    }
    log_builder.init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(Into::into)
        .unwrap_or_else(TrainerConfig::default_path);
    let config = TrainerConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    println!("=== Ear Trainer Drill ===");
    println!(
        "Key of {}, testing degrees {:?}\n",
        note_name(config.key_root),
        config.degrees_to_test
    );

    let mut trainer = Trainer::new(&config);
    let signals = trainer.signals();
    match MidiOut::new(config.midi_output.as_deref(), config.channel_index()) {
        Ok(out) => {
            println!("Sound on: {}", out.port_name);
            trainer.subscribe(Box::new(out));
        }
        Err(e) => println!("No sound ({e:#}); notes are printed only"),
    }

    let (tx, rx) = mpsc::channel();

    let (midi_tx, midi_rx) = mpsc::channel();
    let _midi_connection = match midi::connect_input(config.midi_input.as_deref(), midi_tx) {
        Ok((conn, name)) => {
            println!("Answering from: {}", name);
            Some(conn)
        }
        Err(e) => {
            println!("No MIDI input ({e:#})");
            None
        }
    };
    let midi_fwd = tx.clone();
    thread::spawn(move || {
        for bytes in midi_rx {
            if midi_fwd.send(Command::Input(InputEvent::Midi(bytes))).is_err() {
                break;
            }
        }
    });

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            let command = match line {
                "" => Command::Toggle,
                "q" => Command::Quit,
                _ => match line.chars().next() {
                    Some(c) => Command::Input(InputEvent::Key(c)),
                    None => continue,
                },
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });

    println!("\nPress Enter to start or stop, q to quit.\n");

    let normalizer = InputNormalizer::new(config.key_root, config.keyboard_range());
    let mut results = ResultsPage::new(config.key_root);
    let period = Duration::from_millis(config.tick_ms);

    'outer: loop {
        // Input is handled between ticks, never during one
        for command in rx.try_iter() {
            match command {
                Command::Input(event) => {
                    if let Some(request) = normalizer.normalize(&event) {
                        trainer.handle(request);
                    }
                }
                Command::Toggle => trainer.handle(Request::ToggleTest),
                Command::Quit => break 'outer,
            }
        }
        trainer.tick();

        for signal in signals.try_iter() {
            results.apply(&signal);
            print_signal(&signal);
        }
        thread::sleep(period);
    }

    trainer.stop_test();
    for signal in signals.try_iter() {
        results.apply(&signal);
        print_signal(&signal);
    }
    print_summary(&results);
    Ok(())
}

fn print_signal(signal: &Signal) {
    match signal {
        Signal::TesterStarted => println!("Test started."),
        Signal::SequencerCadenceStarted { .. } => println!("\n♪ cadence..."),
        Signal::SequencerTestNotePlayed => println!("Which note was that?"),
        Signal::TesterNoteAnswered { item, results } => {
            let mark = if item.correct { "✔" } else { "✘" };
            println!(
                "{} it was {} (you played {})  [{}/{}]",
                mark,
                note_name(item.test_note),
                note_name(item.answer_note),
                results.num_correct,
                results.num_correct + results.num_wrong
            );
        }
        Signal::TesterFinished { results } => {
            let verb = if results.finished { "finished" } else { "stopped" };
            println!(
                "Test {}: {} correct, {} wrong out of {} notes.",
                verb, results.num_correct, results.num_wrong, results.total_notes
            );
        }
        Signal::SequencerNotePlayed { .. } | Signal::SequenceFinished => {}
    }
}

fn print_summary(results: &ResultsPage) {
    println!("\n{:<8} {:<6} {:>6} {:>8}", "DEGREE", "NOTE", "TESTS", "SCORE");
    println!("{}", "-".repeat(32));
    for (degree, stats) in results.degrees().iter().enumerate() {
        if stats.num_tests == 0 {
            continue;
        }
        let note = note_name(results.key_root().saturating_add(degree as u8));
        println!(
            "{:<8} {:<6} {:>6} {:>7.0}%",
            degree,
            note,
            stats.num_tests,
            stats.score().unwrap_or(0.0)
        );
    }
    println!("{} session(s) this run.", results.history().len());
}
