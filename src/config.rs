//! Configuration persistence for the ear trainer.
//!
//! Saves and loads trainer settings to/from YAML files.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::midi::{KEYBOARD_HIGH, KEYBOARD_LOW, MIDDLE_C, SOUND_HIGH, SOUND_LOW};
use crate::session::TEST_I_IV_V;

const MIN_TICK_MS: u64 = 1;
const MIDI_NOTE_MAX: u8 = 127;
/// Lowest root whose cadence stays on the MIDI note range
pub const KEY_ROOT_MIN: u8 = 1;
/// Highest root whose cadence stays on the MIDI note range
pub const KEY_ROOT_MAX: u8 = MIDI_NOTE_MAX - 12;

/// Complete trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Timer period in milliseconds
    pub tick_ms: u64,
    /// Spacing between cadence chord starts, in ticks
    pub ticks_between_chords: u64,
    /// Tonic of the cadence (MIDI note)
    pub key_root: u8,
    /// Lowest and highest note the instrument can sound
    pub sound_low: u8,
    pub sound_high: u8,
    /// Range of the on-screen piano
    pub keyboard_low: u8,
    pub keyboard_high: u8,
    /// Scale degrees to test; duplicates weight the selection
    pub degrees_to_test: Vec<i32>,
    /// MIDI input device name substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_input: Option<String>,
    /// MIDI output device name substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_output: Option<String>,
    /// MIDI output channel (1-16, stored as 1-indexed for human readability)
    pub output_channel: u8,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            ticks_between_chords: 5,
            key_root: MIDDLE_C,
            sound_low: SOUND_LOW,
            sound_high: SOUND_HIGH,
            keyboard_low: KEYBOARD_LOW,
            keyboard_high: KEYBOARD_HIGH,
            degrees_to_test: TEST_I_IV_V.iter().map(|&d| d as i32).collect(),
            midi_input: None,
            midi_output: None,
            output_channel: 1,
        }
    }
}

impl TrainerConfig {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        let project_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        project_dir.join("eartrainer_config.yaml")
    }

    /// Load configuration from a YAML file; a missing file yields defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: Self =
            serde_yaml::from_str(&content).context("failed to parse config YAML")?;
        Ok(config.validated())
    }

    /// Bring out-of-range values back to something playable.
    ///
    /// The clock needs a non-zero period and chord spacing, and the cadence
    /// reaches one semitone below the root and an octave above it.
    pub fn validated(mut self) -> Self {
        if self.tick_ms < MIN_TICK_MS {
            log::debug!("tick_ms {} raised to {}", self.tick_ms, MIN_TICK_MS);
            self.tick_ms = MIN_TICK_MS;
        }
        if self.ticks_between_chords == 0 {
            log::debug!("ticks_between_chords 0 raised to 1");
            self.ticks_between_chords = 1;
        }
        let root = self.key_root.clamp(KEY_ROOT_MIN, KEY_ROOT_MAX);
        if root != self.key_root {
            log::debug!("key_root {} clamped to {}", self.key_root, root);
            self.key_root = root;
        }
        if self.sound_low > self.sound_high {
            log::debug!("swapping inverted sound range");
            std::mem::swap(&mut self.sound_low, &mut self.sound_high);
        }
        if self.keyboard_low > self.keyboard_high {
            log::debug!("swapping inverted keyboard range");
            std::mem::swap(&mut self.keyboard_low, &mut self.keyboard_high);
        }
        self.sound_high = self.sound_high.min(MIDI_NOTE_MAX);
        self.keyboard_high = self.keyboard_high.min(MIDI_NOTE_MAX);
        self.output_channel = self.output_channel.clamp(1, 16);
        self
    }

    /// Save configuration to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    pub fn sound_range(&self) -> RangeInclusive<u8> {
        self.sound_low..=self.sound_high
    }

    pub fn keyboard_range(&self) -> RangeInclusive<u8> {
        self.keyboard_low..=self.keyboard_high
    }

    /// 0-indexed channel for MIDI status bytes.
    pub fn channel_index(&self) -> u8 {
        self.output_channel.clamp(1, 16) - 1
    }
}
