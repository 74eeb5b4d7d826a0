//! Ear training core: plays a I-IV-V-I cadence followed by a test note and
//! scores the next note the user plays.
//!
//! - [`clock`]: logical clock and pending note events
//! - [`sequence`]: cadence and chord expansion
//! - [`session`]: the test state machine
//! - [`engine`]: ties the above to a message bus, one tick at a time
//! - [`input`], [`midi`], [`results`], [`config`]: collaborators around the core

pub mod bus;
pub mod clock;
pub mod config;
pub mod engine;
pub mod input;
pub mod midi;
pub mod results;
pub mod sequence;
pub mod session;
