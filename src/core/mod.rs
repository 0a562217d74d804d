//! Playback: event registry, chapter sealing, story state, branch resolution
//! and the sequencer state machine.

pub mod chapter;
pub mod lint;
pub mod presenter;
pub mod registry;
pub mod resolver;
pub mod sequencer;
pub mod state;
