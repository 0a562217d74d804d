//! Narrative Sequencer — data-driven playback for branching story chapters.
//!
//! A chapter owns events, moments (events that run together) and scenes
//! (moments separated by player input). The sequencer walks a chapter scene by
//! scene, hands visible effects to a presenter, waits for advance signals
//! between moments, and asks the branch resolver where to go when a scene ends.

pub mod core;
pub mod schema;

pub use crate::core::chapter::{Chapter, ChapterBuilder, ChapterError};
pub use crate::core::presenter::{Presenter, RecordingPresenter, ScriptedSignals, Signal, SignalSource};
pub use crate::core::sequencer::{
    run_chapter, Sequencer, SequencerBuilder, SequencerConfig, SequencerError, SequencerState,
    TerminationReason,
};
