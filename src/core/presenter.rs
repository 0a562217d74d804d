/// Presentation seam — the collaborator that shows events and supplies input.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::schema::event::ImageLayer;
use crate::schema::handle::SceneId;

/// Receives the visible effects of event execution.
///
/// Only dialogue is required; the other hooks default to doing nothing so a
/// text-only front end stays small.
pub trait Presenter {
    fn on_dialogue(&mut self, text: &str);

    fn on_image_change(&mut self, _layer: &ImageLayer, _asset: &str) {}

    fn on_animation(&mut self, _name: &str) {}

    fn on_choice(&mut self, _prompt: &str, _options: &[String]) {}

    /// Called when the sequencer enters a scene, before its first moment runs.
    fn on_scene(&mut self, _scene: SceneId, _name: Option<&str>) {}
}

/// Input that releases the sequencer from `AwaitingInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Advance,
    /// Select an option of the pending choice, by zero-based index.
    Choose(usize),
}

/// A blocking source of advance signals. `None` means input is closed.
pub trait SignalSource {
    fn next_signal(&mut self) -> Option<Signal>;
}

/// A fixed queue of signals, mostly for tests and scripted playback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSignals {
    queue: VecDeque<Signal>,
    delivered: usize,
}

impl ScriptedSignals {
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            queue: signals.into_iter().collect(),
            delivered: 0,
        }
    }

    /// `n` plain advance signals.
    pub fn advances(n: usize) -> Self {
        Self::new(std::iter::repeat(Signal::Advance).take(n))
    }

    /// How many signals have been handed out so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SignalSource for ScriptedSignals {
    fn next_signal(&mut self) -> Option<Signal> {
        let signal = self.queue.pop_front()?;
        self.delivered += 1;
        Some(signal)
    }
}

/// One call received by a [`RecordingPresenter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presentation {
    Scene { scene: usize, name: Option<String> },
    Dialogue { text: String },
    Image { layer: ImageLayer, asset: String },
    Animation { name: String },
    Choice { prompt: String, options: Vec<String> },
}

/// Presenter that records everything it is asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub log: Vec<Presentation>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dialogue lines in the order they were shown.
    pub fn lines(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|p| match p {
                Presentation::Dialogue { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Take everything recorded since the last drain.
    pub fn drain(&mut self) -> Vec<Presentation> {
        std::mem::take(&mut self.log)
    }
}

impl Presenter for RecordingPresenter {
    fn on_dialogue(&mut self, text: &str) {
        self.log.push(Presentation::Dialogue {
            text: text.to_string(),
        });
    }

    fn on_image_change(&mut self, layer: &ImageLayer, asset: &str) {
        self.log.push(Presentation::Image {
            layer: layer.clone(),
            asset: asset.to_string(),
        });
    }

    fn on_animation(&mut self, name: &str) {
        self.log.push(Presentation::Animation {
            name: name.to_string(),
        });
    }

    fn on_choice(&mut self, prompt: &str, options: &[String]) {
        self.log.push(Presentation::Choice {
            prompt: prompt.to_string(),
            options: options.to_vec(),
        });
    }

    fn on_scene(&mut self, scene: SceneId, name: Option<&str>) {
        self.log.push(Presentation::Scene {
            scene: scene.0,
            name: name.map(str::to_string),
        });
    }
}
