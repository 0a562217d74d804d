/// Story state — flags, choice history and scene history for one playthrough.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::schema::condition::FlagValue;
use crate::schema::handle::SceneId;

/// A selection the player made for a choice event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub key: String,
    pub index: usize,
    pub label: String,
}

/// Mutable state threaded through one playthrough.
///
/// Owned by exactly one sequencer; separate playthroughs get separate states.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    flags: FxHashMap<String, FlagValue>,
    choices: Vec<ChoiceRecord>,
    history: Vec<SceneId>,
}

impl StoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(FlagValue::is_truthy)
    }

    /// Write a flag, returning the previous value.
    pub fn set_flag(&mut self, name: &str, value: FlagValue) -> Option<FlagValue> {
        self.flags.insert(name.to_string(), value)
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn record_choice(&mut self, key: &str, index: usize, label: &str) {
        self.choices.push(ChoiceRecord {
            key: key.to_string(),
            index,
            label: label.to_string(),
        });
    }

    /// The most recent selection made for `key`.
    pub fn last_choice(&self, key: &str) -> Option<&ChoiceRecord> {
        self.choices.iter().rev().find(|c| c.key == key)
    }

    pub fn choices(&self) -> &[ChoiceRecord] {
        &self.choices
    }

    pub fn enter_scene(&mut self, scene: SceneId) {
        self.history.push(scene);
    }

    /// Scenes entered so far, oldest first. Revisits appear more than once.
    pub fn history(&self) -> &[SceneId] {
        &self.history
    }

    pub fn has_visited(&self, scene: SceneId) -> bool {
        self.history.contains(&scene)
    }
}
