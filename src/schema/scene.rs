use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::handle::{EventId, MomentId, SceneId};

/// A sequence of events that happen together without player input.
///
/// Insertion order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moment {
    pub events: Vec<EventId>,
}

impl Moment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, id: EventId) {
        self.events.push(id);
    }
}

impl From<Vec<EventId>> for Moment {
    fn from(events: Vec<EventId>) -> Self {
        Self { events }
    }
}

/// A reference to a scene, either by handle or by its key-scene name.
///
/// Names let content refer forward to scenes that have not been added yet;
/// every reference is resolved when the chapter is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneRef {
    Id(SceneId),
    Named(String),
}

impl From<SceneId> for SceneRef {
    fn from(id: SceneId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for SceneRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// A conditional successor. Branches are tried in declaration order.
///
/// A branch may target its own scene or an earlier one. Playback does not wait
/// between scenes, so a loop whose condition nothing on the loop changes runs
/// forever once it holds; `core::lint` reports such self-loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub when: Condition,
    pub target: SceneRef,
}

/// The unconditional successor taken when no branch matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Next {
    /// The next scene in authoring order; the chapter ends after the last one.
    #[default]
    Linear,
    Goto(SceneRef),
    End,
}

/// A sequence of moments, each of which needs an advance signal to move past.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: Option<String>,
    pub moments: Vec<MomentId>,
    pub branches: Vec<Branch>,
    pub next: Next,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key scene, addressable by name from branches and `Next::Goto`.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn add_moment(&mut self, id: MomentId) {
        self.moments.push(id);
    }

    pub fn add_branch(&mut self, when: Condition, target: impl Into<SceneRef>) {
        self.branches.push(Branch {
            when,
            target: target.into(),
        });
    }

    pub fn set_next(&mut self, next: Next) {
        self.next = next;
    }

    /// Label for log output and error messages.
    pub fn label(&self, id: SceneId) -> String {
        match &self.name {
            Some(name) => format!("'{}'", name),
            None => format!("#{}", id.0),
        }
    }
}
