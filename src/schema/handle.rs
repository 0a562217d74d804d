use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for event handles. Indexes the chapter's event registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub usize);

/// Newtype wrapper for moment handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MomentId(pub usize);

/// Newtype wrapper for scene handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub usize);

/// Any handle into a chapter, used when reporting referential integrity failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    Event(EventId),
    Moment(MomentId),
    Scene(SceneId),
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(id) => write!(f, "event #{}", id.0),
            Self::Moment(id) => write!(f, "moment #{}", id.0),
            Self::Scene(id) => write!(f, "scene #{}", id.0),
        }
    }
}

impl From<EventId> for Handle {
    fn from(id: EventId) -> Self {
        Self::Event(id)
    }
}

impl From<MomentId> for Handle {
    fn from(id: MomentId) -> Self {
        Self::Moment(id)
    }
}

impl From<SceneId> for Handle {
    fn from(id: SceneId) -> Self {
        Self::Scene(id)
    }
}
