use serde::{Deserialize, Serialize};

use super::condition::FlagValue;

/// Which image slot a `SetImage` event replaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageLayer {
    Background,
    /// A character portrait slot, keyed by character name.
    Character(String),
}

/// The lowest-level thing a story is made of.
///
/// Events are immutable once registered. Presentation kinds are forwarded to the
/// presenter; flag kinds write into story state; `Choice` gates the moment it
/// belongs to until the player picks an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Show a line of dialogue or narration.
    Dialogue { text: String },
    /// Change the background or a character image.
    SetImage { layer: ImageLayer, asset: String },
    /// Trigger a named animation.
    PlayAnimation { name: String },
    /// Write a flag.
    SetFlag { flag: String, value: FlagValue },
    /// Add to an integer flag. A missing flag counts as zero.
    Increment { flag: String, by: i64 },
    /// Store a uniformly random integer in `1..=sides` under `flag`.
    Roll { flag: String, sides: u32 },
    /// Present a choice. The selection is recorded under `key`.
    Choice {
        key: String,
        prompt: String,
        options: Vec<String>,
    },
}

impl EventKind {
    pub fn dialogue(text: &str) -> Self {
        Self::Dialogue {
            text: text.to_string(),
        }
    }

    pub fn set_flag(flag: &str, value: impl Into<FlagValue>) -> Self {
        Self::SetFlag {
            flag: flag.to_string(),
            value: value.into(),
        }
    }

    pub fn choice(key: &str, prompt: &str, options: &[&str]) -> Self {
        Self::Choice {
            key: key.to_string(),
            prompt: prompt.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dialogue { .. } => "dialogue",
            Self::SetImage { .. } => "set_image",
            Self::PlayAnimation { .. } => "play_animation",
            Self::SetFlag { .. } => "set_flag",
            Self::Increment { .. } => "increment",
            Self::Roll { .. } => "roll",
            Self::Choice { .. } => "choice",
        }
    }

    /// The flag this event writes, if any.
    pub fn written_flag(&self) -> Option<&str> {
        match self {
            Self::SetFlag { flag, .. } | Self::Increment { flag, .. } | Self::Roll { flag, .. } => {
                Some(flag.as_str())
            }
            _ => None,
        }
    }

    /// Authoring problems that make the event unusable, if any.
    pub fn defect(&self) -> Option<&'static str> {
        match self {
            Self::Choice { options, .. } if options.is_empty() => Some("choice has no options"),
            Self::Roll { sides: 0, .. } => Some("roll has zero sides"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_flags() {
        assert_eq!(EventKind::set_flag("armed", true).written_flag(), Some("armed"));
        assert_eq!(
            EventKind::Roll {
                flag: "d6".to_string(),
                sides: 6
            }
            .written_flag(),
            Some("d6")
        );
        assert_eq!(EventKind::dialogue("Hi").written_flag(), None);
    }

    #[test]
    fn defects() {
        assert!(EventKind::choice("c", "Pick", &[]).defect().is_some());
        assert!(EventKind::choice("c", "Pick", &["a"]).defect().is_none());
        assert!(EventKind::Roll {
            flag: "r".to_string(),
            sides: 0
        }
        .defect()
        .is_some());
    }

    #[test]
    fn events_from_ron() {
        let events: Vec<EventKind> = ron::from_str(
            r#"[
                Dialogue(text: "Character A: Stop what you're doing!"),
                SetImage(layer: Character("A"), asset: "a_angry.png"),
                PlayAnimation(name: "shake"),
                Increment(flag: "anger", by: 2),
            ]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], EventKind::dialogue("Character A: Stop what you're doing!"));
        assert_eq!(events[1].name(), "set_image");
        assert!(matches!(&events[3], EventKind::Increment { by: 2, .. }));
    }
}
