/// Chapter construction — the builder, seal-time validation and RON loading.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::registry::EventRegistry;
use crate::schema::condition::Condition;
use crate::schema::event::EventKind;
use crate::schema::handle::{EventId, Handle, MomentId, SceneId};
use crate::schema::scene::{Moment, Next, Scene, SceneRef};

#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("unknown {0}")]
    UnknownHandle(Handle),
    #[error("no scene is named '{0}'")]
    UnknownSceneName(String),
    #[error("scene name '{0}' is used twice")]
    DuplicateSceneName(String),
    #[error("scene {0} has no moments")]
    EmptyScene(String),
    #[error("chapter has no initial scene")]
    NoInitialScene,
    #[error("default successors loop back into scene {0} without a condition")]
    DefaultCycle(String),
    #[error("{0:?} holds more than one choice")]
    MultipleChoices(MomentId),
    #[error("invalid event {event:?}: {reason}")]
    InvalidEvent { event: EventId, reason: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A sealed, handle-consistent story unit.
///
/// Owns every event, moment and scene. Read-only once built, so it can be
/// shared between any number of playthroughs.
#[derive(Debug, Clone)]
pub struct Chapter {
    events: EventRegistry,
    moments: Vec<Moment>,
    scenes: Vec<Scene>,
    key_scenes: FxHashMap<String, SceneId>,
    initial_scene: SceneId,
}

impl Chapter {
    pub fn builder() -> ChapterBuilder {
        ChapterBuilder::new()
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn moment(&self, id: MomentId) -> Option<&Moment> {
        self.moments.get(id.0)
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(id.0)
    }

    pub fn scene_by_name(&self, name: &str) -> Option<SceneId> {
        self.key_scenes.get(name).copied()
    }

    pub fn scenes(&self) -> impl Iterator<Item = (SceneId, &Scene)> {
        self.scenes.iter().enumerate().map(|(i, s)| (SceneId(i), s))
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn moment_count(&self) -> usize {
        self.moments.len()
    }

    pub fn initial_scene(&self) -> SceneId {
        self.initial_scene
    }

    /// Resolve a scene reference to a handle inside this chapter.
    pub fn lookup(&self, target: &SceneRef) -> Option<SceneId> {
        match target {
            SceneRef::Id(id) if id.0 < self.scenes.len() => Some(*id),
            SceneRef::Id(_) => None,
            SceneRef::Named(name) => self.scene_by_name(name),
        }
    }

    /// Label for a scene handle, for messages.
    pub fn scene_label(&self, id: SceneId) -> String {
        match self.scene(id) {
            Some(scene) => scene.label(id),
            None => format!("#{}", id.0),
        }
    }

    /// Load and seal a chapter from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Chapter, ChapterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and seal a chapter from a RON string.
    ///
    /// Events are written inline in each moment; scenes refer to each other by name.
    pub fn parse_ron(input: &str) -> Result<Chapter, ChapterError> {
        let raw: RonChapter = ron::from_str(input)?;
        let mut builder = ChapterBuilder::new();

        for ron_scene in raw.scenes {
            let mut scene = Scene {
                name: ron_scene.name,
                ..Scene::default()
            };
            for ron_moment in ron_scene.moments {
                let mut moment = Moment::new();
                for kind in ron_moment {
                    moment.add_event(builder.add_event(kind));
                }
                scene.add_moment(builder.add_moment(moment)?);
            }
            for branch in ron_scene.branches {
                scene.add_branch(branch.when, SceneRef::Named(branch.goto));
            }
            scene.set_next(match ron_scene.next {
                RonNext::Linear => Next::Linear,
                RonNext::Goto(name) => Next::Goto(SceneRef::Named(name)),
                RonNext::End => Next::End,
            });
            builder.add_scene(scene)?;
        }

        if let Some(initial) = raw.initial {
            builder.set_initial_scene(SceneRef::Named(initial));
        }
        builder.seal()
    }
}

// RON loading helpers. Authored chapters inline their events and address
// scenes by name.

#[derive(Debug, Deserialize)]
struct RonChapter {
    #[serde(default)]
    initial: Option<String>,
    scenes: Vec<RonScene>,
}

#[derive(Debug, Deserialize)]
struct RonScene {
    #[serde(default)]
    name: Option<String>,
    moments: Vec<Vec<EventKind>>,
    #[serde(default)]
    branches: Vec<RonBranch>,
    #[serde(default)]
    next: RonNext,
}

#[derive(Debug, Deserialize)]
struct RonBranch {
    when: Condition,
    goto: String,
}

#[derive(Debug, Default, Deserialize)]
enum RonNext {
    #[default]
    Linear,
    Goto(String),
    End,
}

/// Append-only construction of a chapter. Nothing is playable until `seal`.
#[derive(Debug, Clone, Default)]
pub struct ChapterBuilder {
    events: EventRegistry,
    moments: Vec<Moment>,
    scenes: Vec<Scene>,
    initial: Option<SceneRef>,
}

impl ChapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event and return its handle.
    pub fn add_event(&mut self, kind: EventKind) -> EventId {
        self.events.register(kind)
    }

    pub fn add_dialogue(&mut self, text: &str) -> EventId {
        self.add_event(EventKind::dialogue(text))
    }

    /// Add a moment. Every event it references must already be registered.
    pub fn add_moment(&mut self, moment: Moment) -> Result<MomentId, ChapterError> {
        if let Some(missing) = moment.events.iter().find(|id| !self.events.contains(**id)) {
            return Err(ChapterError::UnknownHandle(Handle::Event(*missing)));
        }
        self.moments.push(moment);
        Ok(MomentId(self.moments.len() - 1))
    }

    /// Add a scene. It needs at least one moment, and every moment must exist.
    ///
    /// Branch and successor targets may point forward and are checked at seal time.
    pub fn add_scene(&mut self, scene: Scene) -> Result<SceneId, ChapterError> {
        let id = SceneId(self.scenes.len());
        if scene.moments.is_empty() {
            return Err(ChapterError::EmptyScene(scene.label(id)));
        }
        if let Some(missing) = scene.moments.iter().find(|m| m.0 >= self.moments.len()) {
            return Err(ChapterError::UnknownHandle(Handle::Moment(*missing)));
        }
        self.scenes.push(scene);
        Ok(id)
    }

    /// Choose where playback starts. Defaults to the first scene added.
    pub fn set_initial_scene(&mut self, scene: impl Into<SceneRef>) -> &mut Self {
        self.initial = Some(scene.into());
        self
    }

    /// Validate everything and freeze the chapter.
    pub fn seal(self) -> Result<Chapter, ChapterError> {
        for (id, event) in self.events.iter() {
            if let Some(reason) = event.defect() {
                return Err(ChapterError::InvalidEvent { event: id, reason });
            }
        }

        // Only one choice can be pending at a time.
        for (i, moment) in self.moments.iter().enumerate() {
            let choices = moment
                .events
                .iter()
                .filter(|id| matches!(self.events.get(**id), Some(EventKind::Choice { .. })))
                .count();
            if choices > 1 {
                return Err(ChapterError::MultipleChoices(MomentId(i)));
            }
        }

        let mut key_scenes = FxHashMap::default();
        for (i, scene) in self.scenes.iter().enumerate() {
            if let Some(name) = &scene.name {
                if key_scenes.insert(name.clone(), SceneId(i)).is_some() {
                    return Err(ChapterError::DuplicateSceneName(name.clone()));
                }
            }
        }

        let resolve = |target: &SceneRef| -> Result<SceneId, ChapterError> {
            match target {
                SceneRef::Id(id) if id.0 < self.scenes.len() => Ok(*id),
                SceneRef::Id(id) => Err(ChapterError::UnknownHandle(Handle::Scene(*id))),
                SceneRef::Named(name) => key_scenes
                    .get(name)
                    .copied()
                    .ok_or_else(|| ChapterError::UnknownSceneName(name.clone())),
            }
        };

        let mut defaults = Vec::with_capacity(self.scenes.len());
        for (i, scene) in self.scenes.iter().enumerate() {
            for branch in &scene.branches {
                resolve(&branch.target)?;
            }
            defaults.push(match &scene.next {
                Next::Linear => Some(i + 1).filter(|n| *n < self.scenes.len()),
                Next::Goto(target) => Some(resolve(target)?.0),
                Next::End => None,
            });
        }

        let initial_scene = match &self.initial {
            Some(target) => resolve(target)?,
            None if !self.scenes.is_empty() => SceneId(0),
            None => return Err(ChapterError::NoInitialScene),
        };

        if let Some(looping) = find_default_cycle(&defaults) {
            let label = self.scenes[looping].label(SceneId(looping));
            return Err(ChapterError::DefaultCycle(label));
        }

        debug!(
            events = self.events.len(),
            moments = self.moments.len(),
            scenes = self.scenes.len(),
            "chapter sealed"
        );

        Ok(Chapter {
            events: self.events,
            moments: self.moments,
            scenes: self.scenes,
            key_scenes,
            initial_scene,
        })
    }
}

/// Find a scene that lies on a cycle of unconditional successors.
///
/// Every scene has at most one default successor, so following them from any
/// start either ends or loops; a loop is found when the walk meets a scene it
/// is still on.
fn find_default_cycle(defaults: &[Option<usize>]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        OnWalk,
        Done,
    }

    let mut marks = vec![Mark::Unseen; defaults.len()];
    for start in 0..defaults.len() {
        let mut walk = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnWalk => return Some(i),
                Mark::Unseen => {
                    marks[i] = Mark::OnWalk;
                    walk.push(i);
                    current = defaults[i];
                }
            }
        }
        for i in walk {
            marks[i] = Mark::Done;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_line_scene(builder: &mut ChapterBuilder, name: Option<&str>, text: &str) -> Scene {
        let line = builder.add_dialogue(text);
        let moment = builder.add_moment(Moment::from(vec![line])).unwrap();
        let mut scene = match name {
            Some(name) => Scene::named(name),
            None => Scene::new(),
        };
        scene.add_moment(moment);
        scene
    }

    #[test]
    fn add_moment_rejects_unknown_event() {
        let mut builder = Chapter::builder();
        builder.add_dialogue("only one");
        let err = builder
            .add_moment(Moment::from(vec![EventId(0), EventId(5)]))
            .unwrap_err();
        assert!(matches!(err, ChapterError::UnknownHandle(Handle::Event(EventId(5)))));
    }

    #[test]
    fn add_scene_rejects_empty_and_unknown_moments() {
        let mut builder = Chapter::builder();
        let err = builder.add_scene(Scene::named("void")).unwrap_err();
        assert!(matches!(err, ChapterError::EmptyScene(ref s) if s == "'void'"));

        let mut scene = Scene::new();
        scene.add_moment(MomentId(2));
        let err = builder.add_scene(scene).unwrap_err();
        assert!(matches!(err, ChapterError::UnknownHandle(Handle::Moment(MomentId(2)))));
    }

    #[test]
    fn seal_without_scenes_fails() {
        let err = Chapter::builder().seal().unwrap_err();
        assert!(matches!(err, ChapterError::NoInitialScene));
    }

    #[test]
    fn initial_scene_defaults_to_first() {
        let mut builder = Chapter::builder();
        let a = one_line_scene(&mut builder, None, "a");
        let b = one_line_scene(&mut builder, Some("b"), "b");
        builder.add_scene(a).unwrap();
        builder.add_scene(b).unwrap();
        let chapter = builder.seal().unwrap();
        assert_eq!(chapter.initial_scene(), SceneId(0));
        assert_eq!(chapter.scene_by_name("b"), Some(SceneId(1)));
        assert_eq!(chapter.lookup(&SceneRef::Id(SceneId(2))), None);
    }

    #[test]
    fn named_initial_scene_resolves_forward() {
        let mut builder = Chapter::builder();
        builder.set_initial_scene("later");
        let a = one_line_scene(&mut builder, None, "a");
        let b = one_line_scene(&mut builder, Some("later"), "b");
        builder.add_scene(a).unwrap();
        builder.add_scene(b).unwrap();
        assert_eq!(builder.seal().unwrap().initial_scene(), SceneId(1));
    }

    #[test]
    fn seal_rejects_unknown_targets() {
        let mut builder = Chapter::builder();
        let mut a = one_line_scene(&mut builder, None, "a");
        a.add_branch(Condition::flag_set("x"), "nowhere");
        builder.add_scene(a).unwrap();
        let err = builder.seal().unwrap_err();
        assert!(matches!(err, ChapterError::UnknownSceneName(ref n) if n == "nowhere"));

        let mut builder = Chapter::builder();
        let mut a = one_line_scene(&mut builder, None, "a");
        a.set_next(Next::Goto(SceneRef::Id(SceneId(9))));
        builder.add_scene(a).unwrap();
        let err = builder.seal().unwrap_err();
        assert!(matches!(err, ChapterError::UnknownHandle(Handle::Scene(SceneId(9)))));
    }

    #[test]
    fn seal_rejects_duplicate_names() {
        let mut builder = Chapter::builder();
        let a = one_line_scene(&mut builder, Some("twin"), "a");
        let b = one_line_scene(&mut builder, Some("twin"), "b");
        builder.add_scene(a).unwrap();
        builder.add_scene(b).unwrap();
        assert!(matches!(
            builder.seal().unwrap_err(),
            ChapterError::DuplicateSceneName(ref n) if n == "twin"
        ));
    }

    #[test]
    fn seal_rejects_unconditional_cycles() {
        let mut builder = Chapter::builder();
        let a = one_line_scene(&mut builder, Some("a"), "a");
        let mut b = one_line_scene(&mut builder, Some("b"), "b");
        b.set_next(Next::Goto("a".into()));
        builder.add_scene(a).unwrap();
        builder.add_scene(b).unwrap();
        assert!(matches!(builder.seal().unwrap_err(), ChapterError::DefaultCycle(_)));
    }

    #[test]
    fn conditional_cycles_are_allowed() {
        let mut builder = Chapter::builder();
        let mut a = one_line_scene(&mut builder, Some("a"), "a");
        a.set_next(Next::End);
        let mut b = one_line_scene(&mut builder, Some("b"), "b");
        b.add_branch(Condition::flag_set("again"), "a");
        builder.add_scene(a).unwrap();
        builder.add_scene(b).unwrap();
        assert!(builder.seal().is_ok());
    }

    #[test]
    fn seal_rejects_defective_events() {
        let mut builder = Chapter::builder();
        let choice = builder.add_event(EventKind::choice("c", "Pick one", &[]));
        let moment = builder.add_moment(Moment::from(vec![choice])).unwrap();
        let mut scene = Scene::new();
        scene.add_moment(moment);
        builder.add_scene(scene).unwrap();
        assert!(matches!(
            builder.seal().unwrap_err(),
            ChapterError::InvalidEvent { event: EventId(0), .. }
        ));
    }

    #[test]
    fn seal_rejects_two_choices_in_one_moment() {
        let mut builder = Chapter::builder();
        let intro = builder.add_dialogue("Character A: Well?");
        let intro_moment = builder.add_moment(Moment::from(vec![intro])).unwrap();
        let first = builder.add_event(EventKind::choice("first", "Draw?", &["yes", "no"]));
        let second = builder.add_event(EventKind::choice("second", "Throw?", &["x", "y"]));
        let both = builder.add_moment(Moment::from(vec![first, second])).unwrap();
        let mut scene = Scene::new();
        scene.add_moment(intro_moment);
        scene.add_moment(both);
        builder.add_scene(scene).unwrap();

        let err = builder.seal().unwrap_err();
        assert!(matches!(err, ChapterError::MultipleChoices(MomentId(1))));
        assert_eq!(err.to_string(), "MomentId(1) holds more than one choice");
    }

    #[test]
    fn choices_in_separate_moments_are_allowed() {
        let mut builder = Chapter::builder();
        let first = builder.add_event(EventKind::choice("first", "Draw?", &["yes", "no"]));
        let second = builder.add_event(EventKind::choice("second", "Throw?", &["x", "y"]));
        let m1 = builder.add_moment(Moment::from(vec![first])).unwrap();
        let m2 = builder.add_moment(Moment::from(vec![second])).unwrap();
        let mut scene = Scene::new();
        scene.add_moment(m1);
        scene.add_moment(m2);
        builder.add_scene(scene).unwrap();
        assert!(builder.seal().is_ok());
    }

    #[test]
    fn cycle_detection() {
        assert_eq!(find_default_cycle(&[Some(1), Some(2), None]), None);
        assert_eq!(find_default_cycle(&[Some(1), Some(0)]), Some(0));
        assert_eq!(find_default_cycle(&[None, Some(2), Some(1)]), Some(1));
        assert_eq!(find_default_cycle(&[Some(0)]), Some(0));
        assert_eq!(find_default_cycle(&[]), None);
    }

    #[test]
    fn parse_ron_chapter() {
        let chapter = Chapter::parse_ron(
            r#"(
                initial: Some("gate"),
                scenes: [
                    (
                        name: Some("gate"),
                        moments: [
                            [Dialogue(text: "Guard: Halt!")],
                            [SetFlag(flag: "halted", value: Bool(true)), Dialogue(text: "You stop.")],
                        ],
                        branches: [(when: FlagSet("halted"), goto: "yard")],
                        next: End,
                    ),
                    (
                        name: Some("yard"),
                        moments: [[Dialogue(text: "The yard is quiet.")]],
                    ),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(chapter.scene_count(), 2);
        assert_eq!(chapter.moment_count(), 3);
        assert_eq!(chapter.events().len(), 4);
        assert_eq!(chapter.initial_scene(), SceneId(0));
        let gate = chapter.scene(SceneId(0)).unwrap();
        assert_eq!(gate.next, Next::End);
        assert_eq!(gate.branches[0].target, SceneRef::Named("yard".to_string()));
        assert_eq!(chapter.scene(SceneId(1)).unwrap().next, Next::Linear);
    }

    #[test]
    fn parse_ron_validates() {
        let err = Chapter::parse_ron(r#"(scenes: [(name: Some("a"), moments: [])])"#).unwrap_err();
        assert!(matches!(err, ChapterError::EmptyScene(_)));

        let err = Chapter::parse_ron(r#"(scenes: [(moments: [[Dialogue(text: "x")]], next: Goto("b"))])"#)
            .unwrap_err();
        assert!(matches!(err, ChapterError::UnknownSceneName(_)));

        assert!(matches!(
            Chapter::parse_ron("(scenes: [").unwrap_err(),
            ChapterError::Ron(_)
        ));
    }
}
