/// The sequencer — walks scenes, moments and events, gating on advance signals.
///
/// States: `Idle → ExecutingMoment → (AwaitingInput | ResolvingBranch) → ... →
/// Terminated`. `ExecutingMoment` and `ResolvingBranch` are transient: every
/// public call returns with the sequencer `Idle`, `AwaitingInput` or `Terminated`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::chapter::Chapter;
use crate::core::presenter::{Presenter, Signal, SignalSource};
use crate::core::registry::{Effect, ExecutionContext, PendingChoice, UnknownHandle};
use crate::core::resolver::{BranchResolver, Resolution};
use crate::core::state::StoryState;
use crate::schema::handle::{Handle, SceneId};

#[derive(Debug, Error)]
pub enum SequencerError {
    /// Referential integrity failure. Fatal: the playthrough is aborted.
    #[error(transparent)]
    UnknownHandle(#[from] UnknownHandle),
    #[error("the sequencer has not been started")]
    NotStarted,
    #[error("the sequencer has already been started")]
    AlreadyStarted,
    #[error("choice '{0}' is waiting for a selection")]
    ChoiceRequired(String),
    #[error("option {index} is out of range for choice '{key}' ({options} options)")]
    InvalidChoice {
        key: String,
        index: usize,
        options: usize,
    },
    #[error("no choice is pending")]
    UnexpectedChoice,
}

impl SequencerError {
    /// Whether the error ended the playthrough.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownHandle(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Per-playthrough settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Seed for `Roll` events.
    pub seed: u64,
    /// Also wait for an advance after the last moment of each scene, before
    /// the branch is resolved.
    pub gate_scene_end: bool,
}

impl SequencerConfig {
    pub fn load_from_ron(path: &Path) -> Result<SequencerConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<SequencerConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}

/// Why a playthrough stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The branch resolver found no successor after `scene`.
    Completed { scene: SceneId },
    /// The signal source ran dry while input was awaited.
    InputClosed,
    /// A handle failed to resolve; the error was returned to the caller.
    Aborted(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    ExecutingMoment { scene: SceneId, moment: usize },
    AwaitingInput { scene: SceneId, moment: usize },
    ResolvingBranch { scene: SceneId },
    Terminated(TerminationReason),
}

impl SequencerState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Drives one playthrough of a shared chapter.
pub struct Sequencer<P> {
    chapter: Arc<Chapter>,
    presenter: P,
    config: SequencerConfig,
    resolver: BranchResolver,
    story: StoryState,
    rng: StdRng,
    state: SequencerState,
    pending_choice: Option<PendingChoice>,
}

/// Builder for constructing a `Sequencer`.
pub struct SequencerBuilder {
    chapter: Arc<Chapter>,
    config: SequencerConfig,
}

impl SequencerBuilder {
    pub fn new(chapter: Arc<Chapter>) -> Self {
        Self {
            chapter,
            config: SequencerConfig::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn gate_scene_end(mut self, gate: bool) -> Self {
        self.config.gate_scene_end = gate;
        self
    }

    pub fn config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build<P: Presenter>(self, presenter: P) -> Sequencer<P> {
        Sequencer {
            rng: StdRng::seed_from_u64(self.config.seed),
            chapter: self.chapter,
            presenter,
            config: self.config,
            resolver: BranchResolver,
            story: StoryState::new(),
            state: SequencerState::Idle,
            pending_choice: None,
        }
    }
}

impl<P: Presenter> Sequencer<P> {
    pub fn new(chapter: Arc<Chapter>, presenter: P) -> Self {
        SequencerBuilder::new(chapter).build(presenter)
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn story(&self) -> &StoryState {
        &self.story
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// The choice the sequencer is waiting on, if any.
    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        self.pending_choice.as_ref()
    }

    pub fn into_parts(self) -> (P, StoryState) {
        (self.presenter, self.story)
    }

    /// Enter `scene` and run until input is needed or the playthrough ends.
    pub fn start(&mut self, scene: SceneId) -> Result<SequencerState, SequencerError> {
        if self.state != SequencerState::Idle {
            return Err(SequencerError::AlreadyStarted);
        }
        info!(scene = %self.chapter.scene_label(scene), seed = self.config.seed, "playthrough started");
        self.step(|seq| seq.enter_scene(scene))
    }

    /// Start at the chapter's initial scene.
    pub fn start_initial(&mut self) -> Result<SequencerState, SequencerError> {
        let initial = self.chapter.initial_scene();
        self.start(initial)
    }

    /// Deliver an advance signal.
    ///
    /// Once terminated the signal is ignored and the terminal state returned.
    /// Signal misuse (a plain advance while a choice is pending, an option out of
    /// range, a selection with nothing to choose) is rejected without changing state.
    pub fn advance(&mut self, signal: Signal) -> Result<SequencerState, SequencerError> {
        let (scene, moment) = match self.state {
            SequencerState::Idle => return Err(SequencerError::NotStarted),
            SequencerState::Terminated(_) => {
                debug!(?signal, "ignoring signal after termination");
                return Ok(self.state);
            }
            SequencerState::AwaitingInput { scene, moment } => (scene, moment),
            SequencerState::ExecutingMoment { .. } | SequencerState::ResolvingBranch { .. } => {
                return self.step(|_| Ok(()));
            }
        };

        match (signal, self.pending_choice.take()) {
            (Signal::Advance, None) => {}
            (Signal::Choose(index), Some(choice)) => {
                let Some(label) = choice.options.get(index) else {
                    let err = SequencerError::InvalidChoice {
                        key: choice.key.clone(),
                        index,
                        options: choice.options.len(),
                    };
                    self.pending_choice = Some(choice);
                    return Err(err);
                };
                debug!(choice = %choice.key, index, option = %label, "choice made");
                self.story.record_choice(&choice.key, index, label);
            }
            (Signal::Advance, Some(choice)) => {
                let key = choice.key.clone();
                self.pending_choice = Some(choice);
                return Err(SequencerError::ChoiceRequired(key));
            }
            (Signal::Choose(_), None) => return Err(SequencerError::UnexpectedChoice),
        }

        self.state = self.after_moment(scene, moment);
        debug!(state = ?self.state, "advanced");
        self.step(|_| Ok(()))
    }

    /// Block on `signals` until the playthrough ends.
    ///
    /// Rejected signals (see [`Sequencer::advance`]) are logged and skipped.
    pub fn run(
        &mut self,
        scene: SceneId,
        signals: &mut dyn SignalSource,
    ) -> Result<TerminationReason, SequencerError> {
        let mut state = self.start(scene)?;
        loop {
            if let SequencerState::Terminated(reason) = state {
                return Ok(reason);
            }
            let Some(signal) = signals.next_signal() else {
                info!("input closed");
                self.state = SequencerState::Terminated(TerminationReason::InputClosed);
                return Ok(TerminationReason::InputClosed);
            };
            state = match self.advance(signal) {
                Ok(state) => state,
                Err(e) if !e.is_fatal() => {
                    debug!(error = %e, "signal rejected");
                    self.state
                }
                Err(e) => return Err(e),
            };
        }
    }

    /// Apply `enter` then drive transient states; abort on a fatal error.
    fn step(
        &mut self,
        enter: impl FnOnce(&mut Self) -> Result<(), SequencerError>,
    ) -> Result<SequencerState, SequencerError> {
        let result = enter(&mut *self).and_then(|()| self.drive());
        match result {
            Ok(()) => Ok(self.state),
            Err(SequencerError::UnknownHandle(UnknownHandle(handle))) => {
                error!(%handle, "playthrough aborted");
                self.pending_choice = None;
                self.state = SequencerState::Terminated(TerminationReason::Aborted(handle));
                Err(UnknownHandle(handle).into())
            }
            Err(e) => Err(e),
        }
    }

    fn enter_scene(&mut self, scene: SceneId) -> Result<(), SequencerError> {
        let name = self
            .chapter
            .scene(scene)
            .ok_or(UnknownHandle(Handle::Scene(scene)))?
            .name
            .as_deref();
        debug!(scene = scene.0, name, "entering scene");
        self.presenter.on_scene(scene, name);
        self.story.enter_scene(scene);
        self.state = SequencerState::ExecutingMoment { scene, moment: 0 };
        Ok(())
    }

    /// Run transient states until the sequencer blocks or terminates.
    fn drive(&mut self) -> Result<(), SequencerError> {
        loop {
            match self.state {
                SequencerState::ExecutingMoment { scene, moment } => {
                    self.execute_moment(scene, moment)?;
                    self.state = if self.pending_choice.is_some()
                        || self.config.gate_scene_end
                        || moment + 1 < self.scene_len(scene)?
                    {
                        SequencerState::AwaitingInput { scene, moment }
                    } else {
                        SequencerState::ResolvingBranch { scene }
                    };
                }
                SequencerState::ResolvingBranch { scene } => {
                    match self.resolver.resolve(&self.chapter, scene, &self.story)? {
                        Resolution::Next { scene: next, edge } => {
                            debug!(from = scene.0, to = next.0, ?edge, "scene resolved");
                            self.enter_scene(next)?;
                        }
                        Resolution::Terminal => {
                            info!(scene = %self.chapter.scene_label(scene), "playthrough completed");
                            self.state =
                                SequencerState::Terminated(TerminationReason::Completed { scene });
                        }
                    }
                }
                SequencerState::Idle
                | SequencerState::AwaitingInput { .. }
                | SequencerState::Terminated(_) => return Ok(()),
            }
        }
    }

    fn execute_moment(&mut self, scene: SceneId, index: usize) -> Result<(), SequencerError> {
        let moment_id = *self
            .chapter
            .scene(scene)
            .ok_or(UnknownHandle(Handle::Scene(scene)))?
            .moments
            .get(index)
            .ok_or(UnknownHandle(Handle::Scene(scene)))?;
        let moment = self
            .chapter
            .moment(moment_id)
            .ok_or(UnknownHandle(Handle::Moment(moment_id)))?;
        debug!(scene = scene.0, moment = moment_id.0, events = moment.events.len(), "executing moment");

        let mut ctx = ExecutionContext {
            state: &mut self.story,
            presenter: &mut self.presenter,
            rng: &mut self.rng,
        };
        for &event in &moment.events {
            if let Effect::AwaitChoice(choice) = self.chapter.events().execute(event, &mut ctx)? {
                self.pending_choice = Some(choice);
            }
        }
        Ok(())
    }

    fn scene_len(&self, scene: SceneId) -> Result<usize, UnknownHandle> {
        self.chapter
            .scene(scene)
            .map(|s| s.moments.len())
            .ok_or(UnknownHandle(Handle::Scene(scene)))
    }

    fn after_moment(&self, scene: SceneId, moment: usize) -> SequencerState {
        match self.scene_len(scene) {
            Ok(len) if moment + 1 < len => SequencerState::ExecutingMoment {
                scene,
                moment: moment + 1,
            },
            _ => SequencerState::ResolvingBranch { scene },
        }
    }
}

/// Play a chapter from `initial_scene` to the end, blocking on `signals`.
pub fn run_chapter<P: Presenter>(
    chapter: Arc<Chapter>,
    initial_scene: SceneId,
    presenter: P,
    signals: &mut dyn SignalSource,
) -> Result<TerminationReason, SequencerError> {
    Sequencer::new(chapter, presenter).run(initial_scene, signals)
}
