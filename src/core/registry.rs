/// Event registry — owns every event of a chapter and executes them by handle.

use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::presenter::Presenter;
use crate::core::state::StoryState;
use crate::schema::condition::FlagValue;
use crate::schema::event::EventKind;
use crate::schema::handle::{EventId, Handle};

/// A handle that does not resolve inside its chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown {0}")]
pub struct UnknownHandle(pub Handle);

/// A choice waiting for the player's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChoice {
    pub key: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// What the sequencer has to do after an event ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Done,
    AwaitChoice(PendingChoice),
}

/// Everything an event may touch while it runs.
pub struct ExecutionContext<'a> {
    pub state: &'a mut StoryState,
    pub presenter: &'a mut dyn Presenter,
    pub rng: &'a mut StdRng,
}

/// Handle-indexed arena of events. Handles are dense and never reused.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: Vec<EventKind>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn register(&mut self, kind: EventKind) -> EventId {
        self.events.push(kind);
        EventId(self.events.len() - 1)
    }

    pub fn get(&self, id: EventId) -> Option<&EventKind> {
        self.events.get(id.0)
    }

    pub fn contains(&self, id: EventId) -> bool {
        id.0 < self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventId, &EventKind)> {
        self.events.iter().enumerate().map(|(i, e)| (EventId(i), e))
    }

    /// Run one event against the playthrough's state and presenter.
    pub fn execute(
        &self,
        id: EventId,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Effect, UnknownHandle> {
        let event = self.get(id).ok_or(UnknownHandle(Handle::Event(id)))?;
        debug!(event = id.0, kind = event.name(), "executing event");

        match event {
            EventKind::Dialogue { text } => ctx.presenter.on_dialogue(text),
            EventKind::SetImage { layer, asset } => ctx.presenter.on_image_change(layer, asset),
            EventKind::PlayAnimation { name } => ctx.presenter.on_animation(name),
            EventKind::SetFlag { flag, value } => {
                ctx.state.set_flag(flag, value.clone());
            }
            EventKind::Increment { flag, by } => {
                let current = match ctx.state.flag(flag) {
                    None => 0,
                    Some(FlagValue::Int(n)) => *n,
                    Some(other) => {
                        warn!(flag = %flag, value = %other, "incrementing a non-integer flag, treating it as 0");
                        0
                    }
                };
                ctx.state
                    .set_flag(flag, FlagValue::Int(current.saturating_add(*by)));
            }
            EventKind::Roll { flag, sides } => {
                let rolled = ctx.rng.gen_range(1..=(*sides).max(1));
                debug!(flag = %flag, rolled, "rolled");
                ctx.state.set_flag(flag, FlagValue::Int(i64::from(rolled)));
            }
            EventKind::Choice {
                key,
                prompt,
                options,
            } => {
                ctx.presenter.on_choice(prompt, options);
                return Ok(Effect::AwaitChoice(PendingChoice {
                    key: key.clone(),
                    prompt: prompt.clone(),
                    options: options.clone(),
                }));
            }
        }

        Ok(Effect::Done)
    }
}
