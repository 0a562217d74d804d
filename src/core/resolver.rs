/// Branch resolver — picks the scene that follows the one just finished.

use tracing::debug;

use crate::core::chapter::Chapter;
use crate::core::registry::UnknownHandle;
use crate::core::state::StoryState;
use crate::schema::condition::Condition;
use crate::schema::handle::{Handle, SceneId};
use crate::schema::scene::{Next, SceneRef};

/// Which kind of edge a resolution followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The n-th conditional branch of the scene matched.
    Branch(usize),
    /// No branch matched; the unconditional successor was taken.
    Default,
}

/// Outcome of resolving a scene boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Next { scene: SceneId, edge: Edge },
    Terminal,
}

/// Stateless resolver over a sealed chapter.
///
/// Branches are evaluated in declaration order and the first match wins.
/// Without a match the scene's `Next` applies: `Linear` moves to the following
/// scene in authoring order, `Goto` jumps, and `End` (or `Linear` on the last
/// scene) yields `Terminal`. Sealing guarantees unconditional successors never
/// form a loop, so a chain of default edges always reaches `Terminal` or a
/// conditional branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchResolver;

impl BranchResolver {
    pub fn resolve(
        &self,
        chapter: &Chapter,
        current: SceneId,
        state: &StoryState,
    ) -> Result<Resolution, UnknownHandle> {
        let scene = chapter
            .scene(current)
            .ok_or(UnknownHandle(Handle::Scene(current)))?;

        for (i, branch) in scene.branches.iter().enumerate() {
            if evaluate(&branch.when, chapter, state) {
                let target = lookup(chapter, &branch.target, current)?;
                debug!(from = current.0, to = target.0, branch = i, "conditional branch taken");
                return Ok(Resolution::Next {
                    scene: target,
                    edge: Edge::Branch(i),
                });
            }
        }

        let next = match &scene.next {
            Next::Linear => Some(SceneId(current.0 + 1)).filter(|n| n.0 < chapter.scene_count()),
            Next::Goto(target) => Some(lookup(chapter, target, current)?),
            Next::End => None,
        };

        Ok(match next {
            Some(scene) => {
                debug!(from = current.0, to = scene.0, "default successor taken");
                Resolution::Next {
                    scene,
                    edge: Edge::Default,
                }
            }
            None => Resolution::Terminal,
        })
    }
}

fn lookup(chapter: &Chapter, target: &SceneRef, from: SceneId) -> Result<SceneId, UnknownHandle> {
    chapter.lookup(target).ok_or(match target {
        SceneRef::Id(id) => UnknownHandle(Handle::Scene(*id)),
        // A name that never resolved can only be reported against its source scene.
        SceneRef::Named(_) => UnknownHandle(Handle::Scene(from)),
    })
}

/// Evaluate a condition against the current story state.
pub fn evaluate(condition: &Condition, chapter: &Chapter, state: &StoryState) -> bool {
    match condition {
        Condition::FlagEquals { flag, value } => state.flag(flag) == Some(value),
        Condition::FlagSet(flag) => state.is_set(flag),
        Condition::FlagAtLeast { flag, value } => state
            .flag(flag)
            .and_then(|v| v.as_int())
            .is_some_and(|n| n >= *value),
        Condition::Chose { choice, option } => state
            .last_choice(choice)
            .is_some_and(|record| record.label == *option),
        Condition::Visited(name) => chapter
            .scene_by_name(name)
            .is_some_and(|id| state.has_visited(id)),
        Condition::All(conds) => conds.iter().all(|c| evaluate(c, chapter, state)),
        Condition::Any(conds) => conds.iter().any(|c| evaluate(c, chapter, state)),
        Condition::Not(inner) => !evaluate(inner, chapter, state),
    }
}
