//! WASM bindings for narrative-sequencer — drives playthroughs from a web page.
//!
//! Every call that moves the story returns a JSON array of the presentations
//! it produced (scene changes, dialogue, images, animations, choices), so the
//! page only has to render them in order.

use std::sync::Arc;
use wasm_bindgen::prelude::*;

use narrative_sequencer::core::chapter::Chapter;
use narrative_sequencer::core::presenter::{RecordingPresenter, Signal};
use narrative_sequencer::core::sequencer::{
    Sequencer, SequencerBuilder, SequencerState, TerminationReason,
};
use narrative_sequencer::core::state::StoryState;

// ---------------------------------------------------------------------------
// Bundled chapters — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const SWORD_FIGHT: &str = include_str!("../../chapters/sword_fight.ron");
    pub const CROSSROADS: &str = include_str!("../../chapters/crossroads.ron");

    pub const ALL: &[(&str, &str)] = &[("sword_fight", SWORD_FIGHT), ("crossroads", CROSSROADS)];
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ChoiceInfo<'a> {
    key: &'a str,
    prompt: &'a str,
    options: &'a [String],
}

#[derive(serde::Serialize)]
struct Status<'a> {
    state: &'static str,
    scene: Option<String>,
    moment: Option<usize>,
    ending: Option<String>,
    choice: Option<ChoiceInfo<'a>>,
    story: &'a StoryState,
}

// ---------------------------------------------------------------------------
// Playthrough — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct Playthrough {
    sequencer: Sequencer<RecordingPresenter>,
}

#[wasm_bindgen]
impl Playthrough {
    /// Create a playthrough of a chapter given as RON source.
    #[wasm_bindgen(constructor)]
    pub fn new(chapter_ron: &str, seed: u64) -> Result<Playthrough, JsError> {
        let chapter = Chapter::parse_ron(chapter_ron)
            .map_err(|e| JsError::new(&format!("Chapter error: {e}")))?;
        Ok(Self::from_chapter(chapter, seed))
    }

    /// Create a playthrough of one of the chapters compiled into the module.
    pub fn bundled(name: &str, seed: u64) -> Result<Playthrough, JsError> {
        let (_, source) = data::ALL
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| JsError::new(&format!("Unknown chapter: {name}")))?;
        Self::new(source, seed)
    }

    /// JSON array of bundled chapter names.
    pub fn available_chapters() -> String {
        let names: Vec<&str> = data::ALL.iter().map(|(n, _)| *n).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    /// Enter the chapter's initial scene.
    pub fn start(&mut self) -> Result<String, JsError> {
        self.sequencer.start_initial().map_err(to_js)?;
        self.drain()
    }

    /// Deliver a plain advance.
    pub fn advance(&mut self) -> Result<String, JsError> {
        self.sequencer.advance(Signal::Advance).map_err(to_js)?;
        self.drain()
    }

    /// Pick an option of the pending choice by zero-based index.
    pub fn choose(&mut self, index: usize) -> Result<String, JsError> {
        self.sequencer.advance(Signal::Choose(index)).map_err(to_js)?;
        self.drain()
    }

    pub fn is_finished(&self) -> bool {
        self.sequencer.state().is_terminated()
    }

    /// JSON snapshot of where the playthrough stands.
    pub fn status(&self) -> Result<String, JsError> {
        let chapter = self.sequencer.chapter();
        let (state, scene, moment, ending) = match self.sequencer.state() {
            SequencerState::Idle => ("idle", None, None, None),
            SequencerState::AwaitingInput { scene, moment } => {
                ("awaiting_input", Some(chapter.scene_label(scene)), Some(moment), None)
            }
            SequencerState::ExecutingMoment { scene, moment } => {
                ("executing", Some(chapter.scene_label(scene)), Some(moment), None)
            }
            SequencerState::ResolvingBranch { scene } => {
                ("resolving", Some(chapter.scene_label(scene)), None, None)
            }
            SequencerState::Terminated(reason) => {
                let ending = match reason {
                    TerminationReason::Completed { scene } => {
                        format!("completed at {}", chapter.scene_label(scene))
                    }
                    TerminationReason::InputClosed => "input closed".to_string(),
                    TerminationReason::Aborted(handle) => format!("aborted on {handle}"),
                };
                ("terminated", None, None, Some(ending))
            }
        };

        let status = Status {
            state,
            scene,
            moment,
            ending,
            choice: self.sequencer.pending_choice().map(|c| ChoiceInfo {
                key: &c.key,
                prompt: &c.prompt,
                options: &c.options,
            }),
            story: self.sequencer.story(),
        };
        serde_json::to_string(&status).map_err(|e| JsError::new(&format!("JSON error: {e}")))
    }
}

// Private helpers
impl Playthrough {
    fn from_chapter(chapter: Chapter, seed: u64) -> Playthrough {
        let sequencer = SequencerBuilder::new(Arc::new(chapter))
            .seed(seed)
            .build(RecordingPresenter::new());
        Playthrough { sequencer }
    }

    fn drain(&mut self) -> Result<String, JsError> {
        let output = self.sequencer.presenter_mut().drain();
        serde_json::to_string(&output).map_err(|e| JsError::new(&format!("JSON error: {e}")))
    }
}

fn to_js(e: narrative_sequencer::SequencerError) -> JsError {
    JsError::new(&e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_chapters_parse() {
        for (name, source) in data::ALL {
            assert!(Chapter::parse_ron(source).is_ok(), "{name} failed to parse");
        }
    }

    fn json(result: Result<String, JsError>) -> serde_json::Value {
        let Ok(text) = result else {
            panic!("call returned an error");
        };
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn walk_away_playthrough_over_json() {
        let mut play = Playthrough::from_chapter(Chapter::parse_ron(data::CROSSROADS).unwrap(), 3);
        let first = json(play.start());
        assert_eq!(first[0]["kind"], "scene");
        assert_eq!(first[0]["name"], "confrontation");

        json(play.advance());
        let prompt = json(play.advance());
        assert_eq!(prompt[0]["kind"], "choice");
        assert_eq!(prompt[0]["options"][1], "Walk away");

        json(play.choose(1));
        assert!(play.is_finished());
        let status = json(play.status());
        assert_eq!(status["state"], "terminated");
        assert_eq!(status["ending"], "completed at 'aftermath'");
        assert_eq!(status["story"]["flags"]["regret"]["Int"], 1);
    }
}
