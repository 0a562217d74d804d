/// Sword Fight example — the four-beat confrontation, built in code.
///
/// One scene, four moments. The third moment shows two lines back to back.
/// Every moment waits for Enter, including the last one, before the chapter
/// ends.
///
/// Run with: cargo run --example sword_fight

use narrative_sequencer::core::chapter::Chapter;
use narrative_sequencer::core::presenter::{Presenter, Signal, SignalSource};
use narrative_sequencer::core::sequencer::{SequencerBuilder, TerminationReason};
use narrative_sequencer::schema::scene::{Moment, Scene};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let chapter = Arc::new(build_chapter());
    let start = chapter.initial_scene();

    let mut sequencer = SequencerBuilder::new(chapter)
        .gate_scene_end(true)
        .build(DialogueOnly);

    let reason = sequencer
        .run(start, &mut EnterKey)
        .expect("Playthrough failed");

    match reason {
        TerminationReason::Completed { .. } => println!("\n-- End of chapter --"),
        other => println!("\n-- Stopped: {:?} --", other),
    }
}

fn build_chapter() -> Chapter {
    let mut chapter = Chapter::builder();

    let mut stop = Moment::new();
    stop.add_event(chapter.add_dialogue("Character A: Stop what you're doing!"));

    let mut taunt = Moment::new();
    taunt.add_event(chapter.add_dialogue("Character B: Try and stop me, loser"));

    let mut throw = Moment::new();
    throw.add_event(chapter.add_dialogue("Character A: Fine, You asked for it"));
    throw.add_event(chapter.add_dialogue("- Character A throws sword -"));

    let mut hit = Moment::new();
    hit.add_event(chapter.add_dialogue("Character B: Argh"));

    let mut confrontation = Scene::named("confrontation");
    for moment in [stop, taunt, throw, hit] {
        let id = chapter.add_moment(moment).expect("Moment references unknown event");
        confrontation.add_moment(id);
    }
    chapter
        .add_scene(confrontation)
        .expect("Scene references unknown moment");

    chapter.seal().expect("Failed to seal chapter")
}

struct DialogueOnly;

impl Presenter for DialogueOnly {
    fn on_dialogue(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Every line read from stdin is an advance.
struct EnterKey;

impl SignalSource for EnterKey {
    fn next_signal(&mut self) -> Option<Signal> {
        print!("Press Enter to continue...");
        io::stdout().flush().ok();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(Signal::Advance),
        }
    }
}
