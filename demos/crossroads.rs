/// Crossroads example — a branching chapter loaded from RON, played twice.
///
/// The same chapter is shared by two playthroughs that take different options
/// at the first choice. Each one keeps its own flags and scene history.
///
/// Run with: cargo run --example crossroads

use narrative_sequencer::core::chapter::Chapter;
use narrative_sequencer::core::presenter::{Presentation, RecordingPresenter, ScriptedSignals, Signal};
use narrative_sequencer::core::sequencer::SequencerBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let chapter = Arc::new(
        Chapter::load_from_ron(std::path::Path::new("chapters/crossroads.ron"))
            .expect("Failed to load crossroads chapter"),
    );

    for (option, seed) in [(0, 1993), (1, 1993)] {
        println!("=== Playthrough choosing option {} (seed {}) ===\n", option + 1, seed);

        // Generous advances; anything left over after the end is simply unused.
        let mut signals = ScriptedSignals::new(
            [Signal::Advance, Signal::Advance, Signal::Choose(option)]
                .into_iter()
                .chain(std::iter::repeat(Signal::Advance).take(8)),
        );

        let mut sequencer = SequencerBuilder::new(Arc::clone(&chapter))
            .seed(seed)
            .build(RecordingPresenter::new());
        let reason = sequencer
            .run(chapter.initial_scene(), &mut signals)
            .expect("Playthrough failed");

        for entry in &sequencer.presenter().log {
            match entry {
                Presentation::Scene { name: Some(name), .. } => println!("-- {} --", name),
                Presentation::Scene { scene, .. } => println!("-- scene {} --", scene),
                Presentation::Dialogue { text } => println!("{}", text),
                Presentation::Image { layer, asset } => println!("  [{:?}: {}]", layer, asset),
                Presentation::Animation { name } => println!("  [animation: {}]", name),
                Presentation::Choice { prompt, options } => {
                    println!("{}", prompt);
                    for (i, o) in options.iter().enumerate() {
                        println!("  {}) {}", i + 1, o);
                    }
                }
            }
        }

        let story = sequencer.story();
        println!("\nResult: {:?}", reason);
        println!("Signals used: {}", signals.delivered());
        let mut flags: Vec<_> = story.flags().collect();
        flags.sort_by_key(|(name, _)| *name);
        for (name, value) in flags {
            println!("  {} = {}", name, value);
        }
        println!();
    }
}
