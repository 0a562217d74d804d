/// Play — interactive console player for chapter files.
///
/// Usage: play <chapter.ron> [--seed <n>] [--scene <name>] [--gate-scene-end] [--config <path>]
///
/// Press Enter to advance. When a choice is shown, type the option number.
/// End of input (Ctrl-D) stops the playthrough.

use narrative_sequencer::core::chapter::Chapter;
use narrative_sequencer::core::presenter::{Presenter, Signal, SignalSource};
use narrative_sequencer::core::sequencer::{
    SequencerBuilder, SequencerConfig, SequencerState, TerminationReason,
};
use narrative_sequencer::schema::event::ImageLayer;
use narrative_sequencer::schema::handle::SceneId;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let chapter_path = &args[1];
    let mut seed = None;
    let mut scene_name = None;
    let mut gate_scene_end = false;
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = match args[i].parse::<u64>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        eprintln!("ERROR: --seed expects a number, got '{}'", args[i]);
                        process::exit(1);
                    }
                };
            }
            "--scene" if i + 1 < args.len() => {
                i += 1;
                scene_name = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--gate-scene-end" => gate_scene_end = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let chapter = match Chapter::load_from_ron(Path::new(chapter_path)) {
        Ok(chapter) => Arc::new(chapter),
        Err(e) => {
            eprintln!("ERROR: Failed to load chapter '{}': {}", chapter_path, e);
            process::exit(1);
        }
    };

    // Command-line flags override the config file.
    let mut config = match config_path {
        Some(ref path) => match SequencerConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => SequencerConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.gate_scene_end |= gate_scene_end;

    let start = match scene_name {
        Some(ref name) => match chapter.scene_by_name(name) {
            Some(id) => id,
            None => {
                eprintln!("ERROR: No scene named '{}'", name);
                process::exit(1);
            }
        },
        None => chapter.initial_scene(),
    };

    println!(
        "Loaded {} scenes, {} moments, {} events",
        chapter.scene_count(),
        chapter.moment_count(),
        chapter.events().len()
    );
    println!("Seed: {}", config.seed);
    println!("Press Enter to advance, or type a number to choose.\n");

    let mut sequencer = SequencerBuilder::new(chapter)
        .config(config)
        .build(ConsolePresenter);
    let mut input = StdinSignals::new();

    let mut state = match sequencer.start(start) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let reason = loop {
        if let SequencerState::Terminated(reason) = state {
            break reason;
        }
        let Some(signal) = input.next_signal() else {
            break TerminationReason::InputClosed;
        };
        state = match sequencer.advance(signal) {
            Ok(state) => state,
            Err(e) if !e.is_fatal() => {
                println!("({})", e);
                state
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        };
    };

    match reason {
        TerminationReason::Completed { scene } => {
            println!("\n-- The End ({}) --", sequencer.chapter().scene_label(scene));
            print_summary(sequencer.story().history(), sequencer.chapter());
        }
        TerminationReason::InputClosed => println!("\n-- Stopped --"),
        TerminationReason::Aborted(handle) => {
            eprintln!("ERROR: Playthrough aborted on {}", handle);
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: play <chapter.ron> [--seed <n>] [--scene <name>] [--gate-scene-end] [--config <path>]");
    println!();
    println!("Options:");
    println!("  --seed <n>          Seed for dice rolls (default 0)");
    println!("  --scene <name>      Start at a named scene instead of the initial one");
    println!("  --gate-scene-end    Wait for Enter after the last moment of each scene");
    println!("  --config <path>     Load seed and gating from a RON config file");
}

fn print_summary(history: &[SceneId], chapter: &Chapter) {
    let path: Vec<String> = history.iter().map(|id| chapter.scene_label(*id)).collect();
    println!("Path: {}", path.join(" -> "));
}

/// Prints everything to stdout.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn on_dialogue(&mut self, text: &str) {
        println!("{}", text);
    }

    fn on_image_change(&mut self, layer: &ImageLayer, asset: &str) {
        match layer {
            ImageLayer::Background => println!("  [background: {}]", asset),
            ImageLayer::Character(name) => println!("  [{}: {}]", name, asset),
        }
    }

    fn on_animation(&mut self, name: &str) {
        println!("  [animation: {}]", name);
    }

    fn on_choice(&mut self, prompt: &str, options: &[String]) {
        println!("{}", prompt);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
    }

    fn on_scene(&mut self, scene: SceneId, name: Option<&str>) {
        match name {
            Some(name) => println!("\n== {} ==", name),
            None => println!("\n== scene {} ==", scene.0),
        }
    }
}

/// Reads one line per signal. A number picks an option (1-based on screen).
struct StdinSignals {
    stdin: io::Stdin,
}

impl StdinSignals {
    fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl SignalSource for StdinSignals {
    fn next_signal(&mut self) -> Option<Signal> {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => match line.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(Signal::Choose(n - 1)),
                // 0 is out of range for every choice; let the sequencer reject it.
                Ok(_) => Some(Signal::Choose(usize::MAX)),
                Err(_) => Some(Signal::Advance),
            },
        }
    }
}
