/// Chapter Linter — validates chapter files and reports authoring problems.
///
/// Usage: chapter_linter <chapter.ron | chapter_dir>
///
/// Errors are chapters that fail to load or seal. Warnings come from
/// `core::lint`: unreachable scenes, conditions on flags or choices nothing
/// produces, and self-loops their scene can never break.

use narrative_sequencer::core::chapter::Chapter;
use narrative_sequencer::core::lint::lint_chapter;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: chapter_linter <chapter.ron | chapter_dir>");
        process::exit(0);
    }

    let root = Path::new(&args[1]);
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
    } else if root.is_dir() {
        collect_chapters(root, &mut files);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }
    files.sort();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for path in &files {
        match Chapter::load_from_ron(path) {
            Ok(chapter) => {
                println!(
                    "  Loaded: {} ({} scenes, {} events)",
                    path.display(),
                    chapter.scene_count(),
                    chapter.events().len()
                );
                for warning in lint_chapter(&chapter) {
                    warnings.push(format!("{}: {}", path.display(), warning));
                }
            }
            Err(e) => errors.push(format!("{}: {}", path.display(), e)),
        }
    }

    println!("\n=== Chapter Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn collect_chapters(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_chapters(&path, out);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                out.push(path);
            }
        }
    }
}
