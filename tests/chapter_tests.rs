/// Chapter loading and seal-time validation integration tests.

use narrative_sequencer::core::chapter::{Chapter, ChapterError};
use narrative_sequencer::core::sequencer::SequencerConfig;
use narrative_sequencer::schema::event::EventKind;
use narrative_sequencer::schema::handle::{EventId, Handle, MomentId, SceneId};
use narrative_sequencer::schema::scene::{Moment, Scene};
use std::path::Path;

fn load(path: &str) -> Result<Chapter, ChapterError> {
    Chapter::load_from_ron(Path::new(path))
}

#[test]
fn bundled_chapters_load() {
    let sword = load("chapters/sword_fight.ron").unwrap();
    assert_eq!(sword.scene_count(), 1);
    assert_eq!(sword.moment_count(), 4);
    assert_eq!(sword.events().len(), 5);

    let crossroads = load("chapters/crossroads.ron").unwrap();
    assert_eq!(crossroads.initial_scene(), SceneId(0));
    assert_eq!(crossroads.scene_by_name("victory"), Some(SceneId(6)));
    assert_eq!(crossroads.scene_label(SceneId(4)), "'retreat'");
}

#[test]
fn dangling_goto_is_rejected() {
    let err = load("tests/fixtures/dangling_goto.ron").unwrap_err();
    assert!(matches!(err, ChapterError::UnknownSceneName(ref name) if name == "missing"));
}

#[test]
fn unconditional_loop_is_rejected() {
    let err = load("tests/fixtures/default_loop.ron").unwrap_err();
    assert!(matches!(err, ChapterError::DefaultCycle(_)), "got {err}");
}

#[test]
fn empty_scene_is_rejected() {
    let err = load("tests/fixtures/empty_scene.ron").unwrap_err();
    assert!(matches!(err, ChapterError::EmptyScene(_)), "got {err}");
}

#[test]
fn chapter_without_scenes_is_rejected() {
    let err = load("tests/fixtures/no_scenes.ron").unwrap_err();
    assert!(matches!(err, ChapterError::NoInitialScene));
}

#[test]
fn conditional_self_loop_is_accepted() {
    let chapter = load("tests/fixtures/loop_until_ready.ron").unwrap();
    assert_eq!(chapter.scene_count(), 2);
}

#[test]
fn missing_file_is_io_error() {
    let err = load("tests/fixtures/does_not_exist.ron").unwrap_err();
    assert!(matches!(err, ChapterError::Io(_)));
}

#[test]
fn malformed_ron_is_reported() {
    let err = Chapter::parse_ron("(scenes: [(moments: [[Shout(text: \"hi\")]])])").unwrap_err();
    assert!(matches!(err, ChapterError::Ron(_)));
}

#[test]
fn moments_must_reference_registered_events() {
    let mut builder = Chapter::builder();
    let line = builder.add_dialogue("Character A: Stop what you're doing!");
    let err = builder
        .add_moment(Moment::from(vec![line, EventId(9)]))
        .unwrap_err();
    assert!(matches!(err, ChapterError::UnknownHandle(Handle::Event(EventId(9)))));

    let mut scene = Scene::new();
    scene.add_moment(MomentId(0));
    assert!(matches!(
        builder.add_scene(scene),
        Err(ChapterError::UnknownHandle(Handle::Moment(MomentId(0))))
    ));
}

#[test]
fn invalid_events_fail_at_seal() {
    let mut builder = Chapter::builder();
    let roll = builder.add_event(EventKind::Roll {
        flag: "d0".to_string(),
        sides: 0,
    });
    let moment = builder.add_moment(Moment::from(vec![roll])).unwrap();
    let mut scene = Scene::new();
    scene.add_moment(moment);
    builder.add_scene(scene).unwrap();
    assert!(matches!(
        builder.seal(),
        Err(ChapterError::InvalidEvent { event: EventId(0), .. })
    ));
}

#[test]
fn play_config_loads() {
    let config = SequencerConfig::load_from_ron(Path::new("tests/fixtures/play_config.ron")).unwrap();
    assert_eq!(config.seed, 2026);
    assert!(config.gate_scene_end);
}
