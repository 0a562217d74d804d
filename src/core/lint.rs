/// Authoring checks for sealed chapters — problems that load fine but play badly.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::chapter::Chapter;
use crate::schema::event::EventKind;
use crate::schema::handle::SceneId;
use crate::schema::scene::Next;

/// Warnings for a chapter, in scene order, without duplicates.
///
/// Covers scenes no playthrough can reach, conditions that read flags or
/// choices nothing produces, `Visited` names that match no scene, and
/// conditional self-loops the looping scene cannot break.
pub fn lint_chapter(chapter: &Chapter) -> Vec<String> {
    let mut warnings = Vec::new();

    // 1. Scenes unreachable from the initial scene
    let reachable = reachable_scenes(chapter);
    for (id, scene) in chapter.scenes() {
        if !reachable.contains(&id) {
            warnings.push(format!("scene {} is never reached", scene.label(id)));
        }
    }

    // 2. Flags and choices the chapter can produce
    let mut written: FxHashSet<&str> = FxHashSet::default();
    let mut offered: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
    for (_, event) in chapter.events().iter() {
        if let Some(flag) = event.written_flag() {
            written.insert(flag);
        }
        if let EventKind::Choice { key, options, .. } = event {
            offered
                .entry(key.as_str())
                .or_default()
                .extend(options.iter().map(String::as_str));
        }
    }

    // 3. Conditions that read something nothing produces
    let mut reported: FxHashSet<String> = FxHashSet::default();
    for (id, scene) in chapter.scenes() {
        let label = scene.label(id);
        for branch in &scene.branches {
            let mut report = |message: String| {
                if reported.insert(message.clone()) {
                    warnings.push(format!("scene {}: {}", label, message));
                }
            };
            branch.when.for_each_flag(&mut |flag| {
                if !written.contains(flag) {
                    report(format!("flag '{}' is tested but never set", flag));
                }
            });
            branch.when.for_each_choice(&mut |choice, option| {
                match offered.get(choice) {
                    None => report(format!("choice '{}' is tested but never offered", choice)),
                    Some(options) if !options.contains(option) => report(format!(
                        "choice '{}' never offers option '{}'",
                        choice, option
                    )),
                    Some(_) => {}
                }
            });
            branch.when.for_each_visited(&mut |name| {
                if chapter.scene_by_name(name).is_none() {
                    report(format!("Visited(\"{}\") names no scene", name));
                }
            });
        }
    }

    // 4. Self-loops nothing inside the scene can break
    for id in stuck_self_loops(chapter) {
        warnings.push(format!(
            "scene {} branches back to itself on a condition the scene never changes; \
             once it holds, playback never leaves the scene",
            chapter.scene_label(id)
        ));
    }

    warnings
}

/// Every scene some playthrough could enter, following both branches and
/// default successors.
pub fn reachable_scenes(chapter: &Chapter) -> FxHashSet<SceneId> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![chapter.initial_scene()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(scene) = chapter.scene(id) else {
            continue;
        };
        stack.extend(scene.branches.iter().filter_map(|b| chapter.lookup(&b.target)));
        match &scene.next {
            Next::Linear if id.0 + 1 < chapter.scene_count() => stack.push(SceneId(id.0 + 1)),
            Next::Goto(target) => stack.extend(chapter.lookup(target)),
            Next::Linear | Next::End => {}
        }
    }
    seen
}

/// Scenes with a branch back to themselves whose condition reads no flag the
/// scene writes and no choice the scene offers.
///
/// `Visited` never changes inside such a loop: the scene is entered before its
/// branches are evaluated.
pub fn stuck_self_loops(chapter: &Chapter) -> Vec<SceneId> {
    let mut stuck = Vec::new();
    for (id, scene) in chapter.scenes() {
        let mut written: FxHashSet<&str> = FxHashSet::default();
        let mut offered: FxHashSet<&str> = FxHashSet::default();
        let events = scene
            .moments
            .iter()
            .filter_map(|m| chapter.moment(*m))
            .flat_map(|m| m.events.iter())
            .filter_map(|e| chapter.events().get(*e));
        for event in events {
            if let Some(flag) = event.written_flag() {
                written.insert(flag);
            }
            if let EventKind::Choice { key, .. } = event {
                offered.insert(key.as_str());
            }
        }

        let loops_forever = scene.branches.iter().any(|branch| {
            if chapter.lookup(&branch.target) != Some(id) {
                return false;
            }
            let mut can_change = false;
            branch
                .when
                .for_each_flag(&mut |flag| can_change |= written.contains(flag));
            branch
                .when
                .for_each_choice(&mut |choice, _| can_change |= offered.contains(choice));
            !can_change
        });
        if loops_forever {
            stuck.push(id);
        }
    }
    stuck
}
