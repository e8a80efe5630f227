// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! End-to-end command scenarios over real on-disk stores.

use std::path::Path;
use std::sync::Arc;

use vigil_commands::{CommandOutcome, CommandRequest, GodCommandService};
use vigil_store::WorldStore;
use vigil_world::projection::project;
use vigil_world::{bounds, FixedClock};

const T0: i64 = 1_700_000_000_000;

fn service_at(path: &Path) -> GodCommandService {
    let clock = Arc::new(FixedClock::at_millis(T0));
    let store = Arc::new(WorldStore::open_with_clock(path, clock.clone()));
    GodCommandService::new(store).with_clock(clock)
}

fn run(service: &GodCommandService, op: &str, command: &str) -> CommandOutcome {
    service
        .apply(&CommandRequest {
            agents: Vec::new(),
            command: command.to_owned(),
            operation_id: op.to_owned(),
        })
        .unwrap_or_else(|err| panic!("command `{command}` errored: {err}"))
}

fn applied(service: &GodCommandService, op: &str, command: &str) {
    let outcome = run(service, op, command);
    assert!(
        outcome.applied,
        "command `{command}` refused: {:?}",
        outcome.output_lines
    );
}

/// Drive the full seeded scenario against one store; returns the commands
/// executed (op id, command text) for replay checks.
fn seeded_scenario(service: &GodCommandService) -> Vec<(String, String)> {
    let mut script: Vec<(String, String)> = Vec::new();
    let mut push = |op: &str, cmd: String| script.push((op.to_owned(), cmd));

    push("op01", "mark add alpha_hall 0 64 0 town:alpha".to_owned());
    push("op02", "market add bazaar alpha_hall".to_owned());
    push("op03", "mint Mara 25".to_owned());
    push("op04", "mint Eli 25".to_owned());
    push("op05", "offer add bazaar Mara sell 2 5".to_owned());
    push("op06", "trade bazaar of0001 Eli 1".to_owned());
    push("op07", "event seed 777".to_owned());
    push("op08", "event draw alpha".to_owned());
    for (op, cmd) in &script {
        applied(service, op, cmd);
    }

    // `decision show` then choose the first option of the posed dilemma.
    let snapshot = service.store().snapshot();
    let decision = snapshot.world.decisions.first().cloned().unwrap();
    let show = run(service, "op09", &format!("decision show {}", decision.id));
    assert!(!show.applied, "show is read-only");
    assert!(!show.output_lines.is_empty());
    let first_key = decision.options.first().cloned().unwrap().key;

    let tail_start = script.len();
    let mut push = |op: &str, cmd: String| script.push((op.to_owned(), cmd));
    push("op10", format!("decision choose {} {first_key}", decision.id));
    push("op11", "rumor spawn alpha supernatural 2 mist_shapes 2".to_owned());
    push("op12", "rumor quest r0001".to_owned());
    for (op, cmd) in &script[tail_start..] {
        applied(service, op, cmd);
    }

    let snapshot = service.store().snapshot();
    let side_quest = snapshot
        .world
        .quests
        .iter()
        .find(|q| q.rumor_id.as_deref() == Some("r0001"))
        .cloned()
        .unwrap();

    let tail_start = script.len();
    let mut push = |op: &str, cmd: String| script.push((op.to_owned(), cmd));
    push("op13", format!("quest accept Mara {}", side_quest.id));
    push("op14", format!("quest visit {}", side_quest.id));
    for (op, cmd) in &script[tail_start..] {
        applied(service, op, cmd);
    }
    script
}

#[test]
fn two_isolated_stores_agree_bit_for_bit() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = service_at(&dir_a.path().join("memory.json"));
    let b = service_at(&dir_b.path().join("memory.json"));

    let script = seeded_scenario(&a);
    seeded_scenario(&b);

    let world_a = a.store().snapshot();
    let world_b = b.store().snapshot();
    assert_eq!(project(&world_a).hash, project(&world_b).hash);

    // Authoritative facts line up.
    assert_eq!(world_a.world.economy.ledger["Eli"], 20);
    assert_eq!(world_a.world.economy.ledger["Mara"], 38); // 25 + 5 trade + 8 reward
    let offer = &world_a.world.markets[0].offers[0];
    assert_eq!(offer.amount, 1);
    assert!(offer.active);
    assert!(world_a.world.rumors[0].resolved);
    assert!(a.store().validate_memory_integrity().ok());

    // Every replay with the same operation id is refused and changes nothing.
    let before = project(&a.store().snapshot()).hash;
    for (op, cmd) in &script {
        let outcome = run(&a, op, cmd);
        assert!(!outcome.applied, "replay of `{cmd}` applied twice");
    }
    assert_eq!(project(&a.store().snapshot()).hash, before);
}

#[test]
fn feed_caps_drop_oldest_under_pressure() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));

    for i in 0..265 {
        applied(
            &service,
            &format!("cap-op-{i}"),
            &format!("mark add cap_{i} {i} 64 0"),
        );
    }
    let world = service.store().snapshot().world;
    assert_eq!(world.chronicle.len(), bounds::MAX_CHRONICLE);
    assert_eq!(world.news.len(), bounds::MAX_NEWS);
    assert!(!world.chronicle.iter().any(|c| c.msg.starts_with("marker cap_0 ")));
    assert!(world.chronicle.iter().any(|c| c.msg.starts_with("marker cap_264 ")));
    assert!(world.news.iter().any(|n| n.msg.ends_with(": cap_264")));
    assert!(!world.news.iter().any(|n| n.msg.ends_with(": cap_0")));
    assert!(service.store().validate_memory_integrity().ok());
}

#[test]
fn validation_failures_leave_the_snapshot_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));
    applied(&service, "op1", "mint Mara 10");
    let before = project(&service.store().snapshot()).hash;

    for (op, cmd) in [
        ("bad1", "transfer Mara Eli 99"),
        ("bad2", "trade nowhere of0001 Mara 1"),
        ("bad3", "event draw nowhere"),
        ("bad4", "job set Mara necromancer"),
        ("bad5", "mint Mara 2.5"),
        ("bad6", "smite Mara"),
    ] {
        let outcome = run(&service, op, cmd);
        assert!(!outcome.applied, "`{cmd}` must not apply");
        assert!(!outcome.output_lines.is_empty(), "`{cmd}` needs a diagnostic");
    }
    assert_eq!(project(&service.store().snapshot()).hash, before);
}

#[test]
fn non_finite_coordinates_are_hard_errors() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));
    let err = service
        .apply(&CommandRequest {
            agents: Vec::new(),
            command: "mark add pit inf 0 0".to_owned(),
            operation_id: "op1".to_owned(),
        })
        .unwrap_err();
    assert!(err.to_string().contains("[INVALID_INPUT]"));
}

#[test]
fn night_boundary_draws_exactly_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));
    applied(&service, "op1", "mark add hall 0 64 0 town:alpha");
    applied(&service, "op2", "event seed 9");

    let before = service.store().snapshot().world.events.index;
    applied(&service, "op3", "clock advance 1");
    let world = service.store().snapshot().world;
    assert_eq!(world.events.index, before + 1);
    assert_eq!(world.clock.day, 2);
}

#[test]
fn admin_families_apply_and_replay_safely() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));

    let script = [
        ("adm1", "mark add hall 0 64 0 town:alpha"),
        ("adm2", "rule lethal on"),
        ("adm3", "war start"),
        ("adm4", "clock season long_night"),
        ("adm5", "threat set alpha 80"),
        ("adm6", "mood set alpha fear 75"),
        ("adm7", "town region alpha northmarch"),
        ("adm8", "agent trust Mara 3"),
        ("adm9", "player kill"),
    ];
    for (op, cmd) in script {
        applied(&service, op, cmd);
    }

    let world = service.store().snapshot().world;
    assert!(world.war_active);
    assert!(!world.player.alive);
    assert_eq!(world.clock.season, vigil_world::doc::Season::LongNight);
    // the explicit set lands after the war swing
    assert_eq!(world.threat.by_town["alpha"], 80);
    assert_eq!(world.moods.by_town["alpha"].fear, 75);
    assert_eq!(world.towns["alpha"].region.as_deref(), Some("northmarch"));

    // replays refuse and change nothing
    let before = project(&service.store().snapshot()).hash;
    for (op, cmd) in script {
        assert!(!run(&service, op, cmd).applied, "`{cmd}` replayed");
    }
    assert_eq!(project(&service.store().snapshot()).hash, before);
    assert!(service.store().validate_memory_integrity().ok());
}

#[test]
fn runtime_hooks_fire_only_after_commit() {
    use std::sync::{Arc, Mutex};
    use vigil_commands::RuntimeHooks;
    use vigil_store::WorldStore;

    #[derive(Clone, Default)]
    struct Recording {
        lines: Arc<Mutex<Vec<String>>>,
    }
    impl RuntimeHooks for Recording {
        fn on_say(&self, speaker: &str, line: &str) {
            self.lines.lock().unwrap().push(format!("{speaker}: {line}"));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(vigil_world::FixedClock::at_millis(T0));
    let store = Arc::new(WorldStore::open_with_clock(
        dir.path().join("memory.json"),
        clock.clone(),
    ));
    let hooks = Recording::default();
    let spoken = hooks.lines.clone();
    let service =
        GodCommandService::with_hooks(store, Box::new(hooks)).with_clock(clock);

    applied(&service, "say1", "say Mara the+gate+holds");
    assert_eq!(spoken.lock().unwrap().len(), 1);

    // replay commits nothing, so the hook stays silent
    assert!(!run(&service, "say1", "say Mara the+gate+holds").applied);
    assert_eq!(spoken.lock().unwrap().len(), 1);

    // a refused command flushes nothing either
    assert!(!run(&service, "say2", "transfer Ghost Mara 5").applied);
    assert_eq!(spoken.lock().unwrap().len(), 1);

    let agent = service.store().recall_agent("Mara").unwrap();
    assert_eq!(agent.recent_utterances.len(), 1);
    assert!(agent.last_processed_time.is_some());
}

#[test]
fn repetition_breaker_trips_through_the_command_surface() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_at(&dir.path().join("memory.json"));

    // Five consecutive job-driven intents build the streak.
    for tick in 1..=5 {
        let outcome = run(&service, &format!("tick-{tick}"), "agent intent Mara tend_fields");
        assert!(outcome.applied);
        assert!(outcome.output_lines[0].contains("intends tend_fields"));
    }
    let profile = service.store().recall_agent("Mara").unwrap().profile;
    assert_eq!(profile.repetition_count, 5);
    assert_eq!(profile.world_intent.as_deref(), Some("tend_fields"));

    // The sixth repeat trips the breaker.
    let outcome = run(&service, "tick-6", "agent intent Mara tend_fields");
    assert!(outcome.applied);
    assert!(outcome.output_lines[0].contains("wanders"));
    let profile = service.store().recall_agent("Mara").unwrap().profile;
    assert_eq!(profile.world_intent.as_deref(), Some("wander"));
    assert_eq!(profile.repetition_count, 0);

    // The next tick resumes the job intent with a fresh streak.
    let outcome = run(&service, "tick-7", "agent intent Mara tend_fields");
    assert!(outcome.applied);
    let profile = service.store().recall_agent("Mara").unwrap().profile;
    assert_eq!(profile.world_intent.as_deref(), Some("tend_fields"));
    assert_eq!(profile.repetition_count, 1);

    // A replayed tick is refused and moves nothing.
    assert!(!run(&service, "tick-3", "agent intent Mara tend_fields").applied);
    let profile = service.store().recall_agent("Mara").unwrap().profile;
    assert_eq!(profile.repetition_count, 1);
}
