use doctrine_engine::{
    AcquireError, BattleContext, DoctrineEngine, DoctrineRegistry, DoctrineStatus, EngineConfig,
    KillRecord, Purse,
};
use std::cell::RefCell;
use std::rc::Rc;

const COLUMN: &str = r#"{
    "doctrines": [
        { "key": "d1", "name": "First", "description": "Row zero.", "column": 2, "row": 0,
          "gold_cost": 100,
          "feats": [ { "id": "days", "description": "Wait three days.", "target": 3,
                       "rule": { "kind": "days_elapsed" } } ] },
        { "key": "d2", "name": "Second", "description": "Row one.", "column": 2, "row": 1,
          "gold_cost": 200, "influence_cost": 10,
          "feats": [ { "id": "kills", "description": "Defeat 2 enemies.", "target": 2,
                       "rule": { "kind": "kills" } } ] },
        { "key": "d3", "name": "Third", "description": "Row two.", "column": 2, "row": 2,
          "feats": [] }
    ]
}"#;

fn engine_with(json: &str, config: EngineConfig) -> DoctrineEngine {
    let registry = DoctrineRegistry::from_json(json).expect("catalog json");
    let mut engine = DoctrineEngine::with_config(registry, config);
    engine.build_catalog();
    engine
}

fn engine() -> DoctrineEngine {
    engine_with(COLUMN, EngineConfig::default())
}

fn player_kill() -> KillRecord {
    KillRecord {
        killer_is_player: true,
        victim_is_enemy: true,
        ..KillRecord::default()
    }
}

#[test]
fn scenario_a_three_advances_complete_the_feat_once() {
    let mut engine = engine();
    let completions = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&completions);
    engine.on_feat_completed(move |key| seen.borrow_mut().push(key.to_string()));

    assert_eq!(engine.get_status("d1"), DoctrineStatus::Unlockable);
    assert_eq!(engine.advance_feat("d1.days", 1), 1);
    assert_eq!(engine.advance_feat("d1.days", 1), 2);
    assert_eq!(engine.get_status("d1"), DoctrineStatus::Unlockable);
    assert_eq!(engine.advance_feat("d1.days", 1), 3);

    assert_eq!(*completions.borrow(), vec!["d1.days".to_string()]);
    assert_eq!(engine.get_status("d1"), DoctrineStatus::InProgress);

    // Further calls neither move progress nor re-fire completion.
    assert_eq!(engine.advance_feat("d1.days", 1), 3);
    engine.set_feat_progress("d1.days", 3);
    assert_eq!(completions.borrow().len(), 1);
}

#[test]
fn scenario_a_through_daily_ticks() {
    let mut engine = engine();
    for _ in 0..3 {
        engine.on_daily_tick();
    }
    assert!(engine.is_feat_complete("d1.days"));
    assert!(!engine.is_feat_live("d1.days"));
    assert_eq!(engine.get_status("d1"), DoctrineStatus::InProgress);
    assert_eq!(engine.try_flush_notices().len(), 1);
}

#[test]
fn scenario_b_prerequisite_locks_regardless_of_own_feats() {
    let mut engine = engine();
    assert_eq!(engine.get_status("d2"), DoctrineStatus::Locked);
    engine.set_feat_progress("d2.kills", 2);
    assert!(engine.is_feat_complete("d2.kills"));
    assert_eq!(engine.get_status("d2"), DoctrineStatus::Locked);

    let mut purse = Purse::new(1_000, 100);
    assert_eq!(
        engine.try_acquire("d2", &mut purse),
        Err(AcquireError::PrerequisiteNotMet {
            key: "d2".to_string()
        })
    );

    engine.set_feat_progress("d1.days", 3);
    engine.try_acquire("d1", &mut purse).expect("d1 acquirable");
    assert_eq!(engine.get_status("d1"), DoctrineStatus::Unlocked);
    assert_eq!(engine.get_status("d2"), DoctrineStatus::InProgress);
}

#[test]
fn scenario_c_insufficient_gold_changes_nothing() {
    let mut engine = engine();
    engine.set_feat_progress("d1.days", 3);
    let before = engine.progress_store().digest();
    let mut purse = Purse::new(50, 0);

    let (ok, reason) = engine.try_acquire_with_reason("d1", &mut purse);
    assert!(!ok);
    assert_eq!(reason, "not enough gold");
    assert_eq!(purse.gold, 50);
    assert!(!engine.is_doctrine_unlocked("d1"));
    assert_eq!(engine.progress_store().digest(), before);
}

#[test]
fn scenario_d_disabled_prerequisite_is_skipped() {
    let json = r#"{
        "doctrines": [
            { "key": "d0", "name": "Root", "column": 2, "row": 0, "feats": [] },
            { "key": "d1", "name": "Granted", "column": 2, "row": 1,
              "disabled_when": ["granted"], "disabled_message": "Already granted.",
              "feats": [] },
            { "key": "d3", "name": "Leaf", "column": 2, "row": 2, "feats": [] }
        ]
    }"#;
    let mut engine = engine_with(json, EngineConfig::default().with_flag("granted", true));

    assert_eq!(
        engine.get_doctrine("d3").and_then(|d| d.prerequisite_key.as_deref()),
        Some("d1")
    );
    assert!(engine.is_doctrine_disabled("d1"));
    assert_eq!(engine.effective_prerequisite("d3"), Some("d0"));
    assert_eq!(
        engine.doctrine_description("d1").as_deref(),
        Some("Already granted.")
    );
    assert_eq!(engine.get_status("d3"), DoctrineStatus::Locked);

    let mut purse = Purse::default();
    engine.try_acquire("d0", &mut purse).expect("free root");
    assert_eq!(engine.get_status("d3"), DoctrineStatus::InProgress);
}

#[test]
fn scenario_d_disabled_row_zero_leaves_no_prerequisite() {
    let json = r#"{
        "doctrines": [
            { "key": "d1", "name": "Granted", "column": 2, "row": 0,
              "disabled_when": ["granted"], "feats": [] },
            { "key": "d3", "name": "Leaf", "column": 2, "row": 1, "feats": [] }
        ]
    }"#;
    let engine = engine_with(json, EngineConfig::default().with_flag("granted", true));
    assert_eq!(engine.effective_prerequisite("d3"), None);
    assert_eq!(engine.get_status("d3"), DoctrineStatus::InProgress);
}

#[test]
fn battle_kills_flow_into_live_feats() {
    let mut engine = engine();
    let mut purse = Purse::new(1_000, 100);
    engine.set_feat_progress("d1.days", 3);
    engine.try_acquire("d1", &mut purse).expect("d1");
    assert_eq!(engine.try_flush_notices().len(), 1);
    assert!(engine.is_feat_live("d2.kills"));

    let battle = BattleContext {
        player_involved: true,
        enemy_troop_count: 10,
        kills: vec![player_kill(), player_kill(), player_kill()],
        ..BattleContext::default()
    };
    let notices = engine.on_battle_ended(battle);
    assert_eq!(engine.get_feat_progress("d2.kills"), 2);
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].message(),
        "Feat complete for Second: Defeat 2 enemies."
    );

    engine.try_acquire("d2", &mut purse).expect("d2");
    assert_eq!(purse.gold, 700);
    assert_eq!(purse.influence, 90);
}

#[test]
fn disabling_feat_requirements_opens_the_gate() {
    let mut engine = engine();
    engine.update_config(|config| config.enable_feat_requirements = false);
    assert_eq!(engine.get_feat_target("d1.days"), 0);
    assert!(engine.is_feat_complete("d1.days"));
    assert_eq!(engine.get_status("d1"), DoctrineStatus::InProgress);
    assert_eq!(engine.live_feat_keys().count(), 0);
    assert_eq!(engine.on_daily_tick().delivered, 0);
}

#[test]
fn unknown_keys_degrade_to_defaults() {
    let mut engine = engine();
    assert_eq!(engine.get_status("nope"), DoctrineStatus::Locked);
    assert_eq!(engine.get_feat_progress("nope.feat"), 0);
    assert_eq!(engine.get_feat_target("nope.feat"), 0);
    assert!(!engine.is_feat_complete("nope.feat"));
    assert_eq!(engine.advance_feat("nope.feat", 5), 0);
    assert!(engine.get_doctrine("nope").is_none());
    let mut purse = Purse::new(10, 10);
    assert_eq!(
        engine.try_acquire_with_reason("nope", &mut purse),
        (false, "unknown doctrine".to_string())
    );
}

#[test]
fn unbuilt_catalog_reads_empty() {
    let registry = DoctrineRegistry::from_json(COLUMN).expect("catalog json");
    let engine = DoctrineEngine::new(registry);
    assert!(!engine.is_catalog_built());
    assert!(engine.all_doctrines().is_empty());
    assert_eq!(engine.get_status("d1"), DoctrineStatus::Locked);
    assert_eq!(engine.get_feat_target("d1.days"), 0);
}

#[test]
fn bundled_catalog_is_a_full_grid() {
    let mut engine = DoctrineEngine::bundled();
    let doctrines = engine.build_catalog();
    assert_eq!(doctrines.len(), 16);
    for doctrine in doctrines {
        assert!(!doctrine.feats.is_empty(), "{} has no feats", doctrine.key);
        for feat in &doctrine.feats {
            assert!(feat.target > 0, "{} has no target", feat.key);
        }
    }
    assert_eq!(
        engine.effective_prerequisite("battlefield_tithes"),
        Some("lions_share")
    );
}

#[test]
fn completed_feat_ignores_lowering_and_never_refires() {
    let mut engine = engine();
    let fired = Rc::new(RefCell::new(0_usize));
    let counter = Rc::clone(&fired);
    engine.on_feat_completed(move |_| *counter.borrow_mut() += 1);

    assert_eq!(engine.advance_feat("d1.days", 3), 3);
    engine.set_feat_progress("d1.days", 0);
    assert_eq!(engine.get_feat_progress("d1.days"), 3);
    assert!(engine.is_feat_complete("d1.days"));
    assert_eq!(engine.advance_feat("d1.days", 3), 3);

    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn feat_completing_mid_dispatch_still_lets_siblings_see_the_event() {
    let json = r#"{
        "doctrines": [
            { "key": "d1", "name": "Twin", "column": 1, "row": 0,
              "feats": [
                { "id": "a", "description": "Wait a day.", "target": 1,
                  "rule": { "kind": "days_elapsed" } },
                { "id": "b", "description": "Wait two days.", "target": 2,
                  "rule": { "kind": "days_elapsed" } }
              ] }
        ]
    }"#;
    let mut engine = engine_with(json, EngineConfig::default());
    assert!(engine.is_feat_live("d1.a"));
    assert!(engine.is_feat_live("d1.b"));

    let report = engine.on_daily_tick();
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(engine.get_feat_progress("d1.a"), 1);
    assert_eq!(engine.get_feat_progress("d1.b"), 1);
    assert!(!engine.is_feat_live("d1.a"));
    assert!(engine.is_feat_live("d1.b"));
}

#[test]
fn huge_troop_counts_do_not_overflow_outnumbered_checks() {
    let json = r#"{
        "doctrines": [
            { "key": "d1", "name": "Odds", "column": 3, "row": 0,
              "feats": [
                { "id": "victories", "description": "Win 2 battles while outnumbered.", "target": 2,
                  "rule": { "kind": "battle_victories", "outnumbered": true } },
                { "id": "tide", "description": "Win a battle at two-to-one odds.", "target": 1,
                  "rule": { "kind": "turn_the_tide", "ratio": 2 } }
              ] }
        ]
    }"#;
    let mut engine = engine_with(json, EngineConfig::default());
    let huge = BattleContext {
        player_involved: true,
        player_troop_count: u32::MAX,
        ally_troop_count: u32::MAX,
        enemy_troop_count: u32::MAX,
        ..BattleContext::default()
    };
    let report = engine.on_battle_started(huge.clone());
    assert_eq!(report.failed, 0);
    engine.on_battle_ended(huge);
    assert_eq!(engine.get_feat_progress("d1.victories"), 0);
    assert_eq!(engine.get_feat_progress("d1.tide"), 0);

    let outnumbered = BattleContext {
        player_involved: true,
        player_troop_count: 10,
        enemy_troop_count: 25,
        ..BattleContext::default()
    };
    engine.on_battle_started(outnumbered.clone());
    engine.on_battle_ended(outnumbered);
    assert_eq!(engine.get_feat_progress("d1.victories"), 1);
    assert_eq!(engine.get_feat_progress("d1.tide"), 1);
}
