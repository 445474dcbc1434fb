use doctrine_engine::{
    BattleContext, DoctrineEngine, DoctrineStatus, FEAT_PROGRESS_KEY, KeyValueStore, MemoryStore,
    PersistenceError, Purse, UNLOCKED_DOCTRINES_KEY,
};
use serde_json::json;

fn bundled() -> DoctrineEngine {
    let mut engine = DoctrineEngine::bundled();
    engine.build_catalog();
    engine
}

#[test]
fn progress_survives_a_new_session() {
    let mut engine = bundled();
    let mut purse = Purse::new(10_000, 100);
    engine.set_feat_progress("lions_share.personal_kills", 25);
    engine.set_feat_progress("lions_share.tournament_wins", 5);
    engine.set_feat_progress("lions_share.battle_victories", 10);
    engine
        .try_acquire("lions_share", &mut purse)
        .expect("lions share acquirable");
    engine.advance_feat("battlefield_tithes.ally_quests", 2);

    let mut kv = MemoryStore::new();
    engine.save_progress(&mut kv).expect("save");
    assert_eq!(kv.len(), 2);
    assert_eq!(kv.read(UNLOCKED_DOCTRINES_KEY), Some(json!(["lions_share"])));

    let mut restored = bundled();
    restored.load_progress(&kv).expect("load");
    assert_eq!(
        restored.progress_store().digest(),
        engine.progress_store().digest()
    );
    assert_eq!(restored.get_status("lions_share"), DoctrineStatus::Unlocked);
    assert_eq!(
        restored.get_feat_progress("battlefield_tithes.ally_quests"),
        2
    );
    assert!(restored.is_feat_live("battlefield_tithes.ally_quests"));
    assert!(!restored.is_feat_live("lions_share.personal_kills"));
}

#[test]
fn battle_scratch_state_is_saved_with_progress() {
    let mut engine = bundled();
    engine.set_feat_progress("lions_share.personal_kills", 25);
    engine.set_feat_progress("lions_share.tournament_wins", 5);
    engine.set_feat_progress("lions_share.battle_victories", 10);
    let mut purse = Purse::new(10_000, 100);
    engine.try_acquire("lions_share", &mut purse).expect("lions share");

    engine.on_battle_started(BattleContext {
        player_involved: true,
        player_troop_count: 10,
        enemy_troop_count: 30,
        ..BattleContext::default()
    });
    let mut kv = MemoryStore::new();
    engine.save_progress(&mut kv).expect("save");

    let saved = kv.read(FEAT_PROGRESS_KEY).expect("progress entry");
    assert_eq!(saved["battlefield_tithes.turn_the_tide::at_battle_start"], json!(1));

    let mut restored = bundled();
    restored.load_progress(&kv).expect("load");
    restored.on_battle_ended(BattleContext {
        player_involved: true,
        ..BattleContext::default()
    });
    assert!(restored.is_feat_complete("battlefield_tithes.turn_the_tide"));
}

#[test]
fn stale_keys_are_kept_but_ignored() {
    let mut kv = MemoryStore::new();
    kv.write(UNLOCKED_DOCTRINES_KEY, json!(["retired_doctrine"]))
        .expect("write");
    kv.write(
        FEAT_PROGRESS_KEY,
        json!({ "retired_doctrine.feat": 4, "lions_share.personal_kills": 99 }),
    )
    .expect("write");

    let mut engine = bundled();
    engine.load_progress(&kv).expect("load");
    assert_eq!(engine.get_status("retired_doctrine"), DoctrineStatus::Locked);
    assert_eq!(engine.get_feat_progress("lions_share.personal_kills"), 25);

    let mut out = MemoryStore::new();
    engine.save_progress(&mut out).expect("save");
    assert_eq!(out.read(UNLOCKED_DOCTRINES_KEY), Some(json!(["retired_doctrine"])));
}

#[test]
fn malformed_entry_keeps_current_progress() {
    let mut engine = bundled();
    engine.advance_feat("cultural_pride.recruits", 12);

    let mut kv = MemoryStore::new();
    kv.write(UNLOCKED_DOCTRINES_KEY, json!({ "not": "a list" }))
        .expect("write");
    let err = engine.load_progress(&kv).expect_err("malformed");
    assert!(matches!(err, PersistenceError::Codec { .. }));
    assert_eq!(engine.get_feat_progress("cultural_pride.recruits"), 12);
}

#[test]
fn sources_build_an_engine_with_config() {
    let catalog = r#"{ "doctrines": [ { "key": "solo", "name": "Solo", "column": 0, "row": 0,
        "feats": [ { "id": "days", "description": "Wait.", "target": 2,
                     "rule": { "kind": "days_elapsed" } } ] } ] }"#;
    let mut engine = DoctrineEngine::from_sources(catalog, Some(r#"{ "observed_faction": "empire" }"#))
        .expect("sources parse");
    engine.build_catalog();
    assert_eq!(engine.config().observed_faction, "empire");
    assert!(engine.config().enable_feat_requirements);
    assert_eq!(engine.get_feat_target("solo.days"), 2);

    assert!(DoctrineEngine::from_sources("{", None).is_err());
    assert!(DoctrineEngine::from_sources(catalog, Some("[1]")).is_err());
}
