use anyhow::{Result, bail, ensure};
use colored::Colorize;
use doctrine_engine::{
    DoctrineEngine, DoctrineRegistry, DoctrineStatus, MemoryStore, Purse, ResourceLedger,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::stream::EventStream;

/// Host calls replayed per iteration.
const STREAM_LENGTH: usize = 400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Inputs shared by every iteration of a scenario run.
pub struct ScenarioCtx<'a> {
    pub registry: &'a DoctrineRegistry,
    pub seed: u64,
    pub verbose: bool,
}

impl ScenarioCtx<'_> {
    fn engine(&self) -> DoctrineEngine {
        let mut engine = DoctrineEngine::new(self.registry.clone());
        engine.build_catalog();
        engine
    }
}

type ScenarioCheck = fn(&ScenarioCtx<'_>) -> Result<()>;

pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    check: ScenarioCheck,
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "smoke",
        description: "Catalog builds and a seeded callback stream runs to completion",
        check: smoke,
    },
    Scenario {
        key: "grid-prerequisites",
        description: "Every doctrine's prerequisite is the doctrine directly above it",
        check: grid_prerequisites,
    },
    Scenario {
        key: "progress-bounds",
        description: "Feat progress never decreases and never exceeds its target",
        check: progress_bounds,
    },
    Scenario {
        key: "completion-once",
        description: "Each feat reports completion at most once",
        check: completion_once,
    },
    Scenario {
        key: "acquisition",
        description: "Failed acquisitions change nothing; unlocked status matches the unlocked set",
        check: acquisition,
    },
    Scenario {
        key: "live-feats",
        description: "Only incomplete feats of trackable doctrines receive events",
        check: live_feats,
    },
    Scenario {
        key: "persistence",
        description: "Saved progress restores to an identical store and keeps replaying identically",
        check: persistence,
    },
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.key == key)
}

/// Expand `all` and drop duplicates, keeping order.
#[must_use]
pub fn expand_scenarios(requested: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in requested {
        let names: Vec<String> = if name == "all" {
            SCENARIOS.iter().map(|s| s.key.to_string()).collect()
        } else {
            vec![name.clone()]
        };
        for name in names {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

impl Scenario {
    /// Run `iterations` iterations, each on its own derived seed.
    pub fn run(
        &self,
        registry: &DoctrineRegistry,
        seed: u64,
        iterations: usize,
        verbose: bool,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let ctx = ScenarioCtx {
                registry,
                seed: iteration_seed,
                verbose,
            };
            let start_time = Instant::now();
            match (self.check)(&ctx) {
                Ok(()) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?})",
                            i + 1,
                            iterations
                        );
                    }
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if verbose {
                        println!("  ❌ {}", message.clone().red());
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: self.key.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
        }
    }
}

fn feat_keys(engine: &DoctrineEngine) -> Vec<String> {
    engine
        .all_doctrines()
        .iter()
        .flat_map(|doctrine| doctrine.feats.iter().map(|feat| feat.key.clone()))
        .collect()
}

fn doctrine_keys(engine: &DoctrineEngine) -> Vec<String> {
    engine
        .all_doctrines()
        .iter()
        .map(|doctrine| doctrine.key.clone())
        .collect()
}

fn smoke(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    ensure!(!engine.all_doctrines().is_empty(), "catalog is empty");
    let mut stream = EventStream::new(ctx.seed);
    let mut notices = 0;
    for call in stream.take(STREAM_LENGTH) {
        notices += call.apply(&mut engine);
    }
    notices += engine.try_flush_notices().len();
    if ctx.verbose {
        println!(
            "     ↳ {} notices, {} feats still live",
            notices,
            engine.live_feat_keys().count()
        );
    }
    Ok(())
}

fn grid_prerequisites(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let engine = ctx.engine();
    let Some(catalog) = engine.catalog() else {
        bail!("catalog not built");
    };
    for doctrine in engine.all_doctrines() {
        let expected = doctrine
            .position
            .above()
            .and_then(|above| catalog.at(above))
            .map(|above| above.key.as_str());
        ensure!(
            doctrine.prerequisite_key.as_deref() == expected,
            "{} has prerequisite {:?}, expected {:?}",
            doctrine.key,
            doctrine.prerequisite_key,
            expected
        );
    }
    Ok(())
}

fn progress_bounds(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    let feats = feat_keys(&engine);
    let mut last: HashMap<&str, i32> = feats.iter().map(|key| (key.as_str(), 0)).collect();
    let mut stream = EventStream::new(ctx.seed);

    for call in stream.take(STREAM_LENGTH) {
        let label = call.label();
        call.apply(&mut engine);
        for key in &feats {
            let progress = engine.get_feat_progress(key);
            let target = engine.get_feat_target(key);
            let previous = last.get(key.as_str()).copied().unwrap_or_default();
            ensure!(
                progress >= previous,
                "{key} went from {previous} to {progress} after {label}"
            );
            ensure!(
                target <= 0 || progress <= target,
                "{key} at {progress} exceeds target {target}"
            );
            last.insert(key.as_str(), progress);
        }
    }
    Ok(())
}

fn completion_once(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    let fired: Rc<RefCell<HashMap<String, usize>>> = Rc::default();
    let counter = Rc::clone(&fired);
    engine.on_feat_completed(move |key| {
        *counter.borrow_mut().entry(key.to_string()).or_default() += 1;
    });

    let feats = feat_keys(&engine);
    let mut stream = EventStream::new(ctx.seed);
    for _ in 0..STREAM_LENGTH {
        if stream.chance(0.2) {
            let key = &feats[stream.pick(feats.len())];
            engine.advance_feat(key, 1 + i32::try_from(stream.pick(20)).unwrap_or(0));
        } else {
            stream.next_call().apply(&mut engine);
        }
    }

    let fired = fired.borrow();
    for key in &feats {
        let count = fired.get(key).copied().unwrap_or_default();
        let expected = usize::from(engine.is_feat_complete(key));
        ensure!(
            count == expected,
            "{key} completion fired {count} times, expected {expected}"
        );
    }
    Ok(())
}

fn acquisition(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    let feats = feat_keys(&engine);
    let doctrines = doctrine_keys(&engine);
    let mut stream = EventStream::new(ctx.seed);
    let mut purse = Purse::new(20_000, 120);

    for _ in 0..STREAM_LENGTH {
        if stream.chance(0.3) {
            let key = &feats[stream.pick(feats.len())];
            engine.advance_feat(key, 1 + i32::try_from(stream.pick(30)).unwrap_or(0));
        }
        if !stream.chance(0.25) {
            stream.next_call().apply(&mut engine);
            continue;
        }

        let key = &doctrines[stream.pick(doctrines.len())];
        let digest = engine.progress_store().digest();
        let funds = (purse.gold(), purse.influence());
        match engine.try_acquire(key, &mut purse) {
            Ok(()) => {
                ensure!(engine.is_doctrine_unlocked(key), "{key} acquired but not unlocked");
                purse = Purse::new(purse.gold() + 15_000, purse.influence() + 60);
            }
            Err(err) => {
                ensure!(
                    engine.progress_store().digest() == digest,
                    "refused acquisition of {key} ({err}) changed progress"
                );
                ensure!(
                    (purse.gold(), purse.influence()) == funds,
                    "refused acquisition of {key} ({err}) spent resources"
                );
            }
        }
        for doctrine in &doctrines {
            ensure!(
                (engine.get_status(doctrine) == DoctrineStatus::Unlocked)
                    == engine.is_doctrine_unlocked(doctrine),
                "{doctrine} status disagrees with the unlocked set"
            );
        }
    }
    Ok(())
}

fn live_feats(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    let feats = feat_keys(&engine);
    let doctrines = doctrine_keys(&engine);
    let mut stream = EventStream::new(ctx.seed);
    let mut purse = Purse::new(i64::MAX / 2, i64::MAX / 2);

    for _ in 0..STREAM_LENGTH {
        match stream.pick(4) {
            0 => {
                let key = &feats[stream.pick(feats.len())];
                engine.advance_feat(key, 1 + i32::try_from(stream.pick(50)).unwrap_or(0));
            }
            1 => {
                let key = &doctrines[stream.pick(doctrines.len())];
                let _ = engine.try_acquire(key, &mut purse);
            }
            _ => {
                stream.next_call().apply(&mut engine);
            }
        }

        let Some(catalog) = engine.catalog() else {
            bail!("catalog not built");
        };
        for live in engine.live_feat_keys() {
            let Some(owner) = catalog.owner_of(live) else {
                bail!("live feat {live} has no owning doctrine");
            };
            let status = engine.get_status(&owner.key);
            ensure!(status.tracks_feats(), "{live} is live under a {status} doctrine");
            ensure!(!engine.is_feat_complete(live), "{live} is live but complete");
        }
    }
    Ok(())
}

fn persistence(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let mut engine = ctx.engine();
    let mut stream = EventStream::new(ctx.seed);
    for call in stream.take(STREAM_LENGTH / 2) {
        call.apply(&mut engine);
    }

    let mut kv = MemoryStore::new();
    engine.save_progress(&mut kv)?;
    let mut restored = ctx.engine();
    restored.load_progress(&kv)?;
    ensure!(
        restored.progress_store().digest() == engine.progress_store().digest(),
        "restored progress differs from the saved session"
    );

    for call in stream.take(STREAM_LENGTH / 2) {
        call.clone().apply(&mut engine);
        call.apply(&mut restored);
    }
    ensure!(
        restored.progress_store().digest() == engine.progress_store().digest(),
        "sessions diverged after reload"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_scenario_once() {
        let expanded = expand_scenarios(&["smoke".to_string(), "all".to_string()]);
        assert_eq!(expanded.len(), SCENARIOS.len());
        assert_eq!(expanded[0], "smoke");
    }

    #[test]
    fn every_scenario_passes_on_the_bundled_catalog() {
        let registry = DoctrineRegistry::load_from_static();
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).expect("listed scenario");
            let result = scenario.run(&registry, 1337, 2, false);
            assert!(result.passed, "{key}: {:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
        }
    }
}
