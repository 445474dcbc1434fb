//! Persisted unlock/progress state and the feat progress API over it.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::notifications::Signal;

/// Separator between a feat key and a scratch slot name.
pub const SCRATCH_SEPARATOR: &str = "::";

/// The only mutable state the engine persists between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStore {
    #[serde(default)]
    unlocked: BTreeSet<String>,
    /// Feat progress by feat key, plus feat scratch values under
    /// `<feat_key>::<slot>` sub-keys.
    #[serde(default)]
    feat_progress: BTreeMap<String, i32>,
}

impl ProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from its two persisted entries.
    #[must_use]
    pub fn from_parts(
        unlocked: impl IntoIterator<Item = String>,
        feat_progress: BTreeMap<String, i32>,
    ) -> Self {
        Self {
            unlocked: unlocked.into_iter().collect(),
            feat_progress,
        }
    }

    #[must_use]
    pub fn is_unlocked(&self, doctrine_key: &str) -> bool {
        self.unlocked.contains(doctrine_key)
    }

    pub fn unlocked(&self) -> impl Iterator<Item = &str> {
        self.unlocked.iter().map(String::as_str)
    }

    #[must_use]
    pub fn unlocked_list(&self) -> Vec<String> {
        self.unlocked.iter().cloned().collect()
    }

    #[must_use]
    pub const fn feat_progress_map(&self) -> &BTreeMap<String, i32> {
        &self.feat_progress
    }

    /// Stored value for a key, without any catalog interpretation.
    #[must_use]
    pub fn raw_progress(&self, key: &str) -> i32 {
        self.feat_progress.get(key).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn scratch_key(feat_key: &str, slot: &str) -> String {
        format!("{feat_key}{SCRATCH_SEPARATOR}{slot}")
    }

    /// Stable XxHash64 digest over the canonical JSON form of the store.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }

    pub(crate) fn mark_unlocked(&mut self, doctrine_key: &str) -> bool {
        self.unlocked.insert(doctrine_key.to_string())
    }

    pub(crate) fn write(&mut self, key: &str, value: i32) {
        self.feat_progress.insert(key.to_string(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.feat_progress.remove(key);
    }
}

/// Read-only view resolving feat targets and completion against the catalog.
#[derive(Clone, Copy)]
pub struct ProgressView<'a> {
    catalog: Option<&'a Catalog>,
    config: &'a EngineConfig,
    store: &'a ProgressStore,
}

impl<'a> ProgressView<'a> {
    #[must_use]
    pub const fn new(
        catalog: Option<&'a Catalog>,
        config: &'a EngineConfig,
        store: &'a ProgressStore,
    ) -> Self {
        Self {
            catalog,
            config,
            store,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> Option<&'a Catalog> {
        self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &'a EngineConfig {
        self.config
    }

    #[must_use]
    pub const fn store(&self) -> &'a ProgressStore {
        self.store
    }

    #[must_use]
    pub fn is_known_feat(&self, feat_key: &str) -> bool {
        self.catalog
            .is_some_and(|catalog| catalog.feat_definition(feat_key).is_some())
    }

    /// Target of a feat; 0 when unknown or when feat requirements are off.
    #[must_use]
    pub fn target(&self, feat_key: &str) -> i32 {
        if !self.config.enable_feat_requirements {
            return 0;
        }
        self.catalog
            .and_then(|catalog| catalog.feat_definition(feat_key))
            .map_or(0, |feat| feat.target)
    }

    /// Current progress; 0 when unknown. Never reported above a positive target.
    #[must_use]
    pub fn progress(&self, feat_key: &str) -> i32 {
        if !self.is_known_feat(feat_key) {
            return 0;
        }
        let raw = self.store.raw_progress(feat_key).max(0);
        let target = self.target(feat_key);
        if target > 0 { raw.min(target) } else { raw }
    }

    #[must_use]
    pub fn is_complete(&self, feat_key: &str) -> bool {
        if !self.is_known_feat(feat_key) {
            return false;
        }
        let target = self.target(feat_key);
        target <= 0 || self.progress(feat_key) >= target
    }
}

/// Mutating side of the progress API. Completion signals are queued for the
/// engine to deliver once the current call returns.
pub struct ProgressWriter<'a> {
    catalog: Option<&'a Catalog>,
    config: &'a EngineConfig,
    store: &'a mut ProgressStore,
    signals: &'a mut Vec<Signal>,
}

impl<'a> ProgressWriter<'a> {
    pub(crate) const fn new(
        catalog: Option<&'a Catalog>,
        config: &'a EngineConfig,
        store: &'a mut ProgressStore,
        signals: &'a mut Vec<Signal>,
    ) -> Self {
        Self {
            catalog,
            config,
            store,
            signals,
        }
    }

    #[must_use]
    pub fn view(&self) -> ProgressView<'_> {
        ProgressView::new(self.catalog, self.config, self.store)
    }

    /// Overwrite a feat's progress, capped at a positive target.
    ///
    /// A completed feat stays complete: lowering it below its target is ignored.
    pub fn set_progress(&mut self, feat_key: &str, amount: i32) {
        if amount < 0 || !self.view().is_known_feat(feat_key) {
            return;
        }
        let target = self.view().target(feat_key);
        let before = self.store.raw_progress(feat_key);
        if target > 0 && before >= target && amount < target {
            debug!("feat {feat_key} already complete, ignoring set to {amount}");
            return;
        }
        let next = if target > 0 { amount.min(target) } else { amount };
        debug!("feat {feat_key} progress set {before} -> {next}");
        self.store.write(feat_key, next);
        self.signal_if_crossed(feat_key, target, before, next);
    }

    /// Add `delta` to a feat's progress and return the resulting value.
    pub fn advance(&mut self, feat_key: &str, delta: i32) -> i32 {
        if delta <= 0 || !self.view().is_known_feat(feat_key) {
            return self.view().progress(feat_key);
        }
        let target = self.view().target(feat_key);
        let before = self.store.raw_progress(feat_key).max(0);
        let sum = before.saturating_add(delta);
        let next = if target > 0 { sum.min(target) } else { sum };
        debug!("feat {feat_key} advanced by {delta}: {before} -> {next}");
        self.store.write(feat_key, next);
        self.signal_if_crossed(feat_key, target, before, next);
        next
    }

    #[must_use]
    pub fn scratch(&self, feat_key: &str, slot: &str) -> i32 {
        self.store
            .raw_progress(&ProgressStore::scratch_key(feat_key, slot))
    }

    pub fn set_scratch(&mut self, feat_key: &str, slot: &str, value: i32) {
        self.store
            .write(&ProgressStore::scratch_key(feat_key, slot), value);
    }

    pub fn clear_scratch(&mut self, feat_key: &str, slot: &str) {
        self.store
            .remove(&ProgressStore::scratch_key(feat_key, slot));
    }

    fn signal_if_crossed(&mut self, feat_key: &str, target: i32, before: i32, next: i32) {
        if target > 0 && before < target && next >= target {
            info!("feat complete: {feat_key}");
            self.signals.push(Signal::FeatCompleted(feat_key.to_string()));
        }
    }
}
