//! Doctrine unlock state machine.
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::progress::ProgressView;

/// Where a doctrine stands on its way to being unlocked.
///
/// `Unlockable` means the prerequisite is met but feats are still pending;
/// `InProgress` means every gate is satisfied and the doctrine can be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctrineStatus {
    Locked,
    Unlockable,
    InProgress,
    Unlocked,
}

impl DoctrineStatus {
    pub const ALL: &'static [Self] = &[
        Self::Locked,
        Self::Unlockable,
        Self::InProgress,
        Self::Unlocked,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlockable => "unlockable",
            Self::InProgress => "in_progress",
            Self::Unlocked => "unlocked",
        }
    }

    /// True when the doctrine's feats can still influence an unlock.
    #[must_use]
    pub const fn tracks_feats(self) -> bool {
        matches!(self, Self::Unlockable | Self::InProgress)
    }

    #[must_use]
    pub const fn is_acquirable(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for DoctrineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Walk up the prerequisite chain past disabled doctrines.
///
/// Returns `None` when the chain ends, leaves the catalog, or loops.
#[must_use]
pub fn effective_prerequisite<'a>(
    catalog: &'a Catalog,
    config: &EngineConfig,
    key: &str,
) -> Option<&'a str> {
    let mut next = catalog.get(key)?.prerequisite_key.as_deref();
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some(candidate) = next {
        if !visited.insert(candidate) {
            debug!("prerequisite cycle through {candidate} while resolving {key}");
            return None;
        }
        if !catalog.is_disabled(candidate, config) {
            return Some(candidate);
        }
        next = catalog.get(candidate)?.prerequisite_key.as_deref();
    }
    None
}

/// Current status of `key`. Unknown keys and an unbuilt catalog read as `Locked`.
#[must_use]
pub fn resolve_status(view: &ProgressView<'_>, key: &str) -> DoctrineStatus {
    let Some(catalog) = view.catalog() else {
        return DoctrineStatus::Locked;
    };
    let Some(doctrine) = catalog.get(key) else {
        return DoctrineStatus::Locked;
    };
    let store = view.store();
    if store.is_unlocked(key) {
        return DoctrineStatus::Unlocked;
    }
    if effective_prerequisite(catalog, view.config(), key)
        .is_some_and(|prerequisite| !store.is_unlocked(prerequisite))
    {
        return DoctrineStatus::Locked;
    }
    if doctrine.feats.is_empty() || !view.config().enable_feat_requirements {
        return DoctrineStatus::InProgress;
    }
    if doctrine.feat_keys().any(|feat| !view.is_complete(feat)) {
        DoctrineStatus::Unlockable
    } else {
        DoctrineStatus::InProgress
    }
}
