//! Live-feat routing.
//!
//! Only feats that can still change an unlock decision receive events: feats
//! of doctrines that are neither locked nor unlocked, and that are not yet
//! complete. The live set is rebuilt from scratch on every resync.
use log::{debug, error, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::FeatError;
use crate::events::{DomainEvent, EventKind};
use crate::feat::Feat;
use crate::progress::ProgressView;
use crate::status::resolve_status;

/// A feat instance currently receiving events.
#[derive(Clone)]
pub struct LiveFeat {
    doctrine_key: String,
    feat: Rc<dyn Feat>,
}

impl LiveFeat {
    #[must_use]
    pub fn key(&self) -> &str {
        self.feat.key()
    }

    #[must_use]
    pub fn doctrine_key(&self) -> &str {
        &self.doctrine_key
    }

    #[must_use]
    pub fn feat(&self) -> &dyn Feat {
        self.feat.as_ref()
    }

    #[must_use]
    pub fn wants(&self, kind: EventKind) -> bool {
        self.feat.interests().contains(&kind)
    }
}

impl std::fmt::Debug for LiveFeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeat")
            .field("doctrine_key", &self.doctrine_key)
            .field("key", &self.key())
            .finish()
    }
}

/// Outcome of delivering one event to a snapshot of live feats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct FeatRouter {
    live: Vec<LiveFeat>,
}

impl FeatRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the live set from the catalog and current progress.
    pub fn resync(&mut self, view: &ProgressView<'_>) {
        self.live.clear();
        if !view.config().enable_feat_requirements {
            debug!("feat requirements disabled; no live feats");
            return;
        }
        let Some(catalog) = view.catalog() else {
            return;
        };

        for doctrine in catalog.doctrines() {
            if !resolve_status(view, &doctrine.key).tracks_feats() {
                continue;
            }
            for definition in &doctrine.feats {
                if view.is_complete(&definition.key) {
                    continue;
                }
                match catalog.instantiate_feat(&definition.key) {
                    Some(Ok(feat)) => self.live.push(LiveFeat {
                        doctrine_key: doctrine.key.clone(),
                        feat: Rc::from(feat),
                    }),
                    Some(Err(err)) => warn!("feat {} not tracked: {err}", definition.key),
                    None => warn!("feat {} has no constructor", definition.key),
                }
            }
        }
        debug!("router resynced: {} live feats", self.live.len());
    }

    #[must_use]
    pub fn live(&self) -> &[LiveFeat] {
        &self.live
    }

    pub fn live_keys(&self) -> impl Iterator<Item = &str> {
        self.live.iter().map(LiveFeat::key)
    }

    #[must_use]
    pub fn is_live(&self, feat_key: &str) -> bool {
        self.live.iter().any(|live| live.key() == feat_key)
    }

    /// Owned copy of the live feats interested in `kind`.
    #[must_use]
    pub fn snapshot(&self, kind: EventKind) -> Vec<LiveFeat> {
        self.live
            .iter()
            .filter(|live| live.wants(kind))
            .cloned()
            .collect()
    }

    /// Invoke `deliver` on every feat of `snapshot`. A failing or panicking
    /// feat is logged and skipped; the rest still receive the event.
    pub fn dispatch_snapshot<F>(
        snapshot: &[LiveFeat],
        event: &DomainEvent,
        mut deliver: F,
    ) -> DispatchReport
    where
        F: FnMut(&LiveFeat) -> Result<(), FeatError>,
    {
        let mut report = DispatchReport::default();
        for live in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| deliver(live))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!("{} failed on {}: {err}", live.key(), event.kind().key());
                    report.failed += 1;
                }
                Err(payload) => {
                    error!(
                        "{} panicked on {}: {}",
                        live.key(),
                        event.kind().key(),
                        panic_message(payload.as_ref())
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
