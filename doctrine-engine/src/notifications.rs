//! Engine signals, listener subscriptions and the feat-completion notice queue.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// State change raised while the engine is busy; delivered once the
/// triggering call has released its borrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    CatalogBuilt,
    FeatCompleted(String),
    DoctrineUnlocked(String),
}

/// Handle returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type KeyListener = Box<dyn FnMut(&str)>;
type Listener = Box<dyn FnMut()>;

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    doctrine_unlocked: Vec<(SubscriptionId, KeyListener)>,
    feat_completed: Vec<(SubscriptionId, KeyListener)>,
    catalog_built: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    fn issue(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub(crate) fn add_doctrine_unlocked(&mut self, listener: KeyListener) -> SubscriptionId {
        let id = self.issue();
        self.doctrine_unlocked.push((id, listener));
        id
    }

    pub(crate) fn add_feat_completed(&mut self, listener: KeyListener) -> SubscriptionId {
        let id = self.issue();
        self.feat_completed.push((id, listener));
        id
    }

    pub(crate) fn add_catalog_built(&mut self, listener: Listener) -> SubscriptionId {
        let id = self.issue();
        self.catalog_built.push((id, listener));
        id
    }

    /// Remove a listener; returns false if the id was unknown.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.len();
        self.doctrine_unlocked.retain(|(owner, _)| *owner != id);
        self.feat_completed.retain(|(owner, _)| *owner != id);
        self.catalog_built.retain(|(owner, _)| *owner != id);
        self.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.doctrine_unlocked.len() + self.feat_completed.len() + self.catalog_built.len()
    }

    pub(crate) fn deliver(&mut self, signal: &Signal) {
        match signal {
            Signal::CatalogBuilt => {
                for (_, listener) in &mut self.catalog_built {
                    listener();
                }
            }
            Signal::FeatCompleted(key) => {
                for (_, listener) in &mut self.feat_completed {
                    listener(key);
                }
            }
            Signal::DoctrineUnlocked(key) => {
                for (_, listener) in &mut self.doctrine_unlocked {
                    listener(key);
                }
            }
        }
    }
}

/// Player-facing message about a completed feat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatNotice {
    pub doctrine_key: String,
    pub doctrine_name: String,
    pub feat_key: String,
    pub feat_description: String,
}

impl FeatNotice {
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Feat complete for {}: {}",
            self.doctrine_name, self.feat_description
        )
    }
}

/// Completed-feat notices held back while a mission is running.
#[derive(Debug, Default)]
pub(crate) struct NoticeQueue {
    pending: VecDeque<FeatNotice>,
    in_mission: bool,
}

impl NoticeQueue {
    pub(crate) fn push(&mut self, notice: FeatNotice) {
        self.pending.push_back(notice);
    }

    pub(crate) const fn set_in_mission(&mut self, in_mission: bool) {
        self.in_mission = in_mission;
    }

    pub(crate) const fn in_mission(&self) -> bool {
        self.in_mission
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drain pending notices, or nothing while a mission is running.
    pub(crate) fn try_flush(&mut self) -> Vec<FeatNotice> {
        if self.in_mission {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }
}
