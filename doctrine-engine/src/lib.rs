//! Doctrine Engine
//!
//! Progression gating for a single-threaded simulation: a grid of unlockable
//! doctrines, each guarded by feats that advance as the host reports domain
//! events, and an all-or-nothing acquisition that spends gold and influence.
//! The crate performs no I/O; storage and resources are injected through
//! [`KeyValueStore`] and [`ResourceLedger`].

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod console;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod events;
pub mod feat;
pub mod hooks;
pub mod ledger;
pub mod notifications;
pub mod persistence;
pub mod progress;
pub mod registry;
pub mod router;
pub mod rules;
pub mod status;

// Re-export commonly used types
pub use acquire::{AcquireError, check_acquisition};
pub use catalog::Catalog;
pub use config::EngineConfig;
pub use console::{resolve_feat, run_command};
pub use definitions::{DoctrineDefinition, FeatDefinition, FeatList, GridPosition};
pub use engine::DoctrineEngine;
pub use error::{CatalogError, CommandError, FeatError, PersistenceError};
pub use events::{
    AgentState, ArenaContext, BattleContext, ChangeDetail, DomainEvent, EventKind, KillRecord,
    Mission, QuestGiver, QuestOutcome, Recruitment, SettlementOwner, SettlementOwnerChange,
    TournamentResult, TroopRef, TroopUpgrade,
};
pub use feat::{Feat, FeatContext, FeatFactory, feat_factory};
pub use ledger::{Purse, ResourceLedger};
pub use notifications::{FeatNotice, SubscriptionId};
pub use persistence::{FEAT_PROGRESS_KEY, KeyValueStore, MemoryStore, UNLOCKED_DOCTRINES_KEY};
pub use progress::{ProgressStore, ProgressView, ProgressWriter};
pub use registry::{CatalogData, DoctrineBlueprint, DoctrineFactory, DoctrineRegistry, DoctrineSpec, FeatSpec};
pub use router::{DispatchReport, FeatRouter, LiveFeat};
pub use rules::{FeatRule, KillSource, RuleFeat};
pub use status::{DoctrineStatus, effective_prerequisite, resolve_status};
