//! The doctrine engine facade owning catalog, progress and routing.
use anyhow::Context;
use log::{debug, info};

use crate::acquire::{AcquireError, check_acquisition};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::definitions::DoctrineDefinition;
use crate::error::PersistenceError;
use crate::events::DomainEvent;
use crate::feat::FeatContext;
use crate::ledger::ResourceLedger;
use crate::notifications::{FeatNotice, NoticeQueue, Signal, SubscriptionId, Subscribers};
use crate::persistence::{self, KeyValueStore};
use crate::progress::{ProgressStore, ProgressView, ProgressWriter};
use crate::registry::DoctrineRegistry;
use crate::router::{DispatchReport, FeatRouter};
use crate::status::{self, DoctrineStatus};

/// Single-threaded doctrine progression engine.
///
/// Queries never fail: unknown keys and an unbuilt catalog read as locked,
/// zero or empty.
pub struct DoctrineEngine {
    registry: DoctrineRegistry,
    catalog: Option<Catalog>,
    config: EngineConfig,
    store: ProgressStore,
    router: FeatRouter,
    subscribers: Subscribers,
    notices: NoticeQueue,
    signals: Vec<Signal>,
}

impl DoctrineEngine {
    #[must_use]
    pub fn new(registry: DoctrineRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: DoctrineRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            catalog: None,
            config,
            store: ProgressStore::new(),
            router: FeatRouter::new(),
            subscribers: Subscribers::default(),
            notices: NoticeQueue::default(),
            signals: Vec::new(),
        }
    }

    /// Engine over the catalog bundled with the crate.
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(DoctrineRegistry::load_from_static())
    }

    /// Engine over catalog and config JSON supplied by the host.
    ///
    /// # Errors
    ///
    /// Returns an error if either document fails to parse.
    pub fn from_sources(catalog_json: &str, config_json: Option<&str>) -> anyhow::Result<Self> {
        let registry =
            DoctrineRegistry::from_json(catalog_json).context("failed to parse doctrine catalog")?;
        let config = config_json
            .map(EngineConfig::from_json)
            .transpose()
            .context("failed to parse engine config")?
            .unwrap_or_default();
        Ok(Self::with_config(registry, config))
    }

    /// Build the catalog once; later calls return the cached doctrines.
    pub fn build_catalog(&mut self) -> &[DoctrineDefinition] {
        if self.catalog.is_none() {
            let catalog = Catalog::build(&self.registry);
            info!("doctrine catalog ready: {} doctrines", catalog.len());
            self.catalog = Some(catalog);
            self.signals.push(Signal::CatalogBuilt);
            self.process_signals();
        }
        self.all_doctrines()
    }

    #[must_use]
    pub const fn is_catalog_built(&self) -> bool {
        self.catalog.is_some()
    }

    #[must_use]
    pub const fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    #[must_use]
    pub const fn registry(&self) -> &DoctrineRegistry {
        &self.registry
    }

    #[must_use]
    pub fn view(&self) -> ProgressView<'_> {
        ProgressView::new(self.catalog.as_ref(), &self.config, &self.store)
    }

    // Catalog queries

    #[must_use]
    pub fn all_doctrines(&self) -> &[DoctrineDefinition] {
        self.catalog
            .as_ref()
            .map(Catalog::doctrines)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_doctrine(&self, key: &str) -> Option<&DoctrineDefinition> {
        self.catalog.as_ref()?.get(key)
    }

    #[must_use]
    pub fn get_status(&self, key: &str) -> DoctrineStatus {
        status::resolve_status(&self.view(), key)
    }

    #[must_use]
    pub fn is_doctrine_unlocked(&self, key: &str) -> bool {
        self.store.is_unlocked(key)
    }

    #[must_use]
    pub fn is_doctrine_disabled(&self, key: &str) -> bool {
        self.catalog
            .as_ref()
            .is_some_and(|catalog| catalog.is_disabled(key, &self.config))
    }

    /// Prerequisite that actually gates `key`, skipping disabled doctrines.
    #[must_use]
    pub fn effective_prerequisite(&self, key: &str) -> Option<&str> {
        status::effective_prerequisite(self.catalog.as_ref()?, &self.config, key)
    }

    /// Description to show for a doctrine: its disabled message while disabled.
    #[must_use]
    pub fn doctrine_description(&self, key: &str) -> Option<String> {
        let catalog = self.catalog.as_ref()?;
        let doctrine = catalog.get(key)?;
        let text = catalog
            .disabled_message(key, &self.config)
            .unwrap_or(&doctrine.description);
        Some(text.to_string())
    }

    // Acquisition

    /// Unlock `key`, paying its costs from `ledger`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check. Nothing is debited or recorded on failure.
    pub fn try_acquire(
        &mut self,
        key: &str,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<(), AcquireError> {
        let (gold, influence) = {
            let doctrine = check_acquisition(&self.view(), key, ledger)?;
            (doctrine.gold_cost, doctrine.influence_cost)
        };
        ledger.debit(gold, influence);
        self.store.mark_unlocked(key);
        info!("doctrine unlocked: {key} (gold {gold}, influence {influence})");
        self.signals.push(Signal::DoctrineUnlocked(key.to_string()));
        self.process_signals();
        Ok(())
    }

    /// [`Self::try_acquire`] as a success flag and reason text.
    pub fn try_acquire_with_reason(
        &mut self,
        key: &str,
        ledger: &mut dyn ResourceLedger,
    ) -> (bool, String) {
        match self.try_acquire(key, ledger) {
            Ok(()) => (true, String::new()),
            Err(err) => {
                debug!("acquire {key} refused: {err}");
                (false, err.to_string())
            }
        }
    }

    // Feat progress

    #[must_use]
    pub fn get_feat_progress(&self, feat_key: &str) -> i32 {
        self.view().progress(feat_key)
    }

    #[must_use]
    pub fn get_feat_target(&self, feat_key: &str) -> i32 {
        self.view().target(feat_key)
    }

    #[must_use]
    pub fn is_feat_complete(&self, feat_key: &str) -> bool {
        self.view().is_complete(feat_key)
    }

    pub fn set_feat_progress(&mut self, feat_key: &str, amount: i32) {
        self.writer().set_progress(feat_key, amount);
        self.process_signals();
    }

    pub fn advance_feat(&mut self, feat_key: &str, delta: i32) -> i32 {
        let progress = self.writer().advance(feat_key, delta);
        self.process_signals();
        progress
    }

    fn writer(&mut self) -> ProgressWriter<'_> {
        ProgressWriter::new(
            self.catalog.as_ref(),
            &self.config,
            &mut self.store,
            &mut self.signals,
        )
    }

    // Subscriptions

    pub fn on_doctrine_unlocked(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.subscribers.add_doctrine_unlocked(Box::new(listener))
    }

    pub fn on_feat_completed(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.subscribers.add_feat_completed(Box::new(listener))
    }

    pub fn on_catalog_built(&mut self, listener: impl FnMut() + 'static) -> SubscriptionId {
        self.subscribers.add_catalog_built(Box::new(listener))
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    // Configuration

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration and refresh the live feats.
    pub fn set_config(&mut self, config: EngineConfig) {
        if config != self.config {
            debug!("engine config changed");
        }
        self.config = config;
        self.resync();
    }

    pub fn update_config(&mut self, update: impl FnOnce(&mut EngineConfig)) {
        let mut config = self.config.clone();
        update(&mut config);
        self.set_config(config);
    }

    // Persistence

    #[must_use]
    pub const fn progress_store(&self) -> &ProgressStore {
        &self.store
    }

    /// # Errors
    ///
    /// Returns an error if the store rejects a write.
    pub fn save_progress(&self, kv: &mut dyn KeyValueStore) -> Result<(), PersistenceError> {
        persistence::save(&self.store, kv)
    }

    /// Replace in-memory progress with the persisted entries.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed; progress is left unchanged.
    pub fn load_progress(&mut self, kv: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        self.store = persistence::load(kv)?;
        info!(
            "progress loaded: {} unlocked doctrines",
            self.store.unlocked().count()
        );
        self.resync();
        Ok(())
    }

    // Routing

    pub fn live_feat_keys(&self) -> impl Iterator<Item = &str> {
        self.router.live_keys()
    }

    #[must_use]
    pub fn is_feat_live(&self, feat_key: &str) -> bool {
        self.router.is_live(feat_key)
    }

    /// Rebuild the live feat set from current state.
    pub fn resync(&mut self) {
        let view = ProgressView::new(self.catalog.as_ref(), &self.config, &self.store);
        self.router.resync(&view);
    }

    /// Deliver an event to the live feats interested in it.
    ///
    /// Feats complete and doctrines move between states while the event is
    /// being delivered; the live set is resynced after each feat, but the
    /// feats receiving this event are fixed when dispatch starts.
    pub fn dispatch(&mut self, event: &DomainEvent) -> DispatchReport {
        if !self.config.enable_feat_requirements {
            return DispatchReport::default();
        }
        let snapshot = self.router.snapshot(event.kind());
        if snapshot.is_empty() {
            return DispatchReport::default();
        }
        let report = FeatRouter::dispatch_snapshot(&snapshot, event, |live| {
            let outcome = {
                let writer = ProgressWriter::new(
                    self.catalog.as_ref(),
                    &self.config,
                    &mut self.store,
                    &mut self.signals,
                );
                let mut ctx = FeatContext::new(live.key(), writer);
                live.feat().handle(event, &mut ctx)
            };
            self.process_signals();
            outcome
        });
        self.process_signals();
        debug!(
            "{} delivered to {} feats ({} failed)",
            event.kind().key(),
            report.delivered,
            report.failed
        );
        report
    }

    // Notices

    #[must_use]
    pub const fn in_mission(&self) -> bool {
        self.notices.in_mission()
    }

    pub const fn set_in_mission(&mut self, in_mission: bool) {
        self.notices.set_in_mission(in_mission);
    }

    #[must_use]
    pub fn pending_notices(&self) -> usize {
        self.notices.len()
    }

    /// Drain queued feat notices unless a mission is running.
    pub fn try_flush_notices(&mut self) -> Vec<FeatNotice> {
        let notices = self.notices.try_flush();
        for notice in &notices {
            info!("{}", notice.message());
        }
        notices
    }

    fn queue_notice(&mut self, feat_key: &str) {
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        let (Some(doctrine), Some(feat)) =
            (catalog.owner_of(feat_key), catalog.feat_definition(feat_key))
        else {
            return;
        };
        self.notices.push(FeatNotice {
            doctrine_key: doctrine.key.clone(),
            doctrine_name: doctrine.name.clone(),
            feat_key: feat.key.clone(),
            feat_description: feat.description.clone(),
        });
    }

    fn process_signals(&mut self) {
        while !self.signals.is_empty() {
            let signals = std::mem::take(&mut self.signals);
            for signal in &signals {
                if let Signal::FeatCompleted(feat_key) = signal {
                    self.queue_notice(feat_key);
                }
                self.subscribers.deliver(signal);
            }
            self.resync();
        }
    }
}

impl Default for DoctrineEngine {
    fn default() -> Self {
        Self::bundled()
    }
}
