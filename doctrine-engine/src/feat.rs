//! Feat behaviour and the progress context handed to feat hooks.
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::error::{CatalogError, FeatError};
use crate::events::{DomainEvent, EventKind};
use crate::progress::ProgressWriter;

/// Behaviour of a single feat. Instances are created fresh from their
/// factory whenever the router rebuilds its live set, so they hold no
/// state of their own; anything that must survive goes through the context.
pub trait Feat {
    fn key(&self) -> &str;
    fn description(&self) -> &str;
    fn target(&self) -> i32;

    /// Events this feat wants delivered.
    fn interests(&self) -> &[EventKind];

    /// Called once per catalog build after the definition is captured.
    fn on_register(&self) {}

    /// React to an event.
    ///
    /// # Errors
    ///
    /// Returns [`FeatError`] when the payload can't be evaluated. The engine
    /// logs the failure and keeps dispatching to the remaining feats.
    fn handle(&self, event: &DomainEvent, ctx: &mut FeatContext<'_>) -> Result<(), FeatError>;
}

/// Constructor for a feat instance.
pub type FeatFactory = Rc<dyn Fn() -> Result<Box<dyn Feat>, CatalogError>>;

/// Wrap a cloneable feat in a factory.
pub fn feat_factory<F>(feat: F) -> FeatFactory
where
    F: Feat + Clone + 'static,
{
    Rc::new(move || Ok(Box::new(feat.clone()) as Box<dyn Feat>))
}

/// Progress API scoped to the feat being invoked.
pub struct FeatContext<'a> {
    key: &'a str,
    writer: ProgressWriter<'a>,
}

impl<'a> FeatContext<'a> {
    pub(crate) const fn new(key: &'a str, writer: ProgressWriter<'a>) -> Self {
        Self { key, writer }
    }

    #[must_use]
    pub const fn key(&self) -> &str {
        self.key
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.writer.view().config()
    }

    #[must_use]
    pub fn progress(&self) -> i32 {
        self.writer.view().progress(self.key)
    }

    #[must_use]
    pub fn target(&self) -> i32 {
        self.writer.view().target(self.key)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.writer.view().is_complete(self.key)
    }

    /// Progress of any other feat in the catalog.
    #[must_use]
    pub fn progress_of(&self, feat_key: &str) -> i32 {
        self.writer.view().progress(feat_key)
    }

    pub fn set_progress(&mut self, amount: i32) {
        self.writer.set_progress(self.key, amount);
    }

    pub fn advance(&mut self, delta: i32) -> i32 {
        self.writer.advance(self.key, delta)
    }

    /// Persisted per-feat scratch value; 0 when never written.
    #[must_use]
    pub fn scratch(&self, slot: &str) -> i32 {
        self.writer.scratch(self.key, slot)
    }

    pub fn set_scratch(&mut self, slot: &str, value: i32) {
        self.writer.set_scratch(self.key, slot, value);
    }

    pub fn clear_scratch(&mut self, slot: &str) {
        self.writer.clear_scratch(self.key, slot);
    }
}
