//! Registration table of doctrine constructors.
//!
//! The registry is the only place doctrines are discovered from. Entries keep
//! their registration order so catalog builds are deterministic.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::definitions::GridPosition;
use crate::error::CatalogError;
use crate::feat::{FeatFactory, feat_factory};
use crate::rules::{FeatRule, RuleFeat};

/// A doctrine implementation as the catalog builder sees it.
pub trait DoctrineBlueprint {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn position(&self) -> GridPosition;

    fn gold_cost(&self) -> i64 {
        0
    }

    fn influence_cost(&self) -> i64 {
        0
    }

    /// Constructors for the feats guarding this doctrine.
    fn feats(&self) -> Vec<FeatFactory>;

    /// External condition under which the doctrine is considered granted.
    fn is_disabled(&self, _config: &EngineConfig) -> bool {
        false
    }

    fn disabled_message(&self, _config: &EngineConfig) -> Option<&str> {
        None
    }
}

/// Constructor for a doctrine implementation.
pub type DoctrineFactory = Rc<dyn Fn() -> Result<Box<dyn DoctrineBlueprint>, CatalogError>>;

#[derive(Clone)]
struct RegistryEntry {
    key: String,
    factory: DoctrineFactory,
}

#[derive(Clone, Default)]
pub struct DoctrineRegistry {
    entries: Vec<RegistryEntry>,
}

impl fmt::Debug for DoctrineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.key.as_str()))
            .finish()
    }
}

impl DoctrineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a doctrine constructor under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateDoctrine`] if the key is taken.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> Result<(), CatalogError>
    where
        F: Fn() -> Result<Box<dyn DoctrineBlueprint>, CatalogError> + 'static,
    {
        let key = key.into();
        if self.contains(&key) {
            return Err(CatalogError::DuplicateDoctrine(key));
        }
        self.entries.push(RegistryEntry {
            key,
            factory: Rc::new(factory),
        });
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &DoctrineFactory)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), &entry.factory))
    }

    /// Build a registry from declarative doctrine descriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if two descriptions share a key.
    pub fn from_specs(specs: Vec<DoctrineSpec>) -> Result<Self, CatalogError> {
        let mut registry = Self::new();
        for spec in specs {
            let key = spec.key.clone();
            let spec = Rc::new(spec);
            registry.register(key, move || {
                Ok(Box::new(DataDoctrine::new(Rc::clone(&spec))) as Box<dyn DoctrineBlueprint>)
            })?;
        }
        Ok(registry)
    }

    /// Parse catalog content from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or declares a key twice.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;
        Self::from_specs(data.doctrines)
    }

    /// Registry over the catalog bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        const CATALOG_JSON: &str = include_str!("../data/doctrines.json");
        Self::from_json(CATALOG_JSON).unwrap_or_default()
    }
}

/// Top-level shape of catalog JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub doctrines: Vec<DoctrineSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctrineSpec {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub column: i32,
    pub row: i32,
    #[serde(default)]
    pub gold_cost: i64,
    #[serde(default)]
    pub influence_cost: i64,
    /// Config flags that, when any is set, disable this doctrine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_when: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_message: Option<String>,
    #[serde(default)]
    pub feats: Vec<FeatSpec>,
}

impl DoctrineSpec {
    /// Feat keys are namespaced under their doctrine: `<doctrine>.<feat id>`.
    #[must_use]
    pub fn feat_key(&self, feat: &FeatSpec) -> String {
        format!("{}.{}", self.key, feat.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatSpec {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub target: i32,
    pub rule: FeatRule,
}

/// Blueprint backed by a [`DoctrineSpec`].
struct DataDoctrine {
    spec: Rc<DoctrineSpec>,
}

impl DataDoctrine {
    const fn new(spec: Rc<DoctrineSpec>) -> Self {
        Self { spec }
    }
}

impl DoctrineBlueprint for DataDoctrine {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn position(&self) -> GridPosition {
        GridPosition::new(self.spec.column, self.spec.row)
    }

    fn gold_cost(&self) -> i64 {
        self.spec.gold_cost
    }

    fn influence_cost(&self) -> i64 {
        self.spec.influence_cost
    }

    fn feats(&self) -> Vec<FeatFactory> {
        self.spec
            .feats
            .iter()
            .map(|feat| {
                feat_factory(RuleFeat::new(
                    self.spec.feat_key(feat),
                    feat.description.clone(),
                    feat.target,
                    feat.rule.clone(),
                ))
            })
            .collect()
    }

    fn is_disabled(&self, config: &EngineConfig) -> bool {
        config.any_flag(self.spec.disabled_when.iter().map(String::as_str))
    }

    fn disabled_message(&self, config: &EngineConfig) -> Option<&str> {
        if self.is_disabled(config) {
            self.spec.disabled_message.as_deref()
        } else {
            None
        }
    }
}
