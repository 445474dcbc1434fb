//! Catalog discovery and building.
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::definitions::{DoctrineDefinition, FeatDefinition, FeatList, GridPosition};
use crate::error::CatalogError;
use crate::feat::{Feat, FeatFactory};
use crate::registry::{DoctrineBlueprint, DoctrineFactory, DoctrineRegistry};

/// A doctrine that instantiated cleanly and is waiting to be placed.
struct Discovered {
    definition: DoctrineDefinition,
    blueprint: Box<dyn DoctrineBlueprint>,
    feat_factories: Vec<(String, FeatFactory)>,
}

/// Immutable doctrine catalog for one session.
#[derive(Default)]
pub struct Catalog {
    doctrines: Vec<DoctrineDefinition>,
    by_key: HashMap<String, usize>,
    by_position: HashMap<GridPosition, usize>,
    /// Feat key -> index of the owning doctrine.
    feat_owner: HashMap<String, usize>,
    feat_factories: HashMap<String, FeatFactory>,
    blueprints: Vec<Box<dyn DoctrineBlueprint>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("doctrines", &self.doctrines)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Instantiate every registered doctrine and derive the grid.
    ///
    /// Doctrines that fail to instantiate, or that collide with an earlier
    /// doctrine's grid cell or feat keys, are logged and left out.
    #[must_use]
    pub fn build(registry: &DoctrineRegistry) -> Self {
        let mut discovered = Vec::with_capacity(registry.len());
        let mut seen_feats: HashSet<String> = HashSet::new();

        for (key, factory) in registry.entries() {
            let doctrine = match Self::discover(key, factory) {
                Ok(doctrine) => doctrine,
                Err(err) => {
                    warn!("skipping doctrine {key}: {err}");
                    continue;
                }
            };
            if let Some(clash) = doctrine
                .feat_factories
                .iter()
                .find(|(feat_key, _)| seen_feats.contains(feat_key))
            {
                let err = CatalogError::DuplicateFeat(clash.0.clone());
                warn!("skipping doctrine {key}: {err}");
                continue;
            }
            seen_feats.extend(doctrine.feat_factories.iter().map(|(k, _)| k.clone()));
            discovered.push(doctrine);
        }

        discovered.sort_by_key(|doctrine| doctrine.definition.position);

        let mut catalog = Self::default();
        for doctrine in discovered {
            let position = doctrine.definition.position;
            if let Some(&holder) = catalog.by_position.get(&position) {
                let err = CatalogError::DuplicatePosition {
                    key: doctrine.definition.key.clone(),
                    holder: catalog.doctrines[holder].key.clone(),
                    column: position.column,
                    row: position.row,
                };
                warn!("skipping doctrine {}: {err}", doctrine.definition.key);
                continue;
            }
            let index = catalog.doctrines.len();
            catalog.by_position.insert(position, index);
            catalog.by_key.insert(doctrine.definition.key.clone(), index);
            for (feat_key, factory) in doctrine.feat_factories {
                catalog.feat_owner.insert(feat_key.clone(), index);
                catalog.feat_factories.insert(feat_key, factory);
            }
            catalog.doctrines.push(doctrine.definition);
            catalog.blueprints.push(doctrine.blueprint);
        }

        catalog.link_prerequisites();
        debug!(
            "catalog built: {} doctrines, {} feats",
            catalog.doctrines.len(),
            catalog.feat_owner.len()
        );
        catalog
    }

    fn discover(key: &str, factory: &DoctrineFactory) -> Result<Discovered, CatalogError> {
        let blueprint = factory()?;
        let mut feats = FeatList::new();
        let mut feat_factories = Vec::new();

        for feat_factory in blueprint.feats() {
            let feat: Box<dyn Feat> = feat_factory()?;
            if feats.iter().any(|known: &FeatDefinition| known.key == feat.key()) {
                return Err(CatalogError::DuplicateFeat(feat.key().to_string()));
            }
            feats.push(FeatDefinition {
                key: feat.key().to_string(),
                description: feat.description().to_string(),
                target: feat.target(),
            });
            feat.on_register();
            feat_factories.push((feat.key().to_string(), feat_factory));
        }

        let definition = DoctrineDefinition {
            key: key.to_string(),
            name: blueprint.name().to_string(),
            description: blueprint.description().to_string(),
            position: blueprint.position(),
            prerequisite_key: None,
            gold_cost: blueprint.gold_cost(),
            influence_cost: blueprint.influence_cost(),
            feats,
        };
        Ok(Discovered {
            definition,
            blueprint,
            feat_factories,
        })
    }

    /// Row 0 has no prerequisite; every other cell points at the cell above, if occupied.
    fn link_prerequisites(&mut self) {
        let links: Vec<Option<String>> = self
            .doctrines
            .iter()
            .map(|doctrine| {
                doctrine
                    .position
                    .above()
                    .and_then(|above| self.at(above))
                    .map(|parent| parent.key.clone())
            })
            .collect();
        for (doctrine, prerequisite) in self.doctrines.iter_mut().zip(links) {
            doctrine.prerequisite_key = prerequisite;
        }
    }

    #[must_use]
    pub fn doctrines(&self) -> &[DoctrineDefinition] {
        &self.doctrines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.doctrines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doctrines.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DoctrineDefinition> {
        self.by_key.get(key).map(|&index| &self.doctrines[index])
    }

    #[must_use]
    pub fn at(&self, position: GridPosition) -> Option<&DoctrineDefinition> {
        self.by_position
            .get(&position)
            .map(|&index| &self.doctrines[index])
    }

    #[must_use]
    pub fn owner_of(&self, feat_key: &str) -> Option<&DoctrineDefinition> {
        self.feat_owner
            .get(feat_key)
            .map(|&index| &self.doctrines[index])
    }

    #[must_use]
    pub fn feat_definition(&self, feat_key: &str) -> Option<&FeatDefinition> {
        self.owner_of(feat_key)?.feat(feat_key)
    }

    pub fn feat_keys(&self) -> impl Iterator<Item = &str> {
        self.doctrines.iter().flat_map(|doctrine| doctrine.feat_keys())
    }

    /// Fresh instance of a feat; `None` when the key is not in the catalog.
    #[must_use]
    pub fn instantiate_feat(&self, feat_key: &str) -> Option<Result<Box<dyn Feat>, CatalogError>> {
        self.feat_factories.get(feat_key).map(|factory| factory())
    }

    #[must_use]
    pub fn is_disabled(&self, key: &str, config: &EngineConfig) -> bool {
        self.by_key
            .get(key)
            .is_some_and(|&index| self.blueprints[index].is_disabled(config))
    }

    #[must_use]
    pub fn disabled_message(&self, key: &str, config: &EngineConfig) -> Option<&str> {
        let index = *self.by_key.get(key)?;
        self.blueprints[index].disabled_message(config)
    }
}
