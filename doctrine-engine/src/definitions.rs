//! Immutable doctrine and feat definitions produced by the catalog builder.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Cell a doctrine occupies in the doctrine tree.
///
/// Ordering is column-major so sorting positions yields the catalog order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPosition {
    pub column: i32,
    pub row: i32,
}

impl GridPosition {
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Cell directly above this one, if there is a row above.
    #[must_use]
    pub const fn above(self) -> Option<Self> {
        if self.row > 0 {
            Some(Self::new(self.column, self.row - 1))
        } else {
            None
        }
    }
}

/// A single objective guarding a doctrine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatDefinition {
    /// Stable key, namespaced under the owning doctrine.
    pub key: String,
    pub description: String,
    /// Progress value at which the feat counts as complete.
    /// Zero or less means the feat is trivially complete.
    pub target: i32,
}

impl FeatDefinition {
    #[must_use]
    pub const fn is_trivial(&self) -> bool {
        self.target <= 0
    }
}

/// Feats owned by a doctrine. Most doctrines carry three or fewer.
pub type FeatList = SmallVec<[FeatDefinition; 4]>;

/// An unlockable node of the doctrine grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctrineDefinition {
    pub key: String,
    pub name: String,
    pub description: String,
    pub position: GridPosition,
    /// Key of the doctrine directly above in the same column, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite_key: Option<String>,
    pub gold_cost: i64,
    pub influence_cost: i64,
    #[serde(default)]
    pub feats: FeatList,
}

impl DoctrineDefinition {
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.position.column
    }

    #[must_use]
    pub const fn row(&self) -> i32 {
        self.position.row
    }

    #[must_use]
    pub fn feat(&self, feat_key: &str) -> Option<&FeatDefinition> {
        self.feats.iter().find(|feat| feat.key == feat_key)
    }

    #[must_use]
    pub fn feat_keys(&self) -> impl Iterator<Item = &str> {
        self.feats.iter().map(|feat| feat.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_sort_by_column_then_row() {
        let mut cells = vec![
            GridPosition::new(1, 0),
            GridPosition::new(0, 2),
            GridPosition::new(0, 0),
            GridPosition::new(1, 1),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                GridPosition::new(0, 0),
                GridPosition::new(0, 2),
                GridPosition::new(1, 0),
                GridPosition::new(1, 1),
            ]
        );
    }

    #[test]
    fn top_row_has_nothing_above() {
        assert_eq!(GridPosition::new(3, 0).above(), None);
        assert_eq!(
            GridPosition::new(3, 2).above(),
            Some(GridPosition::new(3, 1))
        );
    }

    #[test]
    fn feat_lookup_by_key() {
        let doctrine = DoctrineDefinition {
            key: "iron_discipline".into(),
            name: "Iron Discipline".into(),
            description: "+5% skill cap.".into(),
            position: GridPosition::new(2, 0),
            prerequisite_key: None,
            gold_cost: 1000,
            influence_cost: 0,
            feats: smallvec::smallvec![FeatDefinition {
                key: "iron_discipline.drill".into(),
                description: "Drill".into(),
                target: 3,
            }],
        };
        assert_eq!(doctrine.column(), 2);
        assert_eq!(doctrine.row(), 0);
        assert!(doctrine.feat("iron_discipline.drill").is_some());
        assert!(doctrine.feat("missing").is_none());
        assert_eq!(
            doctrine.feat_keys().collect::<Vec<_>>(),
            vec!["iron_discipline.drill"]
        );
    }
}
