//! Host-controlled switches that shape doctrine gating.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine configuration. Every field has a default so partial JSON loads cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// When false, feats never gate a doctrine and no feat receives events.
    #[serde(default = "EngineConfig::default_enable_feat_requirements")]
    pub enable_feat_requirements: bool,
    /// Faction whose settlement acquisitions are forwarded to feats.
    #[serde(default = "EngineConfig::default_observed_faction")]
    pub observed_faction: String,
    /// Hero id of the observing player, used to recognise tournament wins.
    #[serde(default = "EngineConfig::default_player_hero")]
    pub player_hero: String,
    /// Named host switches. Doctrines list the flags that disable them.
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

impl EngineConfig {
    const fn default_enable_feat_requirements() -> bool {
        true
    }

    fn default_observed_faction() -> String {
        String::from("player")
    }

    fn default_player_hero() -> String {
        String::from("main_hero")
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Current value of a named flag; unknown flags read as false.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set_flag(name, value);
        self
    }

    #[must_use]
    pub const fn with_feat_requirements(mut self, enabled: bool) -> Self {
        self.enable_feat_requirements = enabled;
        self
    }

    /// True when any of the named flags is set.
    #[must_use]
    pub fn any_flag<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|name| self.flag(name))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_feat_requirements: Self::default_enable_feat_requirements(),
            observed_faction: Self::default_observed_faction(),
            player_hero: Self::default_player_hero(),
            flags: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "flags": { "all_equipment_unlocked": true } }"#)
            .expect("parse config");
        assert!(cfg.enable_feat_requirements);
        assert_eq!(cfg.observed_faction, "player");
        assert_eq!(cfg.player_hero, "main_hero");
        assert!(cfg.flag("all_equipment_unlocked"));
        assert!(!cfg.flag("unknown"));
    }

    #[test]
    fn any_flag_checks_each_name() {
        let cfg = EngineConfig::default().with_flag("b", true);
        assert!(cfg.any_flag(["a", "b"]));
        assert!(!cfg.any_flag(["a", "c"]));
        assert!(!cfg.any_flag(std::iter::empty()));
    }
}
