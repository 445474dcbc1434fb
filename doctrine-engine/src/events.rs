//! Domain event payloads observed from the host simulation.
//!
//! These are plain value records: the host fills them in from its own world
//! state and hands them to the engine's hook adapters.
use serde::{Deserialize, Serialize};

/// Discriminant of a [`DomainEvent`], used by feats to declare interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DailyTick,
    BattleStart,
    BattleEnd,
    ArenaStart,
    ArenaEnd,
    TournamentFinished,
    SettlementOwnerChanged,
    QuestCompleted,
    UnitRecruited,
    TroopUpgraded,
}

impl EventKind {
    pub const ALL: &'static [Self] = &[
        Self::DailyTick,
        Self::BattleStart,
        Self::BattleEnd,
        Self::ArenaStart,
        Self::ArenaEnd,
        Self::TournamentFinished,
        Self::SettlementOwnerChanged,
        Self::QuestCompleted,
        Self::UnitRecruited,
        Self::TroopUpgraded,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::DailyTick => "daily_tick",
            Self::BattleStart => "battle_start",
            Self::BattleEnd => "battle_end",
            Self::ArenaStart => "arena_start",
            Self::ArenaEnd => "arena_end",
            Self::TournamentFinished => "tournament_finished",
            Self::SettlementOwnerChanged => "settlement_owner_changed",
            Self::QuestCompleted => "quest_completed",
            Self::UnitRecruited => "unit_recruited",
            Self::TroopUpgraded => "troop_upgraded",
        }
    }
}

/// Reference to a troop type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TroopRef {
    pub id: String,
    #[serde(default)]
    pub tier: u8,
    #[serde(default)]
    pub is_elite: bool,
    #[serde(default)]
    pub is_retinue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}

impl TroopRef {
    #[must_use]
    pub fn new(id: impl Into<String>, tier: u8) -> Self {
        Self {
            id: id.into(),
            tier,
            ..Self::default()
        }
    }
}

/// How a combatant left the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Killed,
    Wounded,
    Unconscious,
}

/// One casualty recorded during a battle or arena fight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KillRecord {
    #[serde(default)]
    pub state: AgentState,
    /// The player character landed the blow.
    #[serde(default)]
    pub killer_is_player: bool,
    /// A troop of the player's party landed the blow.
    #[serde(default)]
    pub killer_is_player_troop: bool,
    #[serde(default)]
    pub killer_is_retinue: bool,
    #[serde(default)]
    pub victim_is_player_troop: bool,
    #[serde(default)]
    pub victim_is_enemy: bool,
}

/// Snapshot of a field battle as seen from the player's side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleContext {
    #[serde(default)]
    pub player_involved: bool,
    #[serde(default)]
    pub is_lost: bool,
    #[serde(default)]
    pub is_hideout: bool,
    #[serde(default)]
    pub player_troop_count: u32,
    #[serde(default)]
    pub ally_troop_count: u32,
    #[serde(default)]
    pub enemy_troop_count: u32,
    #[serde(default)]
    pub player_is_army_leader: bool,
    #[serde(default)]
    pub ally_in_army: bool,
    #[serde(default)]
    pub enemy_in_army: bool,
    #[serde(default)]
    pub enemy_leaders: Vec<String>,
    /// Wounded retinue troops in the player's roster when the snapshot was taken.
    #[serde(default)]
    pub wounded_retinues: u32,
    #[serde(default)]
    pub kills: Vec<KillRecord>,
}

impl BattleContext {
    #[must_use]
    pub const fn is_won(&self) -> bool {
        !self.is_lost
    }

    /// Player and allied troops together.
    #[must_use]
    pub fn friendly_troop_count(&self) -> u64 {
        u64::from(self.player_troop_count) + u64::from(self.ally_troop_count)
    }

    /// Kills landed by the given source.
    #[must_use]
    pub fn kills_by(&self, predicate: impl Fn(&KillRecord) -> bool) -> usize {
        self.kills.iter().filter(|kill| predicate(kill)).count()
    }

    /// True when any player troop died (not merely wounded).
    #[must_use]
    pub fn player_troop_died(&self) -> bool {
        self.kills
            .iter()
            .any(|kill| kill.state == AgentState::Killed && kill.victim_is_player_troop)
    }
}

/// Arena or duel fight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArenaContext {
    #[serde(default)]
    pub player_won: bool,
    #[serde(default)]
    pub kills: Vec<KillRecord>,
}

/// Result of a finished tournament.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TournamentResult {
    pub winner: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_culture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
}

/// Owner of a settlement before or after a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementOwner {
    pub hero: String,
    pub faction: String,
}

/// How a settlement changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDetail {
    BySiege,
    ByBarter,
    ByGrant,
    ByRebellion,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementOwnerChange {
    pub settlement: String,
    #[serde(default)]
    pub is_town: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_owner: Option<SettlementOwner>,
    pub new_owner: SettlementOwner,
    #[serde(default)]
    pub detail: ChangeDetail,
}

/// Hero who handed out a quest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestGiver {
    pub hero: String,
    #[serde(default)]
    pub faction: String,
    #[serde(default)]
    pub is_party_leader: bool,
    #[serde(default)]
    pub is_merchant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestOutcome {
    pub quest_id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub giver: Option<QuestGiver>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recruitment {
    pub troop: TroopRef,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TroopUpgrade {
    pub from: TroopRef,
    pub to: TroopRef,
    pub count: u32,
}

/// An event forwarded to live feats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    DailyTick,
    BattleStart(BattleContext),
    BattleEnd(BattleContext),
    ArenaStart(ArenaContext),
    ArenaEnd(ArenaContext),
    TournamentFinished(TournamentResult),
    SettlementOwnerChanged(SettlementOwnerChange),
    QuestCompleted(QuestOutcome),
    UnitRecruited(Recruitment),
    TroopUpgraded(TroopUpgrade),
}

impl DomainEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DailyTick => EventKind::DailyTick,
            Self::BattleStart(_) => EventKind::BattleStart,
            Self::BattleEnd(_) => EventKind::BattleEnd,
            Self::ArenaStart(_) => EventKind::ArenaStart,
            Self::ArenaEnd(_) => EventKind::ArenaEnd,
            Self::TournamentFinished(_) => EventKind::TournamentFinished,
            Self::SettlementOwnerChanged(_) => EventKind::SettlementOwnerChanged,
            Self::QuestCompleted(_) => EventKind::QuestCompleted,
            Self::UnitRecruited(_) => EventKind::UnitRecruited,
            Self::TroopUpgraded(_) => EventKind::TroopUpgraded,
        }
    }
}

/// A scene the player enters, as reported by the host's mission callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mission", rename_all = "snake_case")]
pub enum Mission {
    /// Field battle; only player-involved battles reach feats.
    Battle(BattleContext),
    /// Combat mission such as an arena bout or duel.
    Arena {
        startup_mode: bool,
        combat: ArenaContext,
    },
    /// Any other scene (town walk, conversation, ...).
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_troops_sum_without_overflow() {
        let battle = BattleContext {
            player_troop_count: u32::MAX,
            ally_troop_count: u32::MAX,
            ..BattleContext::default()
        };
        assert_eq!(battle.friendly_troop_count(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(DomainEvent::DailyTick.kind(), EventKind::DailyTick);
        assert_eq!(
            DomainEvent::BattleEnd(BattleContext::default()).kind(),
            EventKind::BattleEnd
        );
        assert_eq!(
            DomainEvent::TroopUpgraded(TroopUpgrade::default()).kind(),
            EventKind::TroopUpgraded
        );
    }

    #[test]
    fn events_decode_from_tagged_json() {
        let json = r#"{ "event": "unit_recruited", "troop": { "id": "imperial_recruit", "tier": 1 }, "count": 4 }"#;
        let event: DomainEvent = serde_json::from_str(json).expect("decode event");
        match event {
            DomainEvent::UnitRecruited(recruitment) => {
                assert_eq!(recruitment.troop.id, "imperial_recruit");
                assert_eq!(recruitment.count, 4);
                assert!(!recruitment.troop.is_retinue);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let tick: DomainEvent = serde_json::from_str(r#"{ "event": "daily_tick" }"#).unwrap();
        assert_eq!(tick, DomainEvent::DailyTick);
    }

    #[test]
    fn battle_helpers_count_kills_and_deaths() {
        let battle = BattleContext {
            kills: vec![
                KillRecord {
                    killer_is_player_troop: true,
                    killer_is_retinue: true,
                    victim_is_enemy: true,
                    ..KillRecord::default()
                },
                KillRecord {
                    state: AgentState::Wounded,
                    victim_is_player_troop: true,
                    ..KillRecord::default()
                },
            ],
            ..BattleContext::default()
        };
        assert_eq!(battle.kills_by(|kill| kill.killer_is_retinue), 1);
        assert!(!battle.player_troop_died());
        assert!(battle.is_won());
    }

    #[test]
    fn every_kind_has_a_distinct_key() {
        let mut keys: Vec<_> = EventKind::ALL.iter().map(|kind| kind.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), EventKind::ALL.len());
    }
}
