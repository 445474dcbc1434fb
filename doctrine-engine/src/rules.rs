//! Declarative feat rules matched against event payloads.
//!
//! The bundled catalog describes every feat as a [`FeatRule`]; [`RuleFeat`]
//! turns that description into a [`Feat`] the router can drive.
use serde::{Deserialize, Serialize};

use crate::error::FeatError;
use crate::events::{
    ArenaContext, BattleContext, ChangeDetail, DomainEvent, EventKind, KillRecord, QuestOutcome,
    Recruitment, SettlementOwnerChange, TournamentResult, TroopUpgrade,
};
use crate::feat::{Feat, FeatContext};

const BATTLE_END: &[EventKind] = &[EventKind::BattleEnd];
const BATTLE_SPAN: &[EventKind] = &[EventKind::BattleStart, EventKind::BattleEnd];

/// Scratch slot holding a flag or count captured at battle start.
const AT_START_SLOT: &str = "at_battle_start";

/// Who has to land a kill for it to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSource {
    #[default]
    Player,
    /// The player or any troop of the player's party.
    PlayerParty,
    Retinue,
}

impl KillSource {
    #[must_use]
    pub const fn credits(self, kill: &KillRecord) -> bool {
        if !kill.victim_is_enemy {
            return false;
        }
        match self {
            Self::Player => kill.killer_is_player,
            Self::PlayerParty => kill.killer_is_player || kill.killer_is_player_troop,
            Self::Retinue => kill.killer_is_retinue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatRule {
    /// +1 per won battle matching the filters.
    BattleVictories {
        #[serde(default)]
        min_enemies: u32,
        #[serde(default)]
        hideout_only: bool,
        /// Require more enemies than friendly troops.
        #[serde(default)]
        outnumbered: bool,
    },
    /// Cumulative enemy casualties by the given source.
    Kills {
        #[serde(default)]
        by: KillSource,
    },
    /// Best casualty count by the given source in a single won battle.
    BestBattleKills {
        #[serde(default)]
        by: KillSource,
    },
    /// Win without losing a single troop.
    FlawlessVictory {
        #[serde(default)]
        min_enemies: u32,
    },
    /// Win a battle entered with wounded retinues, losing no troop.
    WoundedSurvivors,
    /// Win a battle that started with enemies outnumbering friendlies `ratio` to one.
    TurnTheTide { ratio: u32 },
    ArenaWins,
    TournamentWins {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        culture: Option<String>,
    },
    Quests {
        #[serde(default = "FeatRule::default_successful_only")]
        successful_only: bool,
        /// Giver must belong to the observed faction.
        #[serde(default)]
        allied_giver: bool,
        #[serde(default)]
        merchant_giver: bool,
    },
    SettlementsAcquired {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<ChangeDetail>,
        #[serde(default)]
        towns_only: bool,
    },
    Recruits {
        #[serde(default)]
        min_tier: u8,
        #[serde(default)]
        retinue_only: bool,
    },
    Upgrades {
        #[serde(default)]
        min_tier: u8,
    },
    /// +1 per daily tick.
    DaysElapsed,
}

impl FeatRule {
    const fn default_successful_only() -> bool {
        true
    }

    #[must_use]
    pub const fn interests(&self) -> &'static [EventKind] {
        match self {
            Self::BattleVictories { .. }
            | Self::Kills { .. }
            | Self::BestBattleKills { .. }
            | Self::FlawlessVictory { .. } => BATTLE_END,
            Self::WoundedSurvivors | Self::TurnTheTide { .. } => BATTLE_SPAN,
            Self::ArenaWins => &[EventKind::ArenaEnd],
            Self::TournamentWins { .. } => &[EventKind::TournamentFinished],
            Self::Quests { .. } => &[EventKind::QuestCompleted],
            Self::SettlementsAcquired { .. } => &[EventKind::SettlementOwnerChanged],
            Self::Recruits { .. } => &[EventKind::UnitRecruited],
            Self::Upgrades { .. } => &[EventKind::TroopUpgraded],
            Self::DaysElapsed => &[EventKind::DailyTick],
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BattleVictories { .. } => "battle_victories",
            Self::Kills { .. } => "kills",
            Self::BestBattleKills { .. } => "best_battle_kills",
            Self::FlawlessVictory { .. } => "flawless_victory",
            Self::WoundedSurvivors => "wounded_survivors",
            Self::TurnTheTide { .. } => "turn_the_tide",
            Self::ArenaWins => "arena_wins",
            Self::TournamentWins { .. } => "tournament_wins",
            Self::Quests { .. } => "quests",
            Self::SettlementsAcquired { .. } => "settlements_acquired",
            Self::Recruits { .. } => "recruits",
            Self::Upgrades { .. } => "upgrades",
            Self::DaysElapsed => "days_elapsed",
        }
    }
}

fn clamp_count(count: impl TryInto<i32>) -> i32 {
    count.try_into().unwrap_or(i32::MAX)
}

/// A feat whose behaviour is entirely described by a [`FeatRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFeat {
    key: String,
    description: String,
    target: i32,
    rule: FeatRule,
}

impl RuleFeat {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        target: i32,
        rule: FeatRule,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            target,
            rule,
        }
    }

    #[must_use]
    pub const fn rule(&self) -> &FeatRule {
        &self.rule
    }

    fn invalid(&self, event: &DomainEvent, reason: impl Into<String>) -> FeatError {
        FeatError::InvalidPayload {
            key: self.key.clone(),
            event: event.kind().key(),
            reason: reason.into(),
        }
    }

    fn on_battle_start(
        &self,
        event: &DomainEvent,
        battle: &BattleContext,
        ctx: &mut FeatContext<'_>,
    ) -> Result<(), FeatError> {
        match &self.rule {
            FeatRule::WoundedSurvivors => {
                ctx.set_scratch(AT_START_SLOT, clamp_count(battle.wounded_retinues));
            }
            FeatRule::TurnTheTide { ratio } => {
                let friendly = battle.friendly_troop_count();
                if friendly == 0 {
                    return Err(self.invalid(event, "battle reports no friendly troops"));
                }
                let outnumbered = u64::from(battle.enemy_troop_count)
                    >= u64::from(*ratio).saturating_mul(friendly);
                ctx.set_scratch(AT_START_SLOT, i32::from(outnumbered));
            }
            _ => {}
        }
        Ok(())
    }

    fn on_battle_end(&self, battle: &BattleContext, ctx: &mut FeatContext<'_>) {
        match &self.rule {
            FeatRule::BattleVictories {
                min_enemies,
                hideout_only,
                outnumbered,
            } => {
                let enemies = u64::from(battle.enemy_troop_count);
                if battle.is_won()
                    && battle.enemy_troop_count >= *min_enemies
                    && (!hideout_only || battle.is_hideout)
                    && (!outnumbered || enemies > battle.friendly_troop_count())
                {
                    ctx.advance(1);
                }
            }
            FeatRule::Kills { by } => {
                ctx.advance(clamp_count(battle.kills_by(|kill| by.credits(kill))));
            }
            FeatRule::BestBattleKills { by } => {
                if battle.is_won() {
                    let kills = clamp_count(battle.kills_by(|kill| by.credits(kill)));
                    if kills > ctx.progress() {
                        ctx.set_progress(kills);
                    }
                }
            }
            FeatRule::FlawlessVictory { min_enemies } => {
                let enemies = u64::from(battle.enemy_troop_count);
                if battle.is_won()
                    && battle.enemy_troop_count >= *min_enemies
                    && !battle.player_troop_died()
                {
                    ctx.advance(1);
                }
            }
            FeatRule::WoundedSurvivors => {
                let wounded = ctx.scratch(AT_START_SLOT);
                ctx.clear_scratch(AT_START_SLOT);
                if battle.is_won() && wounded > 0 && !battle.player_troop_died() {
                    ctx.advance(1);
                }
            }
            FeatRule::TurnTheTide { .. } => {
                let outnumbered = ctx.scratch(AT_START_SLOT) > 0;
                ctx.clear_scratch(AT_START_SLOT);
                if battle.is_won() && outnumbered {
                    ctx.advance(1);
                }
            }
            _ => {}
        }
    }

    fn on_arena_end(&self, arena: &ArenaContext, ctx: &mut FeatContext<'_>) {
        if matches!(self.rule, FeatRule::ArenaWins) && arena.player_won {
            ctx.advance(1);
        }
    }

    fn on_tournament(&self, result: &TournamentResult, ctx: &mut FeatContext<'_>) {
        let FeatRule::TournamentWins { culture } = &self.rule else {
            return;
        };
        if result.winner != ctx.config().player_hero {
            return;
        }
        if culture
            .as_ref()
            .is_some_and(|wanted| result.venue_culture.as_ref() != Some(wanted))
        {
            return;
        }
        ctx.advance(1);
    }

    fn on_quest(&self, quest: &QuestOutcome, ctx: &mut FeatContext<'_>) {
        let FeatRule::Quests {
            successful_only,
            allied_giver,
            merchant_giver,
        } = &self.rule
        else {
            return;
        };
        if *successful_only && !quest.success {
            return;
        }
        if *allied_giver || *merchant_giver {
            let Some(giver) = &quest.giver else {
                return;
            };
            if *allied_giver && giver.faction != ctx.config().observed_faction {
                return;
            }
            if *merchant_giver && !giver.is_merchant {
                return;
            }
        }
        ctx.advance(1);
    }

    fn on_settlement(&self, change: &SettlementOwnerChange, ctx: &mut FeatContext<'_>) {
        let FeatRule::SettlementsAcquired { detail, towns_only } = &self.rule else {
            return;
        };
        if *towns_only && !change.is_town {
            return;
        }
        if detail.is_some_and(|wanted| wanted != change.detail) {
            return;
        }
        ctx.advance(1);
    }

    fn on_recruit(&self, recruitment: &Recruitment, ctx: &mut FeatContext<'_>) {
        let FeatRule::Recruits {
            min_tier,
            retinue_only,
        } = &self.rule
        else {
            return;
        };
        let troop = &recruitment.troop;
        if troop.tier < *min_tier || (*retinue_only && !troop.is_retinue) {
            return;
        }
        ctx.advance(clamp_count(recruitment.count));
    }

    fn on_upgrade(
        &self,
        event: &DomainEvent,
        upgrade: &TroopUpgrade,
        ctx: &mut FeatContext<'_>,
    ) -> Result<(), FeatError> {
        let FeatRule::Upgrades { min_tier } = &self.rule else {
            return Ok(());
        };
        if upgrade.to.tier < upgrade.from.tier {
            return Err(self.invalid(
                event,
                format!(
                    "upgrade goes down from tier {} to {}",
                    upgrade.from.tier, upgrade.to.tier
                ),
            ));
        }
        if upgrade.to.tier >= *min_tier {
            ctx.advance(clamp_count(upgrade.count));
        }
        Ok(())
    }
}

impl Feat for RuleFeat {
    fn key(&self) -> &str {
        &self.key
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn target(&self) -> i32 {
        self.target
    }

    fn interests(&self) -> &[EventKind] {
        self.rule.interests()
    }

    fn handle(&self, event: &DomainEvent, ctx: &mut FeatContext<'_>) -> Result<(), FeatError> {
        match event {
            DomainEvent::DailyTick => {
                if matches!(self.rule, FeatRule::DaysElapsed) {
                    ctx.advance(1);
                }
            }
            DomainEvent::BattleStart(battle) => self.on_battle_start(event, battle, ctx)?,
            DomainEvent::BattleEnd(battle) => self.on_battle_end(battle, ctx),
            DomainEvent::ArenaStart(_) => {}
            DomainEvent::ArenaEnd(arena) => self.on_arena_end(arena, ctx),
            DomainEvent::TournamentFinished(result) => self.on_tournament(result, ctx),
            DomainEvent::SettlementOwnerChanged(change) => self.on_settlement(change, ctx),
            DomainEvent::QuestCompleted(quest) => self.on_quest(quest, ctx),
            DomainEvent::UnitRecruited(recruitment) => self.on_recruit(recruitment, ctx),
            DomainEvent::TroopUpgraded(upgrade) => self.on_upgrade(event, upgrade, ctx)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_decode_from_tagged_json() {
        let rule: FeatRule =
            serde_json::from_str(r#"{ "kind": "recruits", "min_tier": 3 }"#).expect("decode");
        assert_eq!(
            rule,
            FeatRule::Recruits {
                min_tier: 3,
                retinue_only: false
            }
        );

        let quests: FeatRule = serde_json::from_str(r#"{ "kind": "quests" }"#).expect("decode");
        assert!(matches!(
            quests,
            FeatRule::Quests {
                successful_only: true,
                ..
            }
        ));
    }

    #[test]
    fn interests_follow_the_rule_kind() {
        assert_eq!(FeatRule::DaysElapsed.interests(), &[EventKind::DailyTick]);
        assert_eq!(
            FeatRule::TurnTheTide { ratio: 2 }.interests(),
            &[EventKind::BattleStart, EventKind::BattleEnd]
        );
        let feat = RuleFeat::new("a.b", "desc", 2, FeatRule::ArenaWins);
        assert_eq!(feat.interests(), &[EventKind::ArenaEnd]);
        assert_eq!(feat.key(), "a.b");
        assert_eq!(feat.target(), 2);
    }

    #[test]
    fn kill_sources_only_credit_enemy_casualties() {
        let retinue_kill = KillRecord {
            killer_is_player_troop: true,
            killer_is_retinue: true,
            victim_is_enemy: true,
            ..KillRecord::default()
        };
        assert!(KillSource::Retinue.credits(&retinue_kill));
        assert!(KillSource::PlayerParty.credits(&retinue_kill));
        assert!(!KillSource::Player.credits(&retinue_kill));

        let friendly_fire = KillRecord {
            killer_is_player: true,
            ..KillRecord::default()
        };
        assert!(!KillSource::Player.credits(&friendly_fire));
    }
}
