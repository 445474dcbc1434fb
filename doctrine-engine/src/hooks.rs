//! Host-facing adapters turning simulation callbacks into feat dispatches.
use log::debug;

use crate::engine::DoctrineEngine;
use crate::events::{
    ArenaContext, BattleContext, DomainEvent, Mission, QuestOutcome, Recruitment,
    SettlementOwnerChange, TournamentResult, TroopUpgrade,
};
use crate::notifications::FeatNotice;
use crate::router::DispatchReport;

impl DoctrineEngine {
    pub fn on_daily_tick(&mut self) -> DispatchReport {
        self.dispatch(&DomainEvent::DailyTick)
    }

    /// Only battles the player takes part in reach feats.
    pub fn on_battle_started(&mut self, battle: BattleContext) -> DispatchReport {
        if !battle.player_involved {
            debug!("battle start ignored: player not involved");
            return DispatchReport::default();
        }
        self.dispatch(&DomainEvent::BattleStart(battle))
    }

    /// Deliver a battle result, then flush any notices it produced.
    pub fn on_battle_ended(&mut self, battle: BattleContext) -> Vec<FeatNotice> {
        self.dispatch(&DomainEvent::BattleEnd(battle));
        self.try_flush_notices()
    }

    pub fn on_arena_started(&mut self, arena: ArenaContext) -> DispatchReport {
        self.dispatch(&DomainEvent::ArenaStart(arena))
    }

    pub fn on_arena_ended(&mut self, arena: ArenaContext) -> Vec<FeatNotice> {
        self.dispatch(&DomainEvent::ArenaEnd(arena));
        self.try_flush_notices()
    }

    pub fn on_tournament_finished(&mut self, result: TournamentResult) -> Vec<FeatNotice> {
        self.dispatch(&DomainEvent::TournamentFinished(result));
        self.try_flush_notices()
    }

    /// Forwarded only when the new owner belongs to the observed faction.
    pub fn on_settlement_owner_changed(&mut self, change: SettlementOwnerChange) -> DispatchReport {
        if change.new_owner.faction != self.config().observed_faction {
            debug!(
                "{} changed hands to {}; not observed",
                change.settlement, change.new_owner.faction
            );
            return DispatchReport::default();
        }
        self.dispatch(&DomainEvent::SettlementOwnerChanged(change))
    }

    pub fn on_quest_completed(&mut self, quest: QuestOutcome) -> DispatchReport {
        self.dispatch(&DomainEvent::QuestCompleted(quest))
    }

    pub fn on_unit_recruited(&mut self, recruitment: Recruitment) -> DispatchReport {
        self.dispatch(&DomainEvent::UnitRecruited(recruitment))
    }

    pub fn on_troop_upgraded(&mut self, upgrade: TroopUpgrade) -> DispatchReport {
        self.dispatch(&DomainEvent::TroopUpgraded(upgrade))
    }

    /// Classify a starting scene. A player battle starts a battle, a combat
    /// mission in startup mode starts an arena fight; notices are held until
    /// the mission ends.
    pub fn on_mission_started(&mut self, mission: Mission) -> DispatchReport {
        self.set_in_mission(true);
        match mission {
            Mission::Battle(battle) => self.on_battle_started(battle),
            Mission::Arena {
                startup_mode: true,
                combat,
            } => self.on_arena_started(combat),
            Mission::Arena { .. } | Mission::Other => DispatchReport::default(),
        }
    }

    /// Close a scene and deliver its result; returns the notices flushed.
    pub fn on_mission_ended(&mut self, mission: Mission) -> Vec<FeatNotice> {
        self.set_in_mission(false);
        match mission {
            Mission::Battle(battle) if battle.player_involved => self.on_battle_ended(battle),
            Mission::Arena {
                startup_mode: true,
                combat,
            } => self.on_arena_ended(combat),
            _ => self.try_flush_notices(),
        }
    }
}
