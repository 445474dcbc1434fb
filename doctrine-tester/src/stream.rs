//! Seeded streams of host callbacks.
use doctrine_engine::{
    AgentState, ArenaContext, BattleContext, ChangeDetail, DoctrineEngine, KillRecord, Mission,
    QuestGiver, QuestOutcome, Recruitment, SettlementOwner, SettlementOwnerChange,
    TournamentResult, TroopRef, TroopUpgrade,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const FACTIONS: &[&str] = &["player", "vlandia", "empire", "sturgia", "battania"];
const CULTURES: &[&str] = &["vlandia", "empire", "sturgia", "battania", "aserai"];
const HEROES: &[&str] = &["main_hero", "derthert", "rhagaea", "raganvad", "caladog"];

/// One callback the host simulation would make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    DailyTick,
    /// A battle fought as a mission: start, then end with the same context.
    Battle(BattleContext),
    /// Startup-mode combat mission.
    Arena(ArenaContext),
    Tournament(TournamentResult),
    Settlement(SettlementOwnerChange),
    Quest(QuestOutcome),
    Recruit(Recruitment),
    Upgrade(TroopUpgrade),
}

impl HostCall {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DailyTick => "daily_tick",
            Self::Battle(_) => "battle",
            Self::Arena(_) => "arena",
            Self::Tournament(_) => "tournament",
            Self::Settlement(_) => "settlement",
            Self::Quest(_) => "quest",
            Self::Recruit(_) => "recruit",
            Self::Upgrade(_) => "upgrade",
        }
    }

    /// Drive `engine` through this call; returns the notices flushed.
    pub fn apply(self, engine: &mut DoctrineEngine) -> usize {
        match self {
            Self::DailyTick => {
                engine.on_daily_tick();
                0
            }
            Self::Battle(battle) => {
                engine.on_mission_started(Mission::Battle(battle.clone()));
                engine.on_mission_ended(Mission::Battle(battle)).len()
            }
            Self::Arena(combat) => {
                engine.on_mission_started(Mission::Arena {
                    startup_mode: true,
                    combat: ArenaContext::default(),
                });
                engine
                    .on_mission_ended(Mission::Arena {
                        startup_mode: true,
                        combat,
                    })
                    .len()
            }
            Self::Tournament(result) => engine.on_tournament_finished(result).len(),
            Self::Settlement(change) => {
                engine.on_settlement_owner_changed(change);
                0
            }
            Self::Quest(quest) => {
                engine.on_quest_completed(quest);
                0
            }
            Self::Recruit(recruitment) => {
                engine.on_unit_recruited(recruitment);
                0
            }
            Self::Upgrade(upgrade) => {
                engine.on_troop_upgraded(upgrade);
                0
            }
        }
    }
}

/// Deterministic generator of plausible host callbacks.
pub struct EventStream {
    rng: ChaCha20Rng,
}

impl EventStream {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn next_call(&mut self) -> HostCall {
        match self.rng.gen_range(0..100) {
            0..=34 => HostCall::DailyTick,
            35..=54 => HostCall::Battle(self.battle()),
            55..=62 => HostCall::Arena(self.arena()),
            63..=67 => HostCall::Tournament(self.tournament()),
            68..=73 => HostCall::Settlement(self.settlement()),
            74..=83 => HostCall::Quest(self.quest()),
            84..=91 => HostCall::Recruit(self.recruitment()),
            _ => HostCall::Upgrade(self.upgrade()),
        }
    }

    /// Sample `n` calls.
    pub fn take(&mut self, n: usize) -> Vec<HostCall> {
        (0..n).map(|_| self.next_call()).collect()
    }

    /// Pick an index below `len`; `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }

    fn one_of(&mut self, options: &[&str]) -> String {
        options
            .choose(&mut self.rng)
            .map_or_else(String::new, |value| (*value).to_string())
    }

    fn kill(&mut self) -> KillRecord {
        let enemy = self.rng.gen_bool(0.7);
        let player_side_killer = enemy;
        let by_player = player_side_killer && self.rng.gen_bool(0.3);
        KillRecord {
            state: *[AgentState::Killed, AgentState::Wounded, AgentState::Unconscious]
                .choose(&mut self.rng)
                .unwrap_or(&AgentState::Killed),
            killer_is_player: by_player,
            killer_is_player_troop: player_side_killer && !by_player,
            killer_is_retinue: player_side_killer && !by_player && self.rng.gen_bool(0.4),
            victim_is_player_troop: !enemy,
            victim_is_enemy: enemy,
        }
    }

    fn battle(&mut self) -> BattleContext {
        let player_troop_count = self.rng.gen_range(0..120);
        let ally_troop_count = if self.rng.gen_bool(0.3) {
            self.rng.gen_range(0..200)
        } else {
            0
        };
        let enemy_troop_count = self.rng.gen_range(1..300);
        let kill_count = self.rng.gen_range(0..60);
        BattleContext {
            player_involved: self.rng.gen_bool(0.85),
            is_lost: self.rng.gen_bool(0.25),
            is_hideout: self.rng.gen_bool(0.1),
            player_troop_count,
            ally_troop_count,
            enemy_troop_count,
            player_is_army_leader: self.rng.gen_bool(0.2),
            ally_in_army: ally_troop_count > 0,
            enemy_in_army: self.rng.gen_bool(0.2),
            enemy_leaders: if self.rng.gen_bool(0.3) {
                vec![self.one_of(&HEROES[1..])]
            } else {
                Vec::new()
            },
            wounded_retinues: if self.rng.gen_bool(0.3) {
                self.rng.gen_range(1..10)
            } else {
                0
            },
            kills: (0..kill_count).map(|_| self.kill()).collect(),
        }
    }

    fn arena(&mut self) -> ArenaContext {
        let kills = self.rng.gen_range(0..5);
        ArenaContext {
            player_won: self.rng.gen_bool(0.5),
            kills: (0..kills).map(|_| self.kill()).collect(),
        }
    }

    fn tournament(&mut self) -> TournamentResult {
        let winner = self.one_of(HEROES);
        let mut participants: Vec<String> = HEROES.iter().map(|hero| (*hero).to_string()).collect();
        participants.shuffle(&mut self.rng);
        TournamentResult {
            winner,
            participants,
            venue: format!("town_{}", self.rng.gen_range(1..40)),
            venue_culture: Some(self.one_of(CULTURES)),
            prize: self.rng.gen_bool(0.5).then(|| "noble_horse".to_string()),
        }
    }

    fn settlement(&mut self) -> SettlementOwnerChange {
        let detail = *[
            ChangeDetail::BySiege,
            ChangeDetail::ByBarter,
            ChangeDetail::ByGrant,
            ChangeDetail::ByRebellion,
            ChangeDetail::Other,
        ]
        .choose(&mut self.rng)
        .unwrap_or(&ChangeDetail::Other);
        SettlementOwnerChange {
            settlement: format!("settlement_{}", self.rng.gen_range(1..80)),
            is_town: self.rng.gen_bool(0.4),
            old_owner: Some(SettlementOwner {
                hero: self.one_of(&HEROES[1..]),
                faction: self.one_of(&FACTIONS[1..]),
            }),
            new_owner: SettlementOwner {
                hero: self.one_of(HEROES),
                faction: self.one_of(FACTIONS),
            },
            detail,
        }
    }

    fn quest(&mut self) -> QuestOutcome {
        QuestOutcome {
            quest_id: format!("quest_{}", self.rng.gen_range(1..500)),
            success: self.rng.gen_bool(0.7),
            giver: self.rng.gen_bool(0.9).then(|| QuestGiver {
                hero: self.one_of(&HEROES[1..]),
                faction: self.one_of(FACTIONS),
                is_party_leader: self.rng.gen_bool(0.3),
                is_merchant: self.rng.gen_bool(0.3),
            }),
        }
    }

    fn troop(&mut self, tier: u8) -> TroopRef {
        TroopRef {
            id: format!("troop_t{tier}_{}", self.rng.gen_range(0..6)),
            tier,
            is_elite: self.rng.gen_bool(0.2),
            is_retinue: self.rng.gen_bool(0.3),
            culture: Some(self.one_of(CULTURES)),
        }
    }

    fn recruitment(&mut self) -> Recruitment {
        let tier = self.rng.gen_range(1..=4);
        Recruitment {
            troop: self.troop(tier),
            count: self.rng.gen_range(1..12),
        }
    }

    fn upgrade(&mut self) -> TroopUpgrade {
        let from_tier = self.rng.gen_range(1..=5);
        TroopUpgrade {
            from: self.troop(from_tier),
            to: self.troop(from_tier + 1),
            count: self.rng.gen_range(1..8),
        }
    }
}
