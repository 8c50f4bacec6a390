//! # Combat
//!
//! Hunger-attrition fights between a player and an enemy or boss.
//!
//! Each side has a hunger counter and a ceiling. A round goes to the player
//! with probability `hit_chance` percent and raises the enemy's hunger,
//! otherwise the player's hunger rises. Whoever reaches their ceiling first
//! loses. Knowledge checks can replace rounds, and a player can always try
//! to run.
//!
//! [`CombatResolver`] holds the pure state transitions. Store access, team
//! credit and idempotency live in [`crate::engine`].

pub mod knowledge;
pub mod stats;

pub use knowledge::*;
pub use stats::*;

use crate::config::CombatConfig;
use crate::game::{
    ChoiceLetter, Enemy, EnemyId, Player, PlayerId, Position, QuestId, QuestInstanceId,
    TerrainType,
};
use crate::{SquireError, SquireResult};
use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A regular enemy met on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyEncounter {
    pub enemy_id: EnemyId,
    /// Quest being played when the enemy showed up
    pub quest_id: QuestId,
    pub position: Position,
    pub terrain: Option<TerrainType>,
}

/// A quest's boss, met at its lair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossEncounter {
    pub boss_id: EnemyId,
    pub quest_instance: QuestInstanceId,
    pub quest_id: QuestId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encounter {
    Enemy(EnemyEncounter),
    Boss(BossEncounter),
}

impl Encounter {
    pub fn enemy_id(&self) -> EnemyId {
        match self {
            Encounter::Enemy(encounter) => encounter.enemy_id,
            Encounter::Boss(encounter) => encounter.boss_id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Encounter::Enemy(encounter) => encounter.position,
            Encounter::Boss(encounter) => encounter.position,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self, Encounter::Boss(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatPhase {
    NotStarted,
    Active,
    Won,
    Lost,
    Fled,
}

impl CombatPhase {
    pub fn is_over(self) -> bool {
        matches!(self, CombatPhase::Won | CombatPhase::Lost | CombatPhase::Fled)
    }
}

impl fmt::Display for CombatPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombatPhase::NotStarted => "not started",
            CombatPhase::Active => "active",
            CombatPhase::Won => "won",
            CombatPhase::Lost => "lost",
            CombatPhase::Fled => "fled",
        };
        write!(f, "{}", name)
    }
}

/// Everything a fight needs between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    pub player_id: PlayerId,
    pub encounter: Encounter,
    pub enemy_name: String,
    /// Item that lets the player fight this enemy head on
    pub weakness: String,
    pub player_hunger: u32,
    pub player_max_hunger: u32,
    pub enemy_hunger: u32,
    pub enemy_max_hunger: u32,
    pub hit_chance: u32,
    pub phase: CombatPhase,
    pub rounds: u32,
    pub pending_question: Option<KnowledgeChallenge>,
}

impl CombatSession {
    pub fn new(player_id: PlayerId, encounter: Encounter, enemy: &Enemy) -> Self {
        Self {
            player_id,
            encounter,
            enemy_name: enemy.name.clone(),
            weakness: enemy.weakness.clone(),
            player_hunger: 0,
            player_max_hunger: 0,
            enemy_hunger: 0,
            enemy_max_hunger: 0,
            hit_chance: 0,
            phase: CombatPhase::NotStarted,
            rounds: 0,
            pending_question: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    /// Fought in a forest, which pays extra XP.
    pub fn in_forest(&self) -> bool {
        matches!(
            &self.encounter,
            Encounter::Enemy(EnemyEncounter {
                terrain: Some(TerrainType::Forest),
                ..
            })
        )
    }

    fn settle_phase(&mut self) -> CombatPhase {
        if self.enemy_hunger >= self.enemy_max_hunger {
            self.phase = CombatPhase::Won;
        } else if self.player_hunger >= self.player_max_hunger {
            self.phase = CombatPhase::Lost;
        }
        self.phase
    }
}

/// A request to act inside a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatAction {
    /// Fight one round
    Attack,
    Flee,
    /// Ask for a knowledge check instead of fighting
    RequestQuestion,
    AnswerTrueFalse(bool),
    AnswerChoice(ChoiceLetter),
}

impl CombatAction {
    pub fn as_answer(self) -> Option<KnowledgeAnswer> {
        match self {
            CombatAction::AnswerTrueFalse(value) => Some(KnowledgeAnswer::TrueFalse(value)),
            CombatAction::AnswerChoice(letter) => Some(KnowledgeAnswer::Choice(letter)),
            _ => None,
        }
    }
}

/// What a finished fight did to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatOutcome {
    Victory {
        xp: u32,
        gold: u32,
        broken_items: Vec<String>,
    },
    Defeat {
        xp_lost: u32,
        broken_items: Vec<String>,
    },
    Fled {
        damaged: bool,
        xp_lost: u32,
        broken_items: Vec<String>,
    },
}

/// Result of one combat action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStep {
    pub session: CombatSession,
    pub outcome: Option<CombatOutcome>,
    /// Question now awaiting an answer
    pub question: Option<KnowledgeChallenge>,
    /// New level reached, if the fight pushed the player over a threshold
    pub level_up: Option<u32>,
    pub messages: Vec<String>,
}

impl CombatStep {
    pub fn new(session: CombatSession) -> Self {
        Self {
            session,
            outcome: None,
            question: None,
            level_up: None,
            messages: Vec::new(),
        }
    }
}

/// Fight rules.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    pub config: CombatConfig,
}

impl CombatResolver {
    pub fn new(config: CombatConfig) -> Self {
        Self { config }
    }

    /// Sets up the counters and moves the session to `Active`.
    ///
    /// `correct_answers` and `accuracy_pool` feed the accuracy term of the
    /// hit chance. Bosses fight on a knowledge footing, so their ceiling is
    /// the bare base hunger.
    pub fn start(
        &self,
        player: &Player,
        encounter: Encounter,
        enemy: &Enemy,
        correct_answers: usize,
        accuracy_pool: usize,
    ) -> CombatSession {
        let mut session = CombatSession::new(player.id, encounter, enemy);
        session.player_max_hunger = player_max_hunger(player, self.config.max_player_hunger);
        session.enemy_max_hunger = match &session.encounter {
            Encounter::Enemy(encounter) => {
                enemy_max_hunger(enemy, encounter.terrain, encounter.position)
            }
            Encounter::Boss(_) => enemy.max_hunger,
        };
        session.hit_chance = hit_chance(
            player,
            &enemy.name,
            correct_answers,
            accuracy_pool,
            self.config.max_hit_chance,
        );
        session.phase = CombatPhase::Active;
        debug!(
            "Combat started: {} vs {} (hunger {}/{}, hit {}%)",
            player.name,
            enemy.name,
            session.player_max_hunger,
            session.enemy_max_hunger,
            session.hit_chance
        );
        session
    }

    pub fn ensure_active(&self, session: &CombatSession) -> SquireResult<()> {
        if session.phase == CombatPhase::Active {
            Ok(())
        } else {
            Err(SquireError::InvalidCombatAction(format!(
                "The fight is {}.",
                session.phase
            )))
        }
    }

    /// One attrition round. Only the side whose counter moved is checked.
    pub fn round<R: Rng + ?Sized>(&self, session: &mut CombatSession, rng: &mut R) -> CombatPhase {
        session.rounds += 1;
        let roll: u32 = rng.gen_range(1..=100);
        if roll <= session.hit_chance {
            session.enemy_hunger += 1;
            if session.enemy_hunger >= session.enemy_max_hunger {
                session.phase = CombatPhase::Won;
            }
        } else {
            session.player_hunger += 1;
            if session.player_hunger >= session.player_max_hunger {
                session.phase = CombatPhase::Lost;
            }
        }
        trace!(
            "Round {}: roll {} vs {}%, hunger {}/{} vs {}/{}",
            session.rounds,
            roll,
            session.hit_chance,
            session.player_hunger,
            session.player_max_hunger,
            session.enemy_hunger,
            session.enemy_max_hunger
        );
        session.phase
    }

    /// Fights a single round and reports where the fight stands.
    ///
    /// A session whose player ceiling is zero is already lost, so it ends
    /// without a draw.
    pub fn strike<R: Rng + ?Sized>(
        &self,
        session: &mut CombatSession,
        rng: &mut R,
    ) -> SquireResult<CombatPhase> {
        self.ensure_active(session)?;
        if session.settle_phase().is_over() {
            return Ok(session.phase);
        }
        let phase = self.round(session, rng);
        if phase.is_over() {
            debug!(
                "{} vs player {}: {} after {} rounds",
                session.enemy_name, session.player_id, phase, session.rounds
            );
        }
        Ok(phase)
    }

    /// Fights rounds until one side gives in.
    ///
    /// Every round moves one counter toward its ceiling, so the loop ends
    /// within the sum of both ceilings. A player with a zero ceiling (no
    /// food or hunger pouches) loses before any round is drawn.
    pub fn attrition<R: Rng + ?Sized>(
        &self,
        session: &mut CombatSession,
        rng: &mut R,
    ) -> SquireResult<CombatPhase> {
        self.ensure_active(session)?;
        if session.settle_phase().is_over() {
            return Ok(session.phase);
        }
        let limit = session.player_max_hunger + session.enemy_max_hunger + 1;
        for _ in 0..limit {
            if self.round(session, rng).is_over() {
                break;
            }
        }
        debug!(
            "{} vs player {}: {} after {} rounds",
            session.enemy_name, session.player_id, session.phase, session.rounds
        );
        Ok(session.phase)
    }

    /// Scores a boss-fight answer: right answers starve the boss, wrong ones the player.
    pub fn boss_answer(&self, session: &mut CombatSession, correct: bool) -> CombatPhase {
        session.rounds += 1;
        if correct {
            session.enemy_hunger += 1;
        } else {
            session.player_hunger += 1;
        }
        session.settle_phase()
    }

    /// XP and gold for beating `enemy`.
    ///
    /// A fought win pays forest and distance bonuses on top of the enemy's
    /// base reward. A knowledge win or a boss pays the base reward only.
    pub fn victory_reward(&self, session: &CombatSession, enemy: &Enemy, fought: bool) -> (u32, u32) {
        if !fought || session.encounter.is_boss() {
            return (enemy.xp_reward, enemy.gold_reward);
        }
        let band = DistanceBand::of(session.encounter.position());
        let forest = session.in_forest();
        let xp = enemy.xp_reward + if forest { 10 } else { 0 } + band.xp_bonus(forest);
        let gold = enemy.gold_reward + band.gold_bonus();
        (xp, gold)
    }

    /// Applies a win to the player and returns the outcome.
    ///
    /// A fought win wears the weapon and gear down. Work sessions reset on
    /// every win.
    pub fn settle_victory(
        &self,
        session: &mut CombatSession,
        player: &mut Player,
        enemy: &Enemy,
        fought: bool,
    ) -> CombatOutcome {
        session.phase = CombatPhase::Won;
        session.pending_question = None;
        let (xp, gold) = self.victory_reward(session, enemy, fought);
        player.experience_points = player.experience_points.saturating_add(xp);
        player.work_sessions = 0;
        let broken_items = if fought {
            player.degrade_gear(Some(&session.weakness))
        } else {
            Vec::new()
        };
        CombatOutcome::Victory {
            xp,
            gold,
            broken_items,
        }
    }

    /// Applies a loss. Bosses take a fixed XP penalty, enemies their XP value.
    pub fn settle_defeat(
        &self,
        session: &mut CombatSession,
        player: &mut Player,
        enemy: &Enemy,
    ) -> CombatOutcome {
        session.phase = CombatPhase::Lost;
        session.pending_question = None;
        let xp_lost = if session.encounter.is_boss() {
            self.config.boss_loss_xp_penalty
        } else {
            enemy.xp_reward
        };
        player.lose_xp(xp_lost);
        let broken_items = player.degrade_gear(Some(&session.weakness));
        CombatOutcome::Defeat {
            xp_lost,
            broken_items,
        }
    }

    /// A voluntary retreat. Bosses are fled with no hit chance to lean on.
    pub fn flee<R: Rng + ?Sized>(
        &self,
        session: &mut CombatSession,
        player: &mut Player,
        rng: &mut R,
    ) -> SquireResult<CombatOutcome> {
        self.ensure_active(session)?;
        let hit = if session.encounter.is_boss() {
            0
        } else {
            session.hit_chance
        };
        let probability =
            flee_damage_probability(session.enemy_max_hunger, session.player_max_hunger, hit);
        let damaged = self.config.flee_gate.damaged(probability, rng);
        let broken_items = if damaged {
            player.degrade_gear(None)
        } else {
            Vec::new()
        };
        session.phase = CombatPhase::Fled;
        session.pending_question = None;
        debug!(
            "Player {} fled {} (damage odds {:.2}, damaged {})",
            player.id, session.enemy_name, probability, damaged
        );
        Ok(CombatOutcome::Fled {
            damaged,
            xp_lost: 0,
            broken_items,
        })
    }

    /// A retreat the player did not choose: XP penalty plus gear damage.
    pub fn forced_flee(&self, session: &mut CombatSession, player: &mut Player) -> CombatOutcome {
        let xp_lost = self.config.forced_flee_xp_penalty;
        player.lose_xp(xp_lost);
        let broken_items = player.degrade_gear(None);
        session.phase = CombatPhase::Fled;
        session.pending_question = None;
        debug!("Player {} forced to flee {}", player.id, session.enemy_name);
        CombatOutcome::Fled {
            damaged: true,
            xp_lost,
            broken_items,
        }
    }
}
