//! Hunger ceilings, hit chance and flee odds.

use crate::game::{Enemy, Player, Position, TerrainType};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How far from the village an encounter happens, bucketed by `|x·y|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistanceBand {
    Near,
    Outskirts,
    Wilds,
    Frontier,
    Deep,
}

impl DistanceBand {
    /// Buckets a position by its distance proxy.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{DistanceBand, Position};
    ///
    /// assert_eq!(DistanceBand::of(Position::new(5, 10)), DistanceBand::Near);
    /// assert_eq!(DistanceBand::of(Position::new(-10, 10)), DistanceBand::Outskirts);
    /// assert_eq!(DistanceBand::of(Position::new(40, 40)), DistanceBand::Deep);
    /// ```
    pub fn of(position: Position) -> Self {
        match position.distance_proxy() {
            0..=50 => DistanceBand::Near,
            51..=150 => DistanceBand::Outskirts,
            151..=500 => DistanceBand::Wilds,
            501..=1000 => DistanceBand::Frontier,
            _ => DistanceBand::Deep,
        }
    }

    pub fn hunger_bonus(self) -> u32 {
        match self {
            DistanceBand::Near => 0,
            DistanceBand::Outskirts => 1,
            DistanceBand::Wilds => 2,
            DistanceBand::Frontier => 3,
            DistanceBand::Deep => 5,
        }
    }

    pub fn xp_bonus(self, in_forest: bool) -> u32 {
        let (open, forest) = match self {
            DistanceBand::Near => (0, 0),
            DistanceBand::Outskirts => (5, 15),
            DistanceBand::Wilds => (10, 30),
            DistanceBand::Frontier => (20, 40),
            DistanceBand::Deep => (25, 55),
        };
        if in_forest {
            forest
        } else {
            open
        }
    }

    pub fn gold_bonus(self) -> u32 {
        match self {
            DistanceBand::Near => 0,
            DistanceBand::Outskirts => 10,
            DistanceBand::Wilds => 20,
            DistanceBand::Frontier => 25,
            DistanceBand::Deep => 100,
        }
    }
}

/// The random draw that decides whether a retreat costs gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FleeGate {
    /// Draw 0 or 1 with equal odds
    #[default]
    CoinFlip,
    /// Draw uniformly from [0, 1)
    Uniform,
}

impl FleeGate {
    pub fn draw<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        match self {
            FleeGate::CoinFlip => {
                if rng.gen_bool(0.5) {
                    1.0
                } else {
                    0.0
                }
            }
            FleeGate::Uniform => rng.gen::<f64>(),
        }
    }

    /// Whether a retreat with the given damage probability hurts.
    pub fn damaged<R: Rng + ?Sized>(self, damage_probability: f64, rng: &mut R) -> bool {
        self.draw(rng) < damage_probability
    }
}

/// Hunger a player can take before losing: food uses plus pouches, capped.
pub fn player_max_hunger(player: &Player, cap: u32) -> u32 {
    (player.food_uses() + player.hunger_pouches()).min(cap)
}

/// Hunger an enemy can take, raised by cover and by distance from the village.
pub fn enemy_max_hunger(enemy: &Enemy, terrain: Option<TerrainType>, position: Position) -> u32 {
    let cover = match terrain {
        Some(TerrainType::Forest) => 2,
        Some(TerrainType::Mountain) => 3,
        _ => 0,
    };
    enemy.max_hunger + cover + DistanceBand::of(position).hunger_bonus()
}

/// Percent chance that a round goes the player's way.
///
/// Level counts twice over, then accuracy, usable gear and five points per
/// special item effective against this enemy. Truncated and capped at `cap`.
///
/// # Examples
///
/// ```
/// use squire::{hit_chance, Player, PlayerId, TeamId};
///
/// let mut player = Player::new(PlayerId(1), "Ada", TeamId(1));
/// player.level = 3;
/// assert_eq!(hit_chance(&player, "Fog Wraith", 1, 2, 95.0), 12);
/// ```
pub fn hit_chance(
    player: &Player,
    enemy_name: &str,
    correct_answers: usize,
    accuracy_pool: usize,
    cap: f64,
) -> u32 {
    let accuracy = if accuracy_pool == 0 {
        0.0
    } else {
        correct_answers as f64 / accuracy_pool as f64
    };
    let level = player.level as f64;
    let raw = 2.0 * level
        + accuracy
        + player.usable_gear() as f64
        + 5.0 * player.specials_against(enemy_name) as f64
        + 2.0 * level;
    raw.min(cap).max(0.0) as u32
}

/// Chance that fleeing costs gear.
///
/// A stronger enemy relative to the player's hunger ceiling and a weaker hit
/// chance both make a clean escape less likely.
pub fn flee_damage_probability(enemy_max_hunger: u32, player_max_hunger: u32, hit_chance: u32) -> f64 {
    let ratio = enemy_max_hunger as f64 / player_max_hunger.max(1) as f64;
    (ratio * (1.0 - hit_chance as f64 / 100.0)).clamp(0.0, 1.0)
}
