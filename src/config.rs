//! # Engine Configuration
//!
//! Tunable parameters for generation, encounters, combat and progress, plus
//! the fixed constants every component agrees on.
//!
//! Every section deserializes with defaults, so a JSON file only needs to
//! name the values it overrides.

use crate::combat::FleeGate;
use crate::game::Position;
use crate::SquireResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The village square where every player starts.
pub const VILLAGE: Position = Position::new(0, 0);

/// The stronghold guarding the end of the main quest line.
pub const STRONGHOLD: Position = Position::new(40, 40);

/// Far south-western landmark.
pub const SOUTHWEST_LANDMARK: Position = Position::new(-35, -35);

/// Coordinates that never receive generated terrain.
pub const LANDMARKS: [Position; 3] = [VILLAGE, STRONGHOLD, SOUTHWEST_LANDMARK];

/// Name of the food item granted by chests.
pub const FOOD_ITEM_NAME: &str = "Magic Pizza";

/// Item whose every copy raises the player's hunger ceiling by one.
pub const HUNGER_POUCH_ITEM: &str = "gold coin pouch";

/// Gear that never wears out.
pub const EXEMPT_GEAR: [&str; 4] = ["Pen", "Calculator", "Law Book", "Stamp"];

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the engine's random number generator
    pub seed: u64,
    pub terrain: TerrainConfig,
    pub dungeon: DungeonConfig,
    pub encounters: EncounterConfig,
    pub combat: CombatConfig,
    pub progress: ProgressConfig,
}

impl EngineConfig {
    /// Creates the standard configuration with the given seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::EngineConfig;
    ///
    /// let config = EngineConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert_eq!(config.terrain.base_trees, 75);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            terrain: TerrainConfig::default(),
            dungeon: DungeonConfig::default(),
            encounters: EncounterConfig::default(),
            combat: CombatConfig::default(),
            progress: ProgressConfig::default(),
        }
    }

    /// Creates a configuration for tests: smaller dungeon, quiet side events.
    pub fn for_testing(seed: u64) -> Self {
        let mut config = Self::new(seed);
        config.dungeon.room_count = 6;
        config.encounters.npc_chance = 0.0;
        config.encounters.trader_chance = 0.0;
        config.encounters.riddle_chance = 0.0;
        config.encounters.blacksmith_chance = 0.0;
        config
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SquireResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Terrain generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Forest tiles at level 0, quest 0
    pub base_trees: u32,
    /// Mountain tiles at level 0, quest 0
    pub base_mountains: u32,
    /// Accepted points per forest cluster
    pub cluster_size: u32,
    /// Jitter applied around a cluster center
    pub cluster_jitter: i32,
    /// Cells in one straight mountain range
    pub mountain_range_length: u32,
    /// Placement radius at level 0
    pub base_radius: i32,
    /// Additional placement radius per level
    pub radius_per_level: i32,
    /// Radius of the forest ring around the stronghold
    pub stronghold_halo_radius: i32,
    /// River steps at level 0
    pub river_base_length: u32,
    /// Additional river steps per level
    pub river_length_per_level: u32,
    /// Probability that a river step bends on each axis
    pub river_bendiness: f64,
    /// Rejected draws allowed per phase before giving up
    pub max_attempts: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            base_trees: 75,
            base_mountains: 50,
            cluster_size: 10,
            cluster_jitter: 2,
            mountain_range_length: 9,
            base_radius: 10,
            radius_per_level: 2,
            stronghold_halo_radius: 3,
            river_base_length: 25,
            river_length_per_level: 2,
            river_bendiness: 0.6,
            max_attempts: 500,
        }
    }
}

/// Relative weights of the non-boss dungeon room types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomWeights {
    pub multiple_choice: u32,
    pub true_false: u32,
    pub riddle: u32,
    pub treasure: u32,
}

impl Default for RoomWeights {
    fn default() -> Self {
        Self {
            multiple_choice: 3,
            true_false: 3,
            riddle: 2,
            treasure: 2,
        }
    }
}

/// Dungeon generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    /// Rooms in a generated dungeon, entrance and boss included
    pub room_count: u32,
    pub room_weights: RoomWeights,
    /// Growth draws allowed before giving up
    pub max_attempts: u32,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            room_count: 9,
            room_weights: RoomWeights::default(),
            max_attempts: 200,
        }
    }
}

/// Encounter odds and side-event chances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub base_probability: f64,
    /// Chebyshev radius scanned for nearby features
    pub proximity: i32,
    pub forest_weight: f64,
    pub mountain_weight: f64,
    pub river_weight: f64,
    pub chest_weight: f64,
    pub max_probability: f64,
    pub npc_chance: f64,
    pub trader_chance: f64,
    pub riddle_chance: f64,
    pub blacksmith_chance: f64,
    /// The blacksmith only appears to players above this level
    pub blacksmith_above_level: u32,
    /// Chebyshev radius of the map delta returned after a step
    pub view_radius: i32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            base_probability: 0.05,
            proximity: 2,
            forest_weight: 0.02,
            mountain_weight: 0.03,
            river_weight: 0.04,
            chest_weight: 0.04,
            max_probability: 0.9,
            npc_chance: 0.02,
            trader_chance: 0.02,
            riddle_chance: 0.02,
            blacksmith_chance: 0.03,
            blacksmith_above_level: 3,
            view_radius: 7,
        }
    }
}

/// Combat tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub max_player_hunger: u32,
    pub max_hit_chance: f64,
    /// Times a single question may be served to one player
    pub question_encounter_cap: u32,
    /// XP lost on a forced flee from a knowledge check
    pub forced_flee_xp_penalty: u32,
    /// XP lost when a boss wins
    pub boss_loss_xp_penalty: u32,
    pub flee_gate: FleeGate,
    /// Percent chance to not consume food on a move, indexed by level - 1.
    /// Levels past the end use the last entry.
    pub food_saving_by_level: Vec<u32>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_player_hunger: 8,
            max_hit_chance: 95.0,
            question_encounter_cap: 2,
            forced_flee_xp_penalty: 10,
            boss_loss_xp_penalty: 100,
            flee_gate: FleeGate::CoinFlip,
            food_saving_by_level: vec![0, 10, 25, 50, 75],
        }
    }
}

/// Quest progress tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Solved riddles required on top of the quest's hard riddles
    pub baseline_required: u32,
    /// Solved riddles after which wandering riddles step up to Medium
    pub medium_after: u32,
    /// Solved riddles after which wandering riddles step up to Hard
    pub hard_after: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            baseline_required: 6,
            medium_after: 3,
            hard_after: 6,
        }
    }
}
