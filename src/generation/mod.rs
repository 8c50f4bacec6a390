//! # Generation Module
//!
//! Procedural content generation: world terrain, end-game dungeons, encounter
//! rolls and reward allocation.
//!
//! Generators never touch the store. They receive a [`GenerationRequest`]
//! describing what already exists and return a plan that the engine persists
//! in a single transaction.

pub mod dungeon;
pub mod encounters;
pub mod rewards;
pub mod terrain;

pub use dungeon::*;
pub use encounters::*;
pub use rewards::*;
pub use terrain::*;

use crate::game::{PlayerId, Position, QuestId, TerrainTile, TreasureChest};
use crate::SquireResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// What a generator needs to know about the world it adds to.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub player_id: PlayerId,
    pub quest_id: QuestId,
    pub level: u32,
    /// Terrain the player already has
    pub existing_terrain: &'a [TerrainTile],
    /// Chests of the active quest instance
    pub chests: &'a [TreasureChest],
}

impl<'a> GenerationRequest<'a> {
    /// A request for a player with no terrain or chests yet.
    pub fn fresh(player_id: PlayerId, quest_id: QuestId, level: u32) -> Self {
        Self {
            player_id,
            quest_id,
            level,
            existing_terrain: &[],
            chests: &[],
        }
    }

    /// Coordinates no new feature may take: existing terrain, unopened chests
    /// and the fixed landmarks.
    pub fn restricted_positions(&self) -> HashSet<Position> {
        self.existing_terrain
            .iter()
            .map(|tile| tile.position)
            .chain(
                self.chests
                    .iter()
                    .filter(|chest| !chest.is_opened)
                    .map(|chest| chest.position),
            )
            .chain(crate::config::LANDMARKS)
            .collect()
    }
}

/// Trait for procedural generators.
///
/// All generation systems implement this trait, allowing for consistent
/// interfaces and logging.
pub trait Generator<T> {
    /// Generates content for the request using the provided random number generator.
    fn generate(&self, request: &GenerationRequest<'_>, rng: &mut StdRng) -> SquireResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, request: &GenerationRequest<'_>) -> SquireResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use crate::config::TerrainConfig;

    /// Creates a seeded random number generator.
    pub fn create_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// Target forest and mountain totals for a player.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureCounts {
        pub trees: usize,
        pub mountains: usize,
    }

    /// Computes target feature counts from level and quest id.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::generation::utils::feature_counts;
    /// use squire::TerrainConfig;
    ///
    /// let counts = feature_counts(1, 5, &TerrainConfig::default());
    /// assert_eq!(counts.trees, 101);
    /// assert_eq!(counts.mountains, 71);
    /// ```
    pub fn feature_counts(level: u32, quest_id: u32, config: &TerrainConfig) -> FeatureCounts {
        let level = f64::from(level);
        let quest = f64::from(quest_id);
        let tree_multiplier = 1.0 + level * 0.1 + quest * 0.05;
        let mountain_multiplier = 1.0 + level * 0.08 + quest * 0.07;
        FeatureCounts {
            trees: (f64::from(config.base_trees) * tree_multiplier) as usize,
            mountains: (f64::from(config.base_mountains) * mountain_multiplier) as usize,
        }
    }

    /// Half-width of the square in which cluster centers and range starts are drawn.
    pub fn placement_radius(level: u32, config: &TerrainConfig) -> i32 {
        config.base_radius + config.radius_per_level * level as i32
    }
}
