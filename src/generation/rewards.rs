//! # Reward Allocation
//!
//! Difficulty-scaled rewards for treasure chests and riddles, and placement
//! of a quest's chests on the world map.

use crate::config::LANDMARKS;
use crate::game::{
    ContentCatalog, Difficulty, Position, QuestId, QuestInstanceId, RewardBundle,
    SpecialItemGrant, TerrainTile, TreasureChest,
};
use crate::store::NewChest;
use crate::{SquireError, SquireResult};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Value ranges for one difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRanges {
    pub gold: RangeInclusive<u32>,
    pub xp: RangeInclusive<u32>,
    pub food: RangeInclusive<u32>,
}

impl RewardRanges {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                gold: 10..=20,
                xp: 5..=15,
                food: 5..=10,
            },
            Difficulty::Medium => Self {
                gold: 25..=40,
                xp: 15..=25,
                food: 10..=20,
            },
            Difficulty::Hard => Self {
                gold: 50..=75,
                xp: 30..=50,
                food: 15..=30,
            },
        }
    }
}

/// Rolls rewards and places treasure.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardAllocator;

impl RewardAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Extra uses granted on top of an item's base uses.
    pub fn uses_bonus(difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => 0,
            Difficulty::Medium => 10,
            Difficulty::Hard => 25,
        }
    }

    /// Half-width of the square a chest of this difficulty is hidden in.
    pub fn placement_radius(difficulty: Difficulty) -> i32 {
        match difficulty {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 35,
        }
    }

    /// Rolls gold, XP, food and maybe a special item.
    ///
    /// Easy rewards never carry an item. Medium rewards may draw from the gear
    /// shop and Hard rewards from the wizard's stock, in both cases only items
    /// the player's level allows, with "nothing" as an equally likely outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use squire::{ContentCatalog, Difficulty, RewardAllocator};
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    /// let reward = RewardAllocator::new().allocate_reward(
    ///     Difficulty::Easy,
    ///     5,
    ///     &ContentCatalog::sample(),
    ///     &mut rng,
    /// );
    /// assert!((10..=20).contains(&reward.gold));
    /// assert!(reward.special_item.is_none());
    /// ```
    pub fn allocate_reward<R: Rng + ?Sized>(
        &self,
        difficulty: Difficulty,
        level: u32,
        catalog: &ContentCatalog,
        rng: &mut R,
    ) -> RewardBundle {
        let ranges = RewardRanges::for_difficulty(difficulty);
        let gold = rng.gen_range(ranges.gold);
        let xp = rng.gen_range(ranges.xp);
        let food = rng.gen_range(ranges.food);

        let pool: Vec<(&str, u32)> = match difficulty {
            Difficulty::Easy => Vec::new(),
            Difficulty::Medium => catalog
                .shop_gear
                .iter()
                .filter(|item| item.min_level <= level)
                .map(|item| (item.name.as_str(), item.uses))
                .collect(),
            Difficulty::Hard => catalog
                .wizard_items
                .iter()
                .filter(|item| item.min_level <= level)
                .map(|item| (item.name.as_str(), item.uses))
                .collect(),
        };

        let special_item = if pool.is_empty() {
            None
        } else {
            // One extra slot stands for "no item".
            let pick = rng.gen_range(0..=pool.len());
            pool.get(pick).map(|(name, uses)| SpecialItemGrant {
                name: name.to_string(),
                uses: uses + Self::uses_bonus(difficulty),
            })
        };

        RewardBundle {
            gold,
            xp,
            food,
            special_item,
        }
    }

    /// Picks a wizard item for a solved riddle, or `None` when the player's
    /// level allows nothing.
    pub fn riddle_item<R: Rng + ?Sized>(
        &self,
        difficulty: Difficulty,
        level: u32,
        catalog: &ContentCatalog,
        rng: &mut R,
    ) -> Option<SpecialItemGrant> {
        let eligible: Vec<_> = catalog
            .wizard_items
            .iter()
            .filter(|item| item.min_level <= level)
            .collect();
        eligible.choose(rng).map(|item| SpecialItemGrant {
            name: item.name.clone(),
            uses: item.uses + Self::uses_bonus(difficulty),
        })
    }

    /// Places one chest for every riddle of the quest that has none yet in
    /// this instance.
    ///
    /// Chests avoid terrain, landmarks and each other. Each chest gets at most
    /// `max_attempts` position draws.
    #[allow(clippy::too_many_arguments)]
    pub fn place_chests<R: Rng + ?Sized>(
        &self,
        instance: QuestInstanceId,
        quest: QuestId,
        level: u32,
        catalog: &ContentCatalog,
        existing_chests: &[TreasureChest],
        terrain: &[TerrainTile],
        max_attempts: u32,
        rng: &mut R,
    ) -> SquireResult<Vec<NewChest>> {
        let mut restricted: HashSet<Position> = terrain
            .iter()
            .map(|tile| tile.position)
            .chain(existing_chests.iter().map(|chest| chest.position))
            .chain(LANDMARKS)
            .collect();
        let covered: HashSet<_> = existing_chests.iter().map(|chest| chest.riddle_id).collect();

        let mut riddles: Vec<_> = catalog
            .riddles_for(quest)
            .filter(|riddle| !covered.contains(&riddle.id))
            .collect();
        riddles.sort_by_key(|riddle| riddle.id);

        let mut chests = Vec::with_capacity(riddles.len());
        for riddle in riddles {
            let radius = Self::placement_radius(riddle.difficulty);
            let mut position = None;
            for _ in 0..max_attempts {
                let candidate =
                    Position::new(rng.gen_range(-radius..=radius), rng.gen_range(-radius..=radius));
                if restricted.insert(candidate) {
                    position = Some(candidate);
                    break;
                }
            }
            let position = position.ok_or_else(|| SquireError::GenerationExhausted {
                phase: "chest".to_string(),
                placed: chests.len(),
                requested: catalog.riddles_for(quest).count(),
            })?;

            chests.push(NewChest {
                quest_instance: instance,
                riddle_id: riddle.id,
                position,
                difficulty: riddle.difficulty,
                reward: self.allocate_reward(riddle.difficulty, level, catalog, rng),
            });
        }

        debug!("Placed {} chests for instance {}", chests.len(), instance);
        Ok(chests)
    }
}
