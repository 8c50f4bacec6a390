//! # World Features
//!
//! Persistent, per-player features of the world map: terrain tiles, treasure
//! chests, chest hints and quest instances.

use crate::game::{ChestId, Difficulty, PlayerId, Position, QuestId, QuestInstanceId, RiddleId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of generated terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    Forest,
    Mountain,
    River,
    Stronghold,
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainType::Forest => write!(f, "forest"),
            TerrainType::Mountain => write!(f, "mountain"),
            TerrainType::River => write!(f, "river"),
            TerrainType::Stronghold => write!(f, "stronghold"),
        }
    }
}

/// One generated map cell, unique per (player, position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainTile {
    pub player_id: PlayerId,
    pub position: Position,
    pub terrain: TerrainType,
}

impl TerrainTile {
    pub fn new(player_id: PlayerId, position: Position, terrain: TerrainType) -> Self {
        Self {
            player_id,
            position,
            terrain,
        }
    }
}

/// A special item attached to a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialItemGrant {
    pub name: String,
    pub uses: u32,
}

/// What a chest or riddle pays out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBundle {
    pub gold: u32,
    pub xp: u32,
    /// Food uses
    pub food: u32,
    pub special_item: Option<SpecialItemGrant>,
}

/// A chest bound to one riddle within one quest instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasureChest {
    pub id: ChestId,
    pub quest_instance: QuestInstanceId,
    pub riddle_id: RiddleId,
    pub position: Position,
    pub difficulty: Difficulty,
    pub reward: RewardBundle,
    /// Only ever flips from false to true
    pub is_opened: bool,
}

/// Record that a chest's location was revealed to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChestHint {
    pub quest_instance: QuestInstanceId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestStatus {
    Active,
    Completed,
}

/// One player's run of one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestInstance {
    pub id: QuestInstanceId,
    pub player_id: PlayerId,
    pub quest_id: QuestId,
    pub status: QuestStatus,
    pub boss_defeated: bool,
}

impl QuestInstance {
    pub fn new(id: QuestInstanceId, player_id: PlayerId, quest_id: QuestId) -> Self {
        Self {
            id,
            player_id,
            quest_id,
            status: QuestStatus::Active,
            boss_defeated: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == QuestStatus::Completed
    }
}
