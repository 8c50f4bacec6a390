//! # Players and Teams
//!
//! The squire, the team it belongs to, and the inventory rules combat and
//! movement rely on (food consumption, gear wear, terrain gear checks).

use crate::config::{EXEMPT_GEAR, HUNGER_POUCH_ITEM};
use crate::game::{PlayerId, Position, TeamId, TerrainType};
use serde::{Deserialize, Serialize};

/// Broad inventory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Consumed one use per move; its uses set the player's hunger ceiling
    Food,
    /// Wears down after every fight
    Gear,
    /// Quest rewards and wizard items; never worn down by combat
    Special,
}

/// A stack of one item held by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub kind: ItemKind,
    pub uses_remaining: u32,
    /// Enemy name this item is especially effective against
    pub effective_against: Option<String>,
}

impl InventoryItem {
    /// Creates an item with no enemy affinity.
    pub fn new(name: impl Into<String>, kind: ItemKind, uses_remaining: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            uses_remaining,
            effective_against: None,
        }
    }

    /// Sets the enemy this item is effective against.
    pub fn effective_against(mut self, enemy: impl Into<String>) -> Self {
        self.effective_against = Some(enemy.into());
        self
    }
}

/// A player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    pub level: u32,
    pub experience_points: u32,
    pub position: Position,
    /// Jobs worked since the last won fight
    pub work_sessions: u32,
    pub inventory: Vec<InventoryItem>,
}

impl Player {
    /// Creates a level 1 player standing in the village.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{Player, PlayerId, Position, TeamId};
    ///
    /// let player = Player::new(PlayerId(1), "Ada", TeamId(1));
    /// assert_eq!(player.level, 1);
    /// assert_eq!(player.position, Position::origin());
    /// ```
    pub fn new(id: PlayerId, name: impl Into<String>, team_id: TeamId) -> Self {
        Self {
            id,
            name: name.into(),
            team_id,
            level: 1,
            experience_points: 0,
            position: Position::origin(),
            work_sessions: 0,
            inventory: Vec::new(),
        }
    }

    /// Adds an item to the inventory.
    pub fn give(&mut self, item: InventoryItem) {
        self.inventory.push(item);
    }

    /// Whether the player holds an item with exactly this name.
    pub fn has_item(&self, name: &str) -> bool {
        self.inventory.iter().any(|item| item.name == name)
    }

    /// Whether any held item's name contains `fragment`, ignoring case.
    pub fn has_item_like(&self, fragment: &str) -> bool {
        let fragment = fragment.to_lowercase();
        self.inventory
            .iter()
            .any(|item| item.name.to_lowercase().contains(&fragment))
    }

    /// Total uses left across all food.
    pub fn food_uses(&self) -> u32 {
        self.inventory
            .iter()
            .filter(|item| item.kind == ItemKind::Food)
            .map(|item| item.uses_remaining)
            .sum()
    }

    /// Number of hunger pouches carried.
    pub fn hunger_pouches(&self) -> u32 {
        self.inventory
            .iter()
            .filter(|item| item.name == HUNGER_POUCH_ITEM)
            .count() as u32
    }

    /// Gear items that still have uses.
    pub fn usable_gear(&self) -> u32 {
        self.inventory
            .iter()
            .filter(|item| item.kind == ItemKind::Gear && item.uses_remaining > 0)
            .count() as u32
    }

    /// Special items effective against the named enemy.
    pub fn specials_against(&self, enemy_name: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|item| {
                item.kind == ItemKind::Special
                    && item.effective_against.as_deref() == Some(enemy_name)
            })
            .count() as u32
    }

    /// Uses one food from the first stack that has any left.
    ///
    /// Returns false when the player has nothing to eat.
    pub fn consume_food(&mut self) -> bool {
        let Some(index) = self
            .inventory
            .iter()
            .position(|item| item.kind == ItemKind::Food && item.uses_remaining > 0)
        else {
            return false;
        };

        self.inventory[index].uses_remaining -= 1;
        if self.inventory[index].uses_remaining == 0 {
            self.inventory.remove(index);
        }
        true
    }

    /// Whether the player carries the gear a terrain type demands.
    pub fn can_enter(&self, terrain: Option<TerrainType>) -> bool {
        match terrain {
            Some(TerrainType::Mountain) => self.has_item_like("boots"),
            Some(TerrainType::River) => self.has_item_like("boat"),
            _ => true,
        }
    }

    /// Wears down gear after a fight.
    ///
    /// The named weapon loses one use from its most worn stack, then every
    /// non-exempt gear item loses one use. Stacks that run out are discarded.
    /// Returns the names of items that broke.
    pub fn degrade_gear(&mut self, weapon: Option<&str>) -> Vec<String> {
        let mut broken = Vec::new();

        if let Some(weapon) = weapon {
            let most_worn = self
                .inventory
                .iter()
                .enumerate()
                .filter(|(_, item)| item.name == weapon)
                .min_by_key(|(_, item)| item.uses_remaining)
                .map(|(index, _)| index);
            if let Some(index) = most_worn {
                let item = &mut self.inventory[index];
                item.uses_remaining = item.uses_remaining.saturating_sub(1);
                if item.uses_remaining < 1 {
                    broken.push(self.inventory.remove(index).name);
                }
            }
        }

        for item in self.inventory.iter_mut() {
            if item.kind == ItemKind::Gear && !EXEMPT_GEAR.contains(&item.name.as_str()) {
                item.uses_remaining = item.uses_remaining.saturating_sub(1);
            }
        }
        self.inventory.retain(|item| {
            let worn_out = item.kind == ItemKind::Gear
                && !EXEMPT_GEAR.contains(&item.name.as_str())
                && item.uses_remaining < 1;
            if worn_out {
                broken.push(item.name.clone());
            }
            !worn_out
        });

        broken
    }

    /// Subtracts XP without going below zero.
    pub fn lose_xp(&mut self, amount: u32) {
        self.experience_points = self.experience_points.saturating_sub(amount);
    }
}

/// A team's shared purse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub gold: u64,
    pub reputation: u64,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gold: 0,
            reputation: 0,
        }
    }
}
