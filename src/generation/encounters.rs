//! # Encounter Odds
//!
//! Per-tile enemy encounter probability and the roll that decides which side
//! event, if any, interrupts a movement step.

use crate::config::EncounterConfig;
use crate::game::{ContentCatalog, Enemy, Position, TerrainTile, TerrainType, TreasureChest};
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Events that can interrupt a step on the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideEvent {
    /// A traveller who may reveal a chest
    Npc,
    /// A wandering merchant
    Trader,
    /// A riddle on the road
    Riddle,
    /// A smith offering repairs
    Blacksmith,
    /// A hostile creature
    Enemy,
}

/// Runs one independent trial per event and picks uniformly among the hits.
///
/// Each entry is an event with its own probability of becoming eligible. The
/// trials are independent, so several events may qualify on the same step;
/// exactly one of those is returned.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use squire::{select_side_event, SideEvent};
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// assert_eq!(select_side_event(&[(SideEvent::Npc, 1.0)], &mut rng), Some(SideEvent::Npc));
/// assert_eq!(select_side_event(&[(SideEvent::Npc, 0.0)], &mut rng), None);
/// ```
pub fn select_side_event<R: Rng + ?Sized>(
    odds: &[(SideEvent, f64)],
    rng: &mut R,
) -> Option<SideEvent> {
    let eligible: Vec<SideEvent> = odds
        .iter()
        .filter(|(_, chance)| rng.gen::<f64>() < *chance)
        .map(|(event, _)| *event)
        .collect();
    trace!("Eligible side events: {:?}", eligible);
    eligible.choose(rng).copied()
}

/// Computes how dangerous a tile is and what happens when a player steps on it.
#[derive(Debug, Clone, Default)]
pub struct EncounterProbabilityEngine {
    pub config: EncounterConfig,
}

impl EncounterProbabilityEngine {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }

    /// Chance that an enemy shows up at `position`.
    ///
    /// Starts from the base rate and adds a weight for every terrain tile and
    /// unopened chest within the proximity box, clamped to the configured cap.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{EncounterProbabilityEngine, PlayerId, Position, TerrainTile, TerrainType};
    ///
    /// let engine = EncounterProbabilityEngine::default();
    /// let tiles = [TerrainTile::new(PlayerId(1), Position::new(1, 1), TerrainType::River)];
    /// let p = engine.encounter_probability(Position::new(0, 0), &tiles, &[]);
    /// assert!((p - 0.09).abs() < 1e-9);
    /// ```
    pub fn encounter_probability(
        &self,
        position: Position,
        terrain: &[TerrainTile],
        chests: &[TreasureChest],
    ) -> f64 {
        let proximity = self.config.proximity.max(0) as u32;

        let terrain_weight: f64 = terrain
            .iter()
            .filter(|tile| tile.position.chebyshev_distance(position) <= proximity)
            .map(|tile| match tile.terrain {
                TerrainType::Forest => self.config.forest_weight,
                TerrainType::Mountain => self.config.mountain_weight,
                TerrainType::River => self.config.river_weight,
                TerrainType::Stronghold => 0.0,
            })
            .sum();

        let nearby_chests = chests
            .iter()
            .filter(|chest| !chest.is_opened)
            .filter(|chest| chest.position.chebyshev_distance(position) <= proximity)
            .count();

        let probability = self.config.base_probability
            + terrain_weight
            + self.config.chest_weight * nearby_chests as f64;
        probability.clamp(0.0, self.config.max_probability)
    }

    /// Side-event odds for a player of `level` on a tile with the given enemy odds.
    pub fn side_event_odds(&self, level: u32, enemy_probability: f64) -> Vec<(SideEvent, f64)> {
        let mut odds = vec![
            (SideEvent::Npc, self.config.npc_chance),
            (SideEvent::Trader, self.config.trader_chance),
            (SideEvent::Riddle, self.config.riddle_chance),
            (SideEvent::Enemy, enemy_probability),
        ];
        if level > self.config.blacksmith_above_level {
            odds.push((SideEvent::Blacksmith, self.config.blacksmith_chance));
        }
        odds
    }

    /// Rolls the side event for one movement step.
    pub fn roll_side_event<R: Rng + ?Sized>(
        &self,
        level: u32,
        enemy_probability: f64,
        rng: &mut R,
    ) -> Option<SideEvent> {
        select_side_event(&self.side_event_odds(level, enemy_probability), rng)
    }

    /// Picks a random non-boss enemy suited to the player's level.
    pub fn pick_enemy<'a, R: Rng + ?Sized>(
        &self,
        catalog: &'a ContentCatalog,
        level: u32,
        rng: &mut R,
    ) -> Option<&'a Enemy> {
        catalog.enemies_for_level(level).choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ChestId, Difficulty, PlayerId, QuestInstanceId, RewardBundle, RiddleId};
    use crate::generation::utils::create_rng;

    fn tile(x: i32, y: i32, terrain: TerrainType) -> TerrainTile {
        TerrainTile::new(PlayerId(1), Position::new(x, y), terrain)
    }

    fn chest(x: i32, y: i32, is_opened: bool) -> TreasureChest {
        TreasureChest {
            id: ChestId(1),
            quest_instance: QuestInstanceId(1),
            riddle_id: RiddleId(1),
            position: Position::new(x, y),
            difficulty: Difficulty::Easy,
            reward: RewardBundle {
                gold: 10,
                xp: 5,
                food: 5,
                special_item: None,
            },
            is_opened,
        }
    }

    #[test]
    fn test_base_probability_on_empty_map() {
        let engine = EncounterProbabilityEngine::default();
        let p = engine.encounter_probability(Position::new(0, 0), &[], &[]);
        assert!((p - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_weights_within_box_only() {
        let engine = EncounterProbabilityEngine::default();
        let tiles = [
            tile(2, 2, TerrainType::Forest),
            tile(-2, 0, TerrainType::Mountain),
            tile(0, 1, TerrainType::River),
            tile(3, 0, TerrainType::River),
            tile(1, 0, TerrainType::Stronghold),
        ];
        let chests = [chest(1, -1, false), chest(0, 2, true), chest(0, 3, false)];

        let p = engine.encounter_probability(Position::new(0, 0), &tiles, &chests);
        assert!((p - (0.05 + 0.02 + 0.03 + 0.04 + 0.04)).abs() < 1e-9);
    }

    #[test]
    fn test_probability_is_capped() {
        let engine = EncounterProbabilityEngine::default();
        let tiles: Vec<_> = (-2..=2)
            .flat_map(|x| (-2..=2).map(move |y| tile(x, y, TerrainType::River)))
            .collect();
        let p = engine.encounter_probability(Position::new(0, 0), &tiles, &[]);
        assert_eq!(p, 0.9);
    }

    #[test]
    fn test_blacksmith_needs_level_four() {
        let engine = EncounterProbabilityEngine::default();
        let has_smith = |level| {
            engine
                .side_event_odds(level, 0.1)
                .iter()
                .any(|(event, _)| *event == SideEvent::Blacksmith)
        };
        assert!(!has_smith(3));
        assert!(has_smith(4));
    }

    #[test]
    fn test_certain_events_are_chosen_uniformly() {
        let mut rng = create_rng(17);
        let odds = [(SideEvent::Npc, 1.0), (SideEvent::Enemy, 1.0), (SideEvent::Trader, 0.0)];
        let mut npc = 0;
        let mut enemy = 0;
        for _ in 0..1000 {
            match select_side_event(&odds, &mut rng) {
                Some(SideEvent::Npc) => npc += 1,
                Some(SideEvent::Enemy) => enemy += 1,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(npc > 400 && enemy > 400);
    }

    #[test]
    fn test_pick_enemy_respects_level() {
        let engine = EncounterProbabilityEngine::default();
        let catalog = ContentCatalog::sample();
        let mut rng = create_rng(2);
        for _ in 0..50 {
            let enemy = engine.pick_enemy(&catalog, 1, &mut rng).unwrap();
            assert!(enemy.min_level <= 1);
            assert!(!enemy.is_boss);
        }
    }
}
