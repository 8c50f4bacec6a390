//! Property-based tests for world generation and encounter odds.
//!
//! Run with: cargo test --release generation_properties

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

use squire::config::{SOUTHWEST_LANDMARK, STRONGHOLD, VILLAGE};
use squire::{
    exits_for, ChestId, ContentCatalog, Difficulty, DungeonConfig, DungeonGenerator,
    EncounterConfig, EncounterProbabilityEngine, GenerationRequest, Generator, PlayerId, Position,
    QuestId, QuestInstanceId, RewardAllocator, RewardBundle, RiddleId, RoomType, TerrainConfig,
    TerrainGenerator, TerrainTile, TerrainType, TreasureChest,
};

fn chest_at(id: u32, position: Position, is_opened: bool) -> TreasureChest {
    TreasureChest {
        id: ChestId(id),
        quest_instance: QuestInstanceId(1),
        riddle_id: RiddleId(id),
        position,
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Fresh terrain never stacks tiles, never covers the village or the
    /// southwest landmark, and has exactly one stronghold.
    #[test]
    fn prop_terrain_is_disjoint(seed in any::<u64>(), level in 1u32..6, quest in 1u32..4) {
        let generator = TerrainGenerator::new(TerrainConfig::default());
        let request = GenerationRequest::fresh(PlayerId(1), QuestId(quest), level);
        let plan = generator.generate(&request, &mut StdRng::seed_from_u64(seed)).unwrap();

        let positions: HashSet<Position> = plan.tiles.iter().map(|tile| tile.position).collect();
        prop_assert_eq!(positions.len(), plan.tiles.len());
        prop_assert!(!positions.contains(&VILLAGE));
        prop_assert!(!positions.contains(&SOUTHWEST_LANDMARK));
        prop_assert_eq!(plan.report.total(), plan.tiles.len());

        let strongholds: Vec<&TerrainTile> = plan
            .tiles
            .iter()
            .filter(|tile| tile.terrain == TerrainType::Stronghold)
            .collect();
        prop_assert_eq!(strongholds.len(), 1);
        prop_assert_eq!(strongholds[0].position, STRONGHOLD);
        prop_assert!(generator.validate(&plan, &request).is_ok());
    }

    /// Running generation again over its own output adds nothing.
    #[test]
    fn prop_terrain_second_pass_is_empty(seed in any::<u64>(), level in 1u32..4) {
        let generator = TerrainGenerator::new(TerrainConfig::default());
        let request = GenerationRequest::fresh(PlayerId(1), QuestId(1), level);
        let first = generator.generate(&request, &mut StdRng::seed_from_u64(seed)).unwrap();

        let again = GenerationRequest {
            existing_terrain: &first.tiles,
            ..request
        };
        let second = generator.generate(&again, &mut StdRng::seed_from_u64(seed ^ 1)).unwrap();
        prop_assert!(second.tiles.is_empty());
    }

    /// Every dungeon has one entrance, one boss room, and doors that match
    /// its neighbours.
    #[test]
    fn prop_dungeon_exits_match_neighbours(seed in any::<u64>(), rooms in 2u32..20) {
        let config = DungeonConfig {
            room_count: rooms,
            ..DungeonConfig::default()
        };
        let generator = DungeonGenerator::new(config);
        let request = GenerationRequest::fresh(PlayerId(1), QuestId(3), 1);
        let dungeon = generator.generate(&request, &mut StdRng::seed_from_u64(seed)).unwrap();

        prop_assert_eq!(dungeon.len(), rooms as usize);
        let occupied: HashSet<Position> = dungeon.iter().map(|room| room.position).collect();
        prop_assert!(occupied.contains(&Position::origin()));
        prop_assert_eq!(
            dungeon.iter().filter(|room| room.room_type == RoomType::Boss).count(),
            1
        );
        for room in &dungeon {
            prop_assert_eq!(&room.allowed_directions, &exits_for(room.position, &occupied));
        }
    }

    /// Encounter odds stay within the configured ceiling and never drop when
    /// another unopened chest appears nearby.
    #[test]
    fn prop_encounter_probability_bounded(
        x in -100i32..100,
        y in -100i32..100,
        forests in 0usize..40,
        chests in 0u32..6
    ) {
        let engine = EncounterProbabilityEngine::new(EncounterConfig::default());
        let here = Position::new(x, y);
        let terrain: Vec<TerrainTile> = (0..forests)
            .map(|i| {
                let offset = Position::new((i % 7) as i32 - 3, (i / 7) as i32 - 3);
                TerrainTile::new(PlayerId(1), here + offset, TerrainType::Forest)
            })
            .collect();
        let mut placed: Vec<TreasureChest> = (0..chests)
            .map(|i| chest_at(i, here + Position::new(i as i32 % 3 - 1, 1), false))
            .collect();

        let before = engine.encounter_probability(here, &terrain, &placed);
        prop_assert!((0.0..=engine.config.max_probability).contains(&before));

        placed.push(chest_at(99, here, false));
        let after = engine.encounter_probability(here, &terrain, &placed);
        prop_assert!(after >= before);
        prop_assert!(after <= engine.config.max_probability);

        placed.iter_mut().for_each(|chest| chest.is_opened = true);
        let opened = engine.encounter_probability(here, &terrain, &placed);
        prop_assert!(opened <= after);
    }

    /// Rewards stay inside their tier's ranges; easy rewards carry no item.
    #[test]
    fn prop_rewards_within_ranges(seed in any::<u64>(), level in 1u32..8) {
        let catalog = ContentCatalog::sample();
        let allocator = RewardAllocator::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let easy = allocator.allocate_reward(Difficulty::Easy, level, &catalog, &mut rng);
        prop_assert!((10..=20).contains(&easy.gold));
        prop_assert!((5..=15).contains(&easy.xp));
        prop_assert!((5..=10).contains(&easy.food));
        prop_assert!(easy.special_item.is_none());

        let hard = allocator.allocate_reward(Difficulty::Hard, level, &catalog, &mut rng);
        prop_assert!((50..=75).contains(&hard.gold));
        prop_assert!((30..=50).contains(&hard.xp));
        prop_assert!((15..=30).contains(&hard.food));
        if let Some(item) = hard.special_item {
            let stock = catalog
                .wizard_items
                .iter()
                .find(|wizard| wizard.name == item.name)
                .unwrap();
            prop_assert!(stock.min_level <= level);
            prop_assert_eq!(item.uses, stock.uses + 25);
        }
    }
}
