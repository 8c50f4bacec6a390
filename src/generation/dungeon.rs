//! # Dungeon Generation
//!
//! Builds the end-game dungeon: a small grid of typed rooms grown outward from
//! an entrance at the origin, with the boss waiting in the room farthest from
//! the door.
//!
//! Rooms use screen orientation, so a room's north exit leads to `y - 1`.
//! Exits are never chosen independently; they are read off the room set, which
//! keeps every passage two-way.

use crate::config::DungeonConfig;
use crate::game::{Direction, PlayerId, Position, QuestId};
use crate::generation::{GenerationRequest, Generator};
use crate::{SquireError, SquireResult};
use log::{debug, warn};
use pathfinding::prelude::{bfs_reach, dijkstra_all};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The challenge a dungeon room presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    MultipleChoice,
    TrueFalse,
    Riddle,
    Treasure,
    Boss,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomType::MultipleChoice => write!(f, "mcq"),
            RoomType::TrueFalse => write!(f, "true_false"),
            RoomType::Riddle => write!(f, "riddle"),
            RoomType::Treasure => write!(f, "treasure"),
            RoomType::Boss => write!(f, "boss"),
        }
    }
}

/// One room of a generated dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonRoom {
    pub player_id: PlayerId,
    pub quest_id: QuestId,
    pub position: Position,
    pub room_type: RoomType,
    pub allowed_directions: Vec<Direction>,
}

impl DungeonRoom {
    pub fn allows(&self, direction: Direction) -> bool {
        self.allowed_directions.contains(&direction)
    }
}

/// Directions from `position` that lead to another room of the set.
pub fn exits_for(position: Position, rooms: &HashSet<Position>) -> Vec<Direction> {
    Direction::all()
        .into_iter()
        .filter(|dir| rooms.contains(&(position + dir.to_delta())))
        .collect()
}

/// Read-only view over one player's dungeon for navigation.
#[derive(Debug, Clone)]
pub struct DungeonMap {
    rooms: Vec<DungeonRoom>,
}

impl DungeonMap {
    pub fn new(rooms: Vec<DungeonRoom>) -> Self {
        Self { rooms }
    }

    pub fn rooms(&self) -> &[DungeonRoom] {
        &self.rooms
    }

    pub fn room_at(&self, position: Position) -> Option<&DungeonRoom> {
        self.rooms.iter().find(|room| room.position == position)
    }

    /// Moves through an exit of the room at `from`.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{DungeonMap, DungeonRoom, Direction, PlayerId, Position, QuestId, RoomType};
    ///
    /// let room = |x, y, exits: Vec<Direction>, room_type| DungeonRoom {
    ///     player_id: PlayerId(1),
    ///     quest_id: QuestId(1),
    ///     position: Position::new(x, y),
    ///     room_type,
    ///     allowed_directions: exits,
    /// };
    /// let map = DungeonMap::new(vec![
    ///     room(0, 0, vec![Direction::North], RoomType::Riddle),
    ///     room(0, -1, vec![Direction::South], RoomType::Boss),
    /// ]);
    ///
    /// let next = map.step(Position::new(0, 0), Direction::North).unwrap();
    /// assert_eq!(next.room_type, RoomType::Boss);
    /// assert!(map.step(Position::new(0, 0), Direction::East).is_err());
    /// ```
    pub fn step(&self, from: Position, direction: Direction) -> SquireResult<&DungeonRoom> {
        let room = self
            .room_at(from)
            .ok_or_else(|| SquireError::StaleSessionState(format!("no dungeon room at {}", from)))?;
        if !room.allows(direction) {
            return Err(SquireError::InvalidAction(format!(
                "There is no door to the {:?}.",
                direction
            )));
        }
        let target = from + direction.to_delta();
        self.room_at(target).ok_or_else(|| {
            SquireError::StaleSessionState(format!("exit from {} leads nowhere", from))
        })
    }
}

/// End-game dungeon generator.
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator {
    pub config: DungeonConfig,
}

impl DungeonGenerator {
    pub fn new(config: DungeonConfig) -> Self {
        Self { config }
    }

    /// Grows a connected set of room positions from the origin.
    fn grow_layout(&self, target: usize, rng: &mut StdRng) -> SquireResult<Vec<Position>> {
        let mut positions = vec![Position::origin()];
        let mut occupied: HashSet<Position> = positions.iter().copied().collect();
        let mut attempts = 0;

        while positions.len() < target {
            if attempts >= self.config.max_attempts {
                warn!("Dungeon growth stalled at {} of {} rooms", positions.len(), target);
                return Err(SquireError::GenerationExhausted {
                    phase: "dungeon".to_string(),
                    placed: positions.len(),
                    requested: target,
                });
            }
            attempts += 1;

            let (Some(from), Some(direction)) =
                (positions.choose(rng).copied(), Direction::all().choose(rng).copied())
            else {
                continue;
            };
            let candidate = from + direction.to_delta();
            if occupied.insert(candidate) {
                positions.push(candidate);
            }
        }

        Ok(positions)
    }

    /// The room with the longest walk from the entrance.
    fn farthest_room(positions: &[Position], occupied: &HashSet<Position>) -> Position {
        let distances = dijkstra_all(&Position::origin(), |pos: &Position| {
            exits_for(*pos, occupied)
                .into_iter()
                .map(|dir| (*pos + dir.to_delta(), 1usize))
                .collect::<Vec<_>>()
        });

        positions
            .iter()
            .copied()
            .filter(|pos| *pos != Position::origin())
            .max_by_key(|pos| distances.get(pos).map(|(_, cost)| *cost).unwrap_or(0))
            .unwrap_or_else(Position::origin)
    }

    fn room_weights(&self) -> SquireResult<WeightedIndex<u32>> {
        let weights = &self.config.room_weights;
        WeightedIndex::new([
            weights.multiple_choice,
            weights.true_false,
            weights.riddle,
            weights.treasure,
        ])
        .map_err(|err| SquireError::InvalidConfig(format!("dungeon room weights: {}", err)))
    }
}

impl Generator<Vec<DungeonRoom>> for DungeonGenerator {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        rng: &mut StdRng,
    ) -> SquireResult<Vec<DungeonRoom>> {
        const ROOM_TYPES: [RoomType; 4] = [
            RoomType::MultipleChoice,
            RoomType::TrueFalse,
            RoomType::Riddle,
            RoomType::Treasure,
        ];

        let weights = self.room_weights()?;
        let target = (self.config.room_count as usize).max(2);
        let positions = self.grow_layout(target, rng)?;
        let occupied: HashSet<Position> = positions.iter().copied().collect();
        let boss_at = Self::farthest_room(&positions, &occupied);

        let rooms: Vec<DungeonRoom> = positions
            .iter()
            .map(|&position| DungeonRoom {
                player_id: request.player_id,
                quest_id: request.quest_id,
                position,
                room_type: if position == boss_at {
                    RoomType::Boss
                } else {
                    ROOM_TYPES[weights.sample(rng)]
                },
                allowed_directions: exits_for(position, &occupied),
            })
            .collect();

        debug!(
            "Generated {} dungeon rooms for player {} quest {}, boss at {}",
            rooms.len(),
            request.player_id,
            request.quest_id,
            boss_at
        );

        Ok(rooms)
    }

    fn validate(&self, rooms: &Vec<DungeonRoom>, _request: &GenerationRequest<'_>) -> SquireResult<()> {
        let occupied: HashSet<Position> = rooms.iter().map(|room| room.position).collect();
        if occupied.len() != rooms.len() {
            return Err(SquireError::Conflict("two dungeon rooms share a cell".to_string()));
        }
        if !occupied.contains(&Position::origin()) {
            return Err(SquireError::InvalidAction("dungeon has no entrance".to_string()));
        }

        let bosses = rooms
            .iter()
            .filter(|room| room.room_type == RoomType::Boss)
            .count();
        if bosses != 1 {
            return Err(SquireError::InvalidAction(format!(
                "dungeon has {} boss rooms",
                bosses
            )));
        }

        for room in rooms {
            if room.allowed_directions != exits_for(room.position, &occupied) {
                return Err(SquireError::InvalidAction(format!(
                    "exits of room {} do not match its neighbours",
                    room.position
                )));
            }
        }

        let reachable = bfs_reach(Position::origin(), |pos| {
            exits_for(*pos, &occupied)
                .into_iter()
                .map(|dir| *pos + dir.to_delta())
                .collect::<Vec<_>>()
        })
        .count();
        if reachable != rooms.len() {
            return Err(SquireError::InvalidAction(format!(
                "only {} of {} dungeon rooms are reachable",
                reachable,
                rooms.len()
            )));
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "DungeonGenerator"
    }
}
