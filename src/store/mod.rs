//! # Persistence Boundary
//!
//! The engine reads and writes durable state only through [`WorldStore`].
//! Implementations must make every write inside a `begin`/`commit` pair
//! visible together or not at all.

pub mod memory;

pub use memory::*;

use crate::game::{
    ChestHint, ChestId, ContentCatalog, Player, PlayerId, Position, QuestId, QuestInstance,
    QuestInstanceId, QuestionRef, RequestId, RiddleId, Team, TeamId, TerrainTile, TreasureChest,
};
use crate::generation::DungeonRoom;
use crate::SquireResult;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How often a player has met one question and whether they ever got it right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAttempt {
    pub player_id: PlayerId,
    pub question: QuestionRef,
    pub times_served: u32,
    pub answered_correctly: bool,
}

impl QuestionAttempt {
    pub fn new(player_id: PlayerId, question: QuestionRef) -> Self {
        Self {
            player_id,
            question,
            times_served: 0,
            answered_correctly: false,
        }
    }
}

/// Chest fields known before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChest {
    pub quest_instance: QuestInstanceId,
    pub riddle_id: RiddleId,
    pub position: Position,
    pub difficulty: crate::game::Difficulty,
    pub reward: crate::game::RewardBundle,
}

/// Durable state the engine depends on.
pub trait WorldStore {
    // =========================================================================
    // Content
    // =========================================================================

    fn catalog(&self) -> &ContentCatalog;

    // =========================================================================
    // Players and teams
    // =========================================================================

    fn player(&self, id: PlayerId) -> SquireResult<Player>;
    fn save_player(&mut self, player: &Player) -> SquireResult<()>;
    fn team(&self, id: TeamId) -> SquireResult<Team>;
    /// Adds to a team's purse in place, so concurrent teammates never overwrite each other.
    fn credit_team(&mut self, id: TeamId, gold: u64, reputation: u64) -> SquireResult<Team>;

    // =========================================================================
    // Terrain
    // =========================================================================

    fn terrain(&self, player: PlayerId) -> SquireResult<Vec<TerrainTile>>;
    fn terrain_at(&self, player: PlayerId, position: Position)
        -> SquireResult<Option<TerrainTile>>;
    /// Fails with `Conflict` if any tile's (player, position) is already taken.
    fn insert_terrain(&mut self, tiles: &[TerrainTile]) -> SquireResult<()>;

    // =========================================================================
    // Quest instances
    // =========================================================================

    fn quest_instance(&self, id: QuestInstanceId) -> SquireResult<QuestInstance>;
    fn find_quest_instance(
        &self,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<Option<QuestInstance>>;
    fn create_quest_instance(
        &mut self,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<QuestInstance>;
    fn save_quest_instance(&mut self, instance: &QuestInstance) -> SquireResult<()>;

    // =========================================================================
    // Chests and hints
    // =========================================================================

    fn chests(&self, instance: QuestInstanceId) -> SquireResult<Vec<TreasureChest>>;
    fn chest(&self, id: ChestId) -> SquireResult<TreasureChest>;
    fn insert_chest(&mut self, chest: NewChest) -> SquireResult<TreasureChest>;
    /// Fails with `Conflict` if the chest is already open.
    fn mark_chest_opened(&mut self, id: ChestId) -> SquireResult<()>;
    fn chest_hints(&self, instance: QuestInstanceId) -> SquireResult<Vec<ChestHint>>;
    /// Returns false if this hint was already recorded.
    fn record_chest_hint(&mut self, hint: ChestHint) -> SquireResult<bool>;

    // =========================================================================
    // Progress
    // =========================================================================

    fn solved_riddles(&self, player: PlayerId, quest: QuestId) -> SquireResult<BTreeSet<RiddleId>>;
    /// Returns false if the riddle was already solved.
    fn record_riddle_solved(
        &mut self,
        player: PlayerId,
        quest: QuestId,
        riddle: RiddleId,
    ) -> SquireResult<bool>;
    fn question_attempt(
        &self,
        player: PlayerId,
        question: QuestionRef,
    ) -> SquireResult<QuestionAttempt>;
    /// Bumps the served counter and returns the new count.
    fn record_question_served(
        &mut self,
        player: PlayerId,
        question: QuestionRef,
    ) -> SquireResult<u32>;
    fn record_question_answer(
        &mut self,
        player: PlayerId,
        question: QuestionRef,
        correct: bool,
    ) -> SquireResult<()>;
    /// Distinct true/false questions and riddles the player has answered
    /// correctly at least once.
    fn correct_question_count(&self, player: PlayerId) -> SquireResult<usize>;

    // =========================================================================
    // Dungeon
    // =========================================================================

    fn dungeon_rooms(&self, player: PlayerId, quest: QuestId) -> SquireResult<Vec<DungeonRoom>>;
    /// Fails with `Conflict` if rooms already exist for (player, quest).
    fn insert_dungeon_rooms(&mut self, rooms: &[DungeonRoom]) -> SquireResult<()>;
    fn cleared_rooms(&self, player: PlayerId, quest: QuestId) -> SquireResult<BTreeSet<Position>>;
    fn mark_room_cleared(
        &mut self,
        player: PlayerId,
        quest: QuestId,
        position: Position,
    ) -> SquireResult<()>;

    // =========================================================================
    // Travel history
    // =========================================================================

    fn record_travel(&mut self, player: PlayerId, position: Position) -> SquireResult<()>;
    fn travel_history(&self, player: PlayerId) -> SquireResult<Vec<Position>>;
    fn clear_travel_history(&mut self, player: PlayerId) -> SquireResult<()>;

    // =========================================================================
    // Idempotency and transactions
    // =========================================================================

    /// Records a request id. Returns false if it was already claimed. A store
    /// may forget its oldest ids once it holds many.
    fn claim_request(&mut self, request: RequestId) -> SquireResult<bool>;

    fn begin(&mut self) -> SquireResult<()>;
    fn commit(&mut self) -> SquireResult<()>;
    fn rollback(&mut self) -> SquireResult<()>;

    /// Runs `f` inside a transaction, rolling back if it fails.
    fn transaction<T, F>(&mut self, f: F) -> SquireResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> SquireResult<T>,
    {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back transaction: {}", err);
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
