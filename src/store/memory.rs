//! # In-Memory Store
//!
//! A [`WorldStore`] held entirely in memory, with snapshot-based rollback and
//! JSON save files. Used by the demo binary and the test suite.
//!
//! Every `begin` clones the whole world, so a transaction costs time and
//! memory in proportion to what the store holds.

use crate::game::{
    ChestHint, ChestId, ContentCatalog, Player, PlayerId, Position, QuestId, QuestInstance,
    QuestInstanceId, QuestionRef, RequestId, RiddleId, Team, TeamId, TerrainTile, TreasureChest,
};
use crate::generation::DungeonRoom;
use crate::store::{NewChest, QuestionAttempt, WorldStore};
use crate::{SquireError, SquireResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::Path;

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct WorldData {
    players: Vec<Player>,
    teams: Vec<Team>,
    terrain: Vec<TerrainTile>,
    quest_instances: Vec<QuestInstance>,
    chests: Vec<TreasureChest>,
    chest_hints: Vec<ChestHint>,
    solved_riddles: Vec<(PlayerId, QuestId, RiddleId)>,
    question_attempts: Vec<QuestionAttempt>,
    dungeon_rooms: Vec<DungeonRoom>,
    cleared_rooms: Vec<(PlayerId, QuestId, Position)>,
    travel_history: Vec<(PlayerId, Position)>,
    claimed_requests: HashSet<RequestId>,
    /// Claim order, oldest first
    #[serde(default)]
    claim_order: VecDeque<RequestId>,
    next_chest_id: u32,
    next_instance_id: u32,
}

/// Request ids remembered for replay detection before the oldest are forgotten.
pub const CLAIMED_REQUEST_LIMIT: usize = 4096;

/// On-disk form of a [`MemoryStore`].
#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    version: String,
    catalog: ContentCatalog,
    data: WorldData,
}

/// In-memory world store.
///
/// # Examples
///
/// ```
/// use squire::{ContentCatalog, MemoryStore, Player, PlayerId, Team, TeamId, WorldStore};
///
/// let mut store = MemoryStore::new(ContentCatalog::sample());
/// store.insert_team(Team::new(TeamId(1), "Owls"));
/// store.save_player(&Player::new(PlayerId(1), "Ada", TeamId(1))).unwrap();
/// assert_eq!(store.player(PlayerId(1)).unwrap().name, "Ada");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    catalog: ContentCatalog,
    data: WorldData,
    snapshots: Vec<WorldData>,
    request_limit: usize,
}

impl MemoryStore {
    pub fn new(catalog: ContentCatalog) -> Self {
        Self {
            catalog,
            data: WorldData {
                next_chest_id: 1,
                next_instance_id: 1,
                ..WorldData::default()
            },
            snapshots: Vec::new(),
            request_limit: CLAIMED_REQUEST_LIMIT,
        }
    }

    /// Keeps at most `limit` claimed request ids.
    pub fn with_request_limit(mut self, limit: usize) -> Self {
        self.request_limit = limit;
        self
    }

    /// Adds or replaces a team.
    pub fn insert_team(&mut self, team: Team) {
        self.data.teams.retain(|existing| existing.id != team.id);
        self.data.teams.push(team);
    }

    /// Depth of open transactions.
    pub fn transaction_depth(&self) -> usize {
        self.snapshots.len()
    }

    /// Writes the catalog and world state to a JSON file.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> SquireResult<()> {
        let save = SaveFile {
            version: crate::VERSION.to_string(),
            catalog: self.catalog.clone(),
            data: self.data.clone(),
        };
        let json = serde_json::to_string_pretty(&save)?;
        std::fs::write(path.as_ref(), json)?;
        info!("Saved world to {}", path.as_ref().display());
        Ok(())
    }

    /// Restores a store written by [`MemoryStore::save_to_path`].
    pub fn load_from_path(path: impl AsRef<Path>) -> SquireResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let save: SaveFile = serde_json::from_str(&raw)?;
        if save.version != crate::VERSION {
            debug!(
                "Loading save from version {} into {}",
                save.version,
                crate::VERSION
            );
        }
        Ok(Self {
            catalog: save.catalog,
            data: save.data,
            snapshots: Vec::new(),
            request_limit: CLAIMED_REQUEST_LIMIT,
        })
    }

    fn attempt_mut(&mut self, player: PlayerId, question: QuestionRef) -> &mut QuestionAttempt {
        let index = match self
            .data
            .question_attempts
            .iter()
            .position(|attempt| attempt.player_id == player && attempt.question == question)
        {
            Some(index) => index,
            None => {
                self.data
                    .question_attempts
                    .push(QuestionAttempt::new(player, question));
                self.data.question_attempts.len() - 1
            }
        };
        &mut self.data.question_attempts[index]
    }
}

impl WorldStore for MemoryStore {
    fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    fn player(&self, id: PlayerId) -> SquireResult<Player> {
        self.data
            .players
            .iter()
            .find(|player| player.id == id)
            .cloned()
            .ok_or_else(|| SquireError::NotFound(format!("player {}", id)))
    }

    fn save_player(&mut self, player: &Player) -> SquireResult<()> {
        match self.data.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player.clone(),
            None => self.data.players.push(player.clone()),
        }
        Ok(())
    }

    fn team(&self, id: TeamId) -> SquireResult<Team> {
        self.data
            .teams
            .iter()
            .find(|team| team.id == id)
            .cloned()
            .ok_or_else(|| SquireError::NotFound(format!("team {}", id)))
    }

    fn credit_team(&mut self, id: TeamId, gold: u64, reputation: u64) -> SquireResult<Team> {
        let team = self
            .data
            .teams
            .iter_mut()
            .find(|team| team.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("team {}", id)))?;
        team.gold = team.gold.saturating_add(gold);
        team.reputation = team.reputation.saturating_add(reputation);
        Ok(team.clone())
    }

    fn terrain(&self, player: PlayerId) -> SquireResult<Vec<TerrainTile>> {
        Ok(self
            .data
            .terrain
            .iter()
            .filter(|tile| tile.player_id == player)
            .copied()
            .collect())
    }

    fn terrain_at(
        &self,
        player: PlayerId,
        position: Position,
    ) -> SquireResult<Option<TerrainTile>> {
        Ok(self
            .data
            .terrain
            .iter()
            .find(|tile| tile.player_id == player && tile.position == position)
            .copied())
    }

    fn insert_terrain(&mut self, tiles: &[TerrainTile]) -> SquireResult<()> {
        let mut taken: HashSet<(PlayerId, Position)> = self
            .data
            .terrain
            .iter()
            .map(|tile| (tile.player_id, tile.position))
            .collect();
        for tile in tiles {
            if !taken.insert((tile.player_id, tile.position)) {
                return Err(SquireError::Conflict(format!(
                    "terrain already exists at {} for player {}",
                    tile.position, tile.player_id
                )));
            }
        }
        self.data.terrain.extend_from_slice(tiles);
        Ok(())
    }

    fn quest_instance(&self, id: QuestInstanceId) -> SquireResult<QuestInstance> {
        self.data
            .quest_instances
            .iter()
            .find(|instance| instance.id == id)
            .cloned()
            .ok_or_else(|| SquireError::NotFound(format!("quest instance {}", id)))
    }

    fn find_quest_instance(
        &self,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<Option<QuestInstance>> {
        Ok(self
            .data
            .quest_instances
            .iter()
            .find(|instance| instance.player_id == player && instance.quest_id == quest)
            .cloned())
    }

    fn create_quest_instance(
        &mut self,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<QuestInstance> {
        if self.find_quest_instance(player, quest)?.is_some() {
            return Err(SquireError::Conflict(format!(
                "player {} already has an instance of quest {}",
                player, quest
            )));
        }
        let instance =
            QuestInstance::new(QuestInstanceId(self.data.next_instance_id), player, quest);
        self.data.next_instance_id += 1;
        self.data.quest_instances.push(instance.clone());
        Ok(instance)
    }

    fn save_quest_instance(&mut self, instance: &QuestInstance) -> SquireResult<()> {
        let existing = self
            .data
            .quest_instances
            .iter_mut()
            .find(|existing| existing.id == instance.id)
            .ok_or_else(|| SquireError::NotFound(format!("quest instance {}", instance.id)))?;
        *existing = instance.clone();
        Ok(())
    }

    fn chests(&self, instance: QuestInstanceId) -> SquireResult<Vec<TreasureChest>> {
        Ok(self
            .data
            .chests
            .iter()
            .filter(|chest| chest.quest_instance == instance)
            .cloned()
            .collect())
    }

    fn chest(&self, id: ChestId) -> SquireResult<TreasureChest> {
        self.data
            .chests
            .iter()
            .find(|chest| chest.id == id)
            .cloned()
            .ok_or_else(|| SquireError::NotFound(format!("chest {}", id)))
    }

    fn insert_chest(&mut self, chest: NewChest) -> SquireResult<TreasureChest> {
        let duplicate = self.data.chests.iter().any(|existing| {
            existing.quest_instance == chest.quest_instance && existing.riddle_id == chest.riddle_id
        });
        if duplicate {
            return Err(SquireError::Conflict(format!(
                "riddle {} already has a chest in instance {}",
                chest.riddle_id, chest.quest_instance
            )));
        }
        let stored = TreasureChest {
            id: ChestId(self.data.next_chest_id),
            quest_instance: chest.quest_instance,
            riddle_id: chest.riddle_id,
            position: chest.position,
            difficulty: chest.difficulty,
            reward: chest.reward,
            is_opened: false,
        };
        self.data.next_chest_id += 1;
        self.data.chests.push(stored.clone());
        Ok(stored)
    }

    fn mark_chest_opened(&mut self, id: ChestId) -> SquireResult<()> {
        let chest = self
            .data
            .chests
            .iter_mut()
            .find(|chest| chest.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("chest {}", id)))?;
        if chest.is_opened {
            return Err(SquireError::Conflict(format!("chest {} is already open", id)));
        }
        chest.is_opened = true;
        Ok(())
    }

    fn chest_hints(&self, instance: QuestInstanceId) -> SquireResult<Vec<ChestHint>> {
        Ok(self
            .data
            .chest_hints
            .iter()
            .filter(|hint| hint.quest_instance == instance)
            .copied()
            .collect())
    }

    fn record_chest_hint(&mut self, hint: ChestHint) -> SquireResult<bool> {
        if self.data.chest_hints.contains(&hint) {
            return Ok(false);
        }
        self.data.chest_hints.push(hint);
        Ok(true)
    }

    fn solved_riddles(&self, player: PlayerId, quest: QuestId) -> SquireResult<BTreeSet<RiddleId>> {
        Ok(self
            .data
            .solved_riddles
            .iter()
            .filter(|(p, q, _)| *p == player && *q == quest)
            .map(|(_, _, riddle)| *riddle)
            .collect())
    }

    fn record_riddle_solved(
        &mut self,
        player: PlayerId,
        quest: QuestId,
        riddle: RiddleId,
    ) -> SquireResult<bool> {
        let row = (player, quest, riddle);
        if self.data.solved_riddles.contains(&row) {
            return Ok(false);
        }
        self.data.solved_riddles.push(row);
        Ok(true)
    }

    fn question_attempt(
        &self,
        player: PlayerId,
        question: QuestionRef,
    ) -> SquireResult<QuestionAttempt> {
        Ok(self
            .data
            .question_attempts
            .iter()
            .find(|attempt| attempt.player_id == player && attempt.question == question)
            .copied()
            .unwrap_or_else(|| QuestionAttempt::new(player, question)))
    }

    fn record_question_served(
        &mut self,
        player: PlayerId,
        question: QuestionRef,
    ) -> SquireResult<u32> {
        let attempt = self.attempt_mut(player, question);
        attempt.times_served += 1;
        Ok(attempt.times_served)
    }

    fn record_question_answer(
        &mut self,
        player: PlayerId,
        question: QuestionRef,
        correct: bool,
    ) -> SquireResult<()> {
        let attempt = self.attempt_mut(player, question);
        attempt.answered_correctly |= correct;
        Ok(())
    }

    fn correct_question_count(&self, player: PlayerId) -> SquireResult<usize> {
        Ok(self
            .data
            .question_attempts
            .iter()
            .filter(|attempt| {
                attempt.player_id == player
                    && attempt.answered_correctly
                    && matches!(
                        attempt.question,
                        QuestionRef::TrueFalse(_) | QuestionRef::Riddle(_)
                    )
            })
            .count())
    }

    fn dungeon_rooms(&self, player: PlayerId, quest: QuestId) -> SquireResult<Vec<DungeonRoom>> {
        Ok(self
            .data
            .dungeon_rooms
            .iter()
            .filter(|room| room.player_id == player && room.quest_id == quest)
            .cloned()
            .collect())
    }

    fn insert_dungeon_rooms(&mut self, rooms: &[DungeonRoom]) -> SquireResult<()> {
        let owners: BTreeSet<(PlayerId, QuestId)> = rooms
            .iter()
            .map(|room| (room.player_id, room.quest_id))
            .collect();
        for (player, quest) in owners {
            if !self.dungeon_rooms(player, quest)?.is_empty() {
                return Err(SquireError::Conflict(format!(
                    "dungeon for player {} quest {} already exists",
                    player, quest
                )));
            }
        }
        self.data.dungeon_rooms.extend_from_slice(rooms);
        Ok(())
    }

    fn cleared_rooms(&self, player: PlayerId, quest: QuestId) -> SquireResult<BTreeSet<Position>> {
        Ok(self
            .data
            .cleared_rooms
            .iter()
            .filter(|(p, q, _)| *p == player && *q == quest)
            .map(|(_, _, position)| *position)
            .collect())
    }

    fn mark_room_cleared(
        &mut self,
        player: PlayerId,
        quest: QuestId,
        position: Position,
    ) -> SquireResult<()> {
        let row = (player, quest, position);
        if !self.data.cleared_rooms.contains(&row) {
            self.data.cleared_rooms.push(row);
        }
        Ok(())
    }

    fn record_travel(&mut self, player: PlayerId, position: Position) -> SquireResult<()> {
        self.data.travel_history.push((player, position));
        Ok(())
    }

    fn travel_history(&self, player: PlayerId) -> SquireResult<Vec<Position>> {
        Ok(self
            .data
            .travel_history
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, position)| *position)
            .collect())
    }

    fn clear_travel_history(&mut self, player: PlayerId) -> SquireResult<()> {
        self.data.travel_history.retain(|(p, _)| *p != player);
        Ok(())
    }

    fn claim_request(&mut self, request: RequestId) -> SquireResult<bool> {
        if !self.data.claimed_requests.insert(request) {
            return Ok(false);
        }
        self.data.claim_order.push_back(request);
        while self.data.claim_order.len() > self.request_limit {
            if let Some(oldest) = self.data.claim_order.pop_front() {
                self.data.claimed_requests.remove(&oldest);
            }
        }
        Ok(true)
    }

    fn begin(&mut self) -> SquireResult<()> {
        self.snapshots.push(self.data.clone());
        Ok(())
    }

    fn commit(&mut self) -> SquireResult<()> {
        self.snapshots
            .pop()
            .map(|_| ())
            .ok_or_else(|| SquireError::Conflict("commit without an open transaction".to_string()))
    }

    fn rollback(&mut self) -> SquireResult<()> {
        let snapshot = self.snapshots.pop().ok_or_else(|| {
            SquireError::Conflict("rollback without an open transaction".to_string())
        })?;
        self.data = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TerrainType;

    fn store_with_player() -> MemoryStore {
        let mut store = MemoryStore::new(ContentCatalog::sample());
        store.insert_team(Team::new(TeamId(1), "Owls"));
        store
            .save_player(&Player::new(PlayerId(1), "Ada", TeamId(1)))
            .unwrap();
        store
    }

    #[test]
    fn test_insert_terrain_rejects_duplicates() {
        let mut store = store_with_player();
        let tile = TerrainTile::new(PlayerId(1), Position::new(3, 3), TerrainType::Forest);
        store.insert_terrain(&[tile]).unwrap();

        let dup = TerrainTile::new(PlayerId(1), Position::new(3, 3), TerrainType::River);
        assert!(matches!(
            store.insert_terrain(&[dup]),
            Err(SquireError::Conflict(_))
        ));

        // Same coordinate for another player is fine
        let other = TerrainTile::new(PlayerId(2), Position::new(3, 3), TerrainType::River);
        store.insert_terrain(&[other]).unwrap();
        assert_eq!(store.terrain(PlayerId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut store = store_with_player();

        let result: SquireResult<()> = store.transaction(|store| {
            store.credit_team(TeamId(1), 50, 2)?;
            Err(SquireError::InvalidAction("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.team(TeamId(1)).unwrap().gold, 0);
        assert_eq!(store.transaction_depth(), 0);
    }

    #[test]
    fn test_nested_transactions() {
        let mut store = store_with_player();
        store.begin().unwrap();
        store.credit_team(TeamId(1), 10, 0).unwrap();
        store.begin().unwrap();
        store.credit_team(TeamId(1), 5, 0).unwrap();
        store.rollback().unwrap();
        store.commit().unwrap();

        assert_eq!(store.team(TeamId(1)).unwrap().gold, 10);
        assert!(store.commit().is_err());
    }

    #[test]
    fn test_claim_request_once() {
        let mut store = store_with_player();
        let request = RequestId::new();
        assert!(store.claim_request(request).unwrap());
        assert!(!store.claim_request(request).unwrap());
    }

    #[test]
    fn test_claimed_requests_are_bounded() {
        let mut store = store_with_player().with_request_limit(2);
        let first = RequestId::new();
        let second = RequestId::new();
        let third = RequestId::new();
        assert!(store.claim_request(first).unwrap());
        assert!(store.claim_request(second).unwrap());
        assert!(store.claim_request(third).unwrap());

        assert_eq!(store.data.claimed_requests.len(), 2);
        assert!(!store.claim_request(third).unwrap());
        assert!(!store.claim_request(second).unwrap());
        // Forgotten, so it claims again and pushes out the next oldest.
        assert!(store.claim_request(first).unwrap());
        assert!(store.claim_request(second).unwrap());
    }

    #[test]
    fn test_chest_opens_once() {
        let mut store = store_with_player();
        let instance = store.create_quest_instance(PlayerId(1), QuestId(1)).unwrap();
        let chest = store
            .insert_chest(NewChest {
                quest_instance: instance.id,
                riddle_id: RiddleId(1),
                position: Position::new(4, 4),
                difficulty: crate::game::Difficulty::Easy,
                reward: crate::game::RewardBundle {
                    gold: 10,
                    xp: 5,
                    food: 5,
                    special_item: None,
                },
            })
            .unwrap();

        store.mark_chest_opened(chest.id).unwrap();
        assert!(store.chest(chest.id).unwrap().is_opened);
        assert!(matches!(
            store.mark_chest_opened(chest.id),
            Err(SquireError::Conflict(_))
        ));
    }

    #[test]
    fn test_question_attempts_accumulate() {
        let mut store = store_with_player();
        let question = QuestionRef::TrueFalse(crate::game::QuestionId(1));

        assert_eq!(store.record_question_served(PlayerId(1), question).unwrap(), 1);
        assert_eq!(store.record_question_served(PlayerId(1), question).unwrap(), 2);
        store.record_question_answer(PlayerId(1), question, true).unwrap();
        store.record_question_answer(PlayerId(1), question, false).unwrap();

        let attempt = store.question_attempt(PlayerId(1), question).unwrap();
        assert_eq!(attempt.times_served, 2);
        assert!(attempt.answered_correctly);
        assert_eq!(store.correct_question_count(PlayerId(1)).unwrap(), 1);
    }

    #[test]
    fn test_correct_count_skips_multiple_choice() {
        let mut store = store_with_player();
        let choice = QuestionRef::MultipleChoice(crate::game::QuestionId(1));
        let riddle = QuestionRef::Riddle(RiddleId(1));

        store.record_question_answer(PlayerId(1), choice, true).unwrap();
        assert_eq!(store.correct_question_count(PlayerId(1)).unwrap(), 0);

        store.record_question_answer(PlayerId(1), riddle, true).unwrap();
        store.record_question_answer(PlayerId(1), riddle, true).unwrap();
        assert_eq!(store.correct_question_count(PlayerId(1)).unwrap(), 1);
    }

    #[test]
    fn test_save_and_load_round_trip() -> SquireResult<()> {
        let mut store = store_with_player();
        store.insert_terrain(&[TerrainTile::new(
            PlayerId(1),
            Position::new(1, 2),
            TerrainType::Mountain,
        )])?;
        store.claim_request(RequestId::new())?;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("world.json");
        store.save_to_path(&path)?;

        let loaded = MemoryStore::load_from_path(&path)?;
        assert_eq!(loaded.data, store.data);
        assert_eq!(loaded.catalog(), store.catalog());
        Ok(())
    }
}
