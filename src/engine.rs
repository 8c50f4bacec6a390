//! # Game Engine
//!
//! One method per player action. Each action loads what it needs from the
//! [`WorldStore`], runs the generation, encounter, combat and progress rules,
//! and writes the result back in a single transaction.

use crate::combat::{
    serve_question, BossEncounter, CombatAction, CombatOutcome, CombatPhase, CombatResolver,
    CombatSession, CombatStep, Encounter, EnemyEncounter, QuestionKind, QuestionScope,
};
use crate::config::{EngineConfig, FOOD_ITEM_NAME, VILLAGE};
use crate::game::{
    ChestHint, ChestId, Difficulty, Direction, InventoryItem, ItemKind, Player, PlayerId,
    Position, ProgressSummary, QuestCompletion, QuestGate, QuestId, QuestInstance,
    QuestInstanceId, QuestProgressTracker, QuestionRef, RequestId, RewardBundle,
    RiddleChallenge, SpecialItemGrant, TerrainTile, TerrainType,
};
use crate::generation::utils::create_rng;
use crate::generation::{
    DungeonGenerator, DungeonMap, DungeonRoom, EncounterProbabilityEngine, GenerationRequest,
    Generator, RewardAllocator, SideEvent, TerrainGenerator, TerrainReport,
};
use crate::store::WorldStore;
use crate::{SquireError, SquireResult};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What the player asked to do on the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveCommand {
    Step(Direction),
    Wait,
    ReturnToVillage,
}

/// Features near the player after a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDelta {
    pub terrain: Vec<TerrainTile>,
    /// Unopened chests the player has been told about
    pub hinted_chests: Vec<Position>,
}

/// Something that happened because of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggeredEvent {
    QuestCompleted(QuestCompletion),
    Boss(BossEncounter),
    Treasure {
        chest_id: ChestId,
        challenge: RiddleChallenge,
    },
    Npc {
        revealed_chest: Option<Position>,
    },
    Trader,
    Riddle(RiddleChallenge),
    Blacksmith,
    Enemy(EnemyEncounter),
}

/// Result of one movement command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementOutcome {
    pub position: Position,
    pub map_delta: MapDelta,
    pub event: Option<TriggeredEvent>,
    pub encounter_probability: f64,
    pub messages: Vec<String>,
}

/// Result of trying a chest's riddle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestOpening {
    pub correct: bool,
    pub reward: Option<RewardBundle>,
    pub level_up: Option<u32>,
}

/// Result of answering a wandering riddle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiddleAnswer {
    pub correct: bool,
    pub item: Option<SpecialItemGrant>,
}

/// The engine facade.
pub struct GameEngine<S: WorldStore> {
    store: S,
    config: EngineConfig,
    rng: StdRng,
    terrain: TerrainGenerator,
    dungeon: DungeonGenerator,
    encounters: EncounterProbabilityEngine,
    combat: CombatResolver,
    rewards: RewardAllocator,
    progress: QuestProgressTracker,
}

impl<S: WorldStore> GameEngine<S> {
    /// Creates an engine whose randomness is seeded from `config.seed`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            rng: create_rng(config.seed),
            terrain: TerrainGenerator::new(config.terrain.clone()),
            dungeon: DungeonGenerator::new(config.dungeon.clone()),
            encounters: EncounterProbabilityEngine::new(config.encounters.clone()),
            combat: CombatResolver::new(config.combat.clone()),
            rewards: RewardAllocator::new(),
            progress: QuestProgressTracker::new(config.progress.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs `f` in a store transaction with access to the whole engine.
    fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> SquireResult<T>) -> SquireResult<T> {
        self.store.begin()?;
        match f(self) {
            Ok(value) => {
                self.store.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back engine action: {}", err);
                if let Err(rollback_err) = self.store.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn claim(&mut self, request: RequestId) -> SquireResult<()> {
        if self.store.claim_request(request)? {
            Ok(())
        } else {
            warn!("Rejected replayed request {}", request);
            Err(SquireError::ConcurrentRewardRace(format!(
                "request {} was already applied",
                request
            )))
        }
    }

    fn owned_instance(
        &self,
        player: PlayerId,
        instance: QuestInstanceId,
    ) -> SquireResult<QuestInstance> {
        let instance = self.store.quest_instance(instance)?;
        if instance.player_id != player {
            return Err(SquireError::InvalidAction(format!(
                "quest instance {} belongs to another player",
                instance.id
            )));
        }
        Ok(instance)
    }

    // =========================================================================
    // Quests and world generation
    // =========================================================================

    /// Opens a quest for the player: its instance, its chests and its terrain.
    ///
    /// Calling it again for the same quest only fills in what is missing.
    pub fn start_quest(&mut self, player_id: PlayerId, quest: QuestId) -> SquireResult<QuestInstance> {
        self.atomically(|engine| {
            let player = engine.store.player(player_id)?;
            engine.store.catalog().quest(quest)?;
            let instance = match engine.store.find_quest_instance(player_id, quest)? {
                Some(existing) => existing,
                None => engine.store.create_quest_instance(player_id, quest)?,
            };

            let placed = engine.place_chests(&player, &instance)?;
            let report = engine.generate_terrain(player_id, instance.id, player.level, quest)?;
            info!(
                "Player {} started quest {}: {} chests, {} terrain tiles",
                player_id,
                quest,
                placed,
                report.total()
            );
            Ok(instance)
        })
    }

    fn place_chests(&mut self, player: &Player, instance: &QuestInstance) -> SquireResult<usize> {
        let existing = self.store.chests(instance.id)?;
        let terrain = self.store.terrain(player.id)?;
        let planned = self.rewards.place_chests(
            instance.id,
            instance.quest_id,
            player.level,
            self.store.catalog(),
            &existing,
            &terrain,
            self.config.terrain.max_attempts,
            &mut self.rng,
        )?;
        let count = planned.len();
        for chest in planned {
            self.store.insert_chest(chest)?;
        }
        Ok(count)
    }

    /// Adds the terrain the player is still missing for this quest and level.
    ///
    /// Fails without writing anything if any placement phase runs out of
    /// attempts.
    pub fn generate_terrain(
        &mut self,
        player: PlayerId,
        instance: QuestInstanceId,
        level: u32,
        quest: QuestId,
    ) -> SquireResult<TerrainReport> {
        self.owned_instance(player, instance)?;
        let existing = self.store.terrain(player)?;
        let chests = self.store.chests(instance)?;
        let request = GenerationRequest {
            player_id: player,
            quest_id: quest,
            level,
            existing_terrain: &existing,
            chests: &chests,
        };

        let plan = match self.terrain.generate(&request, &mut self.rng) {
            Ok(plan) => plan,
            Err(err) => {
                warn!("{} generation failed for player {}: {}", self.terrain.generator_type(), player, err);
                return Err(err);
            }
        };
        self.terrain.validate(&plan, &request)?;
        self.store
            .transaction(|store| store.insert_terrain(&plan.tiles))?;

        info!(
            "Generated {} terrain tiles for player {} (level {}, quest {})",
            plan.report.total(),
            player,
            level,
            quest
        );
        Ok(plan.report)
    }

    /// Returns the player's dungeon for a quest, generating it on first use.
    pub fn generate_dungeon(
        &mut self,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<Vec<DungeonRoom>> {
        let existing = self.store.dungeon_rooms(player, quest)?;
        if !existing.is_empty() {
            debug!("Dungeon for player {} quest {} already exists", player, quest);
            return Ok(existing);
        }

        let level = self.store.player(player)?.level;
        let request = GenerationRequest::fresh(player, quest, level);
        let rooms = self.dungeon.generate(&request, &mut self.rng)?;
        self.dungeon.validate(&rooms, &request)?;
        self.store
            .transaction(|store| store.insert_dungeon_rooms(&rooms))?;
        info!(
            "Generated {} dungeon rooms for player {} quest {}",
            rooms.len(),
            player,
            quest
        );
        Ok(rooms)
    }

    /// Walks through a door of the room at `from`.
    pub fn move_in_dungeon(
        &self,
        player: PlayerId,
        quest: QuestId,
        from: Position,
        direction: Direction,
    ) -> SquireResult<DungeonRoom> {
        let rooms = self.store.dungeon_rooms(player, quest)?;
        if rooms.is_empty() {
            return Err(SquireError::NotFound(format!(
                "dungeon for player {} quest {}",
                player, quest
            )));
        }
        DungeonMap::new(rooms).step(from, direction).cloned()
    }

    pub fn clear_dungeon_room(
        &mut self,
        player: PlayerId,
        quest: QuestId,
        position: Position,
    ) -> SquireResult<()> {
        let rooms = self.store.dungeon_rooms(player, quest)?;
        if !rooms.iter().any(|room| room.position == position) {
            return Err(SquireError::NotFound(format!("dungeon room at {}", position)));
        }
        self.store.mark_room_cleared(player, quest, position)
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Enemy odds at `position` given the player's terrain and the instance's chests.
    pub fn encounter_probability(
        &self,
        player: PlayerId,
        position: Position,
        instance: QuestInstanceId,
    ) -> SquireResult<f64> {
        let terrain = self.store.terrain(player)?;
        let chests = self.store.chests(instance)?;
        Ok(self
            .encounters
            .encounter_probability(position, &terrain, &chests))
    }

    /// Percent chance that a move at `level` costs no food.
    fn food_saving_chance(&self, level: u32) -> u32 {
        let table = &self.config.combat.food_saving_by_level;
        let index = (level.max(1) - 1) as usize;
        table
            .get(index)
            .or_else(|| table.last())
            .copied()
            .unwrap_or(0)
    }

    /// Applies one movement command and rolls whatever it triggers.
    ///
    /// A refused move (no food, missing terrain gear) is an `InvalidAction`
    /// and leaves nothing changed.
    pub fn resolve_movement_step(
        &mut self,
        player_id: PlayerId,
        instance_id: QuestInstanceId,
        command: MoveCommand,
    ) -> SquireResult<MovementOutcome> {
        self.atomically(|engine| engine.movement_step(player_id, instance_id, command))
    }

    fn movement_step(
        &mut self,
        player_id: PlayerId,
        instance_id: QuestInstanceId,
        command: MoveCommand,
    ) -> SquireResult<MovementOutcome> {
        let mut player = self.store.player(player_id)?;
        let instance = self.owned_instance(player_id, instance_id)?;
        if instance.is_completed() {
            return Err(SquireError::StaleSessionState(format!(
                "quest instance {} is already completed",
                instance_id
            )));
        }
        let mut messages = Vec::new();

        match command {
            MoveCommand::Step(direction) => {
                if player.food_uses() == 0 {
                    return Err(SquireError::InvalidAction(
                        "You are too hungry to travel. Find some food first.".to_string(),
                    ));
                }
                let saving = self.food_saving_chance(player.level);
                if self.rng.gen_range(0..100) < saving {
                    messages.push("Your travel experience spared your rations.".to_string());
                } else {
                    player.consume_food();
                }

                let target = player.position + direction.map_delta();
                let terrain = self.store.terrain_at(player_id, target)?.map(|tile| tile.terrain);
                if !player.can_enter(terrain) {
                    let needed = match terrain {
                        Some(TerrainType::River) => "a boat to cross the river",
                        _ => "boots to climb the mountain",
                    };
                    return Err(SquireError::InvalidAction(format!("You need {}.", needed)));
                }
                player.position = target;
                self.store.record_travel(player_id, target)?;
            }
            MoveCommand::Wait => {}
            MoveCommand::ReturnToVillage => {
                player.position = VILLAGE;
                self.store.record_travel(player_id, VILLAGE)?;
                self.store.save_player(&player)?;
                messages.push("You return to the village.".to_string());
                return self.finish_step(&player, &instance, None, messages);
            }
        }

        let event = self.step_event(&mut player, &instance, &mut messages)?;
        self.store.save_player(&player)?;
        self.finish_step(&player, &instance, event, messages)
    }

    fn step_event(
        &mut self,
        player: &mut Player,
        instance: &QuestInstance,
        messages: &mut Vec<String>,
    ) -> SquireResult<Option<TriggeredEvent>> {
        if self.progress.check_quest_completion(&self.store, instance)? {
            let completion = self
                .progress
                .complete_quest(&mut self.store, player, instance.id)?;
            messages.push("Quest complete!".to_string());
            if let Some(next) = completion.next_instance {
                let next_quest = self.store.quest_instance(next)?.quest_id;
                self.store.save_player(player)?;
                self.start_quest(player.id, next_quest)?;
            }
            return Ok(Some(TriggeredEvent::QuestCompleted(completion)));
        }

        let quest = self.store.catalog().quest(instance.quest_id)?.clone();
        if let QuestGate::Boss { boss, location } = quest.gate {
            if player.position == location && !instance.boss_defeated {
                messages.push("The keeper of this quest blocks your way.".to_string());
                return Ok(Some(TriggeredEvent::Boss(BossEncounter {
                    boss_id: boss,
                    quest_instance: instance.id,
                    quest_id: instance.quest_id,
                    position: location,
                })));
            }
        }

        let chests = self.store.chests(instance.id)?;
        let solved = self.store.solved_riddles(player.id, instance.quest_id)?;
        let collectable: Vec<_> = chests
            .iter()
            .filter(|chest| !chest.is_opened && !solved.contains(&chest.riddle_id))
            .collect();

        if let Some(chest) = collectable
            .iter()
            .find(|chest| chest.position == player.position)
        {
            self.store.record_chest_hint(ChestHint {
                quest_instance: instance.id,
                position: chest.position,
            })?;
            let riddle = self.store.catalog().riddle(chest.riddle_id)?;
            messages.push("You found a treasure chest!".to_string());
            return Ok(Some(TriggeredEvent::Treasure {
                chest_id: chest.id,
                challenge: RiddleChallenge::new(player, instance.quest_id, riddle),
            }));
        }

        let terrain = self.store.terrain(player.id)?;
        let probability = self
            .encounters
            .encounter_probability(player.position, &terrain, &chests);
        let Some(side_event) =
            self.encounters
                .roll_side_event(player.level, probability, &mut self.rng)
        else {
            return Ok(None);
        };
        debug!("Player {} rolled {:?} at {}", player.id, side_event, player.position);

        let event = match side_event {
            SideEvent::Npc => {
                let hinted: Vec<Position> = self
                    .store
                    .chest_hints(instance.id)?
                    .into_iter()
                    .map(|hint| hint.position)
                    .collect();
                let unhinted: Vec<Position> = collectable
                    .iter()
                    .map(|chest| chest.position)
                    .filter(|position| !hinted.contains(position))
                    .collect();
                let revealed_chest = unhinted.choose(&mut self.rng).copied();
                if let Some(position) = revealed_chest {
                    self.store.record_chest_hint(ChestHint {
                        quest_instance: instance.id,
                        position,
                    })?;
                    messages.push(format!("A traveller whispers of treasure near {}.", position));
                }
                Some(TriggeredEvent::Npc { revealed_chest })
            }
            SideEvent::Trader => Some(TriggeredEvent::Trader),
            SideEvent::Blacksmith => Some(TriggeredEvent::Blacksmith),
            SideEvent::Riddle => {
                match self
                    .progress
                    .draw_riddle(&self.store, player, instance.quest_id, &mut self.rng)
                {
                    Ok(challenge) => Some(TriggeredEvent::Riddle(challenge)),
                    Err(SquireError::NoQuestionAvailable(reason)) => {
                        debug!("Skipping riddle event: {}", reason);
                        None
                    }
                    Err(err) => return Err(err),
                }
            }
            SideEvent::Enemy => {
                let catalog = self.store.catalog();
                self.encounters
                    .pick_enemy(catalog, player.level, &mut self.rng)
                    .map(|enemy| {
                        TriggeredEvent::Enemy(EnemyEncounter {
                            enemy_id: enemy.id,
                            quest_id: instance.quest_id,
                            position: player.position,
                            terrain: terrain
                                .iter()
                                .find(|tile| tile.position == player.position)
                                .map(|tile| tile.terrain),
                        })
                    })
            }
        };
        Ok(event)
    }

    fn finish_step(
        &self,
        player: &Player,
        instance: &QuestInstance,
        event: Option<TriggeredEvent>,
        messages: Vec<String>,
    ) -> SquireResult<MovementOutcome> {
        let radius = self.config.encounters.view_radius.max(0) as u32;
        let terrain = self.store.terrain(player.id)?;
        let chests = self.store.chests(instance.id)?;
        let hints = self.store.chest_hints(instance.id)?;

        let near = |position: Position| position.chebyshev_distance(player.position) <= radius;
        let hinted_chests = chests
            .iter()
            .filter(|chest| !chest.is_opened && near(chest.position))
            .filter(|chest| hints.iter().any(|hint| hint.position == chest.position))
            .map(|chest| chest.position)
            .collect();

        Ok(MovementOutcome {
            position: player.position,
            encounter_probability: self
                .encounters
                .encounter_probability(player.position, &terrain, &chests),
            map_delta: MapDelta {
                terrain: terrain
                    .into_iter()
                    .filter(|tile| near(tile.position))
                    .collect(),
                hinted_chests,
            },
            event,
            messages,
        })
    }

    // =========================================================================
    // Combat
    // =========================================================================

    /// Opens a fight against the encounter's enemy or boss.
    pub fn start_combat(
        &mut self,
        player_id: PlayerId,
        encounter: Encounter,
    ) -> SquireResult<CombatSession> {
        let player = self.store.player(player_id)?;
        let enemy = self.store.catalog().enemy(encounter.enemy_id())?.clone();
        if let Encounter::Boss(boss) = &encounter {
            self.check_boss_encounter(player_id, boss)?;
        } else if enemy.is_boss {
            return Err(SquireError::InvalidCombatAction(format!(
                "{} can only be met at its lair",
                enemy.name
            )));
        }

        let correct = self.store.correct_question_count(player_id)?;
        let pool = self.store.catalog().accuracy_pool_size();
        Ok(self.combat.start(&player, encounter, &enemy, correct, pool))
    }

    fn check_boss_encounter(&self, player: PlayerId, boss: &BossEncounter) -> SquireResult<QuestInstance> {
        let instance = self.owned_instance(player, boss.quest_instance)?;
        let quest = self.store.catalog().quest(instance.quest_id)?;
        match quest.gate {
            QuestGate::Boss { boss: expected, .. } if expected == boss.boss_id => {}
            _ => {
                return Err(SquireError::InvalidCombatAction(format!(
                    "quest {} has no boss {}",
                    quest.id, boss.boss_id
                )))
            }
        }
        if instance.boss_defeated || instance.is_completed() {
            return Err(SquireError::StaleSessionState(format!(
                "the boss of quest instance {} is already beaten",
                instance.id
            )));
        }
        Ok(instance)
    }

    /// Applies one action to a fight and returns the updated session.
    ///
    /// Each request id may be applied once. On error nothing is written and
    /// the caller's session is still the current one.
    pub fn apply_combat_action(
        &mut self,
        player_id: PlayerId,
        session: CombatSession,
        action: CombatAction,
        request: RequestId,
    ) -> SquireResult<CombatStep> {
        self.atomically(|engine| {
            engine.claim(request)?;
            engine.combat_action(player_id, session, action)
        })
    }

    fn combat_action(
        &mut self,
        player_id: PlayerId,
        mut session: CombatSession,
        action: CombatAction,
    ) -> SquireResult<CombatStep> {
        if session.player_id != player_id {
            return Err(SquireError::StaleSessionState(format!(
                "combat session belongs to player {}",
                session.player_id
            )));
        }
        self.combat.ensure_active(&session)?;

        let mut player = self.store.player(player_id)?;
        let enemy = self.store.catalog().enemy(session.encounter.enemy_id())?.clone();
        let boss_instance = match &session.encounter {
            Encounter::Boss(boss) => Some(self.check_boss_encounter(player_id, boss)?),
            Encounter::Enemy(encounter) => {
                if player.position != encounter.position {
                    return Err(SquireError::StaleSessionState(
                        "the enemy is no longer in front of you".to_string(),
                    ));
                }
                None
            }
        };
        let armed = player.has_item(&enemy.weakness);
        let mut question = None;
        let mut messages = Vec::new();

        let outcome = match action {
            CombatAction::Attack => {
                if boss_instance.is_some() {
                    return Err(SquireError::InvalidCombatAction(
                        "This foe can only be fought with knowledge.".to_string(),
                    ));
                }
                session.pending_question = None;
                match self.combat.strike(&mut session, &mut self.rng)? {
                    CombatPhase::Won => {
                        Some(self.combat.settle_victory(&mut session, &mut player, &enemy, true))
                    }
                    CombatPhase::Lost => {
                        Some(self.combat.settle_defeat(&mut session, &mut player, &enemy))
                    }
                    _ => None,
                }
            }
            CombatAction::Flee => Some(self.combat.flee(&mut session, &mut player, &mut self.rng)?),
            CombatAction::RequestQuestion => {
                if session.pending_question.is_some() {
                    return Err(SquireError::InvalidCombatAction(
                        "A question is already waiting for an answer.".to_string(),
                    ));
                }
                let (kind, scope) = match &session.encounter {
                    Encounter::Boss(boss) => (
                        QuestionKind::MultipleChoice,
                        QuestionScope::EarlierThan(boss.quest_id),
                    ),
                    Encounter::Enemy(encounter) => (
                        QuestionKind::for_encounter(player.level, enemy.min_level),
                        QuestionScope::CurrentQuest(encounter.quest_id),
                    ),
                };
                let served = serve_question(
                    &mut self.store,
                    player_id,
                    kind,
                    scope,
                    self.config.combat.question_encounter_cap,
                    &mut self.rng,
                )?;
                match served {
                    Some(challenge) => {
                        session.pending_question = Some(challenge.clone());
                        question = Some(challenge);
                        None
                    }
                    None if armed && boss_instance.is_none() => {
                        messages.push("No questions remain, so you fight.".to_string());
                        match self.combat.attrition(&mut session, &mut self.rng)? {
                            CombatPhase::Won => Some(self.combat.settle_victory(
                                &mut session,
                                &mut player,
                                &enemy,
                                true,
                            )),
                            _ => Some(self.combat.settle_defeat(&mut session, &mut player, &enemy)),
                        }
                    }
                    None => {
                        messages.push("With no questions left, you are forced to flee.".to_string());
                        Some(self.combat.forced_flee(&mut session, &mut player))
                    }
                }
            }
            CombatAction::AnswerTrueFalse(_) | CombatAction::AnswerChoice(_) => {
                let challenge = session.pending_question.take().ok_or_else(|| {
                    SquireError::InvalidCombatAction("No question has been asked.".to_string())
                })?;
                let answer = action.as_answer().ok_or_else(|| {
                    SquireError::InvalidCombatAction("That is not an answer.".to_string())
                })?;
                let correct = challenge.check(self.store.catalog(), answer)?;
                self.store
                    .record_question_answer(player_id, challenge.question, correct)?;

                if boss_instance.is_some() {
                    match self.combat.boss_answer(&mut session, correct) {
                        CombatPhase::Won => Some(self.combat.settle_victory(
                            &mut session,
                            &mut player,
                            &enemy,
                            false,
                        )),
                        CombatPhase::Lost => {
                            Some(self.combat.settle_defeat(&mut session, &mut player, &enemy))
                        }
                        _ => {
                            messages.push(if correct {
                                "Correct! The boss weakens.".to_string()
                            } else {
                                "Wrong! You grow weaker.".to_string()
                            });
                            None
                        }
                    }
                } else if correct {
                    Some(self.combat.settle_victory(&mut session, &mut player, &enemy, false))
                } else if armed {
                    messages.push("Wrong answer, but you still hold your weapon.".to_string());
                    None
                } else {
                    messages.push("Wrong answer, and you have nothing to fight with.".to_string());
                    Some(self.combat.forced_flee(&mut session, &mut player))
                }
            }
        };

        let mut level_up = None;
        if let Some(CombatOutcome::Victory { xp, gold, .. }) = &outcome {
            self.store.credit_team(player.team_id, *gold as u64, 1)?;
            level_up = self.progress.level_up_check(&mut player, self.store.catalog());
            if let Some(mut instance) = boss_instance {
                instance.boss_defeated = true;
                self.store.save_quest_instance(&instance)?;
            }
            info!(
                "Player {} defeated {}: +{} XP, +{} gold",
                player_id, enemy.name, xp, gold
            );
        }
        if let Some(outcome) = &outcome {
            debug!("Combat with {} ended: {:?}", enemy.name, outcome);
        }
        self.store.save_player(&player)?;

        Ok(CombatStep {
            session,
            outcome,
            question,
            level_up,
            messages,
        })
    }

    // =========================================================================
    // Chests and riddles
    // =========================================================================

    /// Tries a chest's riddle. A right answer pays out the chest's reward.
    pub fn open_chest(
        &mut self,
        player_id: PlayerId,
        chest_id: ChestId,
        answer: &str,
        request: RequestId,
    ) -> SquireResult<ChestOpening> {
        self.atomically(|engine| {
            engine.claim(request)?;
            let mut player = engine.store.player(player_id)?;
            let chest = engine.store.chest(chest_id)?;
            let instance = engine.owned_instance(player_id, chest.quest_instance)?;
            if chest.is_opened {
                return Err(SquireError::ConcurrentRewardRace(format!(
                    "chest {} is already open",
                    chest_id
                )));
            }
            if player.position != chest.position {
                return Err(SquireError::InvalidAction(
                    "You are not standing at that chest.".to_string(),
                ));
            }

            let correct = engine.store.catalog().riddle(chest.riddle_id)?.is_correct(answer);
            engine
                .store
                .record_question_answer(player_id, QuestionRef::Riddle(chest.riddle_id), correct)?;
            if !correct {
                return Ok(ChestOpening {
                    correct: false,
                    reward: None,
                    level_up: None,
                });
            }

            engine
                .store
                .record_riddle_solved(player_id, instance.quest_id, chest.riddle_id)?;
            engine.store.mark_chest_opened(chest_id)?;

            let reward = chest.reward.clone();
            engine
                .store
                .credit_team(player.team_id, reward.gold as u64, 2)?;
            player.experience_points = player.experience_points.saturating_add(reward.xp);
            if reward.food > 0 {
                player.give(InventoryItem::new(FOOD_ITEM_NAME, ItemKind::Food, reward.food));
            }
            if let Some(item) = &reward.special_item {
                player.give(InventoryItem::new(item.name.clone(), ItemKind::Gear, item.uses));
            }
            let level_up = engine
                .progress
                .level_up_check(&mut player, engine.store.catalog());
            engine.store.save_player(&player)?;

            info!(
                "Player {} opened chest {}: +{} gold, +{} XP, +{} food",
                player_id, chest_id, reward.gold, reward.xp, reward.food
            );
            Ok(ChestOpening {
                correct: true,
                reward: Some(reward),
                level_up,
            })
        })
    }

    /// Draws a wandering riddle for the player's current quest tier.
    pub fn draw_riddle(&mut self, player_id: PlayerId, quest: QuestId) -> SquireResult<RiddleChallenge> {
        let player = self.store.player(player_id)?;
        self.progress
            .draw_riddle(&self.store, &player, quest, &mut self.rng)
    }

    /// Answers a wandering riddle. A right answer may earn a wizard item.
    pub fn answer_riddle(
        &mut self,
        challenge: &RiddleChallenge,
        answer: &str,
        request: RequestId,
    ) -> SquireResult<RiddleAnswer> {
        self.atomically(|engine| {
            engine.claim(request)?;
            let mut player = engine.store.player(challenge.player_id)?;
            let solved = engine
                .store
                .solved_riddles(player.id, challenge.quest_id)?;
            if solved.contains(&challenge.riddle_id) {
                return Err(SquireError::StaleSessionState(format!(
                    "riddle {} is already solved",
                    challenge.riddle_id
                )));
            }

            let riddle = engine.store.catalog().riddle(challenge.riddle_id)?;
            let correct = riddle.is_correct(answer);
            let difficulty = riddle.difficulty;
            engine.store.record_question_answer(
                player.id,
                QuestionRef::Riddle(challenge.riddle_id),
                correct,
            )?;
            if !correct {
                return Ok(RiddleAnswer {
                    correct: false,
                    item: None,
                });
            }

            engine
                .store
                .record_riddle_solved(player.id, challenge.quest_id, challenge.riddle_id)?;
            let item = engine.rewards.riddle_item(
                difficulty,
                player.level,
                engine.store.catalog(),
                &mut engine.rng,
            );
            if let Some(grant) = &item {
                player.give(InventoryItem::new(grant.name.clone(), ItemKind::Special, grant.uses));
                engine.store.save_player(&player)?;
                info!("Player {} earned {} for a riddle", player.id, grant.name);
            }
            Ok(RiddleAnswer { correct: true, item })
        })
    }

    /// Rolls a reward bundle with the engine's RNG.
    pub fn allocate_reward(&mut self, difficulty: Difficulty, level: u32) -> RewardBundle {
        self.rewards
            .allocate_reward(difficulty, level, self.store.catalog(), &mut self.rng)
    }

    // =========================================================================
    // Progress
    // =========================================================================

    pub fn quest_progress(&self, player: PlayerId, quest: QuestId) -> SquireResult<ProgressSummary> {
        self.progress.quest_progress(&self.store, player, quest)
    }

    /// Raises the player one level if their XP allows it.
    pub fn level_up_check(&mut self, player_id: PlayerId) -> SquireResult<Option<u32>> {
        let mut player = self.store.player(player_id)?;
        let level = self
            .progress
            .level_up_check(&mut player, self.store.catalog());
        if level.is_some() {
            self.store.save_player(&player)?;
        }
        Ok(level)
    }
}
