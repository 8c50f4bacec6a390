//! Integration tests for the engine over the in-memory store.

use squire::config::{FOOD_ITEM_NAME, SOUTHWEST_LANDMARK, STRONGHOLD, VILLAGE};
use squire::{
    BossEncounter, CombatAction, CombatOutcome, CombatPhase, ContentCatalog, Difficulty, Direction,
    Encounter, EnemyEncounter, EnemyId, EngineConfig, FleeGate, GameEngine, InventoryItem, ItemKind,
    MemoryStore, MoveCommand, Player, PlayerId, QuestId, QuestionRef, RequestId, SquireError,
    SquireResult, Team, TeamId, TerrainType, TriggeredEvent, WorldStore,
};
use std::collections::HashSet;

const PLAYER: PlayerId = PlayerId(1);
const TEAM: TeamId = TeamId(1);

fn engine_with(config: EngineConfig) -> SquireResult<GameEngine<MemoryStore>> {
    let mut store = MemoryStore::new(ContentCatalog::sample());
    store.insert_team(Team::new(TEAM, "Owls"));
    let mut player = Player::new(PLAYER, "Ada", TEAM);
    player.give(InventoryItem::new(FOOD_ITEM_NAME, ItemKind::Food, 50));
    player.give(InventoryItem::new("Hiking Boots", ItemKind::Special, 1));
    player.give(InventoryItem::new("River Boat", ItemKind::Special, 1));
    store.save_player(&player)?;
    Ok(GameEngine::new(store, config))
}

/// A test config where no enemy ever shows up on the map.
fn quiet_config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig::for_testing(seed);
    config.encounters.base_probability = 0.0;
    config.encounters.forest_weight = 0.0;
    config.encounters.mountain_weight = 0.0;
    config.encounters.river_weight = 0.0;
    config.encounters.chest_weight = 0.0;
    config
}

fn engine(seed: u64) -> SquireResult<GameEngine<MemoryStore>> {
    engine_with(quiet_config(seed))
}

fn move_player(engine: &mut GameEngine<MemoryStore>, x: i32, y: i32) -> SquireResult<()> {
    let mut player = engine.store().player(PLAYER)?;
    player.position = squire::Position::new(x, y);
    engine.store_mut().save_player(&player)
}

fn right_answer(engine: &GameEngine<MemoryStore>, question: QuestionRef) -> SquireResult<CombatAction> {
    let catalog = engine.store().catalog();
    Ok(match question {
        QuestionRef::TrueFalse(id) => {
            CombatAction::AnswerTrueFalse(catalog.true_false_question(id)?.answer)
        }
        QuestionRef::MultipleChoice(id) => {
            CombatAction::AnswerChoice(catalog.multiple_choice_question(id)?.answer)
        }
        QuestionRef::Riddle(id) => panic!("riddle {} served in combat", id),
    })
}

fn wrong_answer(engine: &GameEngine<MemoryStore>, question: QuestionRef) -> SquireResult<CombatAction> {
    Ok(match right_answer(engine, question)? {
        CombatAction::AnswerTrueFalse(value) => CombatAction::AnswerTrueFalse(!value),
        other => other,
    })
}

#[test]
fn test_start_quest_builds_world() -> SquireResult<()> {
    let mut engine = engine(3)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;

    let chests = engine.store().chests(instance.id)?;
    assert_eq!(chests.len(), 9);
    let terrain = engine.store().terrain(PLAYER)?;
    assert!(!terrain.is_empty());

    let positions: HashSet<_> = terrain.iter().map(|tile| tile.position).collect();
    assert_eq!(positions.len(), terrain.len());
    assert!(!positions.contains(&VILLAGE));
    assert!(!positions.contains(&SOUTHWEST_LANDMARK));
    for chest in &chests {
        assert!(!positions.contains(&chest.position));
    }
    let strongholds: Vec<_> = terrain
        .iter()
        .filter(|tile| tile.terrain == TerrainType::Stronghold)
        .collect();
    assert_eq!(strongholds.len(), 1);
    assert_eq!(strongholds[0].position, STRONGHOLD);

    let again = engine.start_quest(PLAYER, QuestId(1))?;
    assert_eq!(again.id, instance.id);
    assert_eq!(engine.store().chests(instance.id)?.len(), 9);
    assert_eq!(engine.store().terrain(PLAYER)?.len(), terrain.len());
    Ok(())
}

#[test]
fn test_failed_generation_leaves_nothing_behind() -> SquireResult<()> {
    let mut config = EngineConfig::for_testing(5);
    config.terrain.max_attempts = 0;
    let mut engine = engine_with(config)?;

    let result = engine.start_quest(PLAYER, QuestId(1));
    assert!(matches!(result, Err(SquireError::GenerationExhausted { .. })));
    assert!(engine.store().find_quest_instance(PLAYER, QuestId(1))?.is_none());
    assert!(engine.store().terrain(PLAYER)?.is_empty());
    assert_eq!(engine.store().transaction_depth(), 0);
    Ok(())
}

#[test]
fn test_step_consumes_food_and_reports_surroundings() -> SquireResult<()> {
    let mut engine = engine(8)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
    assert_eq!(outcome.position, VILLAGE);
    assert_eq!(engine.store().player(PLAYER)?.food_uses(), 50);

    let outcome =
        engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Step(Direction::North))?;
    assert_eq!(outcome.position, squire::Position::new(0, 1));
    assert_eq!(engine.store().player(PLAYER)?.food_uses(), 49);
    assert_eq!(engine.store().travel_history(PLAYER)?, vec![squire::Position::new(0, 1)]);

    for tile in &outcome.map_delta.terrain {
        assert!(tile.position.chebyshev_distance(outcome.position) <= 7);
    }
    let probability = engine.encounter_probability(PLAYER, outcome.position, instance.id)?;
    assert_eq!(outcome.encounter_probability, probability);

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::ReturnToVillage)?;
    assert_eq!(outcome.position, VILLAGE);
    assert!(outcome.event.is_none());
    assert_eq!(engine.store().player(PLAYER)?.food_uses(), 49);
    Ok(())
}

#[test]
fn test_mountain_needs_boots() -> SquireResult<()> {
    let mut engine = engine(8)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;
    let mountain = engine
        .store()
        .terrain(PLAYER)?
        .into_iter()
        .find(|tile| tile.terrain == TerrainType::Mountain)
        .map(|tile| tile.position)
        .expect("quest terrain has mountains");

    let mut player = engine.store().player(PLAYER)?;
    player.inventory.retain(|item| item.name != "Hiking Boots");
    player.position = mountain + squire::Position::new(0, -1);
    engine.store_mut().save_player(&player)?;

    let result =
        engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Step(Direction::North));
    assert!(matches!(result, Err(SquireError::InvalidAction(_))));
    let after = engine.store().player(PLAYER)?;
    assert_eq!(after.position, player.position);
    assert_eq!(after.food_uses(), player.food_uses());
    assert_eq!(engine.store().transaction_depth(), 0);
    Ok(())
}

#[test]
fn test_opening_chest_pays_once() -> SquireResult<()> {
    let mut engine = engine(13)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;
    let chest = engine.store().chests(instance.id)?[0].clone();
    let answer = engine.store().catalog().riddle(chest.riddle_id)?.answer.clone();
    move_player(&mut engine, chest.position.x, chest.position.y)?;

    let wrong = engine.open_chest(PLAYER, chest.id, "a teapot", RequestId::new())?;
    assert!(!wrong.correct);
    assert!(!engine.store().chest(chest.id)?.is_opened);

    let request = RequestId::new();
    let opening = engine.open_chest(PLAYER, chest.id, &answer, request)?;
    assert!(opening.correct);
    let reward = opening.reward.expect("correct answer pays out");
    assert_eq!(reward, chest.reward);

    let team = engine.store().team(TEAM)?;
    assert_eq!(team.gold, reward.gold as u64);
    assert_eq!(team.reputation, 2);
    let player = engine.store().player(PLAYER)?;
    assert_eq!(player.experience_points, reward.xp);
    assert_eq!(player.food_uses(), 50 + reward.food);
    assert!(engine.store().chest(chest.id)?.is_opened);
    assert_eq!(engine.quest_progress(PLAYER, QuestId(1))?.answered, 1);

    let replay = engine.open_chest(PLAYER, chest.id, &answer, request);
    assert!(matches!(replay, Err(SquireError::ConcurrentRewardRace(_))));
    let second = engine.open_chest(PLAYER, chest.id, &answer, RequestId::new());
    assert!(matches!(second, Err(SquireError::ConcurrentRewardRace(_))));
    assert_eq!(engine.store().team(TEAM)?.gold, reward.gold as u64);
    Ok(())
}

#[test]
fn test_enough_riddles_complete_the_quest() -> SquireResult<()> {
    let mut engine = engine(21)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;
    let riddles: Vec<_> = engine
        .store()
        .catalog()
        .riddles_for(QuestId(1))
        .map(|riddle| riddle.id)
        .collect();
    for riddle in riddles {
        engine.store_mut().record_riddle_solved(PLAYER, QuestId(1), riddle)?;
    }
    engine.store_mut().record_travel(PLAYER, squire::Position::new(0, 1))?;

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
    let Some(TriggeredEvent::QuestCompleted(completion)) = outcome.event else {
        panic!("expected quest completion, got {:?}", outcome.event);
    };
    assert_eq!(completion.reward_item.as_deref(), Some("Lantern of Clarity"));
    assert!(engine.store().quest_instance(instance.id)?.is_completed());
    assert!(engine.store().travel_history(PLAYER)?.is_empty());

    let next = engine
        .store()
        .find_quest_instance(PLAYER, QuestId(2))?
        .expect("next quest opened");
    assert_eq!(completion.next_instance, Some(next.id));
    assert_eq!(engine.store().chests(next.id)?.len(), 9);

    let stale = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait);
    assert!(matches!(stale, Err(SquireError::StaleSessionState(_))));
    Ok(())
}

#[test]
fn test_wandering_riddle_grants_wizard_item() -> SquireResult<()> {
    let mut engine = engine(2)?;
    engine.start_quest(PLAYER, QuestId(1))?;

    let challenge = engine.draw_riddle(PLAYER, QuestId(1))?;
    assert_eq!(challenge.difficulty, Difficulty::Easy);
    let answer = engine.store().catalog().riddle(challenge.riddle_id)?.answer.clone();

    let result = engine.answer_riddle(&challenge, &answer, RequestId::new())?;
    assert!(result.correct);
    let item = result.item.expect("a level 1 wizard item exists");
    assert_eq!(item.name, "Scroll of Banishment");
    assert_eq!(item.uses, 5);
    assert!(engine.store().player(PLAYER)?.has_item("Scroll of Banishment"));

    let again = engine.answer_riddle(&challenge, &answer, RequestId::new());
    assert!(matches!(again, Err(SquireError::StaleSessionState(_))));
    Ok(())
}

fn enemy_in_quest(quest: QuestId) -> Encounter {
    Encounter::Enemy(EnemyEncounter {
        enemy_id: EnemyId(1),
        quest_id: quest,
        position: VILLAGE,
        terrain: None,
    })
}

fn enemy_at_village() -> Encounter {
    enemy_in_quest(QuestId(1))
}

fn arm_with_torch(engine: &mut GameEngine<MemoryStore>) -> SquireResult<()> {
    let mut player = engine.store().player(PLAYER)?;
    player.give(InventoryItem::new("Torch", ItemKind::Gear, 10));
    engine.store_mut().save_player(&player)
}

#[test]
fn test_right_answer_wins_base_reward() -> SquireResult<()> {
    let mut engine = engine(4)?;
    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    assert_eq!(session.phase, CombatPhase::Active);

    let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
    let challenge = step.question.expect("question served");
    assert!(matches!(challenge.question, QuestionRef::TrueFalse(_)));

    let action = right_answer(&engine, challenge.question)?;
    let step = engine.apply_combat_action(PLAYER, step.session, action, RequestId::new())?;
    assert_eq!(step.session.phase, CombatPhase::Won);
    assert!(matches!(
        step.outcome,
        Some(CombatOutcome::Victory { xp: 10, gold: 10, .. })
    ));
    assert_eq!(engine.store().player(PLAYER)?.experience_points, 10);
    let team = engine.store().team(TEAM)?;
    assert_eq!((team.gold, team.reputation), (10, 1));

    let after = engine.apply_combat_action(PLAYER, step.session, CombatAction::Attack, RequestId::new());
    assert!(matches!(after, Err(SquireError::InvalidCombatAction(_))));
    Ok(())
}

#[test]
fn test_unarmed_wrong_answer_forces_flee() -> SquireResult<()> {
    let mut engine = engine(4)?;
    let mut player = engine.store().player(PLAYER)?;
    player.experience_points = 30;
    engine.store_mut().save_player(&player)?;

    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
    let question = step.session.pending_question.clone().expect("question pending").question;
    let action = wrong_answer(&engine, question)?;

    let step = engine.apply_combat_action(PLAYER, step.session, action, RequestId::new())?;
    assert_eq!(step.session.phase, CombatPhase::Fled);
    assert!(matches!(step.outcome, Some(CombatOutcome::Fled { xp_lost: 10, .. })));
    assert_eq!(engine.store().player(PLAYER)?.experience_points, 20);
    Ok(())
}

#[test]
fn test_armed_wrong_answer_keeps_fighting() -> SquireResult<()> {
    let mut engine = engine(4)?;
    arm_with_torch(&mut engine)?;

    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
    let question = step.question.expect("question served").question;
    let action = wrong_answer(&engine, question)?;

    let step = engine.apply_combat_action(PLAYER, step.session, action, RequestId::new())?;
    assert_eq!(step.session.phase, CombatPhase::Active);
    assert!(step.outcome.is_none());
    assert!(step.session.pending_question.is_none());
    Ok(())
}

#[test]
fn test_attack_fights_one_round_then_flee() -> SquireResult<()> {
    let mut engine = engine(4)?;
    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    assert!(session.enemy_max_hunger > 1 && session.player_max_hunger > 1);

    let step = engine.apply_combat_action(PLAYER, session, CombatAction::Attack, RequestId::new())?;
    assert_eq!(step.session.phase, CombatPhase::Active);
    assert!(step.outcome.is_none());
    assert_eq!(step.session.rounds, 1);
    assert_eq!(step.session.player_hunger + step.session.enemy_hunger, 1);

    let step = engine.apply_combat_action(PLAYER, step.session, CombatAction::Flee, RequestId::new())?;
    assert_eq!(step.session.phase, CombatPhase::Fled);
    assert!(matches!(step.outcome, Some(CombatOutcome::Fled { xp_lost: 0, .. })));
    Ok(())
}

#[test]
fn test_outmatched_flee_breaks_gear() -> SquireResult<()> {
    let mut config = quiet_config(9);
    config.combat.flee_gate = FleeGate::Uniform;
    let mut engine = engine_with(config)?;
    let mut player = engine.store().player(PLAYER)?;
    player.inventory.retain(|item| item.kind != ItemKind::Food);
    player.give(InventoryItem::new(FOOD_ITEM_NAME, ItemKind::Food, 1));
    player.give(InventoryItem::new("Leather Shield", ItemKind::Gear, 1));
    engine.store_mut().save_player(&player)?;

    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    assert_eq!(session.player_max_hunger, 1);
    let step = engine.apply_combat_action(PLAYER, session, CombatAction::Flee, RequestId::new())?;
    let Some(CombatOutcome::Fled { damaged, xp_lost, broken_items }) = step.outcome else {
        panic!("expected a retreat, got {:?}", step.outcome);
    };
    assert!(damaged);
    assert_eq!(xp_lost, 0);
    assert_eq!(broken_items, vec!["Leather Shield".to_string()]);
    assert!(!engine.store().player(PLAYER)?.has_item("Leather Shield"));
    Ok(())
}

#[test]
fn test_sure_hit_flee_is_clean() -> SquireResult<()> {
    let mut config = quiet_config(9);
    config.combat.flee_gate = FleeGate::Uniform;
    config.combat.max_hit_chance = 100.0;
    let mut engine = engine_with(config)?;
    let mut player = engine.store().player(PLAYER)?;
    player.give(InventoryItem::new("Leather Shield", ItemKind::Gear, 1));
    for ward in 0..20 {
        player.give(
            InventoryItem::new(format!("Ward {}", ward), ItemKind::Special, 1)
                .effective_against("Fog Wraith"),
        );
    }
    engine.store_mut().save_player(&player)?;

    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    assert_eq!(session.hit_chance, 100);
    let step = engine.apply_combat_action(PLAYER, session, CombatAction::Flee, RequestId::new())?;
    assert_eq!(
        step.outcome,
        Some(CombatOutcome::Fled {
            damaged: false,
            xp_lost: 0,
            broken_items: Vec::new(),
        })
    );
    assert!(engine.store().player(PLAYER)?.has_item("Leather Shield"));
    Ok(())
}

#[test]
fn test_armed_player_fights_when_questions_run_out() -> SquireResult<()> {
    let mut config = quiet_config(12);
    config.combat.question_encounter_cap = 1;
    let mut engine = engine_with(config)?;
    arm_with_torch(&mut engine)?;
    let quest_one: Vec<QuestionRef> = engine
        .store()
        .catalog()
        .true_false
        .iter()
        .filter(|question| question.quest_id == QuestId(1))
        .map(|question| QuestionRef::TrueFalse(question.id))
        .collect();
    for question in quest_one {
        engine.store_mut().record_question_served(PLAYER, question)?;
    }

    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
    assert!(step.question.is_none());
    assert!(step.messages.iter().any(|message| message.contains("No questions remain")));
    assert!(matches!(step.session.phase, CombatPhase::Won | CombatPhase::Lost));
    assert!(matches!(
        step.outcome,
        Some(CombatOutcome::Victory { .. }) | Some(CombatOutcome::Defeat { .. })
    ));
    Ok(())
}

#[test]
fn test_fight_only_asks_about_its_own_quest() -> SquireResult<()> {
    let mut engine = engine(4)?;
    arm_with_torch(&mut engine)?;
    let mut session = engine.start_combat(PLAYER, enemy_in_quest(QuestId(2)))?;

    // Six true/false questions per quest, each served at most twice.
    for _ in 0..12 {
        let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
        let question = step.question.expect("quest two still has questions").question;
        let QuestionRef::TrueFalse(id) = question else {
            panic!("unexpected question {:?}", question);
        };
        assert_eq!(engine.store().catalog().true_false_question(id)?.quest_id, QuestId(2));
        let action = wrong_answer(&engine, question)?;
        session = engine.apply_combat_action(PLAYER, step.session, action, RequestId::new())?.session;
        assert_eq!(session.phase, CombatPhase::Active);
    }

    let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
    assert!(step.question.is_none());
    assert!(step.session.is_over());
    Ok(())
}

#[test]
fn test_npc_reveals_each_chest_once() -> SquireResult<()> {
    let mut config = quiet_config(7);
    config.encounters.npc_chance = 1.0;
    let mut engine = engine_with(config)?;
    let instance = engine.start_quest(PLAYER, QuestId(1))?;
    let chests: HashSet<squire::Position> = engine
        .store()
        .chests(instance.id)?
        .iter()
        .map(|chest| chest.position)
        .collect();

    let mut revealed = HashSet::new();
    for _ in 0..chests.len() {
        let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
        let Some(TriggeredEvent::Npc { revealed_chest: Some(position) }) = outcome.event else {
            panic!("expected a chest hint, got {:?}", outcome.event);
        };
        assert!(chests.contains(&position));
        assert!(revealed.insert(position));
    }
    assert_eq!(engine.store().chest_hints(instance.id)?.len(), chests.len());

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
    assert!(matches!(
        outcome.event,
        Some(TriggeredEvent::Npc { revealed_chest: None })
    ));
    Ok(())
}

#[test]
fn test_session_goes_stale_when_player_moves() -> SquireResult<()> {
    let mut engine = engine(4)?;
    let session = engine.start_combat(PLAYER, enemy_at_village())?;
    move_player(&mut engine, 1, 1)?;

    let result = engine.apply_combat_action(PLAYER, session, CombatAction::Attack, RequestId::new());
    assert!(matches!(result, Err(SquireError::StaleSessionState(_))));
    Ok(())
}

#[test]
fn test_boss_falls_to_knowledge() -> SquireResult<()> {
    let mut engine = engine(6)?;
    let instance = engine.store_mut().create_quest_instance(PLAYER, QuestId(3))?;
    move_player(&mut engine, STRONGHOLD.x, STRONGHOLD.y)?;

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
    let Some(TriggeredEvent::Boss(boss)) = outcome.event else {
        panic!("expected the boss, got {:?}", outcome.event);
    };
    assert_eq!(boss.boss_id, EnemyId(100));

    let mut session = engine.start_combat(PLAYER, Encounter::Boss(boss.clone()))?;
    let attack = engine.apply_combat_action(PLAYER, session.clone(), CombatAction::Attack, RequestId::new());
    assert!(matches!(attack, Err(SquireError::InvalidCombatAction(_))));

    for _ in 0..20 {
        if session.is_over() {
            break;
        }
        let step = engine.apply_combat_action(PLAYER, session, CombatAction::RequestQuestion, RequestId::new())?;
        let question = step.question.expect("boss pool has questions").question;
        assert!(matches!(question, QuestionRef::MultipleChoice(_)));
        let action = right_answer(&engine, question)?;
        session = engine.apply_combat_action(PLAYER, step.session, action, RequestId::new())?.session;
    }
    assert_eq!(session.phase, CombatPhase::Won);
    assert!(engine.store().quest_instance(instance.id)?.boss_defeated);

    let stale = engine.start_combat(PLAYER, Encounter::Boss(boss));
    assert!(matches!(stale, Err(SquireError::StaleSessionState(_))));

    let outcome = engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Wait)?;
    let Some(TriggeredEvent::QuestCompleted(completion)) = outcome.event else {
        panic!("expected quest completion, got {:?}", outcome.event);
    };
    assert_eq!(completion.next_instance, None);
    assert!(engine.store().player(PLAYER)?.has_item("Crown of Scholars"));
    Ok(())
}

#[test]
fn test_boss_encounter_must_match_quest() -> SquireResult<()> {
    let mut engine = engine(6)?;
    let instance = engine.store_mut().create_quest_instance(PLAYER, QuestId(1))?;
    let result = engine.start_combat(
        PLAYER,
        Encounter::Boss(BossEncounter {
            boss_id: EnemyId(100),
            quest_instance: instance.id,
            quest_id: QuestId(1),
            position: STRONGHOLD,
        }),
    );
    assert!(matches!(result, Err(SquireError::InvalidCombatAction(_))));
    Ok(())
}

#[test]
fn test_dungeon_generation_and_navigation() -> SquireResult<()> {
    let mut engine = engine(17)?;
    let rooms = engine.generate_dungeon(PLAYER, QuestId(3))?;
    assert_eq!(rooms.len(), 6);
    assert_eq!(engine.generate_dungeon(PLAYER, QuestId(3))?, rooms);

    let entrance = rooms
        .iter()
        .find(|room| room.position == squire::Position::origin())
        .expect("dungeon has an entrance");
    for direction in Direction::all() {
        let result = engine.move_in_dungeon(PLAYER, QuestId(3), entrance.position, direction);
        if entrance.allows(direction) {
            assert_eq!(result?.position, entrance.position + direction.to_delta());
        } else {
            assert!(matches!(result, Err(SquireError::InvalidAction(_))));
        }
    }

    engine.clear_dungeon_room(PLAYER, QuestId(3), entrance.position)?;
    assert!(engine
        .store()
        .cleared_rooms(PLAYER, QuestId(3))?
        .contains(&entrance.position));
    Ok(())
}

#[test]
fn test_level_up_one_step_per_check() -> SquireResult<()> {
    let mut engine = engine(1)?;
    let mut player = engine.store().player(PLAYER)?;
    player.experience_points = 320;
    engine.store_mut().save_player(&player)?;

    assert_eq!(engine.level_up_check(PLAYER)?, Some(2));
    assert_eq!(engine.level_up_check(PLAYER)?, Some(3));
    assert_eq!(engine.level_up_check(PLAYER)?, Some(4));
    assert_eq!(engine.level_up_check(PLAYER)?, None);
    assert_eq!(engine.store().player(PLAYER)?.level, 4);
    Ok(())
}
