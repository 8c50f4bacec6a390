//! # Squire Demo Entry Point
//!
//! Builds a world over the sample content and lets a scripted squire wander
//! it: moving, opening chests, answering riddles and fighting whatever shows up.

use clap::Parser;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use squire::{
    CombatAction, CombatStep, ContentCatalog, Direction, Encounter, EngineConfig, GameEngine,
    InventoryItem, ItemKind, KnowledgeAnswer, MemoryStore, MoveCommand, Player, PlayerId,
    QuestId, QuestInstanceId, QuestionRef, RequestId, SquireError, SquireResult, Team, TeamId,
    TriggeredEvent, WorldStore,
};
use std::path::PathBuf;
#[cfg(feature = "dev-tools")]
use tracing::Level;

const PLAYER: PlayerId = PlayerId(1);
const TEAM: TeamId = TeamId(1);

/// Command line arguments for the Squire demo.
#[derive(Parser, Debug)]
#[command(name = "squire")]
#[command(about = "Simulates a squire's journey through a generated quest world")]
#[command(version)]
struct Args {
    /// Random seed for the engine
    #[arg(short, long)]
    seed: Option<u64>,

    /// Starting player level
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Quest to start on
    #[arg(long, default_value_t = 1)]
    quest: u32,

    /// Movement steps to simulate
    #[arg(long, default_value_t = 200)]
    steps: usize,

    /// Engine configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Content catalog JSON file
    #[arg(long)]
    content: Option<PathBuf>,

    /// Write the final world snapshot here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    if let Err(err) = run(&args) {
        error!("Simulation failed: {}", err);
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .parse_filters(log_level)
            .format_target(false)
            .init();
    }
}

fn run(args: &Args) -> SquireResult<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let catalog = match &args.content {
        Some(path) => ContentCatalog::from_json_file(path)?,
        None => ContentCatalog::sample(),
    };

    info!("Starting Squire v{} with seed {}", squire::VERSION, config.seed);
    let mut choices = StdRng::seed_from_u64(config.seed.wrapping_add(1));

    let mut store = MemoryStore::new(catalog);
    store.insert_team(Team::new(TEAM, "The Inkwells"));
    let mut player = Player::new(PLAYER, "Wren", TEAM);
    player.level = args.level.max(1);
    player.give(InventoryItem::new(squire::config::FOOD_ITEM_NAME, ItemKind::Food, 40));
    player.give(InventoryItem::new("Hiking Boots", ItemKind::Gear, 20));
    store.save_player(&player)?;

    let mut engine = GameEngine::new(store, config);
    let mut instance = engine.start_quest(PLAYER, QuestId(args.quest))?;

    for step in 0..args.steps {
        let direction = *Direction::all().choose(&mut choices).unwrap_or(&Direction::North);
        let outcome = match engine.resolve_movement_step(PLAYER, instance.id, MoveCommand::Step(direction)) {
            Ok(outcome) => outcome,
            Err(SquireError::InvalidAction(reason)) => {
                info!("Step {}: {}", step, reason);
                if engine.store().player(PLAYER)?.food_uses() == 0 {
                    warn!("Out of food, ending the journey");
                    break;
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        let Some(event) = outcome.event else {
            continue;
        };
        match event {
            TriggeredEvent::QuestCompleted(completion) => {
                println!("Completed quest {}", completion.quest_id);
                match completion.next_instance {
                    Some(next) => instance = engine.store().quest_instance(next)?,
                    None => {
                        println!("Every quest is done.");
                        break;
                    }
                }
            }
            TriggeredEvent::Treasure { chest_id, challenge } => {
                let answer = guess_riddle(&engine, challenge.riddle_id, &mut choices)?;
                let opening = engine.open_chest(PLAYER, chest_id, &answer, RequestId::new())?;
                info!("Chest {}: correct {}", chest_id, opening.correct);
            }
            TriggeredEvent::Riddle(challenge) => {
                let answer = guess_riddle(&engine, challenge.riddle_id, &mut choices)?;
                let result = engine.answer_riddle(&challenge, &answer, RequestId::new())?;
                info!("Wandering riddle: correct {}", result.correct);
            }
            TriggeredEvent::Enemy(encounter) => {
                fight(&mut engine, Encounter::Enemy(encounter), &mut choices)?;
            }
            TriggeredEvent::Boss(encounter) => {
                fight(&mut engine, Encounter::Boss(encounter), &mut choices)?;
            }
            TriggeredEvent::Npc { revealed_chest } => {
                info!("A traveller pointed toward {:?}", revealed_chest);
            }
            TriggeredEvent::Trader | TriggeredEvent::Blacksmith => {}
        }
    }

    print_summary(&engine, instance.id)?;
    if let Some(path) = &args.save {
        engine.store().save_to_path(path)?;
        println!("World saved to {}", path.display());
    }
    Ok(())
}

/// Answers right about two times in three.
fn guess_riddle(
    engine: &GameEngine<MemoryStore>,
    riddle: squire::RiddleId,
    choices: &mut StdRng,
) -> SquireResult<String> {
    let riddle = engine.store().catalog().riddle(riddle)?;
    if choices.gen_ratio(2, 3) {
        Ok(riddle.answer.clone())
    } else {
        Ok("a teapot".to_string())
    }
}

fn knowledge_guess(
    engine: &GameEngine<MemoryStore>,
    question: QuestionRef,
    choices: &mut StdRng,
) -> SquireResult<CombatAction> {
    let catalog = engine.store().catalog();
    let knows = choices.gen_ratio(2, 3);
    let answer = match question {
        QuestionRef::TrueFalse(id) => {
            let truth = catalog.true_false_question(id)?.answer;
            KnowledgeAnswer::TrueFalse(if knows { truth } else { !truth })
        }
        QuestionRef::MultipleChoice(id) => {
            let right = catalog.multiple_choice_question(id)?.answer;
            let letter = if knows {
                right
            } else {
                *[
                    squire::ChoiceLetter::A,
                    squire::ChoiceLetter::B,
                    squire::ChoiceLetter::C,
                    squire::ChoiceLetter::D,
                ]
                .choose(choices)
                .unwrap_or(&right)
            };
            KnowledgeAnswer::Choice(letter)
        }
        QuestionRef::Riddle(_) => {
            return Err(SquireError::InvalidCombatAction(
                "riddles are not asked in combat".to_string(),
            ))
        }
    };
    Ok(match answer {
        KnowledgeAnswer::TrueFalse(value) => CombatAction::AnswerTrueFalse(value),
        KnowledgeAnswer::Choice(letter) => CombatAction::AnswerChoice(letter),
    })
}

/// Plays a fight to the end: questions against bosses, a coin toss between
/// questions and brawling otherwise.
fn fight(
    engine: &mut GameEngine<MemoryStore>,
    encounter: Encounter,
    choices: &mut StdRng,
) -> SquireResult<()> {
    let boss = encounter.is_boss();
    let mut session = engine.start_combat(PLAYER, encounter)?;
    println!("A fight with {} begins (hit chance {}%)", session.enemy_name, session.hit_chance);

    let limit = 4 * (session.player_max_hunger + session.enemy_max_hunger + 2);
    for _ in 0..limit {
        if session.is_over() {
            break;
        }
        let action = match &session.pending_question {
            Some(challenge) => knowledge_guess(engine, challenge.question, choices)?,
            None if boss || choices.gen_bool(0.5) => CombatAction::RequestQuestion,
            None => CombatAction::Attack,
        };
        let CombatStep {
            session: next,
            outcome,
            level_up,
            ..
        } = engine.apply_combat_action(PLAYER, session, action, RequestId::new())?;
        session = next;
        if let Some(outcome) = outcome {
            println!("  {:?}", outcome);
        }
        if let Some(level) = level_up {
            println!("  Reached level {}", level);
        }
    }

    if !session.is_over() {
        engine.apply_combat_action(PLAYER, session, CombatAction::Flee, RequestId::new())?;
    }
    Ok(())
}

fn print_summary(engine: &GameEngine<MemoryStore>, instance: QuestInstanceId) -> SquireResult<()> {
    let store = engine.store();
    let player = store.player(PLAYER)?;
    let team = store.team(TEAM)?;
    let instance = store.quest_instance(instance)?;
    let progress = engine.quest_progress(PLAYER, instance.quest_id)?;

    println!("=== Journey summary ===");
    println!("Player:     {} (level {}, {} XP)", player.name, player.level, player.experience_points);
    println!("Position:   {}", player.position);
    println!("Food left:  {}", player.food_uses());
    println!("Team purse: {} gold, {} reputation", team.gold, team.reputation);
    println!(
        "Quest {}:    {}/{} riddles ({}%)",
        instance.quest_id, progress.answered, progress.total_required, progress.percent
    );
    println!(
        "Inventory:  {}",
        player
            .inventory
            .iter()
            .map(|item| format!("{} x{}", item.name, item.uses_remaining))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
