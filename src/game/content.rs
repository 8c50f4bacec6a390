//! # Quest Content
//!
//! Static content the engine draws from: quests, riddles, true/false and
//! multiple-choice questions, enemies, reward item pools and the XP ladder.
//! Content is read-only at runtime and can be loaded from JSON.

use crate::game::{EnemyId, Position, QuestId, QuestionId, RiddleId};
use crate::{SquireError, SquireResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Riddle difficulty tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// A riddle guarding a treasure chest or met on the road.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Riddle {
    pub id: RiddleId,
    pub quest_id: QuestId,
    pub text: String,
    pub answer: String,
    pub hint: Option<String>,
    pub difficulty: Difficulty,
}

impl Riddle {
    /// Whether `guess` matches the answer, ignoring case and surrounding whitespace.
    pub fn is_correct(&self, guess: &str) -> bool {
        normalize_answer(guess) == normalize_answer(&self.answer)
    }

    /// Letters per word of the answer, e.g. "3 5" for "the quest".
    pub fn word_length_hint(&self) -> String {
        word_length_hint(&self.answer)
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrueFalseQuestion {
    pub id: QuestionId,
    pub quest_id: QuestId,
    pub text: String,
    pub answer: bool,
    pub hint: Option<String>,
}

/// One of the four lettered options of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceLetter {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub id: QuestionId,
    pub quest_id: QuestId,
    pub text: String,
    pub options: [String; 4],
    pub answer: ChoiceLetter,
    pub hint: Option<String>,
}

/// Any question that can stand in for a combat round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionRef {
    TrueFalse(QuestionId),
    MultipleChoice(QuestionId),
    Riddle(RiddleId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EnemyId,
    pub name: String,
    pub description: String,
    /// Name of the item that lets a player fight this enemy head on
    pub weakness: String,
    pub gold_reward: u32,
    pub xp_reward: u32,
    pub max_hunger: u32,
    pub is_boss: bool,
    pub min_level: u32,
}

/// How a quest decides it is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestGate {
    /// Enough riddles solved
    Riddles,
    /// A boss waiting at `location` must be beaten
    Boss { boss: EnemyId, location: Position },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDef {
    pub id: QuestId,
    pub name: String,
    /// Special item granted on completion
    pub reward_item: Option<String>,
    pub reward_effective_against: Option<String>,
    pub gate: QuestGate,
}

/// An item the wizard can hand out as a riddle reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardItem {
    pub name: String,
    pub uses: u32,
    pub min_level: u32,
}

/// An item stocked by the gear shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub name: String,
    pub uses: u32,
    pub min_level: u32,
    pub price: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpThreshold {
    pub level: u32,
    pub min_xp: u32,
}

/// Everything the engine reads but never writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub quests: Vec<QuestDef>,
    pub riddles: Vec<Riddle>,
    pub true_false: Vec<TrueFalseQuestion>,
    pub multiple_choice: Vec<MultipleChoiceQuestion>,
    pub enemies: Vec<Enemy>,
    pub wizard_items: Vec<WizardItem>,
    pub shop_gear: Vec<ShopItem>,
    pub xp_thresholds: Vec<XpThreshold>,
}

impl ContentCatalog {
    /// Loads a catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SquireResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut catalog: ContentCatalog = serde_json::from_str(&raw)?;
        catalog.quests.sort_by_key(|quest| quest.id);
        catalog.xp_thresholds.sort_by_key(|threshold| threshold.level);
        Ok(catalog)
    }

    pub fn quest(&self, id: QuestId) -> SquireResult<&QuestDef> {
        self.quests
            .iter()
            .find(|quest| quest.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("quest {}", id)))
    }

    /// The quest that follows `id` in id order.
    pub fn next_quest(&self, id: QuestId) -> Option<&QuestDef> {
        self.quests
            .iter()
            .filter(|quest| quest.id > id)
            .min_by_key(|quest| quest.id)
    }

    pub fn riddle(&self, id: RiddleId) -> SquireResult<&Riddle> {
        self.riddles
            .iter()
            .find(|riddle| riddle.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("riddle {}", id)))
    }

    pub fn riddles_for(&self, quest: QuestId) -> impl Iterator<Item = &Riddle> {
        self.riddles.iter().filter(move |riddle| riddle.quest_id == quest)
    }

    pub fn enemy(&self, id: EnemyId) -> SquireResult<&Enemy> {
        self.enemies
            .iter()
            .find(|enemy| enemy.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("enemy {}", id)))
    }

    /// Non-boss enemies a player of `level` may meet.
    pub fn enemies_for_level(&self, level: u32) -> Vec<&Enemy> {
        self.enemies
            .iter()
            .filter(|enemy| !enemy.is_boss && enemy.min_level <= level)
            .collect()
    }

    pub fn true_false_question(&self, id: QuestionId) -> SquireResult<&TrueFalseQuestion> {
        self.true_false
            .iter()
            .find(|question| question.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("true/false question {}", id)))
    }

    pub fn multiple_choice_question(
        &self,
        id: QuestionId,
    ) -> SquireResult<&MultipleChoiceQuestion> {
        self.multiple_choice
            .iter()
            .find(|question| question.id == id)
            .ok_or_else(|| SquireError::NotFound(format!("multiple choice question {}", id)))
    }

    /// Size of the pool the accuracy ratio is measured against.
    pub fn accuracy_pool_size(&self) -> usize {
        self.true_false.len() + self.riddles.len()
    }

    /// A small self-contained world used by the demo binary and tests.
    ///
    /// Three quests: two riddle-gated, the last guarded by a boss at the
    /// stronghold.
    pub fn sample() -> Self {
        let quests = vec![
            QuestDef {
                id: QuestId(1),
                name: "The Whispering Woods".to_string(),
                reward_item: Some("Lantern of Clarity".to_string()),
                reward_effective_against: Some("Fog Wraith".to_string()),
                gate: QuestGate::Riddles,
            },
            QuestDef {
                id: QuestId(2),
                name: "The River of Reason".to_string(),
                reward_item: Some("Compass of Logic".to_string()),
                reward_effective_against: Some("Fallacy Serpent".to_string()),
                gate: QuestGate::Riddles,
            },
            QuestDef {
                id: QuestId(3),
                name: "The Stronghold".to_string(),
                reward_item: Some("Crown of Scholars".to_string()),
                reward_effective_against: None,
                gate: QuestGate::Boss {
                    boss: EnemyId(100),
                    location: crate::config::STRONGHOLD,
                },
            },
        ];

        let riddle_rows: [(u32, &str, &str, Difficulty); 9] = [
            (1, "What has keys but cannot open locks?", "a piano", Difficulty::Easy),
            (2, "What gets wetter the more it dries?", "a towel", Difficulty::Easy),
            (3, "What has a neck but no head?", "a bottle", Difficulty::Easy),
            (4, "What can travel around the world while staying in a corner?", "a stamp", Difficulty::Medium),
            (5, "What has cities but no houses, forests but no trees?", "a map", Difficulty::Medium),
            (6, "The more you take, the more you leave behind. What are they?", "footsteps", Difficulty::Medium),
            (7, "What can you catch but not throw?", "a cold", Difficulty::Hard),
            (8, "What belongs to you but others use it more?", "your name", Difficulty::Hard),
            (9, "What runs but never walks, has a mouth but never talks?", "a river", Difficulty::Hard),
        ];
        let mut riddles = Vec::new();
        for quest in 1..=3u32 {
            for (id, text, answer, difficulty) in riddle_rows.iter() {
                riddles.push(Riddle {
                    id: RiddleId((quest - 1) * 100 + id),
                    quest_id: QuestId(quest),
                    text: text.to_string(),
                    answer: answer.to_string(),
                    hint: Some(format!("Think about {}.", answer.split_whitespace().last().unwrap_or(*answer))),
                    difficulty: *difficulty,
                });
            }
        }

        let tf_rows: [(&str, bool); 6] = [
            ("The sun is a star.", true),
            ("Spiders are insects.", false),
            ("Water boils at 100 degrees Celsius at sea level.", true),
            ("A triangle has four sides.", false),
            ("The Pacific is the largest ocean.", true),
            ("Bats are blind.", false),
        ];
        let mut true_false = Vec::new();
        for quest in 1..=3u32 {
            for (offset, (text, answer)) in tf_rows.iter().enumerate() {
                true_false.push(TrueFalseQuestion {
                    id: QuestionId((quest - 1) * 100 + offset as u32 + 1),
                    quest_id: QuestId(quest),
                    text: text.to_string(),
                    answer: *answer,
                    hint: None,
                });
            }
        }

        let mc_rows: [(&str, [&str; 4], ChoiceLetter); 4] = [
            ("Which planet is largest?", ["Mars", "Jupiter", "Venus", "Earth"], ChoiceLetter::B),
            ("How many continents are there?", ["Five", "Six", "Seven", "Eight"], ChoiceLetter::C),
            ("Which gas do plants absorb?", ["Carbon dioxide", "Oxygen", "Helium", "Neon"], ChoiceLetter::A),
            ("What is 7 times 8?", ["54", "58", "63", "56"], ChoiceLetter::D),
        ];
        let mut multiple_choice = Vec::new();
        for quest in 1..=3u32 {
            for (offset, (text, options, answer)) in mc_rows.iter().enumerate() {
                multiple_choice.push(MultipleChoiceQuestion {
                    id: QuestionId((quest - 1) * 100 + offset as u32 + 1),
                    quest_id: QuestId(quest),
                    text: text.to_string(),
                    options: std::array::from_fn(|i| options[i].to_string()),
                    answer: *answer,
                    hint: None,
                });
            }
        }

        let enemy_rows: [(u32, &str, &str, u32, u32, u32, u32); 4] = [
            (1, "Fog Wraith", "Torch", 10, 10, 3, 1),
            (2, "Grammar Troll", "Red Pen", 15, 12, 4, 1),
            (3, "Fallacy Serpent", "Whetstone of Logic", 25, 20, 5, 3),
            (4, "Entropy Golem", "Iron Hammer", 40, 35, 6, 5),
        ];
        let mut enemies: Vec<Enemy> = enemy_rows
            .iter()
            .map(|(id, name, weakness, gold, xp, hunger, min_level)| Enemy {
                id: EnemyId(*id),
                name: name.to_string(),
                description: format!("A {} blocks the path.", name.to_lowercase()),
                weakness: weakness.to_string(),
                gold_reward: *gold,
                xp_reward: *xp,
                max_hunger: *hunger,
                is_boss: false,
                min_level: *min_level,
            })
            .collect();
        enemies.push(Enemy {
            id: EnemyId(100),
            name: "Lexiconis the Unreadable".to_string(),
            description: "The keeper of the stronghold speaks only in questions.".to_string(),
            weakness: "Crown of Scholars".to_string(),
            gold_reward: 500,
            xp_reward: 250,
            max_hunger: 6,
            is_boss: true,
            min_level: 1,
        });

        let wizard_items = vec![
            WizardItem { name: "Scroll of Banishment".to_string(), uses: 5, min_level: 1 },
            WizardItem { name: "Four-Leaf Clover".to_string(), uses: 5, min_level: 2 },
            WizardItem { name: "Keys to the Kingdom".to_string(), uses: 3, min_level: 4 },
        ];

        let shop_gear = vec![
            ShopItem { name: "Hiking Boots".to_string(), uses: 20, min_level: 1, price: 30 },
            ShopItem { name: "Leather Shield".to_string(), uses: 10, min_level: 1, price: 25 },
            ShopItem { name: "River Boat".to_string(), uses: 15, min_level: 3, price: 80 },
        ];

        let xp_thresholds = [(1, 0), (2, 50), (3, 150), (4, 300), (5, 500), (6, 800)]
            .iter()
            .map(|(level, min_xp)| XpThreshold { level: *level, min_xp: *min_xp })
            .collect();

        Self {
            quests,
            riddles,
            true_false,
            multiple_choice,
            enemies,
            wizard_items,
            shop_gear,
            xp_thresholds,
        }
    }
}

/// Lowercases and trims a free-text answer for comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Letters per word, space separated.
///
/// # Examples
///
/// ```
/// use squire::word_length_hint;
///
/// assert_eq!(word_length_hint("your name"), "4 4");
/// ```
pub fn word_length_hint(answer: &str) -> String {
    answer
        .split_whitespace()
        .map(|word| word.chars().count().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn word_count(answer: &str) -> usize {
    answer.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_riddle_answer_matching() {
        let catalog = ContentCatalog::sample();
        let riddle = catalog.riddle(RiddleId(1)).unwrap();
        assert!(riddle.is_correct("  A Piano "));
        assert!(!riddle.is_correct("piano"));
        assert_eq!(riddle.word_length_hint(), "1 5");
        assert_eq!(riddle.word_count(), 2);
    }

    #[test]
    fn test_next_quest_follows_id_order() {
        let catalog = ContentCatalog::sample();
        assert_eq!(catalog.next_quest(QuestId(1)).map(|q| q.id), Some(QuestId(2)));
        assert_eq!(catalog.next_quest(QuestId(3)).map(|q| q.id), None);
    }

    #[test]
    fn test_enemies_for_level_excludes_bosses() {
        let catalog = ContentCatalog::sample();
        let enemies = catalog.enemies_for_level(10);
        assert_eq!(enemies.len(), 4);
        assert!(enemies.iter().all(|enemy| !enemy.is_boss));
        assert_eq!(catalog.enemies_for_level(1).len(), 2);
    }

    #[test]
    fn test_sample_quests_have_riddles() {
        let catalog = ContentCatalog::sample();
        for quest in &catalog.quests {
            let hard = catalog
                .riddles_for(quest.id)
                .filter(|riddle| riddle.difficulty == Difficulty::Hard)
                .count();
            assert_eq!(hard, 3);
        }
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let catalog = ContentCatalog::sample();
        assert!(matches!(
            catalog.quest(QuestId(99)),
            Err(SquireError::NotFound(_))
        ));
    }
}
