//! # Quest Progress
//!
//! Riddle progress per quest, completion and hand-off to the next quest, the
//! XP level ladder, and wandering riddles.

use crate::config::ProgressConfig;
use crate::game::{
    ContentCatalog, Difficulty, InventoryItem, ItemKind, Player, PlayerId, QuestGate, QuestId,
    QuestInstance, QuestInstanceId, QuestStatus, Riddle, RiddleId,
};
use crate::store::WorldStore;
use crate::{SquireError, SquireResult};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How far a player is through a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub answered: u32,
    pub total_required: u32,
    pub percent: u32,
}

impl ProgressSummary {
    pub fn new(answered: u32, total_required: u32) -> Self {
        let percent = if total_required == 0 {
            100
        } else {
            (answered.saturating_mul(100) / total_required).min(100)
        };
        Self {
            answered,
            total_required,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.answered >= self.total_required
    }
}

/// What finishing a quest changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompletion {
    pub quest_id: QuestId,
    pub reward_item: Option<String>,
    pub next_instance: Option<QuestInstanceId>,
}

/// Riddle hints a player can see, depending on the items they carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiddleHints {
    pub text: Option<String>,
    pub word_lengths: Option<String>,
    pub word_count: Option<usize>,
}

impl RiddleHints {
    pub fn for_player(player: &Player, riddle: &Riddle) -> Self {
        let reveals_text = player.has_item_like("banishment") || player.has_item_like("decoder");
        Self {
            text: if reveals_text { riddle.hint.clone() } else { None },
            word_lengths: player
                .has_item_like("four-leaf clover")
                .then(|| riddle.word_length_hint()),
            word_count: player
                .has_item_like("keys to the kingdom")
                .then(|| riddle.word_count()),
        }
    }
}

/// A riddle put to a player, away from any chest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiddleChallenge {
    pub player_id: PlayerId,
    pub quest_id: QuestId,
    pub riddle_id: RiddleId,
    pub text: String,
    pub difficulty: Difficulty,
    pub hints: RiddleHints,
}

impl RiddleChallenge {
    /// Puts `riddle` to `player`, with whatever hints their items reveal.
    pub fn new(player: &Player, quest_id: QuestId, riddle: &Riddle) -> Self {
        Self {
            player_id: player.id,
            quest_id,
            riddle_id: riddle.id,
            text: riddle.text.clone(),
            difficulty: riddle.difficulty,
            hints: RiddleHints::for_player(player, riddle),
        }
    }
}

/// Tracks riddle progress and quest completion.
#[derive(Debug, Clone, Default)]
pub struct QuestProgressTracker {
    pub config: ProgressConfig,
}

impl QuestProgressTracker {
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// Solved riddles needed: the quest's hard riddles plus a fixed baseline.
    pub fn total_required(&self, catalog: &ContentCatalog, quest: QuestId) -> u32 {
        let hard = catalog
            .riddles_for(quest)
            .filter(|riddle| riddle.difficulty == Difficulty::Hard)
            .count() as u32;
        hard + self.config.baseline_required
    }

    pub fn quest_progress<S: WorldStore>(
        &self,
        store: &S,
        player: PlayerId,
        quest: QuestId,
    ) -> SquireResult<ProgressSummary> {
        store.catalog().quest(quest)?;
        let answered = store.solved_riddles(player, quest)?.len() as u32;
        Ok(ProgressSummary::new(
            answered,
            self.total_required(store.catalog(), quest),
        ))
    }

    /// Whether the instance's quest is done: enough riddles, or the boss beaten.
    pub fn check_quest_completion<S: WorldStore>(
        &self,
        store: &S,
        instance: &QuestInstance,
    ) -> SquireResult<bool> {
        if instance.is_completed() {
            return Ok(true);
        }
        let quest = store.catalog().quest(instance.quest_id)?;
        match quest.gate {
            QuestGate::Boss { .. } => Ok(instance.boss_defeated),
            QuestGate::Riddles => Ok(self
                .quest_progress(store, instance.player_id, instance.quest_id)?
                .is_complete()),
        }
    }

    /// Closes out a quest instance and opens the next quest.
    ///
    /// Gives `player` the quest's reward item, but the caller saves the
    /// player. Completing an already completed instance changes nothing.
    pub fn complete_quest<S: WorldStore>(
        &self,
        store: &mut S,
        player: &mut Player,
        instance_id: QuestInstanceId,
    ) -> SquireResult<QuestCompletion> {
        let mut instance = store.quest_instance(instance_id)?;
        if instance.player_id != player.id {
            return Err(SquireError::InvalidAction(format!(
                "quest instance {} belongs to another player",
                instance_id
            )));
        }
        let quest = store.catalog().quest(instance.quest_id)?.clone();

        if instance.is_completed() {
            debug!("Quest instance {} already completed", instance_id);
            let next_instance = match store.catalog().next_quest(quest.id) {
                Some(next) => store
                    .find_quest_instance(player.id, next.id)?
                    .map(|found| found.id),
                None => None,
            };
            return Ok(QuestCompletion {
                quest_id: quest.id,
                reward_item: None,
                next_instance,
            });
        }

        if let Some(item_name) = &quest.reward_item {
            let mut item = InventoryItem::new(item_name.clone(), ItemKind::Special, 1);
            item.effective_against = quest.reward_effective_against.clone();
            player.give(item);
        }
        store.clear_travel_history(player.id)?;

        instance.status = QuestStatus::Completed;
        store.save_quest_instance(&instance)?;

        let next_instance = match store.catalog().next_quest(quest.id).map(|next| next.id) {
            Some(next_id) => {
                let next = match store.find_quest_instance(player.id, next_id)? {
                    Some(mut existing) => {
                        existing.status = QuestStatus::Active;
                        store.save_quest_instance(&existing)?;
                        existing
                    }
                    None => store.create_quest_instance(player.id, next_id)?,
                };
                Some(next.id)
            }
            None => None,
        };

        info!(
            "Player {} completed quest {} ({})",
            player.id, quest.id, quest.name
        );
        Ok(QuestCompletion {
            quest_id: quest.id,
            reward_item: quest.reward_item,
            next_instance,
        })
    }

    /// Raises the player one level if their XP meets the next threshold.
    ///
    /// Returns the new level. A player far past several thresholds still moves
    /// only one step; call again or use [`Self::level_up_all`].
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{ContentCatalog, Player, PlayerId, QuestProgressTracker, TeamId};
    ///
    /// let tracker = QuestProgressTracker::default();
    /// let catalog = ContentCatalog::sample();
    /// let mut player = Player::new(PlayerId(1), "Ada", TeamId(1));
    /// player.experience_points = 160;
    ///
    /// assert_eq!(tracker.level_up_check(&mut player, &catalog), Some(2));
    /// assert_eq!(tracker.level_up_check(&mut player, &catalog), Some(3));
    /// assert_eq!(tracker.level_up_check(&mut player, &catalog), None);
    /// ```
    pub fn level_up_check(&self, player: &mut Player, catalog: &ContentCatalog) -> Option<u32> {
        let mut thresholds = catalog.xp_thresholds.clone();
        thresholds.sort_by_key(|threshold| threshold.level);

        let next = thresholds
            .iter()
            .find(|threshold| threshold.level > player.level)?;
        if player.experience_points < next.min_xp {
            return None;
        }

        player.level = next.level;
        info!("Player {} reached level {}", player.id, player.level);
        Some(player.level)
    }

    /// Applies level-ups until no threshold is met. Returns the final level if it changed.
    pub fn level_up_all(&self, player: &mut Player, catalog: &ContentCatalog) -> Option<u32> {
        let mut reached = None;
        while let Some(level) = self.level_up_check(player, catalog) {
            reached = Some(level);
        }
        reached
    }

    /// Difficulty of the next wandering riddle, stepping up as riddles get solved.
    pub fn riddle_tier(&self, solved: usize) -> Difficulty {
        if solved < self.config.medium_after as usize {
            Difficulty::Easy
        } else if solved < self.config.hard_after as usize {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    /// Picks an unsolved riddle of the player's tier, or any unsolved one if
    /// that tier is used up.
    pub fn draw_riddle<S: WorldStore, R: Rng + ?Sized>(
        &self,
        store: &S,
        player: &Player,
        quest: QuestId,
        rng: &mut R,
    ) -> SquireResult<RiddleChallenge> {
        let catalog = store.catalog();
        let solved = store.solved_riddles(player.id, quest)?;
        let tier = self.riddle_tier(solved.len());

        let unsolved: Vec<&Riddle> = catalog
            .riddles_for(quest)
            .filter(|riddle| !solved.contains(&riddle.id))
            .collect();
        let in_tier: Vec<&Riddle> = unsolved
            .iter()
            .copied()
            .filter(|riddle| riddle.difficulty == tier)
            .collect();

        let riddle = in_tier
            .choose(rng)
            .or_else(|| unsolved.choose(rng))
            .copied()
            .ok_or_else(|| {
                SquireError::NoQuestionAvailable(format!("no unsolved riddles in quest {}", quest))
            })?;

        debug!(
            "Drew {} riddle {} for player {}",
            riddle.difficulty, riddle.id, player.id
        );
        Ok(RiddleChallenge::new(player, quest, riddle))
    }
}
