//! Questions that stand in for a combat round.

use crate::game::{ChoiceLetter, ContentCatalog, PlayerId, QuestId, QuestionRef};
use crate::store::WorldStore;
use crate::{SquireError, SquireResult};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which question family a fight draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    TrueFalse,
    MultipleChoice,
}

impl QuestionKind {
    /// Multiple choice only once both the player and the enemy are past level 2.
    pub fn for_encounter(player_level: u32, enemy_min_level: u32) -> Self {
        if player_level > 2 && enemy_min_level > 2 {
            QuestionKind::MultipleChoice
        } else {
            QuestionKind::TrueFalse
        }
    }
}

/// Which quests a fight may draw its questions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionScope {
    /// Only the quest being played
    CurrentQuest(QuestId),
    /// Every quest before this one, as a boss asks
    EarlierThan(QuestId),
}

impl QuestionScope {
    pub fn contains(self, quest: QuestId) -> bool {
        match self {
            QuestionScope::CurrentQuest(current) => quest == current,
            QuestionScope::EarlierThan(limit) => quest < limit,
        }
    }
}

/// A player's reply to a knowledge check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeAnswer {
    TrueFalse(bool),
    Choice(ChoiceLetter),
}

/// A question currently put to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChallenge {
    pub question: QuestionRef,
    pub text: String,
    /// Lettered options, present for multiple choice
    pub options: Option<[String; 4]>,
    pub hint: Option<String>,
}

impl KnowledgeChallenge {
    /// Builds the challenge shown to the player.
    pub fn from_catalog(catalog: &ContentCatalog, question: QuestionRef) -> SquireResult<Self> {
        match question {
            QuestionRef::TrueFalse(id) => {
                let q = catalog.true_false_question(id)?;
                Ok(Self {
                    question,
                    text: q.text.clone(),
                    options: None,
                    hint: q.hint.clone(),
                })
            }
            QuestionRef::MultipleChoice(id) => {
                let q = catalog.multiple_choice_question(id)?;
                Ok(Self {
                    question,
                    text: q.text.clone(),
                    options: Some(q.options.clone()),
                    hint: q.hint.clone(),
                })
            }
            QuestionRef::Riddle(id) => Err(SquireError::InvalidCombatAction(format!(
                "riddle {} cannot be used in combat",
                id
            ))),
        }
    }

    /// Checks an answer. A reply of the wrong family is an invalid action.
    pub fn check(&self, catalog: &ContentCatalog, answer: KnowledgeAnswer) -> SquireResult<bool> {
        match (self.question, answer) {
            (QuestionRef::TrueFalse(id), KnowledgeAnswer::TrueFalse(value)) => {
                Ok(catalog.true_false_question(id)?.answer == value)
            }
            (QuestionRef::MultipleChoice(id), KnowledgeAnswer::Choice(letter)) => {
                Ok(catalog.multiple_choice_question(id)?.answer == letter)
            }
            _ => Err(SquireError::InvalidCombatAction(
                "That answer does not fit the question.".to_string(),
            )),
        }
    }
}

/// Questions of `kind` the player may still be served.
///
/// Only questions whose quest falls in `scope` are considered. A question
/// already served `cap` times is left out.
pub fn available_questions<S: WorldStore>(
    store: &S,
    player: PlayerId,
    kind: QuestionKind,
    scope: QuestionScope,
    cap: u32,
) -> SquireResult<Vec<QuestionRef>> {
    let catalog = store.catalog();

    let candidates: Vec<QuestionRef> = match kind {
        QuestionKind::TrueFalse => catalog
            .true_false
            .iter()
            .filter(|q| scope.contains(q.quest_id))
            .map(|q| QuestionRef::TrueFalse(q.id))
            .collect(),
        QuestionKind::MultipleChoice => catalog
            .multiple_choice
            .iter()
            .filter(|q| scope.contains(q.quest_id))
            .map(|q| QuestionRef::MultipleChoice(q.id))
            .collect(),
    };

    let mut available = Vec::with_capacity(candidates.len());
    for question in candidates {
        if store.question_attempt(player, question)?.times_served < cap {
            available.push(question);
        }
    }
    Ok(available)
}

/// Draws a question and records that it was served.
///
/// Returns `None` when the pool is exhausted.
pub fn serve_question<S: WorldStore, R: Rng + ?Sized>(
    store: &mut S,
    player: PlayerId,
    kind: QuestionKind,
    scope: QuestionScope,
    cap: u32,
    rng: &mut R,
) -> SquireResult<Option<KnowledgeChallenge>> {
    let available = available_questions(store, player, kind, scope, cap)?;
    let Some(&question) = available.choose(rng) else {
        debug!("No {:?} questions left for player {}", kind, player);
        return Ok(None);
    };

    let times = store.record_question_served(player, question)?;
    debug!("Served {:?} to player {} ({} times)", question, player, times);
    KnowledgeChallenge::from_catalog(store.catalog(), question).map(Some)
}
