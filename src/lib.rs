//! # Squire
//!
//! World generation, encounter and hunger-combat engine for a quest-driven
//! educational RPG.
//!
//! ## Architecture Overview
//!
//! A movement or action request flows through a small set of cooperating systems:
//!
//! - **Generation**: terrain (forests, mountains, river, landmarks), end-game
//!   dungeon rooms, treasure chest placement and reward rolls
//! - **Encounters**: per-tile enemy odds and side-event selection on each step
//! - **Combat**: hunger attrition, knowledge checks, boss fights and fleeing
//! - **Progress**: quest completion and the level-up ladder
//!
//! All persistent state lives behind the [`WorldStore`] trait and every random
//! decision draws from an injected, seeded [`rand::rngs::StdRng`], so a whole
//! session can be replayed from its seed.

pub mod combat;
pub mod config;
pub mod engine;
pub mod game;
pub mod generation;
pub mod store;

// Core module re-exports
pub use combat::*;
pub use engine::*;
pub use game::*;
pub use generation::*;
pub use store::*;

pub use config::{
    CombatConfig, DungeonConfig, EncounterConfig, EngineConfig, ProgressConfig, TerrainConfig,
};

/// Core error type for the Squire engine.
#[derive(thiserror::Error, Debug)]
pub enum SquireError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A bounded placement loop ran out of attempts
    #[error("Generation exhausted during {phase}: placed {placed} of {requested}")]
    GenerationExhausted {
        phase: String,
        placed: usize,
        requested: usize,
    },

    /// The question pool for this player has run dry
    #[error("No question available: {0}")]
    NoQuestionAvailable(String),

    /// The action does not apply to the combat session's current phase
    #[error("Invalid combat action: {0}")]
    InvalidCombatAction(String),

    /// A combat or riddle session refers to state that no longer holds
    #[error("Stale session state: {0}")]
    StaleSessionState(String),

    /// A reward-applying request was already applied
    #[error("Reward already applied: {0}")]
    ConcurrentRewardRace(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Configuration values cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SquireError {
    /// Message suitable for showing to the player.
    ///
    /// Internal failures collapse to a generic message; gameplay failures keep
    /// enough detail for the presentation layer to route back to the map.
    pub fn user_message(&self) -> String {
        match self {
            SquireError::GenerationExhausted { .. } => {
                "The land refuses to take shape right now. Try again in a moment.".to_string()
            }
            SquireError::NoQuestionAvailable(_) => {
                "There are no more questions for this challenge.".to_string()
            }
            SquireError::InvalidCombatAction(msg) | SquireError::InvalidAction(msg) => msg.clone(),
            SquireError::StaleSessionState(_) => {
                "That moment has passed. Returning to the map.".to_string()
            }
            SquireError::ConcurrentRewardRace(_) => {
                "That reward has already been claimed.".to_string()
            }
            SquireError::NotFound(_)
            | SquireError::Conflict(_)
            | SquireError::InvalidConfig(_)
            | SquireError::Io(_)
            | SquireError::Serde(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Result type used throughout the Squire codebase.
pub type SquireResult<T> = Result<T, SquireError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_internal_errors() {
        let err = SquireError::NotFound("player 9".to_string());
        assert!(!err.user_message().contains("player 9"));

        let err = SquireError::InvalidAction("You need boots to climb.".to_string());
        assert_eq!(err.user_message(), "You need boots to climb.");
    }

    #[test]
    fn test_generation_exhausted_display() {
        let err = SquireError::GenerationExhausted {
            phase: "forest".to_string(),
            placed: 3,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Generation exhausted during forest: placed 3 of 10"
        );
    }
}
