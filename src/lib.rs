//! Type Quiz Engine
//!
//! Quizzes a player on elemental type matchups: a memoized effectiveness
//! calculator, a constrained question generator with bounded retries, and a
//! session state machine that drives a quiz from creation to scored
//! completion. Hosts drive everything through [`QuizService`].

// --- MODULE DECLARATIONS ---
pub mod catalog;
pub mod config;
pub mod effectiveness;
pub mod errors;
pub mod generator;
pub mod question;
pub mod quiz_interface;
pub mod registry;
pub mod rng;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod tests;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{Difficulty, EffectivenessLevel, PokemonType};

// --- From this crate's modules (`src/`) ---

// Matchup math and type data.
pub use catalog::{TypeCatalog, TypeDataSource};
pub use effectiveness::{DefenderSet, DefensiveProfile, EffectivenessCalculator};

// Question generation.
pub use generator::{GeneratedBatch, GenerationMetadata, GenerationOptions, QuestionGenerator};
pub use question::{Question, QuestionId, UserAnswer};
pub use rng::{RandomSource, ScriptedRandom};

// Sessions and hosting.
pub use config::{ConfigError, QuizConfig};
pub use quiz_interface::QuizService;
pub use registry::{SessionRegistry, SweepPolicy};
pub use session::{GameConfig, GameSession, GameStatistics, GameStatus};

// Crate-specific error and result types.
pub use errors::{
    GenerationError, NotFoundError, QuizError, QuizResult, StateError, ValidationError,
};
