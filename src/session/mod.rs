pub mod state;
pub mod stats;

pub use state::{AnswerOutcome, GameConfig, GameSession, GameStatus};
pub use stats::{estimated_time_ms, GameStatistics, LevelStats};
