use schema::{Difficulty, PokemonType};
use thiserror::Error;

/// Main error type for the type-quiz engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Malformed input from the caller
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Unknown session or type on lookup
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),
    /// The question generator could not satisfy the request
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
    /// Illegal session state transition
    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Errors related to malformed caller input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Difficulty name is not one of easy, normal, hard
    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),
    /// Question count outside the accepted range
    #[error("Question count {count} is outside {min}..={max}")]
    QuestionCountOutOfRange { count: usize, min: usize, max: usize },
    /// Type name is not in the catalog
    #[error("Unknown type: {0}")]
    UnknownType(String),
    /// Answer is not one of the six effectiveness level names
    #[error("Unknown answer: {0}")]
    UnknownAnswer(String),
    /// Wrong number of defending types for the request
    #[error("Expected {expected} defending type(s) for {difficulty} difficulty, got {actual}")]
    DefendingTypeCount {
        difficulty: Difficulty,
        expected: usize,
        actual: usize,
    },
    /// Defending types must be between one and two
    #[error("A matchup needs one or two defending types, got {0}")]
    DefenderCardinality(usize),
    /// Both defending slots hold the same type
    #[error("Duplicate defending type: {0}")]
    DuplicateDefendingType(PokemonType),
    /// Focus/exclude filters left too few types to build a question
    #[error("Eligible type pool has {available} type(s), need at least {required}")]
    TypePoolTooSmall { available: usize, required: usize },
    /// Weighted generation was asked for no levels or non-positive weights
    #[error("Invalid effectiveness targets: {0}")]
    InvalidTargets(String),
}

/// Errors related to lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    /// No session is registered under this id
    #[error("Session not found: {0}")]
    Session(String),
    /// No type is registered under this name
    #[error("Type not found: {0}")]
    Type(String),
}

/// Errors raised by the question generator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Attempt budget ran out before enough questions were accepted
    #[error("Could only generate {generated} of {requested} questions after {attempts} attempts")]
    Exhausted {
        requested: usize,
        generated: usize,
        attempts: usize,
    },
    /// Batch did not cover enough distinct effectiveness levels
    #[error("Batch covers {achieved} distinct effectiveness levels, {required} required")]
    InsufficientVariety { achieved: usize, required: usize },
    /// Wall-clock deadline passed before the batch was complete
    #[error("Generation timed out after {elapsed_ms}ms ({generated} of {requested} questions)")]
    TimedOut {
        requested: usize,
        generated: usize,
        elapsed_ms: u64,
    },
}

/// Errors related to the session state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// `start` called on a session that is already running or finished
    #[error("Game has already been started")]
    AlreadyStarted,
    /// Answer or end requested before `start`
    #[error("Game has not been started")]
    NotStarted,
    /// Answer or end requested after the last question
    #[error("Game is already completed")]
    AlreadyCompleted,
    /// Session was built from questions that break its configuration
    #[error("Invalid session construction: {0}")]
    InvalidConstruction(String),
}

/// Type alias for Results using QuizError
pub type QuizResult<T> = Result<T, QuizError>;
