//! In-process quiz contract.
//!
//! `QuizService` is the surface a host layer (terminal, MCP, HTTP) drives.
//! Requests and responses are plain serde structs, and questions are exposed
//! as [`QuestionView`]s so the correct answer never leaves the service before
//! the player commits to one.

use crate::catalog::{TypeCatalog, TypeDataSource};
use crate::config::QuizConfig;
use crate::effectiveness::EffectivenessCalculator;
use crate::errors::{QuizResult, ValidationError};
use crate::generator::{GenerationOptions, QuestionGenerator};
use crate::question::{Question, QuestionId};
use crate::registry::{spawn_sweeper, SessionRegistry};
use crate::session::{estimated_time_ms, GameConfig, GameSession, GameStatistics, GameStatus};
use chrono::{DateTime, Utc};
use schema::{Difficulty, EffectivenessLevel, PokemonType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub difficulty: String,
    pub question_count: usize,
    #[serde(default)]
    pub focus_types: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_types: Option<Vec<String>>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub min_effectiveness_variety: Option<usize>,
}

impl CreateSessionRequest {
    pub fn new(difficulty: impl Into<String>, question_count: usize) -> Self {
        Self {
            difficulty: difficulty.into(),
            question_count,
            focus_types: None,
            exclude_types: None,
            seed: None,
            min_effectiveness_variety: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub config: GameConfig,
    pub estimated_time_ms: u64,
    pub types_used: Vec<PokemonType>,
    pub effectiveness_histogram: BTreeMap<EffectivenessLevel, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

impl SessionRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub session_id: String,
    /// One of the six level names, case-insensitive.
    pub answer: String,
    #[serde(default)]
    pub time_spent_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupRequest {
    pub attacking_type: String,
    pub defending_types: Vec<String>,
}

/// A question as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: QuestionId,
    /// 1-based position in the quiz.
    pub number: usize,
    pub prompt: String,
    pub attacking_type: PokemonType,
    pub defending_types: Vec<PokemonType>,
    pub difficulty: Difficulty,
    pub choices: Vec<EffectivenessLevel>,
}

impl QuestionView {
    fn new(question: &Question, index: usize) -> Self {
        Self {
            id: question.id().clone(),
            number: index + 1,
            prompt: question.prompt(),
            attacking_type: question.attacking_type(),
            defending_types: question.defending_types().to_vec(),
            difficulty: question.difficulty(),
            choices: question.answer_choices().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub percent: f64,
}

impl Progress {
    fn of(session: &GameSession) -> Self {
        Self {
            answered: session.current_index(),
            total: session.questions().len(),
            percent: session.progress(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub start_time: DateTime<Utc>,
    pub current_question: Option<QuestionView>,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub correct_answer: EffectivenessLevel,
    pub explanation: String,
    pub progress: Progress,
    pub next_question: Option<QuestionView>,
    pub is_game_completed: bool,
    pub final_results: Option<GameStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentQuestionResponse {
    pub current_question: Option<QuestionView>,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub estimated_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStatusResponse {
    pub status: GameStatus,
    pub progress: Progress,
    pub timing: Timing,
    /// Present once the game is completed.
    pub results: Option<GameStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndGameResponse {
    pub results: GameStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetGameResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupResponse {
    pub attacking_type: PokemonType,
    pub defending_types: Vec<PokemonType>,
    pub effectiveness: EffectivenessLevel,
    pub multiplier: f64,
    pub label: String,
}

pub fn parse_difficulty(name: &str) -> Result<Difficulty, ValidationError> {
    Difficulty::from_str(name.trim()).map_err(|_| ValidationError::UnknownDifficulty(name.to_string()))
}

pub fn parse_answer(name: &str) -> Result<EffectivenessLevel, ValidationError> {
    EffectivenessLevel::from_str(name.trim())
        .map_err(|_| ValidationError::UnknownAnswer(name.to_string()))
}

#[derive(Clone)]
pub struct QuizService {
    registry: Arc<SessionRegistry>,
    calculator: Arc<EffectivenessCalculator>,
    catalog: Arc<dyn TypeDataSource>,
    config: QuizConfig,
}

impl QuizService {
    pub fn new(config: QuizConfig) -> Self {
        Self::with_catalog(config, Arc::new(TypeCatalog::new()))
    }

    pub fn with_catalog(config: QuizConfig, catalog: Arc<dyn TypeDataSource>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            calculator: Arc::new(EffectivenessCalculator::new()),
            catalog,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Start the background expiry task for this service's sessions.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(Arc::clone(&self.registry), self.config.sweep_policy())
    }

    pub fn create_session(&self, request: CreateSessionRequest) -> QuizResult<CreateSessionResponse> {
        let difficulty = parse_difficulty(&request.difficulty)?;
        let config = GameConfig::new(difficulty, request.question_count)?;

        let mut options = GenerationOptions::new(config.question_count, difficulty);
        if let Some(focus) = &request.focus_types {
            options = options.with_focus(self.catalog.parse_all(focus)?);
        }
        if let Some(exclude) = &request.exclude_types {
            options = options.with_exclude(self.catalog.parse_all(exclude)?);
        }
        if let Some(seed) = request.seed {
            options = options.with_seed(seed);
        }
        if let Some(variety) = request.min_effectiveness_variety {
            options = options.with_min_variety(variety);
        }
        if let Some(timeout) = self.config.generation_timeout() {
            options = options.with_timeout(timeout);
        }

        let generator = QuestionGenerator::new(&self.calculator, &*self.catalog);
        let batch = generator.generate(&options).map_err(|e| {
            tracing::warn!(%difficulty, count = config.question_count, error = %e, "question generation failed");
            e
        })?;

        let session_id = Uuid::new_v4().to_string();
        let types_used = batch.metadata.types_used();
        let effectiveness_histogram = batch.metadata.effectiveness_histogram.clone();
        let session = GameSession::new(session_id.clone(), config, batch.questions)?;
        self.registry.insert(session);
        tracing::info!(
            session_id = %session_id,
            %difficulty,
            count = config.question_count,
            attempts = batch.metadata.total_attempts,
            "session created"
        );

        Ok(CreateSessionResponse {
            session_id,
            config,
            estimated_time_ms: estimated_time_ms(difficulty, config.question_count),
            types_used,
            effectiveness_histogram,
        })
    }

    pub fn start_game(&self, request: SessionRequest) -> QuizResult<StartGameResponse> {
        self.registry.with_session(&request.session_id, |session| {
            let start_time = session.start()?;
            Ok(StartGameResponse {
                start_time,
                current_question: current_view(session),
                progress: Progress::of(session),
            })
        })
    }

    pub fn submit_answer(&self, request: SubmitAnswerRequest) -> QuizResult<SubmitAnswerResponse> {
        let answer = parse_answer(&request.answer)?;
        self.registry.with_session(&request.session_id, |session| {
            let outcome = session.submit_answer(answer, request.time_spent_ms.unwrap_or(0))?;
            Ok(SubmitAnswerResponse {
                is_correct: outcome.is_correct,
                correct_answer: outcome.question.correct_answer(),
                explanation: outcome.question.explanation(),
                progress: Progress::of(session),
                next_question: current_view(session),
                is_game_completed: outcome.is_completed,
                final_results: outcome.is_completed.then(|| session.statistics()),
            })
        })
    }

    pub fn get_current_question(&self, request: SessionRequest) -> QuizResult<CurrentQuestionResponse> {
        self.registry.with_session(&request.session_id, |session| {
            Ok(CurrentQuestionResponse {
                current_question: current_view(session),
                progress: Progress::of(session),
            })
        })
    }

    pub fn get_game_status(&self, request: SessionRequest) -> QuizResult<GameStatusResponse> {
        self.registry.with_session(&request.session_id, |session| {
            let config = session.config();
            Ok(GameStatusResponse {
                status: session.status(),
                progress: Progress::of(session),
                timing: Timing {
                    start_time: session.start_time(),
                    end_time: session.end_time(),
                    elapsed_ms: session.elapsed_time_ms(),
                    estimated_time_ms: estimated_time_ms(config.difficulty, config.question_count),
                },
                results: session.has_completed().then(|| session.statistics()),
            })
        })
    }

    pub fn end_game(&self, request: SessionRequest) -> QuizResult<EndGameResponse> {
        self.registry.with_session(&request.session_id, |session| {
            Ok(EndGameResponse {
                results: session.end_game()?,
            })
        })
    }

    pub fn reset_game(&self, request: SessionRequest) -> QuizResult<ResetGameResponse> {
        self.registry.with_session(&request.session_id, |session| {
            session.reset();
            Ok(ResetGameResponse {
                status: "reset".to_string(),
            })
        })
    }

    /// Answer a matchup directly, outside any session.
    pub fn lookup_matchup(&self, request: MatchupRequest) -> QuizResult<MatchupResponse> {
        let attacking_type = self.catalog.parse(&request.attacking_type)?;
        let defending_types = self.catalog.parse_all(&request.defending_types)?;
        let effectiveness = self.calculator.calculate(attacking_type, &defending_types)?;
        Ok(MatchupResponse {
            attacking_type,
            defending_types,
            effectiveness,
            multiplier: effectiveness.multiplier(),
            label: effectiveness.label().to_string(),
        })
    }
}

fn current_view(session: &GameSession) -> Option<QuestionView> {
    session
        .current_question()
        .map(|question| QuestionView::new(question, session.current_index()))
}
