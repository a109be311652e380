use crate::errors::{StateError, ValidationError};
use crate::generator::validate_count;
use crate::question::{Question, UserAnswer};
use crate::session::stats::GameStatistics;
use chrono::{DateTime, Utc};
use schema::{Difficulty, EffectivenessLevel};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Immutable settings of one quiz.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub question_count: usize,
}

impl GameConfig {
    pub fn new(difficulty: Difficulty, question_count: usize) -> Result<Self, ValidationError> {
        validate_count(question_count)?;
        Ok(Self {
            difficulty,
            question_count,
        })
    }
}

/// Result of a single `submit_answer` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question: Question,
    pub selected_answer: EffectivenessLevel,
    pub is_correct: bool,
    pub is_completed: bool,
}

/// One quiz run: `NotStarted -> InProgress -> Completed`, with `reset`
/// returning to `NotStarted` from anywhere. Single writer; hosts must
/// serialize access. Serialize-only: a session is rebuilt through `new`.
#[derive(Serialize, Debug, Clone)]
pub struct GameSession {
    pub session_id: String,
    config: GameConfig,
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    answers: Vec<UserAnswer>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    status: GameStatus,
    last_activity: DateTime<Utc>,
}

impl GameSession {
    /// Build a session. The question list must match the configured count and
    /// difficulty.
    pub fn new(
        session_id: String,
        config: GameConfig,
        questions: Vec<Question>,
    ) -> Result<Self, StateError> {
        if questions.len() != config.question_count {
            return Err(StateError::InvalidConstruction(format!(
                "expected {} questions, got {}",
                config.question_count,
                questions.len()
            )));
        }
        if let Some(question) = questions
            .iter()
            .find(|q| q.difficulty() != config.difficulty)
        {
            return Err(StateError::InvalidConstruction(format!(
                "question {} is {} but the game is {}",
                question.id(),
                question.difficulty(),
                config.difficulty
            )));
        }

        Ok(Self {
            session_id,
            config,
            questions,
            current_index: 0,
            score: 0,
            answers: Vec::new(),
            start_time: None,
            end_time: None,
            status: GameStatus::NotStarted,
            last_activity: Utc::now(),
        })
    }

    pub fn start(&mut self) -> Result<DateTime<Utc>, StateError> {
        if self.status != GameStatus::NotStarted {
            return Err(StateError::AlreadyStarted);
        }
        let now = Utc::now();
        self.current_index = 0;
        self.score = 0;
        self.answers.clear();
        self.start_time = Some(now);
        self.end_time = None;
        self.status = GameStatus::InProgress;
        self.last_activity = now;
        tracing::info!(session_id = %self.session_id, "game started");
        Ok(now)
    }

    pub fn submit_answer(
        &mut self,
        answer: EffectivenessLevel,
        time_spent_ms: u64,
    ) -> Result<AnswerOutcome, StateError> {
        self.ensure_in_progress()?;
        let question = self.questions[self.current_index].clone();
        let is_correct = question.is_correct(answer);

        self.answers.push(UserAnswer {
            question_id: question.id().clone(),
            selected_answer: Some(answer),
            is_correct,
            time_spent_ms,
        });
        if is_correct {
            self.score += 1;
        }
        self.advance();

        Ok(AnswerOutcome {
            question,
            selected_answer: answer,
            is_correct,
            is_completed: self.status == GameStatus::Completed,
        })
    }

    /// Finish early. Every unanswered question is recorded as incorrect.
    /// Calling it on a finished game just returns the statistics again.
    pub fn end_game(&mut self) -> Result<GameStatistics, StateError> {
        match self.status {
            GameStatus::NotStarted => return Err(StateError::NotStarted),
            GameStatus::Completed => return Ok(self.statistics()),
            GameStatus::InProgress => {}
        }

        let drained = self.remaining();
        while self.status == GameStatus::InProgress {
            let question_id = self.questions[self.current_index].id().clone();
            self.answers.push(UserAnswer {
                question_id,
                selected_answer: None,
                is_correct: false,
                time_spent_ms: 0,
            });
            self.advance();
        }
        tracing::info!(
            session_id = %self.session_id,
            drained,
            "game ended early"
        );
        Ok(self.statistics())
    }

    /// Back to the pre-start state. Config and questions are kept.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.score = 0;
        self.answers.clear();
        self.start_time = None;
        self.end_time = None;
        self.status = GameStatus::NotStarted;
        self.last_activity = Utc::now();
        tracing::info!(session_id = %self.session_id, "game reset");
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn has_started(&self) -> bool {
        self.status != GameStatus::NotStarted
    }

    pub fn has_completed(&self) -> bool {
        self.status == GameStatus::Completed
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// The question awaiting an answer, if the game is running.
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            GameStatus::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.questions.len() - self.current_index
    }

    /// Percentage of questions answered.
    pub fn progress(&self) -> f64 {
        self.current_index as f64 / self.questions.len() as f64 * 100.0
    }

    /// Percentage of answered questions that were correct; 0 before any answer.
    pub fn accuracy(&self) -> f64 {
        if self.answers.is_empty() {
            0.0
        } else {
            self.score as f64 / self.answers.len() as f64 * 100.0
        }
    }

    pub fn elapsed_time_ms(&self) -> u64 {
        match self.start_time {
            Some(start) => {
                let end = self.end_time.unwrap_or_else(Utc::now);
                (end - start).num_milliseconds().max(0) as u64
            }
            None => 0,
        }
    }

    pub fn statistics(&self) -> GameStatistics {
        GameStatistics::from_session(self)
    }

    fn ensure_in_progress(&self) -> Result<(), StateError> {
        match self.status {
            GameStatus::NotStarted => Err(StateError::NotStarted),
            GameStatus::Completed => Err(StateError::AlreadyCompleted),
            GameStatus::InProgress => Ok(()),
        }
    }

    fn advance(&mut self) {
        self.current_index += 1;
        let now = Utc::now();
        self.last_activity = now;
        if self.current_index >= self.questions.len() {
            self.status = GameStatus::Completed;
            self.end_time = Some(now);
            tracing::info!(
                session_id = %self.session_id,
                score = self.score,
                total = self.questions.len(),
                "game completed"
            );
        }
    }
}
