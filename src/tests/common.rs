use crate::catalog::TypeCatalog;
use crate::config::QuizConfig;
use crate::effectiveness::EffectivenessCalculator;
use crate::generator::{GenerationOptions, QuestionGenerator};
use crate::question::Question;
use crate::quiz_interface::{CreateSessionRequest, QuestionView, QuizService, SessionRequest};
use crate::session::{GameConfig, GameSession};
use schema::{Difficulty, EffectivenessLevel, PokemonType};

/// Calculator and catalog pair most tests build a generator from.
pub fn fixtures() -> (EffectivenessCalculator, TypeCatalog) {
    (EffectivenessCalculator::new(), TypeCatalog::new())
}

/// A reproducible batch of `count` questions.
pub fn seeded_questions(count: usize, difficulty: Difficulty, seed: u64) -> Vec<Question> {
    let (calculator, catalog) = fixtures();
    QuestionGenerator::new(&calculator, &catalog)
        .generate(&GenerationOptions::new(count, difficulty).with_seed(seed))
        .unwrap()
        .questions
}

/// A question for an explicit matchup with the answer filled in from the chart.
pub fn question_for(
    attacker: PokemonType,
    defenders: &[PokemonType],
    difficulty: Difficulty,
) -> Question {
    let (calculator, catalog) = fixtures();
    QuestionGenerator::new(&calculator, &catalog)
        .generate_for_matchup(attacker, defenders, difficulty)
        .unwrap()
}

/// A builder for test sessions with common defaults.
pub struct TestSessionBuilder {
    id: String,
    difficulty: Difficulty,
    questions: Option<Vec<Question>>,
    count: usize,
    seed: u64,
}

impl TestSessionBuilder {
    pub fn new(difficulty: Difficulty, count: usize) -> Self {
        Self {
            id: "test-session".to_string(),
            difficulty,
            questions: None,
            count,
            seed: 42,
        }
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.count = questions.len();
        self.questions = Some(questions);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> GameSession {
        let questions = self
            .questions
            .unwrap_or_else(|| seeded_questions(self.count, self.difficulty, self.seed));
        let config = GameConfig::new(self.difficulty, self.count).unwrap();
        GameSession::new(self.id, config, questions).unwrap()
    }
}

/// Any level other than the correct one.
pub fn wrong_answer(correct: EffectivenessLevel) -> EffectivenessLevel {
    if correct == EffectivenessLevel::Ultra {
        EffectivenessLevel::NoEffect
    } else {
        EffectivenessLevel::Ultra
    }
}

pub fn test_service() -> QuizService {
    QuizService::new(QuizConfig::default())
}

/// Create and start a seeded session, returning its id and first question.
pub fn started_session(
    service: &QuizService,
    difficulty: &str,
    count: usize,
    seed: u64,
) -> (String, QuestionView) {
    let mut request = CreateSessionRequest::new(difficulty, count);
    request.seed = Some(seed);
    let session_id = service.create_session(request).unwrap().session_id;
    let started = service
        .start_game(SessionRequest::new(&session_id))
        .unwrap();
    (session_id, started.current_question.unwrap())
}

/// The correct answer for the session's current question, read from inside
/// the registry the way a grader would.
pub fn correct_answer_for(service: &QuizService, session_id: &str) -> EffectivenessLevel {
    service
        .registry()
        .with_session(session_id, |session| {
            Ok(session
                .current_question()
                .map(|q| q.correct_answer())
                .unwrap())
        })
        .unwrap()
}
