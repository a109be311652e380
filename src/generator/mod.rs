//! Constrained question generation.
//!
//! The core loop samples matchups from the eligible type pool until the batch
//! is full or the attempt budget (`count * ATTEMPTS_PER_QUESTION`) runs out.
//! Duplicate ids are expected control flow and only show up in the metadata.

mod weighted;

use crate::catalog::TypeDataSource;
use crate::effectiveness::{DefenderSet, EffectivenessCalculator};
use crate::errors::{GenerationError, QuizResult, ValidationError};
use crate::question::{Question, QuestionId};
use crate::rng::{source_for_seed, RandomSource};
use schema::{Difficulty, EffectivenessLevel, PokemonType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::{Duration, Instant};

pub use weighted::STRATUM_ATTEMPT_BUDGET;

pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 100;
pub const ATTEMPTS_PER_QUESTION: usize = 100;

/// Validate a requested question count.
pub fn validate_count(count: usize) -> Result<(), ValidationError> {
    if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
        Ok(())
    } else {
        Err(ValidationError::QuestionCountOutOfRange {
            count,
            min: MIN_QUESTIONS,
            max: MAX_QUESTIONS,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub count: usize,
    pub difficulty: Difficulty,
    /// Replaces the difficulty pool when set.
    pub focus_types: Option<Vec<PokemonType>>,
    pub exclude_types: Vec<PokemonType>,
    pub allow_duplicates: bool,
    pub min_effectiveness_variety: usize,
    pub seed: Option<u64>,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl GenerationOptions {
    pub fn new(count: usize, difficulty: Difficulty) -> Self {
        Self {
            count,
            difficulty,
            focus_types: None,
            exclude_types: Vec::new(),
            allow_duplicates: false,
            min_effectiveness_variety: 1,
            seed: None,
            timeout: None,
        }
    }

    pub fn with_focus(mut self, types: Vec<PokemonType>) -> Self {
        self.focus_types = Some(types);
        self
    }

    pub fn with_exclude(mut self, types: Vec<PokemonType>) -> Self {
        self.exclude_types = types;
        self
    }

    pub fn with_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn with_min_variety(mut self, levels: usize) -> Self {
        self.min_effectiveness_variety = levels;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What happened while a batch was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub total_attempts: usize,
    pub duplicates_skipped: usize,
    /// Candidates dropped by weighted generation for missing their stratum.
    pub off_target_skipped: usize,
    pub attacking_types_used: BTreeSet<PokemonType>,
    pub defending_types_used: BTreeSet<PokemonType>,
    pub effectiveness_histogram: BTreeMap<EffectivenessLevel, usize>,
    pub generation_time_ms: u64,
}

impl GenerationMetadata {
    /// Every type that appeared on either side of a matchup.
    pub fn types_used(&self) -> Vec<PokemonType> {
        self.attacking_types_used
            .union(&self.defending_types_used)
            .copied()
            .collect()
    }

    pub fn distinct_levels(&self) -> usize {
        self.effectiveness_histogram.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBatch {
    pub questions: Vec<Question>,
    pub metadata: GenerationMetadata,
}

/// Samples quiz questions against a calculator and a type catalog.
pub struct QuestionGenerator<'a> {
    calculator: &'a EffectivenessCalculator,
    catalog: &'a dyn TypeDataSource,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(calculator: &'a EffectivenessCalculator, catalog: &'a dyn TypeDataSource) -> Self {
        Self {
            calculator,
            catalog,
        }
    }

    /// Generate a batch, seeding the random source from `options.seed`.
    pub fn generate(&self, options: &GenerationOptions) -> QuizResult<GeneratedBatch> {
        let mut rng = source_for_seed(options.seed);
        self.generate_with(options, &mut *rng)
    }

    /// Generate a batch from an explicit random source.
    pub fn generate_with(
        &self,
        options: &GenerationOptions,
        rng: &mut dyn RandomSource,
    ) -> QuizResult<GeneratedBatch> {
        validate_count(options.count)?;
        let mut batch = BatchBuilder::new(self, options)?;
        let budget = options.count * ATTEMPTS_PER_QUESTION;

        while batch.accepted() < options.count && batch.metadata.total_attempts < budget {
            batch.check_deadline(options.count)?;
            batch.try_candidate(rng, None)?;
        }

        batch.finish(options.count)
    }

    /// A single question at `difficulty` drawn from its full pool.
    pub fn generate_one(
        &self,
        difficulty: Difficulty,
        rng: &mut dyn RandomSource,
    ) -> QuizResult<Question> {
        let options = GenerationOptions::new(1, difficulty);
        let mut batch = self.generate_with(&options, rng)?;
        Ok(batch.questions.remove(0))
    }

    /// Build the question for one explicit matchup, bypassing sampling.
    pub fn generate_for_matchup(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
        difficulty: Difficulty,
    ) -> QuizResult<Question> {
        for t in std::iter::once(&attacker).chain(defenders) {
            if !self.catalog.contains(*t) {
                return Err(ValidationError::UnknownType(t.id().to_string()).into());
            }
        }
        let set = DefenderSet::new(defenders)?;
        let answer = self.calculator.calculate_set(attacker, set);
        Ok(Question::new(attacker, defenders, answer, difficulty)?)
    }

    /// The type pool a request draws from: difficulty subset, replaced by the
    /// focus list when given, minus exclusions.
    pub fn eligible_pool(
        &self,
        options: &GenerationOptions,
    ) -> Result<Vec<PokemonType>, ValidationError> {
        let mut pool = match &options.focus_types {
            Some(focus) if !focus.is_empty() => {
                let mut pool = Vec::with_capacity(focus.len());
                for t in focus {
                    if !self.catalog.contains(*t) {
                        return Err(ValidationError::UnknownType(t.id().to_string()));
                    }
                    if !pool.contains(t) {
                        pool.push(*t);
                    }
                }
                pool
            }
            _ => self.catalog.types_for(options.difficulty),
        };
        pool.retain(|t| !options.exclude_types.contains(t));

        let required = options.difficulty.defending_type_count();
        if pool.len() < required {
            return Err(ValidationError::TypePoolTooSmall {
                available: pool.len(),
                required,
            });
        }
        Ok(pool)
    }
}

/// Mutable state of one generation call.
struct BatchBuilder<'g> {
    generator: &'g QuestionGenerator<'g>,
    difficulty: Difficulty,
    allow_duplicates: bool,
    min_variety: usize,
    pool: Vec<PokemonType>,
    seen: HashSet<QuestionId>,
    questions: Vec<Question>,
    metadata: GenerationMetadata,
    started: Instant,
    timeout: Option<Duration>,
}

impl<'g> BatchBuilder<'g> {
    fn new(
        generator: &'g QuestionGenerator<'g>,
        options: &GenerationOptions,
    ) -> Result<Self, ValidationError> {
        let pool = generator.eligible_pool(options)?;
        Ok(Self {
            generator,
            difficulty: options.difficulty,
            allow_duplicates: options.allow_duplicates,
            min_variety: options.min_effectiveness_variety.max(1),
            pool,
            seen: HashSet::new(),
            questions: Vec::with_capacity(options.count),
            metadata: GenerationMetadata::default(),
            started: Instant::now(),
            timeout: options.timeout,
        })
    }

    fn accepted(&self) -> usize {
        self.questions.len()
    }

    /// A zero timeout has already expired, so it fails before any attempt.
    fn check_deadline(&self, requested: usize) -> Result<(), GenerationError> {
        match self.timeout {
            Some(timeout) if self.started.elapsed() >= timeout => {
                Err(GenerationError::TimedOut {
                    requested,
                    generated: self.accepted(),
                    elapsed_ms: self.started.elapsed().as_millis() as u64,
                })
            }
            _ => Ok(()),
        }
    }

    /// Draw one candidate. Accepts it unless it is a duplicate or, when
    /// `target` is set, resolves to a different level. Returns whether it was
    /// accepted.
    fn try_candidate(
        &mut self,
        rng: &mut dyn RandomSource,
        target: Option<EffectivenessLevel>,
    ) -> QuizResult<bool> {
        self.metadata.total_attempts += 1;
        let (attacker, defenders) = self.sample(rng);

        let id = QuestionId::for_matchup(attacker, &defenders);
        if !self.allow_duplicates && self.seen.contains(&id) {
            self.metadata.duplicates_skipped += 1;
            return Ok(false);
        }

        let set = DefenderSet::new(&defenders)?;
        let answer = self.generator.calculator.calculate_set(attacker, set);
        if target.is_some_and(|level| level != answer) {
            self.metadata.off_target_skipped += 1;
            return Ok(false);
        }

        let question = Question::new(attacker, &defenders, answer, self.difficulty)?;
        self.seen.insert(id);
        self.metadata.attacking_types_used.insert(attacker);
        self.metadata
            .defending_types_used
            .extend(defenders.iter().copied());
        *self.metadata.effectiveness_histogram.entry(answer).or_insert(0) += 1;
        self.questions.push(question);
        Ok(true)
    }

    fn sample(&self, rng: &mut dyn RandomSource) -> (PokemonType, Vec<PokemonType>) {
        let len = self.pool.len();
        let attacker = self.pool[rng.pick_index(len)];
        let first = rng.pick_index(len);
        let defenders = if self.difficulty.defending_type_count() == 2 {
            // Draw from the remaining len - 1 slots and skip over `first`.
            let mut second = rng.pick_index(len - 1);
            if second >= first {
                second += 1;
            }
            vec![self.pool[first], self.pool[second]]
        } else {
            vec![self.pool[first]]
        };
        (attacker, defenders)
    }

    fn finish(mut self, requested: usize) -> QuizResult<GeneratedBatch> {
        self.metadata.generation_time_ms = self.started.elapsed().as_millis() as u64;

        if self.accepted() < requested {
            tracing::warn!(
                requested,
                generated = self.accepted(),
                attempts = self.metadata.total_attempts,
                "question generation exhausted its attempt budget"
            );
            return Err(GenerationError::Exhausted {
                requested,
                generated: self.accepted(),
                attempts: self.metadata.total_attempts,
            }
            .into());
        }

        let achieved = self.metadata.distinct_levels();
        if achieved < self.min_variety {
            tracing::warn!(
                achieved,
                required = self.min_variety,
                "generated batch lacks effectiveness variety"
            );
            return Err(GenerationError::InsufficientVariety {
                achieved,
                required: self.min_variety,
            }
            .into());
        }

        tracing::debug!(
            count = self.accepted(),
            attempts = self.metadata.total_attempts,
            duplicates = self.metadata.duplicates_skipped,
            levels = achieved,
            elapsed_ms = self.metadata.generation_time_ms,
            "generated question batch"
        );

        Ok(GeneratedBatch {
            questions: self.questions,
            metadata: self.metadata,
        })
    }
}
