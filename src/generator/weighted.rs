//! Stratified generation weighted toward chosen effectiveness outcomes.

use super::{validate_count, BatchBuilder, GeneratedBatch, GenerationOptions, QuestionGenerator};
use crate::errors::{QuizResult, ValidationError};
use crate::rng::{source_for_seed, RandomSource};
use schema::EffectivenessLevel;

/// Attempts each stratum gets before it gives up.
pub const STRATUM_ATTEMPT_BUDGET: usize = 1000;

impl<'a> QuestionGenerator<'a> {
    /// Generate `options.count` questions split across `targets` in
    /// proportion to their weights. Each stratum only accepts candidates that
    /// resolve to its level.
    pub fn generate_weighted(
        &self,
        options: &GenerationOptions,
        targets: &[(EffectivenessLevel, u32)],
    ) -> QuizResult<GeneratedBatch> {
        let mut rng = source_for_seed(options.seed);
        self.generate_weighted_with(options, targets, &mut *rng)
    }

    pub fn generate_weighted_with(
        &self,
        options: &GenerationOptions,
        targets: &[(EffectivenessLevel, u32)],
        rng: &mut dyn RandomSource,
    ) -> QuizResult<GeneratedBatch> {
        validate_count(options.count)?;
        let allocation = allocate_strata(options.count, targets)?;
        let mut batch = BatchBuilder::new(self, options)?;

        for (level, quota) in allocation {
            let mut stratum_attempts = 0;
            let mut filled = 0;
            while filled < quota && stratum_attempts < STRATUM_ATTEMPT_BUDGET {
                batch.check_deadline(options.count)?;
                stratum_attempts += 1;
                if batch.try_candidate(rng, Some(level))? {
                    filled += 1;
                }
            }
            if filled < quota {
                tracing::debug!(
                    level = level.name(),
                    quota,
                    filled,
                    "effectiveness stratum ran out of attempts"
                );
            }
        }

        shuffle(&mut batch.questions, rng);
        batch.finish(options.count)
    }
}

/// Split `count` across the targets by weight. Floors first, then hands the
/// remainder to the heaviest targets (earlier entries win ties).
fn allocate_strata(
    count: usize,
    targets: &[(EffectivenessLevel, u32)],
) -> Result<Vec<(EffectivenessLevel, usize)>, ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError::InvalidTargets(
            "at least one effectiveness level is required".to_string(),
        ));
    }
    if let Some((level, _)) = targets.iter().find(|(_, weight)| *weight == 0) {
        return Err(ValidationError::InvalidTargets(format!(
            "weight for {} must be positive",
            level.name()
        )));
    }
    for (i, (level, _)) in targets.iter().enumerate() {
        if targets[..i].iter().any(|(other, _)| other == level) {
            return Err(ValidationError::InvalidTargets(format!(
                "{} listed more than once",
                level.name()
            )));
        }
    }

    let total: u64 = targets.iter().map(|(_, w)| u64::from(*w)).sum();
    let mut allocation: Vec<(EffectivenessLevel, usize)> = targets
        .iter()
        .map(|(level, weight)| {
            let share = (count as u64 * u64::from(*weight)) / total;
            (*level, share as usize)
        })
        .collect();

    let mut remainder = count - allocation.iter().map(|(_, n)| n).sum::<usize>();
    let mut by_weight: Vec<usize> = (0..targets.len()).collect();
    by_weight.sort_by(|a, b| targets[*b].1.cmp(&targets[*a].1));
    for index in by_weight.into_iter().cycle() {
        if remainder == 0 {
            break;
        }
        allocation[index].1 += 1;
        remainder -= 1;
    }

    Ok(allocation)
}

fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.pick_index(i + 1);
        items.swap(i, j);
    }
}
