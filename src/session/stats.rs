use crate::session::state::GameSession;
use schema::{Difficulty, EffectivenessLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seconds a player is expected to spend per question.
pub fn seconds_per_question(difficulty: Difficulty) -> u64 {
    match difficulty {
        Difficulty::Easy => 10,
        Difficulty::Normal => 15,
        Difficulty::Hard => 20,
    }
}

pub fn estimated_time_ms(difficulty: Difficulty, question_count: usize) -> u64 {
    seconds_per_question(difficulty) * 1000 * question_count as u64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub asked: usize,
    pub correct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub total_questions: usize,
    pub answered: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub elapsed_ms: u64,
    pub average_time_ms: u64,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
    /// Keyed by the correct answer of each answered question.
    pub by_level: BTreeMap<EffectivenessLevel, LevelStats>,
}

impl GameStatistics {
    pub fn from_session(session: &GameSession) -> Self {
        let answers = session.answers();

        let mut by_difficulty = BTreeMap::new();
        for question in session.questions() {
            *by_difficulty.entry(question.difficulty()).or_insert(0) += 1;
        }

        let mut by_level: BTreeMap<EffectivenessLevel, LevelStats> = BTreeMap::new();
        for (question, answer) in session.questions().iter().zip(answers) {
            let entry = by_level.entry(question.correct_answer()).or_default();
            entry.asked += 1;
            if answer.is_correct {
                entry.correct += 1;
            }
        }

        // Drained placeholders carry no timing and would skew the average.
        let timed: Vec<u64> = answers
            .iter()
            .filter(|a| a.selected_answer.is_some())
            .map(|a| a.time_spent_ms)
            .collect();
        let average_time_ms = if timed.is_empty() {
            0
        } else {
            timed.iter().sum::<u64>() / timed.len() as u64
        };

        Self {
            total_questions: session.questions().len(),
            answered: answers.len(),
            correct: session.score(),
            accuracy: session.accuracy(),
            elapsed_ms: session.elapsed_time_ms(),
            average_time_ms,
            by_difficulty,
            by_level,
        }
    }
}

impl std::fmt::Display for GameStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Score: {}/{} ({:.0}% accuracy)",
            self.correct, self.total_questions, self.accuracy
        )?;
        writeln!(
            f,
            "Time: {:.1}s (avg {:.1}s per answer)",
            self.elapsed_ms as f64 / 1000.0,
            self.average_time_ms as f64 / 1000.0
        )?;
        for (level, stats) in &self.by_level {
            writeln!(
                f,
                "  {:<20} {}/{}",
                level.label(),
                stats.correct,
                stats.asked
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;
    use crate::session::state::GameConfig;
    use pretty_assertions::assert_eq;
    use schema::PokemonType::*;

    fn fixed_session() -> GameSession {
        let questions = vec![
            Question::new(Fire, &[Grass], EffectivenessLevel::Super, Difficulty::Easy).unwrap(),
            Question::new(Water, &[Fire], EffectivenessLevel::Super, Difficulty::Easy).unwrap(),
            Question::new(Normal, &[Ghost], EffectivenessLevel::NoEffect, Difficulty::Easy)
                .unwrap(),
        ];
        let config = GameConfig::new(Difficulty::Easy, 3).unwrap();
        GameSession::new("stats".to_string(), config, questions).unwrap()
    }

    #[test]
    fn estimates_scale_with_difficulty() {
        assert_eq!(estimated_time_ms(Difficulty::Easy, 10), 100_000);
        assert_eq!(estimated_time_ms(Difficulty::Hard, 3), 60_000);
    }

    #[test]
    fn statistics_break_down_by_level() {
        let mut session = fixed_session();
        session.start().unwrap();
        session.submit_answer(EffectivenessLevel::Super, 2000).unwrap();
        session.submit_answer(EffectivenessLevel::Half, 4000).unwrap();
        session.submit_answer(EffectivenessLevel::NoEffect, 3000).unwrap();

        let stats = session.statistics();
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.correct, 2);
        assert_eq!(stats.average_time_ms, 3000);
        assert_eq!(stats.by_difficulty.get(&Difficulty::Easy), Some(&3));
        assert_eq!(
            stats.by_level.get(&EffectivenessLevel::Super),
            Some(&LevelStats {
                asked: 2,
                correct: 1
            })
        );
        assert_eq!(
            stats.by_level.get(&EffectivenessLevel::NoEffect),
            Some(&LevelStats {
                asked: 1,
                correct: 1
            })
        );
    }

    #[test]
    fn unstarted_session_has_empty_statistics() {
        let stats = fixed_session().statistics();
        assert_eq!(stats.answered, 0);
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.elapsed_ms, 0);
        assert!(stats.by_level.is_empty());
    }
}
