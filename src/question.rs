use crate::effectiveness::DefenderSet;
use crate::errors::ValidationError;
use schema::{Difficulty, EffectivenessLevel, PokemonType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic question id derived from the matchup. Defenders are sorted
/// by name so `fire-rock-water` is the same id whichever order they were
/// drawn in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn for_matchup(attacker: PokemonType, defenders: &[PokemonType]) -> Self {
        let mut names: Vec<&str> = defenders.iter().map(|t| t.id()).collect();
        names.sort_unstable();
        let mut id = String::from(attacker.id());
        for name in names {
            id.push('-');
            id.push_str(name);
        }
        QuestionId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One quiz item. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    attacking_type: PokemonType,
    defending_types: Vec<PokemonType>,
    correct_answer: EffectivenessLevel,
    difficulty: Difficulty,
}

impl Question {
    /// Build a question, enforcing the defender-count rule for `difficulty`.
    pub fn new(
        attacking_type: PokemonType,
        defending_types: &[PokemonType],
        correct_answer: EffectivenessLevel,
        difficulty: Difficulty,
    ) -> Result<Self, ValidationError> {
        DefenderSet::new(defending_types)?;
        let expected = difficulty.defending_type_count();
        if defending_types.len() != expected {
            return Err(ValidationError::DefendingTypeCount {
                difficulty,
                expected,
                actual: defending_types.len(),
            });
        }

        Ok(Self {
            id: QuestionId::for_matchup(attacking_type, defending_types),
            attacking_type,
            defending_types: defending_types.to_vec(),
            correct_answer,
            difficulty,
        })
    }

    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    pub fn attacking_type(&self) -> PokemonType {
        self.attacking_type
    }

    pub fn defending_types(&self) -> &[PokemonType] {
        &self.defending_types
    }

    pub fn correct_answer(&self) -> EffectivenessLevel {
        self.correct_answer
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_correct(&self, answer: EffectivenessLevel) -> bool {
        self.correct_answer == answer
    }

    /// The six possible answers, lowest multiplier first.
    pub fn answer_choices(&self) -> [EffectivenessLevel; 6] {
        EffectivenessLevel::ALL
    }

    /// Reads like "Ice vs Dragon/Ground: Ultra Effective (4x)".
    pub fn explanation(&self) -> String {
        format!(
            "{} vs {}: {}",
            self.attacking_type,
            self.defender_label(),
            self.correct_answer
        )
    }

    pub fn prompt(&self) -> String {
        format!(
            "How effective is a {} attack against a {} defender?",
            self.attacking_type,
            self.defender_label()
        )
    }

    fn defender_label(&self) -> String {
        self.defending_types
            .iter()
            .map(|t| t.display_name())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A recorded answer. Appended once per question, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: QuestionId,
    /// `None` for questions drained by an early end of the game.
    pub selected_answer: Option<EffectivenessLevel>,
    pub is_correct: bool,
    pub time_spent_ms: u64,
}
