use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// Quiz difficulty. Easy and normal ask about a single defending type,
/// hard always asks about a dual-type defender.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// How many defending types a question at this difficulty carries.
    pub fn defending_type_count(&self) -> usize {
        match self {
            Difficulty::Easy | Difficulty::Normal => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The six canonical damage multipliers a matchup can resolve to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EffectivenessLevel {
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    NoEffect,
    Quarter,
    Half,
    Normal,
    Super,
    Ultra,
}

impl EffectivenessLevel {
    /// Ascending by multiplier.
    pub const ALL: [EffectivenessLevel; 6] = [
        EffectivenessLevel::NoEffect,
        EffectivenessLevel::Quarter,
        EffectivenessLevel::Half,
        EffectivenessLevel::Normal,
        EffectivenessLevel::Super,
        EffectivenessLevel::Ultra,
    ];

    /// Matching tolerance used when mapping a computed product onto a level.
    pub const TOLERANCE: f64 = 0.01;

    pub fn multiplier(&self) -> f64 {
        match self {
            EffectivenessLevel::NoEffect => 0.0,
            EffectivenessLevel::Quarter => 0.25,
            EffectivenessLevel::Half => 0.5,
            EffectivenessLevel::Normal => 1.0,
            EffectivenessLevel::Super => 2.0,
            EffectivenessLevel::Ultra => 4.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectivenessLevel::NoEffect => "No Effect",
            EffectivenessLevel::Quarter => "Barely Effective",
            EffectivenessLevel::Half => "Not Very Effective",
            EffectivenessLevel::Normal => "Normal Damage",
            EffectivenessLevel::Super => "Super Effective",
            EffectivenessLevel::Ultra => "Ultra Effective",
        }
    }

    /// Wire name ("none", "quarter", ...).
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Exact lookup within [`Self::TOLERANCE`]; `None` for anything off the scale.
    pub fn from_multiplier(multiplier: f64) -> Option<EffectivenessLevel> {
        Self::ALL
            .into_iter()
            .find(|level| (level.multiplier() - multiplier).abs() <= Self::TOLERANCE)
    }

    pub fn is_super_effective(&self) -> bool {
        self.multiplier() > 1.0
    }

    pub fn is_not_very_effective(&self) -> bool {
        let m = self.multiplier();
        m > 0.0 && m < 1.0
    }

    pub fn has_no_effect(&self) -> bool {
        matches!(self, EffectivenessLevel::NoEffect)
    }
}

impl fmt::Display for EffectivenessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x)", self.label(), self.multiplier())
    }
}
