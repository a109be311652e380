//! Effectiveness calculator.
//!
//! Combines one or two single-type chart lookups into one of the six canonical
//! [`EffectivenessLevel`]s. Results are memoized on the attacker plus the
//! sorted defender set, so `[x, y]` and `[y, x]` share one cache entry.

use crate::catalog::TypeDataSource;
use crate::errors::ValidationError;
use ordered_float::OrderedFloat;
use schema::{EffectivenessLevel, PokemonType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Canonical cache key: defenders sorted so order never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MatchupKey {
    attacker: PokemonType,
    first: PokemonType,
    second: Option<PokemonType>,
}

/// Validated, sorted defending types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefenderSet {
    first: PokemonType,
    second: Option<PokemonType>,
}

impl DefenderSet {
    /// Check cardinality and distinctness, then sort.
    pub fn new(defenders: &[PokemonType]) -> Result<Self, ValidationError> {
        match *defenders {
            [single] => Ok(Self {
                first: single,
                second: None,
            }),
            [a, b] if a == b => Err(ValidationError::DuplicateDefendingType(a)),
            [a, b] => Ok(Self {
                first: a.min(b),
                second: Some(a.max(b)),
            }),
            _ => Err(ValidationError::DefenderCardinality(defenders.len())),
        }
    }

    pub fn types(&self) -> Vec<PokemonType> {
        std::iter::once(self.first).chain(self.second).collect()
    }
}

/// Weaknesses, resistances and immunities of one defending combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefensiveProfile {
    pub defending_types: Vec<PokemonType>,
    pub weaknesses: Vec<(PokemonType, EffectivenessLevel)>,
    pub resistances: Vec<(PokemonType, EffectivenessLevel)>,
    pub immunities: Vec<PokemonType>,
}

#[derive(Debug, Default)]
pub struct EffectivenessCalculator {
    cache: RwLock<HashMap<MatchupKey, EffectivenessLevel>>,
}

impl EffectivenessCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effectiveness of `attacker` against one or two distinct defending types.
    pub fn calculate(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
    ) -> Result<EffectivenessLevel, ValidationError> {
        let set = DefenderSet::new(defenders)?;
        Ok(self.calculate_set(attacker, set))
    }

    /// Same as [`calculate`](Self::calculate) for an already validated set.
    pub fn calculate_set(&self, attacker: PokemonType, set: DefenderSet) -> EffectivenessLevel {
        let key = MatchupKey {
            attacker,
            first: set.first,
            second: set.second,
        };

        if let Ok(cache) = self.cache.read() {
            if let Some(level) = cache.get(&key) {
                return *level;
            }
        }

        let product = raw_multiplier(attacker, set);
        let level = level_for_product(product);

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, level);
        }
        level
    }

    /// Name-based entry point that validates against a type catalog.
    pub fn calculate_by_name(
        &self,
        catalog: &dyn TypeDataSource,
        attacker: &str,
        defenders: &[&str],
    ) -> Result<EffectivenessLevel, ValidationError> {
        let attacker = catalog.parse(attacker)?;
        let defenders = defenders
            .iter()
            .map(|name| catalog.parse(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.calculate(attacker, &defenders)
    }

    /// Raw product of the single-type multipliers.
    pub fn multiplier(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
    ) -> Result<f64, ValidationError> {
        let set = DefenderSet::new(defenders)?;
        Ok(raw_multiplier(attacker, set))
    }

    pub fn is_super_effective(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
    ) -> Result<bool, ValidationError> {
        Ok(self.calculate(attacker, defenders)?.is_super_effective())
    }

    pub fn is_not_very_effective(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
    ) -> Result<bool, ValidationError> {
        Ok(self.calculate(attacker, defenders)?.is_not_very_effective())
    }

    pub fn has_no_effect(
        &self,
        attacker: PokemonType,
        defenders: &[PokemonType],
    ) -> Result<bool, ValidationError> {
        Ok(self.calculate(attacker, defenders)?.has_no_effect())
    }

    /// Attacking types that hit the defenders for more than 1x.
    pub fn weaknesses(
        &self,
        defenders: &[PokemonType],
    ) -> Result<Vec<(PokemonType, EffectivenessLevel)>, ValidationError> {
        self.scan_attackers(defenders, |level| level.is_super_effective())
    }

    /// Attacking types that hit the defenders for less than 1x but not zero.
    pub fn resistances(
        &self,
        defenders: &[PokemonType],
    ) -> Result<Vec<(PokemonType, EffectivenessLevel)>, ValidationError> {
        self.scan_attackers(defenders, |level| level.is_not_very_effective())
    }

    /// Attacking types that cannot damage the defenders.
    pub fn immunities(&self, defenders: &[PokemonType]) -> Result<Vec<PokemonType>, ValidationError> {
        Ok(self
            .scan_attackers(defenders, |level| level.has_no_effect())?
            .into_iter()
            .map(|(attacker, _)| attacker)
            .collect())
    }

    pub fn matchup_summary(
        &self,
        defenders: &[PokemonType],
    ) -> Result<DefensiveProfile, ValidationError> {
        let set = DefenderSet::new(defenders)?;
        Ok(DefensiveProfile {
            defending_types: set.types(),
            weaknesses: self.weaknesses(defenders)?,
            resistances: self.resistances(defenders)?,
            immunities: self.immunities(defenders)?,
        })
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn scan_attackers(
        &self,
        defenders: &[PokemonType],
        keep: impl Fn(EffectivenessLevel) -> bool,
    ) -> Result<Vec<(PokemonType, EffectivenessLevel)>, ValidationError> {
        let set = DefenderSet::new(defenders)?;
        Ok(PokemonType::ALL
            .into_iter()
            .map(|attacker| (attacker, self.calculate_set(attacker, set)))
            .filter(|(_, level)| keep(*level))
            .collect())
    }
}

fn raw_multiplier(attacker: PokemonType, set: DefenderSet) -> f64 {
    set.types()
        .into_iter()
        .map(|defender| PokemonType::type_effectiveness(attacker, defender))
        .product()
}

/// Chart values are closed under pairwise products, so an off-scale product
/// means the chart itself is broken. Debug builds panic; release builds log
/// and fall back to the nearest level.
fn level_for_product(product: f64) -> EffectivenessLevel {
    let level = EffectivenessLevel::from_multiplier(product);
    debug_assert!(
        level.is_some(),
        "multiplier product {product} is not a canonical effectiveness level"
    );
    match level {
        Some(level) => level,
        None => {
            let nearest = EffectivenessLevel::ALL
                .into_iter()
                .min_by_key(|level| OrderedFloat((level.multiplier() - product).abs()))
                .unwrap_or(EffectivenessLevel::Normal);
            tracing::error!(
                product,
                nearest = nearest.name(),
                "multiplier product is not a canonical effectiveness level"
            );
            nearest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeCatalog;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::PokemonType::*;

    #[test]
    fn canonical_products_map_to_their_level() {
        assert_eq!(level_for_product(0.25), EffectivenessLevel::Quarter);
        assert_eq!(level_for_product(4.0), EffectivenessLevel::Ultra);
        assert_eq!(level_for_product(0.0), EffectivenessLevel::NoEffect);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not a canonical effectiveness level")]
    fn off_scale_product_is_a_defect() {
        level_for_product(3.0);
    }

    #[rstest]
    #[case(Fire, vec![Grass], EffectivenessLevel::Super)]
    #[case(Fire, vec![Water], EffectivenessLevel::Half)]
    #[case(Normal, vec![Ghost], EffectivenessLevel::NoEffect)]
    #[case(Ice, vec![Dragon, Ground], EffectivenessLevel::Ultra)]
    #[case(Fire, vec![Water, Rock], EffectivenessLevel::Quarter)]
    #[case(Electric, vec![Water, Ground], EffectivenessLevel::NoEffect)]
    #[case(Water, vec![Fire, Grass], EffectivenessLevel::Normal)]
    #[case(Dragon, vec![Fairy], EffectivenessLevel::NoEffect)]
    #[case(Psychic, vec![Steel], EffectivenessLevel::Half)]
    fn known_matchups(
        #[case] attacker: PokemonType,
        #[case] defenders: Vec<PokemonType>,
        #[case] expected: EffectivenessLevel,
    ) {
        let calculator = EffectivenessCalculator::new();
        assert_eq!(calculator.calculate(attacker, &defenders).unwrap(), expected);
    }

    #[test]
    fn dual_types_are_order_independent() {
        let calculator = EffectivenessCalculator::new();
        for attacker in PokemonType::ALL {
            for x in PokemonType::ALL {
                for y in PokemonType::ALL {
                    if x == y {
                        continue;
                    }
                    assert_eq!(
                        calculator.calculate(attacker, &[x, y]).unwrap(),
                        calculator.calculate(attacker, &[y, x]).unwrap(),
                        "{:?} vs {:?}/{:?}",
                        attacker,
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn every_dual_product_lands_on_a_canonical_level() {
        for attacker in PokemonType::ALL {
            for x in PokemonType::ALL {
                for y in PokemonType::ALL {
                    if x == y {
                        continue;
                    }
                    let product = PokemonType::type_effectiveness(attacker, x)
                        * PokemonType::type_effectiveness(attacker, y);
                    assert!(
                        EffectivenessLevel::from_multiplier(product).is_some(),
                        "{:?} vs {:?}/{:?} produced {}",
                        attacker,
                        x,
                        y,
                        product
                    );
                }
            }
        }
    }

    #[test]
    fn single_type_results_stay_on_the_single_scale() {
        let calculator = EffectivenessCalculator::new();
        for attacker in PokemonType::ALL {
            for defender in PokemonType::ALL {
                let m = calculator.calculate(attacker, &[defender]).unwrap().multiplier();
                assert!([0.0, 0.25, 0.5, 1.0, 2.0, 4.0].contains(&m));
            }
        }
    }

    #[test]
    fn rejects_bad_defender_sets() {
        let calculator = EffectivenessCalculator::new();
        assert_eq!(
            calculator.calculate(Fire, &[]),
            Err(ValidationError::DefenderCardinality(0))
        );
        assert_eq!(
            calculator.calculate(Fire, &[Water, Rock, Grass]),
            Err(ValidationError::DefenderCardinality(3))
        );
        assert_eq!(
            calculator.calculate(Fire, &[Water, Water]),
            Err(ValidationError::DuplicateDefendingType(Water))
        );
    }

    #[test]
    fn name_entry_validates_against_catalog() {
        let calculator = EffectivenessCalculator::new();
        let catalog = TypeCatalog::new();
        assert_eq!(
            calculator
                .calculate_by_name(&catalog, "ice", &["dragon", "ground"])
                .unwrap(),
            EffectivenessLevel::Ultra
        );
        assert_eq!(
            calculator.calculate_by_name(&catalog, "laser", &["water"]),
            Err(ValidationError::UnknownType("laser".to_string()))
        );
        assert_eq!(
            calculator.calculate_by_name(&catalog, "fire", &["water", "mud"]),
            Err(ValidationError::UnknownType("mud".to_string()))
        );
    }

    #[test]
    fn cache_shares_entries_across_defender_order() {
        let calculator = EffectivenessCalculator::new();
        calculator.calculate(Ice, &[Dragon, Ground]).unwrap();
        calculator.calculate(Ice, &[Ground, Dragon]).unwrap();
        assert_eq!(calculator.cache_len(), 1);
        calculator.clear_cache();
        assert_eq!(calculator.cache_len(), 0);
    }

    #[test]
    fn derived_queries() {
        let calculator = EffectivenessCalculator::new();
        assert!(calculator.is_super_effective(Water, &[Fire]).unwrap());
        assert!(calculator.is_not_very_effective(Water, &[Grass]).unwrap());
        assert!(calculator.has_no_effect(Ground, &[Flying]).unwrap());
        assert_eq!(calculator.multiplier(Rock, &[Fire, Flying]).unwrap(), 4.0);
    }

    #[test]
    fn defensive_profile_of_water_ground() {
        let calculator = EffectivenessCalculator::new();
        let profile = calculator.matchup_summary(&[Water, Ground]).unwrap();

        assert_eq!(profile.defending_types, vec![Water, Ground]);
        assert_eq!(profile.weaknesses, vec![(Grass, EffectivenessLevel::Ultra)]);
        assert_eq!(profile.immunities, vec![Electric]);
        assert!(profile
            .resistances
            .contains(&(Poison, EffectivenessLevel::Half)));
        assert!(profile
            .resistances
            .contains(&(Rock, EffectivenessLevel::Half)));
        assert!(profile
            .resistances
            .contains(&(Steel, EffectivenessLevel::Half)));
    }
}
