use crate::errors::{NotFoundError, ValidationError};
use schema::{Difficulty, PokemonType};
use std::str::FromStr;

/// Where the generator gets its eligible types from.
pub trait TypeDataSource: Send + Sync {
    /// Every valid type.
    fn all_types(&self) -> Vec<PokemonType>;

    /// The reduced set used for easy quizzes.
    fn basic_types(&self) -> Vec<PokemonType>;

    fn types_for(&self, difficulty: Difficulty) -> Vec<PokemonType> {
        match difficulty {
            Difficulty::Easy => self.basic_types(),
            Difficulty::Normal | Difficulty::Hard => self.all_types(),
        }
    }

    fn contains(&self, pokemon_type: PokemonType) -> bool {
        self.all_types().contains(&pokemon_type)
    }

    /// Parse caller input into a catalog type.
    fn parse(&self, name: &str) -> Result<PokemonType, ValidationError> {
        PokemonType::from_str(name.trim())
            .ok()
            .filter(|t| self.contains(*t))
            .ok_or_else(|| ValidationError::UnknownType(name.to_string()))
    }

    /// Same as `parse` but reported as a failed lookup.
    fn lookup(&self, name: &str) -> Result<PokemonType, NotFoundError> {
        self.parse(name)
            .map_err(|_| NotFoundError::Type(name.to_string()))
    }

    /// Parse a list of names, failing on the first unknown one.
    fn parse_all(&self, names: &[String]) -> Result<Vec<PokemonType>, ValidationError> {
        names.iter().map(|name| self.parse(name)).collect()
    }

    fn is_valid(&self, name: &str) -> bool {
        self.parse(name).is_ok()
    }
}

/// The built-in eighteen-type catalog. Basic types are the first-generation
/// fifteen.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCatalog;

impl TypeCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl TypeDataSource for TypeCatalog {
    fn all_types(&self) -> Vec<PokemonType> {
        PokemonType::ALL.to_vec()
    }

    fn basic_types(&self) -> Vec<PokemonType> {
        PokemonType::ALL
            .into_iter()
            .filter(|t| !t.is_later_generation())
            .collect()
    }

    fn contains(&self, _pokemon_type: PokemonType) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn easy_uses_the_basic_subset() {
        let catalog = TypeCatalog::new();
        let basic = catalog.types_for(Difficulty::Easy);
        assert_eq!(basic.len(), 15);
        assert!(!basic.contains(&PokemonType::Fairy));
        assert_eq!(catalog.types_for(Difficulty::Hard).len(), 18);
        assert_eq!(catalog.types_for(Difficulty::Normal), catalog.all_types());
    }

    #[test]
    fn parse_trims_and_ignores_case() {
        let catalog = TypeCatalog::new();
        assert_eq!(catalog.parse("  Dragon ").unwrap(), PokemonType::Dragon);
        assert_eq!(
            catalog.parse("shadow"),
            Err(ValidationError::UnknownType("shadow".to_string()))
        );
        assert_eq!(
            catalog.lookup("shadow"),
            Err(NotFoundError::Type("shadow".to_string()))
        );
        assert!(catalog.is_valid("steel"));
    }

    #[test]
    fn parse_all_stops_at_first_unknown() {
        let catalog = TypeCatalog::new();
        let names = vec!["fire".to_string(), "light".to_string()];
        assert_eq!(
            catalog.parse_all(&names),
            Err(ValidationError::UnknownType("light".to_string()))
        );
    }

    /// A restricted source, as a data-file-backed catalog would provide.
    struct StarterTypes;

    impl TypeDataSource for StarterTypes {
        fn all_types(&self) -> Vec<PokemonType> {
            vec![PokemonType::Fire, PokemonType::Water, PokemonType::Grass]
        }
        fn basic_types(&self) -> Vec<PokemonType> {
            self.all_types()
        }
    }

    #[test]
    fn custom_sources_reject_types_outside_their_set() {
        let source = StarterTypes;
        assert_eq!(source.parse("water").unwrap(), PokemonType::Water);
        assert!(source.parse("ice").is_err());
    }
}
