// Type Quiz Schema - Shared type definitions
// This crate contains the static enums shared by the calculator, the question
// generator and the session layer: the eighteen types with their single-type
// chart, the quiz difficulties, and the six canonical effectiveness levels.

// Re-export the main types
pub use pokemon_types::*;
pub use quiz_types::*;

pub mod pokemon_types;
pub mod quiz_types;
