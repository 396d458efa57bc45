//! Domain types for the Pokedex API.
//!
//! This module contains the entities, their request bodies and the field
//! rules applied before anything is written.

mod battle;
mod creature;
mod trainer;
mod validation;

pub use battle::*;
pub use creature::*;
pub use trainer::*;
pub use validation::ValidationErrors;
