//! HTTP API layer for the Pokedex API.
//!
//! Provides REST endpoints for trainers, pokemons and battles.

pub mod handlers;
mod routes;
mod types;

#[cfg(test)]
mod tests;

pub use routes::build_router;
