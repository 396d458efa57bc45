//! Storage layer for the Pokedex API.
//!
//! Provides database access via SQLx with SQLite.

mod models;
mod repository;

pub use repository::PokedexRepository;
