// Seeding services: reset, per-collection stages and the run orchestrator

pub mod orchestrator;
pub mod records;
pub mod reset;
pub mod seed;

pub use orchestrator::{SeedOptions, SeedSummary, Seeder};
