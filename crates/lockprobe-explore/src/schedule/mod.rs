pub mod energy;
pub mod strategy;

pub use energy::assign_energy;
pub use strategy::{SeedDecision, SeedSelector, WeightedSelector};
