//! Optimizers
//!
//! Generic minimizers over a fixed number of real parameters. Problems implement
//! the trait of the optimizer they want to use and get `optimize` for free.
pub mod differential_evolution;
pub mod hill_climber;

pub use differential_evolution::{DifferentialEvolution, DifferentialEvolutionParams};
pub use hill_climber::{HillClimbMode, HillClimbParams, HillClimber};
