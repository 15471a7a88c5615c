//! Organism body plans.
//!
//! An organism is a set of typed cells laid out around an anchor at (0, 0).
//! This crate holds the cell and anatomy model, the mutation operators that
//! edit anatomies at birth, and the decision-policy seam used for movement.

pub mod cell;
pub mod anatomy;
pub mod mutation;
pub mod policy;

pub use cell::Cell;
pub use anatomy::Anatomy;
pub use mutation::{Mutation, MutationConfig, MutationKind, Mutator};
pub use policy::{DecisionPolicy, Heading, RandomWalk};
