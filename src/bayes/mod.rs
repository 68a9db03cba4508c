//! Bayesian sampling core.
//!
//! Networks of categorical variables with tree-structured CPTs, loaded from
//! serialized definitions and sampled either ancestrally or under per-node
//! value restrictions with backtracking.

mod closure;
mod cpt;
mod network;
mod node;

pub use closure::*;
pub use cpt::*;
pub use network::*;
pub use node::*;
