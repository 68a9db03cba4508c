//! Core data models for mimesis.
//!
//! Options in, typed fingerprints out; everything in between is the string
//! alphabet of the sampling networks.

mod error;
mod fingerprint;
mod options;

pub use error::*;
pub use fingerprint::*;
pub use options::*;
