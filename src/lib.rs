//! mimesis - Statistical synthesis of HTTP headers and browser fingerprints.
//!
//! ## Architecture
//!
//! mimesis samples from Bayesian networks learned from real browser
//! traffic, so every generated header set and fingerprint is a tuple that
//! plausibly occurs in the wild:
//!
//! - **bayes**: CPT trees, constrained sampling with backtracking, and
//!   constraint-closure propagation
//! - **pipeline**: the header and fingerprint generators composing the
//!   networks with user options and a relaxation ladder
//! - **dataset**: validation and canonicalization of raw capture records
//! - **client**: the robot user-agent list used during validation
//!
//! ## Generation flow
//!
//! options → constraint closure → consistent input sample → ancestral
//! header sample → post-processing → (for fingerprints) constrained
//! fingerprint sample → decoded, typed output.
//!
//! The sampling core is synchronous, in-memory, and free of I/O; archives
//! are read once at construction. Generators own a seedable RNG, so a fixed
//! seed reproduces the full output.

pub mod bayes;
pub mod client;
pub mod dataset;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use bayes::{constraint_closure, ConditionalTree, Network, Node};
pub use client::{fetch_robot_patterns, DEFAULT_ROBOTS_URL};
pub use dataset::{
    prepare_fingerprint_files, prepare_header_files, RecordValidator, MISSING_VALUE_TOKEN,
    STRINGIFIED_PREFIX,
};
pub use models::{
    BrowserOption, BrowserSpecification, Fingerprint, FingerprintGeneratorOptions,
    FingerprintWithHeaders, HeaderGeneratorOptions, MimesisError, Result, ScreenOptions,
};
pub use pipeline::{FingerprintGenerator, HeaderGenerator};
