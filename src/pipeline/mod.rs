//! Generation pipelines: HTTP headers, and fingerprints built on top of
//! them.

mod fingerprint;
mod headers;

pub use fingerprint::*;
pub use headers::*;
