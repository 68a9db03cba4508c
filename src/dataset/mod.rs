//! Dataset preparation.
//!
//! Raw traffic records are validated, flattened into the categorical
//! alphabet the sampling networks expect, and enriched with synthetic
//! attributes derived from the user-agent string.

mod prepare;
mod record;
mod ua;

pub use prepare::*;
pub use record::*;
pub use ua::*;

/// Sentinel for an attribute absent in a record. A valid domain value, but
/// always stripped from generated output.
pub const MISSING_VALUE_TOKEN: &str = "*MISSING_VALUE*";

/// Prefix marking a JSON-encoded non-string value packed into the
/// categorical alphabet.
pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";

/// Synthetic node: `"<browser>/<version>|<httpMajor>"`.
pub const BROWSER_HTTP_NODE: &str = "*BROWSER_HTTP";

/// Synthetic node: `"<browser>/<version>"`.
pub const BROWSER_NODE: &str = "*BROWSER";

/// Synthetic node: operating system name.
pub const OPERATING_SYSTEM_NODE: &str = "*OPERATING_SYSTEM";

/// Synthetic node: device class.
pub const DEVICE_NODE: &str = "*DEVICE";

/// Synthetic node: `"_<httpVersion>_"` as reported by the capture.
pub const HTTP_VERSION_NODE: &str = "*HTTP_VERSION";

/// Synthetic nodes that are selected by the caller rather than generated
/// from header data.
pub const NON_GENERATED_NODES: &[&str] = &[
    BROWSER_HTTP_NODE,
    BROWSER_NODE,
    OPERATING_SYSTEM_NODE,
    DEVICE_NODE,
];
