//! External data sources.

mod robots;

pub use robots::*;
