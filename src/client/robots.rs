//! Robot user-agent pattern source.
//!
//! The validation stage cross-checks user agents against a community list
//! of crawler patterns. The list is fetched once per process, before
//! preparation starts; the sampling core never touches the network.

use crate::models::Result;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

/// Default pattern source: the COUNTER-Robots community list.
pub const DEFAULT_ROBOTS_URL: &str =
    "https://raw.githubusercontent.com/atmire/COUNTER-Robots/master/COUNTER_Robots_list.json";

#[derive(Debug, Deserialize)]
struct RobotPattern {
    pattern: String,
}

/// Fetch and compile the robot user-agent patterns.
///
/// Patterns that fail to compile are skipped with a warning; a failed fetch
/// is the caller's to handle (validation degrades to the builtin bot
/// heuristic).
pub async fn fetch_robot_patterns(url: &str) -> Result<Vec<Regex>> {
    let patterns: Vec<RobotPattern> = reqwest::get(url).await?.error_for_status()?.json().await?;

    let mut compiled = Vec::with_capacity(patterns.len());
    for robot in patterns {
        match Regex::new(&format!("(?i){}", robot.pattern)) {
            Ok(regex) => compiled.push(regex),
            Err(error) => {
                warn!(pattern = %robot.pattern, %error, "Skipping unparseable robot pattern");
            }
        }
    }

    info!(count = compiled.len(), "Fetched robot user-agent patterns");
    Ok(compiled)
}
