//! Raw record validation.
//!
//! A record only enters the training alphabet if its user agent, navigator
//! properties, fonts, and screen dimensions tell a consistent story. The
//! robot-pattern list is fetched once by the caller and injected here;
//! validation itself performs no I/O.

use crate::dataset::ua::classify;
use regex::Regex;
use serde_json::Value;

/// Fonts that ship with the OS families we can cross-check against a UA.
const WINDOWS_FONTS: &[&str] = &[
    "Cambria Math",
    "Calibri",
    "MS Outlook",
    "HoloLens MDL2 Assets",
    "Segoe Fluent Icons",
];

const APPLE_FONTS: &[&str] = &[
    "Helvetica Neue",
    "Luminari",
    "PingFang HK Light",
    "InaiMathi Bold",
    "Galvji",
    "Chakra Petch",
];

/// Validates raw capture records before dataset preparation.
pub struct RecordValidator {
    bot_marker: Option<Regex>,
    robot_patterns: Vec<Regex>,
}

impl RecordValidator {
    pub fn new(robot_patterns: Vec<Regex>) -> Self {
        Self {
            bot_marker: Regex::new(r"(?i)(bot|bots|slurp|spider|crawler|crawl)\b").ok(),
            robot_patterns,
        }
    }

    /// Whether the record is internally consistent enough to learn from.
    pub fn validate(&self, record: &Value) -> bool {
        let Some(browser_fingerprint) = record.get("browserFingerprint").and_then(Value::as_object)
        else {
            return false;
        };
        let Some(request_fingerprint) = record.get("requestFingerprint").and_then(Value::as_object)
        else {
            return false;
        };
        let Some(user_agent) = browser_fingerprint.get("userAgent").and_then(Value::as_str) else {
            return false;
        };
        let Some(headers) = request_fingerprint.get("headers").and_then(Value::as_object) else {
            return false;
        };

        if let Some(bot_marker) = &self.bot_marker {
            if bot_marker.is_match(user_agent) {
                return false;
            }
        }
        if self
            .robot_patterns
            .iter()
            .any(|pattern| pattern.is_match(user_agent))
        {
            return false;
        }

        // The user-agent header must round-trip the navigator value.
        let header_ua = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .and_then(|(_, value)| value.as_str());
        if header_ua != Some(user_agent) {
            return false;
        }

        let class = classify(user_agent);

        if let Some(product_sub) = browser_fingerprint.get("productSub").and_then(Value::as_str) {
            let expected = if class.browser == "firefox" {
                "20100101"
            } else {
                "20030107"
            };
            if product_sub != expected {
                return false;
            }
        }

        if let Some(vendor) = browser_fingerprint.get("vendor").and_then(Value::as_str) {
            if class.browser == "firefox" && !vendor.is_empty() {
                return false;
            }
            if class.browser == "safari" && vendor != "Apple Computer, Inc." {
                return false;
            }
        }

        let known_fonts: &[&str] = match class.os.as_str() {
            "windows" => WINDOWS_FONTS,
            "macos" | "ios" => APPLE_FONTS,
            _ => &[],
        };
        if let Some(fonts) = browser_fingerprint.get("fonts").and_then(Value::as_array) {
            if !fonts.is_empty() && !known_fonts.is_empty() {
                let found = fonts
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|font| known_fonts.contains(&font));
                if !found {
                    return false;
                }
            }
        }

        if let Some(screen) = browser_fingerprint.get("screen").and_then(Value::as_object) {
            let width = screen.get("width").and_then(Value::as_f64).unwrap_or(0.0);
            let height = screen.get("height").and_then(Value::as_f64).unwrap_or(0.0);
            if width > 0.0 && height > 0.0 {
                let long_side = width.max(height);
                let short_side = width.min(height);
                if class.is_desktop() && (long_side < 512.0 || short_side < 384.0) {
                    return false;
                }
                if !(480.0..=7680.0).contains(&long_side)
                    || !(320.0..=4320.0).contains(&short_side)
                {
                    return false;
                }
            }
        }

        true
    }
}
