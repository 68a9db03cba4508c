//! User-agent string classification.
//!
//! Deliberately shallow: a handful of substring tests and version regexes
//! cover the browsers the sampling networks carry data for. Anything it
//! cannot place maps to the missing-value sentinel downstream.

use crate::dataset::MISSING_VALUE_TOKEN;
use regex::Regex;

/// Coarse classification of a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UaClass {
    /// One of `chrome`, `firefox`, `safari`, `edge`, or empty.
    pub browser: String,
    /// One of `windows`, `macos`, `linux`, `ios`, `android`, or empty.
    pub os: String,
    /// One of `desktop`, `mobile`, `tablet`.
    pub device: String,
}

impl UaClass {
    pub fn is_desktop(&self) -> bool {
        self.device == "desktop"
    }
}

/// Classify a user-agent string into browser, OS, and device class.
pub fn classify(user_agent: &str) -> UaClass {
    let ua = user_agent.to_lowercase();

    let os = if ua.contains("windows") {
        "windows"
    } else if ua.contains("mac os x") {
        "macos"
    } else if ua.contains("iphone") || ua.contains("ipad") {
        "ios"
    } else if ua.contains("android") {
        "android"
    } else if ua.contains("linux") {
        "linux"
    } else {
        ""
    };

    let device = if ua.contains("mobile") {
        "mobile"
    } else if ua.contains("tablet") || ua.contains("ipad") {
        "tablet"
    } else {
        "desktop"
    };

    let browser = if ua.contains("firefox") || ua.contains("fxios") {
        "firefox"
    } else if ua.contains("edg") {
        "edge"
    } else if ua.contains("chrome") || ua.contains("crios") {
        "chrome"
    } else if ua.contains("safari") {
        "safari"
    } else {
        ""
    };

    UaClass {
        browser: browser.to_string(),
        os: os.to_string(),
        device: device.to_string(),
    }
}

/// Extract `"<browser>/<version>"` from a user-agent string, canonicalizing
/// mobile product names (crios, fxios, edg variants). User agents from
/// browsers the networks carry no data for map to the missing-value token.
pub fn browser_name_version(user_agent: &str) -> String {
    let unsupported = Regex::new(r"(?i)(opr|yabrowser|SamsungBrowser|UCBrowser|vivaldi)").ok();
    if let Some(re) = unsupported {
        if re.is_match(user_agent) {
            return MISSING_VALUE_TOKEN.to_string();
        }
    }

    if let Some(captures) = Regex::new(r"(?i)(edg(a|ios|e)?)/([0-9.]*)")
        .ok()
        .and_then(|re| re.captures(user_agent))
    {
        return format!("edge/{}", &captures[3]);
    }

    if let Some(captures) = Regex::new(r"(?i)Version/([\d.]+)( Mobile/[a-z0-9]+)? Safari")
        .ok()
        .and_then(|re| re.captures(user_agent))
    {
        return format!("safari/{}", &captures[1]);
    }

    if let Some(captures) = Regex::new(r"(?i)(firefox|fxios|chrome|crios|safari)/([0-9.]*)")
        .ok()
        .and_then(|re| re.captures(user_agent))
    {
        let canonical = match captures[1].to_lowercase().as_str() {
            "crios" | "chrome" => "chrome",
            "fxios" | "firefox" => "firefox",
            "safari" => "safari",
            _ => return MISSING_VALUE_TOKEN.to_string(),
        };
        return format!("{}/{}", canonical, &captures[2]);
    }

    MISSING_VALUE_TOKEN.to_string()
}

/// Device and operating system as encoded into the dataset's synthetic
/// nodes. Differs from [`classify`] in its mobile handling: a mobile UA
/// mentioning an Apple product is iOS, everything else mobile is Android.
pub fn dataset_device_os(user_agent: &str) -> (String, String) {
    let ua = user_agent.to_lowercase();
    let mut os = MISSING_VALUE_TOKEN.to_string();
    let mut device = "desktop".to_string();

    if ua.contains("windows") {
        os = "windows".to_string();
    }

    let is_mobile = Regex::new(r"(?i)(phone|android|mobile)")
        .ok()
        .map(|re| re.is_match(&ua))
        .unwrap_or(false);

    if is_mobile {
        device = "mobile".to_string();
        let is_apple = Regex::new(r"(?i)(iphone|mac)")
            .ok()
            .map(|re| re.is_match(&ua))
            .unwrap_or(false);
        if is_apple {
            os = "ios".to_string();
        } else if ua.contains("android") {
            os = "android".to_string();
        }
    } else if ua.contains("linux") {
        os = "linux".to_string();
    } else if ua.contains("mac") {
        os = "macos".to_string();
    }

    (device, os)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.2151.58";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_classify_desktop_browsers() {
        assert_eq!(
            classify(CHROME_WIN),
            UaClass {
                browser: "chrome".into(),
                os: "windows".into(),
                device: "desktop".into()
            }
        );
        assert_eq!(classify(FIREFOX_LINUX).browser, "firefox");
        assert_eq!(classify(FIREFOX_LINUX).os, "linux");
        assert_eq!(classify(SAFARI_MAC).browser, "safari");
        assert_eq!(classify(SAFARI_MAC).os, "macos");
        assert_eq!(classify(EDGE_WIN).browser, "edge");
    }

    #[test]
    fn test_classify_mobile() {
        let class = classify(CHROME_ANDROID);
        assert_eq!(class.browser, "chrome");
        assert_eq!(class.os, "android");
        assert_eq!(class.device, "mobile");
        assert!(!class.is_desktop());
    }

    #[test]
    fn test_browser_name_version_cascade() {
        assert_eq!(browser_name_version(CHROME_WIN), "chrome/120.0.0.0");
        assert_eq!(browser_name_version(FIREFOX_LINUX), "firefox/115.0");
        assert_eq!(browser_name_version(SAFARI_MAC), "safari/16.5");
        assert_eq!(browser_name_version(EDGE_WIN), "edge/119.0.2151.58");
    }

    #[test]
    fn test_unsupported_browser_is_missing() {
        let opera = "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 OPR/103.0.0.0";
        assert_eq!(browser_name_version(opera), MISSING_VALUE_TOKEN);
        assert_eq!(browser_name_version("curl/8.0"), MISSING_VALUE_TOKEN);
    }

    #[test]
    fn test_dataset_device_os() {
        assert_eq!(
            dataset_device_os(CHROME_WIN),
            ("desktop".to_string(), "windows".to_string())
        );
        assert_eq!(
            dataset_device_os(CHROME_ANDROID),
            ("mobile".to_string(), "android".to_string())
        );
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/118.0.5993.69 Mobile/15E148 Safari/604.1";
        assert_eq!(
            dataset_device_os(iphone),
            ("mobile".to_string(), "ios".to_string())
        );
        assert_eq!(browser_name_version(iphone), "chrome/118.0.5993.69");
    }
}
