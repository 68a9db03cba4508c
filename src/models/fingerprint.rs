//! Typed fingerprint output.
//!
//! The sampling networks deal in strings; these structs are what the decoded
//! sample is assembled into before it reaches the caller. Field names follow
//! the browser APIs they mirror (`navigator`, `screen`), so serialization
//! uses camelCase throughout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The `screen` portion of a fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreenFingerprint {
    pub avail_height: f64,
    pub avail_width: f64,
    pub avail_top: f64,
    pub avail_left: f64,
    pub color_depth: f64,
    pub height: f64,
    pub pixel_depth: f64,
    pub width: f64,
    pub device_pixel_ratio: f64,
    pub page_x_offset: f64,
    pub page_y_offset: f64,
    pub inner_height: f64,
    pub outer_height: f64,
    pub outer_width: f64,
    pub inner_width: f64,
    pub screen_x: f64,
    pub client_width: f64,
    pub client_height: f64,
    #[serde(rename = "hasHDR")]
    pub has_hdr: bool,
}

/// One `navigator.userAgentData` brand entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Brand {
    pub brand: String,
    pub version: String,
}

/// The `navigator.userAgentData` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserAgentData {
    pub brands: Vec<Brand>,
    pub mobile: bool,
    pub platform: String,
    pub architecture: String,
    pub bitness: String,
    pub full_version_list: Vec<Brand>,
    pub model: String,
    pub platform_version: String,
    pub ua_full_version: String,
}

/// Grab-bag navigator properties without a first-class field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtraProperties {
    pub vendor_flavors: Vec<String>,
    pub is_bluetooth_supported: bool,
    pub global_privacy_control: Option<serde_json::Value>,
    pub pdf_viewer_enabled: bool,
    pub installed_apps: Vec<serde_json::Value>,
}

/// The `navigator` portion of a fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigatorFingerprint {
    pub user_agent: String,
    pub user_agent_data: UserAgentData,
    pub language: String,
    pub languages: Vec<String>,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    pub hardware_concurrency: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_touch_points: Option<i64>,
    pub product: String,
    pub product_sub: String,
    pub vendor: String,
    pub vendor_sub: String,
    pub do_not_track: String,
    pub app_code_name: String,
    pub app_name: String,
    pub app_version: String,
    pub oscpu: String,
    pub extra_properties: ExtraProperties,
    pub webdriver: String,
}

/// WebGL renderer identification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoCard {
    pub renderer: String,
    pub vendor: String,
}

/// A complete browser fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fingerprint {
    pub screen: ScreenFingerprint,
    pub navigator: NavigatorFingerprint,
    pub video_codecs: HashMap<String, String>,
    pub audio_codecs: HashMap<String, String>,
    pub plugins_data: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<HashMap<String, String>>,
    pub video_card: VideoCard,
    pub multimedia_devices: Vec<String>,
    pub fonts: Vec<String>,
    #[serde(rename = "mockWebRTC")]
    pub mock_web_rtc: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub slim: bool,
}

/// Headers and the fingerprint they were generated alongside.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintWithHeaders {
    pub headers: Vec<(String, String)>,
    pub fingerprint: Fingerprint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_deserializes_camel_case() {
        let screen: ScreenFingerprint = serde_json::from_str(
            r#"{"width": 1920, "height": 1080, "devicePixelRatio": 2, "hasHDR": true}"#,
        )
        .unwrap();
        assert_eq!(screen.width, 1920.0);
        assert_eq!(screen.device_pixel_ratio, 2.0);
        assert!(screen.has_hdr);
        assert_eq!(screen.avail_top, 0.0);
    }

    #[test]
    fn test_slim_flag_omitted_when_false() {
        let fingerprint = Fingerprint::default();
        let json = serde_json::to_value(&fingerprint).unwrap();
        assert!(json.get("slim").is_none());
        assert_eq!(json["mockWebRTC"], serde_json::Value::Bool(false));
    }
}
