//! Generator options.
//!
//! Every field on [`HeaderGeneratorOptions`] is optional so that the
//! relaxation ladder can tell apart "the caller asked for this" from "the
//! default applied". Options given at call time override the options the
//! generator was constructed with, field by field.

use serde::{Deserialize, Serialize};

/// Browsers the sampling networks carry data for.
pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];

/// Operating systems the sampling networks carry data for.
pub const SUPPORTED_OPERATING_SYSTEMS: &[&str] = &["windows", "macos", "linux", "android", "ios"];

/// Device classes the sampling networks carry data for.
pub const SUPPORTED_DEVICES: &[&str] = &["desktop", "mobile"];

/// HTTP versions the sampling networks carry data for.
pub const SUPPORTED_HTTP_VERSIONS: &[&str] = &["1", "2"];

/// A browser request: either a bare name or a full specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrowserOption {
    /// Bare browser name, e.g. `"chrome"`.
    Name(String),
    /// Name plus version window and HTTP version.
    Spec(BrowserSpecification),
}

impl BrowserOption {
    pub fn name(&self) -> &str {
        match self {
            BrowserOption::Name(name) => name,
            BrowserOption::Spec(spec) => &spec.name,
        }
    }
}

impl From<&str> for BrowserOption {
    fn from(name: &str) -> Self {
        BrowserOption::Name(name.to_string())
    }
}

/// Full browser specification with an optional major-version window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSpecification {
    /// Browser name, one of [`SUPPORTED_BROWSERS`].
    pub name: String,

    /// Minimum acceptable major version (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<u32>,

    /// Maximum acceptable major version (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<u32>,

    /// HTTP version this browser should be sampled for. `"0"` matches any
    /// version; unset inherits the option-level `http_version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,
}

/// Options steering header generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderGeneratorOptions {
    /// Browsers to sample from.
    pub browsers: Option<Vec<BrowserOption>>,

    /// Browserslist-style query; when set it takes precedence over
    /// `browsers`.
    pub browser_list_query: Option<String>,

    /// Operating systems to sample from.
    pub operating_systems: Option<Vec<String>>,

    /// Device classes to sample from.
    pub devices: Option<Vec<String>>,

    /// Locales for the generated `Accept-Language` header.
    pub locales: Option<Vec<String>>,

    /// `"1"` or `"2"`.
    pub http_version: Option<String>,

    /// Fail instead of relaxing constraints when no sample exists.
    pub strict: Option<bool>,
}

/// Fully-resolved options after merging call-site overrides over the
/// generator's construction-time options and the builtin defaults.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedHeaderOptions {
    pub browsers: Vec<BrowserOption>,
    pub browser_list_query: String,
    pub operating_systems: Vec<String>,
    pub devices: Vec<String>,
    pub locales: Vec<String>,
    pub http_version: String,
    pub strict: bool,
}

impl Default for ResolvedHeaderOptions {
    fn default() -> Self {
        Self {
            browsers: SUPPORTED_BROWSERS.iter().map(|b| (*b).into()).collect(),
            browser_list_query: String::new(),
            operating_systems: SUPPORTED_OPERATING_SYSTEMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            devices: vec!["desktop".to_string()],
            locales: vec!["en-US".to_string()],
            http_version: "2".to_string(),
            strict: false,
        }
    }
}

impl ResolvedHeaderOptions {
    /// Overlay `options` on top of `self`, field by field.
    pub fn merged(&self, options: &HeaderGeneratorOptions) -> Self {
        let mut merged = self.clone();
        if let Some(browsers) = &options.browsers {
            merged.browsers = browsers.clone();
        }
        if let Some(query) = &options.browser_list_query {
            merged.browser_list_query = query.clone();
        }
        if let Some(operating_systems) = &options.operating_systems {
            merged.operating_systems = operating_systems.clone();
        }
        if let Some(devices) = &options.devices {
            merged.devices = devices.clone();
        }
        if let Some(locales) = &options.locales {
            merged.locales = locales.clone();
        }
        if let Some(http_version) = &options.http_version {
            merged.http_version = http_version.clone();
        }
        if let Some(strict) = options.strict {
            merged.strict = strict;
        }
        merged
    }

    /// Re-express the resolved state as fully-explicit options, e.g. to
    /// re-invoke generation with one field changed. An empty browserslist
    /// query stays unset so the relaxation ladder never "clears" it.
    pub fn as_explicit(&self) -> HeaderGeneratorOptions {
        HeaderGeneratorOptions {
            browsers: Some(self.browsers.clone()),
            browser_list_query: (!self.browser_list_query.is_empty())
                .then(|| self.browser_list_query.clone()),
            operating_systems: Some(self.operating_systems.clone()),
            devices: Some(self.devices.clone()),
            locales: Some(self.locales.clone()),
            http_version: Some(self.http_version.clone()),
            strict: Some(self.strict),
        }
    }
}

/// Screen-size window for fingerprint generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreenOptions {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
}

impl ScreenOptions {
    /// Whether a screen of the given dimensions falls inside the window.
    pub fn contains(&self, width: f64, height: f64) -> bool {
        width >= self.min_width.unwrap_or(0.0)
            && width <= self.max_width.unwrap_or(1e5)
            && height >= self.min_height.unwrap_or(0.0)
            && height <= self.max_height.unwrap_or(1e5)
    }
}

/// Options steering fingerprint generation; header options ride along.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FingerprintGeneratorOptions {
    #[serde(flatten)]
    pub headers: HeaderGeneratorOptions,

    /// Restrict the sampled screen to this window.
    pub screen: Option<ScreenOptions>,

    /// Ask consumers to mock WebRTC.
    pub mock_web_rtc: Option<bool>,

    /// Emit a slim fingerprint (consumer hint, passed through).
    pub slim: Option<bool>,
}
