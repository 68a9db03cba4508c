//! Fingerprint generation.
//!
//! Pipeline flow:
//! screen window → closure over the fingerprint network → headers (hinted
//! by the closure's user agents) → consistent fingerprint sample → decode →
//! typed assembly.

use crate::bayes::{constraint_closure, Network};
use crate::dataset::{decode_value, STRINGIFIED_PREFIX};
use crate::models::{
    Fingerprint, FingerprintGeneratorOptions, FingerprintWithHeaders, MimesisError,
    NavigatorFingerprint, Result, ScreenFingerprint,
};
use crate::pipeline::HeaderGenerator;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// How many times an empty fingerprint body is retried before giving up.
/// Part of the public contract.
const MAX_GENERATION_ATTEMPTS: usize = 10;

/// Generates matched header sets and browser fingerprints.
pub struct FingerprintGenerator {
    header_generator: HeaderGenerator,
    fingerprint_network: Network,
    options: FingerprintGeneratorOptions,
}

impl FingerprintGenerator {
    /// Create a generator from the data files in `data_dir`.
    pub fn new(options: &FingerprintGeneratorOptions, data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let header_generator = HeaderGenerator::new(&options.headers, data_dir)?;
        let fingerprint_network =
            Network::from_archive(data_dir.join("fingerprint-network-definition.zip"))?;
        Ok(Self::from_parts(options, header_generator, fingerprint_network))
    }

    /// Like [`FingerprintGenerator::new`] but with a fixed seed.
    pub fn with_seed(
        options: &FingerprintGeneratorOptions,
        data_dir: impl AsRef<Path>,
        seed: u64,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let header_generator = HeaderGenerator::with_seed(&options.headers, data_dir, seed)?;
        let fingerprint_network =
            Network::from_archive(data_dir.join("fingerprint-network-definition.zip"))?;
        Ok(Self::from_parts(options, header_generator, fingerprint_network))
    }

    pub(crate) fn from_parts(
        options: &FingerprintGeneratorOptions,
        header_generator: HeaderGenerator,
        fingerprint_network: Network,
    ) -> Self {
        Self {
            header_generator,
            fingerprint_network,
            options: options.clone(),
        }
    }

    /// Generate a fingerprint with a matching header set.
    pub fn get_fingerprint(
        &mut self,
        overrides: Option<&FingerprintGeneratorOptions>,
        request_dependent_headers: &HashMap<String, String>,
    ) -> Result<FingerprintWithHeaders> {
        let screen = overrides
            .and_then(|options| options.screen.clone())
            .or_else(|| self.options.screen.clone());
        let mock_web_rtc = overrides
            .and_then(|options| options.mock_web_rtc)
            .or(self.options.mock_web_rtc)
            .unwrap_or(false);
        let slim = overrides
            .and_then(|options| options.slim)
            .or(self.options.slim)
            .unwrap_or(false);
        let strict = overrides
            .and_then(|options| options.headers.strict)
            .unwrap_or(self.header_generator.resolved_options().strict);
        let header_overrides = overrides.map(|options| &options.headers);

        let mut filtered_values: HashMap<String, Vec<String>> = HashMap::new();
        let mut partial_closure: Option<HashMap<String, Vec<String>>> = None;

        if let Some(window) = &screen {
            if let Some(screen_node) = self.fingerprint_network.node("screen") {
                let possible_screens: Vec<String> = screen_node
                    .possible_values
                    .iter()
                    .filter(|value| {
                        value
                            .strip_prefix(STRINGIFIED_PREFIX)
                            .and_then(|json| serde_json::from_str::<ScreenFingerprint>(json).ok())
                            .is_some_and(|screen| window.contains(screen.width, screen.height))
                    })
                    .cloned()
                    .collect();
                filtered_values.insert("screen".to_string(), possible_screens);
            }

            match constraint_closure(&self.fingerprint_network, &filtered_values) {
                Ok(closure) => partial_closure = Some(closure),
                Err(MimesisError::OverConstrained) if !strict => {
                    warn!("No fingerprint fits the screen constraints; dropping them");
                    filtered_values.remove("screen");
                }
                Err(error) => return Err(error),
            }
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let user_agent_hints: Vec<String> = partial_closure
                .as_ref()
                .and_then(|closure| closure.get("userAgent"))
                .cloned()
                .unwrap_or_default();

            let headers = match self.header_generator.get_headers(
                header_overrides,
                request_dependent_headers,
                &user_agent_hints,
            ) {
                Ok(headers) => headers,
                Err(_) => continue,
            };

            let user_agent = header_value(&headers, "user-agent").unwrap_or_default().to_string();
            filtered_values.insert("userAgent".to_string(), vec![user_agent]);

            let Some(sample) = self.fingerprint_network.generate_consistent_sample(
                &filtered_values,
                self.header_generator.rng_mut(),
            ) else {
                continue;
            };

            let mut raw: Map<String, Value> = sample
                .iter()
                .map(|(attribute, value)| (attribute.clone(), decode_value(value)))
                .collect();

            if raw.get("screen").map_or(true, Value::is_null) {
                continue;
            }

            // Splitting an empty value yields a single empty language
            // entry; it is kept as-is.
            let accept_language = header_value(&headers, "accept-language").unwrap_or_default();
            let languages: Vec<String> = accept_language
                .split(',')
                .map(|locale| {
                    locale
                        .split(';')
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                })
                .collect();
            raw.insert(
                "languages".to_string(),
                Value::Array(languages.into_iter().map(Value::String).collect()),
            );

            let mut fingerprint = assemble_fingerprint(&raw);
            fingerprint.mock_web_rtc = mock_web_rtc;
            fingerprint.slim = slim;

            return Ok(FingerprintWithHeaders {
                headers,
                fingerprint,
            });
        }

        Err(MimesisError::RetriesExhausted {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Deserialize one attribute, falling back to the default on a missing
/// value or a shape mismatch.
fn field<T>(raw: &Map<String, Value>, key: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    raw.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// A numeric attribute is read from its plain categorical string form
/// only. Stringified payloads decode to JSON numbers, which are not read;
/// those fields stay at their failure defaults.
fn numeric(raw: &Map<String, Value>, key: &str) -> Option<f64> {
    match raw.get(key) {
        Some(Value::String(text)) => text.parse().ok(),
        _ => None,
    }
}

/// Assemble the decoded sample into the typed fingerprint.
fn assemble_fingerprint(raw: &Map<String, Value>) -> Fingerprint {
    let languages: Vec<String> = field(raw, "languages");

    let navigator = NavigatorFingerprint {
        user_agent: field(raw, "userAgent"),
        user_agent_data: field(raw, "userAgentData"),
        language: languages.first().cloned().unwrap_or_default(),
        languages,
        platform: field(raw, "platform"),
        device_memory: numeric(raw, "deviceMemory"),
        hardware_concurrency: numeric(raw, "hardwareConcurrency").map(|v| v as i64).unwrap_or(0),
        max_touch_points: Some(numeric(raw, "maxTouchPoints").map(|v| v as i64).unwrap_or(0)),
        product: field(raw, "product"),
        product_sub: field(raw, "productSub"),
        vendor: field(raw, "vendor"),
        vendor_sub: field(raw, "vendorSub"),
        do_not_track: field(raw, "doNotTrack"),
        app_code_name: field(raw, "appCodeName"),
        app_name: field(raw, "appName"),
        app_version: field(raw, "appVersion"),
        oscpu: field(raw, "oscpu"),
        extra_properties: field(raw, "extraProperties"),
        webdriver: field(raw, "webdriver"),
    };

    Fingerprint {
        screen: field(raw, "screen"),
        navigator,
        video_codecs: field(raw, "videoCodecs"),
        audio_codecs: field(raw, "audioCodecs"),
        plugins_data: field(raw, "pluginsData"),
        battery: raw
            .get("battery")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok()),
        video_card: field(raw, "videoCard"),
        multimedia_devices: field(raw, "multimediaDevices"),
        fonts: field(raw, "fonts"),
        mock_web_rtc: false,
        slim: false,
    }
}
