//! Header generation.
//!
//! Pipeline flow:
//! options → induced value constraints → consistent input sample →
//! ancestral header sample → post-processing (sec-fetch, accept-language,
//! sentinel stripping) → ordered header list.
//!
//! When no consistent input sample exists the generator relaxes the
//! caller's options one class at a time, in a fixed priority order, or
//! falls back from HTTP/1 to HTTP/2 with a header-case rewrite.

use crate::bayes::{constraint_closure, Network};
use crate::dataset::{
    classify, BROWSER_HTTP_NODE, BROWSER_NODE, DEVICE_NODE, MISSING_VALUE_TOKEN,
    OPERATING_SYSTEM_NODE,
};
use crate::models::{
    BrowserOption, BrowserSpecification, HeaderGeneratorOptions, MimesisError,
    ResolvedHeaderOptions, Result, SUPPORTED_BROWSERS,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const HTTP1_SEC_FETCH: &[(&str, &str)] = &[
    ("Sec-Fetch-Site", "same-site"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-User", "?1"),
    ("Sec-Fetch-Dest", "document"),
];

const HTTP2_SEC_FETCH: &[(&str, &str)] = &[
    ("sec-fetch-site", "same-site"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-user", "?1"),
    ("sec-fetch-dest", "document"),
];

/// Option classes in the order they are dropped when no consistent sample
/// exists. Only classes the caller explicitly set are ever cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelaxationClass {
    Locales,
    Devices,
    OperatingSystems,
    Browsers,
    BrowserListQuery,
}

const RELAXATION_ORDER: &[RelaxationClass] = &[
    RelaxationClass::Locales,
    RelaxationClass::Devices,
    RelaxationClass::OperatingSystems,
    RelaxationClass::Browsers,
    RelaxationClass::BrowserListQuery,
];

impl RelaxationClass {
    fn is_set(self, options: &HeaderGeneratorOptions) -> bool {
        match self {
            RelaxationClass::Locales => options.locales.is_some(),
            RelaxationClass::Devices => options.devices.is_some(),
            RelaxationClass::OperatingSystems => options.operating_systems.is_some(),
            RelaxationClass::Browsers => options.browsers.is_some(),
            RelaxationClass::BrowserListQuery => options
                .browser_list_query
                .as_deref()
                .is_some_and(|query| !query.is_empty()),
        }
    }

    fn clear(self, options: &mut HeaderGeneratorOptions) {
        match self {
            RelaxationClass::Locales => options.locales = None,
            RelaxationClass::Devices => options.devices = None,
            RelaxationClass::OperatingSystems => options.operating_systems = None,
            RelaxationClass::Browsers => options.browsers = None,
            RelaxationClass::BrowserListQuery => options.browser_list_query = None,
        }
    }
}

/// One entry of the browser catalog, parsed from
/// `"<name>/<version>|<httpVersion>"`.
#[derive(Debug, Clone)]
pub(crate) struct HttpBrowser {
    pub name: String,
    pub version: Vec<u32>,
    pub complete_string: String,
    pub http_version: String,
}

impl HttpBrowser {
    pub fn parse(complete: &str) -> Self {
        let (browser_part, http_version) = complete.split_once('|').unwrap_or((complete, ""));
        let (name, version) = if browser_part == MISSING_VALUE_TOKEN {
            (browser_part.to_string(), Vec::new())
        } else {
            let (name, version_part) = browser_part.split_once('/').unwrap_or((browser_part, ""));
            let version = version_part
                .split('.')
                .map(|part| part.parse().unwrap_or(0))
                .collect();
            (name.to_string(), version)
        };
        Self {
            name,
            version,
            complete_string: complete.to_string(),
            http_version: http_version.to_string(),
        }
    }

    pub fn major_version(&self) -> u32 {
        self.version.first().copied().unwrap_or(0)
    }
}

/// Generates realistic, internally consistent HTTP header sets.
pub struct HeaderGenerator {
    options: ResolvedHeaderOptions,
    input_network: Network,
    header_network: Network,
    unique_browsers: Vec<HttpBrowser>,
    headers_order: HashMap<String, Vec<String>>,
    rng: StdRng,
}

impl HeaderGenerator {
    /// Create a generator from the data files in `data_dir`.
    ///
    /// The two network archives are required; the headers-order and
    /// browser-helper files degrade to empty with a warning.
    pub fn new(options: &HeaderGeneratorOptions, data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_rng(options, data_dir, StdRng::from_entropy())
    }

    /// Like [`HeaderGenerator::new`] but with a fixed seed, for
    /// reproducible output.
    pub fn with_seed(
        options: &HeaderGeneratorOptions,
        data_dir: impl AsRef<Path>,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(options, data_dir, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        options: &HeaderGeneratorOptions,
        data_dir: impl AsRef<Path>,
        rng: StdRng,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();

        let headers_order = match std::fs::read_to_string(data_dir.join("headers-order.json")) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| MimesisError::MalformedDataset(format!("headers-order.json: {e}")))?,
            Err(error) => {
                warn!(%error, "No headers-order file; emitting headers unordered");
                HashMap::new()
            }
        };

        let unique_browsers =
            match std::fs::read_to_string(data_dir.join("browser-helper-file.json")) {
                Ok(text) => {
                    let strings: Vec<String> = serde_json::from_str(&text).map_err(|e| {
                        MimesisError::MalformedDataset(format!("browser-helper-file.json: {e}"))
                    })?;
                    strings
                        .iter()
                        .filter(|value| value.as_str() != MISSING_VALUE_TOKEN)
                        .map(|value| HttpBrowser::parse(value))
                        .collect()
                }
                Err(error) => {
                    warn!(%error, "No browser-helper file; browser catalog is empty");
                    Vec::new()
                }
            };

        let input_network = Network::from_archive(data_dir.join("input-network-definition.zip"))?;
        let header_network = Network::from_archive(data_dir.join("header-network-definition.zip"))?;

        Ok(Self::from_parts(
            options,
            input_network,
            header_network,
            unique_browsers,
            headers_order,
            rng,
        ))
    }

    /// Assemble a generator from already-loaded pieces.
    pub(crate) fn from_parts(
        options: &HeaderGeneratorOptions,
        input_network: Network,
        header_network: Network,
        unique_browsers: Vec<HttpBrowser>,
        headers_order: HashMap<String, Vec<String>>,
        rng: StdRng,
    ) -> Self {
        Self {
            options: ResolvedHeaderOptions::default().merged(options),
            input_network,
            header_network,
            unique_browsers,
            headers_order,
            rng,
        }
    }

    pub(crate) fn resolved_options(&self) -> &ResolvedHeaderOptions {
        &self.options
    }

    /// The generator's RNG; fingerprint sampling shares the stream so one
    /// seed reproduces the whole composite output.
    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generate one ordered header set.
    ///
    /// `overrides` are merged over the construction-time options;
    /// `request_dependent_headers` are merged into the result last and
    /// always win; `user_agent_hints` restricts the sampled user agent to
    /// the given values.
    pub fn get_headers(
        &mut self,
        overrides: Option<&HeaderGeneratorOptions>,
        request_dependent_headers: &HashMap<String, String>,
        user_agent_hints: &[String],
    ) -> Result<Vec<(String, String)>> {
        let merged = match overrides {
            Some(options) => self.options.merged(options),
            None => self.options.clone(),
        };

        let possible_attribute_values = self.possible_attribute_values(&merged);

        let (http1_closure, http2_closure) = if user_agent_hints.is_empty() {
            (None, None)
        } else {
            let hints: Vec<String> = user_agent_hints.to_vec();
            let http1 = constraint_closure(
                &self.header_network,
                &HashMap::from([("User-Agent".to_string(), hints.clone())]),
            )?;
            let http2 = constraint_closure(
                &self.header_network,
                &HashMap::from([("user-agent".to_string(), hints)]),
            )?;
            (Some(http1), Some(http2))
        };

        let mut input_constraints: HashMap<String, Vec<String>> = HashMap::new();
        for (key, values) in possible_attribute_values {
            if key == BROWSER_HTTP_NODE {
                let filtered = values
                    .into_iter()
                    .filter(|value| {
                        let (browser, http_tag) =
                            value.split_once('|').unwrap_or((value.as_str(), ""));
                        // HTTP/1 traffic is matched against the pascal-case
                        // closure, as is everything when the lowercase
                        // closure came back without information.
                        let closure = if http_tag == "1"
                            || http2_closure.as_ref().is_some_and(HashMap::is_empty)
                        {
                            &http1_closure
                        } else {
                            &http2_closure
                        };
                        match closure {
                            None => true,
                            Some(closure) => closure
                                .get(BROWSER_NODE)
                                .is_some_and(|list| list.iter().any(|b| b == browser)),
                        }
                    })
                    .collect();
                input_constraints.insert(key, filtered);
            } else {
                let filtered = values
                    .into_iter()
                    .filter(|value| {
                        if http1_closure.is_none() && http2_closure.is_none() {
                            return true;
                        }
                        let in_closure = |closure: &Option<HashMap<String, Vec<String>>>| {
                            closure.as_ref().is_some_and(|closure| {
                                closure.get(&key).is_some_and(|list| list.contains(value))
                            })
                        };
                        in_closure(&http1_closure) || in_closure(&http2_closure)
                    })
                    .collect();
                input_constraints.insert(key, filtered);
            }
        }

        // An empty candidate list (browser absent from the catalog, or every
        // candidate rejected by the hints) is unsatisfiable, not
        // unconstrained.
        let browser_candidates_empty = input_constraints
            .get(BROWSER_HTTP_NODE)
            .is_some_and(Vec::is_empty);

        let input_sample = if browser_candidates_empty {
            None
        } else {
            self.input_network
                .generate_consistent_sample(&input_constraints, &mut self.rng)
        };

        let Some(input_sample) = input_sample else {
            return self.relax(
                &merged,
                overrides,
                request_dependent_headers,
                user_agent_hints,
            );
        };

        let mut generated = self
            .header_network
            .generate_sample(&input_sample, &mut self.rng);

        let generated_browser = HttpBrowser::parse(
            generated
                .get(BROWSER_HTTP_NODE)
                .map(String::as_str)
                .unwrap_or(MISSING_VALUE_TOKEN),
        );
        let is_http2 = generated_browser.http_version == "2";

        let accept_language_name = if is_http2 {
            "accept-language"
        } else {
            "Accept-Language"
        };
        generated.insert(
            accept_language_name.to_string(),
            accept_language_value(&merged.locales, &mut self.rng),
        );

        let major = generated_browser.major_version();
        let has_sec_fetch = match generated_browser.name.as_str() {
            "chrome" => major >= 76,
            "firefox" => major >= 90,
            "edge" => major >= 79,
            _ => false,
        };
        if has_sec_fetch {
            let sec_fetch = if is_http2 {
                HTTP2_SEC_FETCH
            } else {
                HTTP1_SEC_FETCH
            };
            for (name, value) in sec_fetch {
                generated.insert((*name).to_string(), (*value).to_string());
            }
        }

        generated.retain(|name, value| {
            !(name.eq_ignore_ascii_case("connection") && value == "close")
                && !name.starts_with('*')
                && value != MISSING_VALUE_TOKEN
        });

        for (name, value) in request_dependent_headers {
            generated.insert(name.clone(), value.clone());
        }

        let order = self.headers_order.get(&generated_browser.name).cloned();
        Ok(self.order_headers(&generated, order.as_deref()))
    }

    /// Recovery for an empty input sample: retry HTTP/1 requests as HTTP/2
    /// with a header-case rewrite, otherwise drop the first explicitly-set
    /// option class in relaxation order and try again.
    fn relax(
        &mut self,
        merged: &ResolvedHeaderOptions,
        overrides: Option<&HeaderGeneratorOptions>,
        request_dependent_headers: &HashMap<String, String>,
        user_agent_hints: &[String],
    ) -> Result<Vec<(String, String)>> {
        if merged.http_version == "1" {
            debug!("No HTTP/1 sample exists; retrying as HTTP/2 with renamed headers");
            let mut retry_options = merged.as_explicit();
            retry_options.http_version = Some("2".to_string());
            let headers =
                self.get_headers(Some(&retry_options), request_dependent_headers, user_agent_hints)?;
            let converted: HashMap<String, String> = headers
                .into_iter()
                .map(|(name, value)| (http1_header_name(&name), value))
                .collect();
            return Ok(self.order_headers(&converted, None));
        }

        let target = overrides.and_then(|options| {
            RELAXATION_ORDER
                .iter()
                .copied()
                .find(|class| class.is_set(options))
        });

        if merged.strict {
            return Err(MimesisError::OverConstrained);
        }
        let Some(class) = target else {
            return Err(MimesisError::OverConstrained);
        };

        debug!(?class, "No consistent sample; relaxing option class");
        let mut relaxed = overrides.cloned().unwrap_or_default();
        class.clear(&mut relaxed);
        self.get_headers(Some(&relaxed), request_dependent_headers, user_agent_hints)
    }

    /// Candidate values for the selector network's synthetic nodes.
    fn possible_attribute_values(
        &self,
        options: &ResolvedHeaderOptions,
    ) -> HashMap<String, Vec<String>> {
        let browsers = prepare_browsers_config(options);
        let mut possible = HashMap::new();
        possible.insert(
            BROWSER_HTTP_NODE.to_string(),
            self.browser_http_options(&browsers),
        );
        possible.insert(
            OPERATING_SYSTEM_NODE.to_string(),
            options.operating_systems.clone(),
        );
        if !options.devices.is_empty() {
            possible.insert(DEVICE_NODE.to_string(), options.devices.clone());
        }
        possible
    }

    /// Catalog entries matching the requested browsers, their version
    /// windows, and their HTTP version tags.
    fn browser_http_options(&self, browsers: &[BrowserSpecification]) -> Vec<String> {
        let mut options = Vec::new();
        for spec in browsers {
            for candidate in &self.unique_browsers {
                if spec.name != candidate.name {
                    continue;
                }
                let major = candidate.major_version();
                let min_ok = spec.min_version.map_or(true, |min| min <= major);
                let max_ok = spec.max_version.map_or(true, |max| max >= major);
                // "0" is the documented "any version" sentinel.
                let http_ok = match spec.http_version.as_deref() {
                    None | Some("") | Some("0") => true,
                    Some(version) => version == candidate.http_version,
                };
                if min_ok && max_ok && http_ok {
                    options.push(candidate.complete_string.clone());
                }
            }
        }
        options
    }

    /// Emit headers in the browser's preferred order, remaining ones after
    /// it in a stable order. With no order list, infer the browser from the
    /// generated user-agent.
    fn order_headers(
        &self,
        headers: &HashMap<String, String>,
        order: Option<&[String]>,
    ) -> Vec<(String, String)> {
        let inferred;
        let order: &[String] = match order {
            Some(order) if !order.is_empty() => order,
            _ => {
                inferred = self.order_from_user_agent(headers);
                inferred.as_deref().unwrap_or(&[])
            }
        };

        let mut ordered: Vec<(String, String)> = Vec::with_capacity(headers.len());
        for name in order {
            if let Some(value) = headers.get(name) {
                ordered.push((name.clone(), value.clone()));
            }
        }

        let mut remaining: Vec<(&String, &String)> = headers
            .iter()
            .filter(|(name, _)| !order.contains(name))
            .collect();
        remaining.sort_by(|(a, _), (b, _)| a.cmp(b));
        ordered.extend(
            remaining
                .into_iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        ordered
    }

    fn order_from_user_agent(&self, headers: &HashMap<String, String>) -> Option<Vec<String>> {
        let user_agent = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.as_str())?;
        let browser = classify(user_agent).browser;
        self.headers_order.get(&browser).cloned()
    }
}

/// Resolve the browser option list: a browserslist-style query takes
/// precedence, and bare names inherit the option-level HTTP version.
fn prepare_browsers_config(options: &ResolvedHeaderOptions) -> Vec<BrowserSpecification> {
    let source: Vec<BrowserOption> = if options.browser_list_query.is_empty() {
        options.browsers.clone()
    } else {
        browsers_from_query(&options.browser_list_query)
    };

    source
        .into_iter()
        .map(|browser| match browser {
            BrowserOption::Name(name) => BrowserSpecification {
                name,
                min_version: None,
                max_version: None,
                http_version: Some(options.http_version.clone()),
            },
            BrowserOption::Spec(mut spec) => {
                if spec.http_version.is_none() {
                    spec.http_version = Some(options.http_version.clone());
                }
                spec
            }
        })
        .collect()
}

/// Resolve a browserslist-style query to browser options. The full query
/// grammar is an external concern; any query currently resolves to the
/// supported browser set.
pub fn browsers_from_query(_query: &str) -> Vec<BrowserOption> {
    SUPPORTED_BROWSERS.iter().map(|b| (*b).into()).collect()
}

/// Synthesize an `Accept-Language` value: bare language tags group their
/// regional variants, groups are shuffled, and every entry after the first
/// gets a quality decreasing in steps of 0.1.
fn accept_language_value(locales: &[String], rng: &mut StdRng) -> String {
    let mut high_level: Vec<String> = locales
        .iter()
        .filter(|locale| !locale.contains('-'))
        .cloned()
        .collect();
    for locale in locales {
        if !high_level.contains(locale)
            && !high_level.iter().any(|high| locale.contains(high.as_str()))
        {
            high_level.push(locale.clone());
        }
    }

    let mut shuffled: Vec<String> = locales.to_vec();
    shuffled.shuffle(rng);
    high_level.shuffle(rng);

    let mut in_adding_order: Vec<&str> = Vec::new();
    for high in &high_level {
        for locale in &shuffled {
            if locale.contains(high.as_str()) && !high_level.contains(locale) {
                in_adding_order.push(locale);
            }
        }
        in_adding_order.push(high);
    }

    let Some((first, rest)) = in_adding_order.split_first() else {
        return String::new();
    };
    let mut value = (*first).to_string();
    for (index, locale) in rest.iter().enumerate() {
        let quality = 1.0 - ((index + 1) as f64) * 0.1;
        value.push_str(&format!(",{locale};q={quality:.1}"));
    }
    value
}

/// Convert an HTTP/2 header name to its HTTP/1 form. Client-hint names stay
/// lowercase and the short acronym headers go fully uppercase.
fn http1_header_name(name: &str) -> String {
    if name.starts_with("sec-ch-ua") {
        return name.to_string();
    }
    if matches!(name, "dnt" | "rtt" | "ect") {
        return name.to_uppercase();
    }
    pascalize(name)
}

fn pascalize(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
