//! Dataset preparation.
//!
//! Pipeline flow:
//! raw records → validate → deconstruct → flatten to attribute union →
//! restrict to the network structure → derive synthetic nodes → emit the
//! browser catalog.

use crate::bayes::Network;
use crate::dataset::{
    browser_name_version, dataset_device_os, RecordValidator, BROWSER_HTTP_NODE, BROWSER_NODE,
    DEVICE_NODE, HTTP_VERSION_NODE, MISSING_VALUE_TOKEN, NON_GENERATED_NODES,
    OPERATING_SYSTEM_NODE, STRINGIFIED_PREFIX,
};
use crate::models::{MimesisError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Attributes collapsed into the `pluginsData` sub-record.
const PLUGIN_CHARACTERISTICS: &[&str] = &["plugins", "mimeTypes"];

/// Outcome of a preparation run.
#[derive(Debug)]
pub struct DatasetPreparation {
    pub total_records: usize,
    pub valid_records: usize,
    pub prepared_records: Vec<Map<String, Value>>,
    /// Distinct `*BROWSER_HTTP` values (headers mode only).
    pub unique_browser_http: Vec<String>,
}

/// Prepare header-generator data files from a raw capture dataset.
///
/// Writes `browser-helper-file.json` (the distinct `*BROWSER_HTTP`
/// alphabet) into `results_dir`.
pub fn prepare_header_files(
    dataset_path: &Path,
    structures_dir: &Path,
    results_dir: &Path,
    validator: &RecordValidator,
) -> Result<DatasetPreparation> {
    let records = load_records(dataset_path)?;
    let total_records = records.len();
    let cleaned = validate_records(records, validator);
    let valid_records = cleaned.len();

    let mut deconstructed: Vec<Map<String, Value>> = Vec::new();
    for record in &cleaned {
        let Some(request) = record.get("requestFingerprint").and_then(Value::as_object) else {
            continue;
        };
        let http_version = request
            .get("httpVersion")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(headers) = request.get("headers").and_then(Value::as_object) else {
            continue;
        };
        let mut headers = headers.clone();
        headers.insert(
            HTTP_VERSION_NODE.to_string(),
            Value::String(format!("_{http_version}_")),
        );
        deconstructed.push(headers);
    }

    let flattened = flatten_to_union(deconstructed);

    let structure = Network::from_archive(structures_dir.join("header-network-structure.zip"))?;
    let desired: BTreeSet<&str> = structure
        .nodes()
        .iter()
        .map(|node| node.name.as_str())
        .filter(|name| !NON_GENERATED_NODES.contains(name))
        .collect();

    let mut prepared_records: Vec<Map<String, Value>> = Vec::new();
    for record in flattened {
        let mut selected: Map<String, Value> = record
            .iter()
            .filter(|(key, _)| desired.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let user_agent = ["user-agent", "User-Agent"]
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_str))
            .filter(|ua| *ua != MISSING_VALUE_TOKEN)
            .unwrap_or_default()
            .to_string();

        let browser = browser_name_version(&user_agent);
        let (device, operating_system) = dataset_device_os(&user_agent);

        let http_major = match selected.get(HTTP_VERSION_NODE).and_then(Value::as_str) {
            Some(version) if version.starts_with("_1") => "1",
            _ => "2",
        };

        selected.insert(
            BROWSER_HTTP_NODE.to_string(),
            Value::String(format!("{browser}|{http_major}")),
        );
        selected.insert(BROWSER_NODE.to_string(), Value::String(browser));
        selected.insert(
            OPERATING_SYSTEM_NODE.to_string(),
            Value::String(operating_system),
        );
        selected.insert(DEVICE_NODE.to_string(), Value::String(device));
        prepared_records.push(selected);
    }

    let unique_browser_http: Vec<String> = prepared_records
        .iter()
        .filter_map(|record| record.get(BROWSER_HTTP_NODE).and_then(Value::as_str))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let helper_path = results_dir.join("browser-helper-file.json");
    let helper_json = serde_json::to_string(&unique_browser_http)
        .map_err(|e| MimesisError::MalformedDataset(e.to_string()))?;
    std::fs::write(&helper_path, helper_json)
        .map_err(|e| MimesisError::io("writing browser helper file", e))?;

    info!(
        valid = valid_records,
        total = total_records,
        browsers = unique_browser_http.len(),
        "Prepared header dataset"
    );

    Ok(DatasetPreparation {
        total_records,
        valid_records,
        prepared_records,
        unique_browser_http,
    })
}

/// Prepare fingerprint records: collapse plugin data, stringify non-scalar
/// values, and restrict to the fingerprint network structure.
pub fn prepare_fingerprint_files(
    dataset_path: &Path,
    structures_dir: &Path,
    validator: &RecordValidator,
) -> Result<DatasetPreparation> {
    let records = load_records(dataset_path)?;
    let total_records = records.len();
    let cleaned = validate_records(records, validator);
    let valid_records = cleaned.len();

    let deconstructed: Vec<Map<String, Value>> = cleaned
        .iter()
        .filter_map(|record| record.get("browserFingerprint").and_then(Value::as_object))
        .cloned()
        .collect();

    let flattened = flatten_to_union(deconstructed);

    let bar = ProgressBar::new(flattened.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut encoded_records: Vec<Map<String, Value>> = Vec::new();
    for mut record in flattened {
        let mut plugin_characteristics: Map<String, Value> = Map::new();
        for attribute in PLUGIN_CHARACTERISTICS {
            let Some(value) = record.remove(*attribute) else {
                continue;
            };
            match value {
                Value::String(text)
                    if !text.is_empty() && text != MISSING_VALUE_TOKEN =>
                {
                    plugin_characteristics.insert((*attribute).to_string(), Value::String(text));
                }
                Value::Array(items) if !items.is_empty() => {
                    let encoded = serde_json::to_string(&items)
                        .map_err(|e| MimesisError::MalformedDataset(e.to_string()))?;
                    plugin_characteristics.insert((*attribute).to_string(), Value::String(encoded));
                }
                _ => {}
            }
        }
        if plugin_characteristics.is_empty() {
            record.insert(
                "pluginsData".to_string(),
                Value::String(MISSING_VALUE_TOKEN.to_string()),
            );
        } else {
            record.insert(
                "pluginsData".to_string(),
                Value::Object(plugin_characteristics),
            );
        }

        let mut encoded: Map<String, Value> = Map::new();
        for (attribute, value) in record {
            encoded.insert(attribute, encode_value(value)?);
        }
        encoded_records.push(encoded);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let structure =
        Network::from_archive(structures_dir.join("fingerprint-network-structure.zip"))?;
    let desired: BTreeSet<&str> = structure
        .nodes()
        .iter()
        .map(|node| node.name.as_str())
        .collect();

    let prepared_records: Vec<Map<String, Value>> = encoded_records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .filter(|(key, _)| desired.contains(key.as_str()))
                .collect()
        })
        .collect();

    info!(
        valid = valid_records,
        total = total_records,
        "Prepared fingerprint dataset"
    );

    Ok(DatasetPreparation {
        total_records,
        valid_records,
        prepared_records,
        unique_browser_http: Vec::new(),
    })
}

/// Pack one attribute value into the categorical alphabet: nulls and empty
/// strings become the missing-value sentinel, strings pass through, and
/// anything else is JSON-encoded behind the stringified prefix.
fn encode_value(value: Value) -> Result<Value> {
    let encoded = match value {
        Value::Null => MISSING_VALUE_TOKEN.to_string(),
        Value::String(text) if text.is_empty() => MISSING_VALUE_TOKEN.to_string(),
        Value::String(text) => text,
        other => {
            let json = serde_json::to_string(&other)
                .map_err(|e| MimesisError::MalformedDataset(e.to_string()))?;
            format!("{STRINGIFIED_PREFIX}{json}")
        }
    };
    Ok(Value::String(encoded))
}

/// Decode one categorical value back into JSON: the missing-value sentinel
/// becomes null, stringified payloads are parsed, everything else stays a
/// plain string.
pub fn decode_value(value: &str) -> Value {
    if value == MISSING_VALUE_TOKEN {
        return Value::Null;
    }
    if let Some(payload) = value.strip_prefix(STRINGIFIED_PREFIX) {
        if let Ok(decoded) = serde_json::from_str(payload) {
            return decoded;
        }
        return Value::String(value.to_string());
    }
    Value::String(value.to_string())
}

fn load_records(path: &Path) -> Result<Vec<Value>> {
    let text =
        std::fs::read_to_string(path).map_err(|e| MimesisError::io("reading dataset", e))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    serde_json::from_str(text).map_err(|e| MimesisError::MalformedDataset(e.to_string()))
}

fn validate_records(records: Vec<Value>, validator: &RecordValidator) -> Vec<Value> {
    let total = records.len();
    let cleaned: Vec<Value> = records
        .into_iter()
        .filter(|record| validator.validate(record))
        .collect();
    info!(valid = cleaned.len(), total, "Validated records");
    cleaned
}

/// Flatten records onto the union of all attribute names, filling gaps with
/// the missing-value sentinel.
fn flatten_to_union(records: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    let attributes: BTreeSet<String> = records
        .iter()
        .flat_map(|record| record.keys().cloned())
        .collect();

    records
        .into_iter()
        .map(|record| {
            attributes
                .iter()
                .map(|attribute| {
                    let value = match record.get(attribute) {
                        None | Some(Value::Null) => {
                            Value::String(MISSING_VALUE_TOKEN.to_string())
                        }
                        Some(value) => value.clone(),
                    };
                    (attribute.clone(), value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

    fn write_structure(dir: &Path, file_name: &str, node_names: &[&str]) {
        let nodes: Vec<Value> = node_names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "parentNames": [],
                    "possibleValues": [],
                    "conditionalProbabilities": {}
                })
            })
            .collect();
        let file = std::fs::File::create(dir.join(file_name)).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("structure.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(serde_json::to_string(&json!({ "nodes": nodes })).unwrap().as_bytes())
            .unwrap();
        writer.finish().unwrap();
    }

    fn header_record(ua: &str, http_version: &str, product_sub: &str) -> Value {
        json!({
            "requestFingerprint": {
                "httpVersion": http_version,
                "headers": {
                    "user-agent": ua,
                    "accept-language": "en-US"
                }
            },
            "browserFingerprint": {
                "userAgent": ua,
                "productSub": product_sub,
                "screen": {"width": 1920.0, "height": 1080.0}
            }
        })
    }

    #[test]
    fn test_prepare_header_files_derives_synthetic_nodes() {
        let dir = tempfile::tempdir().unwrap();
        write_structure(
            dir.path(),
            "header-network-structure.zip",
            &[
                "*BROWSER_HTTP",
                "*OPERATING_SYSTEM",
                "*DEVICE",
                "*HTTP_VERSION",
                "user-agent",
                "accept-language",
            ],
        );

        let dataset = json!([
            header_record(CHROME_WIN, "2.0", "20030107"),
            header_record(FIREFOX_LINUX, "1.1", "20100101"),
        ]);
        let dataset_path = dir.path().join("dataset.json");
        std::fs::write(&dataset_path, dataset.to_string()).unwrap();

        let validator = RecordValidator::new(Vec::new());
        let prepared =
            prepare_header_files(&dataset_path, dir.path(), dir.path(), &validator).unwrap();

        assert_eq!(prepared.total_records, 2);
        assert_eq!(prepared.valid_records, 2);
        assert_eq!(prepared.prepared_records.len(), 2);

        let chrome = &prepared.prepared_records[0];
        assert_eq!(chrome["*BROWSER_HTTP"], "chrome/120.0.0.0|2");
        assert_eq!(chrome["*OPERATING_SYSTEM"], "windows");
        assert_eq!(chrome["*DEVICE"], "desktop");

        let firefox = &prepared.prepared_records[1];
        assert_eq!(firefox["*BROWSER_HTTP"], "firefox/115.0|1");
        assert_eq!(firefox["*OPERATING_SYSTEM"], "linux");

        // The helper file carries exactly the alphabet of the records.
        let helper: Vec<String> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("browser-helper-file.json")).unwrap(),
        )
        .unwrap();
        let mut expected = vec![
            "chrome/120.0.0.0|2".to_string(),
            "firefox/115.0|1".to_string(),
        ];
        expected.sort();
        assert_eq!(helper, expected);
    }

    #[test]
    fn test_flatten_fills_missing_with_sentinel() {
        let records = vec![
            serde_json::from_value(json!({"a": "1"})).unwrap(),
            serde_json::from_value(json!({"b": "2"})).unwrap(),
        ];
        let flattened = flatten_to_union(records);
        assert_eq!(flattened[0]["b"], MISSING_VALUE_TOKEN);
        assert_eq!(flattened[1]["a"], MISSING_VALUE_TOKEN);
    }

    #[test]
    fn test_prepare_fingerprint_files_stringifies_and_collapses() {
        let dir = tempfile::tempdir().unwrap();
        write_structure(
            dir.path(),
            "fingerprint-network-structure.zip",
            &["userAgent", "screen", "pluginsData", "productSub"],
        );

        let record = json!({
            "requestFingerprint": {
                "httpVersion": "2.0",
                "headers": {"user-agent": CHROME_WIN}
            },
            "browserFingerprint": {
                "userAgent": CHROME_WIN,
                "productSub": "20030107",
                "screen": {"width": 1920.0, "height": 1080.0},
                "plugins": [{"name": "PDF Viewer"}],
                "mimeTypes": []
            }
        });
        let dataset_path = dir.path().join("dataset.json");
        std::fs::write(&dataset_path, json!([record]).to_string()).unwrap();

        let validator = RecordValidator::new(Vec::new());
        let prepared =
            prepare_fingerprint_files(&dataset_path, dir.path(), &validator).unwrap();
        assert_eq!(prepared.prepared_records.len(), 1);
        let record = &prepared.prepared_records[0];

        let screen = record["screen"].as_str().unwrap();
        assert!(screen.starts_with(STRINGIFIED_PREFIX));
        assert_eq!(decode_value(screen)["width"], 1920.0);

        let plugins_data = record["pluginsData"].as_str().unwrap();
        let decoded = decode_value(plugins_data);
        assert!(decoded["plugins"].as_str().unwrap().contains("PDF Viewer"));
        assert!(decoded.get("mimeTypes").is_none());

        assert_eq!(record["userAgent"], CHROME_WIN);
        assert_eq!(record["productSub"], "20030107");
    }

    #[test]
    fn test_bom_tolerated_and_bad_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");

        std::fs::write(&path, "\u{feff}[]").unwrap();
        assert!(load_records(&path).unwrap().is_empty());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_records(&path).unwrap_err(),
            MimesisError::MalformedDataset(_)
        ));
    }

    #[test]
    fn test_stringified_round_trip() {
        let original = json!({"nested": [1, 2, {"x": true}]});
        let encoded = encode_value(original.clone()).unwrap();
        let decoded = decode_value(encoded.as_str().unwrap());
        assert_eq!(decoded, original);
    }
}
