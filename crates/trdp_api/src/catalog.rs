//! Scenario and device catalog.
//!
//! The catalog is a flat directory: `*.yaml` files hold scenarios and `*.xml`
//! files hold device profiles.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::config::DEFAULT_CATALOG_DIR;

/// Summary of a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    #[serde(rename = "id")]
    pub identifier: String,
    pub device: String,
    pub path: PathBuf,
    pub events: usize,
}

/// Summary of a device profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of validating scenario content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Discovers and validates catalog assets.
#[derive(Debug, Clone)]
pub struct CatalogService {
    base: PathBuf,
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_DIR)
    }
}

impl CatalogService {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// List valid scenarios, sorted by file name.
    ///
    /// Unreadable or invalid files are skipped.
    pub fn list_scenarios(&self) -> Vec<ScenarioSummary> {
        let mut items = Vec::new();

        for path in self.files_with_extension("yaml") {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable scenario {:?}: {}", path, e);
                    continue;
                }
            };

            let report = self.validate_scenario(&content);
            if !report.valid {
                debug!("Skipping invalid scenario {:?}: {:?}", path, report.errors);
                continue;
            }

            if let Some((identifier, device, events)) = scenario_metadata(&content) {
                items.push(ScenarioSummary {
                    identifier,
                    device,
                    path,
                    events,
                });
            }
        }

        items
    }

    /// List device profiles, sorted by file name.
    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.files_with_extension("xml")
            .into_iter()
            .map(|path| DeviceSummary {
                name: device_name(&path),
                path,
            })
            .collect()
    }

    /// Validate a scenario definition.
    pub fn validate_scenario(&self, content: &str) -> ValidationReport {
        if content.trim().is_empty() {
            return ValidationReport::from_errors(vec!["Scenario content is empty".to_string()]);
        }

        let document: Value = match serde_yaml::from_str(content) {
            Ok(document) => document,
            Err(e) => {
                return ValidationReport::from_errors(vec![format!(
                    "Scenario is not valid YAML: {}",
                    e
                )])
            }
        };

        let mut errors = Vec::new();
        let events = document
            .get("events")
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for event in events {
            validate_event(event, &mut errors);
        }

        if text_field(&document, "scenario").is_none() {
            errors.push("scenario field is required".to_string());
        }
        if text_field(&document, "device").is_none() {
            errors.push("device field is required".to_string());
        }
        if events.is_empty() {
            errors.push("At least one event must be defined".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    fn files_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        let pattern = self.base.join(format!("*.{}", extension));
        let Some(pattern) = pattern.to_str() else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = match glob::glob(pattern) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                debug!("Invalid catalog pattern {}: {}", pattern, e);
                Vec::new()
            }
        };
        paths.sort();
        paths
    }
}

fn validate_event(event: &Value, errors: &mut Vec<String>) {
    let Some(fields) = event.as_mapping() else {
        errors.push("Event missing required fields: label, type".to_string());
        return;
    };

    let missing: Vec<&str> = ["label", "type"]
        .into_iter()
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "Event missing required fields: {}",
            missing.join(", ")
        ));
    }

    for key in ["com_id", "dataset_id"] {
        if let Some(value) = fields.get(key) {
            if !is_numeric(value) {
                errors.push(format!("Event field {} must be numeric", key));
            }
        }
    }
}

/// Non-negative integers, written either as YAML numbers or digit strings.
/// An empty value is left to other checks.
fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_u64().is_some(),
        Value::String(s) => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn text_field(document: &Value, key: &str) -> Option<String> {
    let text = match document.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn scenario_metadata(content: &str) -> Option<(String, String, usize)> {
    let document: Value = serde_yaml::from_str(content).ok()?;
    let identifier = text_field(&document, "scenario")?;
    let device = text_field(&document, "device")?;
    let events = document
        .get("events")
        .and_then(Value::as_sequence)
        .map_or(0, Vec::len);
    Some((identifier, device, events))
}

/// Device name from the root `name` attribute or a `<name>` child, falling
/// back to the file stem.
fn device_name(path: &Path) -> String {
    let stem = || {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    };

    match fs::read_to_string(path) {
        Ok(content) => xml_device_name(&content).unwrap_or_else(stem),
        Err(e) => {
            debug!("Unable to read device profile {:?}: {}", path, e);
            stem()
        }
    }
}

fn xml_device_name(content: &str) -> Option<String> {
    let root = Regex::new(r"<([A-Za-z_][\w:.\-]*)([^>]*)>").ok()?;
    let captures = root.captures(content)?;
    let attributes = captures.get(2).map_or("", |m| m.as_str());

    let attribute = Regex::new(r#"(?:^|\s)name\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()?;
    if let Some(found) = attribute.captures(attributes) {
        let value = found.get(1).or_else(|| found.get(2)).map_or("", |m| m.as_str());
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let child = Regex::new(r"<(name|Name)>\s*([^<]*?)\s*</(?:name|Name)>").ok()?;
    child
        .captures(content)
        .and_then(|found| found.get(2))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
}
