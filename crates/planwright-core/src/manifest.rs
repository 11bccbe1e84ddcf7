//! Feature manifest: the versioned schema for optional config sections.
//!
//! The manifest drives four read/write operations over a project config:
//! [`diff_config`] and [`validate`] inspect it, [`apply_migration`] brings it
//! up to the manifest without discarding existing values, and
//! [`auto_detect`] derives field values from files in the working tree.

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use indexmap::IndexMap;
use std::path::Path;

/// Manifest shipped with the tool.
pub const BUILTIN_MANIFEST: &str = include_str!("../features.json");

/// Top-level config keys owned by the core workflow rather than a feature.
pub const KNOWN_TOP_LEVEL_KEYS: &[&str] = &[
    "manifest_version",
    "mode",
    "depth",
    "granularity",
    "model_profile",
    "commit_docs",
    "search_gitignored",
    "branching_strategy",
    "phase_branch_template",
    "milestone_branch_template",
    "workflow",
    "planning",
    "parallelization",
    "gates",
    "safety",
    "brave_search",
    "model_overrides",
];

// ---------------------------------------------------------------------------
// Schema types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawFieldType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    StringEnum,
    ObjectArray,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String | FieldType::StringEnum => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::ObjectArray => "array",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String | FieldType::StringEnum => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::ObjectArray => value.is_array(),
        }
    }

    /// Convert `value` to this type when the conversion is unambiguous:
    /// `"true"`/`"false"` to booleans and numeric strings to numbers.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        let text = value.as_str()?.trim();
        match self {
            FieldType::Boolean => match text {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldType::Number => {
                if let Ok(n) = text.parse::<i64>() {
                    return Some(Value::Number(n.into()));
                }
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            }
            _ => None,
        }
    }
}

/// JSON type name of `value`, in the vocabulary the manifest uses.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    raw_type: RawFieldType,
    #[serde(default)]
    pub default: Value,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    pub fn field_type(&self) -> FieldType {
        match (self.raw_type, &self.allowed) {
            (RawFieldType::Enum, _) | (RawFieldType::String, Some(_)) => FieldType::StringEnum,
            (RawFieldType::String, None) => FieldType::String,
            (RawFieldType::Number, _) => FieldType::Number,
            (RawFieldType::Boolean, _) => FieldType::Boolean,
            (RawFieldType::Array, _) => FieldType::ObjectArray,
        }
    }

    fn allows(&self, value: &Value) -> bool {
        match (&self.allowed, value.as_str()) {
            (Some(allowed), Some(s)) => allowed.iter().any(|a| a == s),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectCheck {
    FileExists,
    DirExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRule {
    pub check: DetectCheck,
    pub path: String,
    pub value: Value,
}

impl DetectRule {
    pub fn matches(&self, cwd: &Path) -> bool {
        let path = cwd.join(&self.path);
        match self.check {
            DetectCheck::FileExists => path.is_file(),
            DetectCheck::DirExists => path.is_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub introduced: u32,
    pub config_key: String,
    #[serde(default)]
    pub schema: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub auto_detect: IndexMap<String, Vec<DetectRule>>,
    #[serde(default)]
    pub init_prompts: Vec<Value>,
}

impl FeatureSpec {
    /// A fully populated section built from schema defaults.
    pub fn defaults(&self) -> Map<String, Value> {
        self.schema
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub manifest_version: u32,
    #[serde(default)]
    pub features: IndexMap<String, FeatureSpec>,
}

impl FeatureManifest {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_MANIFEST)
    }

    /// Load from `path`, or the built-in manifest when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::parse(&crate::document::read_document(p)?.content),
            None => Self::builtin(),
        }
    }

    pub fn feature(&self, name: &str) -> Result<&FeatureSpec> {
        self.features
            .get(name)
            .or_else(|| self.features.values().find(|f| f.config_key == name))
            .ok_or_else(|| PlanError::FeatureNotFound(name.to_string()))
    }

    fn is_feature_key(&self, key: &str) -> bool {
        self.features.values().any(|f| f.config_key == key)
    }
}

fn config_manifest_version(config: &Map<String, Value>) -> Option<u64> {
    config.get("manifest_version").and_then(Value::as_u64)
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingFeature {
    pub feature: String,
    pub config_key: String,
    pub defaults: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingField {
    pub feature: String,
    pub config_key: String,
    pub field: String,
    pub default: Value,
    pub expected_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMismatch {
    pub feature: String,
    pub config_key: String,
    /// `None` when the whole section has the wrong type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub expected: &'static str,
    pub actual: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMismatch {
    pub feature: String,
    pub config_key: String,
    pub field: String,
    pub value: Value,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownField {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    MissingFeature(MissingFeature),
    MissingField(MissingField),
    TypeMismatch(TypeMismatch),
    EnumMismatch(EnumMismatch),
    UnknownField(UnknownField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Finding::TypeMismatch(_) | Finding::EnumMismatch(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

fn inspect(manifest: &FeatureManifest, config: &Map<String, Value>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (name, feature) in &manifest.features {
        let Some(section) = config.get(&feature.config_key) else {
            findings.push(Finding::MissingFeature(MissingFeature {
                feature: name.clone(),
                config_key: feature.config_key.clone(),
                defaults: Value::Object(feature.defaults()),
            }));
            continue;
        };
        let Some(section) = section.as_object() else {
            findings.push(Finding::TypeMismatch(TypeMismatch {
                feature: name.clone(),
                config_key: feature.config_key.clone(),
                field: None,
                expected: "object",
                actual: json_type_name(section),
                value: section.clone(),
            }));
            continue;
        };
        for (field, spec) in &feature.schema {
            let ty = spec.field_type();
            match section.get(field) {
                None => findings.push(Finding::MissingField(MissingField {
                    feature: name.clone(),
                    config_key: feature.config_key.clone(),
                    field: field.clone(),
                    default: spec.default.clone(),
                    expected_type: ty.name(),
                })),
                Some(value) if !ty.matches(value) => {
                    findings.push(Finding::TypeMismatch(TypeMismatch {
                        feature: name.clone(),
                        config_key: feature.config_key.clone(),
                        field: Some(field.clone()),
                        expected: ty.name(),
                        actual: json_type_name(value),
                        value: value.clone(),
                    }))
                }
                Some(value) if !spec.allows(value) => {
                    findings.push(Finding::EnumMismatch(EnumMismatch {
                        feature: name.clone(),
                        config_key: feature.config_key.clone(),
                        field: field.clone(),
                        value: value.clone(),
                        allowed: spec.allowed.clone().unwrap_or_default(),
                    }))
                }
                Some(_) => {}
            }
        }
        for key in section.keys().filter(|k| !feature.schema.contains_key(*k)) {
            findings.push(Finding::UnknownField(UnknownField {
                key: key.clone(),
                feature: Some(name.clone()),
            }));
        }
    }
    for key in config.keys() {
        if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) && !manifest.is_feature_key(key) {
            findings.push(Finding::UnknownField(UnknownField {
                key: key.clone(),
                feature: None,
            }));
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// diff / validate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigDiff {
    pub manifest_version: u32,
    pub config_manifest_version: Option<u64>,
    pub missing_features: Vec<MissingFeature>,
    pub missing_fields: Vec<MissingField>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub enum_mismatches: Vec<EnumMismatch>,
    pub unknown_fields: Vec<UnknownField>,
}

pub fn diff_config(manifest: &FeatureManifest, config: &Map<String, Value>) -> ConfigDiff {
    let mut diff = ConfigDiff {
        manifest_version: manifest.manifest_version,
        config_manifest_version: config_manifest_version(config),
        ..ConfigDiff::default()
    };
    for finding in inspect(manifest, config) {
        match finding {
            Finding::MissingFeature(f) => diff.missing_features.push(f),
            Finding::MissingField(f) => diff.missing_fields.push(f),
            Finding::TypeMismatch(f) => diff.type_mismatches.push(f),
            Finding::EnumMismatch(f) => diff.enum_mismatches.push(f),
            Finding::UnknownField(f) => diff.unknown_fields.push(f),
        }
    }
    diff
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub features_checked: usize,
    pub features_present: usize,
    pub features_missing: usize,
}

/// Same checks as [`diff_config`], split by severity. Only type and enum
/// mismatches make a config invalid.
pub fn validate(manifest: &FeatureManifest, config: &Map<String, Value>) -> ValidationReport {
    let (errors, warnings): (Vec<Finding>, Vec<Finding>) = inspect(manifest, config)
        .into_iter()
        .partition(|f| f.severity() == Severity::Error);
    let features_present = manifest
        .features
        .values()
        .filter(|f| config.contains_key(&f.config_key))
        .count();
    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        features_checked: manifest.features.len(),
        features_present,
        features_missing: manifest.features.len() - features_present,
    }
}

// ---------------------------------------------------------------------------
// apply-migration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationChange {
    FeatureAdded {
        feature: String,
        config_key: String,
        fields_added: Vec<String>,
    },
    FieldAdded {
        feature: String,
        config_key: String,
        field: String,
        default_value: Value,
    },
    TypeCoerced {
        feature: String,
        config_key: String,
        field: String,
        from: Value,
        to: Value,
    },
    ManifestVersionUpdated { from: Option<u64>, to: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub from_version: Option<u64>,
    pub to_version: u32,
    pub changes: Vec<MigrationChange>,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Bring `config` up to `manifest` in four ordered passes: add missing
/// sections, add missing fields, coerce unambiguous type mismatches, bump
/// `manifest_version`. Present values of the right type are never touched,
/// so a second run yields no changes.
pub fn apply_migration(manifest: &FeatureManifest, config: &mut Map<String, Value>) -> MigrationReport {
    let from_version = config_manifest_version(config);
    let mut changes = Vec::new();

    for (name, feature) in &manifest.features {
        if config.contains_key(&feature.config_key) {
            continue;
        }
        config.insert(feature.config_key.clone(), Value::Object(feature.defaults()));
        changes.push(MigrationChange::FeatureAdded {
            feature: name.clone(),
            config_key: feature.config_key.clone(),
            fields_added: feature.schema.keys().cloned().collect(),
        });
    }

    for (name, feature) in &manifest.features {
        let Some(section) = config.get_mut(&feature.config_key).and_then(Value::as_object_mut) else {
            continue;
        };
        for (field, spec) in &feature.schema {
            if section.contains_key(field) {
                continue;
            }
            section.insert(field.clone(), spec.default.clone());
            changes.push(MigrationChange::FieldAdded {
                feature: name.clone(),
                config_key: feature.config_key.clone(),
                field: field.clone(),
                default_value: spec.default.clone(),
            });
        }
    }

    for (name, feature) in &manifest.features {
        let Some(section) = config.get_mut(&feature.config_key).and_then(Value::as_object_mut) else {
            continue;
        };
        for (field, spec) in &feature.schema {
            let ty = spec.field_type();
            let Some(value) = section.get_mut(field) else {
                continue;
            };
            if ty.matches(value) {
                continue;
            }
            match ty.coerce(value) {
                Some(coerced) => {
                    changes.push(MigrationChange::TypeCoerced {
                        feature: name.clone(),
                        config_key: feature.config_key.clone(),
                        field: field.clone(),
                        from: value.clone(),
                        to: coerced.clone(),
                    });
                    *value = coerced;
                }
                None => tracing::warn!(
                    feature = %name,
                    %field,
                    expected = ty.name(),
                    actual = json_type_name(value),
                    "leaving uncoercible value in place"
                ),
            }
        }
    }

    if from_version.unwrap_or(0) < u64::from(manifest.manifest_version) {
        config.insert(
            "manifest_version".to_string(),
            Value::from(manifest.manifest_version),
        );
        changes.push(MigrationChange::ManifestVersionUpdated {
            from: from_version,
            to: manifest.manifest_version,
        });
    }

    MigrationReport {
        from_version,
        to_version: manifest.manifest_version,
        changes,
    }
}

// ---------------------------------------------------------------------------
// auto-detect
// ---------------------------------------------------------------------------

/// Evaluate each field's detect rules in order; the first match wins.
/// Fields with no matching rule are omitted.
pub fn auto_detect(feature: &FeatureSpec, cwd: &Path) -> Map<String, Value> {
    feature
        .auto_detect
        .iter()
        .filter_map(|(field, rules)| {
            rules
                .iter()
                .find(|rule| rule.matches(cwd))
                .map(|rule| (field.clone(), rule.value.clone()))
        })
        .collect()
}

/// Overlay detected values onto every feature section present in `config`.
pub fn apply_auto_detect(manifest: &FeatureManifest, config: &mut Map<String, Value>, cwd: &Path) -> usize {
    let mut applied = 0;
    for feature in manifest.features.values() {
        let detected = auto_detect(feature, cwd);
        let Some(section) = config.get_mut(&feature.config_key).and_then(Value::as_object_mut) else {
            continue;
        };
        for (field, value) in detected {
            section.insert(field, value);
            applied += 1;
        }
    }
    applied
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
