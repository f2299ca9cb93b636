//! Validation System - Rule/Policy Separation
//!
//! Rules walk a candidate JSON value and produce path-tagged violations.
//! Policy: any error blocks, warnings are logged and carried along.
//! A candidate is never mutated; every violated field is reported in one pass.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{ErrorCode, PipelineError};
use crate::schema::{
    BrandIdentity, CanonicalDocument, ColorPalette, LandingContent, ProjectInfo, SectionKey,
    TemplateType, Tone, Typography, UserInput, ALLOWED_FONTS, ALLOWED_ICONS, SCHEMA_VERSION,
};

const MAX_VALUE_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub path: String,
    pub code: ErrorCode,
    pub severity: ViolationSeverity,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<FieldViolation>,
}

impl ValidationResult {
    pub fn errors(&self) -> Vec<FieldViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .cloned()
            .collect()
    }

    pub fn warnings(&self) -> Vec<FieldViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Warning)
            .cloned()
            .collect()
    }
}

/// Presence requirement for a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// May be absent or null
    Nullable,
    /// May be absent; null is a type error
    Optional,
    Required,
    NonEmpty,
}

/// Collects violations while walking a JSON value
#[derive(Debug, Default)]
pub struct Checker {
    violations: Vec<FieldViolation>,
}

pub fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_VALUE_LEN {
        text.chars().take(MAX_VALUE_LEN).collect()
    } else {
        text
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, path: &str, code: ErrorCode, reason: impl Into<String>, value: Option<&Value>) {
        self.violations.push(FieldViolation {
            path: path.to_string(),
            code,
            severity: ViolationSeverity::Error,
            reason: reason.into(),
            value: value.map(preview),
        });
    }

    pub fn warn(&mut self, path: &str, code: ErrorCode, reason: impl Into<String>, value: Option<&Value>) {
        self.violations.push(FieldViolation {
            path: path.to_string(),
            code,
            severity: ViolationSeverity::Warning,
            reason: reason.into(),
            value: value.map(preview),
        });
    }

    pub fn finish(self) -> ValidationResult {
        let valid = !self
            .violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult { valid, violations: self.violations }
    }

    fn missing(&mut self, path: &str) {
        self.error(path, ErrorCode::MissingRequiredField, "required field is missing", None);
    }

    fn wrong_type(&mut self, path: &str, expected: &str, value: &Value) {
        self.error(
            path,
            ErrorCode::InvalidFieldType,
            format!("expected {}, got {}", expected, type_name(value)),
            Some(value),
        );
    }

    /// An object at `path`; `None` (and a violation) when absent or mistyped
    pub fn object<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            None | Some(Value::Null) => {
                self.missing(path);
                None
            }
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                self.wrong_type(path, "object", other);
                None
            }
        }
    }

    /// Like `object`, but absence (or null) is not a violation
    pub fn optional_object<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            None | Some(Value::Null) => None,
            some => self.object(some, path),
        }
    }

    /// Absence falls back to a default; null has no typed form
    pub fn defaulted_object<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            None => None,
            Some(Value::Null) => {
                self.wrong_type(path, "object", &Value::Null);
                None
            }
            some => self.object(some, path),
        }
    }

    pub fn string<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        parent: &str,
        key: &str,
        presence: Presence,
    ) -> Option<&'v str> {
        let path = join(parent, key);
        match map.get(key) {
            None => {
                if matches!(presence, Presence::Required | Presence::NonEmpty) {
                    self.missing(&path);
                }
                None
            }
            Some(Value::Null) => {
                match presence {
                    Presence::Nullable => {}
                    Presence::Optional => self.wrong_type(&path, "string", &Value::Null),
                    Presence::Required | Presence::NonEmpty => self.missing(&path),
                }
                None
            }
            Some(Value::String(s)) => {
                if presence == Presence::NonEmpty && s.trim().is_empty() {
                    self.error(&path, ErrorCode::EmptyField, "must not be empty", Some(&Value::String(s.clone())));
                }
                Some(s.as_str())
            }
            Some(other) => {
                self.wrong_type(&path, "string", other);
                None
            }
        }
    }

    /// Array field; `required=false` accepts absence but not null
    pub fn array<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        parent: &str,
        key: &str,
        required: bool,
    ) -> Option<&'v Vec<Value>> {
        let path = join(parent, key);
        match map.get(key) {
            None => {
                if required {
                    self.missing(&path);
                }
                None
            }
            Some(Value::Null) if required => {
                self.missing(&path);
                None
            }
            Some(Value::Null) => {
                self.wrong_type(&path, "array", &Value::Null);
                None
            }
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                self.wrong_type(&path, "array", other);
                None
            }
        }
    }

    /// Array of strings, each non-empty when `non_empty_items`
    pub fn string_list<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        parent: &str,
        key: &str,
        non_empty_items: bool,
    ) -> Vec<&'v str> {
        let path = join(parent, key);
        let mut out = vec![];
        if let Some(items) = self.array(map, parent, key, false) {
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                match item {
                    Value::String(s) if non_empty_items && s.trim().is_empty() => {
                        self.error(&item_path, ErrorCode::EmptyField, "must not be empty", Some(item));
                    }
                    Value::String(s) => out.push(s.as_str()),
                    other => self.wrong_type(&item_path, "string", other),
                }
            }
        }
        out
    }

    /// Array of objects whose listed keys are required non-empty strings
    pub fn record_list(
        &mut self,
        map: &Map<String, Value>,
        parent: &str,
        key: &str,
        required_keys: &[&str],
        optional_keys: &[&str],
    ) {
        let path = join(parent, key);
        if let Some(items) = self.array(map, parent, key, false) {
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                if let Some(record) = self.object(Some(item), &item_path) {
                    for k in required_keys {
                        self.string(record, &item_path, k, Presence::NonEmpty);
                    }
                    for k in optional_keys {
                        self.string(record, &item_path, k, Presence::Optional);
                    }
                }
            }
        }
    }
}

/// Validation rule trait - checks one top-level section of the document
pub trait ValidationRule: Send + Sync {
    /// Top-level key this rule owns
    fn key(&self) -> &'static str;
    fn required(&self) -> bool { true }
    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker);
}

// --- Concrete Rules ---

pub struct MetaRule;

impl ValidationRule for MetaRule {
    fn key(&self) -> &'static str { "meta" }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(meta) = checker.object(section, path) else { return };

        if let Some(version) = checker.string(meta, path, "schema_version", Presence::NonEmpty) {
            check_schema_version(version, &join(path, "schema_version"), checker);
        }
        checker.string(meta, path, "generated_at", Presence::Required);
        checker.string_list(meta, path, "pipeline_steps", true);
    }
}

fn check_schema_version(version: &str, path: &str, checker: &mut Checker) {
    let value = Value::String(version.to_string());
    let current = semver::Version::parse(SCHEMA_VERSION).ok();
    match (semver::Version::parse(version), current) {
        (Err(_), _) => checker.error(
            path,
            ErrorCode::SchemaVersionMismatch,
            "expected MAJOR.MINOR.PATCH",
            Some(&value),
        ),
        (Ok(found), Some(current)) if found.major != current.major => checker.error(
            path,
            ErrorCode::SchemaVersionMismatch,
            format!("major version {} is not supported (expected {})", found.major, SCHEMA_VERSION),
            Some(&value),
        ),
        (Ok(found), Some(current)) if found != current => checker.warn(
            path,
            ErrorCode::SchemaVersionMismatch,
            format!("schema version differs from {}", SCHEMA_VERSION),
            Some(&value),
        ),
        _ => {}
    }
}

pub struct ProjectRule;

impl ValidationRule for ProjectRule {
    fn key(&self) -> &'static str { "project" }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(project) = checker.object(section, path) else { return };

        checker.string(project, path, "product_name", Presence::NonEmpty);
        checker.string(project, path, "tagline", Presence::Required);
        checker.string(project, path, "description", Presence::Required);
        checker.string(project, path, "target_audience", Presence::Optional);
        checker.string(project, path, "value_proposition", Presence::Optional);

        if let Some(tone) = checker.string(project, path, "tone", Presence::Required) {
            if !Tone::ALL.iter().any(|t| t.as_str() == tone) {
                checker.error(
                    &join(path, "tone"),
                    ErrorCode::InvalidTone,
                    "expected one of professional|friendly|bold|minimal",
                    project.get("tone"),
                );
            }
        }

        let keywords_path = join(path, "keywords");
        let keywords = checker.string_list(project, path, "keywords", false);
        if keywords.iter().all(|k| k.trim().is_empty()) && project.get("keywords").map_or(true, Value::is_array) {
            checker.warn(&keywords_path, ErrorCode::EmptyField, "no keywords provided", None);
        }
    }
}

pub struct BrandRule;

impl ValidationRule for BrandRule {
    fn key(&self) -> &'static str { "brand" }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(brand) = checker.object(section, path) else { return };

        let colors_path = join(path, "colors");
        if let Some(colors) = checker.object(brand.get("colors"), &colors_path) {
            for role in ColorPalette::ROLES {
                if let Some(color) = checker.string(colors, &colors_path, role, Presence::Required) {
                    if !is_hex_color(color) {
                        checker.error(
                            &join(&colors_path, role),
                            ErrorCode::InvalidHexColor,
                            "expected #RRGGBB",
                            colors.get(role),
                        );
                    }
                }
            }
        }

        let fonts_path = join(path, "fonts");
        if let Some(fonts) = checker.object(brand.get("fonts"), &fonts_path) {
            for role in Typography::ROLES {
                if let Some(font) = checker.string(fonts, &fonts_path, role, Presence::Required) {
                    if !ALLOWED_FONTS.contains(&font) {
                        checker.error(
                            &join(&fonts_path, role),
                            ErrorCode::InvalidFont,
                            "font is not in the supported list",
                            fonts.get(role),
                        );
                    }
                }
            }
        }

        checker.string_list(brand, path, "tone_rules", true);
    }
}

pub struct ContentRule;

impl ValidationRule for ContentRule {
    fn key(&self) -> &'static str { "content" }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(content) = checker.object(section, path) else { return };

        let hero_path = join(path, "hero");
        if let Some(hero) = checker.object(content.get("hero"), &hero_path) {
            for key in ["headline", "subheadline", "cta_text"] {
                checker.string(hero, &hero_path, key, Presence::NonEmpty);
            }
        }

        let features_path = join(path, "features");
        if let Some(features) = checker.array(content, path, "features", false) {
            for (i, item) in features.iter().enumerate() {
                let item_path = format!("{}[{}]", features_path, i);
                let Some(feature) = checker.object(Some(item), &item_path) else { continue };
                checker.string(feature, &item_path, "title", Presence::NonEmpty);
                checker.string(feature, &item_path, "description", Presence::Required);
                if let Some(icon) = checker.string(feature, &item_path, "icon", Presence::Required) {
                    if !ALLOWED_ICONS.contains(&icon.trim().to_lowercase().as_str()) {
                        checker.warn(
                            &join(&item_path, "icon"),
                            ErrorCode::InvalidFieldType,
                            "unknown icon, default glyph will be used",
                            feature.get("icon"),
                        );
                    }
                }
            }
        }

        let testimonial_path = join(path, "testimonial");
        if let Some(testimonial) = checker.optional_object(content.get("testimonial"), &testimonial_path) {
            for key in ["quote", "author", "role"] {
                checker.string(testimonial, &testimonial_path, key, Presence::NonEmpty);
            }
        }

        checker.string(content, path, "footer_cta", Presence::Optional);

        let variants_path = join(path, "variants");
        if let Some(variants) = checker.defaulted_object(content.get("variants"), &variants_path) {
            checker.string_list(variants, &variants_path, "headlines", true);
            checker.string_list(variants, &variants_path, "ctas", true);
        }

        let sections_path = join(path, "sections");
        if let Some(sections) = checker.defaulted_object(content.get("sections"), &sections_path) {
            for (key, flag) in sections {
                let key_path = join(&sections_path, key);
                if SectionKey::from_key(key).is_none() {
                    checker.error(
                        &key_path,
                        ErrorCode::UnknownSectionKey,
                        "unrecognized section key",
                        Some(&Value::String(key.clone())),
                    );
                } else if !flag.is_boolean() {
                    checker.wrong_type(&key_path, "boolean", flag);
                }
            }
        }

        checker.record_list(content, path, "faq_items", &["question", "answer"], &[]);
        checker.record_list(content, path, "pricing_plans", &["name", "price"], &["description"]);
        checker.record_list(content, path, "stats", &["value", "label"], &[]);
        checker.record_list(content, path, "logos", &["name"], &[]);
        checker.record_list(content, path, "screenshots", &["caption"], &[]);
    }
}

pub struct AssetsRule;

impl ValidationRule for AssetsRule {
    fn key(&self) -> &'static str { "assets" }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(assets) = checker.object(section, path) else { return };

        for key in ["hero_image_prompt", "hero_image_alt", "og_image_prompt", "logo_url"] {
            checker.string(assets, path, key, Presence::Nullable);
        }
        checker.string_list(assets, path, "screenshot_prompts", false);
    }
}

pub struct RenderRule;

impl ValidationRule for RenderRule {
    fn key(&self) -> &'static str { "render" }

    fn required(&self) -> bool { false }

    fn check(&self, section: Option<&Value>, path: &str, checker: &mut Checker) {
        let Some(render) = checker.optional_object(section, path) else { return };

        if let Some(value) = render.get("template_type") {
            let known = value
                .as_str()
                .map_or(false, |t| TemplateType::ALL.iter().any(|k| k.as_str() == t));
            if !known {
                checker.error(
                    &join(path, "template_type"),
                    ErrorCode::InvalidTemplateType,
                    "expected one of saas|app|agency",
                    Some(value),
                );
            }
        }

        if let Some(value) = render.get("variant_id") {
            if value.as_i64().filter(|v| *v >= 0).is_none() {
                checker.error(
                    &join(path, "variant_id"),
                    ErrorCode::InvalidVariantId,
                    "expected a non-negative integer",
                    Some(value),
                );
            }
        }
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(MetaRule),
                Box::new(ProjectRule),
                Box::new(BrandRule),
                Box::new(ContentRule),
                Box::new(AssetsRule),
                Box::new(RenderRule),
            ],
        }
    }

    /// Run every rule against a whole candidate document
    pub fn check(&self, candidate: &Value) -> ValidationResult {
        let mut checker = Checker::new();

        let Some(root) = candidate.as_object() else {
            checker.wrong_type("document", "object", candidate);
            return checker.finish();
        };

        for rule in &self.rules {
            let section = root.get(rule.key());
            if section.is_none() && !rule.required() {
                continue;
            }
            rule.check(section, rule.key(), &mut checker);
        }

        checker.finish()
    }

    /// Full contract: verdict plus the typed document
    pub fn validate(&self, candidate: &Value) -> Result<CanonicalDocument, PipelineError> {
        let result = self.check(candidate);
        let doc: CanonicalDocument = accept(result, candidate, "document")?;
        Ok(CanonicalDocument {
            project: doc.project.clone().normalized(),
            ..doc
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Log warnings, reject on errors, otherwise deserialize into the typed value
fn accept<T: serde::de::DeserializeOwned>(
    result: ValidationResult,
    candidate: &Value,
    path: &str,
) -> Result<T, PipelineError> {
    for w in result.warnings() {
        warn!(path = %w.path, code = %w.code, reason = %w.reason, "validation warning");
    }
    if !result.valid {
        return Err(PipelineError::validation(result.errors()));
    }
    serde_json::from_value(candidate.clone()).map_err(|e| {
        PipelineError::validation(vec![FieldViolation {
            path: path.to_string(),
            code: ErrorCode::InvalidFieldType,
            severity: ViolationSeverity::Error,
            reason: e.to_string(),
            value: None,
        }])
    })
}

fn validate_section<T: serde::de::DeserializeOwned>(
    rule: &dyn ValidationRule,
    candidate: &Value,
) -> Result<T, PipelineError> {
    let mut checker = Checker::new();
    rule.check(Some(candidate), rule.key(), &mut checker);
    accept(checker.finish(), candidate, rule.key())
}

/// Validate a whole candidate document
pub fn validate(candidate: &Value) -> Result<CanonicalDocument, PipelineError> {
    Validator::new().validate(candidate)
}

/// Validate an onboarding result; paths are reported under `project.`
pub fn validate_project(candidate: &Value) -> Result<ProjectInfo, PipelineError> {
    validate_section::<ProjectInfo>(&ProjectRule, candidate).map(ProjectInfo::normalized)
}

pub fn validate_brand(candidate: &Value) -> Result<BrandIdentity, PipelineError> {
    validate_section(&BrandRule, candidate)
}

pub fn validate_content(candidate: &Value) -> Result<LandingContent, PipelineError> {
    validate_section(&ContentRule, candidate)
}

/// Raw onboarding input: the three descriptive fields must carry text
pub fn validate_user_input(input: &UserInput) -> Result<(), PipelineError> {
    let mut checker = Checker::new();
    let fields = [
        ("product_name", &input.product_name),
        ("target_audience", &input.target_audience),
        ("value_proposition", &input.value_proposition),
    ];
    for (key, value) in fields {
        if value.trim().is_empty() {
            checker.error(&join("input", key), ErrorCode::EmptyField, "must not be empty", None);
        }
    }
    let result = checker.finish();
    if result.valid {
        Ok(())
    } else {
        Err(PipelineError::validation(result.errors()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(err: &PipelineError) -> Vec<String> {
        err.violations().into_iter().map(|v| v.path).collect()
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#1F2937"));
        assert!(!is_hex_color("1F2937"));
        assert!(!is_hex_color("#1F29"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_project_reports_all_fields() {
        let err = validate_project(&json!({
            "product_name": "  ",
            "tagline": 3,
            "tone": "sarcastic"
        }))
        .unwrap_err();
        let p = paths(&err);
        assert!(p.contains(&"project.product_name".to_string()));
        assert!(p.contains(&"project.tagline".to_string()));
        assert!(p.contains(&"project.description".to_string()));
        assert!(p.contains(&"project.tone".to_string()));
    }

    #[test]
    fn test_project_keywords_optional() {
        let project = validate_project(&json!({
            "product_name": "Clipp",
            "tagline": "Copy less",
            "description": "Clipboard manager",
            "tone": "minimal"
        }))
        .unwrap();
        assert!(project.keywords.is_empty());
        assert_eq!(project.tone, Tone::Minimal);
    }

    #[test]
    fn test_brand_bad_color_and_font() {
        let err = validate_brand(&json!({
            "colors": {
                "primary": "blue",
                "secondary": "#818CF8",
                "accent": "#F59E0B",
                "background": "#FAFAFA",
                "text": "#1F2937"
            },
            "fonts": {"heading": "Comic Sans", "body": "Inter"},
            "tone_rules": ["Be clear"]
        }))
        .unwrap_err();
        let codes: Vec<ErrorCode> = err.violations().iter().map(|v| v.code).collect();
        assert_eq!(codes, vec![ErrorCode::InvalidHexColor, ErrorCode::InvalidFont]);
    }

    #[test]
    fn test_schema_version_minor_drift_is_warning() {
        let mut checker = Checker::new();
        check_schema_version("1.3.0", "meta.schema_version", &mut checker);
        let result = checker.finish();
        assert!(result.valid);
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_schema_version_major_mismatch_is_error() {
        let mut checker = Checker::new();
        check_schema_version("2.0.0", "meta.schema_version", &mut checker);
        assert!(!checker.finish().valid);
    }

    #[test]
    fn test_render_negative_variant_rejected() {
        let mut checker = Checker::new();
        RenderRule.check(Some(&json!({"template_type": "saas", "variant_id": -1})), "render", &mut checker);
        let result = checker.finish();
        assert!(!result.valid);
        assert_eq!(result.violations[0].code, ErrorCode::InvalidVariantId);
    }

    #[test]
    fn test_user_input_blank_fields() {
        let input = UserInput {
            product_name: "FlowTask".into(),
            target_audience: " ".into(),
            value_proposition: String::new(),
            tone: Tone::Friendly,
            additional_context: String::new(),
            template_type: TemplateType::Agency,
        };
        let err = validate_user_input(&input).unwrap_err();
        assert_eq!(paths(&err), vec!["input.target_audience", "input.value_proposition"]);
    }
}
