//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees of the canonical document model.

use landingforge_core::{
    validate,
    validation::Validator,
    hashing::{canonical_json, compute_document_hash},
    CanonicalDocument, ErrorCode, ErrorKind, ViolationSeverity, SCHEMA_VERSION,
};
use serde_json::{json, Value};

fn fixture_value() -> Value {
    let raw = include_str!("fixtures/canonical_example.json");
    serde_json::from_str(raw).expect("fixture is JSON")
}

fn codes_at(err: &landingforge_core::PipelineError, path: &str) -> Vec<ErrorCode> {
    err.violations()
        .into_iter()
        .filter(|v| v.path == path)
        .map(|v| v.code)
        .collect()
}

#[test]
fn invariant_fixture_is_valid() {
    let doc = validate(&fixture_value()).unwrap();
    assert_eq!(doc.meta.schema_version, SCHEMA_VERSION);
    assert_eq!(doc.project.product_name, "Clipp");
}

#[test]
fn invariant_required_top_level_keys() {
    for key in ["meta", "project", "brand", "content", "assets"] {
        let mut value = fixture_value();
        value.as_object_mut().unwrap().remove(key);

        let err = validate(&value).unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaValidation, "missing {}", key);
        assert_eq!(codes_at(&err, key), vec![ErrorCode::MissingRequiredField], "missing {}", key);
    }
}

#[test]
fn invariant_render_block_is_optional() {
    let mut value = fixture_value();
    value.as_object_mut().unwrap().remove("render");
    let doc = validate(&value).unwrap();
    assert!(doc.render.is_none());
}

#[test]
fn invariant_unknown_section_key_rejected() {
    let mut value = fixture_value();
    value["content"]["sections"]["testimonials_carousel"] = json!(true);

    let err = validate(&value).unwrap_err();
    assert_eq!(
        codes_at(&err, "content.sections.testimonials_carousel"),
        vec![ErrorCode::UnknownSectionKey]
    );
}

#[test]
fn invariant_all_violations_reported_in_one_pass() {
    let mut value = fixture_value();
    value["content"]["hero"]["headline"] = json!("");
    value["content"]["hero"]["cta_text"] = json!("   ");
    value["project"]["tone"] = json!("sarcastic");
    value["brand"]["colors"]["accent"] = json!("green");
    value["render"]["template_type"] = json!("portfolio");
    value["render"]["variant_id"] = json!(-1);

    let err = validate(&value).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(codes_at(&err, "content.hero.headline"), vec![ErrorCode::EmptyField]);
    assert_eq!(codes_at(&err, "content.hero.cta_text"), vec![ErrorCode::EmptyField]);
    assert_eq!(codes_at(&err, "project.tone"), vec![ErrorCode::InvalidTone]);
    assert_eq!(codes_at(&err, "brand.colors.accent"), vec![ErrorCode::InvalidHexColor]);
    assert_eq!(codes_at(&err, "render.template_type"), vec![ErrorCode::InvalidTemplateType]);
    assert_eq!(codes_at(&err, "render.variant_id"), vec![ErrorCode::InvalidVariantId]);
}

#[test]
fn invariant_violation_carries_offending_value() {
    let mut value = fixture_value();
    value["brand"]["colors"]["accent"] = json!("green");
    let err = validate(&value).unwrap_err();
    let violation = err
        .violations()
        .into_iter()
        .find(|v| v.path == "brand.colors.accent")
        .unwrap();
    assert_eq!(violation.value.as_deref(), Some("green"));
}

#[test]
fn invariant_validation_is_pure() {
    let mut value = fixture_value();
    value["project"]["keywords"] = json!(["  Clipboard ", ""]);
    value["content"]["sections"]["bogus"] = json!(false);
    let before = value.clone();

    let validator = Validator::new();
    let first = validator.check(&value);
    let second = validator.check(&value);

    assert_eq!(value, before);
    assert_eq!(first.valid, second.valid);
    assert_eq!(first.violations, second.violations);
}

#[test]
fn invariant_schema_major_mismatch_is_fatal() {
    let mut value = fixture_value();
    value["meta"]["schema_version"] = json!("2.0.0");
    let err = validate(&value).unwrap_err();
    assert_eq!(codes_at(&err, "meta.schema_version"), vec![ErrorCode::SchemaVersionMismatch]);

    value["meta"]["schema_version"] = json!("one.two");
    assert!(validate(&value).is_err());
}

#[test]
fn invariant_schema_minor_mismatch_warns() {
    let mut value = fixture_value();
    value["meta"]["schema_version"] = json!("1.0.0");

    let result = Validator::new().check(&value);
    assert!(result.valid);
    let warnings = result.warnings();
    assert!(warnings
        .iter()
        .any(|w| w.path == "meta.schema_version" && w.severity == ViolationSeverity::Warning));
    assert!(validate(&value).is_ok());
}

#[test]
fn invariant_null_on_defaulted_field_reported_at_path() {
    let fields: [&[&str]; 9] = [
        &["content", "footer_cta"],
        &["content", "variants"],
        &["content", "variants", "headlines"],
        &["content", "sections"],
        &["content", "features"],
        &["project", "keywords"],
        &["project", "target_audience"],
        &["meta", "pipeline_steps"],
        &["brand", "tone_rules"],
    ];
    for field in fields {
        let mut value = fixture_value();
        let (last, parents) = field.split_last().unwrap();
        let mut parent = &mut value;
        for key in parents {
            parent = &mut parent[*key];
        }
        parent[*last] = Value::Null;

        let path = field.join(".");
        let err = validate(&value).unwrap_err();
        assert_eq!(codes_at(&err, &path), vec![ErrorCode::InvalidFieldType], "{}", path);
        assert_eq!(err.violations().len(), 1, "{}", path);
    }
}

#[test]
fn invariant_null_accepted_where_field_is_optional() {
    let mut value = fixture_value();
    value["content"]["testimonial"] = Value::Null;
    value["assets"]["logo_url"] = Value::Null;
    value["render"] = Value::Null;

    let doc = validate(&value).unwrap();
    assert!(doc.content.testimonial.is_none());
    assert!(doc.assets.logo_url.is_none());
    assert!(doc.render.is_none());
}

#[test]
fn invariant_oversized_variant_id_rejected_at_path() {
    let mut value = fixture_value();
    value["render"]["variant_id"] = json!(u64::MAX);
    let err = validate(&value).unwrap_err();
    assert_eq!(codes_at(&err, "render.variant_id"), vec![ErrorCode::InvalidVariantId]);
    assert_eq!(err.violations().len(), 1);
}

#[test]
fn invariant_section_flag_must_be_boolean() {
    let mut value = fixture_value();
    value["content"]["sections"]["faq"] = json!("yes");
    let err = validate(&value).unwrap_err();
    assert_eq!(codes_at(&err, "content.sections.faq"), vec![ErrorCode::InvalidFieldType]);
}

#[test]
fn invariant_missing_sections_use_defaults() {
    let mut value = fixture_value();
    value["content"].as_object_mut().unwrap().remove("sections");
    let doc = validate(&value).unwrap();
    assert!(doc.content.sections.feature_grid);
    assert!(doc.content.sections.stats);
    assert!(!doc.content.sections.pricing);
    assert!(!doc.content.sections.faq);
}

#[test]
fn invariant_round_trip_is_lossless() {
    let doc = validate(&fixture_value()).unwrap();
    let json = doc.to_json().unwrap();
    let reparsed: Value = serde_json::from_str(&json).unwrap();
    let again: CanonicalDocument = validate(&reparsed).unwrap();
    assert_eq!(again, doc);
}

#[test]
fn invariant_document_hash_ignores_timestamp() {
    let doc = validate(&fixture_value()).unwrap();
    let mut later = doc.clone();
    later.meta.generated_at = "2030-01-01T00:00:00Z".to_string();
    assert_eq!(compute_document_hash(&doc).unwrap(), compute_document_hash(&later).unwrap());

    let mut edited = doc.clone();
    edited.content.hero.headline = "Something else".to_string();
    assert_ne!(compute_document_hash(&doc).unwrap(), compute_document_hash(&edited).unwrap());
}

#[test]
fn invariant_canonical_json_is_key_ordered() {
    let a = canonical_json(&json!({"b": 1, "a": {"d": 2, "c": 3}})).unwrap();
    let b = canonical_json(&json!({"a": {"c": 3, "d": 2}, "b": 1})).unwrap();
    assert_eq!(a, b);
}

#[test]
fn invariant_error_families_follow_codes() {
    let cases = [
        (ErrorCode::InvalidFont, ErrorKind::Validation),
        (ErrorCode::MalformedResponse, ErrorKind::Generation),
        (ErrorCode::InvalidSectionData, ErrorKind::Rendering),
        (ErrorCode::JsonParseFailed, ErrorKind::Io),
    ];
    for (code, kind) in cases {
        assert_eq!(code.kind(), kind);
    }
}
