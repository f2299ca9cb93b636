//! Rendering Contract Tests
//!
//! Variant resolution, section outcomes, template dispatch and byte-stable output.

use landingforge_core::{
    output::{load_document, write_outputs},
    render::{resolve_variant, CopySource, SectionOutcome},
    resolve_sections, CanonicalDocument, ErrorCode, ErrorKind, RenderSelector, Renderer,
    TemplateRegistry, TemplateType,
    schema::{FaqItem, SectionKey, Stat},
};
use proptest::prelude::*;
use std::path::Path;

fn fixture() -> CanonicalDocument {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/canonical_example.json");
    load_document(&path).expect("fixture should validate")
}

fn renderer() -> Renderer {
    Renderer::builtin().expect("builtin templates compile")
}

#[test]
fn faq_placeholder_and_no_pricing() {
    let doc = fixture();
    assert!(!doc.content.sections.pricing);
    assert!(doc.content.sections.faq);
    assert!(doc.content.faq_items.is_empty());
    assert!(!doc.content.pricing_plans.is_empty());

    let page = renderer()
        .render(&doc, RenderSelector::new(TemplateType::Saas, 0))
        .unwrap();

    assert!(!page.html.contains("data-section=\"pricing\""));
    assert!(!page.html.contains("transparent pricing"));
    assert!(page.html.contains("data-section=\"faq\" data-state=\"placeholder\""));
    assert!(!page.html.contains("data-section=\"faq\" data-state=\"populated\""));
}

#[test]
fn headline_variant_with_default_cta() {
    let doc = fixture();
    let copy = resolve_variant(&doc.content, 1);
    assert_eq!(copy.headline, "Alt H1");
    assert_eq!(copy.cta_text, doc.content.hero.cta_text);
    assert_eq!(copy.cta_source, CopySource::Default);

    let page = renderer()
        .render(&doc, RenderSelector::new(TemplateType::Saas, 1))
        .unwrap();
    assert!(page.html.contains("Alt H1"));
    assert!(page.html.contains("Download Clipp"));
    assert!(!page.html.contains("Your clipboard, remembered"));
}

#[test]
fn every_section_outcome_reaches_markup() {
    let mut doc = fixture();
    doc.content.sections.stats = true;
    doc.content.stats = vec![Stat { value: "10k".into(), label: "Daily snippets".into() }];
    doc.content.sections.screenshots = true;
    doc.content.screenshots = vec![];
    doc.content.sections.faq = false;
    doc.content.faq_items = vec![FaqItem { question: "Is it free".into(), answer: "Yes".into() }];

    let sections = resolve_sections(&doc.content).unwrap();
    let html = renderer()
        .render(&doc, RenderSelector::new(TemplateType::App, 0))
        .unwrap()
        .html;

    for key in SectionKey::ALL {
        let marker = format!("data-section=\"{}\"", key.as_str());
        match sections.outcome(key) {
            SectionOutcome::Populated => {
                assert!(html.contains(&format!("{} data-state=\"populated\"", marker)), "{:?}", key)
            }
            SectionOutcome::Placeholder => {
                assert!(html.contains(&format!("{} data-state=\"placeholder\"", marker)), "{:?}", key)
            }
            SectionOutcome::Omitted => assert!(!html.contains(&marker), "{:?}", key),
        }
    }
    assert_eq!(sections.outcome(SectionKey::Stats), SectionOutcome::Populated);
    assert_eq!(sections.outcome(SectionKey::Screenshots), SectionOutcome::Placeholder);
    assert_eq!(sections.outcome(SectionKey::Faq), SectionOutcome::Omitted);
    assert!(!html.contains("Is it free"));
}

#[test]
fn rendering_is_byte_identical() {
    let doc = fixture();
    let r = renderer();
    for template in TemplateType::ALL {
        let selector = RenderSelector::new(template, 1);
        let a = r.render(&doc, selector).unwrap();
        let b = r.render(&doc, selector).unwrap();
        assert_eq!(a.html, b.html);
        assert_eq!(a.hash, b.hash);
    }
}

#[test]
fn generated_at_is_passed_through() {
    let doc = fixture();
    let page = renderer().render(&doc, doc.selector()).unwrap();
    assert!(page.html.contains("content=\"2026-01-15T09:30:00Z\""));
}

#[test]
fn templates_are_distinguishable() {
    let doc = fixture();
    let r = renderer();
    let app = r.render(&doc, RenderSelector::new(TemplateType::App, 0)).unwrap();
    let agency = r.render(&doc, RenderSelector::new(TemplateType::Agency, 0)).unwrap();
    assert!(app.html.contains("data-template=\"app\""));
    assert!(agency.html.contains("data-template=\"agency\""));
    assert_ne!(app.hash, agency.hash);
}

#[test]
fn unknown_template_name_fails_fast() {
    let doc = fixture();
    let err = renderer().render_named(&doc, "portfolio", 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::TemplateNotFound);
    assert_eq!(err.kind(), ErrorKind::Rendering);
}

#[test]
fn unregistered_template_writes_nothing() {
    let doc = fixture();
    let renderer = Renderer::new(TemplateRegistry::with_templates(&[TemplateType::Saas]).unwrap());
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("run");

    let result = renderer
        .render(&doc, RenderSelector::new(TemplateType::Agency, 0))
        .and_then(|page| write_outputs(&target, &doc, &page, &[]));

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rendering);
    assert_eq!(err.code, ErrorCode::TemplateNotFound);
    assert!(!target.exists());
}

#[test]
fn render_all_covers_every_combination() {
    let doc = fixture();
    let batch = renderer().render_all(&doc);
    assert!(batch.is_complete());
    // one alternate headline: ids 0 and 1 for each of three templates
    assert_eq!(batch.pages.len(), 6);

    let mut keys: Vec<String> = batch.pages.iter().map(|p| p.key()).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["agency_v0", "agency_v1", "app_v0", "app_v1", "saas_v0", "saas_v1"]
    );
    assert_eq!(
        batch.page(RenderSelector::new(TemplateType::App, 1)).unwrap().file_name(),
        "app_v1.html"
    );
}

#[test]
fn render_all_collects_failures() {
    let mut doc = fixture();
    doc.content.sections.stats = true;
    doc.content.stats = vec![Stat { value: "".into(), label: "Broken".into() }];

    let batch = renderer().render_all(&doc);
    assert!(batch.pages.is_empty());
    assert_eq!(batch.failures.len(), 6);
    assert!(batch
        .failures
        .iter()
        .all(|(_, e)| e.code == ErrorCode::InvalidSectionData));
}

#[test]
fn round_trip_through_disk() {
    let doc = fixture();
    let page = renderer().render(&doc, doc.selector()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let manifest = write_outputs(out.path(), &doc, &page, &[]).unwrap();
    assert_eq!(manifest.files.len(), 2);

    let reloaded = load_document(&out.path().join("canonical.json")).unwrap();
    assert_eq!(reloaded, doc);
    let again = renderer().render(&reloaded, reloaded.selector()).unwrap();
    assert_eq!(again.html, page.html);
}

#[test]
fn all_variant_pages_land_in_variants_dir() {
    let doc = fixture();
    let r = renderer();
    let index = r.render(&doc, doc.selector()).unwrap();
    let batch = r.render_all(&doc);
    assert!(batch.is_complete());
    let out = tempfile::tempdir().unwrap();

    let manifest = write_outputs(out.path(), &doc, &index, &batch.pages).unwrap();
    assert_eq!(manifest.files.len(), 2 + batch.pages.len());

    let variants_dir = out.path().join("variants");
    let mut on_disk: Vec<String> = std::fs::read_dir(&variants_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    assert_eq!(
        on_disk,
        vec![
            "agency_v0.html",
            "agency_v1.html",
            "app_v0.html",
            "app_v1.html",
            "saas_v0.html",
            "saas_v1.html"
        ]
    );

    for page in &batch.pages {
        let path = variants_dir.join(page.file_name());
        let entry = manifest.files.iter().find(|f| f.path == path).unwrap();
        assert_eq!(entry.sha256, page.hash);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), page.html);
    }
}

#[test]
fn negative_variant_is_never_persisted() {
    let doc = fixture().with_render(RenderSelector::new(TemplateType::Saas, -1));
    let page = renderer().render(&doc, RenderSelector::new(TemplateType::Saas, -1)).unwrap();
    assert!(page.html.contains(&doc.content.hero.headline));

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("run");
    let err = write_outputs(&target, &doc, &page, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let codes: Vec<(String, ErrorCode)> = err.violations().into_iter().map(|v| (v.path, v.code)).collect();
    assert_eq!(codes, vec![("render.variant_id".to_string(), ErrorCode::InvalidVariantId)]);
    assert!(!target.exists());
}

proptest! {
    #[test]
    fn out_of_range_ids_use_default(
        headlines in prop::collection::vec("[a-z]{1,8}", 0..4),
        ctas in prop::collection::vec("[a-z]{1,8}", 0..4),
        offset in 1i64..1000,
        negative in i64::MIN..=0,
    ) {
        let mut doc = fixture();
        doc.content.variants.headlines = headlines.clone();
        doc.content.variants.ctas = ctas.clone();
        let beyond = (headlines.len().max(ctas.len()) as i64) + offset;

        for id in [negative, beyond] {
            let copy = resolve_variant(&doc.content, id);
            prop_assert_eq!(&copy.headline, &doc.content.hero.headline);
            prop_assert_eq!(&copy.cta_text, &doc.content.hero.cta_text);
        }
    }

    #[test]
    fn fields_resolve_independently(
        headlines in prop::collection::vec("[a-z]{1,8}", 1..6),
        ctas in prop::collection::vec("[a-z]{1,8}", 0..6),
        pick in 0usize..6,
    ) {
        let mut doc = fixture();
        doc.content.variants.headlines = headlines.clone();
        doc.content.variants.ctas = ctas.clone();
        let id = (pick % headlines.len()) as i64 + 1;
        let idx = (id - 1) as usize;

        let copy = resolve_variant(&doc.content, id);
        prop_assert_eq!(&copy.headline, &headlines[idx]);
        match ctas.get(idx) {
            Some(cta) => prop_assert_eq!(&copy.cta_text, cta),
            None => prop_assert_eq!(&copy.cta_text, &doc.content.hero.cta_text),
        }
    }
}
