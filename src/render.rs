//! Rendering Engine - Pure Function From Document to Markup
//!
//! `(CanonicalDocument, RenderSelector) -> markup`. No clock, no randomness,
//! no I/O: identical inputs give byte-identical output.

use rayon::prelude::*;
use serde::Serialize;
use tera::Context;
use tracing::{debug, info, warn};

use crate::errors::{ErrorCode, PipelineError};
use crate::hashing::sha256_hex;
use crate::schema::{
    CanonicalDocument, FaqItem, LandingContent, Logo, PricingPlan, RenderSelector, Screenshot,
    SectionKey, Stat, TemplateType, Testimonial,
};
use crate::templates::{icon_glyph, TemplateRegistry, ToneStyle};
use crate::ENGINE_VERSION;

/// Where a resolved headline or CTA came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopySource {
    Default,
    Variant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCopy {
    pub headline: String,
    pub cta_text: String,
    pub headline_source: CopySource,
    pub cta_source: CopySource,
}

/// Variant `k >= 1` reads index `k - 1`; anything unresolvable uses the default.
fn pick(default: &str, variants: &[String], variant_id: i64) -> (String, CopySource) {
    let from_variant = (variant_id >= 1)
        .then(|| usize::try_from(variant_id - 1).ok())
        .flatten()
        .and_then(|idx| variants.get(idx));

    match from_variant {
        Some(value) => (value.clone(), CopySource::Variant),
        None => (default.to_string(), CopySource::Default),
    }
}

/// Headline and CTA resolve independently of each other
pub fn resolve_variant(content: &LandingContent, variant_id: i64) -> ResolvedCopy {
    let (headline, headline_source) = pick(&content.hero.headline, &content.variants.headlines, variant_id);
    let (cta_text, cta_source) = pick(&content.hero.cta_text, &content.variants.ctas, variant_id);
    ResolvedCopy { headline, cta_text, headline_source, cta_source }
}

/// Render outcome for one optional section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum SectionState<T> {
    Omitted,
    Placeholder,
    Populated(Vec<T>),
}

impl<T> SectionState<T> {
    pub fn outcome(&self) -> SectionOutcome {
        match self {
            SectionState::Omitted => SectionOutcome::Omitted,
            SectionState::Placeholder => SectionOutcome::Placeholder,
            SectionState::Populated(_) => SectionOutcome::Populated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOutcome {
    Omitted,
    Placeholder,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureView {
    pub title: String,
    pub description: String,
    pub glyph: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSections {
    pub feature_grid: SectionState<FeatureView>,
    pub stats: SectionState<Stat>,
    pub pricing: SectionState<PricingPlan>,
    pub faq: SectionState<FaqItem>,
    pub logos: SectionState<Logo>,
    pub screenshots: SectionState<Screenshot>,
}

impl ResolvedSections {
    pub fn outcome(&self, key: SectionKey) -> SectionOutcome {
        match key {
            SectionKey::FeatureGrid => self.feature_grid.outcome(),
            SectionKey::Stats => self.stats.outcome(),
            SectionKey::Pricing => self.pricing.outcome(),
            SectionKey::Faq => self.faq.outcome(),
            SectionKey::Logos => self.logos.outcome(),
            SectionKey::Screenshots => self.screenshots.outcome(),
        }
    }
}

/// Enabled + items → populated, enabled + empty → placeholder, disabled → omitted.
/// Items of an enabled section must carry their text fields.
fn resolve_one<T: Clone, V>(
    key: SectionKey,
    enabled: bool,
    items: &[T],
    fields: impl Fn(&T) -> Vec<(&'static str, &str)>,
    view: impl Fn(&T) -> V,
) -> Result<SectionState<V>, PipelineError> {
    if !enabled {
        return Ok(SectionState::Omitted);
    }
    if items.is_empty() {
        return Ok(SectionState::Placeholder);
    }
    for (index, item) in items.iter().enumerate() {
        if let Some((field, _)) = fields(item).into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(PipelineError::render(
                ErrorCode::InvalidSectionData,
                format!("{} item {} has an empty {}", key.as_str(), index, field),
            )
            .with_detail("section", key.as_str())
            .with_detail("index", index)
            .with_detail("field", field));
        }
    }
    Ok(SectionState::Populated(items.iter().map(view).collect()))
}

pub fn resolve_sections(content: &LandingContent) -> Result<ResolvedSections, PipelineError> {
    let flags = &content.sections;
    Ok(ResolvedSections {
        feature_grid: resolve_one(
            SectionKey::FeatureGrid,
            flags.feature_grid,
            &content.features,
            |f| vec![("title", f.title.as_str())],
            |f| FeatureView {
                title: f.title.clone(),
                description: f.description.clone(),
                glyph: icon_glyph(&f.icon),
            },
        )?,
        stats: resolve_one(
            SectionKey::Stats,
            flags.stats,
            &content.stats,
            |s| vec![("value", s.value.as_str()), ("label", s.label.as_str())],
            Stat::clone,
        )?,
        pricing: resolve_one(
            SectionKey::Pricing,
            flags.pricing,
            &content.pricing_plans,
            |p| vec![("name", p.name.as_str()), ("price", p.price.as_str())],
            PricingPlan::clone,
        )?,
        faq: resolve_one(
            SectionKey::Faq,
            flags.faq,
            &content.faq_items,
            |q| vec![("question", q.question.as_str()), ("answer", q.answer.as_str())],
            FaqItem::clone,
        )?,
        logos: resolve_one(
            SectionKey::Logos,
            flags.logos,
            &content.logos,
            |l| vec![("name", l.name.as_str())],
            Logo::clone,
        )?,
        screenshots: resolve_one(
            SectionKey::Screenshots,
            flags.screenshots,
            &content.screenshots,
            |s| vec![("caption", s.caption.as_str())],
            Screenshot::clone,
        )?,
    })
}

#[derive(Serialize)]
struct PageInfo {
    template: TemplateType,
    variant_id: i64,
    engine: &'static str,
}

#[derive(Serialize)]
struct HeroView<'a> {
    headline: &'a str,
    subheadline: &'a str,
    cta_text: &'a str,
}

fn build_context(
    doc: &CanonicalDocument,
    selector: RenderSelector,
    copy: &ResolvedCopy,
    sections: &ResolvedSections,
) -> Context {
    let testimonial: Option<&Testimonial> = doc.content.testimonial.as_ref();
    let mut context = Context::new();
    context.insert("page", &PageInfo {
        template: selector.template_type,
        variant_id: selector.variant_id,
        engine: ENGINE_VERSION,
    });
    context.insert("meta", &doc.meta);
    context.insert("project", &doc.project);
    context.insert("brand", &doc.brand);
    context.insert("tone", doc.project.tone.as_str());
    context.insert("tone_style", &ToneStyle::for_tone(doc.project.tone));
    context.insert("hero", &HeroView {
        headline: &copy.headline,
        subheadline: &doc.content.hero.subheadline,
        cta_text: &copy.cta_text,
    });
    context.insert("sections", sections);
    context.insert("testimonial", &testimonial);
    context.insert("footer_cta", &doc.content.footer_cta);
    context
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    pub selector: RenderSelector,
    #[serde(skip)]
    pub html: String,
    pub hash: String,
}

impl RenderedPage {
    pub fn key(&self) -> String {
        self.selector.key()
    }

    pub fn file_name(&self) -> String {
        format!("{}.html", self.key())
    }
}

/// Result of rendering every combination; failures never stop siblings
#[derive(Debug, Default)]
pub struct RenderBatch {
    pub pages: Vec<RenderedPage>,
    pub failures: Vec<(RenderSelector, PipelineError)>,
}

impl RenderBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn page(&self, selector: RenderSelector) -> Option<&RenderedPage> {
        self.pages.iter().find(|p| p.selector == selector)
    }
}

/// The rendering engine; holds only its immutable template registry
pub struct Renderer {
    registry: TemplateRegistry,
}

impl Renderer {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn builtin() -> Result<Self, PipelineError> {
        Ok(Self::new(TemplateRegistry::builtin()?))
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn render(&self, doc: &CanonicalDocument, selector: RenderSelector) -> Result<RenderedPage, PipelineError> {
        if self.registry.get(selector.template_type).is_none() {
            return Err(PipelineError::render(
                ErrorCode::TemplateNotFound,
                format!("Template not registered: {}", selector.template_type),
            )
            .with_detail("template_type", selector.template_type.as_str()));
        }

        let copy = resolve_variant(&doc.content, selector.variant_id);
        if selector.variant_id != 0
            && copy.headline_source == CopySource::Default
            && copy.cta_source == CopySource::Default
        {
            warn!(variant_id = selector.variant_id, "variant out of range, using default copy");
        }

        if copy.headline.trim().is_empty() || copy.cta_text.trim().is_empty() {
            return Err(PipelineError::render(
                ErrorCode::MissingContent,
                "Resolved hero copy is empty",
            )
            .with_detail("template_type", selector.template_type.as_str())
            .with_detail("variant_id", selector.variant_id));
        }

        let sections = resolve_sections(&doc.content)
            .map_err(|e| e.with_detail("template_type", selector.template_type.as_str()))?;
        let context = build_context(doc, selector, &copy, &sections);
        let html = self.registry.render(selector.template_type, &context)?;
        let hash = sha256_hex(html.as_bytes());

        debug!(
            template = %selector.template_type,
            variant_id = selector.variant_id,
            tone = %doc.project.tone,
            sections = ?doc.content.sections.enabled_sections(),
            hash = %hash,
            "rendered page"
        );

        Ok(RenderedPage { selector, html, hash })
    }

    /// Render by template name; unknown names fail with E301
    pub fn render_named(
        &self,
        doc: &CanonicalDocument,
        template: &str,
        variant_id: i64,
    ) -> Result<RenderedPage, PipelineError> {
        let template_type: TemplateType = template.parse()?;
        self.render(doc, RenderSelector::new(template_type, variant_id))
    }

    /// Every registered template × variant ids `0..=max(len(headlines), len(ctas))`
    pub fn selectors_for(&self, doc: &CanonicalDocument) -> Vec<RenderSelector> {
        let max_variant = doc.content.variants.max_variant_id() as i64;
        self.registry
            .list()
            .into_iter()
            .flat_map(|t| (0..=max_variant).map(move |v| RenderSelector::new(t.template_type, v)))
            .collect()
    }

    pub fn render_all(&self, doc: &CanonicalDocument) -> RenderBatch {
        let selectors = self.selectors_for(doc);
        info!(
            templates = self.registry.list().len(),
            variants = doc.content.variants.max_variant_id() + 1,
            "rendering all variants"
        );

        let results: Vec<(RenderSelector, Result<RenderedPage, PipelineError>)> = selectors
            .into_par_iter()
            .map(|selector| (selector, self.render(doc, selector)))
            .collect();

        let mut batch = RenderBatch::default();
        for (selector, result) in results {
            match result {
                Ok(page) => batch.pages.push(page),
                Err(e) => {
                    warn!(key = %selector.key(), error = %e, "render failed");
                    batch.failures.push((selector, e));
                }
            }
        }
        info!(rendered = batch.pages.len(), failed = batch.failures.len(), "render pass complete");
        batch
    }
}
