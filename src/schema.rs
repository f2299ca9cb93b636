//! Canonical Document Model
//!
//! The single versioned record shared by every stage and consumed by the
//! renderer. Values are immutable once attached to a document; builders
//! consume and return new values instead of mutating in place.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ErrorCode, PipelineError};

/// Version of the canonical schema this build understands.
pub const SCHEMA_VERSION: &str = "1.2.1";

/// Web fonts the templates know how to load.
pub const ALLOWED_FONTS: &[&str] = &[
    "Inter", "Roboto", "Open Sans", "Lato", "Montserrat", "Poppins",
    "Source Sans Pro", "Nunito", "Raleway", "Work Sans", "DM Sans",
    "Plus Jakarta Sans", "Space Grotesk", "Outfit", "Sora",
    "Playfair Display", "Merriweather", "Lora", "Crimson Text",
];

/// Feature icon identifiers with a known glyph.
pub const ALLOWED_ICONS: &[&str] = &[
    "rocket", "shield", "zap", "star", "heart", "check", "lightning",
    "chart", "users", "clock", "lock", "globe", "mail", "phone",
    "settings", "layers", "target", "trending", "award", "briefcase",
];

fn default_true() -> bool { true }

fn default_schema_version() -> String { SCHEMA_VERSION.to_string() }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Bold,
    Minimal,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Professional, Tone::Friendly, Tone::Bold, Tone::Minimal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Bold => "bold",
            Tone::Minimal => "minimal",
        }
    }

    pub fn preset(&self) -> TonePreset {
        match self {
            Tone::Professional => TonePreset {
                style: "Clear, authoritative, trust-building",
                copy_rules: "Use formal language, focus on ROI and business outcomes, include data when possible",
                cta_style: "Action-oriented but measured (e.g., 'Get Started', 'Request Demo')",
                visual_style: "clean, corporate, trustworthy, blue tones",
            },
            Tone::Friendly => TonePreset {
                style: "Warm, conversational, approachable",
                copy_rules: "Use casual language, contractions allowed, speak directly to the reader",
                cta_style: "Inviting and low-pressure (e.g., 'Try it free', 'See how it works')",
                visual_style: "warm, colorful, welcoming, soft gradients",
            },
            Tone::Bold => TonePreset {
                style: "Direct, punchy, high-impact",
                copy_rules: "Short sentences. Strong verbs. No fluff. Create urgency.",
                cta_style: "Commanding and urgent (e.g., 'Start Now', 'Claim Your Spot')",
                visual_style: "high contrast, dynamic, striking, vibrant colors",
            },
            Tone::Minimal => TonePreset {
                style: "Elegant, understated, sophisticated",
                copy_rules: "Less is more. Remove unnecessary words. Let whitespace breathe.",
                cta_style: "Subtle and refined (e.g., 'Explore', 'Learn more', 'Begin')",
                visual_style: "simple, elegant, lots of whitespace, monochrome accents",
            },
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy guidance attached to a tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TonePreset {
    pub style: &'static str,
    pub copy_rules: &'static str,
    pub cta_style: &'static str,
    pub visual_style: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[default]
    Saas,
    App,
    Agency,
}

impl TemplateType {
    pub const ALL: [TemplateType; 3] = [TemplateType::Saas, TemplateType::App, TemplateType::Agency];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Saas => "saas",
            TemplateType::App => "app",
            TemplateType::Agency => "agency",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                PipelineError::render(
                    ErrorCode::TemplateNotFound,
                    format!("Template not found: {}", s),
                )
                .with_detail("template_type", s)
            })
    }
}

// --- Meta ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub generated_at: String,
    #[serde(default)]
    pub pipeline_steps: Vec<String>,
}

impl Meta {
    /// Fresh metadata stamped with the current time and no executed steps
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            pipeline_steps: vec![],
        }
    }

    pub fn with_step(mut self, step: &str) -> Self {
        self.pipeline_steps.push(step.to_string());
        self
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

// --- Onboarding ---

/// Raw product input fed to the onboarding stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub product_name: String,
    pub target_audience: String,
    pub value_proposition: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub additional_context: String,
    #[serde(default)]
    pub template_type: TemplateType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub product_name: String,
    pub tagline: String,
    pub description: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub value_proposition: String,
    pub tone: Tone,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ProjectInfo {
    /// Keywords trimmed, lowercased, blanks dropped
    pub fn normalized(self) -> Self {
        let keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords, ..self }
    }
}

// --- Brand ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl ColorPalette {
    pub const ROLES: [&'static str; 5] = ["primary", "secondary", "accent", "background", "text"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typography {
    pub heading: String,
    pub body: String,
}

impl Typography {
    pub const ROLES: [&'static str; 2] = ["heading", "body"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandIdentity {
    pub colors: ColorPalette,
    pub fonts: Typography,
    #[serde(default)]
    pub tone_rules: Vec<String>,
}

// --- Landing ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub headline: String,
    pub subheadline: String,
    pub cta_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    pub quote: String,
    pub author: String,
    pub role: String,
}

/// Alternate headlines and CTAs. Variant `k` reads index `k - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variants {
    #[serde(default)]
    pub headlines: Vec<String>,
    #[serde(default)]
    pub ctas: Vec<String>,
}

impl Variants {
    /// Highest variant id that resolves at least one field from the lists
    pub fn max_variant_id(&self) -> usize {
        self.headlines.len().max(self.ctas.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    FeatureGrid,
    Stats,
    Pricing,
    Faq,
    Logos,
    Screenshots,
}

impl SectionKey {
    pub const ALL: [SectionKey; 6] = [
        SectionKey::FeatureGrid,
        SectionKey::Stats,
        SectionKey::Pricing,
        SectionKey::Faq,
        SectionKey::Logos,
        SectionKey::Screenshots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::FeatureGrid => "feature_grid",
            SectionKey::Stats => "stats",
            SectionKey::Pricing => "pricing",
            SectionKey::Faq => "faq",
            SectionKey::Logos => "logos",
            SectionKey::Screenshots => "screenshots",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        SectionKey::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// One flag per recognized optional section; unknown keys fail to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionsConfig {
    #[serde(default = "default_true")]
    pub feature_grid: bool,
    #[serde(default = "default_true")]
    pub stats: bool,
    #[serde(default)]
    pub pricing: bool,
    #[serde(default)]
    pub faq: bool,
    #[serde(default)]
    pub logos: bool,
    #[serde(default)]
    pub screenshots: bool,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            feature_grid: true,
            stats: true,
            pricing: false,
            faq: false,
            logos: false,
            screenshots: false,
        }
    }
}

impl SectionsConfig {
    /// Sections a freshly generated page starts with, per archetype
    pub fn for_template(template: TemplateType) -> Self {
        let none = Self {
            feature_grid: true,
            stats: false,
            pricing: false,
            faq: false,
            logos: false,
            screenshots: false,
        };
        match template {
            TemplateType::Saas => Self { faq: true, logos: true, ..none },
            TemplateType::App => Self { stats: true, screenshots: true, ..none },
            TemplateType::Agency => none,
        }
    }

    pub fn is_enabled(&self, key: SectionKey) -> bool {
        match key {
            SectionKey::FeatureGrid => self.feature_grid,
            SectionKey::Stats => self.stats,
            SectionKey::Pricing => self.pricing,
            SectionKey::Faq => self.faq,
            SectionKey::Logos => self.logos,
            SectionKey::Screenshots => self.screenshots,
        }
    }

    pub fn enabled_sections(&self) -> Vec<SectionKey> {
        SectionKey::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingContent {
    pub hero: Hero,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testimonial: Option<Testimonial>,
    #[serde(default)]
    pub footer_cta: String,
    #[serde(default)]
    pub variants: Variants,
    #[serde(default)]
    pub sections: SectionsConfig,
    #[serde(default)]
    pub faq_items: Vec<FaqItem>,
    #[serde(default)]
    pub pricing_plans: Vec<PricingPlan>,
    #[serde(default)]
    pub stats: Vec<Stat>,
    #[serde(default)]
    pub logos: Vec<Logo>,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
}

// --- Assets ---

/// Image prompts carried through to downstream tooling; never rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image_alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub screenshot_prompts: Vec<String>,
}

// --- Render selection ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderSelector {
    #[serde(default)]
    pub template_type: TemplateType,
    #[serde(default)]
    pub variant_id: i64,
}

impl RenderSelector {
    pub fn new(template_type: TemplateType, variant_id: i64) -> Self {
        Self { template_type, variant_id }
    }

    /// Output key used for file naming, e.g. `saas_v0`
    pub fn key(&self) -> String {
        format!("{}_v{}", self.template_type, self.variant_id)
    }
}

// --- Aggregate ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    pub meta: Meta,
    pub project: ProjectInfo,
    pub brand: BrandIdentity,
    pub content: LandingContent,
    pub assets: Assets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderSelector>,
}

impl CanonicalDocument {
    /// Selector persisted with the document, or the default one
    pub fn selector(&self) -> RenderSelector {
        self.render.unwrap_or_default()
    }

    pub fn with_render(self, selector: RenderSelector) -> Self {
        Self { render: Some(selector), ..self }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
