//! Generation Stages - Typed Contracts Around the Content Service
//!
//! Each stage turns a typed input slice into a validated output slice. The
//! raw reply is cleaned, parsed and run through the model's section validator
//! before anything is returned; a reply that fails validation is reported, not
//! retried.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{ErrorCode, PipelineError};
use crate::llm::{extract_json, generate_with_retry, ContentGenerator, GeneratorError, RetryPolicy};
use crate::schema::{
    Assets, BrandIdentity, LandingContent, ProjectInfo, SectionsConfig, TemplateType, UserInput,
    ALLOWED_ICONS,
};
use crate::validation::{validate_brand, validate_content, validate_project};

/// One step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Step name recorded in `meta.pipeline_steps`
    fn name(&self) -> &'static str;

    async fn run(&self, input: &Self::Input) -> Result<Self::Output, PipelineError>;
}

/// Shared access to the content service
#[derive(Clone)]
pub struct StageClient {
    generator: Arc<dyn ContentGenerator>,
    retry: RetryPolicy,
}

impl StageClient {
    pub fn new(generator: Arc<dyn ContentGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Prompt → cleaned, parsed JSON value. Failures are tagged with the stage.
    async fn request(&self, stage: &'static str, code: ErrorCode, prompt: &str) -> Result<Value, PipelineError> {
        let raw = generate_with_retry(self.generator.as_ref(), prompt, self.retry)
            .await
            .map_err(|e| classify(stage, code, e))?;

        let cleaned = extract_json(&raw);
        serde_json::from_str(cleaned).map_err(|e| {
            let preview: String = raw.chars().take(200).collect();
            PipelineError::generation(
                ErrorCode::MalformedResponse,
                stage,
                format!("{} reply is not valid JSON: {}", stage, e),
            )
            .with_detail("response_preview", preview)
        })
    }
}

fn classify(stage: &'static str, code: ErrorCode, err: GeneratorError) -> PipelineError {
    let code = match &err {
        GeneratorError::Timeout => ErrorCode::GenerationTimeout,
        GeneratorError::Malformed(_) => ErrorCode::MalformedResponse,
        GeneratorError::NotConfigured(_) => ErrorCode::GenerationFailed,
        _ => code,
    };
    let mut error = PipelineError::generation(code, stage, err.to_string());
    if let GeneratorError::Status { status, .. } = &err {
        error = error.with_detail("status", *status);
    }
    error.with_detail("transient", err.is_transient())
}

/// Validation failures keep their E1xx code but name the stage that produced them
fn tag_stage(stage: &'static str) -> impl Fn(PipelineError) -> PipelineError {
    move |e| e.at_step(stage).with_detail("stage", stage)
}

fn fill_missing(value: &mut Value, key: &str, fallback: &str) {
    if let Value::Object(map) = value {
        let blank = map
            .get(key)
            .map(|v| v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty()))
            .unwrap_or(true);
        if blank {
            map.insert(key.to_string(), Value::String(fallback.to_string()));
        }
    }
}

// --- Onboarding ---

pub struct OnboardingStage {
    client: StageClient,
}

impl OnboardingStage {
    pub fn new(client: StageClient) -> Self {
        Self { client }
    }
}

pub fn onboarding_prompt(input: &UserInput) -> String {
    let context = if input.additional_context.trim().is_empty() {
        "None"
    } else {
        input.additional_context.as_str()
    };
    format!(
        r#"You are an expert SaaS copywriter and marketing specialist.

Based on the following product information, generate marketing data:

- Product: {name}
- Target audience: {audience}
- Value proposition: {value}
- Desired tone: {tone}
- Additional context: {context}

Generate a JSON with EXACTLY this structure (replace values with your creations):

{{
  "product_name": "{name}",
  "tagline": "A catchy tagline of 6 words max",
  "description": "Enriched description of 2-3 sentences focused on user benefits",
  "target_audience": "{audience}",
  "value_proposition": "{value}",
  "tone": "{tone}",
  "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"]
}}

Respond ONLY with the JSON, no explanation."#,
        name = input.product_name,
        audience = input.target_audience,
        value = input.value_proposition,
        tone = input.tone,
        context = context,
    )
}

#[async_trait]
impl Stage for OnboardingStage {
    type Input = UserInput;
    type Output = ProjectInfo;

    fn name(&self) -> &'static str {
        "onboarding"
    }

    async fn run(&self, input: &UserInput) -> Result<ProjectInfo, PipelineError> {
        let mut value = self
            .client
            .request(self.name(), ErrorCode::OnboardingFailed, &onboarding_prompt(input))
            .await?;

        fill_missing(&mut value, "product_name", &input.product_name);
        fill_missing(&mut value, "target_audience", &input.target_audience);
        fill_missing(&mut value, "value_proposition", &input.value_proposition);
        fill_missing(&mut value, "tone", input.tone.as_str());

        validate_project(&value).map_err(tag_stage(self.name()))
    }
}

// --- Brand ---

pub struct BrandStage {
    client: StageClient,
}

impl BrandStage {
    pub fn new(client: StageClient) -> Self {
        Self { client }
    }
}

pub fn brand_prompt(project: &ProjectInfo) -> String {
    format!(
        r##"You are an expert UI/UX designer and branding specialist.

Create a brand identity for this product:

- Product: {name}
- Tagline: {tagline}
- Audience: {audience}
- Tone: {tone} (friendly=warm, professional=corporate, bold=daring, minimal=clean)

Generate a JSON with EXACTLY this structure:

{{
  "colors": {{
    "primary": "#HEX main brand color",
    "secondary": "#HEX secondary color",
    "accent": "#HEX accent/CTA color",
    "background": "#HEX light background",
    "text": "#HEX dark text color"
  }},
  "fonts": {{
    "heading": "Google Font name for headings",
    "body": "Google Font name for body text"
  }},
  "tone_rules": [
    "Tone rule 1",
    "Tone rule 2",
    "Tone rule 3"
  ]
}}

Respond ONLY with the JSON, no explanation."##,
        name = project.product_name,
        tagline = project.tagline,
        audience = project.target_audience,
        tone = project.tone,
    )
}

#[async_trait]
impl Stage for BrandStage {
    type Input = ProjectInfo;
    type Output = BrandIdentity;

    fn name(&self) -> &'static str {
        "brand"
    }

    async fn run(&self, project: &ProjectInfo) -> Result<BrandIdentity, PipelineError> {
        let value = self
            .client
            .request(self.name(), ErrorCode::BrandFailed, &brand_prompt(project))
            .await?;
        validate_brand(&value).map_err(tag_stage(self.name()))
    }
}

// --- Landing ---

#[derive(Debug, Clone)]
pub struct LandingInput {
    pub project: ProjectInfo,
    pub brand: BrandIdentity,
    pub template_type: TemplateType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingOutput {
    pub content: LandingContent,
    pub assets: Assets,
}

pub struct LandingStage {
    client: StageClient,
}

impl LandingStage {
    pub fn new(client: StageClient) -> Self {
        Self { client }
    }
}

pub fn landing_prompt(input: &LandingInput) -> String {
    let project = &input.project;
    let preset = project.tone.preset();
    let brand_rules = if input.brand.tone_rules.is_empty() {
        String::new()
    } else {
        format!("\nAdditional brand tone rules: {}", input.brand.tone_rules.join(", "))
    };
    let mut icons: Vec<&str> = ALLOWED_ICONS.to_vec();
    icons.sort_unstable();

    format!(
        r#"You are an expert landing page copywriter for SaaS products.

Create landing page content for:

- Product: {name}
- Tagline: {tagline}
- Description: {description}
- Value proposition: {value}
- Target audience: {audience}

TONE PRESET: {tone}
- Style: {style}
- Copy rules: {copy_rules}
- CTA style: {cta_style}{brand_rules}

Available icons (use ONLY these): {icons}

Generate a JSON with EXACTLY this structure:

{{
  "hero": {{
    "headline": "Catchy and impactful headline (max 10 words)",
    "subheadline": "Explanatory subtitle of 1-2 sentences (max 200 chars)",
    "cta_text": "Call-to-action button text (2-4 words)"
  }},
  "features": [
    {{"title": "Feature 1 (2-4 words)", "description": "Benefit-focused description (max 100 chars)", "icon": "rocket"}},
    {{"title": "Feature 2", "description": "Short description", "icon": "shield"}},
    {{"title": "Feature 3", "description": "Short description", "icon": "zap"}}
  ],
  "testimonial": {{
    "quote": "Realistic fictional customer testimonial (1-2 sentences)",
    "author": "First Last",
    "role": "Position, Company Name"
  }},
  "footer_cta": "Final call-to-action phrase (max 10 words)",
  "variants": {{
    "headlines": ["Alternative headline 1", "Alternative headline 2"],
    "ctas": ["Alternative CTA 1", "Alternative CTA 2"]
  }},
  "faq_items": [
    {{"question": "Common question 1?", "answer": "Clear, helpful answer"}},
    {{"question": "Common question 2?", "answer": "Clear, helpful answer"}},
    {{"question": "Common question 3?", "answer": "Clear, helpful answer"}}
  ]
}}

IMPORTANT:
- Use icons ONLY from the provided list
- STRICTLY follow the {tone} tone preset guidelines
- Keep all text concise and benefit-focused
- Variants should offer genuinely different approaches, not just synonyms

Respond ONLY with the JSON, no explanation."#,
        name = project.product_name,
        tagline = project.tagline,
        description = project.description,
        value = project.value_proposition,
        audience = project.target_audience,
        tone = project.tone.as_str().to_uppercase(),
        style = preset.style,
        copy_rules = preset.copy_rules,
        cta_style = preset.cta_style,
        brand_rules = brand_rules,
        icons = icons.join(", "),
    )
}

/// Image prompts derived from product name and tone; no service call
pub fn asset_prompts(project: &ProjectInfo) -> Assets {
    let product = &project.product_name;
    let visual = project.tone.preset().visual_style;
    Assets {
        hero_image_prompt: Some(format!(
            "Modern {} dashboard interface, {}, UI mockup, 16:9 aspect ratio",
            product, visual
        )),
        hero_image_alt: Some(format!("{} application interface preview", product)),
        og_image_prompt: Some(format!(
            "{} logo on gradient background, {}, social media card, 1200x630",
            product, visual
        )),
        logo_url: None,
        screenshot_prompts: vec![
            format!("{} main dashboard view, {}", product, visual),
            format!("{} feature highlight, {}", product, visual),
        ],
    }
}

#[async_trait]
impl Stage for LandingStage {
    type Input = LandingInput;
    type Output = LandingOutput;

    fn name(&self) -> &'static str {
        "landing"
    }

    async fn run(&self, input: &LandingInput) -> Result<LandingOutput, PipelineError> {
        let mut value = self
            .client
            .request(self.name(), ErrorCode::LandingFailed, &landing_prompt(input))
            .await?;

        // section flags come from the template, never from the reply
        let sections = serde_json::to_value(SectionsConfig::for_template(input.template_type))
            .map_err(|e| PipelineError::generation(ErrorCode::LandingFailed, self.name(), e.to_string()))?;
        match &mut value {
            Value::Object(map) => {
                map.insert("sections".to_string(), sections);
            }
            _ => {
                return Err(PipelineError::generation(
                    ErrorCode::MalformedResponse,
                    self.name(),
                    "landing reply is not a JSON object",
                ));
            }
        }

        let content = validate_content(&value).map_err(tag_stage(self.name()))?;
        debug!(
            template = %input.template_type,
            features = content.features.len(),
            headlines = content.variants.headlines.len(),
            ctas = content.variants.ctas.len(),
            "landing content accepted"
        );

        Ok(LandingOutput {
            content,
            assets: asset_prompts(&input.project),
        })
    }
}
