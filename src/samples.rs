//! Built-in sample inputs for exercising the full pipeline

use crate::errors::{ErrorCode, PipelineError};
use crate::schema::{TemplateType, Tone, UserInput};

#[derive(Debug, Clone)]
pub struct Sample {
    pub label: &'static str,
    pub input: UserInput,
}

fn sample(
    label: &'static str,
    product_name: &str,
    target_audience: &str,
    value_proposition: &str,
    tone: Tone,
    additional_context: &str,
    template_type: TemplateType,
) -> Sample {
    Sample {
        label,
        input: UserInput {
            product_name: product_name.to_string(),
            target_audience: target_audience.to_string(),
            value_proposition: value_proposition.to_string(),
            tone,
            additional_context: additional_context.to_string(),
            template_type,
        },
    }
}

pub fn builtin() -> Vec<Sample> {
    vec![
        sample(
            "productivity tool",
            "FlowTask",
            "Freelancers and small teams",
            "Save 2 hours a day with AI",
            Tone::Friendly,
            "",
            TemplateType::Agency,
        ),
        sample(
            "enterprise data platform",
            "DataVault",
            "CIOs and data teams at large enterprises",
            "Secure and centralize your sensitive data with GDPR compliance",
            Tone::Professional,
            "On-premise solution available, ISO 27001 certified",
            TemplateType::Agency,
        ),
        sample(
            "fitness app",
            "FitPulse",
            "Urban millennial athletes",
            "The fitness app that adapts to your lifestyle",
            Tone::Bold,
            "Gamification, social features, wearables integration",
            TemplateType::Saas,
        ),
        sample(
            "developer utility",
            "Clipp",
            "Developers and power users",
            "Minimalist and powerful clipboard manager",
            Tone::Minimal,
            "Cross-platform, keyboard-first, open source",
            TemplateType::Saas,
        ),
        sample(
            "creative studio",
            "StudioNova",
            "Startups and scale-ups looking for premium branding",
            "Transform your brand into an unforgettable experience",
            Tone::Professional,
            "Full-service creative agency, branding, web design, motion",
            TemplateType::Agency,
        ),
    ]
}

/// `"all"` or a 1-based sample number
pub fn select(selector: &str) -> Result<Vec<Sample>, PipelineError> {
    let all = builtin();
    let selector = selector.trim();
    if selector.eq_ignore_ascii_case("all") {
        return Ok(all);
    }

    let count = all.len();
    let invalid = || {
        PipelineError::new(
            ErrorCode::InvalidFieldType,
            format!("Invalid example selector {:?}: use 1-{} or all", selector, count),
        )
        .at_step("input")
        .with_detail("selector", selector)
    };

    let index: usize = selector.parse().map_err(|_| invalid())?;
    if index == 0 || index > count {
        return Err(invalid());
    }
    Ok(all.into_iter().skip(index - 1).take(1).collect())
}

/// Directory name for a product: lowercase, spaces to underscores
pub fn product_slug(product_name: &str) -> String {
    product_name.trim().to_lowercase().replace(' ', "_")
}
