//! Template System - Closed Registry of Page Archetypes
//!
//! The registry is built once and handed to the renderer; nothing reads
//! templates from process-wide state.

use serde::Serialize;
use std::error::Error as _;
use std::collections::BTreeMap;
use tera::{Context, Tera};

use crate::errors::{ErrorCode, PipelineError};
use crate::schema::{TemplateType, Tone};

const BASE_HTML: &str = include_str!("../templates/base.html");
const SECTIONS_HTML: &str = include_str!("../templates/partials/sections.html");
const SAAS_HTML: &str = include_str!("../templates/saas.html");
const APP_HTML: &str = include_str!("../templates/app.html");
const AGENCY_HTML: &str = include_str!("../templates/agency.html");

/// Glyph used when a feature icon has no mapping
pub const DEFAULT_ICON: &str = "✦";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pub template_type: TemplateType,
    pub file: &'static str,
    pub description: &'static str,
}

impl PageTemplate {
    fn builtin(template_type: TemplateType) -> Self {
        match template_type {
            TemplateType::Saas => Self {
                template_type,
                file: "saas.html",
                description: "Centered hero, logo strip, feature grid and FAQ for software products",
            },
            TemplateType::App => Self {
                template_type,
                file: "app.html",
                description: "Gradient hero with store badges and screenshots for mobile apps",
            },
            TemplateType::Agency => Self {
                template_type,
                file: "agency.html",
                description: "Editorial layout with fixed navigation for studios and agencies",
            },
        }
    }

    fn source(&self) -> &'static str {
        match self.template_type {
            TemplateType::Saas => SAAS_HTML,
            TemplateType::App => APP_HTML,
            TemplateType::Agency => AGENCY_HTML,
        }
    }
}

/// CSS classes applied per tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToneStyle {
    pub hero_size: &'static str,
    pub cta_style: &'static str,
}

impl ToneStyle {
    pub fn for_tone(tone: Tone) -> Self {
        match tone {
            Tone::Professional => Self {
                hero_size: "text-5xl md:text-6xl",
                cta_style: "rounded-lg",
            },
            Tone::Friendly => Self {
                hero_size: "text-4xl md:text-5xl",
                cta_style: "rounded-full",
            },
            Tone::Bold => Self {
                hero_size: "text-6xl md:text-7xl font-black",
                cta_style: "rounded-none uppercase tracking-wider",
            },
            Tone::Minimal => Self {
                hero_size: "text-4xl md:text-5xl font-light",
                cta_style: "rounded-sm border",
            },
        }
    }
}

pub fn icon_glyph(icon: &str) -> &'static str {
    match icon.trim().to_lowercase().as_str() {
        "rocket" => "🚀",
        "shield" => "🛡️",
        "zap" | "lightning" => "⚡",
        "star" => "⭐",
        "heart" => "❤️",
        "check" => "✓",
        "chart" => "📊",
        "users" => "👥",
        "clock" => "⏰",
        "lock" => "🔒",
        "globe" => "🌐",
        "mail" => "✉️",
        "phone" => "📱",
        "settings" => "⚙️",
        "layers" => "📚",
        "target" => "🎯",
        "trending" => "📈",
        "award" => "🏆",
        "briefcase" => "💼",
        _ => DEFAULT_ICON,
    }
}

/// Template registry - immutable once built
pub struct TemplateRegistry {
    tera: Tera,
    templates: BTreeMap<TemplateType, PageTemplate>,
}

impl TemplateRegistry {
    /// Registry holding every built-in archetype
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::with_templates(&TemplateType::ALL)
    }

    /// Registry holding only the given archetypes
    pub fn with_templates(types: &[TemplateType]) -> Result<Self, PipelineError> {
        let templates: BTreeMap<TemplateType, PageTemplate> = types
            .iter()
            .map(|t| (*t, PageTemplate::builtin(*t)))
            .collect();

        let mut sources = vec![
            ("base.html", BASE_HTML),
            ("partials/sections.html", SECTIONS_HTML),
        ];
        sources.extend(templates.values().map(|t| (t.file, t.source())));

        let mut tera = Tera::default();
        tera.add_raw_templates(sources).map_err(|e| {
            PipelineError::render(ErrorCode::RenderFailed, format!("Template compilation failed: {}", e))
        })?;

        Ok(Self { tera, templates })
    }

    pub fn get(&self, template_type: TemplateType) -> Option<&PageTemplate> {
        self.templates.get(&template_type)
    }

    /// Registered archetypes in a stable order
    pub fn list(&self) -> Vec<&PageTemplate> {
        self.templates.values().collect()
    }

    pub fn render(&self, template_type: TemplateType, context: &Context) -> Result<String, PipelineError> {
        let template = self.get(template_type).ok_or_else(|| {
            PipelineError::render(
                ErrorCode::TemplateNotFound,
                format!("Template not registered: {}", template_type),
            )
            .with_detail("template_type", template_type.as_str())
        })?;

        self.tera.render(template.file, context).map_err(|e| {
            let mut chain = vec![e.to_string()];
            let mut source = e.source();
            while let Some(err) = source {
                chain.push(err.to_string());
                source = err.source();
            }
            PipelineError::render(ErrorCode::RenderFailed, chain.join(": "))
                .with_detail("template_type", template_type.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registers_all() {
        let registry = TemplateRegistry::builtin().unwrap();
        let types: Vec<TemplateType> = registry.list().iter().map(|t| t.template_type).collect();
        assert_eq!(types, vec![TemplateType::Saas, TemplateType::App, TemplateType::Agency]);
    }

    #[test]
    fn test_subset_registry_rejects_missing() {
        let registry = TemplateRegistry::with_templates(&[TemplateType::App]).unwrap();
        assert!(registry.get(TemplateType::Saas).is_none());
        let err = registry.render(TemplateType::Saas, &Context::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateNotFound);
    }

    #[test]
    fn test_icon_fallback() {
        assert_eq!(icon_glyph("Rocket"), "🚀");
        assert_eq!(icon_glyph("unicorn"), DEFAULT_ICON);
    }

    #[test]
    fn test_bold_style() {
        let style = ToneStyle::for_tone(Tone::Bold);
        assert!(style.hero_size.contains("font-black"));
        assert!(style.cta_style.contains("uppercase"));
    }
}
