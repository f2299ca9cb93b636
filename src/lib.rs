//! LandingForge Core - Landing Page Compiler
//!
//! # The Rules (Non-Negotiable)
//! 1. The canonical document is the only input to rendering
//! 2. Every stage output is validated before it is attached
//! 3. Partial documents never escape the orchestrator
//! 4. Rendering is a pure function: same document, same selector, same bytes
//! 5. Templates form a closed set; unknown names fail fast
//! 6. The content service suggests, the validator enforces

pub mod config;
pub mod errors;
pub mod hashing;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod schema;
pub mod stages;
pub mod templates;
pub mod validation;

pub use config::GeneratorConfig;
pub use errors::{ErrorCode, ErrorKind, PipelineError};
pub use hashing::{canonical_json, compute_document_hash, sha256_hex};
pub use llm::{ContentGenerator, GeneratorError, HttpGenerator, RetryPolicy};
pub use pipeline::{Pipeline, PipelineRun, PipelineState, RunContext};
pub use render::{resolve_sections, resolve_variant, RenderBatch, RenderedPage, Renderer};
pub use schema::{CanonicalDocument, RenderSelector, SectionsConfig, TemplateType, Tone, UserInput, SCHEMA_VERSION};
pub use templates::TemplateRegistry;
pub use validation::{validate, ValidationResult, ValidationRule, FieldViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
