//! Error Taxonomy - One Record, Four Families
//!
//! Every failure is a `PipelineError` carrying a machine-readable code,
//! a human message, the step it came from and a structured details payload.
//! The family is derived from the code, never stored separately.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::validation::FieldViolation;

/// Originating phase of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Generation,
    Rendering,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E101")]
    SchemaValidation,
    #[serde(rename = "E102")]
    InvalidTone,
    #[serde(rename = "E103")]
    InvalidVariantId,
    #[serde(rename = "E104")]
    InvalidTemplateType,
    #[serde(rename = "E105")]
    InvalidHexColor,
    #[serde(rename = "E106")]
    MissingRequiredField,
    #[serde(rename = "E107")]
    SchemaVersionMismatch,
    #[serde(rename = "E108")]
    UnknownSectionKey,
    #[serde(rename = "E109")]
    InvalidFieldType,
    #[serde(rename = "E110")]
    EmptyField,
    #[serde(rename = "E111")]
    InvalidFont,

    #[serde(rename = "E201")]
    OnboardingFailed,
    #[serde(rename = "E202")]
    BrandFailed,
    #[serde(rename = "E203")]
    LandingFailed,
    #[serde(rename = "E204")]
    GenerationFailed,
    #[serde(rename = "E205")]
    GenerationTimeout,
    #[serde(rename = "E206")]
    MalformedResponse,

    #[serde(rename = "E301")]
    TemplateNotFound,
    #[serde(rename = "E302")]
    RenderFailed,
    #[serde(rename = "E303")]
    MissingContent,
    #[serde(rename = "E304")]
    InvalidSectionData,

    #[serde(rename = "E401")]
    FileNotFound,
    #[serde(rename = "E402")]
    FileWriteFailed,
    #[serde(rename = "E403")]
    JsonParseFailed,
    #[serde(rename = "E404")]
    FileReadFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaValidation => "E101",
            Self::InvalidTone => "E102",
            Self::InvalidVariantId => "E103",
            Self::InvalidTemplateType => "E104",
            Self::InvalidHexColor => "E105",
            Self::MissingRequiredField => "E106",
            Self::SchemaVersionMismatch => "E107",
            Self::UnknownSectionKey => "E108",
            Self::InvalidFieldType => "E109",
            Self::EmptyField => "E110",
            Self::InvalidFont => "E111",
            Self::OnboardingFailed => "E201",
            Self::BrandFailed => "E202",
            Self::LandingFailed => "E203",
            Self::GenerationFailed => "E204",
            Self::GenerationTimeout => "E205",
            Self::MalformedResponse => "E206",
            Self::TemplateNotFound => "E301",
            Self::RenderFailed => "E302",
            Self::MissingContent => "E303",
            Self::InvalidSectionData => "E304",
            Self::FileNotFound => "E401",
            Self::FileWriteFailed => "E402",
            Self::JsonParseFailed => "E403",
            Self::FileReadFailed => "E404",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.as_str().as_bytes()[1] {
            b'1' => ErrorKind::Validation,
            b'2' => ErrorKind::Generation,
            b'3' => ErrorKind::Rendering,
            _ => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}]{} {message}", .step.as_ref().map(|s| format!(" [{}]", s)).unwrap_or_default())]
pub struct PipelineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub details: Value,
}

impl PipelineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            step: None,
            details: json!({}),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn at_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if !self.details.is_object() {
            self.details = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Aggregate every violated field into one E101 error
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        let summary: Vec<String> = violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.reason))
            .collect();
        let message = format!(
            "{} field(s) failed validation: {}",
            violations.len(),
            summary.join("; ")
        );
        Self::new(ErrorCode::SchemaValidation, message)
            .at_step("validation")
            .with_detail("violations", json!(violations))
    }

    pub fn generation(code: ErrorCode, stage: &str, message: impl Into<String>) -> Self {
        Self::new(code, message)
            .at_step(stage)
            .with_detail("stage", stage)
    }

    pub fn timeout(stage: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::GenerationTimeout,
            format!("{} aborted: {}", stage, reason),
        )
        .at_step(stage)
        .with_detail("stage", stage)
        .with_detail("reason", reason)
    }

    pub fn render(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).at_step("render")
    }

    pub fn io(code: ErrorCode, path: &Path, cause: impl fmt::Display) -> Self {
        Self::new(code, format!("{}: {}", path.display(), cause))
            .at_step("io")
            .with_detail("path", path.display().to_string())
            .with_detail("cause", cause.to_string())
    }

    /// Field violations carried by a validation error, if any
    pub fn violations(&self) -> Vec<FieldViolation> {
        self.details
            .get("violations")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_code_family() {
        assert_eq!(ErrorCode::UnknownSectionKey.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::GenerationTimeout.kind(), ErrorKind::Generation);
        assert_eq!(ErrorCode::TemplateNotFound.kind(), ErrorKind::Rendering);
        assert_eq!(ErrorCode::FileWriteFailed.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_code_serializes_as_string() {
        let s = serde_json::to_string(&ErrorCode::InvalidSectionData).unwrap();
        assert_eq!(s, r#""E304""#);
    }

    #[test]
    fn test_display_includes_code_and_step() {
        let err = PipelineError::timeout("brand", "deadline exceeded");
        let text = err.to_string();
        assert!(text.starts_with("[E205] [brand]"));
        assert!(text.contains("deadline exceeded"));
    }
}
