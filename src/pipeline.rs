//! Pipeline Orchestrator - Single Entry Point for Generation
//!
//! CRITICAL: every stage output passes its validation gate before it is
//! attached, and the finished document passes the whole-document validator
//! before it leaves `run`. No partial document escapes.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::{ErrorCode, PipelineError};
use crate::llm::{ContentGenerator, RetryPolicy};
use crate::schema::{CanonicalDocument, Meta, RenderSelector, UserInput};
use crate::stages::{BrandStage, LandingInput, LandingStage, OnboardingStage, Stage, StageClient};
use crate::validation::{validate, validate_user_input};

/// Orchestrator states. `Failed` is absorbing; progress is forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Onboarding,
    Brand,
    Landing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Done, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Start, Onboarding) | (Onboarding, Brand) | (Brand, Landing) | (Landing, Done) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct StateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            state: PipelineState::Start,
            history: vec![PipelineState::Start],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        if self.state.can_transition_to(next) {
            self.state = next;
            self.history.push(next);
        }
    }
}

/// Deadline and cancellation for one run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..self
        }
    }

    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    pub fn with_cancel(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Boundary check before a stage starts
    fn check(&self, stage: &str) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::timeout(stage, "cancelled"));
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(PipelineError::timeout(stage, "deadline exceeded"));
        }
        Ok(())
    }

    /// Run `fut` unless cancellation or the deadline fires first
    pub async fn guard<T, F>(&self, stage: &str, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        self.check(stage)?;
        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::timeout(stage, "deadline exceeded")),
                },
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::timeout(stage, "cancelled")),
            result = bounded => result,
        }
    }
}

/// Outcome of one run: the state history plus the document or the error
#[derive(Debug)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub history: Vec<PipelineState>,
    pub outcome: Result<CanonicalDocument, PipelineError>,
}

impl PipelineRun {
    pub fn final_state(&self) -> PipelineState {
        self.history.last().copied().unwrap_or(PipelineState::Start)
    }

    pub fn into_document(self) -> Result<CanonicalDocument, PipelineError> {
        self.outcome
    }
}

/// The generation pipeline: Onboarding → Brand → Landing
pub struct Pipeline {
    onboarding: OnboardingStage,
    brand: BrandStage,
    landing: LandingStage,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn ContentGenerator>, retry: RetryPolicy) -> Self {
        let client = StageClient::new(generator, retry);
        Self {
            onboarding: OnboardingStage::new(client.clone()),
            brand: BrandStage::new(client.clone()),
            landing: LandingStage::new(client),
        }
    }

    pub async fn run(&self, input: &UserInput, ctx: &RunContext) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let mut machine = StateMachine::new();
        let started = std::time::Instant::now();

        let outcome = self
            .drive(input, ctx, &mut machine)
            .instrument(info_span!("pipeline", %run_id, product = %input.product_name))
            .await;

        match &outcome {
            Ok(doc) => {
                machine.advance(PipelineState::Done);
                info!(
                    %run_id,
                    steps = ?doc.meta.pipeline_steps,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "pipeline complete"
                );
            }
            Err(e) => {
                let at = machine.state;
                machine.advance(PipelineState::Failed);
                warn!(%run_id, state = ?at, code = %e.code, error = %e, "pipeline failed");
            }
        }

        PipelineRun {
            run_id,
            history: machine.history,
            outcome,
        }
    }

    async fn drive(
        &self,
        input: &UserInput,
        ctx: &RunContext,
        machine: &mut StateMachine,
    ) -> Result<CanonicalDocument, PipelineError> {
        validate_user_input(input)?;
        let mut meta = Meta::new();

        machine.advance(PipelineState::Onboarding);
        let project = run_stage(&self.onboarding, input, ctx).await?;
        meta = meta.with_step(self.onboarding.name());

        machine.advance(PipelineState::Brand);
        let brand = run_stage(&self.brand, &project, ctx).await?;
        meta = meta.with_step(self.brand.name());

        machine.advance(PipelineState::Landing);
        let landing_input = LandingInput {
            project,
            brand,
            template_type: input.template_type,
        };
        let landing = run_stage(&self.landing, &landing_input, ctx).await?;
        meta = meta.with_step(self.landing.name());

        let LandingInput { project, brand, .. } = landing_input;
        let doc = CanonicalDocument {
            meta,
            project,
            brand,
            content: landing.content,
            assets: landing.assets,
            render: Some(RenderSelector::new(input.template_type, 0)),
        };

        // whole-document gate
        let value = serde_json::to_value(&doc).map_err(|e| {
            PipelineError::new(ErrorCode::SchemaValidation, format!("document serialization failed: {}", e))
        })?;
        validate(&value)
    }
}

async fn run_stage<S: Stage>(stage: &S, input: &S::Input, ctx: &RunContext) -> Result<S::Output, PipelineError> {
    let name = stage.name();
    let started = std::time::Instant::now();
    info!(stage = name, "stage started");

    let output = ctx
        .guard(name, stage.run(input))
        .instrument(info_span!("stage", stage = name))
        .await?;

    info!(stage = name, elapsed_ms = started.elapsed().as_millis() as u64, "stage finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        use PipelineState::*;
        assert!(Start.can_transition_to(Onboarding));
        assert!(Landing.can_transition_to(Done));
        assert!(!Brand.can_transition_to(Onboarding));
        assert!(!Start.can_transition_to(Brand));
        assert!(Brand.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Start));
        assert!(!Done.can_transition_to(Failed));
    }

    #[tokio::test]
    async fn test_guard_honors_cancel() {
        let token = CancellationToken::new();
        let ctx = RunContext::new().with_cancel(token.clone());
        token.cancel();
        let err = ctx
            .guard("brand", async { Ok::<_, PipelineError>(1) })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationTimeout);
    }

    #[tokio::test]
    async fn test_guard_deadline_interrupts_inflight() {
        let ctx = RunContext::new().with_timeout(Duration::from_millis(10));
        let err = ctx
            .guard("landing", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, PipelineError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationTimeout);
        assert_eq!(err.details["reason"], "deadline exceeded");
    }
}
