//! LandingForge CLI
//!
//! Modes: `--example <N|all>` (full pipeline) or `--input <canonical.json>` (render only)
//! Outputs a JSON summary to stdout, logs and errors to stderr
//! Exit codes: 0 success, 1 classified error, 130 interrupted

use clap::{ArgGroup, Parser};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use landingforge_core::{
    output::{load_document, write_outputs, OutputManifest},
    samples::{self, product_slug},
    CanonicalDocument, ErrorCode, GeneratorConfig, HttpGenerator, Pipeline, PipelineError,
    RenderSelector, Renderer, RetryPolicy, RunContext, TemplateType,
};

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "landingforge-cli")]
#[command(about = "LandingForge CLI - Landing Page Compiler", version)]
#[command(group(ArgGroup::new("mode").required(true).args(["example", "input"])))]
struct Cli {
    /// Run the full pipeline for a built-in sample (1-5 or "all")
    #[arg(short, long)]
    example: Option<String>,

    /// Render an existing canonical document; no generation calls
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Also render every template × variant combination
    #[arg(long)]
    all_variants: bool,

    /// Template override (saas, app, agency)
    #[arg(short, long)]
    template: Option<String>,

    /// Variant override (0 = default copy)
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    variant: Option<i64>,

    /// Generator config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overall deadline per pipeline run
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug,hyper=warn,h2=warn,reqwest=warn,rustls=warn")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

fn report_error(err: &PipelineError) {
    let payload = json!({ "success": false, "error": err });
    eprintln!("{}", payload);
}

/// CLI overrides replace the persisted selector field by field
fn resolve_selector(cli: &Cli, persisted: RenderSelector) -> Result<RenderSelector, PipelineError> {
    let template_type = match &cli.template {
        Some(name) => name.parse::<TemplateType>()?,
        None => persisted.template_type,
    };
    Ok(RenderSelector::new(template_type, cli.variant.unwrap_or(persisted.variant_id)))
}

/// Render everything in memory, then write. Variant failures are collected;
/// the successful pages are still written.
fn produce(
    renderer: &Renderer,
    dir: &Path,
    doc: CanonicalDocument,
    selector: RenderSelector,
    all_variants: bool,
) -> Result<OutputManifest, PipelineError> {
    let doc = doc.with_render(selector);
    let index = renderer.render(&doc, selector)?;

    let (pages, failures) = if all_variants {
        let batch = renderer.render_all(&doc);
        (batch.pages, batch.failures)
    } else {
        (vec![], vec![])
    };

    let manifest = write_outputs(dir, &doc, &index, &pages)?;

    if failures.is_empty() {
        return Ok(manifest);
    }
    let listed: Vec<serde_json::Value> = failures
        .iter()
        .map(|(selector, e)| json!({ "key": selector.key(), "error": e }))
        .collect();
    Err(PipelineError::render(
        ErrorCode::RenderFailed,
        format!("{} of {} variant renders failed", failures.len(), failures.len() + pages.len()),
    )
    .with_detail("failures", listed)
    .with_detail("written", serde_json::to_value(&manifest).unwrap_or_default()))
}

fn run_render(cli: &Cli, renderer: &Renderer, path: &Path) -> Result<serde_json::Value, PipelineError> {
    let doc = load_document(path)?;
    let selector = resolve_selector(cli, doc.selector())?;
    let manifest = produce(renderer, &cli.output, doc, selector, cli.all_variants)?;
    Ok(json!({ "success": true, "mode": "render", "outputs": [manifest] }))
}

async fn run_examples(
    cli: &Cli,
    renderer: &Renderer,
    selector_arg: &str,
    cancel: CancellationToken,
) -> Result<serde_json::Value, PipelineError> {
    let selected = samples::select(selector_arg)?;
    let config = GeneratorConfig::load(cli.config.as_deref())?;
    let retry = RetryPolicy::from_config(&config);
    let generator = HttpGenerator::from_config(config).map_err(|e| {
        PipelineError::new(ErrorCode::GenerationFailed, e.to_string()).at_step("config")
    })?;
    let pipeline = Pipeline::new(Arc::new(generator), retry);

    let mut outputs = vec![];
    let mut failures = vec![];
    for sample in &selected {
        if cancel.is_cancelled() {
            break;
        }
        info!(
            sample = sample.label,
            product = %sample.input.product_name,
            tone = %sample.input.tone,
            template = %sample.input.template_type,
            "generating"
        );

        let mut ctx = RunContext::new().with_cancel(cancel.clone());
        if let Some(secs) = cli.timeout_secs {
            ctx = ctx.with_timeout(Duration::from_secs(secs));
        }

        let dir = cli.output.join(product_slug(&sample.input.product_name));
        let result = pipeline
            .run(&sample.input, &ctx)
            .await
            .into_document()
            .and_then(|doc| {
                let selector = resolve_selector(cli, doc.selector())?;
                produce(renderer, &dir, doc, selector, cli.all_variants)
            });

        match result {
            Ok(manifest) => outputs.push(manifest),
            Err(e) => {
                error!(product = %sample.input.product_name, code = %e.code, error = %e, "sample failed");
                failures.push(json!({ "product": sample.input.product_name, "error": e }));
            }
        }
    }

    info!(succeeded = outputs.len(), total = selected.len(), "examples complete");
    if failures.is_empty() {
        return Ok(json!({ "success": true, "mode": "example", "outputs": outputs }));
    }
    Err(PipelineError::new(
        ErrorCode::GenerationFailed,
        format!("{} of {} samples failed", failures.len(), selected.len()),
    )
    .at_step("pipeline")
    .with_detail("failures", failures)
    .with_detail("succeeded", outputs.len()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let renderer = match Renderer::builtin() {
        Ok(r) => r,
        Err(e) => {
            report_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                interrupted.store(true, Ordering::SeqCst);
                cancel.cancel();
            }
        });
    }

    let result = match (&cli.example, &cli.input) {
        (Some(selector), _) => run_examples(&cli, &renderer, selector, cancel).await,
        (None, Some(path)) => run_render(&cli, &renderer, path),
        (None, None) => Err(PipelineError::new(
            ErrorCode::MissingRequiredField,
            "one of --example or --input is required",
        )),
    };

    if interrupted.load(Ordering::SeqCst) {
        eprintln!("{}", json!({ "success": false, "interrupted": true }));
        return ExitCode::from(EXIT_INTERRUPTED);
    }

    match result {
        Ok(summary) => {
            print_json(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}
