//! repo-analyst - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use repo_analyst::{
    cli::{print_analysis_types, print_report, Args, InteractivePrompt, ProgressSpinner, Verbosity},
    config::Config,
    telemetry::{MultiSink, TelemetrySink, TracingSink},
    AnalysisError, AnalysisRequest, AnalysisResult, AnalysisType, RepoAnalyzer,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_types {
        print_analysis_types();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILED),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let usage = matches!(
                e.downcast_ref::<AnalysisError>(),
                Some(AnalysisError::Validation(_)) | Some(AnalysisError::Config(_))
            );
            ExitCode::from(if usage { EXIT_USAGE } else { EXIT_FAILED })
        }
    }
}

/// `Ok(false)` when any analysis failed
async fn run(args: &Args) -> Result<bool> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(limit) = args.max_iterations {
        config.agent.max_iterations = limit;
        config.validate()?;
    }

    init_logging(args.verbosity(), &config);

    // Missing credentials fail before any prompt or request
    config.openai_config()?;

    if args.is_interactive() {
        run_interactive(args, &config).await
    } else {
        run_batch(args, &config).await
    }
}

/// Analyze every URL in order
async fn run_batch(args: &Args, config: &Config) -> Result<bool> {
    // Reject bad input before the first request goes out
    for url in &args.urls {
        AnalysisRequest::new(
            url,
            args.analysis_type,
            args.system_prompt.as_deref(),
            args.user_prompt.as_deref(),
        )?;
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let mut results = Vec::with_capacity(args.urls.len());

    for url in &args.urls {
        if cancel.is_cancelled() {
            warn!(remaining = args.urls.len() - results.len(), "batch interrupted");
            break;
        }

        let result = analyze_one(
            args,
            config,
            url,
            args.analysis_type,
            args.system_prompt.as_deref(),
            args.user_prompt.as_deref(),
            &cancel,
        )
        .await?;

        if !args.json {
            print_report(&result);
        }
        results.push(result);
    }
    watcher.abort();

    if args.json {
        match results.as_slice() {
            [single] => println!("{}", serde_json::to_string_pretty(single)?),
            all => println!("{}", serde_json::to_string_pretty(all)?),
        }
    }

    let completed = results.len() == args.urls.len();
    Ok(completed && results.iter().all(|r| r.succeeded))
}

/// Prompt for requests until the user quits
async fn run_interactive(args: &Args, config: &Config) -> Result<bool> {
    print_analysis_types();
    println!();

    let mut prompt = InteractivePrompt::new(args.analysis_type)?;

    while let Some(request) = prompt.next_request()? {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        let outcome = analyze_one(
            args,
            config,
            &request.url,
            request.analysis_type,
            request.system_prompt.as_deref(),
            request.user_prompt.as_deref(),
            &cancel,
        )
        .await;
        watcher.abort();

        match outcome {
            Ok(result) if args.json => println!("{}", serde_json::to_string_pretty(&result)?),
            Ok(result) => print_report(&result),
            Err(e) => println!("{} {:#}\n", "Error:".red().bold(), e),
        }
    }

    info!("interactive session ended");
    println!("Goodbye!");
    Ok(true)
}

/// Run one analysis behind its own spinner
async fn analyze_one(
    args: &Args,
    config: &Config,
    url: &str,
    analysis_type: AnalysisType,
    system_prompt: Option<&str>,
    user_prompt: Option<&str>,
    cancel: &CancellationToken,
) -> Result<AnalysisResult> {
    let spinner = if args.json || !args.verbosity().show_progress() {
        ProgressSpinner::hidden()
    } else {
        ProgressSpinner::start(url)
    };

    let sinks: Vec<Arc<dyn TelemetrySink>> = vec![Arc::new(TracingSink), Arc::new(spinner.clone())];
    let analyzer = RepoAnalyzer::from_config(config)?.with_telemetry(Arc::new(MultiSink::new(sinks)));

    let outcome = analyzer
        .analyze(url, analysis_type, system_prompt, user_prompt, cancel)
        .await;

    spinner.finish();
    Ok(outcome?)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("interrupt received, cancelling analysis");
            cancel.cancel();
        }
        Err(e) => debug!(error = %e, "could not listen for ctrl-c"),
    }
}

/// Filter precedence: -v/-q flags, then RUST_LOG, then the configured level
fn init_logging(verbosity: Verbosity, config: &Config) {
    let filter = match verbosity.log_filter() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
