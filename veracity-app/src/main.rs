use anyhow::{Context, Result};
use clap::Parser;
use ratatui::text::Line;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use veracity_common::observability::init_logging;
use veracity_config::{VeracityConfig, VeracityConfigLoader};
use veracity_llm::{AnalysisResult, build_analyzer};
use veracity_runtime::VeracityRuntime;

mod cli;
mod report;
mod styles;
mod terminal;

use cli::Args;

const EXIT_ANALYSIS_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = ?e, "startup.failed");
            eprintln!("veracity: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn load_config(args: &Args) -> Result<VeracityConfig> {
    let loader = match &args.config {
        Some(path) => VeracityConfigLoader::new().with_file(path),
        None => VeracityConfigLoader::new().with_default_locations(),
    };
    loader.load().context("failed to load configuration")
}

fn run(args: Args) -> Result<ExitCode> {
    // 1) Config (env wins), then logging as the config describes it
    let cfg = load_config(&args)?;
    let log_path = init_logging(cfg.logging.to_log_config("veracity"))?;
    tracing::debug!(log_file = %log_path.display(), "startup");

    // 2) Credential problems stop us here, before any input is read
    let analyzer = build_analyzer(&cfg.provider)?;

    let message = cli::read_message(&args, &mut io::stdin().lock())?;

    // 3) One cancellable analysis; Ctrl-C cancels the root token
    let runtime = VeracityRuntime::build("veracity", None)?;
    runtime.cancel_on_ctrl_c();
    let handle = runtime.handle();
    let cancel = handle.child_token();

    let outcome = runtime.block_on(async {
        let done = CancellationToken::new();
        let spinner = (!args.json)
            .then(|| terminal::spawn_spinner(&handle, done.clone()))
            .flatten();
        let outcome = analyzer.analyze_cancellable(&message, &cancel).await;
        done.cancel();
        if let Some(spinner) = spinner {
            let _ = spinner.await;
        }
        outcome
    });
    runtime.shutdown(Duration::from_millis(250));

    match outcome {
        Ok(result) => {
            present(&result, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => Ok(ExitCode::from(EXIT_INTERRUPTED)),
        Err(e) => {
            tracing::error!(error = %e, "analysis.error");
            if let Some(msg) = e.user_message() {
                let color = colors_enabled(&args, io::stderr().is_terminal());
                terminal::write_lines(
                    &mut io::stderr(),
                    &[Line::styled(msg, styles::error())],
                    color,
                )?;
            }
            Ok(ExitCode::from(EXIT_ANALYSIS_FAILED))
        }
    }
}

fn colors_enabled(args: &Args, is_terminal: bool) -> bool {
    is_terminal && !args.no_color
}

fn present(result: &AnalysisResult, args: &Args) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, result).context("failed to encode result")?;
        terminal::write_lines(&mut stdout, &[Line::default()], false)?;
        return Ok(());
    }

    let lines = report::render(result, terminal::width());
    let color = colors_enabled(args, io::stdout().is_terminal());
    terminal::write_lines(&mut stdout, &lines, color)?;
    Ok(())
}
