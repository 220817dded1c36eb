//! Timeline Media Downloader - CLI entry point.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use timeline_media_downloader::{
    api::TimelineApi,
    cli::Args,
    config::{parse_target, validate_config, Config, DownloadScope, Target},
    download::{
        walk_single_post, walk_timeline, FfmpegTranscoder, HttpFetcher, Orchestrator,
        TimelineMediaResult,
    },
    error::{exit_codes, Error, Result},
    output::{
        create_spinner, print_banner, print_download_summary, print_error, print_info,
        print_run_summary, print_success, print_walk_result, print_warning, walk_message,
        ProgressAggregator, SnapshotBar,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            let code = match e {
                Error::Cancelled => exit_codes::ABORT,
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
                Error::Authentication(_)
                | Error::Api(_)
                | Error::AccountNotFound(_)
                | Error::PostNotFound(_)
                | Error::RateLimited(_) => exit_codes::API_ERROR,
                Error::Download(_)
                | Error::M3U8(_)
                | Error::Transcode(_)
                | Error::FFmpeg(_)
                | Error::FFmpegNotFound => exit_codes::DOWNLOAD_ERROR,
                _ => exit_codes::UNEXPECTED_ERROR,
            };
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let config_path = args.config.clone();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    validate_config(&config)?;

    let account = config.target.account.clone().ok_or_else(|| {
        Error::MissingConfig("target account (pass @name or set [target].account)".into())
    })?;
    let target = parse_target(&account)?;
    let scope = config.scope(target.identity());

    print_run_summary(
        &target,
        &scope,
        config.concurrency(),
        config.options.scheduling,
    );

    // Ctrl-C stops new work; in-flight items resolve as cancelled
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                print_warning("Interrupted, stopping...");
                cancel.cancel();
            }
        });
    }

    let api = TimelineApi::new(
        config.credential(),
        &config.options.user_agent,
        config.api.clone(),
    )?;

    let walk = collect_tasks(&api, &config, &target, &scope, &cancel).await?;
    print_walk_result(&walk);

    if walk.tasks.is_empty() {
        print_info("Nothing to download");
        record_last_run(&config_path, scope.identity());
        return Ok(exit_codes::SUCCESS);
    }

    let fetcher = HttpFetcher::new(&config.options.user_agent)?;
    let transcoder = FfmpegTranscoder::new(fetcher.client().clone());
    let orchestrator = Orchestrator::new(Arc::new(fetcher), Arc::new(transcoder))
        .with_scheduling(config.options.scheduling);

    let progress = ProgressAggregator::new();
    let bar = config
        .options
        .show_progress
        .then(|| SnapshotBar::start(walk.tasks.len(), progress.subscribe()));

    let summary = orchestrator
        .run(
            &walk.tasks,
            config.concurrency(),
            &cancel,
            &progress.callback(),
        )
        .await;

    let snapshot = progress.finish();
    if let Some(bar) = bar {
        bar.finish(&snapshot);
    }

    print_download_summary(&summary);

    if summary.cancelled {
        return Ok(exit_codes::ABORT);
    }

    record_last_run(&config_path, scope.identity());

    if summary.has_failures() {
        print_warning(&format!(
            "{} of {} items failed; rerun to retry them",
            summary.failed, summary.total
        ));
        return Ok(exit_codes::SOME_TASKS_FAILED);
    }

    print_success("All done");
    Ok(exit_codes::SUCCESS)
}

/// Walk the timeline or fetch the single post the target names.
async fn collect_tasks(
    api: &TimelineApi,
    config: &Config,
    target: &Target,
    scope: &DownloadScope,
    cancel: &CancellationToken,
) -> Result<TimelineMediaResult> {
    match target {
        Target::Post { post_id, .. } => walk_single_post(api, scope, post_id, cancel).await,
        Target::Timeline { .. } => {
            let spinner = config
                .options
                .show_progress
                .then(|| create_spinner("Scanning timeline..."));
            let page_delay = Duration::from_millis(config.options.page_delay_ms);

            let result = walk_timeline(api, scope, page_delay, cancel, |progress| {
                if let Some(spinner) = &spinner {
                    spinner.set_message(walk_message(&progress));
                }
            })
            .await;

            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            result
        }
    }
}

/// Store the finished run in the config file's cache section.
///
/// Re-reads the file so credentials passed on the command line are never written out.
fn record_last_run(config_path: &Path, identity: &str) {
    if !config_path.exists() {
        return;
    }

    let result = Config::load(config_path)
        .and_then(|mut stored| stored.update_cache(identity, Utc::now(), Some(config_path)));

    if let Err(e) = result {
        print_warning(&format!("Could not update config cache: {}", e));
    }
}
