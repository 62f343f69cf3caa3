//! Long-Poll Bench - Main CLI Application
//!
//! Opens many concurrent long-poll watches on one key, writes the key once
//! every watch is established, and reports how long it took for all of them
//! to observe the write.

use clap::Parser;
use longpoll_bench::{
    cli::Cli,
    client::{ReqwestTransport, Transport},
    config::{display_config_summary, load_config, validate_config, ValidationLevel},
    error::{AppError, ErrorReporter, Result},
    executor::{Orchestrator, RunOptions},
    logging::LoggerFactory,
    models::Config,
    output::{OutputCoordinator, ProgressReporter, ProgressSettings, ReadinessNotifier, StdoutSink},
    types::TestMode,
    PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    // A run may legitimately wait forever; Ctrl-C is the way out
    let result = tokio::select! {
        result = run_application(cli) => result,
        _ = tokio::signal::ctrl_c() => Err(AppError::cancelled("interrupted by Ctrl-C")),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!(
            "{} v{} (built {}, commit {})",
            PKG_NAME,
            VERSION,
            env!("BUILD_TIME"),
            env!("GIT_COMMIT")
        );
    }

    let config = load_config(cli)?;

    for warning in validate_config(&config)? {
        if warning.level != ValidationLevel::Info || config.verbose || config.debug {
            eprintln!("{}", warning.format(config.enable_color));
        }
    }

    if config.debug {
        eprintln!("Configuration loaded successfully:");
        eprintln!("{}", display_config_summary(&config));
        eprintln!();
    }

    let factory = LoggerFactory::new(config.clone());
    let network_logger = Arc::new(factory.create_network_logger());
    let trial_logger = factory.create_trial_logger();
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::with_defaults()?);
    let orchestrator = Orchestrator::new(
        transport,
        RunOptions::from_config(&config)?,
        network_logger,
        trial_logger,
    );
    let output = OutputCoordinator::from_config(&config);

    match config.test_mode {
        TestMode::SharedKeyWait => run_shared_key(orchestrator, &config, &output).await,
        TestMode::RandomKeyPut => run_random_keys(orchestrator, &config, &output).await,
    }
}

async fn run_shared_key(orchestrator: Orchestrator, config: &Config, output: &OutputCoordinator) -> Result<()> {
    if !config.progress || config.json {
        let summary = orchestrator.run_trials().await?;
        println!("{}", output.display_trial_summary(&summary)?);
        return Ok(());
    }

    let (notifier, receiver) = ReadinessNotifier::channel(config.progress_buffer);
    let progress = tokio::spawn(
        ProgressReporter::new(ProgressSettings::from_config(config), receiver, StdoutSink).run(),
    );

    let orchestrator = orchestrator.with_notifier(notifier.clone());
    let summary = orchestrator.run_trials().await;

    // The reporter stops once the last notifier is gone
    drop(orchestrator);
    let dropped = notifier.dropped();
    drop(notifier);
    let stats = progress
        .await
        .map_err(|e| AppError::internal(format!("Progress reporter failed: {}", e)))?;

    if config.debug {
        eprintln!(
            "Progress: {} readiness events, {} lines, {} dropped",
            stats.tally, stats.lines, dropped
        );
    }

    println!("{}", output.display_trial_summary(&summary?)?);
    Ok(())
}

async fn run_random_keys(orchestrator: Orchestrator, config: &Config, output: &OutputCoordinator) -> Result<()> {
    let run = orchestrator.run_random_keys()?;

    if config.verbose || config.debug {
        eprintln!(
            "Dispatched {} PUTs in {}",
            run.keys().len(),
            longpoll_bench::output::format_duration(run.dispatch())
        );
    }

    let report = match config.timeout() {
        Some(limit) => run.wait_all_within(limit).await?,
        None => run.wait_all().await?,
    };

    println!("{}", output.display_random_key_report(&report)?);
    Ok(())
}
