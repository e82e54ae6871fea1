//! OpenOCD Variable Monitor - Main Entry Point
//!
//! Resets the target, samples the configured variable at a fixed interval and
//! prints one line per sample. Press Enter (or close stdin) to stop.
//!
//! Usage: `ocdplot [CONFIG]`. Without an argument the config is read from
//! `OCDPLOT_CONFIG` or the platform config directory, falling back to
//! defaults when no file exists.

use anyhow::Context;
use ocdplot_rs::{
    backend::{SamplerBackend, SessionCommand, SessionMessage, StopReason},
    config::{AppConfig, LoggingConfig},
};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,ocdplot_rs=debug";

fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    tracing::info!(
        "Starting OpenOCD variable monitor ({}:{})",
        config.target.host,
        config.target.port
    );
    config.validate().context("invalid configuration")?;

    let (backend, handle) = SamplerBackend::new(config.clone());
    let backend_thread = std::thread::spawn(move || run_backend(backend, &config));

    // Any line (or EOF) on stdin ends the session.
    let commands = handle.command_sender.clone();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = commands.send(SessionCommand::Stop);
    });

    let mut reason = StopReason::Shutdown;
    for message in handle.iter() {
        match message {
            SessionMessage::Started {
                address,
                representation,
            } => {
                tracing::info!("Target reset, sampling {} as {}", address, representation);
            }
            SessionMessage::Sample(update) => {
                println!(
                    "Sample: {}; Value: {}",
                    update.sample.frame, update.sample.value
                );
            }
            SessionMessage::Stats(stats) => {
                tracing::info!(
                    "{} samples, {} fallbacks, avg round-trip {:.0} us",
                    stats.samples,
                    stats.fallback_samples,
                    stats.avg_round_trip_us()
                );
            }
            SessionMessage::Error(error) => tracing::error!("{}", error),
            SessionMessage::Stopped {
                reason: stop_reason,
                frames,
            } => {
                tracing::info!("Session stopped after {} samples: {}", frames, stop_reason);
                reason = stop_reason;
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    if backend_thread.join().is_err() {
        anyhow::bail!("sampler thread panicked");
    }

    match reason {
        StopReason::Requested | StopReason::Shutdown => Ok(()),
        failure => anyhow::bail!("session ended: {}", failure),
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    match explicit {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AppConfig::default_path()
            .map(AppConfig::load_or_default)
            .unwrap_or_default()),
    }
}

fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });

    // stdout carries the sample lines; logs go to stderr and the optional file.
    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "ocdplot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[cfg(not(feature = "mock-target"))]
fn run_backend(backend: SamplerBackend, _config: &AppConfig) -> StopReason {
    backend.run()
}

/// With `OCDPLOT_MOCK` set, sample a simulated target instead of connecting
#[cfg(feature = "mock-target")]
fn run_backend(backend: SamplerBackend, config: &AppConfig) -> StopReason {
    use ocdplot_rs::backend::{MockDataPattern, MockTarget};

    if std::env::var_os("OCDPLOT_MOCK").is_none() {
        return backend.run();
    }

    let address = config
        .variable
        .read_command()
        .map(|command| command.address_value())
        .unwrap_or_default();
    tracing::info!("Using simulated target");
    let target = MockTarget::new().with_variable(
        address,
        config.variable.representation,
        MockDataPattern::default(),
    );
    backend.run_with_transport(target)
}
