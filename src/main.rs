use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cached_image::infrastructure::{
    AppConfig, CliArgs, ConfigStore, HttpFetcher, MemoryImageCache, MemoryPressureSignal,
    clear_on_memory_pressure,
};
use cached_image::presentation::{ImageBinding, TextRenderer, render};
use cached_image::{FetchState, ImageLoader};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(store: &ConfigStore, args: &CliArgs) -> Result<AppConfig> {
    let mut config = store.load()?;
    config.merge_with_args(args);
    Ok(config)
}

/// Turns `SIGUSR1` into a memory warning.
#[cfg(unix)]
fn forward_memory_warnings(signal: MemoryPressureSignal) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    let mut usr1 = unix_signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            signal.notify();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_memory_warnings(_signal: MemoryPressureSignal) -> Result<()> {
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let store = ConfigStore::locate(args.config.as_deref())?;
    let config = load_config(&store, &args)?;
    init_logging(&config)?;

    info!(
        version = cached_image::VERSION,
        config = %store.path().display(),
        "Starting {}",
        cached_image::NAME
    );

    let cache = MemoryImageCache::shared();
    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);

    let pressure = MemoryPressureSignal::new();
    let _listener = clear_on_memory_pressure(cache.clone(), &pressure);
    forward_memory_warnings(pressure)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last = FetchState::Idle;
    for round in 1..=args.repeat.max(1) {
        let loader = ImageLoader::with_defaults(cache.clone(), fetcher.clone());
        let binding = ImageBinding::new(args.request(), loader);
        let mut states = binding.subscribe();
        binding.on_appear();

        loop {
            tokio::select! {
                biased;
                _ = &mut ctrl_c => {
                    warn!("Interrupted");
                    println!("{}", cache.stats());
                    return Ok(ExitCode::from(130));
                }
                state = states.recv() => {
                    let Some(state) = state else { break };
                    println!("[{round}] {}", render(&TextRenderer, &state));
                    let done = state.is_terminal();
                    last = state;
                    if done {
                        break;
                    }
                }
            }
        }
    }

    println!("{}", cache.stats());

    Ok(if last.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
