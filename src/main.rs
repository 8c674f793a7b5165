// Glowgrid - Animated neon grid background with floating orbs and a cursor particle trail
// Runs as an interactive terminal view or a headless PNG renderer, optionally feeding a WLED matrix
use anyhow::{bail, Context, Result};
use clap::Parser;
use notify::{Config, Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::OpenOptions;
use std::sync::{mpsc, Mutex};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod headless;
mod input;
mod led_output;
mod orb;
mod palette;
mod particle;
mod renderer;
mod scheduler;
mod surface;
mod terminal;
mod types;

use config::{AppConfig, Args};
use types::ModeExitReason;

const DEFAULT_LOG_FILTER: &str = "glowgrid=info";

/// Route logs for the starting mode. The terminal view owns the screen,
/// so it only logs when a file is configured; headless logs to stderr.
fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = if !config.log_file.is_empty() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("opening log file {}", config.log_file))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else if config.mode != "terminal" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        Ok(())
    };

    if let Err(e) = installed {
        eprintln!("Warning: logging not initialized: {}", e);
    }
    Ok(())
}

/// Watch config file and notify running modes when it is modified
fn spawn_config_watcher(config_change_tx: broadcast::Sender<()>) -> Result<()> {
    let config_path = AppConfig::config_path(None)?;

    std::thread::spawn(move || -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                error!("config watcher unavailable: {}", e);
                return Ok(());
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            error!(path = %config_path.display(), "cannot watch config: {}", e);
            return Ok(());
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_)) {
                        // No receivers just means no mode is running yet
                        let _ = config_change_tx.send(());
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
        Ok(())
    });

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set global config path immediately (before any config loads)
    AppConfig::set_config_path(args.cfg.clone());

    let cfg_arg = args.cfg.as_deref();
    let config_path = AppConfig::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        match AppConfig::load_with_path(cfg_arg) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("\nFailed to load config file: {:#}", e);
                eprintln!("Config file: {}", config_path.display());
                eprintln!("\nPlease fix the config file or delete it to regenerate with defaults.");
                return Err(e);
            }
        }
    } else {
        AppConfig {
            config_path: Some(config_path.clone()),
            ..AppConfig::default()
        }
    };

    let args_provided = config.merge_with_args(&args);
    config.sanitize();

    // Save only on first run or when the command line changed something
    if !config_file_exists || args_provided {
        config.save()?;
    }

    init_tracing(&config)?;
    info!(path = %config_path.display(), mode = %config.mode, "configuration loaded");

    if !args.quiet {
        println!("Using config file: {}", config_path.display());
        println!("Edit it while running: theme, fps and palette apply live, a mode change switches hosts.");
    }

    let (config_change_tx, _config_change_rx) = broadcast::channel(100);
    spawn_config_watcher(config_change_tx.clone())?;

    // Main mode switching loop - allows dynamic mode changes without restart
    'mode_loop: loop {
        let current_config = AppConfig::load().unwrap_or_else(|_| config.clone());

        let result = match current_config.mode.as_str() {
            "terminal" => terminal::run_terminal_mode(&current_config, config_change_tx.clone()),
            "headless" => headless::run_headless_mode(&current_config),
            other => bail!("Unknown mode '{}' (expected terminal or headless)", other),
        };

        match result {
            Ok(ModeExitReason::UserQuit) => {
                info!("exiting");
                if !args.quiet && current_config.mode == "headless" {
                    println!("Snapshot written to {}", current_config.snapshot_path);
                }
                return Ok(());
            }
            Ok(ModeExitReason::ModeChanged) => {
                info!("mode changed, switching");
                config = current_config;
                continue 'mode_loop;
            }
            Err(e) => {
                error!("{} mode failed: {:#}", current_config.mode, e);
                return Err(e);
            }
        }
    }
}
