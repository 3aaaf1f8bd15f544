#![cfg_attr(all(target_os = "windows", not(debug_assertions)), windows_subsystem = "windows")]

use tracing::{info, warn};

mod config;
mod dispatcher;
mod gemini;
mod logger;
mod operation;
mod session;
mod ui;

fn main() {
    // Init logger first
    logger::init();
    info!("App starting (log file: {})", logger::log_path().display());

    // .env in the working directory may carry GEMINI_API_KEY
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let config_path = config::Config::path();
    if !config_path.exists() {
        match config::Config::default().save() {
            Ok(()) => info!("Wrote default config to {}", config_path.display()),
            Err(e) => warn!("Could not write default config: {e:#}"),
        }
    }

    // Config: config.json next to exe, env vars override when present.
    let cfg = config::Config::load();
    info!("Config loaded; model {}", cfg.gemini_model);

    let dispatcher = dispatcher::Dispatcher::from_config(&cfg);

    // Run UI on main thread (blocks)
    ui::run_ui_main_thread(dispatcher);
}
