// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod charts;
mod config;
mod connection;
mod device_scanner;
mod error;
mod event_log;
mod probe;
mod session;
mod simulator;
mod telemetry;
mod timeseries;
mod ui;

use app::IonicMonitor;
use config::Config;
use connection::ConnectionManager;
use iced::Theme;
use session::SessionMessage;
use std::sync::mpsc;

fn main() -> iced::Result {
    // On Windows, force wgpu to use Vulkan backend instead of DirectX 12
    #[cfg(target_os = "windows")]
    std::env::set_var("WGPU_BACKEND", "vulkan");

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("{}; using default settings", e);
        Config::default()
    });
    log::info!("Data source: {:?}", config.data_source);

    // Channel from the session thread to the UI thread
    let (sender, receiver) = mpsc::channel::<SessionMessage>();

    let (manager, connect_sender) = ConnectionManager::new(sender, config.clone());

    std::thread::spawn(move || {
        manager.run();
    });

    iced::application(
        "Ionic Battery Monitor",
        IonicMonitor::update,
        IonicMonitor::view,
    )
    .subscription(IonicMonitor::subscription)
    .theme(|_| Theme::Light)
    .window_size((1200.0, 800.0))
    .run_with(move || IonicMonitor::new(receiver, connect_sender, config))
}
