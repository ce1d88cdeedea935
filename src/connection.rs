//! # Connection Management Module
//!
//! Owns the async runtime that battery sessions run on. The UI thread sends
//! `ConnectionCommand`s; the manager starts and stops one session at a time,
//! either a Bluetooth session or the simulator. Each start command carries
//! the `SessionId` that session's updates are stamped with.
//!
//! ## Key Components
//! - `ConnectionManager`: Manages the runtime thread and command processing
//! - `ConnectionCommand`: Commands sent from UI to the manager thread
//! - One `AtomicBool` stop flag per session

use crate::config::Config;
use crate::error::ConnectionError;
use crate::session::{run_session, ConnectionStatus, Reporter, SessionId, SessionMessage};
use crate::simulator::run_simulation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionCommand {
    Connect { device_id: String, session: SessionId },
    StartSimulation { session: SessionId },
    Disconnect,
}

/// Manages the session lifecycle for battery connections.
///
/// Runs in a dedicated thread with its own Tokio runtime so Bluetooth calls
/// never block the UI thread.
pub struct ConnectionManager {
    command_receiver: mpsc::Receiver<ConnectionCommand>,
    reporter: Reporter,
    config: Config,
}

impl ConnectionManager {
    /// Creates a new ConnectionManager.
    ///
    /// Returns the manager and a sender for issuing commands from the UI thread.
    pub fn new(
        update_sender: mpsc::Sender<SessionMessage>,
        config: Config,
    ) -> (Self, mpsc::Sender<ConnectionCommand>) {
        let (command_sender, command_receiver) = mpsc::channel();

        let manager = ConnectionManager {
            command_receiver,
            reporter: Reporter::new(update_sender),
            config,
        };

        (manager, command_sender)
    }

    /// Runs the command loop. Blocks until the command channel is closed.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = ConnectionError::RuntimeCreation(e.to_string());
                log::error!("{}", error);
                self.reporter.status(ConnectionStatus::Error(error.to_string()));
                return;
            }
        };

        let mut stop_flag: Option<Arc<AtomicBool>> = None;

        while let Ok(command) = self.command_receiver.recv() {
            match command {
                ConnectionCommand::Connect { device_id, session } => {
                    log::info!(
                        "Connection manager: Connecting to device {} (session {})",
                        device_id,
                        session
                    );
                    let should_stop = Self::replace_session(&mut stop_flag);

                    rt.spawn(run_session(
                        device_id,
                        self.config.scan_window(),
                        self.reporter.for_session(session),
                        should_stop,
                    ));
                }
                ConnectionCommand::StartSimulation { session } => {
                    log::info!(
                        "Connection manager: Starting simulated battery (session {})",
                        session
                    );
                    let should_stop = Self::replace_session(&mut stop_flag);

                    rt.spawn(run_simulation(
                        self.reporter.for_session(session),
                        should_stop,
                        self.config.simulation_interval(),
                        self.config.capacity_ah,
                    ));
                }
                ConnectionCommand::Disconnect => {
                    log::info!("Connection manager: Disconnect requested");
                    if let Some(flag) = stop_flag.take() {
                        log::debug!("Connection manager: Setting stop flag");
                        flag.store(true, Ordering::Relaxed);
                    }
                }
            }
        }

        if let Some(flag) = stop_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        log::info!("Connection manager: Command channel closed, shutting down");
    }

    /// Stops the running session, if any, and hands out a flag for the next one
    fn replace_session(stop_flag: &mut Option<Arc<AtomicBool>>) -> Arc<AtomicBool> {
        if let Some(previous) = stop_flag.take() {
            previous.store(true, Ordering::Relaxed);
        }
        let should_stop = Arc::new(AtomicBool::new(false));
        *stop_flag = Some(should_stop.clone());
        should_stop
    }
}
