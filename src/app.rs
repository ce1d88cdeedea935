use crate::charts::{CurrentChartType, PowerChartType, VoltageChartType};
use crate::config::{Config, DataSource};
use crate::connection::ConnectionCommand;
use crate::device_scanner::{scan_devices, BatteryDevice};
use crate::error::ScanError;
use crate::event_log::{EventLog, DEBUG_LOG_CAPACITY, EVENT_LOG_CAPACITY};
use crate::probe::Reading;
use crate::session::{ConnectionStatus, SessionId, SessionMessage, SessionUpdate};
use crate::telemetry::BatterySnapshot;
use crate::timeseries::History;
use crate::ui::styles;
use iced::widget::{
    button, column, container, horizontal_space, progress_bar, row, scrollable, text,
};
use iced::{Alignment, Element, Font, Length, Subscription, Task};
use plotters_iced::ChartWidget;
use std::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Basic,
    Debug,
}

// Iced Application State
pub struct IonicMonitor {
    pub snapshot: BatterySnapshot,
    pub history: History,
    pub events: EventLog,
    pub debug_log: EventLog,
    pub connection_state: ConnectionState,
    pub available_devices: Vec<BatteryDevice>,
    pub selected_device: Option<BatteryDevice>,
    pub device_name: Option<String>,
    pub simulated: bool,
    pub error: Option<String>,
    pub active_tab: Tab,
    /// Session whose updates drive the dashboard; older ones only feed the logs
    session: SessionId,
    config: Config,
    receiver: Receiver<SessionMessage>,
    connect_sender: Sender<ConnectionCommand>,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    ScanDevices,
    DevicesScanned(Result<Vec<BatteryDevice>, ScanError>),
    SelectDevice(BatteryDevice),
    ConnectDevice,
    StartSimulation,
    DisconnectDevice,
    SelectTab(Tab),
    DismissError,
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

impl IonicMonitor {
    pub fn new(
        receiver: Receiver<SessionMessage>,
        connect_sender: Sender<ConnectionCommand>,
        config: Config,
    ) -> (Self, Task<Message>) {
        let startup = match config.data_source {
            DataSource::Simulated => Task::done(Message::StartSimulation),
            DataSource::Bluetooth => Task::none(),
        };

        (
            IonicMonitor {
                snapshot: BatterySnapshot::default(),
                history: History::new(),
                events: EventLog::new(EVENT_LOG_CAPACITY),
                debug_log: EventLog::new(DEBUG_LOG_CAPACITY),
                connection_state: ConnectionState::Disconnected,
                available_devices: Vec::new(),
                selected_device: None,
                device_name: None,
                simulated: false,
                error: None,
                active_tab: Tab::Basic,
                session: 0,
                config,
                receiver,
                connect_sender,
            },
            startup,
        )
    }

    /// Back to the zeroed dashboard
    fn reset_session(&mut self) {
        self.connection_state = ConnectionState::Disconnected;
        self.snapshot = BatterySnapshot::default();
        self.history = History::new();
        self.device_name = None;
        self.selected_device = None;
        self.simulated = false;
        self.active_tab = Tab::Basic;
    }

    fn session_active(&self) -> bool {
        matches!(
            self.connection_state,
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }

    /// Starts a new session generation, leaving every earlier one stale
    fn next_session(&mut self) -> SessionId {
        self.session += 1;
        self.session
    }

    fn receive(&mut self, message: SessionMessage) {
        if message.session == self.session {
            self.apply_update(message.update);
            return;
        }

        match message.update {
            update @ (SessionUpdate::Event(_) | SessionUpdate::Debug(_)) => self.apply_update(update),
            update => log::debug!(
                "Ignoring update from stale session {} (current {}): {:?}",
                message.session,
                self.session,
                update
            ),
        }
    }

    fn apply_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Status(status) => match status {
                ConnectionStatus::Connecting => {
                    self.connection_state = ConnectionState::Connecting;
                }
                ConnectionStatus::Connected { name } => {
                    self.connection_state = ConnectionState::Connected;
                    self.device_name = Some(name);
                    self.available_devices.clear();
                    self.error = None;
                }
                // A session winding down must not clobber a scan already in progress
                ConnectionStatus::Disconnected
                    if self.connection_state == ConnectionState::Scanning => {}
                ConnectionStatus::Disconnected => {
                    self.reset_session();
                }
                ConnectionStatus::Error(e) => {
                    log::error!("Connection error: {}", e);
                    self.reset_session();
                    self.error = Some(e);
                }
            },
            SessionUpdate::Snapshot(_) | SessionUpdate::Reading(_) if !self.session_active() => {
                log::debug!("Dropping telemetry that arrived after disconnect");
            }
            SessionUpdate::Snapshot(snapshot) => {
                self.history.record(
                    now_ms(),
                    snapshot.voltage(),
                    snapshot.current(),
                    snapshot.power(),
                );
                self.snapshot = snapshot;
            }
            SessionUpdate::Reading(Reading::StateOfCharge(level)) => {
                self.snapshot.set_state_of_charge(i32::from(level));
            }
            SessionUpdate::Event(message) => self.events.push(message),
            SessionUpdate::Debug(message) => self.debug_log.push(message),
        }
    }

    fn send_command(&mut self, command: ConnectionCommand) -> bool {
        match self.connect_sender.send(command) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to send connection request: {}", e);
                self.error =
                    Some("Bluetooth worker is not running. Restart the application.".to_string());
                self.connection_state = ConnectionState::Disconnected;
                false
            }
        }
    }

    fn connect_selected(&mut self) {
        if let Some(device) = self.selected_device.clone() {
            self.connection_state = ConnectionState::Connecting;
            self.error = None;
            self.debug_log.push(format!("Connecting to {}", device.name));
            let session = self.next_session();
            self.send_command(ConnectionCommand::Connect {
                device_id: device.id,
                session,
            });
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                // Process all pending updates without blocking
                while let Ok(message) = self.receiver.try_recv() {
                    self.receive(message);
                }
                Task::none()
            }
            Message::ScanDevices => {
                self.connection_state = ConnectionState::Scanning;
                self.available_devices.clear();
                self.selected_device = None;
                self.error = None;
                self.debug_log.clear();
                self.debug_log.push("Starting Bluetooth scan...");
                Task::perform(scan_devices(self.config.clone()), Message::DevicesScanned)
            }
            Message::DevicesScanned(result) => {
                self.connection_state = ConnectionState::Disconnected;
                match result {
                    Ok(devices) => {
                        for device in &devices {
                            self.debug_log.push(format!("Found device: {}", device.name));
                        }
                        self.available_devices = devices;
                        if self.config.enable_autoconnect {
                            self.selected_device = self.available_devices.first().cloned();
                            self.connect_selected();
                        }
                    }
                    Err(e) => {
                        log::warn!("Error scanning devices: {}", e);
                        self.debug_log.push(format!("Scan error: {}", e));
                        self.error = Some(e.to_string());
                    }
                }
                Task::none()
            }
            Message::SelectDevice(device) => {
                self.selected_device = Some(device);
                Task::none()
            }
            Message::ConnectDevice => {
                self.connect_selected();
                Task::none()
            }
            Message::StartSimulation => {
                self.connection_state = ConnectionState::Connecting;
                self.error = None;
                let session = self.next_session();
                if self.send_command(ConnectionCommand::StartSimulation { session }) {
                    self.simulated = true;
                }
                Task::none()
            }
            Message::DisconnectDevice => {
                log::info!("UI: Sending disconnect command");
                self.send_command(ConnectionCommand::Disconnect);
                self.next_session();
                // Don't wait for the session to wind down before zeroing the dashboard
                self.reset_session();
                Task::none()
            }
            Message::SelectTab(tab) => {
                self.active_tab = tab;
                Task::none()
            }
            Message::DismissError => {
                self.error = None;
                Task::none()
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        let sidebar = self.create_sidebar();

        let main_content = if self.connection_state == ConnectionState::Connected {
            self.create_main_view()
        } else {
            self.create_disconnected_view()
        };

        let main_column = match &self.error {
            Some(error) => column![self.create_error_banner(error), main_content],
            None => column![main_content],
        };

        container(row![sidebar, main_column].spacing(0))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn create_error_banner<'a>(&self, error: &'a str) -> Element<'a, Message> {
        let banner = row![
            text(error).color(styles::RED).width(Length::Fill),
            button(text("Dismiss").size(14)).on_press(Message::DismissError),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        container(banner)
            .style(container::bordered_box)
            .padding(10)
            .width(Length::Fill)
            .into()
    }

    fn create_sidebar(&self) -> Element<'_, Message> {
        let title = text("Ionic Batteries").size(20);
        let idle = self.connection_state == ConnectionState::Disconnected;

        let scan_button = button(text(if self.connection_state == ConnectionState::Scanning {
            "Searching for Ionic battery..."
        } else {
            "Scan for Battery"
        }))
        .on_press_maybe(idle.then_some(Message::ScanDevices))
        .width(Length::Fill)
        .padding(10)
        .style(styles::primary_button_style());

        let simulate_button = button(text("Run Simulation"))
            .on_press_maybe(idle.then_some(Message::StartSimulation))
            .width(Length::Fill)
            .padding(10)
            .style(styles::primary_button_style());

        let device_list: Element<'_, Message> = if self.available_devices.is_empty() {
            text("No batteries found yet. Power the pack on and scan.").size(14).into()
        } else {
            let devices = self.available_devices.iter().map(|device| {
                let is_selected = self.selected_device.as_ref() == Some(device);

                button(text(format!("{}\n{}", device.name, device.summary())).size(14))
                    .on_press_maybe(idle.then(|| Message::SelectDevice(device.clone())))
                    .width(Length::Fill)
                    .padding(10)
                    .style(styles::device_button_style(is_selected))
                    .into()
            });

            scrollable(column(devices).spacing(5)).into()
        };

        let connect_button = match self.connection_state {
            ConnectionState::Connected => button(text("Disconnect"))
                .on_press(Message::DisconnectDevice)
                .padding(10)
                .width(Length::Fill)
                .style(styles::disconnect_button_style()),
            ConnectionState::Connecting => button(text("Connecting..."))
                .on_press(Message::DisconnectDevice)
                .padding(10)
                .width(Length::Fill)
                .style(styles::disconnect_button_style()),
            _ => match &self.selected_device {
                Some(_) => button(text("Connect"))
                    .on_press_maybe(idle.then_some(Message::ConnectDevice))
                    .padding(10)
                    .width(Length::Fill)
                    .style(styles::connect_button_style()),
                None => button(text("Select a battery"))
                    .padding(10)
                    .width(Length::Fill),
            },
        };

        let sidebar_content = column![
            title,
            scan_button,
            simulate_button,
            device_list,
            connect_button,
            self.create_event_log(),
        ]
        .spacing(10)
        .padding(20)
        .width(300);

        container(sidebar_content)
            .style(container::bordered_box)
            .width(Length::Fixed(300.0))
            .height(Length::Fill)
            .into()
    }

    fn create_event_log(&self) -> Element<'_, Message> {
        let entries = self.events.iter().map(|entry| {
            text(format!("{}  {}", entry.time_label(), entry.message))
                .size(12)
                .into()
        });

        column![
            text(format!("Events ({})", self.events.len())).size(16),
            column(entries).spacing(2),
        ]
        .spacing(6)
        .into()
    }

    fn create_disconnected_view(&self) -> Element<'_, Message> {
        let message = match self.connection_state {
            ConnectionState::Scanning => "Scanning for batteries...",
            ConnectionState::Connecting => "Connecting to battery...",
            _ => "Scan for an Ionic battery or run the simulation to begin",
        };

        let requirements = text(
            "Requirements: Bluetooth enabled on this computer, battery powered on and in range.",
        )
        .size(14);

        let hint = text(
            "The battery's data protocol is not publicly documented. After connecting, \
             every service and characteristic is listed in the Debug tab.",
        )
        .size(14)
        .color(styles::GREY);

        let mut content = column![text(message).size(24), requirements, hint]
            .spacing(12)
            .width(Length::Fill)
            .align_x(iced::alignment::Horizontal::Center);

        if !self.debug_log.is_empty() {
            content = content.push(self.create_debug_log());
        }

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .center(Length::Fill)
            .into()
    }

    fn create_main_view(&self) -> Element<'_, Message> {
        let device = text(format!(
            "Connected to: {}",
            self.device_name.as_deref().unwrap_or("Unknown Device")
        ))
        .size(18);

        let tab = |label: &'static str, target: Tab| {
            button(text(label))
                .on_press(Message::SelectTab(target))
                .padding(10)
                .width(Length::Fill)
                .style(styles::tab_button_style(self.active_tab == target))
        };
        let tabs = row![tab("Basic Info", Tab::Basic), tab("Debug", Tab::Debug)];

        let body = match self.active_tab {
            Tab::Basic => self.create_basic_tab(),
            Tab::Debug => self.create_debug_log(),
        };

        container(column![device, tabs, body].spacing(10).padding(20))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn create_basic_tab(&self) -> Element<'_, Message> {
        let snapshot = &self.snapshot;
        let soc = snapshot.state_of_charge();

        let data_row = |label: &'static str, value: String| {
            row![text(label).color(styles::GREY), horizontal_space(), text(value)]
        };

        let gauge = column![
            text(format!("{}%", soc)).size(40).color(styles::soc_color(soc)),
            progress_bar(0.0..=100.0, f32::from(soc)).height(Length::Fixed(12.0)),
            text(snapshot.status.label()).color(styles::status_color(snapshot.status)),
        ]
        .spacing(6);

        let stats = column![
            gauge,
            data_row("Voltage", format!("{:.2}V", snapshot.voltage())),
            data_row("Current", format!("{:.2}A", snapshot.current())),
            data_row("Power", format!("{:.2}W", snapshot.power())),
            data_row("Temperature", format!("{:.1}°C", snapshot.temperature)),
            data_row("Cycles", snapshot.cycles.to_string()),
            data_row("Time to full", snapshot.time_to_full.clone()),
            data_row("Time to empty", snapshot.time_to_empty.clone()),
        ]
        .spacing(8)
        .width(Length::FillPortion(1));

        let stats: Element<'_, Message> = if self.simulated {
            stats.into()
        } else {
            stats
                .push(
                    text(
                        "Only the standard Battery Level is decoded. \
                         Raw values are in the Debug tab.",
                    )
                    .size(12)
                    .color(styles::GREY),
                )
                .into()
        };

        if self.history.is_empty() {
            return stats;
        }

        let voltage_chart = ChartWidget::new(VoltageChartType { state: self })
            .width(Length::Fill)
            .height(Length::Fill);

        let current_chart = ChartWidget::new(CurrentChartType { state: self })
            .width(Length::Fill)
            .height(Length::Fill);

        let power_chart = ChartWidget::new(PowerChartType { state: self })
            .width(Length::Fill)
            .height(Length::Fill);

        let plots = column![voltage_chart, current_chart, power_chart]
            .width(Length::FillPortion(2))
            .spacing(10);

        row![plots, stats].spacing(20).into()
    }

    fn create_debug_log(&self) -> Element<'_, Message> {
        let lines = self.debug_log.iter_chronological().map(|entry| {
            text(format!("{}: {}", entry.time_label(), entry.message))
                .size(12)
                .font(Font::MONOSPACE)
                .into()
        });

        container(
            column![
                text("Bluetooth Debug Log").size(16),
                scrollable(column(lines).spacing(2)).height(Length::Fill),
            ]
            .spacing(8),
        )
        .style(container::bordered_box)
        .padding(10)
        .width(Length::Fill)
        .into()
    }
}
