//! # Error Types Module
//!
//! Centralized error handling for the Ionic Monitor application.
//! Every failure ends up as a single message string in the UI, so the
//! `Display` implementations double as the user-facing wording.
//!
//! ## Error Types
//! - `ConnectionError`: Bluetooth session and runtime failures
//! - `ConfigError`: Configuration file I/O and parsing errors
//! - `ScanError`: Bluetooth device discovery errors
//!
//! ## Usage Examples
//! ```rust
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//!
//! // Session module uses ConnectionError
//! async fn establish(...) -> Result<Peripheral, ConnectionError> { ... }
//!
//! // Scanner module uses ScanError
//! pub async fn scan_devices(...) -> Result<Vec<BatteryDevice>, ScanError> { ... }
//! ```

use std::fmt;

/// Errors that can occur while running a battery session
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to create Tokio runtime
    RuntimeCreation(String),
    /// Bluetooth adapter not found or not available
    NoAdapter,
    /// The device disappeared between scanning and connecting
    DeviceNotFound(String),
    /// Failed to connect to specific device
    DeviceConnection { device_id: String, reason: String },
    /// Connection was interrupted
    Interrupted,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::RuntimeCreation(msg) => {
                write!(f, "Failed to create async runtime: {}", msg)
            }
            ConnectionError::NoAdapter => {
                write!(f, "No Bluetooth adapter found. Please ensure Bluetooth is enabled.")
            }
            ConnectionError::DeviceNotFound(device_id) => {
                write!(
                    f,
                    "Battery {} is no longer in range. Scan again and retry.",
                    device_id
                )
            }
            ConnectionError::DeviceConnection { device_id, reason } => {
                write!(f, "Connection failed: {} ({})", reason, device_id)
            }
            ConnectionError::Interrupted => {
                write!(f, "Connection was interrupted by user")
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

/// Errors that can occur during device scanning
///
/// Cloneable so it can travel inside an iced `Message`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Bluetooth manager initialization failed
    ManagerInit(String),
    /// No Bluetooth adapters available, i.e. the platform can't do BLE
    NoAdapters,
    /// The OS refused Bluetooth access
    PermissionDenied,
    /// Scan finished without a matching battery
    NotFound,
    /// Scan operation failed
    ScanFailed(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::ManagerInit(msg) => {
                write!(f, "Failed to initialize Bluetooth manager: {}", msg)
            }
            ScanError::NoAdapters => {
                write!(
                    f,
                    "Bluetooth is not supported on this system. Enable a Bluetooth adapter and try again."
                )
            }
            ScanError::PermissionDenied => {
                write!(
                    f,
                    "Bluetooth permission denied. Please allow Bluetooth access and try again."
                )
            }
            ScanError::NotFound => {
                write!(
                    f,
                    "No Ionic battery found. Make sure your battery is powered on and within range."
                )
            }
            ScanError::ScanFailed(msg) => {
                write!(f, "Scanning failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<btleplug::Error> for ScanError {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::PermissionDenied => ScanError::PermissionDenied,
            btleplug::Error::DeviceNotFound => ScanError::NotFound,
            btleplug::Error::NotSupported(_) => ScanError::NoAdapters,
            other => ScanError::ScanFailed(other.to_string()),
        }
    }
}
