use crate::config::Config;
use crate::error::ScanError;
use crate::probe;
use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};

/// A battery seen during discovery. Only lives until the next connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryDevice {
    pub id: String,
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub last_soc: Option<u8>,
}

impl BatteryDevice {
    fn from_properties(id: String, props: PeripheralProperties) -> Option<Self> {
        let name = props.local_name?;
        let last_soc = props
            .service_data
            .get(&probe::BATTERY_SERVICE)
            .and_then(|data| data.first().copied())
            .filter(|level| *level <= 100);

        Some(Self {
            id,
            name,
            address: props.address.to_string(),
            rssi: props.rssi,
            last_soc,
        })
    }

    /// One-line summary for the device list
    pub fn summary(&self) -> String {
        let mut parts = vec![self.address.clone()];
        if let Some(rssi) = self.rssi {
            parts.push(format!("{} dBm", rssi));
        }
        if let Some(soc) = self.last_soc {
            parts.push(format!("{}%", soc));
        }
        parts.join("  ·  ")
    }
}

/// Stable identifier for a peripheral within this process
pub fn peripheral_key(peripheral: &Peripheral) -> String {
    format!("{:?}", peripheral.id())
}

/// First Bluetooth adapter on the system
pub async fn first_adapter() -> Result<Adapter, ScanError> {
    let manager = Manager::new()
        .await
        .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(ScanError::NoAdapters)
}

/// Scans for nearby batteries whose advertised name matches the config
pub async fn scan_devices(config: Config) -> Result<Vec<BatteryDevice>, ScanError> {
    let central = first_adapter().await?;

    log::info!("Scanning for batteries for {:?}", config.scan_window());
    central.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(config.scan_window()).await;
    central.stop_scan().await?;

    let peripherals = central.peripherals().await?;

    let mut devices = Vec::new();
    for peripheral in peripherals {
        // Get peripheral properties
        if let Ok(Some(props)) = peripheral.properties().await {
            let matches = props
                .local_name
                .as_deref()
                .map(|name| config.matches_name(name))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            let key = peripheral_key(&peripheral);
            if let Some(device) = BatteryDevice::from_properties(key, props) {
                log::info!("Found battery {} ({})", device.name, device.address);
                devices.push(device);
            }
        }
    }

    if devices.is_empty() {
        return Err(ScanError::NotFound);
    }

    // Strongest signal first
    devices.sort_by(|a, b| b.rssi.cmp(&a.rssi));

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn props(name: Option<&str>, rssi: Option<i16>, soc: Option<u8>) -> PeripheralProperties {
        let mut service_data = HashMap::new();
        if let Some(soc) = soc {
            service_data.insert(probe::BATTERY_SERVICE, vec![soc]);
        }
        PeripheralProperties {
            local_name: name.map(str::to_string),
            rssi,
            service_data,
            ..Default::default()
        }
    }

    #[test]
    fn test_device_from_properties() {
        let device = BatteryDevice::from_properties(
            "dev".to_string(),
            props(Some("IC-24V50-EP"), Some(-61), Some(72)),
        )
        .unwrap();

        assert_eq!(device.name, "IC-24V50-EP");
        assert_eq!(device.rssi, Some(-61));
        assert_eq!(device.last_soc, Some(72));
        assert!(device.summary().contains("-61 dBm"));
        assert!(device.summary().contains("72%"));
    }

    #[test]
    fn test_unnamed_peripheral_is_skipped() {
        let device = BatteryDevice::from_properties("dev".to_string(), props(None, None, None));
        assert!(device.is_none());
    }

    #[test]
    fn test_invalid_advertised_soc_is_ignored() {
        let device = BatteryDevice::from_properties(
            "dev".to_string(),
            props(Some("IC-12V100"), None, Some(180)),
        )
        .unwrap();
        assert_eq!(device.last_soc, None);
    }
}
