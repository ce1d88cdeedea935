//! # GATT Probe Module
//!
//! Interprets characteristic values read from the battery. The pack's BMS
//! protocol is undocumented, so only the standard Bluetooth SIG Battery Level
//! characteristic is decoded; everything else is surfaced as a hex dump in
//! the debug log for manual inspection.

use uuid::Uuid;

/// Standard Battery Service (0x180F)
pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
/// Standard Battery Level characteristic (0x2A19)
pub const BATTERY_LEVEL: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);
/// Vendor service seen on several BMS boards (0xFF00)
pub const VENDOR_FF00_SERVICE: Uuid = Uuid::from_u128(0x0000ff00_0000_1000_8000_00805f9b34fb);
/// Nordic UART Service, a common serial tunnel for BMS protocols
pub const NORDIC_UART_SERVICE: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);

/// A value we know how to interpret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    StateOfCharge(u8),
}

/// Decode a characteristic value, if its meaning is known.
pub fn decode(uuid: &Uuid, value: &[u8]) -> Option<Reading> {
    if *uuid == BATTERY_LEVEL {
        return decode_battery_level(value).map(Reading::StateOfCharge);
    }
    None
}

/// Battery Level is a single unsigned byte, 0..=100 percent
fn decode_battery_level(value: &[u8]) -> Option<u8> {
    match value.first() {
        Some(&level) if level <= 100 => Some(level),
        _ => None,
    }
}

/// Human name for services that show up on these packs
pub fn service_name(uuid: &Uuid) -> Option<&'static str> {
    match *uuid {
        BATTERY_SERVICE => Some("Battery Service"),
        VENDOR_FF00_SERVICE => Some("Vendor Service 0xFF00"),
        NORDIC_UART_SERVICE => Some("Nordic UART"),
        _ => None,
    }
}

/// Render bytes as lowercase, space separated hex (`0a ff 12`)
pub fn hex_dump(value: &[u8]) -> String {
    value
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_battery_level() {
        assert_eq!(decode(&BATTERY_LEVEL, &[87]), Some(Reading::StateOfCharge(87)));
        assert_eq!(decode(&BATTERY_LEVEL, &[100, 0]), Some(Reading::StateOfCharge(100)));
    }

    #[test]
    fn test_battery_level_rejects_invalid() {
        assert_eq!(decode(&BATTERY_LEVEL, &[]), None);
        assert_eq!(decode(&BATTERY_LEVEL, &[101]), None);
        assert_eq!(decode(&BATTERY_LEVEL, &[0xff]), None);
    }

    #[test]
    fn test_unknown_characteristic_is_not_decoded() {
        let unknown = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);
        assert_eq!(decode(&unknown, &[0x0a, 0x14]), None);
        assert_eq!(decode(&BATTERY_SERVICE, &[50]), None);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x0a, 0xff, 0x12]), "0a ff 12");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_service_names() {
        assert_eq!(service_name(&BATTERY_SERVICE), Some("Battery Service"));
        assert_eq!(service_name(&NORDIC_UART_SERVICE), Some("Nordic UART"));
        assert_eq!(service_name(&BATTERY_LEVEL), None);
    }
}
