//! # UI Styling Module
//!
//! Button styles and the colour coding for state of charge and battery
//! status, shared by the sidebar and the dashboard.

use crate::telemetry::BatteryStatus;
use iced::widget::button;
use iced::{Background, Border, Color};

pub const GREEN: Color = Color { r: 0.13, g: 0.77, b: 0.37, a: 1.0 };
pub const YELLOW: Color = Color { r: 0.92, g: 0.70, b: 0.03, a: 1.0 };
pub const RED: Color = Color { r: 0.94, g: 0.27, b: 0.27, a: 1.0 };
pub const BLUE: Color = Color { r: 0.23, g: 0.51, b: 0.96, a: 1.0 };
pub const GREY: Color = Color { r: 0.61, g: 0.64, b: 0.69, a: 1.0 };

/// Colour for a state of charge value (>60 green, >30 yellow, else red)
pub fn soc_color(soc: u8) -> Color {
    if soc > 60 {
        GREEN
    } else if soc > 30 {
        YELLOW
    } else {
        RED
    }
}

pub fn status_color(status: BatteryStatus) -> Color {
    match status {
        BatteryStatus::Charging => BLUE,
        BatteryStatus::Discharging => YELLOW,
        BatteryStatus::Standby => GREY,
    }
}

fn solid(background: Color, border: Color, border_width: f32, text_color: Color) -> button::Style {
    button::Style {
        background: Some(Background::Color(background)),
        text_color,
        border: Border {
            color: border,
            width: border_width,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

fn shade(rgb: (f32, f32, f32), delta: f32) -> Color {
    Color::from_rgb(
        (rgb.0 + delta).clamp(0.0, 1.0),
        (rgb.1 + delta).clamp(0.0, 1.0),
        (rgb.2 + delta).clamp(0.0, 1.0),
    )
}

/// Active/hover/pressed variants of one base colour
fn filled(rgb: (f32, f32, f32), border_width: f32, status: button::Status) -> button::Style {
    let (background, border) = match status {
        button::Status::Active => (shade(rgb, 0.0), shade(rgb, 0.1)),
        button::Status::Hovered => (shade(rgb, 0.1), shade(rgb, 0.2)),
        button::Status::Pressed => (shade(rgb, -0.05), shade(rgb, 0.0)),
        button::Status::Disabled => {
            return solid(
                Color::from_rgb(0.3, 0.3, 0.3),
                Color::from_rgb(0.4, 0.4, 0.4),
                1.0,
                Color::from_rgb(0.6, 0.6, 0.6),
            )
        }
    };
    solid(background, border, border_width, Color::WHITE)
}

/// Style for device list buttons based on selection state
pub fn device_button_style(
    is_selected: bool,
) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| {
        if is_selected {
            // Selected: Teal
            filled((0.2, 0.6, 0.7), 2.0, status)
        } else {
            filled((0.4, 0.4, 0.4), 1.0, status)
        }
    }
}

/// Style for the scan / simulate buttons (blue theme)
pub fn primary_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |_theme: &iced::Theme, status: button::Status| filled((0.15, 0.39, 0.92), 1.0, status)
}

/// Style for connect button (green theme)
pub fn connect_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |_theme: &iced::Theme, status: button::Status| filled((0.2, 0.7, 0.2), 1.0, status)
}

/// Style for disconnect button (red theme)
pub fn disconnect_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |_theme: &iced::Theme, status: button::Status| filled((0.8, 0.2, 0.2), 1.0, status)
}

/// Style for the Basic / Debug tab headers
pub fn tab_button_style(is_active: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| {
        let text_color = if is_active { BLUE } else { GREY };
        let background = match status {
            button::Status::Hovered | button::Status::Pressed => Color::from_rgb(0.92, 0.92, 0.92),
            _ => Color::TRANSPARENT,
        };
        button::Style {
            background: Some(Background::Color(background)),
            text_color,
            border: Border {
                color: if is_active { BLUE } else { Color::TRANSPARENT },
                width: if is_active { 1.0 } else { 0.0 },
                radius: 0.0.into(),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soc_color_bands() {
        assert_eq!(soc_color(100), GREEN);
        assert_eq!(soc_color(61), GREEN);
        assert_eq!(soc_color(60), YELLOW);
        assert_eq!(soc_color(31), YELLOW);
        assert_eq!(soc_color(30), RED);
        assert_eq!(soc_color(0), RED);
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(BatteryStatus::Charging), BLUE);
        assert_eq!(status_color(BatteryStatus::Discharging), YELLOW);
        assert_eq!(status_color(BatteryStatus::Standby), GREY);
    }
}
