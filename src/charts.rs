use crate::app::{IonicMonitor, Message};
use crate::timeseries::{Point, PointSliceExt};
use plotters::chart::ChartBuilder;
use plotters::series::LineSeries;
use plotters::style::{RGBColor, BLUE, MAGENTA, RED};
use plotters_iced::{Chart, DrawingBackend};

const BACKGROUND: RGBColor = RGBColor(245, 245, 240);
const AXIS: RGBColor = RGBColor(60, 60, 60);

// Chart types
pub struct VoltageChartType<'a> {
    pub state: &'a IonicMonitor,
}

pub struct CurrentChartType<'a> {
    pub state: &'a IonicMonitor,
}

pub struct PowerChartType<'a> {
    pub state: &'a IonicMonitor,
}

/// Value axis with a little headroom; flat series get a fixed band
fn value_range(points: &[Point]) -> (f64, f64) {
    match points.min_max_value() {
        Some((min, max)) if (max - min).abs() > f64::EPSILON => {
            let pad = (max - min) * 0.1;
            (min - pad, max + pad)
        }
        Some((value, _)) => (value - 1.0, value + 1.0),
        None => (0.0, 1.0),
    }
}

fn time_range(points: &[Point]) -> (u64, u64) {
    match points.min_max_time() {
        Some((min, max)) if max > min => (min, max),
        Some((min, _)) => (min, min + 1),
        None => (0, 1),
    }
}

fn draw_line<DB: DrawingBackend>(
    mut builder: ChartBuilder<DB>,
    caption: &str,
    points: &[Point],
    color: &RGBColor,
) {
    let (min_time, max_time) = time_range(points);
    let (min_value, max_value) = value_range(points);

    let mut chart = match builder
        .margin(15)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(0)
        .y_label_area_size(40)
        .build_cartesian_2d(min_time..max_time, min_value..max_value)
    {
        Ok(chart) => chart,
        Err(e) => {
            log::warn!("Failed to build {} chart: {:?}", caption, e);
            return;
        }
    };

    if let Err(e) = chart.plotting_area().fill(&BACKGROUND) {
        log::warn!("Failed to fill {} background: {:?}", caption, e);
    }

    if let Err(e) = chart.configure_mesh().axis_style(AXIS).draw() {
        log::warn!("Failed to draw {} mesh: {:?}", caption, e);
    }

    if let Err(e) = chart.draw_series(LineSeries::new(
        points.iter().map(|p| (p.time, p.value)),
        color,
    )) {
        log::warn!("Failed to draw {} series: {:?}", caption, e);
    }
}

// Voltage Chart
impl<'a> Chart<Message> for VoltageChartType<'a> {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, builder: ChartBuilder<DB>) {
        let points = self.state.history.voltage.points();
        draw_line(builder, "Voltage (V)", points, &BLUE);
    }
}

// Current Chart
impl<'a> Chart<Message> for CurrentChartType<'a> {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, builder: ChartBuilder<DB>) {
        let points = self.state.history.current.points();
        draw_line(builder, "Current (A)", points, &MAGENTA);
    }
}

// Power Chart
impl<'a> Chart<Message> for PowerChartType<'a> {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, builder: ChartBuilder<DB>) {
        let points = self.state.history.power.points();
        draw_line(builder, "Power (W)", points, &RED);
    }
}
