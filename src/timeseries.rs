/// Points kept per series; older ones fall off the front
pub const HISTORY_LENGTH: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Milliseconds since the Unix epoch
    pub time: u64,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct TimeSeries {
    data: Vec<Point>,
    capacity: usize,
}

pub trait PointSliceExt {
    fn min_max_time(&self) -> Option<(u64, u64)>;
    fn min_max_value(&self) -> Option<(f64, f64)>;
}

impl PointSliceExt for [Point] {
    fn min_max_time(&self) -> Option<(u64, u64)> {
        self.iter().fold(None, |acc, point| match acc {
            None => Some((point.time, point.time)),
            Some((min, max)) => Some((min.min(point.time), max.max(point.time))),
        })
    }

    fn min_max_value(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |acc, point| match acc {
            None => Some((point.value, point.value)),
            Some((min, max)) => Some((min.min(point.value), max.max(point.value))),
        })
    }
}

impl TimeSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn add_point(&mut self, time: u64, value: f64) {
        self.data.push(Point { time, value });
        if self.data.len() > self.capacity {
            let excess = self.data.len() - self.capacity;
            self.data.drain(..excess);
        }
    }

    /// Oldest to newest
    pub fn points(&self) -> &[Point] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Voltage, current and power history for the charts
#[derive(Debug, Clone)]
pub struct History {
    pub voltage: TimeSeries,
    pub current: TimeSeries,
    pub power: TimeSeries,
}

impl History {
    pub fn new() -> Self {
        Self {
            voltage: TimeSeries::new(HISTORY_LENGTH),
            current: TimeSeries::new(HISTORY_LENGTH),
            power: TimeSeries::new(HISTORY_LENGTH),
        }
    }

    pub fn record(&mut self, time: u64, voltage: f64, current: f64, power: f64) {
        self.voltage.add_point(time, voltage);
        self.current.add_point(time, current);
        self.power.add_point(time, power);
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}
