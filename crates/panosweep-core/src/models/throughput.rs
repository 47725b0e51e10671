use std::time::Duration;

/// Points processed over a wall-clock interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub points: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn new(points: u64, elapsed: Duration) -> Self {
        Self { points, elapsed }
    }

    /// Points per second, `None` until time has passed and work was done
    pub fn per_second(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 || self.points == 0 {
            return None;
        }
        Some(self.points as f64 / secs)
    }

    /// Estimated time to process `remaining` more points at the current rate
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.per_second()?;
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }
}
