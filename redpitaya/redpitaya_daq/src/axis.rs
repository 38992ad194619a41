//! Map raw sample buffers onto a time axis.

/// Unit of the time axis.
pub const TIME_UNIT: &str = "s";

/// The trigger delay that positions the time axis, with its unit stated explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerDelay {
    /// Delay in samples of the sampling clock.
    Samples(i64),
    /// Delay in nanoseconds, as reported by the board.
    Nanoseconds(i64),
    /// Delay in seconds.
    Seconds(f64),
}

impl TriggerDelay {
    /// The delay in seconds for a board with the given sampling clock in Hz.
    pub fn as_seconds(&self, clock_rate: f64) -> f64 {
        match *self {
            TriggerDelay::Samples(samples) => samples as f64 / clock_rate,
            TriggerDelay::Nanoseconds(ns) => ns as f64 * 1e-9,
            TriggerDelay::Seconds(s) => s,
        }
    }
}

/// A linear time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    offset: f64,
    scaling: f64,
}

impl TimeAxis {
    /// Unit of the axis, always seconds.
    pub fn unit(&self) -> &'static str {
        TIME_UNIT
    }

    /// Time of the first sample in seconds.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Time between two samples in seconds.
    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// Time of the sample with index `idx` in seconds.
    pub fn time_at(&self, idx: usize) -> f64 {
        self.offset + idx as f64 * self.scaling
    }
}

/// Acquired samples together with their time axis.
///
/// A series is only created by [`map`] and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    values: Vec<f64>,
    axis: TimeAxis,
}

impl SampleSeries {
    /// The samples, ordered by acquisition time.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The time axis of the samples.
    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the sample times in seconds.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.values.len()).map(|idx| self.axis.time_at(idx))
    }

    /// Consume the series and return the samples.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Build a [`SampleSeries`] from raw samples.
///
/// The sample spacing is `decimation / clock_rate` seconds and the axis starts at the trigger
/// delay converted to seconds. The samples themselves are passed through unchanged.
///
/// # Arguments
/// * `samples` - Samples ordered by acquisition time.
/// * `decimation` - Decimation factor that was active during the acquisition.
/// * `clock_rate` - Sampling clock of the board in Hz.
/// * `delay` - Trigger delay with its unit.
pub fn map(samples: Vec<f64>, decimation: u32, clock_rate: f64, delay: TriggerDelay) -> SampleSeries {
    SampleSeries {
        values: samples,
        axis: TimeAxis {
            offset: delay.as_seconds(clock_rate),
            scaling: decimation as f64 / clock_rate,
        },
    }
}
