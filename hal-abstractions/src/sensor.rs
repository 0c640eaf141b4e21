//! Environmental sensor abstraction

/// One temperature/humidity sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Degrees Celsius
    pub temperature_c: f32,
    /// Relative humidity, percent
    pub humidity_pct: f32,
}

impl Measurement {
    /// Both values are real numbers (no NaN / infinity sentinel)
    pub fn is_valid(&self) -> bool {
        self.temperature_c.is_finite() && self.humidity_pct.is_finite()
    }
}

/// Synchronous temperature/humidity sensor
///
/// A read blocks for the duration of one conversion. Implementors report
/// bus or protocol failures through `Self::Error`; a sensor that can only
/// signal failure with NaN may return such a measurement instead, which
/// callers must check with [`Measurement::is_valid`].
pub trait HumiditySensor {
    /// Error type for a failed read
    type Error: core::fmt::Debug;

    /// Perform one complete read
    fn read(&mut self) -> Result<Measurement, Self::Error>;
}
