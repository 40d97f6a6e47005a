//! Rule-based severity scoring against maize-growing ranges.
//!
//! Each present reading adds 2 points when it falls outside its danger band,
//! 1 point when it is only outside its ideal band, and nothing otherwise.
//! A total of 4 or more is `high`, 2 or more is `medium`, anything else `low`.

use crate::db::models::Severity;

/// Ideal and danger ranges for one scalar. Both ranges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub ideal: (f64, f64),
    pub danger: (f64, f64),
}

impl Band {
    /// Points contributed by `value`; a missing value always scores 0.
    pub fn points(&self, value: Option<f64>) -> u8 {
        let Some(v) = value else { return 0 };
        if v < self.danger.0 || v > self.danger.1 {
            2
        } else if v < self.ideal.0 || v > self.ideal.1 {
            1
        } else {
            0
        }
    }
}

/// Soil moisture, percent.
pub const MOISTURE: Band = Band { ideal: (60.0, 80.0), danger: (50.0, 90.0) };
/// Soil temperature, degrees Celsius.
pub const TEMPERATURE: Band = Band { ideal: (15.0, 30.0), danger: (10.0, 35.0) };
/// Soil humidity, percent.
pub const HUMIDITY: Band = Band { ideal: (50.0, 70.0), danger: (40.0, 80.0) };
/// Soil pH.
pub const PH: Band = Band { ideal: (5.5, 7.0), danger: (5.0, 8.0) };

pub fn score(
    moisture: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    ph: Option<f64>,
) -> u8 {
    MOISTURE.points(moisture)
        + TEMPERATURE.points(temperature)
        + HUMIDITY.points(humidity)
        + PH.points(ph)
}

pub fn severity_for_score(score: u8) -> Severity {
    match score {
        s if s >= 4 => Severity::High,
        s if s >= 2 => Severity::Medium,
        _ => Severity::Low,
    }
}

pub fn determine_severity(
    moisture: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    ph: Option<f64>,
) -> Severity {
    severity_for_score(score(moisture, temperature, humidity, ph))
}
