use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;

pub const MAX_PASSENGERS: u32 = 10;

/// One trip as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub passenger_count: u32,
    pub pickup_zone: u32,
    pub dropoff_zone: u32,
    pub hour: u32,
    /// accepted for completeness; no feature depends on it
    #[serde(default)]
    pub minute: u32,
    pub day_of_month: u32,
    pub month: u32,
}

impl TripRequest {
    /// Range checks on each field. Whether day and month form a real date is
    /// decided later, against the reference year.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        let checks: [(&str, u32, u32, u32); 7] = [
            ("passenger_count", self.passenger_count, 1, MAX_PASSENGERS),
            ("pickup_zone", self.pickup_zone, 1, u32::MAX),
            ("dropoff_zone", self.dropoff_zone, 1, u32::MAX),
            ("hour", self.hour, 0, 23),
            ("minute", self.minute, 0, 59),
            ("day_of_month", self.day_of_month, 1, 31),
            ("month", self.month, 1, 12),
        ];
        for (field, value, min, max) in checks {
            if value < min || value > max {
                return Err(EstimatorError::InvalidInput(format!(
                    "{field} must be between {min} and {max}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// label emitted by the peak classifier
    pub peak_hour: f64,
    pub duration_minutes: f64,
    pub fare: f64,
}

impl PredictionResult {
    /// peak label as shown to the user: integral labels print without a fraction
    pub fn peak_label(&self) -> String {
        if self.peak_hour.fract() == 0.0 && self.peak_hour.abs() < 1e15 {
            format!("{}", self.peak_hour as i64)
        } else {
            format!("{}", self.peak_hour)
        }
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Peak Hour Prediction: {}", self.peak_label())?;
        writeln!(f, "Predicted Trip Duration: {:.2} minutes", self.duration_minutes)?;
        write!(f, "Estimated Fare Price: ${:.2}", self.fare)
    }
}
