use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    distance::{self, DIRECTION_PLACEHOLDER},
    error::EstimatorError,
    zones::TripCoordinates,
};

/// Year used to turn (month, day) into a weekday. Requests carry no year, so
/// the weekday is only right for trips taken in this year.
pub const REFERENCE_YEAR: i32 = 2024;

/// column order the peak classifier was trained on
pub const PEAK_SCHEMA: &[&str] = &[
    "passenger_count",
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "distance_haversine",
    "distance_dummy_manhattan",
    "direction",
    "Month",
    "DayofMonth",
    "Hour",
    "dayofweek",
    "avg_speed_h",
    "avg_speed_m",
];

/// the duration regressor consumes the peak vector unmodified
pub const DURATION_SCHEMA: &[&str] = PEAK_SCHEMA;

/// column order the fare regressor was trained on
pub const FARE_SCHEMA: &[&str] = &[
    "distance_haversine",
    "distance_dummy_manhattan",
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "peak_hour",
    "Month",
    "DayofMonth",
    "Hour",
    "dayofweek",
    "average_speed_h",
    "average_speed_m",
];

/// Weekday of a calendar date, Monday = 0 through Sunday = 6.
pub fn day_of_week(year: i32, month: u32, day: u32) -> Result<u32, EstimatorError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.weekday().num_days_from_monday())
        .ok_or(EstimatorError::InvalidDate { year, month, day })
}

/// Named, ordered model input. Values line up one-to-one with `schema`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    schema: &'static [&'static str],
    values: Vec<f64>,
}

impl FeatureVector {
    /// Builds a vector by pulling every schema column from `source`, in
    /// schema order. Returns the first column `source` cannot supply.
    fn assemble(
        schema: &'static [&'static str],
        source: impl Fn(&str) -> Option<f64>,
    ) -> Result<Self, &'static str> {
        let values = schema
            .iter()
            .map(|name| source(*name).ok_or(*name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schema, values })
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.schema.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// every derived scalar of one trip, prior to model-specific ordering
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripFeatures {
    pub passenger_count: u32,
    pub coords: TripCoordinates,
    pub distance_haversine: f64,
    pub distance_dummy_manhattan: f64,
    pub direction: f64,
    pub month: u32,
    pub day_of_month: u32,
    pub hour: u32,
    pub day_of_week: u32,
    pub avg_speed_h: f64,
    pub avg_speed_m: f64,
}

impl TripFeatures {
    /// derives the distance features from resolved coordinates; the two
    /// speed statistics are filled in by the caller's table lookups
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        passenger_count: u32,
        coords: TripCoordinates,
        month: u32,
        day_of_month: u32,
        hour: u32,
        day_of_week: u32,
        avg_speed_h: f64,
        avg_speed_m: f64,
    ) -> Self {
        let (p, d) = (coords.pickup, coords.dropoff);
        Self {
            passenger_count,
            coords,
            distance_haversine: distance::haversine(p.latitude, p.longitude, d.latitude, d.longitude),
            distance_dummy_manhattan: distance::dummy_manhattan(
                p.latitude,
                p.longitude,
                d.latitude,
                d.longitude,
            ),
            direction: DIRECTION_PLACEHOLDER,
            month,
            day_of_month,
            hour,
            day_of_week,
            avg_speed_h,
            avg_speed_m,
        }
    }

    /// Value of a named column. The fare model names the speed columns
    /// `average_speed_*`; both spellings resolve to the same statistic.
    /// `peak_hour` is not a trip feature and resolves to None.
    pub fn column(&self, name: &str) -> Option<f64> {
        let v = match name {
            "passenger_count" => self.passenger_count as f64,
            "pickup_longitude" => self.coords.pickup.longitude,
            "pickup_latitude" => self.coords.pickup.latitude,
            "dropoff_longitude" => self.coords.dropoff.longitude,
            "dropoff_latitude" => self.coords.dropoff.latitude,
            "distance_haversine" => self.distance_haversine,
            "distance_dummy_manhattan" => self.distance_dummy_manhattan,
            "direction" => self.direction,
            "Month" => self.month as f64,
            "DayofMonth" => self.day_of_month as f64,
            "Hour" => self.hour as f64,
            "dayofweek" => self.day_of_week as f64,
            "avg_speed_h" | "average_speed_h" => self.avg_speed_h,
            "avg_speed_m" | "average_speed_m" => self.avg_speed_m,
            _ => return None,
        };
        Some(v)
    }

    pub fn peak_vector(&self) -> FeatureVector {
        self.build(PEAK_SCHEMA, None)
    }

    pub fn duration_vector(&self) -> FeatureVector {
        self.build(DURATION_SCHEMA, None)
    }

    /// fare input, with the peak classifier's output fed back in
    pub fn fare_vector(&self, peak_hour: f64) -> FeatureVector {
        self.build(FARE_SCHEMA, Some(peak_hour))
    }

    fn build(&self, schema: &'static [&'static str], peak_hour: Option<f64>) -> FeatureVector {
        let source = |name: &str| match name {
            "peak_hour" => peak_hour,
            other => self.column(other),
        };
        match FeatureVector::assemble(schema, source) {
            Ok(v) => v,
            // every schema constant above is covered by `column`
            Err(missing) => unreachable!("no source for feature column '{missing}'"),
        }
    }
}
