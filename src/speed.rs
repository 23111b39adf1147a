use std::{collections::HashMap, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::EstimatorError, zones::TripCoordinates};

pub const DEFAULT_SPEED_H_COLUMN: &str = "avg_speed_h";
pub const DEFAULT_SPEED_M_COLUMN: &str = "avg_speed_m";

/// key columns of a historical speed table, in join order
pub const KEY_COLUMNS: [&str; 7] = [
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "Month",
    "DayofMonth",
    "Hour",
];

/// One observed average speed for an origin/destination pair at a point in
/// the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSpeedRecord {
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub month: f64,
    pub day_of_month: f64,
    pub hour: f64,
    pub speed: f64,
}

impl HistoricalSpeedRecord {
    fn key(&self) -> Option<SpeedKey> {
        SpeedKey::new([
            self.pickup_longitude,
            self.pickup_latitude,
            self.dropoff_longitude,
            self.dropoff_latitude,
            self.month,
            self.day_of_month,
            self.hour,
        ])
    }
}

/// Bitwise key over the seven join columns, so that hashing agrees with
/// `==` on every value that can match: `-0.0` folds into `0.0` and NaN
/// never produces a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SpeedKey([u64; 7]);

impl SpeedKey {
    fn new(values: [f64; 7]) -> Option<Self> {
        let mut bits = [0u64; 7];
        for (slot, v) in bits.iter_mut().zip(values) {
            if v.is_nan() {
                return None;
            }
            *slot = if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        }
        Some(Self(bits))
    }
}

/// Exact-match lookup table over one speed metric.
///
/// Matching is bit-for-bit on the derived zone coordinates; there is no
/// tolerance and no nearest-neighbor fallback. A miss yields 0.0.
#[derive(Debug, Clone, Default)]
pub struct SpeedTable {
    speeds: HashMap<SpeedKey, f64>,
    rows: usize,
}

impl SpeedTable {
    /// builds the index, keeping the first record for any repeated key
    pub fn new(records: impl IntoIterator<Item = HistoricalSpeedRecord>) -> Self {
        let mut speeds = HashMap::new();
        let mut rows = 0;
        for record in records {
            rows += 1;
            if let Some(key) = record.key() {
                speeds.entry(key).or_insert(record.speed);
            }
        }
        Self { speeds, rows }
    }

    pub fn from_path(path: &Path, speed_column: &str) -> Result<Self, EstimatorError> {
        let file = std::fs::File::open(path).map_err(|e| EstimatorError::from_io(path, e))?;
        let table = read_speed_csv(file, speed_column).map_err(|error| match error {
            SpeedCsvError::Csv(e) => EstimatorError::from_csv(path, e),
            SpeedCsvError::Content(error) => EstimatorError::ReadError {
                filepath: path.display().to_string(),
                error,
            },
        })?;
        tracing::info!(
            "loaded {} '{}' rows ({} distinct keys) from {}",
            table.rows,
            speed_column,
            table.speeds.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, speed_column: &str) -> Result<Self, EstimatorError> {
        read_speed_csv(reader, speed_column).map_err(|error| EstimatorError::ReadError {
            filepath: String::from("<reader>"),
            error: match error {
                SpeedCsvError::Csv(e) => e.to_string(),
                SpeedCsvError::Content(msg) => msg,
            },
        })
    }

    /// Recorded speed for the exact coordinates and time bucket, or 0.0.
    pub fn lookup(&self, coords: &TripCoordinates, month: u32, day_of_month: u32, hour: u32) -> f64 {
        let key = SpeedKey::new([
            coords.pickup.longitude,
            coords.pickup.latitude,
            coords.dropoff.longitude,
            coords.dropoff.latitude,
            month as f64,
            day_of_month as f64,
            hour as f64,
        ]);
        key.and_then(|k| self.speeds.get(&k).copied())
            .unwrap_or(0.0)
    }

    /// number of rows read, including rows shadowed by an earlier duplicate
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

enum SpeedCsvError {
    Csv(csv::Error),
    Content(String),
}

fn read_speed_csv<R: Read>(reader: R, speed_column: &str) -> Result<SpeedTable, SpeedCsvError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().map_err(SpeedCsvError::Csv)?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SpeedCsvError::Content(format!("missing '{name}' column")))
    };
    let mut key_idx = [0usize; 7];
    for (slot, name) in key_idx.iter_mut().zip(KEY_COLUMNS) {
        *slot = column_index(name)?;
    }
    let speed_idx = column_index(speed_column)?;

    let mut records = vec![];
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row.map_err(SpeedCsvError::Csv)?;
        let cell = |col: usize| -> Result<f64, SpeedCsvError> {
            let raw = row.get(col).unwrap_or("").trim();
            // pandas writes missing values as empty cells
            if raw.is_empty() {
                return Ok(f64::NAN);
            }
            raw.parse::<f64>().map_err(|e| {
                SpeedCsvError::Content(format!(
                    "row {idx} column '{}': cannot parse '{raw}': {e}",
                    headers.get(col).unwrap_or("?")
                ))
            })
        };
        records.push(HistoricalSpeedRecord {
            pickup_longitude: cell(key_idx[0])?,
            pickup_latitude: cell(key_idx[1])?,
            dropoff_longitude: cell(key_idx[2])?,
            dropoff_latitude: cell(key_idx[3])?,
            month: cell(key_idx[4])?,
            day_of_month: cell(key_idx[5])?,
            hour: cell(key_idx[6])?,
            speed: cell(speed_idx)?,
        });
    }
    Ok(SpeedTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::Coordinate;

    const SPEED_H_CSV: &str = "\
pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,Month,DayofMonth,Hour,avg_speed_h
-73.98,40.75,-73.95,40.8,6,15,8,17.25
-73.98,40.75,-73.95,40.8,6,15,9,11.5
-73.98,40.75,-73.95,40.8,6,15,8,99.0
";

    fn trip() -> TripCoordinates {
        TripCoordinates {
            pickup: Coordinate {
                longitude: -73.98,
                latitude: 40.75,
            },
            dropoff: Coordinate {
                longitude: -73.95,
                latitude: 40.80,
            },
        }
    }

    #[test]
    fn test_exact_match() {
        let table = SpeedTable::from_reader(SPEED_H_CSV.as_bytes(), "avg_speed_h").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(&trip(), 6, 15, 9), 11.5);
    }

    #[test]
    fn test_duplicate_key_keeps_first_row() {
        let table = SpeedTable::from_reader(SPEED_H_CSV.as_bytes(), "avg_speed_h").unwrap();
        assert_eq!(table.lookup(&trip(), 6, 15, 8), 17.25);
    }

    #[test]
    fn test_miss_returns_zero() {
        let table = SpeedTable::from_reader(SPEED_H_CSV.as_bytes(), "avg_speed_h").unwrap();
        assert_eq!(table.lookup(&trip(), 6, 15, 10), 0.0);
        assert_eq!(table.lookup(&trip(), 7, 15, 8), 0.0);

        // a coordinate that is close but not bit-identical does not match
        let mut near = trip();
        near.pickup.longitude += 1e-9;
        assert_eq!(table.lookup(&near, 6, 15, 8), 0.0);

        assert_eq!(SpeedTable::default().lookup(&trip(), 6, 15, 8), 0.0);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let table = SpeedTable::new([HistoricalSpeedRecord {
            pickup_longitude: -0.0,
            pickup_latitude: 0.0,
            dropoff_longitude: 0.0,
            dropoff_latitude: 0.0,
            month: 1.0,
            day_of_month: 1.0,
            hour: 0.0,
            speed: 3.0,
        }]);
        let origin = Coordinate {
            longitude: 0.0,
            latitude: 0.0,
        };
        let coords = TripCoordinates {
            pickup: origin,
            dropoff: origin,
        };
        assert_eq!(table.lookup(&coords, 1, 1, 0), 3.0);
    }

    #[test]
    fn test_missing_speed_column() {
        let err = SpeedTable::from_reader(SPEED_H_CSV.as_bytes(), "avg_speed_m").unwrap_err();
        assert!(err.to_string().contains("missing 'avg_speed_m' column"));
    }
}
