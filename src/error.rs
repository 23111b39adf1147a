use std::fmt;

/// which end of the trip a zone id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripEnd {
    Pickup,
    Dropoff,
}

impl fmt::Display for TripEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripEnd::Pickup => write!(f, "pickup"),
            TripEnd::Dropoff => write!(f, "dropoff"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EstimatorError {
    #[error("File not found: {filepath}")]
    MissingResource { filepath: String },
    #[error("failed reading '{filepath}': {error}")]
    ReadError { filepath: String, error: String },
    #[error("invalid model artifact '{filepath}': {error}")]
    InvalidModel { filepath: String, error: String },
    #[error("Could not find coordinates for {end} location id {zone_id}")]
    ZoneNotFound { end: TripEnd, zone_id: u32 },
    #[error("invalid date: day {day} does not exist in month {month} of {year}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("invalid trip request: {0}")]
    InvalidInput(String),
    #[error("feature schema mismatch for {model} model: expected [{}], got [{}]", .expected.join(", "), .actual.join(", "))]
    SchemaMismatch {
        model: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("prediction failed for {model} model: {error}")]
    PredictionFailed { model: String, error: String },
}

impl EstimatorError {
    /// errors caused by the trip request itself. everything else means a
    /// broken deployment or a defect and should halt the caller.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EstimatorError::ZoneNotFound { .. }
                | EstimatorError::InvalidDate { .. }
                | EstimatorError::InvalidInput(_)
        )
    }

    /// maps a failed file open to either MissingResource or ReadError
    pub fn from_io(filepath: &std::path::Path, e: std::io::Error) -> Self {
        let filepath = filepath.display().to_string();
        if e.kind() == std::io::ErrorKind::NotFound {
            EstimatorError::MissingResource { filepath }
        } else {
            EstimatorError::ReadError {
                filepath,
                error: e.to_string(),
            }
        }
    }

    /// maps a csv error, unwrapping NotFound io errors into MissingResource
    pub fn from_csv(filepath: &std::path::Path, e: csv::Error) -> Self {
        if let csv::ErrorKind::Io(io) = e.kind() {
            if io.kind() == std::io::ErrorKind::NotFound {
                return EstimatorError::MissingResource {
                    filepath: filepath.display().to_string(),
                };
            }
        }
        EstimatorError::ReadError {
            filepath: filepath.display().to_string(),
            error: e.to_string(),
        }
    }
}
