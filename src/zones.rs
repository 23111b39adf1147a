use std::{io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;

/// representative point of a taxi zone, in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// resolved pickup and dropoff points of a trip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripCoordinates {
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
}

/// one row of the zones reference table. the file carries more columns
/// (zone name, borough, ...) which are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Zone {
    #[serde(rename = "LocationID")]
    pub id: u32,
    #[serde(rename = "X")]
    pub longitude: f64,
    #[serde(rename = "Y")]
    pub latitude: f64,
}

impl Zone {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// Zone id to coordinate reference table, kept in file order.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    zones: Vec<Zone>,
}

impl ZoneTable {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn from_path(path: &Path) -> Result<Self, EstimatorError> {
        let file = std::fs::File::open(path).map_err(|e| EstimatorError::from_io(path, e))?;
        let table = Self::read(file).map_err(|e| EstimatorError::from_csv(path, e))?;
        tracing::info!("loaded {} zones from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EstimatorError> {
        Self::read(reader).map_err(|e| EstimatorError::ReadError {
            filepath: String::from("<reader>"),
            error: e.to_string(),
        })
    }

    fn read<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let zones = csv_reader
            .deserialize::<Zone>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { zones })
    }

    /// Coordinates of the first zone in table order carrying `zone_id`, or
    /// None when the id is absent. Duplicate ids are tolerated.
    pub fn lookup(&self, zone_id: u32) -> Option<Coordinate> {
        self.zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(Zone::coordinate)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
