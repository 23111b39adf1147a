/// End-to-end tests for the estimate pipeline over in-memory fixtures
///
/// Run with: cargo test --test pipeline_tests -- --nocapture
use std::sync::{Arc, Mutex};

use drive_dynamics::{
    distance::{dummy_manhattan, haversine},
    error::TripEnd,
    features::{day_of_week, FARE_SCHEMA, PEAK_SCHEMA, REFERENCE_YEAR},
    model::{Model, ModelArtifact, Predictor},
    pipeline::derive_features,
    speed::SpeedTable,
    zones::ZoneTable,
    EstimatorContext, EstimatorError, TripRequest,
};

const ZONES_CSV: &str = "\
LocationID,X,Y
1,-73.98,40.75
2,-73.95,40.80
";

const SPEED_HEADER: &str =
    "pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,Month,DayofMonth,Hour";

/// Predictor returning a fixed value and recording every row it sees.
struct Recording {
    feat_list: Vec<String>,
    output: f64,
    seen: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl Predictor for Recording {
    fn feature_names(&self) -> &[String] {
        &self.feat_list
    }

    fn predict(&self, x: &[f64]) -> Result<f64, String> {
        self.seen.lock().unwrap().push(x.to_vec());
        Ok(self.output)
    }
}

fn recording(schema: &[&str], output: f64) -> (Box<dyn Predictor>, Arc<Mutex<Vec<Vec<f64>>>>) {
    let seen = Arc::new(Mutex::new(vec![]));
    let p = Recording {
        feat_list: schema.iter().map(|s| s.to_string()).collect(),
        output,
        seen: seen.clone(),
    };
    (Box::new(p), seen)
}

fn empty_speeds(column: &str) -> SpeedTable {
    SpeedTable::from_reader(format!("{SPEED_HEADER},{column}\n").as_bytes(), column).unwrap()
}

struct Fixture {
    ctx: EstimatorContext,
    peak_rows: Arc<Mutex<Vec<Vec<f64>>>>,
    duration_rows: Arc<Mutex<Vec<Vec<f64>>>>,
    fare_rows: Arc<Mutex<Vec<Vec<f64>>>>,
}

fn fixture(speed_h: SpeedTable, speed_m: SpeedTable) -> Fixture {
    let zones = ZoneTable::from_reader(ZONES_CSV.as_bytes()).unwrap();
    let (peak, peak_rows) = recording(PEAK_SCHEMA, 1.0);
    let (duration, duration_rows) = recording(PEAK_SCHEMA, 18.5);
    let (fare, fare_rows) = recording(FARE_SCHEMA, 22.75);
    let ctx = EstimatorContext::new(
        zones,
        speed_h,
        speed_m,
        Model::new("peak", peak),
        Model::new("duration", duration),
        Model::new("fare", fare),
    )
    .unwrap();
    Fixture {
        ctx,
        peak_rows,
        duration_rows,
        fare_rows,
    }
}

fn june_trip() -> TripRequest {
    TripRequest {
        passenger_count: 1,
        pickup_zone: 1,
        dropoff_zone: 2,
        hour: 8,
        minute: 0,
        day_of_month: 15,
        month: 6,
    }
}

#[test]
fn test_end_to_end_scenario() {
    println!("\n=== Test: End-to-End Scenario ===");
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));

    let result = drive_dynamics::estimate(&f.ctx, &june_trip()).unwrap();
    println!("{}", result);
    assert_eq!(result.peak_hour, 1.0);
    assert_eq!(result.duration_minutes, 18.5);
    assert_eq!(result.fare, 22.75);

    let peak_rows = f.peak_rows.lock().unwrap();
    assert_eq!(peak_rows.len(), 1);
    let row = &peak_rows[0];
    let expected_haversine = haversine(40.75, -73.98, 40.80, -73.95);
    println!("✓ distance_haversine = {:.4} km", row[5]);
    assert_eq!(row[5], expected_haversine);
    assert!((row[5] - 6.1).abs() < 0.05);
    assert_eq!(row[6], dummy_manhattan(40.75, -73.98, 40.80, -73.95));
    assert_eq!(row[7], 0.0, "direction is a fixed placeholder");
    assert_eq!(
        row[11],
        day_of_week(REFERENCE_YEAR, 6, 15).unwrap() as f64,
        "dayofweek"
    );
    assert_eq!(row[12], 0.0, "avg_speed_h with empty table");
    assert_eq!(row[13], 0.0, "avg_speed_m with empty table");

    // the duration model sees the peak vector unmodified
    assert_eq!(f.duration_rows.lock().unwrap()[0], *row);
    println!("✓ All assertions passed");
}

#[test]
fn test_fare_consumes_peak_prediction() {
    println!("\n=== Test: Fare Uses Peak Output ===");
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));
    drive_dynamics::estimate(&f.ctx, &june_trip()).unwrap();

    let fare_rows = f.fare_rows.lock().unwrap();
    let row = &fare_rows[0];
    assert_eq!(row.len(), FARE_SCHEMA.len());
    let peak_idx = FARE_SCHEMA.iter().position(|n| *n == "peak_hour").unwrap();
    assert_eq!(row[peak_idx], 1.0);
    assert_eq!(row[0], haversine(40.75, -73.98, 40.80, -73.95));
    assert_eq!(row[2], -73.98);
    assert_eq!(row[5], 40.80);
    println!("✓ fare row: {:?}", row);
}

#[test]
fn test_historical_speeds_flow_into_vectors() {
    println!("\n=== Test: Historical Speed Lookup ===");
    let speed_h = SpeedTable::from_reader(
        format!("{SPEED_HEADER},avg_speed_h\n-73.98,40.75,-73.95,40.8,6,15,8,14.2\n").as_bytes(),
        "avg_speed_h",
    )
    .unwrap();
    let speed_m = SpeedTable::from_reader(
        format!("{SPEED_HEADER},avg_speed_m\n-73.98,40.75,-73.95,40.8,6,15,9,13.9\n").as_bytes(),
        "avg_speed_m",
    )
    .unwrap();
    let f = fixture(speed_h, speed_m);

    let trip = derive_features(&f.ctx, &june_trip()).unwrap();
    assert_eq!(trip.avg_speed_h, 14.2);
    // the m table only has hour 9
    assert_eq!(trip.avg_speed_m, 0.0);

    let fare = trip.fare_vector(0.0);
    assert_eq!(fare.get("average_speed_h"), Some(14.2));
    assert_eq!(fare.get("average_speed_m"), Some(0.0));
}

#[test]
fn test_invalid_date_stops_before_prediction() {
    println!("\n=== Test: Invalid Date ===");
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));
    let req = TripRequest {
        month: 2,
        day_of_month: 30,
        ..june_trip()
    };

    let err = drive_dynamics::estimate(&f.ctx, &req).unwrap_err();
    assert!(matches!(
        err,
        EstimatorError::InvalidDate {
            year: REFERENCE_YEAR,
            month: 2,
            day: 30
        }
    ));
    assert!(err.is_user_facing());
    assert!(f.peak_rows.lock().unwrap().is_empty());
    assert!(f.fare_rows.lock().unwrap().is_empty());
    println!("✓ {}", err);
}

#[test]
fn test_unknown_zone_stops_before_prediction() {
    println!("\n=== Test: Unknown Zone ===");
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));

    let req = TripRequest {
        pickup_zone: 999,
        ..june_trip()
    };
    let err = derive_features(&f.ctx, &req).unwrap_err();
    assert!(matches!(
        err,
        EstimatorError::ZoneNotFound {
            end: TripEnd::Pickup,
            zone_id: 999
        }
    ));

    let req = TripRequest {
        dropoff_zone: 77,
        ..june_trip()
    };
    let err = drive_dynamics::estimate(&f.ctx, &req).unwrap_err();
    assert!(matches!(
        err,
        EstimatorError::ZoneNotFound {
            end: TripEnd::Dropoff,
            zone_id: 77
        }
    ));
    assert!(f.peak_rows.lock().unwrap().is_empty());
    assert!(f.duration_rows.lock().unwrap().is_empty());
    assert!(f.fare_rows.lock().unwrap().is_empty());
    println!("✓ {}", err);
}

#[test]
fn test_minute_does_not_change_features() {
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));
    let a = derive_features(&f.ctx, &june_trip()).unwrap();
    let b = derive_features(
        &f.ctx,
        &TripRequest {
            minute: 45,
            ..june_trip()
        },
    )
    .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_same_zone_trip_has_zero_distance() {
    let f = fixture(empty_speeds("avg_speed_h"), empty_speeds("avg_speed_m"));
    let trip = derive_features(
        &f.ctx,
        &TripRequest {
            dropoff_zone: 1,
            ..june_trip()
        },
    )
    .unwrap();
    assert_eq!(trip.distance_haversine, 0.0);
    assert_eq!(trip.distance_dummy_manhattan, 0.0);
}

#[test]
fn test_context_rejects_mismatched_model_schema() {
    println!("\n=== Test: Schema Mismatch ===");
    let zones = ZoneTable::from_reader(ZONES_CSV.as_bytes()).unwrap();
    let (peak, _) = recording(PEAK_SCHEMA, 1.0);
    let (duration, _) = recording(PEAK_SCHEMA, 1.0);
    // fare model declared with the peak columns
    let fare = ModelArtifact::Linear {
        feat_list: PEAK_SCHEMA.iter().map(|s| s.to_string()).collect(),
        coefficients: vec![0.0; PEAK_SCHEMA.len()],
        intercept: 0.0,
    };

    let err = EstimatorContext::new(
        zones,
        SpeedTable::default(),
        SpeedTable::default(),
        Model::new("peak", peak),
        Model::new("duration", duration),
        Model::new("fare", Box::new(fare)),
    )
    .unwrap_err();
    assert!(matches!(err, EstimatorError::SchemaMismatch { ref model, .. } if model == "fare"));
    assert!(!err.is_user_facing());
    println!("✓ {}", err);
}
