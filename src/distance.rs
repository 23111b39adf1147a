/// mean earth radius used by the trained models' distance features
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Trip bearing feature. The models were trained with this column held at
/// zero; no bearing calculation exists, so every trip reports 0.
pub const DIRECTION_PLACEHOLDER: f64 = 0.0;

/// Great-circle distance in kilometers between two points given in degrees.
pub fn haversine(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lng1, lat2, lng2) = (
        lat1.to_radians(),
        lng1.to_radians(),
        lat2.to_radians(),
        lng2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Axis-proxy distance in kilometers: a longitude-only leg along the pickup
/// latitude plus a latitude-only leg along the pickup longitude, each measured
/// as a great-circle distance.
pub fn dummy_manhattan(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let a = haversine(lat1, lng1, lat1, lng2);
    let b = haversine(lat1, lng1, lat2, lng1);
    a + b
}
